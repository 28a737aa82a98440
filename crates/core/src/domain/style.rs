// Rendering options: comic style, layout mode, image options

use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Square output size accepted by the image endpoint
pub const IMAGE_SIZE: &str = "1328*1328";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComicStyle {
    #[default]
    JapaneseManga,
    AmericanComics,
    KoreanManhwa,
    ChineseManhua,
    EuropeanComics,
}

impl ComicStyle {
    pub const ALL: [ComicStyle; 5] = [
        ComicStyle::JapaneseManga,
        ComicStyle::AmericanComics,
        ComicStyle::KoreanManhwa,
        ComicStyle::ChineseManhua,
        ComicStyle::EuropeanComics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComicStyle::JapaneseManga => "japanese-manga",
            ComicStyle::AmericanComics => "american-comics",
            ComicStyle::KoreanManhwa => "korean-manhwa",
            ComicStyle::ChineseManhua => "chinese-manhua",
            ComicStyle::EuropeanComics => "european-comics",
        }
    }

    /// Visual vocabulary handed to the prompt builder
    pub fn description(&self) -> &'static str {
        match self {
            ComicStyle::JapaneseManga => {
                "Japanese manga style with black and white ink artwork, dynamic action lines, \
                 expressive eyes, and typical manga panel composition"
            }
            ComicStyle::AmericanComics => {
                "American comic book style with bold inking, vibrant primary colors, \
                 superhero-style action poses, and dynamic perspectives"
            }
            ComicStyle::KoreanManhwa => {
                "Korean manhwa style with vibrant colors, detailed character designs, \
                 and realistic proportions"
            }
            ComicStyle::ChineseManhua => {
                "Chinese manhua style with flowing brushwork, traditional Chinese aesthetics \
                 mixed with modern techniques, and cinematic composition"
            }
            ComicStyle::EuropeanComics => {
                "European comics style (bande dessinee) with detailed backgrounds, realistic \
                 artwork, and sophisticated visual storytelling"
            }
        }
    }
}

impl std::fmt::Display for ComicStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComicStyle {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComicStyle::ALL
            .into_iter()
            .find(|style| style.as_str() == s.trim())
            .ok_or_else(|| DomainError::UnknownStyle(s.to_string()))
    }
}

/// One image per scene, or one image per page of several scenes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    #[default]
    SinglePanel,
    MultiPanel,
}

impl LayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::SinglePanel => "single-panel",
            LayoutMode::MultiPanel => "multi-panel",
        }
    }
}

impl std::fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    #[default]
    Standard,
    Hd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOptions {
    pub size: String,
    pub quality: ImageQuality,
}

impl ImageOptions {
    pub fn standard() -> Self {
        Self {
            size: IMAGE_SIZE.to_string(),
            quality: ImageQuality::Standard,
        }
    }

    pub fn hd() -> Self {
        Self {
            size: IMAGE_SIZE.to_string(),
            quality: ImageQuality::Hd,
        }
    }
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self::standard()
    }
}

/// What a successful render hands back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_prompt: Option<String>,
}

impl GeneratedImage {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            revised_prompt: None,
            optimized_prompt: None,
        }
    }
}
