// Scene Domain Model

use serde::{Deserialize, Serialize};

/// One static, drawable moment extracted from the source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Assigned after analysis ("scene-1", "page-2-scene-3")
    #[serde(default)]
    pub id: String,
    pub scene_number: u32,
    pub description: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,
    #[serde(default)]
    pub action: String,
}

/// A page as returned by analysis, before the storyboard is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDraft {
    pub page_number: u32,
    #[serde(default)]
    pub title: String,
    pub scenes: Vec<Scene>,
}

/// Assign panel-mode scene ids ("scene-<n>", 1-based)
pub fn number_scenes(scenes: &mut [Scene]) {
    for (index, scene) in scenes.iter_mut().enumerate() {
        scene.id = format!("scene-{}", index + 1);
    }
}

/// Assign page-mode scene ids ("page-<p>-scene-<n>", 1-based)
pub fn number_page_scenes(pages: &mut [PageDraft]) {
    for (page_index, page) in pages.iter_mut().enumerate() {
        for (scene_index, scene) in page.scenes.iter_mut().enumerate() {
            scene.id = format!("page-{}-scene-{}", page_index + 1, scene_index + 1);
        }
    }
}

/// Distinct character names in first-appearance order
pub fn collect_characters<'a>(scenes: impl IntoIterator<Item = &'a Scene>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for scene in scenes {
        for name in &scene.characters {
            if !names.iter().any(|existing| existing == name) {
                names.push(name.clone());
            }
        }
    }
    names
}
