// Character Domain Model (roster records)

use serde::{Deserialize, Serialize};

/// Character ID (UUID v4)
pub type CharacterId = String;

/// A roster entry; read-only while generation is running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub description: String,
    /// Reference sheet (front/side/back) used to keep the character consistent
    pub image_url: Option<String>,
    pub created_at: i64, // epoch ms
    pub updated_at: i64, // epoch ms
}

impl Character {
    /// Case-insensitive name comparison
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }

    /// Reference usable downstream, if this character has an image
    pub fn reference(&self) -> Option<CharacterReference> {
        self.image_url.as_ref().map(|url| CharacterReference {
            name: self.name.clone(),
            image_url: url.clone(),
        })
    }
}

/// Fields supplied when creating a character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCharacter {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewCharacter {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// Partial update; `None` leaves the field untouched.
/// `image_url: Some(None)` removes the reference image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<Option<String>>,
}

impl CharacterUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.image_url.is_none()
    }

    /// Apply onto an existing record, stamping `updated_at`
    pub fn apply(self, character: &mut Character, now: i64) {
        if let Some(name) = self.name {
            character.name = name;
        }
        if let Some(description) = self.description {
            character.description = description;
        }
        if let Some(image_url) = self.image_url {
            character.image_url = image_url;
        }
        character.updated_at = now;
    }
}

/// Name + image pair passed to the image generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterReference {
    pub name: String,
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Character {
        Character {
            id: "c-1".into(),
            name: "Alice".into(),
            description: "red scarf".into(),
            image_url: Some("a.png".into()),
            created_at: 1000,
            updated_at: 1000,
        }
    }

    #[test]
    fn test_matches_name_ignores_case() {
        let c = alice();
        assert!(c.matches_name("alice"));
        assert!(c.matches_name(" ALICE "));
        assert!(!c.matches_name("Alicia"));
    }

    #[test]
    fn test_update_apply() {
        let mut c = alice();
        CharacterUpdate {
            description: Some("blue scarf".into()),
            image_url: Some(None),
            ..Default::default()
        }
        .apply(&mut c, 2000);

        assert_eq!(c.name, "Alice");
        assert_eq!(c.description, "blue scarf");
        assert!(c.image_url.is_none());
        assert_eq!(c.updated_at, 2000);
        assert!(c.reference().is_none());
    }
}
