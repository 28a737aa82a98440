// Roster Store Port (Interface)

use crate::domain::{Character, CharacterId};
use crate::error::Result;
use async_trait::async_trait;

/// Persistent collection of character records
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Insert a new character
    async fn insert(&self, character: &Character) -> Result<()>;

    /// All characters, oldest first
    async fn list_all(&self) -> Result<Vec<Character>>;

    /// Find character by ID
    async fn find_by_id(&self, id: &CharacterId) -> Result<Option<Character>>;

    /// Overwrite an existing record; returns false when the id is unknown
    async fn update(&self, character: &Character) -> Result<bool>;

    /// Delete by ID; returns false (not an error) when nothing was deleted
    async fn delete(&self, id: &CharacterId) -> Result<bool>;

    /// Case-insensitive substring match on name, ordered by name.
    /// A blank query returns every character.
    async fn search_by_name(&self, query: &str) -> Result<Vec<Character>>;

    /// Remove every character, returning how many were removed
    async fn clear(&self) -> Result<u64>;
}

/// Shared filter used by adapters that cannot match case-insensitively
/// outside ASCII (SQLite `LOWER` only folds ASCII)
pub fn filter_by_name(mut characters: Vec<Character>, query: &str) -> Vec<Character> {
    let query = query.trim().to_lowercase();
    if !query.is_empty() {
        characters.retain(|c| c.name.to_lowercase().contains(&query));
    }
    characters.sort_by(|a, b| a.name.cmp(&b.name));
    characters
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// In-memory roster (insertion order == creation order)
    #[derive(Default, Clone)]
    pub struct InMemoryRosterStore {
        characters: Arc<Mutex<Vec<Character>>>,
    }

    impl InMemoryRosterStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_characters(characters: Vec<Character>) -> Self {
            Self {
                characters: Arc::new(Mutex::new(characters)),
            }
        }
    }

    #[async_trait]
    impl RosterStore for InMemoryRosterStore {
        async fn insert(&self, character: &Character) -> Result<()> {
            let mut characters = self.characters.lock().unwrap();
            if characters.iter().any(|c| c.id == character.id) {
                return Err(crate::error::AppError::Database(format!(
                    "Unique constraint violation: characters.id ({})",
                    character.id
                )));
            }
            characters.push(character.clone());
            Ok(())
        }

        async fn list_all(&self) -> Result<Vec<Character>> {
            let mut characters = self.characters.lock().unwrap().clone();
            characters.sort_by_key(|c| c.created_at);
            Ok(characters)
        }

        async fn find_by_id(&self, id: &CharacterId) -> Result<Option<Character>> {
            Ok(self
                .characters
                .lock()
                .unwrap()
                .iter()
                .find(|c| &c.id == id)
                .cloned())
        }

        async fn update(&self, character: &Character) -> Result<bool> {
            let mut characters = self.characters.lock().unwrap();
            match characters.iter_mut().find(|c| c.id == character.id) {
                Some(existing) => {
                    *existing = character.clone();
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn delete(&self, id: &CharacterId) -> Result<bool> {
            let mut characters = self.characters.lock().unwrap();
            let before = characters.len();
            characters.retain(|c| &c.id != id);
            Ok(characters.len() != before)
        }

        async fn search_by_name(&self, query: &str) -> Result<Vec<Character>> {
            let characters = self.characters.lock().unwrap().clone();
            Ok(filter_by_name(characters, query))
        }

        async fn clear(&self) -> Result<u64> {
            let mut characters = self.characters.lock().unwrap();
            let removed = characters.len() as u64;
            characters.clear();
            Ok(removed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(name: &str) -> Character {
        Character {
            id: name.to_lowercase(),
            name: name.to_string(),
            description: String::new(),
            image_url: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_filter_by_name() {
        let all = vec![character("Zoé"), character("Ada"), character("ÉMILE")];

        let found = filter_by_name(all.clone(), "é");
        let names: Vec<_> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Zoé", "ÉMILE"]);

        let everyone = filter_by_name(all, "  ");
        assert_eq!(everyone[0].name, "Ada");
        assert_eq!(everyone.len(), 3);
    }
}
