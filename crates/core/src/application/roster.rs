// Roster Service - character management use cases

use crate::domain::{
    Character, CharacterId, CharacterUpdate, ComicStyle, DomainError, ImageOptions, NewCharacter,
};
use crate::error::{AppError, Result};
use crate::port::{
    CharacterSheetRequest, ContentService, CredentialStore, IdProvider, RosterStore, TimeProvider,
};
use std::sync::Arc;
use tracing::{debug, info};

const MAX_NAME_LEN: usize = 100;

pub struct RosterService {
    roster: Arc<dyn RosterStore>,
    content: Arc<dyn ContentService>,
    credentials: Arc<dyn CredentialStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl RosterService {
    pub fn new(
        roster: Arc<dyn RosterStore>,
        content: Arc<dyn ContentService>,
        credentials: Arc<dyn CredentialStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            roster,
            content,
            credentials,
            id_provider,
            time_provider,
        }
    }

    /// Store a character as given
    pub async fn create(&self, new: NewCharacter) -> Result<Character> {
        let new = validate_new(new)?;
        let now = self.time_provider.now_millis();
        let character = Character {
            id: self.id_provider.generate_id(),
            name: new.name,
            description: new.description,
            image_url: new.image_url,
            created_at: now,
            updated_at: now,
        };

        self.roster.insert(&character).await?;
        info!(character_id = %character.id, name = %character.name, "Character created");
        Ok(character)
    }

    /// Render a front/side/back reference sheet, then store the character with it.
    ///
    /// `reference_image` is an optional picture the sheet should follow.
    pub async fn create_with_sheet(
        &self,
        new: NewCharacter,
        style: ComicStyle,
        reference_image: Option<String>,
    ) -> Result<Character> {
        let new = validate_new(new)?;
        let api_key = self
            .credentials
            .get()
            .await?
            .ok_or_else(|| AppError::Config("no API key configured".to_string()))?;

        debug!(name = %new.name, style = %style, "Rendering character sheet");
        let sheet = self
            .content
            .render_character_sheet(CharacterSheetRequest {
                name: new.name.clone(),
                description: new.description.clone(),
                style,
                reference_image,
                options: ImageOptions::hd(),
                api_key,
            })
            .await?;

        self.create(NewCharacter {
            image_url: Some(sheet.image_url),
            ..new
        })
        .await
    }

    pub async fn list(&self) -> Result<Vec<Character>> {
        self.roster.list_all().await
    }

    pub async fn get(&self, id: &CharacterId) -> Result<Character> {
        self.roster
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("character {id}")))
    }

    pub async fn update(&self, id: &CharacterId, update: CharacterUpdate) -> Result<Character> {
        let update = validate_update(update)?;
        let mut character = self.get(id).await?;
        if update.is_empty() {
            return Ok(character);
        }

        update.apply(&mut character, self.time_provider.now_millis());
        if !self.roster.update(&character).await? {
            return Err(AppError::NotFound(format!("character {id}")));
        }
        info!(character_id = %id, "Character updated");
        Ok(character)
    }

    /// Returns false when no such character existed
    pub async fn delete(&self, id: &CharacterId) -> Result<bool> {
        let deleted = self.roster.delete(id).await?;
        if deleted {
            info!(character_id = %id, "Character deleted");
        }
        Ok(deleted)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Character>> {
        self.roster.search_by_name(query).await
    }

    pub async fn clear(&self) -> Result<u64> {
        let removed = self.roster.clear().await?;
        info!(removed, "Roster cleared");
        Ok(removed)
    }
}

fn validate_name(name: &str) -> std::result::Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::ValidationError(
            "character name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::ValidationError(format!(
            "character name too long (max {MAX_NAME_LEN} characters)"
        )));
    }
    Ok(name.to_string())
}

fn validate_description(description: &str) -> std::result::Result<String, DomainError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(DomainError::ValidationError(
            "character description cannot be empty".to_string(),
        ));
    }
    Ok(description.to_string())
}

fn validate_new(new: NewCharacter) -> Result<NewCharacter> {
    Ok(NewCharacter {
        name: validate_name(&new.name)?,
        description: validate_description(&new.description)?,
        image_url: new.image_url.filter(|url| !url.trim().is_empty()),
    })
}

fn validate_update(update: CharacterUpdate) -> Result<CharacterUpdate> {
    Ok(CharacterUpdate {
        name: update.name.as_deref().map(validate_name).transpose()?,
        description: update
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?,
        image_url: update.image_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::content_service::mocks::MockContentService;
    use crate::port::credential_store::mocks::InMemoryCredentialStore;
    use crate::port::id_provider::SequentialIdProvider;
    use crate::port::roster_store::mocks::InMemoryRosterStore;
    use crate::port::time_provider::ManualTimeProvider;
    use tokio_test::{assert_err, assert_ok};

    struct Harness {
        service: RosterService,
        content: Arc<MockContentService>,
        clock: Arc<ManualTimeProvider>,
    }

    fn harness(credentials: InMemoryCredentialStore) -> Harness {
        let content = Arc::new(MockContentService::new());
        let clock = Arc::new(ManualTimeProvider::new(1_000));
        let service = RosterService::new(
            Arc::new(InMemoryRosterStore::new()),
            content.clone(),
            Arc::new(credentials),
            Arc::new(SequentialIdProvider::new("char")),
            clock.clone(),
        );
        Harness {
            service,
            content,
            clock,
        }
    }

    #[tokio::test]
    async fn test_create_trims_and_validates() {
        let h = harness(InMemoryCredentialStore::new());

        let alice = assert_ok!(
            h.service
                .create(NewCharacter::new("  Alice ", " red scarf, short hair "))
                .await
        );
        assert_eq!(alice.id, "char-1");
        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.description, "red scarf, short hair");
        assert_eq!(alice.created_at, 1_000);

        let err = assert_err!(h.service.create(NewCharacter::new("   ", "x")).await);
        assert!(matches!(err, AppError::Domain(DomainError::ValidationError(_))));
        assert_err!(h.service.create(NewCharacter::new("Bob", "")).await);
        assert_err!(
            h.service
                .create(NewCharacter::new("x".repeat(101), "too long"))
                .await
        );

        assert_eq!(h.service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_with_sheet_requires_key() {
        let h = harness(InMemoryCredentialStore::new());
        let err = h
            .service
            .create_with_sheet(
                NewCharacter::new("Mei", "a courier"),
                ComicStyle::KoreanManhwa,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(h.content.calls().is_empty());
        assert!(h.service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_sheet_stores_rendered_image() {
        let h = harness(InMemoryCredentialStore::with_key("sk-test-1234567"));
        let mei = h
            .service
            .create_with_sheet(
                NewCharacter::new("Mei", "a courier"),
                ComicStyle::KoreanManhwa,
                Some("https://example.com/mei.jpg".into()),
            )
            .await
            .unwrap();

        assert_eq!(mei.image_url.as_deref(), Some("mock://sheet/Mei"));
        let calls = h.content.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, "sheet");
        assert_eq!(h.service.get(&mei.id).await.unwrap(), mei);
    }

    #[tokio::test]
    async fn test_update_delete_search() {
        let h = harness(InMemoryCredentialStore::new());
        let alice = h
            .service
            .create(NewCharacter::new("Alice", "red scarf").with_image("a.png"))
            .await
            .unwrap();
        h.service
            .create(NewCharacter::new("Bob", "sailor"))
            .await
            .unwrap();

        h.clock.advance(500);
        let updated = h
            .service
            .update(
                &alice.id,
                CharacterUpdate {
                    description: Some("blue scarf".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "blue scarf");
        assert_eq!(updated.image_url.as_deref(), Some("a.png"));
        assert_eq!(updated.updated_at, 1_500);
        assert_eq!(updated.created_at, 1_000);

        let found = h.service.search("ali").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].description, "blue scarf");

        assert!(h.service.delete(&alice.id).await.unwrap());
        assert!(!h.service.delete(&alice.id).await.unwrap());
        assert!(matches!(
            h.service.get(&alice.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            h.service
                .update(&alice.id, CharacterUpdate::default())
                .await,
            Err(AppError::NotFound(_))
        ));

        assert_eq!(h.service.clear().await.unwrap(), 1);
        assert!(h.service.list().await.unwrap().is_empty());
    }
}
