// SQLite RosterStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use panelcraft_core::domain::{Character, CharacterId};
use panelcraft_core::error::Result;
use panelcraft_core::port::roster_store::filter_by_name;
use panelcraft_core::port::RosterStore;
use sqlx::SqlitePool;
use tracing::debug;

pub struct SqliteRosterStore {
    pool: SqlitePool,
}

impl SqliteRosterStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RosterStore for SqliteRosterStore {
    async fn insert(&self, character: &Character) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO characters (id, name, description, image_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&character.id)
        .bind(&character.name)
        .bind(&character.description)
        .bind(&character.image_url)
        .bind(character.created_at)
        .bind(character.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(character_id = %character.id, "Character row inserted");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Character>> {
        let rows: Vec<CharacterRow> =
            sqlx::query_as("SELECT * FROM characters ORDER BY created_at ASC, rowid ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CharacterRow::into_character).collect())
    }

    async fn find_by_id(&self, id: &CharacterId) -> Result<Option<Character>> {
        let row = sqlx::query_as::<_, CharacterRow>("SELECT * FROM characters WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(CharacterRow::into_character))
    }

    async fn update(&self, character: &Character) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE characters
            SET name = ?, description = ?, image_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&character.name)
        .bind(&character.description)
        .bind(&character.image_url)
        .bind(character.updated_at)
        .bind(&character.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &CharacterId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM characters WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn search_by_name(&self, query: &str) -> Result<Vec<Character>> {
        // SQLite LOWER() only folds ASCII, so matching happens in Rust
        let all = self.list_all().await?;
        Ok(filter_by_name(all, query))
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM characters")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CharacterRow {
    id: String,
    name: String,
    description: String,
    image_url: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl CharacterRow {
    fn into_character(self) -> Character {
        Character {
            id: self.id,
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use panelcraft_core::error::AppError;

    async fn setup_test_db() -> SqliteRosterStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteRosterStore::new(pool)
    }

    fn character(id: &str, name: &str, created_at: i64) -> Character {
        Character {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{name} description"),
            image_url: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = setup_test_db().await;
        let mut alice = character("c-1", "Alice", 10);
        alice.image_url = Some("https://img.example/alice.png".into());

        store.insert(&alice).await.unwrap();

        let found = store.find_by_id(&"c-1".to_string()).await.unwrap();
        assert_eq!(found, Some(alice));
        assert!(store
            .find_by_id(&"missing".to_string())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_database_error() {
        let store = setup_test_db().await;
        store.insert(&character("c-1", "Alice", 10)).await.unwrap();

        let err = store
            .insert(&character("c-1", "Other", 11))
            .await
            .unwrap_err();
        match err {
            AppError::Database(msg) => assert!(msg.contains("Unique constraint")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_in_creation_order() {
        let store = setup_test_db().await;
        store.insert(&character("c-2", "Zoe", 20)).await.unwrap();
        store.insert(&character("c-1", "Ada", 10)).await.unwrap();
        store.insert(&character("c-3", "Mei", 20)).await.unwrap();

        let ids: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["c-1", "c-2", "c-3"]);
    }

    #[tokio::test]
    async fn test_update_delete_clear() {
        let store = setup_test_db().await;
        let mut bob = character("c-1", "Bob", 10);
        store.insert(&bob).await.unwrap();

        bob.description = "ship's cook".into();
        bob.image_url = Some("bob.png".into());
        bob.updated_at = 99;
        assert!(store.update(&bob).await.unwrap());
        assert!(!store.update(&character("ghost", "Ghost", 1)).await.unwrap());
        assert_eq!(
            store.find_by_id(&bob.id).await.unwrap().unwrap().updated_at,
            99
        );

        assert!(store.delete(&bob.id).await.unwrap());
        assert!(!store.delete(&bob.id).await.unwrap());

        store.insert(&character("c-2", "Ann", 1)).await.unwrap();
        store.insert(&character("c-3", "Ben", 2)).await.unwrap();
        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_by_name() {
        let store = setup_test_db().await;
        store.insert(&character("c-1", "Marco", 1)).await.unwrap();
        store.insert(&character("c-2", "Émilie", 2)).await.unwrap();
        store.insert(&character("c-3", "amaru", 3)).await.unwrap();

        let names: Vec<_> = store
            .search_by_name("MAR")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Marco", "amaru"]);

        let accented = store.search_by_name("émi").await.unwrap();
        assert_eq!(accented.len(), 1);
        assert_eq!(store.search_by_name("").await.unwrap().len(), 3);
    }
}
