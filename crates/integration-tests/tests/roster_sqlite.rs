//! Roster and credential persistence on a SQLite file

use std::path::PathBuf;
use std::sync::Arc;

use panelcraft_core::application::RosterService;
use panelcraft_core::domain::{CharacterUpdate, ComicStyle, NewCharacter};
use panelcraft_core::port::content_service::mocks::MockContentService;
use panelcraft_core::port::id_provider::UuidProvider;
use panelcraft_core::port::time_provider::SystemTimeProvider;
use panelcraft_core::port::{ApiKey, CredentialStore};
use panelcraft_core::AppError;
use panelcraft_infra_sqlite::{
    create_pool, current_version, run_migrations, SqliteCredentialStore, SqliteRosterStore,
};
use sqlx::SqlitePool;

/// Database file removed (with its WAL side files) on drop
struct TempDb(PathBuf);

impl TempDb {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "panelcraft_test_{}_{}.db",
            name,
            std::process::id()
        ));
        let db = Self(path);
        db.remove();
        db
    }

    fn url(&self) -> String {
        format!("sqlite://{}", self.0.display())
    }

    fn remove(&self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.0.display(), suffix));
        }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        self.remove();
    }
}

async fn open(db: &TempDb) -> SqlitePool {
    let pool = create_pool(&db.url()).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

fn service(pool: SqlitePool, content: Arc<MockContentService>) -> RosterService {
    let time = Arc::new(SystemTimeProvider);
    RosterService::new(
        Arc::new(SqliteRosterStore::new(pool.clone())),
        content,
        Arc::new(SqliteCredentialStore::new(pool, time.clone())),
        Arc::new(UuidProvider),
        time,
    )
}

#[tokio::test]
async fn test_roster_survives_reopen() {
    let db = TempDb::new("roster_reopen");

    let (alice_id, bob_id) = {
        let pool = open(&db).await;
        let roster = service(pool.clone(), Arc::new(MockContentService::new()));
        let alice = roster
            .create(NewCharacter::new("Alice", "the keeper").with_image("a.png"))
            .await
            .unwrap();
        let bob = roster
            .create(NewCharacter::new("Bob", "a fisherman"))
            .await
            .unwrap();
        pool.close().await;
        (alice.id, bob.id)
    };

    let pool = open(&db).await;
    assert_eq!(current_version(&pool).await.unwrap(), 2);
    let roster = service(pool, Arc::new(MockContentService::new()));

    let names: Vec<String> = roster
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Alice", "Bob"]);

    let updated = roster
        .update(
            &bob_id,
            CharacterUpdate {
                description: Some("an old fisherman".into()),
                image_url: Some(Some("b.png".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.image_url.as_deref(), Some("b.png"));
    assert_eq!(roster.get(&bob_id).await.unwrap().description, "an old fisherman");

    assert!(roster.delete(&alice_id).await.unwrap());
    assert!(!roster.delete(&alice_id).await.unwrap());
    assert!(matches!(
        roster.get(&alice_id).await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert_eq!(roster.search("BO").await.unwrap().len(), 1);
    assert_eq!(roster.clear().await.unwrap(), 1);
    assert!(roster.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_credential_survives_reopen() {
    let db = TempDb::new("credential_reopen");

    {
        let pool = open(&db).await;
        let store = SqliteCredentialStore::new(pool.clone(), Arc::new(SystemTimeProvider));
        assert!(store.get().await.unwrap().is_none());
        store
            .set(&ApiKey::parse("  sk-first-key-01 ").unwrap())
            .await
            .unwrap();
        store
            .set(&ApiKey::parse("sk-second-key-02").unwrap())
            .await
            .unwrap();
        pool.close().await;
    }

    let pool = open(&db).await;
    let store = SqliteCredentialStore::new(pool, Arc::new(SystemTimeProvider));
    let key = store.get().await.unwrap().unwrap();
    assert_eq!(key.expose(), "sk-second-key-02");

    store.clear().await.unwrap();
    assert!(store.get().await.unwrap().is_none());
    store.clear().await.unwrap();
}

#[tokio::test]
async fn test_character_sheet_needs_key_and_stores_image() {
    let db = TempDb::new("character_sheet");
    let pool = open(&db).await;
    let content = Arc::new(MockContentService::new());
    let roster = service(pool.clone(), content.clone());

    let err = roster
        .create_with_sheet(
            NewCharacter::new("Mei", "a courier in a yellow coat"),
            ComicStyle::KoreanManhwa,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
    assert!(content.calls().is_empty());
    assert!(roster.list().await.unwrap().is_empty());

    SqliteCredentialStore::new(pool, Arc::new(SystemTimeProvider))
        .set(&ApiKey::parse("sk-sheet-key-01").unwrap())
        .await
        .unwrap();

    let mei = roster
        .create_with_sheet(
            NewCharacter::new("  Mei ", "a courier in a yellow coat"),
            ComicStyle::KoreanManhwa,
            Some("https://img/mei-photo.png".into()),
        )
        .await
        .unwrap();
    assert_eq!(mei.name, "Mei");
    assert_eq!(mei.image_url.as_deref(), Some("mock://sheet/Mei"));
    assert_eq!(content.calls()[0].kind, "sheet");
    assert_eq!(roster.get(&mei.id).await.unwrap(), mei);
}
