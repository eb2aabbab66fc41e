use engine::{AccountKind, CategoryKind, Engine, EngineError, OperationKind};
use migration::MigratorTrait;
use sea_orm::Database;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

async fn engine_with_main_currency() -> (Engine, i64) {
    let engine = engine_with_db().await;
    let eur = engine.new_currency("Euro", "EUR", 1.0, "alice").await.unwrap();
    (engine, eur.id)
}

#[tokio::test]
async fn create_stamps_audit_fields_and_actor() {
    let (engine, eur_id) = engine_with_main_currency().await;

    let account = engine
        .new_account("Cash", AccountKind::Current, eur_id, 0, "alice")
        .await
        .unwrap();

    assert_eq!(account.audit.created_by, "alice");
    assert_eq!(account.audit.updated_by, "alice");
    assert_eq!(account.audit.created_at, account.audit.updated_at);
    assert!(account.audit.is_active());
    assert_eq!(account.position, 1);
}

#[tokio::test]
async fn delete_is_idempotent_and_keeps_first_tombstone() {
    let (engine, eur_id) = engine_with_main_currency().await;
    let account = engine
        .new_account("Cash", AccountKind::Current, eur_id, 0, "alice")
        .await
        .unwrap();

    assert!(engine.delete_account(account.id, "bob").await.unwrap());
    let first = engine.account(account.id).await.unwrap().unwrap();
    assert!(first.audit.deleted_at.is_some());
    assert_eq!(first.audit.deleted_by.as_deref(), Some("bob"));

    assert!(!engine.delete_account(account.id, "carol").await.unwrap());
    let second = engine.account(account.id).await.unwrap().unwrap();
    assert_eq!(second.audit.deleted_at, first.audit.deleted_at);
    assert_eq!(second.audit.deleted_by, first.audit.deleted_by);
}

#[tokio::test]
async fn restore_round_trip_clears_tombstone_and_keeps_position() {
    let (engine, eur_id) = engine_with_main_currency().await;
    engine
        .new_account("Cash", AccountKind::Current, eur_id, 0, "alice")
        .await
        .unwrap();
    let bank = engine
        .new_account("Bank", AccountKind::Savings, eur_id, 0, "alice")
        .await
        .unwrap();
    assert_eq!(bank.position, 2);

    engine.delete_account(bank.id, "alice").await.unwrap();
    let restored = engine
        .restore_account(bank.id, "bob")
        .await
        .unwrap()
        .unwrap();

    assert!(restored.audit.is_active());
    assert_eq!(restored.audit.deleted_by, None);
    assert_eq!(restored.audit.updated_by, "bob");
    assert_eq!(restored.position, 2);
}

#[tokio::test]
async fn restore_is_lenient_about_state() {
    let (engine, eur_id) = engine_with_main_currency().await;
    let account = engine
        .new_account("Cash", AccountKind::Current, eur_id, 0, "alice")
        .await
        .unwrap();

    // Unknown id -> None, active row -> unchanged.
    assert!(engine.restore_account(9999, "alice").await.unwrap().is_none());
    let untouched = engine
        .restore_account(account.id, "alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched, account);
}

#[tokio::test]
async fn deleted_rows_free_their_title_but_stay_retrievable() {
    let (engine, eur_id) = engine_with_main_currency().await;
    let old = engine
        .new_account("Wallet", AccountKind::Current, eur_id, 0, "alice")
        .await
        .unwrap();

    let err = engine
        .new_account("Wallet", AccountKind::Current, eur_id, 0, "alice")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("Wallet".to_string()));

    engine.delete_account(old.id, "alice").await.unwrap();
    let fresh = engine
        .new_account("Wallet", AccountKind::Current, eur_id, 0, "alice")
        .await
        .unwrap();
    assert_ne!(fresh.id, old.id);

    // The tombstone is still reachable by id and still carries the title.
    let tombstone = engine.account(old.id).await.unwrap().unwrap();
    assert_eq!(tombstone.title, "Wallet");
    assert!(!tombstone.audit.is_active());

    // Active listings only show the fresh row.
    let active = engine.accounts().await.unwrap();
    assert_eq!(active.iter().filter(|a| a.title == "Wallet").count(), 1);
    assert_eq!(active[0].id, fresh.id);
}

#[tokio::test]
async fn delete_by_title_only_sees_active_rows() {
    let (engine, eur_id) = engine_with_main_currency().await;
    let account = engine
        .new_account("Cash", AccountKind::Current, eur_id, 0, "alice")
        .await
        .unwrap();

    assert!(engine.delete_account_by_title("Cash", "alice").await.unwrap());
    assert!(!engine.delete_account_by_title("Cash", "alice").await.unwrap());

    let tombstone = engine.account(account.id).await.unwrap().unwrap();
    assert!(!tombstone.audit.is_active());
}

#[tokio::test]
async fn get_or_create_returns_restores_or_creates() {
    let (engine, _) = engine_with_main_currency().await;

    // Missing -> created with defaults (main currency, zero balance).
    let cash = engine.get_or_create_account("Cash", "alice").await.unwrap();
    assert_eq!(cash.kind, AccountKind::Current);
    assert_eq!(cash.amount_minor, 0);

    // Active -> returned as-is.
    let again = engine.get_or_create_account("Cash", "alice").await.unwrap();
    assert_eq!(again.id, cash.id);

    // Deleted -> restored.
    engine.delete_account(cash.id, "alice").await.unwrap();
    let revived = engine.get_or_create_account("Cash", "bob").await.unwrap();
    assert_eq!(revived.id, cash.id);
    assert!(revived.audit.is_active());
    assert_eq!(revived.audit.updated_by, "bob");
}

#[tokio::test]
async fn get_or_create_account_without_main_currency_fails() {
    let engine = engine_with_db().await;
    let err = engine.get_or_create_account("Cash", "alice").await.unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("main currency not exists".to_string())
    );
}

#[tokio::test]
async fn update_restores_deleted_rows_before_patching() {
    let (engine, eur_id) = engine_with_main_currency().await;
    let account = engine
        .new_account("Cash", AccountKind::Current, eur_id, 0, "alice")
        .await
        .unwrap();
    engine.delete_account(account.id, "alice").await.unwrap();

    let patched = engine
        .update_account(
            account.id,
            engine::AccountPatch {
                closed: Some(true),
                ..Default::default()
            },
            "bob",
        )
        .await
        .unwrap();

    assert!(patched.audit.is_active());
    assert!(patched.closed);
    assert_eq!(patched.audit.updated_by, "bob");
}

#[tokio::test]
async fn patch_only_touches_supplied_fields() {
    let (engine, _eur_id) = engine_with_main_currency().await;
    let category = engine
        .new_category(
            "Food",
            OperationKind::Expense,
            CategoryKind::Parent,
            None,
            "alice",
        )
        .await
        .unwrap();

    let patched = engine
        .update_category(
            category.id,
            engine::CategoryPatch {
                title: Some("Groceries".to_string()),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap();

    assert_eq!(patched.title, "Groceries");
    assert_eq!(patched.operation_kind, category.operation_kind);
    assert_eq!(patched.kind, category.kind);
    assert_eq!(patched.parent_id, category.parent_id);
    assert_eq!(patched.position, category.position);
}

#[tokio::test]
async fn validation_failure_leaves_no_partial_write() {
    let (engine, eur_id) = engine_with_main_currency().await;

    let err = engine
        .new_account("   ", AccountKind::Current, eur_id, 0, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { field: "title", .. }));

    assert!(engine.accounts_with_deleted().await.unwrap().is_empty());
}

#[tokio::test]
async fn restart_engine_reads_same_state() {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join(format!("engine_{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();

    let eur = engine.new_currency("Euro", "EUR", 1.0, "alice").await.unwrap();
    let account = engine
        .new_account("Cash", AccountKind::Current, eur.id, 1000, "alice")
        .await
        .unwrap();
    engine.delete_account(account.id, "alice").await.unwrap();

    drop(engine);
    drop(db);

    let db2 = Database::connect(&url).await.unwrap();
    let engine2 = Engine::builder().database(db2.clone()).build().await.unwrap();

    let tombstone = engine2.account(account.id).await.unwrap().unwrap();
    assert!(!tombstone.audit.is_active());
    assert_eq!(tombstone.amount_minor, 1000);

    drop(db2);
    let _ = std::fs::remove_file(path);
}
