use chrono::Utc;
use engine::{
    AccountKind, CategoryKind, Engine, EngineError, OperationDraft, OperationKind, OperationPatch,
    TransferLeg,
};
use migration::MigratorTrait;
use sea_orm::Database;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

/// Engine with EUR (main) + USD, and one account per currency.
async fn engine_with_accounts() -> (Engine, i64, i64, i64, i64) {
    let engine = engine_with_db().await;
    let eur = engine.new_currency("Euro", "EUR", 1.0, "alice").await.unwrap();
    let usd = engine
        .new_currency("Dollar", "USD", 0.5, "alice")
        .await
        .unwrap();
    let cash = engine
        .new_account("Cash", AccountKind::Current, eur.id, 0, "alice")
        .await
        .unwrap();
    let abroad = engine
        .new_account("Abroad", AccountKind::Current, usd.id, 0, "alice")
        .await
        .unwrap();
    (engine, eur.id, usd.id, cash.id, abroad.id)
}

fn draft(kind: OperationKind, amount_minor: i64, account_id: i64, currency_id: i64) -> OperationDraft {
    OperationDraft {
        kind,
        occurred_at: Utc::now(),
        amount_minor,
        comment: None,
        category_id: None,
        account_id,
        currency_id,
        transfer: None,
    }
}

async fn balance(engine: &Engine, account_id: i64) -> i64 {
    engine
        .account(account_id)
        .await
        .unwrap()
        .unwrap()
        .amount_minor
}

#[tokio::test]
async fn income_and_expense_move_the_account_balance() {
    let (engine, eur, _, cash, _) = engine_with_accounts().await;

    engine
        .new_operation(draft(OperationKind::Income, 1000, cash, eur), "alice")
        .await
        .unwrap();
    assert_eq!(balance(&engine, cash).await, 1000);

    engine
        .new_operation(draft(OperationKind::Expense, 200, cash, eur), "alice")
        .await
        .unwrap();
    assert_eq!(balance(&engine, cash).await, 800);
}

#[tokio::test]
async fn delete_reverts_and_restore_reapplies_the_effect() {
    let (engine, eur, _, cash, _) = engine_with_accounts().await;

    engine
        .new_operation(draft(OperationKind::Income, 1000, cash, eur), "alice")
        .await
        .unwrap();
    let expense = engine
        .new_operation(draft(OperationKind::Expense, 200, cash, eur), "alice")
        .await
        .unwrap();
    assert_eq!(balance(&engine, cash).await, 800);

    assert!(engine.delete_operation(expense.id, "alice").await.unwrap());
    assert_eq!(balance(&engine, cash).await, 1000);

    // Second delete is a no-op and must not revert twice.
    assert!(!engine.delete_operation(expense.id, "alice").await.unwrap());
    assert_eq!(balance(&engine, cash).await, 1000);

    engine.restore_operation(expense.id, "alice").await.unwrap();
    assert_eq!(balance(&engine, cash).await, 800);
}

#[tokio::test]
async fn update_rebases_the_balance_effect() {
    let (engine, eur, _, cash, _) = engine_with_accounts().await;

    engine
        .new_operation(draft(OperationKind::Income, 1000, cash, eur), "alice")
        .await
        .unwrap();
    let expense = engine
        .new_operation(draft(OperationKind::Expense, 100, cash, eur), "alice")
        .await
        .unwrap();

    engine
        .update_operation(
            expense.id,
            OperationPatch {
                amount_minor: Some(150),
                comment: Some(Some("bigger lunch".to_string())),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap();

    assert_eq!(balance(&engine, cash).await, 850);
    let row = engine.operation(expense.id).await.unwrap().unwrap();
    assert_eq!(row.amount_minor, 150);
    assert_eq!(row.comment.as_deref(), Some("bigger lunch"));
}

#[tokio::test]
async fn transfer_moves_both_legs_in_their_own_currencies() {
    let (engine, eur, usd, cash, abroad) = engine_with_accounts().await;

    engine
        .new_operation(draft(OperationKind::Income, 1000, cash, eur), "alice")
        .await
        .unwrap();

    let mut transfer = draft(OperationKind::Expense, 250, cash, eur);
    transfer.transfer = Some(TransferLeg {
        to_account_id: abroad,
        to_currency_id: usd,
        to_amount_minor: 500,
    });
    let operation = engine.new_operation(transfer, "alice").await.unwrap();
    assert!(operation.is_transfer());

    assert_eq!(balance(&engine, cash).await, 750);
    assert_eq!(balance(&engine, abroad).await, 500);

    // Voiding the transfer reverts both legs.
    engine.delete_operation(operation.id, "alice").await.unwrap();
    assert_eq!(balance(&engine, cash).await, 1000);
    assert_eq!(balance(&engine, abroad).await, 0);
}

#[tokio::test]
async fn transfer_must_target_a_different_account() {
    let (engine, eur, usd, cash, _) = engine_with_accounts().await;

    let mut transfer = draft(OperationKind::Expense, 250, cash, eur);
    transfer.transfer = Some(TransferLeg {
        to_account_id: cash,
        to_currency_id: usd,
        to_amount_minor: 500,
    });
    let err = engine.new_operation(transfer, "alice").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation {
            field: "to_account_id",
            ..
        }
    ));
}

#[tokio::test]
async fn operation_currency_must_match_the_account() {
    let (engine, _, usd, cash, _) = engine_with_accounts().await;

    let err = engine
        .new_operation(draft(OperationKind::Income, 100, cash, usd), "alice")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation {
            field: "currency_id",
            ..
        }
    ));
    assert_eq!(balance(&engine, cash).await, 0);
}

#[tokio::test]
async fn operations_reject_non_positive_amounts() {
    let (engine, eur, _, cash, _) = engine_with_accounts().await;

    let err = engine
        .new_operation(draft(OperationKind::Income, 0, cash, eur), "alice")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation {
            field: "amount_minor",
            ..
        }
    ));
}

#[tokio::test]
async fn operations_require_active_references() {
    let (engine, eur, _, cash, _) = engine_with_accounts().await;
    engine.delete_account(cash, "alice").await.unwrap();

    let err = engine
        .new_operation(draft(OperationKind::Income, 100, cash, eur), "alice")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("account not exists".to_string()));
}

#[tokio::test]
async fn one_active_budget_per_category() {
    let (engine, eur, _, _, _) = engine_with_accounts().await;
    let food = engine
        .new_category("Food", OperationKind::Expense, CategoryKind::Parent, None, "alice")
        .await
        .unwrap();

    let first = engine
        .new_budget(500_00, eur, Some(food.id), "alice")
        .await
        .unwrap();

    let err = engine
        .new_budget(300_00, eur, Some(food.id), "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    // Unassigned budgets are not constrained.
    engine.new_budget(300_00, eur, None, "alice").await.unwrap();

    // Deleting the holder frees the category; restoring it afterwards must
    // fail while a newer budget occupies the slot.
    engine.delete_budget(first.id, "alice").await.unwrap();
    engine
        .new_budget(400_00, eur, Some(food.id), "alice")
        .await
        .unwrap();
    let err = engine.restore_budget(first.id, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    assert_eq!(
        engine.budget_by_category(food.id).await.unwrap().unwrap().amount_minor,
        400_00
    );
}

#[tokio::test]
async fn budgets_require_existing_references() {
    let (engine, eur, _, _, _) = engine_with_accounts().await;

    let err = engine.new_budget(100_00, 9999, None, "alice").await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("currency not exists".to_string()));

    let err = engine
        .new_budget(100_00, eur, Some(9999), "alice")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("category not exists".to_string()));
}

#[tokio::test]
async fn category_tree_rejects_cycles() {
    let (engine, _, _, _, _) = engine_with_accounts().await;
    let food = engine
        .new_category("Food", OperationKind::Expense, CategoryKind::Parent, None, "alice")
        .await
        .unwrap();
    let lunch = engine
        .new_category(
            "Lunch",
            OperationKind::Expense,
            CategoryKind::Child,
            Some(food.id),
            "alice",
        )
        .await
        .unwrap();

    // food -> lunch would close the loop lunch -> food.
    let err = engine
        .update_category(
            food.id,
            engine::CategoryPatch {
                parent: Some(Some(lunch.id)),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidParent("category must not be its own ancestor".to_string())
    );

    // Self-parenting is the shortest cycle.
    let err = engine
        .update_category(
            food.id,
            engine::CategoryPatch {
                parent: Some(Some(food.id)),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidParent("category must not be its own ancestor".to_string())
    );
}

#[tokio::test]
async fn category_parent_must_be_active() {
    let (engine, _, _, _, _) = engine_with_accounts().await;
    let food = engine
        .new_category("Food", OperationKind::Expense, CategoryKind::Parent, None, "alice")
        .await
        .unwrap();
    engine.delete_category(food.id, "alice").await.unwrap();

    let err = engine
        .new_category(
            "Lunch",
            OperationKind::Expense,
            CategoryKind::Child,
            Some(food.id),
            "alice",
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("category not exists".to_string()));
}

#[tokio::test]
async fn conversion_routes_through_the_main_currency() {
    let engine = engine_with_db().await;
    let eur = engine.new_currency("Euro", "EUR", 1.0, "alice").await.unwrap();
    let usd = engine
        .new_currency("Dollar", "USD", 0.012, "alice")
        .await
        .unwrap();

    assert_eq!(engine.main_currency().await.unwrap().id, eur.id);
    assert!(engine.currency(usd.id).await.unwrap().unwrap().exchange_rate == 0.012);

    // 10000 * 0.012 = 120.0 exactly.
    assert_eq!(engine.convert_to_main(10_000, usd.id).await.unwrap(), 120);

    // Pivot routing: USD -> EUR -> USD stays within one minor unit.
    let roundtrip = engine.convert_between(10_000, usd.id, usd.id).await.unwrap();
    assert_eq!(roundtrip, 10_000);
    let in_eur = engine.convert_between(10_000, usd.id, eur.id).await.unwrap();
    assert_eq!(in_eur, 120);
}

#[tokio::test]
async fn zero_rate_currencies_are_rejected() {
    let engine = engine_with_db().await;
    let err = engine
        .new_currency("Broken", "BRK", 0.0, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRate(_)));

    let eur = engine.new_currency("Euro", "EUR", 1.0, "alice").await.unwrap();
    let err = engine
        .update_currency(
            eur.id,
            engine::CurrencyPatch {
                exchange_rate: Some(-2.0),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRate(_)));
}

#[tokio::test]
async fn accounts_total_converts_open_accounts_only() {
    let (engine, eur, _, cash, abroad) = engine_with_accounts().await;

    engine
        .new_operation(draft(OperationKind::Income, 1000, cash, eur), "alice")
        .await
        .unwrap();
    let usd_currency = engine.currency_by_title("Dollar").await.unwrap().unwrap();
    engine
        .new_operation(
            draft(OperationKind::Income, 500, abroad, usd_currency.id),
            "alice",
        )
        .await
        .unwrap();

    // 1000 EUR + 500 USD @ 0.5 = 1250.
    assert_eq!(engine.accounts_total_in_main().await.unwrap().minor(), 1250);

    assert_eq!(
        engine.accounts_total_in_main().await.unwrap().to_string(),
        "12.50"
    );

    // Closing an account removes it from the total.
    engine
        .update_account(
            abroad,
            engine::AccountPatch {
                closed: Some(true),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap();
    assert_eq!(engine.accounts_total_in_main().await.unwrap().minor(), 1000);
}

#[tokio::test]
async fn operation_listings_filter_by_reference() {
    let (engine, eur, usd, cash, abroad) = engine_with_accounts().await;
    let food = engine
        .new_category("Food", OperationKind::Expense, CategoryKind::Parent, None, "alice")
        .await
        .unwrap();

    engine
        .new_operation(draft(OperationKind::Income, 1000, cash, eur), "alice")
        .await
        .unwrap();
    let mut lunch = draft(OperationKind::Expense, 100, cash, eur);
    lunch.category_id = Some(food.id);
    let lunch = engine.new_operation(lunch, "alice").await.unwrap();
    let mut transfer = draft(OperationKind::Expense, 250, cash, eur);
    transfer.transfer = Some(TransferLeg {
        to_account_id: abroad,
        to_currency_id: usd,
        to_amount_minor: 500,
    });
    engine.new_operation(transfer, "alice").await.unwrap();

    // The destination account sees the transfer too.
    assert_eq!(engine.operations_by_account(abroad).await.unwrap().len(), 1);
    assert_eq!(engine.operations_by_account(cash).await.unwrap().len(), 3);

    let by_category = engine.operations_by_category(food.id).await.unwrap();
    assert_eq!(by_category.len(), 1);
    assert_eq!(by_category[0].id, lunch.id);

    // Deleted operations drop out of the listings.
    engine.delete_operation(lunch.id, "alice").await.unwrap();
    assert!(engine.operations_by_category(food.id).await.unwrap().is_empty());
    assert_eq!(engine.operations().await.unwrap().len(), 2);
    assert_eq!(engine.operations_with_deleted().await.unwrap().len(), 3);
}
