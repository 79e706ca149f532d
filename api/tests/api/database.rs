//! Some basic database tests.
//!
//! Though api::store defines its own level of API interface, most tests are
//! at the http route level.

use api::store::{self, StoreError};
use rust_decimal::dec;

use test_helpers::spawn_app;

#[tokio::test]
async fn test_create_user_with_account() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let conn = &app.db_pool;

    let user = store::create_user_with_account(
        conn,
        "dave",
        "dave@example.com",
        "hashed_pw",
        &app.time_source,
    )
    .await?;
    assert_eq!(user.username, "dave");

    // Account and zero balance rows exist
    let account = store::get_authenticated_account(&user.id, conn).await?;
    assert_eq!(account.account_number().len(), 12);
    let balance = store::get_balance(&account, conn).await?;
    assert_eq!(balance.available_balance, dec!(0));
    assert_eq!(balance.total_balance, dec!(0));

    // check that we get a unique constraint error for the same username
    let result = store::create_user_with_account(
        conn,
        "dave",
        "dave2@example.com",
        "hashed_pw",
        &app.time_source,
    )
    .await;
    assert!(matches!(result, Err(StoreError::NotUnique(_))));

    Ok(())
}

#[tokio::test]
async fn test_username_validation_at_store_level() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let result = store::create_user_with_account(
        &app.db_pool,
        "no spaces allowed",
        "spaces@example.com",
        "hashed_pw",
        &app.time_source,
    )
    .await;
    assert!(matches!(result, Err(StoreError::InvalidUsername)));

    Ok(())
}

/// The database CHECK constraint is the last line of defense for the
/// non-negative invariant, independent of the application's locked checks.
#[tokio::test]
async fn test_negative_balance_rejected_by_database() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let result = sqlx::query(
        "UPDATE balances SET available_balance = -1
        WHERE account_id = (
            SELECT a.id FROM accounts a
            JOIN users u ON a.user_id = u.id
            WHERE u.username = 'alice'
        )",
    )
    .execute(&app.db_pool)
    .await;

    assert!(result.is_err());

    Ok(())
}
