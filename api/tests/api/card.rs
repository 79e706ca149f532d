use payloads::requests;
use reqwest::StatusCode;
use rust_decimal::{Decimal, dec};
use test_helpers::{assert_status_code, spawn_app};

#[tokio::test]
async fn test_create_card() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let card = app.client.create_card().await?;

    assert_eq!(card.card_number.len(), 16);
    assert_eq!(card.cvv.len(), 3);
    assert!(!card.frozen);
    assert_eq!(card.balance, Decimal::ZERO);
    // Four years of validity from the mocked 2025 clock
    assert_eq!(card.expiry_year, 2029);
    assert_eq!(card.expiry_month, 1);

    let fetched = app.client.get_card().await?;
    assert_eq!(fetched, card);

    Ok(())
}

#[tokio::test]
async fn test_second_card_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    app.client.create_card().await?;
    let result = app.client.create_card().await;

    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn test_get_card_before_creation() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let result = app.client.get_card().await;

    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_fund_card_moves_balance() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.credit_account("alice", dec!(100)).await?;
    app.client.create_card().await?;

    let card = app
        .client
        .fund_card(&requests::FundCard { amount: dec!(40) })
        .await?;

    // Main and card balances stay conserved
    assert_eq!(card.balance, dec!(40));
    assert_eq!(app.balance_of("alice").await?, (dec!(60), dec!(60)));

    // The debit shows up in the ledger
    let transactions = app
        .client
        .get_transactions(&requests::GetTransactions {
            limit: 10,
            offset: 0,
        })
        .await?;
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].amount, dec!(-40));
    assert!(transactions[0].reference_id.starts_with("CARD-"));

    Ok(())
}

#[tokio::test]
async fn test_fund_card_insufficient_balance() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.credit_account("alice", dec!(10)).await?;
    app.client.create_card().await?;

    let result = app
        .client
        .fund_card(&requests::FundCard { amount: dec!(40) })
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);
    assert_eq!(app.balance_of("alice").await?, (dec!(10), dec!(10)));
    let card = app.client.get_card().await?;
    assert_eq!(card.balance, Decimal::ZERO);

    Ok(())
}

#[tokio::test]
async fn test_frozen_card_cannot_be_funded() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.credit_account("alice", dec!(100)).await?;
    app.client.create_card().await?;

    let card = app
        .client
        .set_card_frozen(&requests::SetCardFrozen { frozen: true })
        .await?;
    assert!(card.frozen);

    let result = app
        .client
        .fund_card(&requests::FundCard { amount: dec!(40) })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // Unfreeze and retry
    app.client
        .set_card_frozen(&requests::SetCardFrozen { frozen: false })
        .await?;
    let card = app
        .client
        .fund_card(&requests::FundCard { amount: dec!(40) })
        .await?;
    assert_eq!(card.balance, dec!(40));

    Ok(())
}
