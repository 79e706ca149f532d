use jiff::Span;
use payloads::{TransactionKind, requests};
use reqwest::StatusCode;
use rust_decimal::{Decimal, dec};
use test_helpers::{assert_status_code, spawn_app};

#[tokio::test]
async fn test_new_account_has_zero_balance() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let balance = app.client.get_balance().await?;
    assert_eq!(balance.available_balance, Decimal::ZERO);
    assert_eq!(balance.total_balance, Decimal::ZERO);

    Ok(())
}

#[tokio::test]
async fn test_lookup_account_by_number() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_two_person_bank().await?;

    let bob_number = app.account_number_of("bob").await?;
    let identity = app
        .client
        .lookup_account(&requests::LookupAccount {
            account_number: bob_number.clone(),
        })
        .await?;

    assert_eq!(identity.account_number, bob_number);
    assert_eq!(identity.username, "bob");

    Ok(())
}

#[tokio::test]
async fn test_lookup_unknown_account_number() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let result = app
        .client
        .lookup_account(&requests::LookupAccount {
            account_number: "000000000000".into(),
        })
        .await;

    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_transaction_history_newest_first() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_two_person_bank().await?;
    app.credit_account("bob", dec!(100)).await?;

    // Two settled transfers to Alice, who initiates and renders the QR both
    // times while Bob confirms. Advance the mocked clock between them so the
    // ledger ordering is well-defined.
    for amount in [dec!(10), dec!(25)] {
        app.time_source.advance(Span::new().minutes(1));
        app.login_alice().await?;
        let intent = app
            .client
            .initiate_transfer(&requests::InitiateTransfer {
                kind: TransactionKind::Transfer,
                amount,
            })
            .await?;
        app.login_bob().await?;
        app.client
            .confirm_transfer(&requests::ConfirmTransfer {
                reference: intent.reference,
            })
            .await?;
    }

    app.login_alice().await?;
    let transactions = app
        .client
        .get_transactions(&requests::GetTransactions {
            limit: 10,
            offset: 0,
        })
        .await?;

    assert_eq!(transactions.len(), 2);
    // Newest first
    assert_eq!(transactions[0].amount, dec!(25));
    assert_eq!(transactions[1].amount, dec!(10));
    assert!(
        transactions
            .iter()
            .all(|t| t.kind == TransactionKind::Transfer)
    );

    // Pagination
    let page = app
        .client
        .get_transactions(&requests::GetTransactions {
            limit: 1,
            offset: 1,
        })
        .await?;
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].amount, dec!(10));

    Ok(())
}
