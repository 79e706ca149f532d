use payloads::requests;
use reqwest::StatusCode;
use rust_decimal::{Decimal, dec};
use test_helpers::{assert_status_code, spawn_app};

#[tokio::test]
async fn test_list_seeded_options() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let options = app.client.list_investment_options().await?;

    assert_eq!(options.len(), 3);
    // Ordered by name
    assert_eq!(options[0].name, "Government Bond Fund");
    assert_eq!(options[1].name, "Index Equity Fund");
    assert_eq!(options[2].name, "Money Market Fund");
    assert!(options.iter().all(|o| o.unit_price > Decimal::ZERO));

    Ok(())
}

#[tokio::test]
async fn test_profile_missing_before_funding() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let result = app.client.get_investment_profile().await;

    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_fund_creates_profile_and_moves_balance() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.credit_account("alice", dec!(100)).await?;

    let profile = app
        .client
        .fund_investment(&requests::FundInvestment { amount: dec!(60) })
        .await?;

    assert_eq!(profile.balance, dec!(60));
    assert_eq!(profile.total_invested, Decimal::ZERO);
    assert_eq!(app.balance_of("alice").await?, (dec!(40), dec!(40)));

    // The debit shows up in the main ledger
    let transactions = app
        .client
        .get_transactions(&requests::GetTransactions {
            limit: 10,
            offset: 0,
        })
        .await?;
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].amount, dec!(-60));
    assert!(transactions[0].reference_id.starts_with("INV-"));

    Ok(())
}

#[tokio::test]
async fn test_fund_insufficient_balance() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.credit_account("alice", dec!(10)).await?;

    let result = app
        .client
        .fund_investment(&requests::FundInvestment { amount: dec!(60) })
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);
    assert_eq!(app.balance_of("alice").await?, (dec!(10), dec!(10)));

    Ok(())
}

#[tokio::test]
async fn test_buy_option() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.credit_account("alice", dec!(100)).await?;
    app.client
        .fund_investment(&requests::FundInvestment { amount: dec!(100) })
        .await?;

    let options = app.client.list_investment_options().await?;
    let equity = options
        .iter()
        .find(|o| o.name == "Index Equity Fund")
        .unwrap();

    let holding = app
        .client
        .buy_investment(&requests::BuyInvestment {
            option_id: equity.id,
            amount: dec!(50),
        })
        .await?;

    // 50 at 25.00 per unit
    assert_eq!(holding.units, dec!(2));
    assert_eq!(holding.amount_invested, dec!(50));
    assert_eq!(holding.unit_price_at_purchase, equity.unit_price);

    let profile = app.client.get_investment_profile().await?;
    assert_eq!(profile.balance, dec!(50));
    assert_eq!(profile.total_invested, dec!(50));

    let holdings = app.client.list_investment_holdings().await?;
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].option_name, "Index Equity Fund");

    Ok(())
}

#[tokio::test]
async fn test_buy_exceeding_pool_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.credit_account("alice", dec!(100)).await?;
    app.client
        .fund_investment(&requests::FundInvestment { amount: dec!(30) })
        .await?;

    let options = app.client.list_investment_options().await?;

    let result = app
        .client
        .buy_investment(&requests::BuyInvestment {
            option_id: options[0].id,
            amount: dec!(50),
        })
        .await;

    // Buying is limited to the investment pool; the main balance is not
    // touched implicitly
    assert_status_code(result, StatusCode::BAD_REQUEST);
    let profile = app.client.get_investment_profile().await?;
    assert_eq!(profile.balance, dec!(30));
    assert!(app.client.list_investment_holdings().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_buy_unknown_option() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.credit_account("alice", dec!(100)).await?;
    app.client
        .fund_investment(&requests::FundInvestment { amount: dec!(100) })
        .await?;

    let result = app
        .client
        .buy_investment(&requests::BuyInvestment {
            option_id: payloads::InvestmentOptionId(uuid::Uuid::new_v4()),
            amount: dec!(10),
        })
        .await;

    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}
