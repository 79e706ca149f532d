use payloads::requests;
use reqwest::StatusCode;
use test_helpers::{
    alice_credentials, alice_login_credentials, assert_status_code, spawn_app,
};

#[tokio::test]
async fn test_register_and_login() -> anyhow::Result<()> {
    let app = spawn_app().await;

    app.client.create_account(&alice_credentials()).await?;
    assert!(!app.client.login_check().await?);

    app.client.login(&alice_login_credentials()).await?;
    assert!(app.client.login_check().await?);

    app.client.logout().await?;
    assert!(!app.client.login_check().await?);

    Ok(())
}

#[tokio::test]
async fn test_login_wrong_password() -> anyhow::Result<()> {
    let app = spawn_app().await;

    app.client.create_account(&alice_credentials()).await?;

    let result = app
        .client
        .login(&requests::LoginCredentials {
            username: "alice".into(),
            password: "not-the-password".into(),
        })
        .await;

    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_login_unknown_username() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let result = app.client.login(&alice_login_credentials()).await;

    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_username_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;

    app.client.create_account(&alice_credentials()).await?;

    let mut duplicate = alice_credentials();
    duplicate.email = "alice2@example.com".into();
    let result = app.client.create_account(&duplicate).await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_invalid_username_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let result = app
        .client
        .create_account(&requests::CreateAccount {
            username: "7starts_with_digit".into(),
            password: "password123".into(),
            email: "digit@example.com".into(),
        })
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_profile_includes_account_number() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let profile = app.client.user_profile().await?;
    assert_eq!(profile.username, "alice");
    assert_eq!(profile.email, "alice@example.com");

    // The account number is the display handle rendered into QR codes
    let expected = app.account_number_of("alice").await?;
    assert_eq!(profile.account_number, expected);
    assert_eq!(profile.account_number.len(), 12);

    Ok(())
}

#[tokio::test]
async fn test_change_password() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    app.client
        .change_password(&requests::ChangePassword {
            current_password: alice_credentials().password,
            new_password: "evenmoresecret".into(),
        })
        .await?;

    // Old password no longer works
    app.client.logout().await?;
    let old_login = app.client.login(&alice_login_credentials()).await;
    assert_status_code(old_login, StatusCode::UNAUTHORIZED);

    // New one does
    app.client
        .login(&requests::LoginCredentials {
            username: "alice".into(),
            password: "evenmoresecret".into(),
        })
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_change_password_requires_current_password() -> anyhow::Result<()>
{
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let result = app
        .client
        .change_password(&requests::ChangePassword {
            current_password: "wrong".into(),
            new_password: "evenmoresecret".into(),
        })
        .await;

    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_routes_require_login() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let result = app.client.get_balance().await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}
