use actix_identity::Identity;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, get, post, web};
use secrecy::SecretBox;
use sqlx::PgPool;

use crate::password::{
    AuthError, Credentials, NewUserDetails, change_password as set_password,
    create_user, validate_credentials,
};
use crate::store;
use crate::time::TimeSource;

use super::{APIError, get_authenticated_account, get_user_id};

#[tracing::instrument(
    skip(credentials, pool),
    fields(username=tracing::field::Empty, user_id=tracing::field::Empty),
    ret,
)]
#[post("/login")]
pub async fn login(
    request: HttpRequest,
    credentials: web::Json<Credentials>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    tracing::Span::current()
        .record("username", tracing::field::display(&credentials.username));
    match validate_credentials(credentials.0, &pool).await {
        Ok(user_id) => {
            tracing::Span::current()
                .record("user_id", tracing::field::display(&user_id));
            Identity::login(&request.extensions(), user_id.to_string())
                .map_err(|e| APIError::UnexpectedError(e.into()))?;
            Ok(HttpResponse::Ok().finish())
        }
        Err(e) => {
            let e = match e {
                AuthError::InvalidCredentials(_) => {
                    APIError::AuthError(e.into())
                }
                AuthError::UnexpectedError(_) => {
                    APIError::UnexpectedError(e.into())
                }
            };
            Err(e)
        }
    }
}

#[tracing::instrument(skip(user))]
#[post("/login_check")]
pub async fn login_check(user: Identity) -> Result<HttpResponse, APIError> {
    get_user_id(&user)?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user))]
#[post("/logout")]
pub async fn logout(user: Identity) -> Result<HttpResponse, APIError> {
    let _ = get_user_id(&user); // to instrument the user_id, if exists
    user.logout();
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(new_user_details, pool, time_source))]
#[post("/create_account")]
pub async fn create_account(
    new_user_details: web::Json<NewUserDetails>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    create_user(new_user_details.0, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().finish())
}

#[derive(serde::Deserialize)]
pub struct ChangePasswordRequest {
    current_password: SecretBox<String>,
    new_password: SecretBox<String>,
}

#[tracing::instrument(skip(user, request, pool))]
#[post("/change_password")]
pub async fn change_password(
    user: Identity,
    mut request: web::Json<ChangePasswordRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let user_data = store::read_user(&pool, &user_id).await?;

    // Re-verify the current password before accepting the change
    let current_password = std::mem::replace(
        &mut request.current_password,
        SecretBox::new(Box::new(String::new())),
    );
    let credentials =
        Credentials::new(user_data.username, current_password);
    validate_credentials(credentials, &pool).await.map_err(
        |e| match e {
            AuthError::InvalidCredentials(_) => APIError::AuthError(e.into()),
            AuthError::UnexpectedError(_) => {
                APIError::UnexpectedError(e.into())
            }
        },
    )?;

    let new_password = std::mem::replace(
        &mut request.new_password,
        SecretBox::new(Box::new(String::new())),
    );
    set_password(user_id, new_password, &pool)
        .await
        .map_err(APIError::UnexpectedError)?;

    let response = payloads::responses::SuccessMessage {
        message: "Password has been changed successfully.".to_string(),
    };

    Ok(HttpResponse::Ok().json(response))
}

#[tracing::instrument(skip(user, pool))]
#[get("/user_profile")]
pub async fn user_profile(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let user_data = store::read_user(&pool, &user_id).await?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    let profile = payloads::responses::UserProfile {
        user_id: user_data.id,
        username: user_data.username,
        email: user_data.email,
        account_number: account.account_number().to_string(),
    };

    Ok(HttpResponse::Ok().json(profile))
}
