pub mod account;
pub mod card;
pub mod investment;
pub mod login;
pub mod transfer;

use actix_identity::Identity;
use actix_web::{
    HttpResponse, Responder, ResponseError, body::BoxBody,
    dev::HttpServiceFactory, get, web,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{self, StoreError};

pub fn api_services() -> impl HttpServiceFactory {
    web::scope("/api")
        .service(health_check)
        .service(login::login)
        .service(login::login_check)
        .service(login::logout)
        .service(login::create_account)
        .service(login::change_password)
        .service(login::user_profile)
        .service(account::get_balance)
        .service(account::get_transactions)
        .service(account::lookup_account)
        .service(transfer::initiate_transfer)
        .service(transfer::get_transfer_intent)
        .service(transfer::confirm_transfer)
        .service(transfer::cancel_transfer_intent)
        .service(card::create_card)
        .service(card::get_card)
        .service(card::set_card_frozen)
        .service(card::fund_card)
        .service(investment::list_investment_options)
        .service(investment::get_investment_profile)
        .service(investment::fund_investment)
        .service(investment::buy_investment)
        .service(investment::list_investment_holdings)
}

#[get("/health_check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("healthy")
}

#[derive(Debug, thiserror::Error)]
pub enum APIError {
    #[error("Authentication failed")]
    AuthError(#[source] anyhow::Error),
    #[error("Bad request")]
    BadRequest(#[source] anyhow::Error),
    #[error("Not found")]
    NotFound(#[source] anyhow::Error),
    #[error("Conflict")]
    Conflict(#[source] anyhow::Error),
    #[error("Something went wrong")]
    UnexpectedError(#[from] anyhow::Error),
}

impl ResponseError for APIError {
    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            Self::AuthError(e) => {
                HttpResponse::Unauthorized().body(format!("{self}: {e}"))
            }
            Self::BadRequest(e) => {
                HttpResponse::BadRequest().body(format!("{self}: {e}"))
            }
            Self::NotFound(e) => {
                HttpResponse::NotFound().body(format!("{self}: {e}"))
            }
            Self::Conflict(e) => {
                HttpResponse::Conflict().body(format!("{self}: {e}"))
            }
            Self::UnexpectedError(_) => {
                HttpResponse::InternalServerError().body(self.to_string())
            }
        }
    }
}

/// Map store failures onto the client-visible failure classes: validation
/// (400), missing resource (404), conflict safe to re-query (409), and infra
/// (500). Insufficient funds is terminal validation, not conflict.
impl From<StoreError> for APIError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(_) => APIError::UnexpectedError(e.into()),
            StoreError::UnexpectedError(_) => {
                APIError::UnexpectedError(e.into())
            }
            StoreError::UserNotFound => APIError::NotFound(e.into()),
            StoreError::AccountNotFound => APIError::NotFound(e.into()),
            StoreError::IntentNotFound => APIError::NotFound(e.into()),
            StoreError::CardNotFound => APIError::NotFound(e.into()),
            StoreError::InvestmentProfileNotFound => {
                APIError::NotFound(e.into())
            }
            StoreError::InvestmentOptionNotFound => {
                APIError::NotFound(e.into())
            }
            StoreError::IntentAlreadyCompleted => APIError::Conflict(e.into()),
            StoreError::CardAlreadyExists => APIError::Conflict(e.into()),
            _ => APIError::BadRequest(e.into()),
        }
    }
}

fn get_user_id(user: &Identity) -> Result<payloads::UserId, APIError> {
    let id_str = user.id().map_err(|e| {
        APIError::AuthError(
            anyhow::Error::from(e).context("Invalid login session"),
        )
    })?;
    // special case: since this is used in so many routes, the user_id is
    // recorded here, but attaches to the span for the api route itself
    tracing::Span::current()
        .record("user_id", tracing::field::display(&id_str));
    Ok(payloads::UserId(
        Uuid::parse_str(&id_str).map_err(anyhow::Error::from)?,
    ))
}

async fn get_authenticated_account(
    user_id: &payloads::UserId,
    pool: &PgPool,
) -> Result<store::AuthenticatedAccount, APIError> {
    let result = store::get_authenticated_account(user_id, pool).await;
    match result {
        Ok(account) => Ok(account),
        Err(e) => Err(match e {
            // a session without an account row is not a usable session
            StoreError::AccountNotFound => APIError::AuthError(
                anyhow::Error::from(e)
                    .context("Couldn't resolve the session's account"),
            ),
            _ => APIError::UnexpectedError(e.into()),
        }),
    }
}
