use actix_identity::Identity;
use actix_web::{HttpResponse, get, post, web};
use payloads::requests;
use sqlx::PgPool;

use crate::store;

use super::{APIError, get_authenticated_account, get_user_id};

#[tracing::instrument(skip(user, pool), ret)]
#[get("/get_balance")]
pub async fn get_balance(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    let balance = store::get_balance(&account, &pool).await?;

    Ok(HttpResponse::Ok().json(balance))
}

#[tracing::instrument(skip(user, pool), ret)]
#[post("/get_transactions")]
pub async fn get_transactions(
    user: Identity,
    details: web::Json<requests::GetTransactions>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    let transactions = store::list_transactions(
        &account,
        details.limit,
        details.offset,
        &pool,
    )
    .await?;

    Ok(HttpResponse::Ok().json(transactions))
}

/// Resolve a scanned account number to a display identity.
#[tracing::instrument(skip(user, pool), ret)]
#[post("/lookup_account")]
pub async fn lookup_account(
    user: Identity,
    details: web::Json<requests::LookupAccount>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let _ = get_authenticated_account(&user_id, &pool).await?;

    let identity =
        store::get_account_identity(&details.account_number, &pool).await?;

    Ok(HttpResponse::Ok().json(identity))
}
