use actix_identity::Identity;
use actix_web::{HttpResponse, post, web};
use payloads::requests;
use sqlx::PgPool;

use crate::store;
use crate::time::TimeSource;

use super::{APIError, get_authenticated_account, get_user_id};

/// Record a pending over-the-counter intent and return the QR payload.
#[tracing::instrument(skip(user, pool, time_source), ret)]
#[post("/initiate_transfer")]
pub async fn initiate_transfer(
    user: Identity,
    details: web::Json<requests::InitiateTransfer>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    let intent = store::transfer::create_intent(
        &account,
        details.kind,
        details.amount,
        &pool,
        &time_source,
    )
    .await?;

    Ok(HttpResponse::Ok().json(intent))
}

/// Fetch an intent after scanning, so the confirmation screen can display
/// the operation before the counterparty commits to it.
#[tracing::instrument(skip(user, pool), ret)]
#[post("/get_transfer_intent")]
pub async fn get_transfer_intent(
    user: Identity,
    details: web::Json<requests::GetTransferIntent>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let _ = get_authenticated_account(&user_id, &pool).await?;

    let intent =
        store::transfer::get_intent(&details.reference, &pool).await?;

    Ok(HttpResponse::Ok().json(intent))
}

/// Settle a scanned intent: both balance updates and both ledger legs commit
/// atomically or not at all.
#[tracing::instrument(skip(user, pool, time_source), ret)]
#[post("/confirm_transfer")]
pub async fn confirm_transfer(
    user: Identity,
    details: web::Json<requests::ConfirmTransfer>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    let receipt = store::transfer::confirm_transfer(
        &account,
        &details.reference,
        &pool,
        &time_source,
    )
    .await?;

    Ok(HttpResponse::Ok().json(receipt))
}

#[tracing::instrument(skip(user, pool, time_source))]
#[post("/cancel_transfer_intent")]
pub async fn cancel_transfer_intent(
    user: Identity,
    details: web::Json<requests::CancelTransferIntent>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    store::transfer::cancel_intent(
        &account,
        &details.reference,
        &pool,
        &time_source,
    )
    .await?;

    Ok(HttpResponse::Ok().finish())
}
