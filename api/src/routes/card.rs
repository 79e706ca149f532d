use actix_identity::Identity;
use actix_web::{HttpResponse, get, post, web};
use payloads::requests;
use sqlx::PgPool;

use crate::store;
use crate::time::TimeSource;

use super::{APIError, get_authenticated_account, get_user_id};

#[tracing::instrument(skip(user, pool, time_source), ret)]
#[post("/create_card")]
pub async fn create_card(
    user: Identity,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    let card =
        store::card::create_card(&account, &pool, &time_source).await?;

    Ok(HttpResponse::Ok().json(card))
}

#[tracing::instrument(skip(user, pool), ret)]
#[get("/get_card")]
pub async fn get_card(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    let card = store::card::get_card(&account, &pool).await?;

    Ok(HttpResponse::Ok().json(card))
}

#[tracing::instrument(skip(user, pool, time_source), ret)]
#[post("/set_card_frozen")]
pub async fn set_card_frozen(
    user: Identity,
    details: web::Json<requests::SetCardFrozen>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    let card = store::card::set_card_frozen(
        &account,
        details.frozen,
        &pool,
        &time_source,
    )
    .await?;

    Ok(HttpResponse::Ok().json(card))
}

#[tracing::instrument(skip(user, pool, time_source), ret)]
#[post("/fund_card")]
pub async fn fund_card(
    user: Identity,
    details: web::Json<requests::FundCard>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    let card = store::card::fund_card(
        &account,
        details.amount,
        &pool,
        &time_source,
    )
    .await?;

    Ok(HttpResponse::Ok().json(card))
}
