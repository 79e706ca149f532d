use actix_identity::Identity;
use actix_web::{HttpResponse, get, post, web};
use payloads::requests;
use sqlx::PgPool;

use crate::store;
use crate::time::TimeSource;

use super::{APIError, get_authenticated_account, get_user_id};

#[tracing::instrument(skip(user, pool), ret)]
#[get("/list_investment_options")]
pub async fn list_investment_options(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let _ = get_authenticated_account(&user_id, &pool).await?;

    let options = store::investment::list_options(&pool).await?;

    Ok(HttpResponse::Ok().json(options))
}

#[tracing::instrument(skip(user, pool), ret)]
#[get("/get_investment_profile")]
pub async fn get_investment_profile(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    let profile = store::investment::get_profile(&account, &pool).await?;

    Ok(HttpResponse::Ok().json(profile))
}

#[tracing::instrument(skip(user, pool, time_source), ret)]
#[post("/fund_investment")]
pub async fn fund_investment(
    user: Identity,
    details: web::Json<requests::FundInvestment>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    let profile = store::investment::fund_profile(
        &account,
        details.amount,
        &pool,
        &time_source,
    )
    .await?;

    Ok(HttpResponse::Ok().json(profile))
}

#[tracing::instrument(skip(user, pool, time_source), ret)]
#[post("/buy_investment")]
pub async fn buy_investment(
    user: Identity,
    details: web::Json<requests::BuyInvestment>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    let holding = store::investment::buy_option(
        &account,
        &details.option_id,
        details.amount,
        &pool,
        &time_source,
    )
    .await?;

    Ok(HttpResponse::Ok().json(holding))
}

#[tracing::instrument(skip(user, pool), ret)]
#[get("/list_investment_holdings")]
pub async fn list_investment_holdings(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let account = get_authenticated_account(&user_id, &pool).await?;

    let holdings =
        store::investment::list_holdings(&account, &pool).await?;

    Ok(HttpResponse::Ok().json(holdings))
}
