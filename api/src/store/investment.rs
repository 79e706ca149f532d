//! Toy investment module.
//!
//! Each account can hold an investment profile: a separate balance pool
//! funded from the main balance, from which option purchases are made. The
//! profile is created lazily on first funding.

use jiff_sqlx::ToSqlx;
use payloads::{InvestmentOptionId, TransactionKind, responses};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{AuthenticatedAccount, StoreError};
use crate::time::TimeSource;

#[derive(Debug, Clone, FromRow)]
struct DbInvestmentProfile {
    #[allow(unused)]
    account_id: payloads::AccountId,
    balance: Decimal,
    total_invested: Decimal,
    total_returns: Decimal,
}

impl From<DbInvestmentProfile> for responses::InvestmentProfile {
    fn from(profile: DbInvestmentProfile) -> Self {
        Self {
            balance: profile.balance,
            total_invested: profile.total_invested,
            total_returns: profile.total_returns,
        }
    }
}

pub async fn list_options(
    pool: &PgPool,
) -> Result<Vec<responses::InvestmentOption>, StoreError> {
    Ok(sqlx::query_as::<_, responses::InvestmentOption>(
        "SELECT * FROM investment_options ORDER BY name;",
    )
    .fetch_all(pool)
    .await?)
}

pub async fn get_profile(
    account: &AuthenticatedAccount,
    pool: &PgPool,
) -> Result<responses::InvestmentProfile, StoreError> {
    let profile = sqlx::query_as::<_, DbInvestmentProfile>(
        "SELECT account_id, balance, total_invested, total_returns
        FROM investment_profiles WHERE account_id = $1;",
    )
    .bind(account.id())
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::InvestmentProfileNotFound)?;

    Ok(profile.into())
}

/// Lock the profile row, creating it on first use.
async fn get_or_create_profile_for_update_tx(
    account: &AuthenticatedAccount,
    time_source: &TimeSource,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<DbInvestmentProfile, StoreError> {
    sqlx::query(
        "INSERT INTO investment_profiles (account_id, created_at, updated_at)
        VALUES ($1, $2, $2)
        ON CONFLICT (account_id) DO NOTHING;",
    )
    .bind(account.id())
    .bind(time_source.now().to_sqlx())
    .execute(&mut **tx)
    .await?;

    Ok(sqlx::query_as::<_, DbInvestmentProfile>(
        "SELECT account_id, balance, total_invested, total_returns
        FROM investment_profiles WHERE account_id = $1 FOR UPDATE;",
    )
    .bind(account.id())
    .fetch_one(&mut **tx)
    .await?)
}

/// Move funds from the main balance into the investment pool. Creates the
/// profile on first call.
#[tracing::instrument(skip(account, pool, time_source))]
pub async fn fund_profile(
    account: &AuthenticatedAccount,
    amount: Decimal,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::InvestmentProfile, StoreError> {
    if amount <= Decimal::ZERO {
        return Err(StoreError::AmountMustBePositive);
    }

    let mut tx = pool.begin().await?;

    let _ = get_or_create_profile_for_update_tx(account, time_source, &mut tx)
        .await?;

    let balance = super::lock_balance_tx(&account.id(), &mut tx).await?;
    if balance.available_balance < amount {
        return Err(StoreError::InsufficientBalance);
    }

    super::apply_balance_delta_tx(&account.id(), -amount, time_source, &mut tx)
        .await?;

    let profile = sqlx::query_as::<_, DbInvestmentProfile>(
        "UPDATE investment_profiles
        SET balance = balance + $1, updated_at = $2
        WHERE account_id = $3
        RETURNING account_id, balance, total_invested, total_returns;",
    )
    .bind(amount)
    .bind(time_source.now().to_sqlx())
    .bind(account.id())
    .fetch_one(&mut *tx)
    .await?;

    super::insert_ledger_entry_tx(
        &account.id(),
        -amount,
        TransactionKind::Transfer,
        &format!("INV-{}", Uuid::new_v4().simple()),
        time_source,
        &mut tx,
    )
    .await?;

    tx.commit().await?;

    Ok(profile.into())
}

/// Buy units of an option out of the investment pool at the current unit
/// price.
#[tracing::instrument(skip(account, pool, time_source))]
pub async fn buy_option(
    account: &AuthenticatedAccount,
    option_id: &InvestmentOptionId,
    amount: Decimal,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::InvestmentHolding, StoreError> {
    if amount <= Decimal::ZERO {
        return Err(StoreError::AmountMustBePositive);
    }

    let mut tx = pool.begin().await?;

    let option = sqlx::query_as::<_, responses::InvestmentOption>(
        "SELECT * FROM investment_options WHERE id = $1;",
    )
    .bind(option_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::InvestmentOptionNotFound)?;

    let profile = sqlx::query_as::<_, DbInvestmentProfile>(
        "SELECT account_id, balance, total_invested, total_returns
        FROM investment_profiles WHERE account_id = $1 FOR UPDATE;",
    )
    .bind(account.id())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::InvestmentProfileNotFound)?;

    if profile.balance < amount {
        return Err(StoreError::InsufficientBalance);
    }

    sqlx::query(
        "UPDATE investment_profiles
        SET balance = balance - $1,
            total_invested = total_invested + $1,
            updated_at = $2
        WHERE account_id = $3;",
    )
    .bind(amount)
    .bind(time_source.now().to_sqlx())
    .bind(account.id())
    .execute(&mut *tx)
    .await?;

    let units = (amount / option.unit_price).round_dp(8);
    let holding = sqlx::query_as::<_, responses::InvestmentHolding>(
        "INSERT INTO investment_holdings (
            account_id,
            option_id,
            units,
            amount_invested,
            unit_price_at_purchase,
            created_at
        ) VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, option_id, $7::text AS option_name, units,
            amount_invested, unit_price_at_purchase, created_at;",
    )
    .bind(account.id())
    .bind(option_id)
    .bind(units)
    .bind(amount)
    .bind(option.unit_price)
    .bind(time_source.now().to_sqlx())
    .bind(&option.name)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Account {} bought {} units of {}",
        account.id(),
        units,
        option.name
    );

    Ok(holding)
}

pub async fn list_holdings(
    account: &AuthenticatedAccount,
    pool: &PgPool,
) -> Result<Vec<responses::InvestmentHolding>, StoreError> {
    Ok(sqlx::query_as::<_, responses::InvestmentHolding>(
        "SELECT h.id, h.option_id, o.name AS option_name, h.units,
            h.amount_invested, h.unit_price_at_purchase, h.created_at
        FROM investment_holdings h
        JOIN investment_options o ON h.option_id = o.id
        WHERE h.account_id = $1
        ORDER BY h.created_at DESC;",
    )
    .bind(account.id())
    .fetch_all(pool)
    .await?)
}
