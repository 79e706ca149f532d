//! Virtual card operations.
//!
//! One card per account. The card keeps its own spendable balance, funded
//! only by an atomic transfer out of the main balance, so the sum of main
//! and card balances is conserved.

use jiff::Timestamp;
use jiff_sqlx::{Timestamp as SqlxTs, ToSqlx};
use payloads::{TransactionKind, responses};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{AuthenticatedAccount, StoreError, random_digits};
use crate::time::TimeSource;

const CARD_NUMBER_LEN: usize = 16;
const CARD_VALIDITY_YEARS: i16 = 4;

#[derive(Debug, Clone, FromRow)]
struct DbCard {
    #[allow(unused)]
    account_id: payloads::AccountId,
    card_number: String,
    expiry_month: i16,
    expiry_year: i16,
    cvv: String,
    frozen: bool,
    balance: Decimal,
    #[sqlx(try_from = "SqlxTs")]
    created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    #[allow(unused)]
    updated_at: Timestamp,
}

impl From<DbCard> for responses::Card {
    fn from(card: DbCard) -> Self {
        Self {
            card_number: card.card_number,
            expiry_month: card.expiry_month,
            expiry_year: card.expiry_year,
            cvv: card.cvv,
            frozen: card.frozen,
            balance: card.balance,
            created_at: card.created_at,
        }
    }
}

/// Issue the account's virtual card. Fails if one already exists.
#[tracing::instrument(skip(account, pool, time_source))]
pub async fn create_card(
    account: &AuthenticatedAccount,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::Card, StoreError> {
    let now = time_source.now();
    let issued = now.to_zoned(jiff::tz::TimeZone::UTC);

    let result = sqlx::query_as::<_, DbCard>(
        "INSERT INTO cards (
            account_id,
            card_number,
            expiry_month,
            expiry_year,
            cvv,
            created_at,
            updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING *;",
    )
    .bind(account.id())
    .bind(random_digits(CARD_NUMBER_LEN))
    .bind(issued.month() as i16)
    .bind(issued.year() + CARD_VALIDITY_YEARS)
    .bind(random_digits(3))
    .bind(now.to_sqlx())
    .fetch_one(pool)
    .await;

    match result.map_err(StoreError::from) {
        Ok(card) => {
            tracing::info!("Issued card for account {}", account.id());
            Ok(card.into())
        }
        Err(StoreError::NotUnique(_)) => Err(StoreError::CardAlreadyExists),
        Err(e) => Err(e),
    }
}

pub async fn get_card(
    account: &AuthenticatedAccount,
    pool: &PgPool,
) -> Result<responses::Card, StoreError> {
    let card = sqlx::query_as::<_, DbCard>(
        "SELECT * FROM cards WHERE account_id = $1;",
    )
    .bind(account.id())
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::CardNotFound)?;

    Ok(card.into())
}

#[tracing::instrument(skip(account, pool, time_source))]
pub async fn set_card_frozen(
    account: &AuthenticatedAccount,
    frozen: bool,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::Card, StoreError> {
    let card = sqlx::query_as::<_, DbCard>(
        "UPDATE cards
        SET frozen = $1, updated_at = $2
        WHERE account_id = $3
        RETURNING *;",
    )
    .bind(frozen)
    .bind(time_source.now().to_sqlx())
    .bind(account.id())
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::CardNotFound)?;

    Ok(card.into())
}

/// Move funds from the main balance onto the card.
///
/// Both rows are locked in one transaction; the sufficiency check happens
/// under the lock, and a ledger row records the debit from the main balance.
#[tracing::instrument(skip(account, pool, time_source))]
pub async fn fund_card(
    account: &AuthenticatedAccount,
    amount: Decimal,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::Card, StoreError> {
    if amount <= Decimal::ZERO {
        return Err(StoreError::AmountMustBePositive);
    }

    let mut tx = pool.begin().await?;

    let card = sqlx::query_as::<_, DbCard>(
        "SELECT * FROM cards WHERE account_id = $1 FOR UPDATE;",
    )
    .bind(account.id())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::CardNotFound)?;

    if card.frozen {
        return Err(StoreError::CardFrozen);
    }

    let balance = super::lock_balance_tx(&account.id(), &mut tx).await?;
    if balance.available_balance < amount {
        return Err(StoreError::InsufficientBalance);
    }

    super::apply_balance_delta_tx(&account.id(), -amount, time_source, &mut tx)
        .await?;

    let card = sqlx::query_as::<_, DbCard>(
        "UPDATE cards
        SET balance = balance + $1, updated_at = $2
        WHERE account_id = $3
        RETURNING *;",
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
        &format!("CARD-{}", Uuid::new_v4().simple()),
        time_source,
        &mut tx,
    )
    .await?;

    tx.commit().await?;

    Ok(card.into())
}
