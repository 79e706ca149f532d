//! Database store module for the Vaultline API
//!
//! ## Design Decisions
//!
//! ### Balance mutation discipline
//! - **Row locks, not read-modify-write**: every debit locks the balance row
//!   with `SELECT ... FOR UPDATE` before checking sufficiency, so the check
//!   and the update are atomic. Two confirmations racing on the same account
//!   serialize on the row lock; the loser re-reads the already-debited
//!   balance.
//! - **Sorted lock order**: when an operation locks two balance rows, it
//!   locks them in account-id order to avoid deadlocks between concurrent
//!   confirmations that touch the same pair of accounts in opposite order.
//! - **Database backstop**: `CHECK (available_balance >= 0)` on the balances
//!   table catches any path that slips past the application-level check.
//!
//! ### Time Source Dependency
//! - **Mocked time for testing**: functions that need current time accept a
//!   `TimeSource` parameter instead of creating their own, so the 15-minute
//!   intent expiry can be tested deterministically.
//!
//! ### Type Safety
//! - **ID newtypes with sqlx::Type**: `UserId`, `AccountId`, etc. implement
//!   `sqlx::Type` (transparent), so they bind directly in queries without
//!   accessing the inner UUID value (`.0`).

use anyhow::Context;
use jiff::Timestamp;
use jiff_sqlx::{Timestamp as SqlxTs, ToSqlx};
use rand_core::{OsRng, RngCore};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use payloads::{
    AccountId, TransactionKind, TransactionStatus, UserId, requests, responses,
};

use crate::time::TimeSource;

pub mod card;
pub mod investment;
pub mod transfer;

/// A complete user row that stays in the backend.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

/// An account row. Immutable after creation; the balance lives in its own
/// one-to-one row so the transfer core can lock it independently.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub account_number: String,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, FromRow)]
pub struct Balance {
    pub account_id: AccountId,
    pub available_balance: Decimal,
    pub total_balance: Decimal,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

/// A type that can only exist if the interior Account has been resolved from
/// an authenticated session.
pub struct AuthenticatedAccount(pub(crate) Account);

impl AuthenticatedAccount {
    pub fn id(&self) -> AccountId {
        self.0.id
    }

    pub fn account_number(&self) -> &str {
        &self.0.account_number
    }
}

/// Random decimal digits with a non-zero leading digit, for account and card
/// numbers.
pub(crate) fn random_digits(len: usize) -> String {
    let mut rng = OsRng;
    let mut digits = String::with_capacity(len);
    digits.push(char::from(b'1' + (rng.next_u32() % 9) as u8));
    for _ in 1..len {
        digits.push(char::from(b'0' + (rng.next_u32() % 10) as u8));
    }
    digits
}

const ACCOUNT_NUMBER_LEN: usize = 12;

/// Create a new user with their account and zero balance, as would happen
/// during signup. All three rows commit or none do.
pub async fn create_user_with_account(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
    time_source: &TimeSource,
) -> Result<User, StoreError> {
    if !requests::validate_username(username).is_valid() {
        return Err(StoreError::InvalidUsername);
    }
    if email.len() > requests::EMAIL_MAX_LEN {
        return Err(StoreError::FieldTooLong);
    }

    // Pick an unused account number before opening the transaction. The
    // unique constraint still backstops the (vanishingly small) race window.
    let mut account_number = random_digits(ACCOUNT_NUMBER_LEN);
    for _ in 0..5 {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE account_number = $1)",
        )
        .bind(&account_number)
        .fetch_one(pool)
        .await?;
        if !taken {
            break;
        }
        account_number = random_digits(ACCOUNT_NUMBER_LEN);
    }

    let now = time_source.now();
    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (
                username,
                email,
                password_hash,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *;",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(now.to_sqlx())
    .fetch_one(&mut *tx)
    .await?;

    let account = sqlx::query_as::<_, Account>(
        "INSERT INTO accounts (user_id, account_number, created_at)
        VALUES ($1, $2, $3)
        RETURNING *;",
    )
    .bind(user.id)
    .bind(&account_number)
    .bind(now.to_sqlx())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO balances (account_id, updated_at) VALUES ($1, $2);",
    )
    .bind(account.id)
    .bind(now.to_sqlx())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Created user {} with account {}", user.id, account.id);
    Ok(user)
}

pub async fn read_user(pool: &PgPool, id: &UserId) -> Result<User, StoreError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1;")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => StoreError::UserNotFound,
            e => StoreError::Database(e),
        })
}

/// Resolve the authenticated user's account. Every money-touching route goes
/// through this.
pub async fn get_authenticated_account(
    user_id: &UserId,
    pool: &PgPool,
) -> Result<AuthenticatedAccount, StoreError> {
    let Some(account) = sqlx::query_as::<_, Account>(
        "SELECT * FROM accounts WHERE user_id = $1;",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    else {
        return Err(StoreError::AccountNotFound);
    };
    Ok(AuthenticatedAccount(account))
}

pub async fn get_account_by_number(
    account_number: &str,
    pool: &PgPool,
) -> Result<Account, StoreError> {
    sqlx::query_as::<_, Account>(
        "SELECT * FROM accounts WHERE account_number = $1;",
    )
    .bind(account_number)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::AccountNotFound)
}

/// Display identity for an account, as shown on the QR scan screen.
pub async fn get_account_identity(
    account_number: &str,
    pool: &PgPool,
) -> Result<responses::AccountIdentity, StoreError> {
    sqlx::query_as::<_, responses::AccountIdentity>(
        "SELECT a.account_number, u.username
        FROM accounts a
        JOIN users u ON a.user_id = u.id
        WHERE a.account_number = $1;",
    )
    .bind(account_number)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::AccountNotFound)
}

pub(crate) async fn get_account_identity_tx(
    account_id: &AccountId,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<responses::AccountIdentity, StoreError> {
    sqlx::query_as::<_, responses::AccountIdentity>(
        "SELECT a.account_number, u.username
        FROM accounts a
        JOIN users u ON a.user_id = u.id
        WHERE a.id = $1;",
    )
    .bind(account_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(StoreError::AccountNotFound)
}

pub async fn get_balance(
    account: &AuthenticatedAccount,
    pool: &PgPool,
) -> Result<responses::BalanceInfo, StoreError> {
    let balance = sqlx::query_as::<_, Balance>(
        "SELECT * FROM balances WHERE account_id = $1;",
    )
    .bind(account.id())
    .fetch_one(pool)
    .await
    .context("Balance row missing for account")?;

    Ok(responses::BalanceInfo {
        available_balance: balance.available_balance,
        total_balance: balance.total_balance,
    })
}

/// Lock a balance row for the remainder of the transaction.
///
/// Prevents concurrent modifications until the transaction commits, making a
/// sufficiency check atomic with the subsequent update. Must be called inside
/// a transaction.
pub(crate) async fn lock_balance_tx(
    account_id: &AccountId,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<Balance, StoreError> {
    sqlx::query_as::<_, Balance>(
        "SELECT * FROM balances WHERE account_id = $1 FOR UPDATE;",
    )
    .bind(account_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(StoreError::AccountNotFound)
}

/// Apply a signed delta to both balance columns. The caller must hold the
/// row lock and have verified sufficiency for debits.
pub(crate) async fn apply_balance_delta_tx(
    account_id: &AccountId,
    delta: Decimal,
    time_source: &TimeSource,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE balances
        SET available_balance = available_balance + $1,
            total_balance = total_balance + $1,
            updated_at = $2
        WHERE account_id = $3;",
    )
    .bind(delta)
    .bind(time_source.now().to_sqlx())
    .bind(account_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Append one ledger row. `amount` is signed: negative = debit.
pub(crate) async fn insert_ledger_entry_tx(
    account_id: &AccountId,
    amount: Decimal,
    kind: TransactionKind,
    reference_id: &str,
    time_source: &TimeSource,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO transactions (
            account_id,
            amount,
            kind,
            status,
            reference_id,
            created_at
        ) VALUES ($1, $2, $3, $4, $5, $6);",
    )
    .bind(account_id)
    .bind(amount)
    .bind(kind)
    .bind(TransactionStatus::Completed)
    .bind(reference_id)
    .bind(time_source.now().to_sqlx())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// The account's ledger, newest first.
pub async fn list_transactions(
    account: &AuthenticatedAccount,
    limit: i64,
    offset: i64,
    pool: &PgPool,
) -> Result<Vec<responses::TransactionEntry>, StoreError> {
    Ok(sqlx::query_as::<_, responses::TransactionEntry>(
        "SELECT id, amount, kind, status, reference_id, created_at
        FROM transactions
        WHERE account_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3;",
    )
    .bind(account.id())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("User not found")]
    UserNotFound,
    #[error("Account not found")]
    AccountNotFound,
    #[error("Field too long")]
    FieldTooLong,
    #[error("Invalid username")]
    InvalidUsername,
    #[error("Amount must be positive")]
    AmountMustBePositive,
    #[error("Insufficient balance")]
    InsufficientBalance,
    #[error("Transfer reference not found")]
    IntentNotFound,
    #[error("Transfer reference has expired")]
    IntentExpired,
    #[error("Transfer reference was canceled")]
    IntentCanceled,
    #[error("Transfer reference has already been applied")]
    IntentAlreadyCompleted,
    #[error("Cannot confirm your own transfer reference")]
    CannotConfirmOwnIntent,
    #[error("Card already exists for this account")]
    CardAlreadyExists,
    #[error("Card not found")]
    CardNotFound,
    #[error("Card is frozen")]
    CardFrozen,
    #[error("Investment profile not found")]
    InvestmentProfileNotFound,
    #[error("Investment option not found")]
    InvestmentOptionNotFound,
    #[error("Unique constraint violation")]
    NotUnique(#[source] sqlx::Error),
    #[error("Database error")]
    Database(#[source] sqlx::Error),
    #[error("Unexpected error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e
            && db_err.is_unique_violation()
        {
            return StoreError::NotUnique(e);
        }
        StoreError::Database(e)
    }
}
