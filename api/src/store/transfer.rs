//! The over-the-counter transfer confirmation core.
//!
//! An initiator records an intent (rendered as a QR code on their device); a
//! physically co-located counterparty scans it and confirms. Confirmation is
//! the only path that moves money between two accounts, and it runs as a
//! single database transaction:
//!
//! 1. lock the intent row and validate it (pending, unexpired, not self)
//! 2. lock both balance rows in account-id order
//! 3. check the payer's available balance under the lock
//! 4. apply both balance updates
//! 5. insert the two ledger legs (`-D` debit, `-C` credit) sharing the
//!    intent reference as their prefix
//! 6. mark the intent completed
//!
//! Any failure rolls the whole thing back; a partially applied transfer
//! cannot be observed. Replaying a completed reference trips the status check
//! in step 1 before any balance is touched, and the unique constraint on
//! ledger reference ids backstops that at the database level.

use jiff::{Span, Timestamp};
use jiff_sqlx::{Timestamp as SqlxTs, ToSqlx};
use payloads::{
    AccountId, IntentStatus, TransactionKind, responses,
};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{AuthenticatedAccount, StoreError};
use crate::time::TimeSource;

/// How long a rendered QR code stays confirmable.
pub fn intent_ttl() -> Span {
    Span::new().minutes(15)
}

/// Database-level intent row.
#[derive(Debug, Clone, FromRow)]
struct DbTransferIntent {
    reference: String,
    initiator_account_id: AccountId,
    kind: TransactionKind,
    amount: Decimal,
    status: IntentStatus,
    #[allow(unused)]
    confirmed_by_account_id: Option<AccountId>,
    #[sqlx(try_from = "SqlxTs")]
    expires_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    #[allow(unused)]
    updated_at: Timestamp,
}

impl DbTransferIntent {
    fn into_response(
        self,
        account_number: String,
    ) -> responses::TransferIntent {
        responses::TransferIntent {
            reference: self.reference,
            account_number,
            kind: self.kind,
            amount: self.amount,
            status: self.status,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

fn new_reference(kind: TransactionKind) -> String {
    format!("{}{}", kind.reference_prefix(), Uuid::new_v4().simple())
}

/// Record a pending intent and return the QR payload fields.
#[tracing::instrument(skip(initiator, pool, time_source), ret)]
pub async fn create_intent(
    initiator: &AuthenticatedAccount,
    kind: TransactionKind,
    amount: Decimal,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::TransferIntent, StoreError> {
    if amount <= Decimal::ZERO {
        return Err(StoreError::AmountMustBePositive);
    }

    let now = time_source.now();
    let expires_at = now + intent_ttl();

    let intent = sqlx::query_as::<_, DbTransferIntent>(
        "INSERT INTO transfer_intents (
            reference,
            initiator_account_id,
            kind,
            amount,
            status,
            expires_at,
            created_at,
            updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        RETURNING *;",
    )
    .bind(new_reference(kind))
    .bind(initiator.id())
    .bind(kind)
    .bind(amount)
    .bind(IntentStatus::Pending)
    .bind(expires_at.to_sqlx())
    .bind(now.to_sqlx())
    .fetch_one(pool)
    .await?;

    Ok(intent.into_response(initiator.account_number().to_string()))
}

/// Fetch an intent by reference, e.g. for the counterparty's confirmation
/// screen after scanning.
pub async fn get_intent(
    reference: &str,
    pool: &PgPool,
) -> Result<responses::TransferIntent, StoreError> {
    #[derive(FromRow)]
    struct IntentWithNumber {
        #[sqlx(flatten)]
        intent: DbTransferIntent,
        account_number: String,
    }

    let row = sqlx::query_as::<_, IntentWithNumber>(
        "SELECT ti.*, a.account_number
        FROM transfer_intents ti
        JOIN accounts a ON ti.initiator_account_id = a.id
        WHERE ti.reference = $1;",
    )
    .bind(reference)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::IntentNotFound)?;

    Ok(row.intent.into_response(row.account_number))
}

/// Cancel a pending intent. Only the initiator can cancel, and only while it
/// is still pending.
#[tracing::instrument(skip(initiator, pool, time_source))]
pub async fn cancel_intent(
    initiator: &AuthenticatedAccount,
    reference: &str,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(), StoreError> {
    let rows_affected = sqlx::query(
        "UPDATE transfer_intents
        SET status = $1, updated_at = $2
        WHERE reference = $3
          AND initiator_account_id = $4
          AND status = $5;",
    )
    .bind(IntentStatus::Canceled)
    .bind(time_source.now().to_sqlx())
    .bind(reference)
    .bind(initiator.id())
    .bind(IntentStatus::Pending)
    .execute(pool)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        // Distinguish "not yours / doesn't exist" from "no longer pending"
        let status = sqlx::query_scalar::<_, IntentStatus>(
            "SELECT status FROM transfer_intents
            WHERE reference = $1 AND initiator_account_id = $2;",
        )
        .bind(reference)
        .bind(initiator.id())
        .fetch_optional(pool)
        .await?;

        return Err(match status {
            None => StoreError::IntentNotFound,
            Some(IntentStatus::Completed) => StoreError::IntentAlreadyCompleted,
            Some(IntentStatus::Expired) => StoreError::IntentExpired,
            Some(_) => StoreError::IntentCanceled,
        });
    }

    Ok(())
}

/// Which account pays and which receives, by operation kind.
///
/// Deposit: the confirmer is the cash-equivalent source, so they pay the
/// initiator. Withdrawal: the initiator cashes out to the confirmer.
/// Transfer: the scanning party pays the initiator who rendered the QR.
fn payer_and_payee(
    kind: TransactionKind,
    initiator: AccountId,
    confirmer: AccountId,
) -> (AccountId, AccountId) {
    match kind {
        TransactionKind::Deposit | TransactionKind::Transfer => {
            (confirmer, initiator)
        }
        TransactionKind::Withdrawal => (initiator, confirmer),
    }
}

/// Confirm a scanned intent and settle both legs atomically.
#[tracing::instrument(skip(confirmer, pool, time_source))]
pub async fn confirm_transfer(
    confirmer: &AuthenticatedAccount,
    reference: &str,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::TransferReceipt, StoreError> {
    let now = time_source.now();
    let mut tx = pool.begin().await?;

    // Lock the intent row first. A concurrent confirmation of the same
    // reference blocks here and sees the completed status after we commit.
    let intent = sqlx::query_as::<_, DbTransferIntent>(
        "SELECT * FROM transfer_intents WHERE reference = $1 FOR UPDATE;",
    )
    .bind(reference)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::IntentNotFound)?;

    match intent.status {
        IntentStatus::Pending => {}
        IntentStatus::Completed => {
            return Err(StoreError::IntentAlreadyCompleted);
        }
        IntentStatus::Canceled => return Err(StoreError::IntentCanceled),
        IntentStatus::Expired => return Err(StoreError::IntentExpired),
    }

    // Server-side expiry check; the sweeper may not have run yet. Rolling
    // back (rather than marking expired here) keeps failure paths free of
    // writes; the sweeper owns the status transition.
    if now > intent.expires_at {
        return Err(StoreError::IntentExpired);
    }

    if intent.initiator_account_id == confirmer.id() {
        return Err(StoreError::CannotConfirmOwnIntent);
    }

    let (payer, payee) = payer_and_payee(
        intent.kind,
        intent.initiator_account_id,
        confirmer.id(),
    );

    // Lock both balance rows in account-id order to avoid deadlocks with a
    // concurrent confirmation locking the same pair in the other order.
    let mut lock_order = [payer, payee];
    lock_order.sort_by_key(|id| id.0);
    for account_id in &lock_order {
        super::lock_balance_tx(account_id, &mut tx).await?;
    }
    // Re-reads under the lock we now hold.
    let payer_balance = super::lock_balance_tx(&payer, &mut tx).await?;

    // Atomic with the update: the row is locked, so no concurrent debit can
    // slip between this check and the balance write.
    if payer_balance.available_balance < intent.amount {
        return Err(StoreError::InsufficientBalance);
    }

    super::apply_balance_delta_tx(&payer, -intent.amount, time_source, &mut tx)
        .await?;
    super::apply_balance_delta_tx(&payee, intent.amount, time_source, &mut tx)
        .await?;

    // Two ledger legs correlated by the shared reference prefix, with
    // amounts that are additive inverses.
    super::insert_ledger_entry_tx(
        &payer,
        -intent.amount,
        intent.kind,
        &format!("{reference}-D"),
        time_source,
        &mut tx,
    )
    .await?;
    super::insert_ledger_entry_tx(
        &payee,
        intent.amount,
        intent.kind,
        &format!("{reference}-C"),
        time_source,
        &mut tx,
    )
    .await?;

    sqlx::query(
        "UPDATE transfer_intents
        SET status = $1, confirmed_by_account_id = $2, updated_at = $3
        WHERE reference = $4;",
    )
    .bind(IntentStatus::Completed)
    .bind(confirmer.id())
    .bind(now.to_sqlx())
    .bind(reference)
    .execute(&mut *tx)
    .await?;

    let counterparty =
        super::get_account_identity_tx(&intent.initiator_account_id, &mut tx)
            .await?;

    tx.commit().await?;

    tracing::info!(
        "Settled {} {} between {} and {}",
        intent.kind,
        intent.amount,
        payer,
        payee
    );

    Ok(responses::TransferReceipt {
        reference: intent.reference,
        kind: intent.kind,
        amount: intent.amount,
        counterparty,
        completed_at: now,
    })
}

/// Mark pending intents past their deadline as expired. Called by the
/// scheduler; confirmation checks `expires_at` itself, so the sweep is
/// bookkeeping rather than the enforcement point.
#[tracing::instrument(skip(pool, time_source))]
pub async fn expire_stale_intents(
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<u64, StoreError> {
    let now = time_source.now();

    let result = sqlx::query(
        "UPDATE transfer_intents
        SET status = $1, updated_at = $2
        WHERE status = $3 AND expires_at < $2;",
    )
    .bind(IntentStatus::Expired)
    .bind(now.to_sqlx())
    .bind(IntentStatus::Pending)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        tracing::info!("Expired {} stale intents", result.rows_affected());
    }
    Ok(result.rows_affected())
}
