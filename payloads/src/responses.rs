use crate::{
    IntentStatus, InvestmentHoldingId, InvestmentOptionId, TransactionId,
    TransactionKind, TransactionStatus, UserId,
};
use jiff::Timestamp;
#[cfg(feature = "use-sqlx")]
use jiff_sqlx::Timestamp as SqlxTs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub account_number: String,
}

/// The account identity shown on the counterparty's device after scanning a
/// QR code. Deliberately excludes balances and the account id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
pub struct AccountIdentity {
    pub account_number: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub available_balance: Decimal,
    pub total_balance: Decimal,
}

/// A pending (or settled) over-the-counter handshake. `account_number`,
/// `amount`, and `reference` together form the QR payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferIntent {
    pub reference: String,
    pub account_number: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: IntentStatus,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

/// Returned to the confirming party once both legs have committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub reference: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub counterparty: AccountIdentity,
    pub completed_at: Timestamp,
}

/// One ledger entry. Negative amounts are debits, positive are credits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
pub struct TransactionEntry {
    pub id: TransactionId,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub reference_id: String,
    #[cfg_attr(feature = "use-sqlx", sqlx(try_from = "SqlxTs"))]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub card_number: String,
    pub expiry_month: i16,
    pub expiry_year: i16,
    pub cvv: String,
    pub frozen: bool,
    pub balance: Decimal,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentProfile {
    pub balance: Decimal,
    pub total_invested: Decimal,
    pub total_returns: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
pub struct InvestmentOption {
    pub id: InvestmentOptionId,
    pub name: String,
    pub unit_price: Decimal,
    pub annual_return_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
pub struct InvestmentHolding {
    pub id: InvestmentHoldingId,
    pub option_id: InvestmentOptionId,
    pub option_name: String,
    pub units: Decimal,
    pub amount_invested: Decimal,
    pub unit_price_at_purchase: Decimal,
    #[cfg_attr(feature = "use-sqlx", sqlx(try_from = "SqlxTs"))]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessMessage {
    pub message: String,
}
