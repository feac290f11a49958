use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One normalized statement transaction.
///
/// `transaction_at` is exactly what the statement printed: no timezone is
/// attached and none is ever applied. `amount` is always strictly positive;
/// rows that net to zero or below never become a `ParsedRow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRow {
    pub transaction_at: NaiveDateTime,
    pub amount: Decimal,
    pub balance: Option<Decimal>,
    /// Raw reference / narration text as read from the source.
    pub reference: String,
    pub order_id: Option<String>,
    /// Unique transaction reference assigned by the bank.
    pub utr: Option<String>,
    pub pay_in: bool,
    /// Digits-only account number (override or detected).
    pub account_no: Option<String>,
}
