use std::fmt;

use rust_decimal::Decimal;
use statera_core::config::{
    ConfigError, DateParseConfig, NumericConfig, PayInRuleConfig, PdfConfig, ReferenceConfig,
    SourceConfig,
};
use statera_core::{Field, ParsedRow};
use tracing::debug;

use crate::datetime::DateTimeResolver;
use crate::numeric::NumericConvention;
use crate::pay_in::PayInRule;
use crate::reference::ReferenceDecomposer;

/// Why a source row produced no transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    MissingAmount,
    NonPositiveAmount,
    InvalidNumber,
    InvalidDate,
    EmptyUtr,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingAmount => "missing_amount",
            Self::NonPositiveAmount => "non_positive_amount",
            Self::InvalidNumber => "invalid_number",
            Self::InvalidDate => "invalid_date",
            Self::EmptyUtr => "empty_utr",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedRow {
    /// Zero-based grid row; for page documents, the line in the extracted text.
    pub row: usize,
    pub reason: SkipReason,
}

/// Everything one parse produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedStatement {
    pub rows: Vec<ParsedRow>,
    pub skipped: Vec<SkippedRow>,
    pub account_no: Option<String>,
}

impl ParsedStatement {
    pub(crate) fn new(account_no: Option<String>) -> Self {
        Self {
            account_no,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, row: usize, outcome: Result<ParsedRow, SkipReason>) {
        match outcome {
            Ok(parsed) => self.rows.push(parsed),
            Err(reason) => {
                debug!(row, reason = %reason, "Skipping row");
                self.skipped.push(SkippedRow { row, reason });
            }
        }
    }
}

/// Raw field text for one source row, before any normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub date: Option<String>,
    pub time: Option<String>,
    pub reference: Option<String>,
    pub credit: Option<String>,
    pub debit: Option<String>,
    pub amount: Option<String>,
    pub balance: Option<String>,
}

impl RawRow {
    /// Build a row by asking `read` for every logical field.
    pub fn collect(mut read: impl FnMut(Field) -> Option<String>) -> Self {
        Self {
            date: read(Field::Date),
            time: read(Field::Time),
            reference: read(Field::Reference),
            credit: read(Field::Credit),
            debit: read(Field::Debit),
            amount: read(Field::Amount),
            balance: read(Field::Balance),
        }
    }
}

/// Turns raw rows into canonical rows for one parse.
#[derive(Debug, Clone)]
pub struct RowBuilder {
    numeric: NumericConvention,
    dates: DateTimeResolver,
    reference: ReferenceDecomposer,
    pay_in: PayInRule,
    skip_empty_utr: bool,
    account_no: Option<String>,
}

impl RowBuilder {
    pub fn new(
        date_parse: &DateParseConfig,
        reference: &ReferenceConfig,
        pay_in_rule: &PayInRuleConfig,
        numeric: &NumericConfig,
        account_no: Option<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            numeric: NumericConvention::from(numeric),
            dates: DateTimeResolver::new(date_parse),
            reference: ReferenceDecomposer::new(reference)?,
            pay_in: PayInRule::from_config(pay_in_rule),
            skip_empty_utr: reference.skip_if.empty_utr,
            account_no,
        })
    }

    pub fn for_source(cfg: &SourceConfig, account_no: Option<String>) -> Result<Self, ConfigError> {
        Self::new(
            &cfg.date_parse,
            &cfg.reference,
            &cfg.pay_in_rule,
            &cfg.numeric,
            account_no,
        )
    }

    pub fn for_pdf(cfg: &PdfConfig, account_no: Option<String>) -> Result<Self, ConfigError> {
        Self::new(
            &cfg.date_parse,
            &cfg.reference,
            &cfg.pay_in_rule,
            &cfg.numeric,
            account_no,
        )
    }

    pub fn numeric(&self) -> &NumericConvention {
        &self.numeric
    }

    pub fn build(&self, raw: &RawRow) -> Result<ParsedRow, SkipReason> {
        let amount = self.net_amount(raw)?.ok_or(SkipReason::MissingAmount)?;
        if amount <= Decimal::ZERO {
            return Err(SkipReason::NonPositiveAmount);
        }

        let balance = self.decimal(raw.balance.as_deref())?;
        let transaction_at = self
            .dates
            .resolve(raw.date.as_deref(), raw.time.as_deref())
            .map_err(|_| SkipReason::InvalidDate)?;

        let reference = raw.reference.clone().unwrap_or_default();
        let parts = self.reference.decompose(&reference);
        if self.skip_empty_utr && parts.utr.as_deref().map_or(true, |u| u.trim().is_empty()) {
            return Err(SkipReason::EmptyUtr);
        }

        let pay_in = self.pay_in.is_pay_in(
            amount,
            &reference,
            parts.order_id.as_deref(),
            parts.utr.as_deref(),
        );

        Ok(ParsedRow {
            transaction_at,
            amount,
            balance,
            reference,
            order_id: parts.order_id,
            utr: parts.utr,
            pay_in,
            account_no: self.account_no.clone(),
        })
    }

    /// Credit minus debit when either side is present, else the amount field.
    fn net_amount(&self, raw: &RawRow) -> Result<Option<Decimal>, SkipReason> {
        if raw.credit.is_some() || raw.debit.is_some() {
            let credit = self.decimal(raw.credit.as_deref())?.unwrap_or_default();
            let debit = self.decimal(raw.debit.as_deref())?.unwrap_or_default();
            return Ok(Some(credit - debit));
        }
        self.decimal(raw.amount.as_deref())
    }

    fn decimal(&self, raw: Option<&str>) -> Result<Option<Decimal>, SkipReason> {
        match raw {
            Some(s) => self
                .numeric
                .parse(s)
                .map_err(|_| SkipReason::InvalidNumber),
            None => Ok(None),
        }
    }
}
