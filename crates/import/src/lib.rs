//! Bank statement ingestion: delimited text, modern and legacy spreadsheets,
//! and page documents in, canonical [`ParsedRow`]s out.

pub mod account;
pub mod cell;
pub mod datetime;
pub mod delimited;
pub mod error;
pub mod format;
pub mod header;
pub mod numeric;
pub mod pay_in;
pub mod pdf;
pub mod reference;
pub mod row;
pub mod sheet;
pub mod spreadsheet;
#[cfg(test)]
mod testing;

use std::io::Read;

use statera_core::BankConfig;
use tracing::info;

pub use account::{AccountDetectionProfile, AccountProfiles};
pub use datetime::{
    format_statement_date, format_statement_datetime, has_time_component, normalize_to_midnight,
    parse_statement_date, parse_statement_datetime, DateError,
};
pub use error::ParseError;
pub use format::FileKind;
pub use numeric::{NumericConvention, NumericError};
pub use row::{ParsedStatement, SkipReason, SkippedRow};
pub use sheet::Sheet;
pub use statera_core::ParsedRow;

/// Parse one uploaded statement with the bank's configuration.
///
/// Rows that cannot be used are reported in [`ParsedStatement::skipped`];
/// only file-level problems return an error.
pub fn parse_statement<R: Read>(
    mut input: R,
    filename: &str,
    content_type: Option<&str>,
    bank: &BankConfig,
    profiles: &AccountProfiles,
    account_override: Option<&str>,
) -> Result<ParsedStatement, ParseError> {
    let kind = format::detect(filename, content_type)?;
    let (report, account_required) = match kind {
        FileKind::DelimitedText => {
            let cfg = bank.delimited()?;
            (
                delimited::parse_delimited(input, cfg, account_override)?,
                cfg.account.required,
            )
        }
        FileKind::SpreadsheetModern | FileKind::SpreadsheetLegacy => {
            let cfg = if kind == FileKind::SpreadsheetModern {
                bank.spreadsheet_modern()?
            } else {
                bank.spreadsheet_legacy()?
            };
            let mut bytes = Vec::new();
            input.read_to_end(&mut bytes)?;
            let sheet = Sheet::load(&bytes, cfg.sheet_index)?;
            (
                spreadsheet::parse_sheet(
                    &sheet,
                    cfg,
                    &bank.parser_key,
                    profiles,
                    account_override,
                )?,
                cfg.account.required,
            )
        }
        FileKind::PageDocument => {
            let cfg = bank.page_document()?;
            (
                pdf::parse_pdf(input, cfg, account_override)?,
                cfg.account.required,
            )
        }
    };

    if account_required && report.account_no.is_none() {
        return Err(ParseError::MissingAccountNumber);
    }

    info!(
        format = kind.label(),
        bank = %bank.parser_key,
        rows = report.rows.len(),
        skipped = report.skipped.len(),
        "Parsed statement"
    );
    Ok(report)
}
