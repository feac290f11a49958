use statera_core::config::SourceConfig;
use tracing::{debug, warn};

use crate::account::{cleanup_account, detect_account, read_account_cell, AccountProfiles};
use crate::cell::CellReader;
use crate::error::ParseError;
use crate::header::{HeaderResolver, RowSource};
use crate::row::{ParsedStatement, RawRow, RowBuilder};
use crate::sheet::{RowStop, Sheet};

/// Parse one worksheet.
///
/// The account number is the cleaned override, else the configured cell,
/// else whatever the bank's detection profile finds in the preamble.
pub fn parse_sheet(
    sheet: &Sheet,
    cfg: &SourceConfig,
    bank_key: &str,
    profiles: &AccountProfiles,
    account_override: Option<&str>,
) -> Result<ParsedStatement, ParseError> {
    let account_no = match cleanup_account(account_override) {
        Some(acc) => Some(acc),
        None => match read_account_cell(sheet, &cfg.account)? {
            Some(acc) => Some(acc),
            None => detect_account(sheet, profiles.resolve(bank_key)),
        },
    };
    if account_no.is_none() {
        warn!(bank = bank_key, "No account number found in worksheet");
    }

    let header = HeaderResolver::spreadsheet(&cfg.headers).resolve(sheet)?;
    let stop = RowStop::from_config(&cfg.row_stop)?;
    let builder = RowBuilder::for_source(cfg, account_no.clone())?;
    let reader = CellReader::new(
        sheet,
        &header.mapping,
        header.context.as_ref(),
        builder.numeric(),
        cfg.neighbor_radius,
    );
    let mut report = ParsedStatement::new(account_no);

    let mut r = header.data_start;
    while r < sheet.row_count() {
        let band = header.repeated_band_at(sheet, r);
        if band > 0 {
            debug!(row = r, rows = band, "Skipping repeated header band");
            r += band;
            continue;
        }
        if stop.stops_at(sheet, r) {
            debug!(row = r, "Row stop reached");
            break;
        }
        let raw = RawRow::collect(|field| reader.read(r, field));
        report.record(r, builder.build(&raw));
        r += 1;
    }
    Ok(report)
}
