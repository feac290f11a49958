use std::io::Read;

use encoding_rs::Encoding;
use statera_core::config::SourceConfig;

use crate::account::{cleanup_account, read_account_cell};
use crate::error::ParseError;
use crate::header::HeaderResolver;
use crate::row::{ParsedStatement, RawRow, RowBuilder};

/// Decode raw bytes with a WHATWG charset label; a BOM overrides the label.
pub fn decode(bytes: &[u8], charset: &str) -> Result<String, ParseError> {
    let encoding = Encoding::for_label(charset.trim().as_bytes())
        .ok_or_else(|| ParseError::UnknownCharset(charset.to_string()))?;
    let (text, _, _) = encoding.decode(bytes);
    Ok(text.into_owned())
}

/// Split delimited text into trimmed records. Ragged rows are kept as they are.
pub fn read_records(text: &str, delimiter: &str) -> Result<Vec<Vec<String>>, ParseError> {
    let delimiter = delimiter.as_bytes().first().copied().unwrap_or(b',');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(|s| s.to_string()).collect());
    }
    Ok(records)
}

/// Parse a delimited-text statement.
///
/// Fields are read by raw column index. The account number comes from the
/// override or a configured cell; delimited files get no heuristic scan.
pub fn parse_delimited<R: Read>(
    mut input: R,
    cfg: &SourceConfig,
    account_override: Option<&str>,
) -> Result<ParsedStatement, ParseError> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    let text = decode(&bytes, &cfg.csv.charset)?;
    let grid = read_records(&text, &cfg.csv.delimiter)?;

    let account_no = match cleanup_account(account_override) {
        Some(acc) => Some(acc),
        None => read_account_cell(&grid, &cfg.account)?,
    };

    let header = HeaderResolver::delimited(&cfg.headers).resolve(&grid)?;
    let builder = RowBuilder::for_source(cfg, account_no.clone())?;
    let mut report = ParsedStatement::new(account_no);

    let mut r = header.data_start.max(cfg.csv.skip_rows);
    while r < grid.len() {
        let band = header.repeated_band_at(&grid, r);
        if band > 0 {
            r += band;
            continue;
        }
        let record = &grid[r];
        let raw = RawRow::collect(|field| {
            header
                .mapping
                .get(field)
                .and_then(|col| record.get(col))
                .cloned()
        });
        report.record(r, builder.build(&raw));
        r += 1;
    }
    Ok(report)
}
