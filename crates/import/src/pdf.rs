use std::io::Read;
use std::ops::Range;

use regex::{Regex, RegexBuilder};
use statera_core::config::{ConfigError, PdfConfig, PdfTableConfig};
use statera_core::Field;

use crate::account::{account_from_text, cleanup_account};
use crate::error::ParseError;
use crate::row::{ParsedStatement, RawRow, RowBuilder};

/// Compiled table layout for page text.
#[derive(Debug, Clone)]
pub struct PdfTable {
    start_after: Option<Regex>,
    stop_before: Option<Regex>,
    line: Regex,
    account: Option<Regex>,
}

impl PdfTable {
    pub fn new(cfg: &PdfTableConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            start_after: cfg
                .start_after_regex
                .as_deref()
                .map(|p| multi_line(p, "pdf_table.start_after_regex"))
                .transpose()?,
            stop_before: cfg
                .stop_before_regex
                .as_deref()
                .map(|p| multi_line(p, "pdf_table.stop_before_regex"))
                .transpose()?,
            line: Regex::new(&format!("^(?:{})$", cfg.line_pattern)).map_err(|e| {
                ConfigError::InvalidRegex {
                    name: "pdf_table.line_pattern",
                    message: e.to_string(),
                }
            })?,
            account: cfg
                .account_regex
                .as_deref()
                .map(|p| multi_line(p, "pdf_table.account_regex"))
                .transpose()?,
        })
    }

    /// Text after the first start anchor and before the first stop anchor.
    pub fn body<'t>(&self, text: &'t str) -> &'t str {
        &text[self.body_range(text)]
    }

    /// Byte range of [`PdfTable::body`] within `text`.
    pub fn body_range(&self, text: &str) -> Range<usize> {
        let start = self
            .start_after
            .as_ref()
            .and_then(|re| re.find(text))
            .map_or(0, |m| m.end());
        let end = self
            .stop_before
            .as_ref()
            .and_then(|re| re.find(&text[start..]))
            .map_or(text.len(), |m| start + m.start());
        start..end
    }

    /// Raw fields of a body line, or `None` when the line is not a table row.
    pub fn capture(&self, line: &str) -> Option<RawRow> {
        let caps = self.line.captures(line.trim())?;
        let group = |name: &str| caps.name(name).map(|m| m.as_str().trim().to_string());
        Some(RawRow::collect(|field| match field {
            Field::Reference => group("reference").or_else(|| group("ref")),
            other => group(other.key()),
        }))
    }
}

fn multi_line(pattern: &str, name: &'static str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .map_err(|e| ConfigError::InvalidRegex {
            name,
            message: e.to_string(),
        })
}

/// Parse a page document by extracting its text first.
pub fn parse_pdf<R: Read>(
    mut input: R,
    cfg: &PdfConfig,
    account_override: Option<&str>,
) -> Result<ParsedStatement, ParseError> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| ParseError::Document(e.to_string()))?;
    parse_pdf_text(&text, cfg, account_override)
}

/// Parse already extracted page text. Lines that do not match the line
/// pattern are ignored; matched lines become rows like any other format.
/// Skipped rows are numbered by their zero-based line in `text`.
pub fn parse_pdf_text(
    text: &str,
    cfg: &PdfConfig,
    account_override: Option<&str>,
) -> Result<ParsedStatement, ParseError> {
    let table = PdfTable::new(&cfg.pdf_table)?;
    let account_no = cleanup_account(account_override).or_else(|| {
        table
            .account
            .as_ref()
            .and_then(|re| account_from_text(text, re))
    });
    let builder = RowBuilder::for_pdf(cfg, account_no.clone())?;
    let mut report = ParsedStatement::new(account_no);

    let body = table.body_range(text);
    let first_line = text[..body.start].matches('\n').count();
    for (idx, line) in text[body].lines().enumerate() {
        if let Some(raw) = table.capture(line) {
            report.record(first_line + idx, builder.build(&raw));
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{SkipReason, SkippedRow};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use statera_core::config::BankConfig;

    const PDF_CFG: &str = r#"
[pdf.pdf_table]
start_after_regex = "^Date\\s+Particulars.*$"
stop_before_regex = "^Closing Balance"
line_pattern = '(?P<date>\d{2}/\d{2}/\d{4})\s+(?P<ref>.+?)\s+(?P<credit>[\d,]+\.\d{2})?\s*\|\s*(?P<debit>[\d,]+\.\d{2})?\s+(?P<balance>[\d,]+\.\d{2})'
account_regex = 'Account\s+Number\s*:\s*(\d[\d ]+\d)'

[pdf.reference]
splitter = "/"
parts_count = { mode = "exact", values = [2] }
order_id = { index = 0 }
utr = { index = 1 }
"#;

    const TEXT: &str = "\
Account Number : 5010 0023 4567
Date       Particulars                 Credit | Debit      Balance
01/03/2024 ORD9/UTR9001   1,000.00 |            5,000.00
02/03/2024 ATM CASH                 | 200.00    4,800.00
   page 1 of 2
03/03/2024 ORD10/UTR9002  250.50 |              5,050.50
Closing Balance 5,050.50
04/03/2024 ORD11/UTR9003  999.00 |              6,049.50
";

    fn config() -> PdfConfig {
        BankConfig::from_toml(PDF_CFG).unwrap().pdf.unwrap()
    }

    #[test]
    fn body_is_sliced_between_anchors() {
        let table = PdfTable::new(&config().pdf_table).unwrap();
        let body = table.body(TEXT);
        assert!(body.trim_start().starts_with("01/03/2024"));
        assert!(!body.contains("Closing Balance"));
        assert!(!body.contains("04/03/2024"));
    }

    #[test]
    fn parses_matching_lines() {
        let report = parse_pdf_text(TEXT, &config(), None).unwrap();
        assert_eq!(report.account_no.as_deref(), Some("501000234567"));
        assert_eq!(report.rows.len(), 2);

        let first = &report.rows[0];
        assert_eq!(first.amount, Decimal::new(100000, 2));
        assert_eq!(first.balance, Some(Decimal::new(500000, 2)));
        assert_eq!(first.order_id.as_deref(), Some("ORD9"));
        assert_eq!(first.utr.as_deref(), Some("UTR9001"));
        assert_eq!(
            first.transaction_at,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(report.rows[1].utr.as_deref(), Some("UTR9002"));
        assert_eq!(
            report.skipped,
            vec![SkippedRow {
                row: 3,
                reason: SkipReason::NonPositiveAmount
            }]
        );
    }

    #[test]
    fn skipped_rows_count_lines_of_whole_text() {
        let text = "Statement\nDate Particulars\n\n01/03/2024 A/B | 5.00 1.00\nClosing Balance\n";
        let table = PdfTable::new(&config().pdf_table).unwrap();
        assert_eq!(table.body(text), "\n\n01/03/2024 A/B | 5.00 1.00\n");
        let report = parse_pdf_text(text, &config(), None).unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].row, 3);
    }

    #[test]
    fn override_wins_over_page_text() {
        let report = parse_pdf_text(TEXT, &config(), Some("99 88 77 66 55")).unwrap();
        assert_eq!(report.account_no.as_deref(), Some("9988776655"));
    }

    #[test]
    fn amount_group_and_reference_alias() {
        let cfg = BankConfig::from_toml(
            r#"
[pdf.pdf_table]
line_pattern = '(?P<date>\S+)\s+(?P<reference>.+)\s+(?P<amount>-?[\d.]+)'
"#,
        )
        .unwrap()
        .pdf
        .unwrap();
        let table = PdfTable::new(&cfg.pdf_table).unwrap();
        let raw = table.capture("  15/04/2024  Refund XYZ  42.10 ").unwrap();
        assert_eq!(raw.reference.as_deref(), Some("Refund XYZ"));
        assert_eq!(raw.amount.as_deref(), Some("42.10"));
        assert_eq!(raw.credit, None);
        assert!(table.capture("not a row").is_none());
    }

    #[test]
    fn invalid_line_pattern_is_config_error() {
        let mut cfg = config();
        cfg.pdf_table.line_pattern = "(?P<date>".to_string();
        assert!(matches!(
            parse_pdf_text(TEXT, &cfg, None),
            Err(ParseError::Config(ConfigError::InvalidRegex { .. }))
        ));
    }
}
