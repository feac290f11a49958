//! Header discovery: fixed column indices, or a search for header text that
//! matches configured synonyms, optionally merged across several rows.

use std::collections::BTreeMap;

use statera_core::config::{ConfigError, FixedColumns, HeaderConfig, SearchHeaders};
use statera_core::Field;
use tracing::debug;

use crate::error::ParseError;

/// Row-oriented cell text access shared by delimited grids and spreadsheets.
pub trait RowSource {
    fn row_count(&self) -> usize;
    fn row_len(&self, row: usize) -> usize;
    /// Cell text, or `""` for anything out of range.
    fn cell_text(&self, row: usize, col: usize) -> &str;

    /// Trimmed non-blank value at a position.
    fn value_at(&self, row: usize, col: usize) -> Option<&str> {
        let v = self.cell_text(row, col).trim();
        (!v.is_empty()).then_some(v)
    }
}

impl RowSource for Vec<Vec<String>> {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn row_len(&self, row: usize) -> usize {
        self.get(row).map_or(0, Vec::len)
    }

    fn cell_text(&self, row: usize, col: usize) -> &str {
        self.get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }
}

/// Normalize header text for comparison.
pub fn norm(s: &str) -> String {
    s.replace('\u{00A0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalized synonym table. Labels that are not logical fields are kept as
/// guard columns.
#[derive(Debug, Clone, Default)]
pub struct Expectations {
    fields: Vec<(Field, Vec<String>)>,
    others: Vec<(String, Vec<String>)>,
}

impl Expectations {
    pub fn from_config(expect: &BTreeMap<String, Vec<String>>) -> Self {
        let mut out = Self::default();
        for (label, synonyms) in expect {
            let synonyms: Vec<String> = synonyms.iter().map(|s| norm(s)).collect();
            match label.parse::<Field>() {
                Ok(field) => out.fields.push((field, synonyms)),
                Err(_) => {
                    debug!(label = %label, "Header label is not a field; mapping it as a guard column");
                    out.others.push((label.clone(), synonyms));
                }
            }
        }
        out
    }

    pub fn matches_field(&self, field: Field, header_norm: &str) -> bool {
        self.fields
            .iter()
            .filter(|(f, _)| *f == field)
            .any(|(_, syns)| syns.iter().any(|s| s == header_norm))
    }

    /// First matching column wins per label.
    pub fn map(&self, merged: &[String]) -> HeaderMapping {
        let mut mapping = HeaderMapping::default();
        for (col, text) in merged.iter().enumerate() {
            let text = norm(text);
            if text.is_empty() {
                continue;
            }
            for (field, syns) in &self.fields {
                if syns.contains(&text) {
                    mapping.fields.entry(*field).or_insert(col);
                }
            }
            for (label, syns) in &self.others {
                if syns.contains(&text) {
                    mapping.others.entry(label.clone()).or_insert(col);
                }
            }
        }
        mapping
    }
}

/// Logical field → zero-based column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMapping {
    fields: BTreeMap<Field, usize>,
    others: BTreeMap<String, usize>,
}

impl HeaderMapping {
    pub fn from_fixed(columns: &FixedColumns) -> Result<Self, ConfigError> {
        let fields: BTreeMap<Field, usize> = columns.assigned().collect();
        if ![Field::Amount, Field::Credit, Field::Debit]
            .iter()
            .any(|f| fields.contains_key(f))
        {
            return Err(ConfigError::NoAmountColumn);
        }
        Ok(Self {
            fields,
            others: BTreeMap::new(),
        })
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        self.fields.get(&field).copied()
    }

    #[cfg(test)]
    fn other(&self, label: &str) -> Option<usize> {
        self.others.get(label).copied()
    }

    /// Date, reference and at least one amount source.
    pub fn is_sufficient(&self) -> bool {
        self.fields.contains_key(&Field::Date)
            && self.fields.contains_key(&Field::Reference)
            && (self.fields.contains_key(&Field::Amount)
                || self.fields.contains_key(&Field::Credit)
                || self.fields.contains_key(&Field::Debit))
    }

    /// Columns claimed by anything other than `field`.
    pub fn columns_except(&self, field: Field) -> impl Iterator<Item = usize> + '_ {
        self.fields
            .iter()
            .filter(move |(f, _)| **f != field)
            .map(|(_, col)| *col)
            .chain(self.others.values().copied())
    }
}

/// Header text per column plus the synonym table, kept for neighbor probing.
#[derive(Debug, Clone, Default)]
pub struct HeaderContext {
    header_by_col: Vec<String>,
    expect: Expectations,
}

impl HeaderContext {
    pub fn new(merged: &[String], expect: Expectations) -> Self {
        Self {
            header_by_col: merged.iter().map(|h| norm(h)).collect(),
            expect,
        }
    }

    /// True when `col` carries header text that names something other than `field`.
    pub fn owned_by_other(&self, field: Field, col: usize) -> bool {
        match self.header_by_col.get(col) {
            Some(text) if !text.is_empty() => !self.expect.matches_field(field, text),
            _ => false,
        }
    }
}

/// Join non-blank cells of rows `from..=to` per column.
///
/// With `fill_forward` a blank merged cell inherits the nearest non-blank text
/// to its left, which is how a label over merged spreadsheet cells reaches
/// every column it spans.
pub fn merge_header<S: RowSource + ?Sized>(
    src: &S,
    from: usize,
    to: usize,
    separator: &str,
    fill_forward: bool,
) -> Vec<String> {
    let last = to.min(src.row_count().saturating_sub(1));
    let rows = if src.row_count() == 0 || from > last {
        from..from
    } else {
        from..last + 1
    };
    let width = rows.clone().map(|r| src.row_len(r)).max().unwrap_or(0);

    let mut merged: Vec<String> = (0..width)
        .map(|col| {
            rows.clone()
                .map(|r| src.cell_text(r, col).replace('\u{00A0}', " "))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(separator)
        })
        .collect();

    if fill_forward {
        let mut last_seen = String::new();
        for cell in merged.iter_mut() {
            if cell.is_empty() {
                cell.clone_from(&last_seen);
            } else {
                last_seen.clone_from(cell);
            }
        }
    }
    merged
}

#[derive(Debug, Clone)]
struct BandCheck {
    expect: Expectations,
    window: usize,
    separator: String,
    fill_forward: bool,
}

/// Result of header discovery for one file.
#[derive(Debug, Clone)]
pub struct ResolvedHeader {
    pub mapping: HeaderMapping,
    /// Zero-based first data row.
    pub data_start: usize,
    /// Present for searched spreadsheet headers only.
    pub context: Option<HeaderContext>,
    band: Option<BandCheck>,
}

impl ResolvedHeader {
    /// Rows in a repeated header band, or 0 when `row` starts ordinary data.
    pub fn repeated_band_at<S: RowSource + ?Sized>(&self, src: &S, row: usize) -> usize {
        let Some(band) = &self.band else {
            return 0;
        };
        let end = row + band.window - 1;
        if end >= src.row_count() {
            return 0;
        }
        let merged = merge_header(src, row, end, &band.separator, band.fill_forward);
        if band.expect.map(&merged).is_sufficient() {
            band.window
        } else {
            0
        }
    }
}

/// Locates the header for one file.
pub struct HeaderResolver<'a> {
    cfg: &'a HeaderConfig,
    spreadsheet: bool,
}

impl<'a> HeaderResolver<'a> {
    pub fn delimited(cfg: &'a HeaderConfig) -> Self {
        Self {
            cfg,
            spreadsheet: false,
        }
    }

    pub fn spreadsheet(cfg: &'a HeaderConfig) -> Self {
        Self {
            cfg,
            spreadsheet: true,
        }
    }

    pub fn resolve<S: RowSource + ?Sized>(&self, src: &S) -> Result<ResolvedHeader, ParseError> {
        match self.cfg {
            HeaderConfig::Fixed(fixed) => Ok(ResolvedHeader {
                mapping: HeaderMapping::from_fixed(&fixed.columns)?,
                data_start: fixed.row_start,
                context: None,
                band: None,
            }),
            HeaderConfig::Search(search) => self.search(src, search),
        }
    }

    fn search<S: RowSource + ?Sized>(
        &self,
        src: &S,
        search: &SearchHeaders,
    ) -> Result<ResolvedHeader, ParseError> {
        let expect = Expectations::from_config(&search.expect);
        let mut window = search.window();
        let sep = search.merge_separator.as_str();

        let found = if let Some(range) = &search.fixed_header_rows {
            let (from, to) = search.zero_based(range)?;
            window = to - from + 1;
            let merged = merge_header(src, from, to, sep, self.spreadsheet);
            let mapping = expect.map(&merged);
            if !mapping.is_sufficient() {
                return Err(ParseError::HeaderNotFound(format!(
                    "rows {}..={} do not name date, reference and an amount column",
                    range.from, range.to
                )));
            }
            (mapping, merged, to, to + search.row_start_offset)
        } else if let Some(range) = &search.scan_range {
            let (from, to) = search.zero_based(range)?;
            self.scan(src, &expect, from, to, window, sep)
                .map(|(srow, mapping, merged)| {
                    let header_end = srow + window - 1;
                    (mapping, merged, header_end, header_end + search.row_start_offset)
                })
                .ok_or_else(|| {
                    ParseError::HeaderNotFound(format!(
                        "no {}-row header window in rows {}..={}",
                        window, range.from, range.to
                    ))
                })?
        } else {
            return Err(ConfigError::InvalidHeaderWindow(
                "search headers need scan_range or fixed_header_rows".to_string(),
            )
            .into());
        };

        let (mapping, merged, header_end, data_start) = found;
        debug!(header_end, data_start, mapping = ?mapping, "Resolved header window");

        Ok(ResolvedHeader {
            mapping,
            data_start,
            context: self
                .spreadsheet
                .then(|| HeaderContext::new(&merged, expect.clone())),
            band: Some(BandCheck {
                expect,
                window,
                separator: search.merge_separator.clone(),
                fill_forward: self.spreadsheet,
            }),
        })
    }

    fn scan<S: RowSource + ?Sized>(
        &self,
        src: &S,
        expect: &Expectations,
        from: usize,
        to: usize,
        window: usize,
        sep: &str,
    ) -> Option<(usize, HeaderMapping, Vec<String>)> {
        if to + 1 < from + window {
            return None;
        }
        (from..=to + 1 - window).find_map(|srow| {
            let merged = merge_header(src, srow, srow + window - 1, sep, self.spreadsheet);
            let mapping = expect.map(&merged);
            mapping.is_sufficient().then_some((srow, mapping, merged))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statera_core::config::{FixedHeaders, RowRange};

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn search(expect: &[(&str, &[&str])], window: usize) -> SearchHeaders {
        SearchHeaders {
            scan_range: None,
            fixed_header_rows: None,
            expect: expect
                .iter()
                .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
                .collect(),
            row_start_offset: 1,
            multi_row_count: window,
            one_based_rows: true,
            merge_separator: " ".to_string(),
        }
    }

    const BASIC: &[(&str, &[&str])] = &[
        ("date", &["Date", "Txn Date"]),
        ("reference", &["Narration"]),
        ("credit", &["Credit"]),
        ("debit", &["Debit"]),
    ];

    // ── norm / merge ──────────────────────────────────────────────────────────

    #[test]
    fn norm_collapses_and_folds() {
        assert_eq!(norm("  Txn\u{00A0}\u{00A0}DATE \n"), "txn date");
    }

    #[test]
    fn merge_joins_non_blank_cells() {
        let g = grid(&[&["Transaction", "", "Amount"], &["Date", "Narration", ""]]);
        assert_eq!(
            merge_header(&g, 0, 1, " ", false),
            vec!["Transaction Date", "Narration", "Amount"]
        );
    }

    #[test]
    fn fill_forward_covers_merged_span() {
        let g = grid(&[&["Date", "Credit", "", "", "Balance"]]);
        assert_eq!(
            merge_header(&g, 0, 0, " ", true),
            vec!["Date", "Credit", "Credit", "Credit", "Balance"]
        );
        assert_eq!(merge_header(&g, 0, 0, " ", false)[2], "");
    }

    // ── mapping ───────────────────────────────────────────────────────────────

    #[test]
    fn first_column_wins_per_field() {
        let expect = Expectations::from_config(&search(BASIC, 1).expect);
        let merged: Vec<String> = ["Date", "Narration", "Credit", "credit"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mapping = expect.map(&merged);
        assert_eq!(mapping.get(Field::Credit), Some(2));
        assert!(mapping.is_sufficient());
    }

    #[test]
    fn guard_labels_are_mapped_but_not_fields() {
        let expect = Expectations::from_config(
            &search(&[("date", &["Date"]), ("instrument", &["Instrument Id"])], 1).expect,
        );
        let merged = vec!["Date".to_string(), "Instrument  ID".to_string()];
        let mapping = expect.map(&merged);
        assert_eq!(mapping.other("instrument"), Some(1));
        assert_eq!(mapping.columns_except(Field::Date).collect::<Vec<_>>(), vec![1]);
        assert!(!mapping.is_sufficient());
    }

    #[test]
    fn fixed_columns_need_an_amount_source() {
        let mut columns = FixedColumns {
            date: Some(0),
            reference: Some(1),
            ..FixedColumns::default()
        };
        assert!(matches!(
            HeaderMapping::from_fixed(&columns),
            Err(ConfigError::NoAmountColumn)
        ));
        columns.debit = Some(3);
        assert_eq!(HeaderMapping::from_fixed(&columns).unwrap().get(Field::Debit), Some(3));
    }

    // ── resolve ───────────────────────────────────────────────────────────────

    #[test]
    fn fixed_mode_uses_row_start() {
        let cfg = HeaderConfig::Fixed(FixedHeaders {
            row_start: 4,
            columns: FixedColumns {
                amount: Some(2),
                ..FixedColumns::default()
            },
        });
        let resolved = HeaderResolver::delimited(&cfg).resolve(&grid(&[])).unwrap();
        assert_eq!(resolved.data_start, 4);
        assert_eq!(resolved.repeated_band_at(&grid(&[&["x"]]), 0), 0);
    }

    #[test]
    fn scan_finds_first_sufficient_row() {
        let g = grid(&[
            &["Statement of account"],
            &["Date", "Narration"],
            &["Date", "Narration", "Credit", "Debit"],
            &["01/01/2024", "A/B", "10", ""],
        ]);
        let mut s = search(BASIC, 1);
        s.scan_range = Some(RowRange { from: 1, to: 10 });
        let cfg = HeaderConfig::Search(s);
        let resolved = HeaderResolver::delimited(&cfg).resolve(&g).unwrap();
        assert_eq!(resolved.data_start, 3);
        assert_eq!(resolved.mapping.get(Field::Debit), Some(3));
        assert!(resolved.context.is_none());
    }

    #[test]
    fn scan_outside_range_is_header_not_found() {
        let g = grid(&[&["x"], &["x"], &["Date", "Narration", "Credit"]]);
        let mut s = search(BASIC, 1);
        s.scan_range = Some(RowRange { from: 1, to: 2 });
        let cfg = HeaderConfig::Search(s);
        assert!(matches!(
            HeaderResolver::delimited(&cfg).resolve(&g),
            Err(ParseError::HeaderNotFound(_))
        ));
    }

    #[test]
    fn two_row_window_merges_label() {
        let g = grid(&[
            &["Transaction", "", "", ""],
            &["Date", "Narration", "Credit", "Balance"],
            &["01/01/2024", "ORD/UTR", "10", "10"],
        ]);
        let mut s = search(&[("date", &["Transaction Date"]), ("reference", &["Narration"]), ("credit", &["Credit"])], 2);
        s.fixed_header_rows = Some(RowRange { from: 1, to: 2 });
        let cfg = HeaderConfig::Search(s);
        let resolved = HeaderResolver::spreadsheet(&cfg).resolve(&g).unwrap();
        assert_eq!(resolved.mapping.get(Field::Date), Some(0));
        assert_eq!(resolved.data_start, 2);
        assert!(resolved.context.is_some());
    }

    #[test]
    fn insufficient_fixed_window_fails() {
        let g = grid(&[&["Date", "Narration"]]);
        let mut s = search(BASIC, 1);
        s.fixed_header_rows = Some(RowRange { from: 1, to: 1 });
        let cfg = HeaderConfig::Search(s);
        assert!(matches!(
            HeaderResolver::delimited(&cfg).resolve(&g),
            Err(ParseError::HeaderNotFound(_))
        ));
    }

    #[test]
    fn search_without_window_is_config_error() {
        let cfg = HeaderConfig::Search(search(BASIC, 1));
        assert!(matches!(
            HeaderResolver::delimited(&cfg).resolve(&grid(&[])),
            Err(ParseError::Config(ConfigError::InvalidHeaderWindow(_)))
        ));
    }

    #[test]
    fn repeated_band_is_detected() {
        let g = grid(&[
            &["Date", "Narration", "Credit"],
            &["01/01/2024", "A/B", "5"],
            &["Date", "Narration", "Credit"],
            &["02/01/2024", "C/D", "6"],
        ]);
        let mut s = search(BASIC, 1);
        s.fixed_header_rows = Some(RowRange { from: 1, to: 1 });
        let cfg = HeaderConfig::Search(s);
        let resolved = HeaderResolver::delimited(&cfg).resolve(&g).unwrap();
        assert_eq!(resolved.repeated_band_at(&g, 1), 0);
        assert_eq!(resolved.repeated_band_at(&g, 2), 1);
        assert_eq!(resolved.repeated_band_at(&g, 4), 0);
    }

    #[test]
    fn context_flags_foreign_headers() {
        let expect = Expectations::from_config(&search(BASIC, 1).expect);
        let merged: Vec<String> = ["Date", "Instrument Id", "Credit", ""]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let ctx = HeaderContext::new(&merged, expect);
        assert!(ctx.owned_by_other(Field::Credit, 1));
        assert!(!ctx.owned_by_other(Field::Credit, 2));
        assert!(!ctx.owned_by_other(Field::Credit, 3));
        assert!(!ctx.owned_by_other(Field::Credit, 9));
    }
}
