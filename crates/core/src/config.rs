//! Per-bank parsing configuration.
//!
//! Loaded once (typically from TOML) and shared read-only by every parse.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::field::Field;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Unknown bank: '{0}'")]
    UnknownBank(String),
    #[error("Bank '{bank}' has no {section} configuration")]
    MissingSection { bank: String, section: &'static str },
    #[error("Invalid {name} regex: {message}")]
    InvalidRegex { name: &'static str, message: String },
    #[error("Invalid header window: {0}")]
    InvalidHeaderWindow(String),
    #[error("Fixed header columns need at least one of amount, credit or debit")]
    NoAmountColumn,
}

/// Registry of bank key → configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default)]
    pub banks: BTreeMap<String, BankConfig>,
}

impl ParserConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let mut config: ParserConfig = toml::from_str(toml_content)?;
        for (key, bank) in config.banks.iter_mut() {
            if bank.parser_key.is_empty() {
                bank.parser_key = key.clone();
            }
        }
        Ok(config)
    }

    pub fn bank(&self, parser_key: &str) -> Result<&BankConfig, ConfigError> {
        self.banks
            .get(parser_key)
            .or_else(|| self.banks.get(&parser_key.to_lowercase()))
            .ok_or_else(|| ConfigError::UnknownBank(parser_key.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BankConfig {
    /// Bank key; also selects the account detection profile.
    #[serde(default)]
    pub parser_key: String,
    pub csv: Option<SourceConfig>,
    pub xlsx: Option<SourceConfig>,
    pub xls: Option<SourceConfig>,
    pub pdf: Option<PdfConfig>,
}

impl BankConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_content)?)
    }

    pub fn delimited(&self) -> Result<&SourceConfig, ConfigError> {
        self.csv.as_ref().ok_or_else(|| self.missing("csv"))
    }

    pub fn spreadsheet_modern(&self) -> Result<&SourceConfig, ConfigError> {
        self.xlsx.as_ref().ok_or_else(|| self.missing("xlsx"))
    }

    /// Legacy workbooks reuse the modern layout when no dedicated section exists.
    pub fn spreadsheet_legacy(&self) -> Result<&SourceConfig, ConfigError> {
        self.xls
            .as_ref()
            .or(self.xlsx.as_ref())
            .ok_or_else(|| self.missing("xls"))
    }

    pub fn page_document(&self) -> Result<&PdfConfig, ConfigError> {
        self.pdf.as_ref().ok_or_else(|| self.missing("pdf"))
    }

    fn missing(&self, section: &'static str) -> ConfigError {
        ConfigError::MissingSection {
            bank: self.parser_key.clone(),
            section,
        }
    }
}

/// Layout of a delimited-text or spreadsheet statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub sheet_index: usize,
    pub headers: HeaderConfig,
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub date_parse: DateParseConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub pay_in_rule: PayInRuleConfig,
    #[serde(default)]
    pub numeric: NumericConfig,
    #[serde(default)]
    pub row_stop: RowStopConfig,
    #[serde(default)]
    pub csv: CsvOptions,
    /// How many columns either side a spreadsheet read may probe when the mapped cell is blank.
    #[serde(default = "default_neighbor_radius")]
    pub neighbor_radius: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HeaderConfig {
    Fixed(FixedHeaders),
    Search(SearchHeaders),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixedHeaders {
    /// Zero-based index of the first data row.
    #[serde(default)]
    pub row_start: usize,
    #[serde(default)]
    pub columns: FixedColumns,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixedColumns {
    pub date: Option<usize>,
    pub time: Option<usize>,
    pub reference: Option<usize>,
    pub credit: Option<usize>,
    pub debit: Option<usize>,
    pub amount: Option<usize>,
    pub balance: Option<usize>,
}

impl FixedColumns {
    pub fn get(&self, field: Field) -> Option<usize> {
        match field {
            Field::Date => self.date,
            Field::Time => self.time,
            Field::Reference => self.reference,
            Field::Credit => self.credit,
            Field::Debit => self.debit,
            Field::Amount => self.amount,
            Field::Balance => self.balance,
        }
    }

    pub fn assigned(&self) -> impl Iterator<Item = (Field, usize)> + '_ {
        Field::ALL
            .into_iter()
            .filter_map(|field| self.get(field).map(|col| (field, col)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHeaders {
    pub scan_range: Option<RowRange>,
    /// When set, exactly these rows form the header window and no scan happens.
    pub fixed_header_rows: Option<RowRange>,
    /// Label → header synonyms. Labels that are not logical fields still claim
    /// their column so neighbor probing leaves it alone.
    #[serde(default)]
    pub expect: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_one")]
    pub row_start_offset: usize,
    #[serde(default = "default_one")]
    pub multi_row_count: usize,
    #[serde(default = "default_true")]
    pub one_based_rows: bool,
    #[serde(default = "default_merge_separator")]
    pub merge_separator: String,
}

impl SearchHeaders {
    /// Convert a configured row range to zero-based inclusive bounds.
    pub fn zero_based(&self, range: &RowRange) -> Result<(usize, usize), ConfigError> {
        let (from, to) = if self.one_based_rows {
            if range.from == 0 || range.to == 0 {
                return Err(ConfigError::InvalidHeaderWindow(
                    "one-based row numbers start at 1".to_string(),
                ));
            }
            (range.from - 1, range.to - 1)
        } else {
            (range.from, range.to)
        };
        if from > to {
            return Err(ConfigError::InvalidHeaderWindow(format!(
                "from ({}) is after to ({})",
                range.from, range.to
            )));
        }
        Ok((from, to))
    }

    pub fn window(&self) -> usize {
        self.multi_row_count.max(1)
    }
}

/// Inclusive row range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Fail the parse when neither override nor detection yields an account number.
    #[serde(default)]
    pub required: bool,
    /// Cell known to hold the account number.
    pub cell: Option<CellRef>,
    #[serde(default = "default_true")]
    pub one_based: bool,
    /// Characters matching this regex are removed from the cell text. Defaults to non-digits.
    pub cleanup_regex: Option<String>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            required: false,
            cell: None,
            one_based: true,
            cleanup_regex: None,
        }
    }
}

impl AccountConfig {
    /// Zero-based (row, col) of the configured cell, if any.
    pub fn cell_position(&self) -> Option<(usize, usize)> {
        let cell = self.cell?;
        if self.one_based {
            Some((cell.row.checked_sub(1)?, cell.col.checked_sub(1)?))
        } else {
            Some((cell.row, cell.col))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateInput {
    #[default]
    String,
    ExcelSerial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateParseConfig {
    #[serde(default)]
    pub input: DateInput,
    /// `dd/MM/yyyy` style or chrono `%d/%m/%Y` style.
    #[serde(default = "default_date_format")]
    pub format: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,
    #[serde(default)]
    pub with_time_in_same_field: bool,
}

impl Default for DateParseConfig {
    fn default() -> Self {
        Self {
            input: DateInput::String,
            format: default_date_format(),
            time_format: default_time_format(),
            with_time_in_same_field: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceConfig {
    pub splitter: Option<String>,
    pub parts_count: Option<PartsCount>,
    pub order_id: Option<PartIndex>,
    pub utr: Option<PartIndex>,
    pub utr_fallback: Option<UtrFallback>,
    #[serde(default)]
    pub skip_if: SkipIf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartsMode {
    Exact,
    OneOf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartsCount {
    pub mode: PartsMode,
    #[serde(default)]
    pub values: Vec<usize>,
}

impl PartsCount {
    pub fn exact(n: usize) -> Self {
        Self {
            mode: PartsMode::Exact,
            values: vec![n],
        }
    }

    pub fn accepts(&self, parts: usize) -> bool {
        match self.mode {
            PartsMode::Exact => self.values.first() == Some(&parts),
            PartsMode::OneOf => self.values.contains(&parts),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartIndex {
    pub index: usize,
    #[serde(default)]
    pub digits_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtrFallback {
    pub regex: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipIf {
    #[serde(default)]
    pub empty_utr: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayInRuleConfig {
    /// `amount_positive`, `credit_column`, `order_id_no_space`, `utr_no_space`
    /// or `narration_contains`. Anything else uses the default rule.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub narration_contains_any: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericConfig {
    #[serde(default = "default_thousands")]
    pub thousands_separator: String,
    #[serde(default = "default_decimal")]
    pub decimal_separator: String,
}

impl Default for NumericConfig {
    fn default() -> Self {
        Self {
            thousands_separator: default_thousands(),
            decimal_separator: default_decimal(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStopMode {
    #[default]
    None,
    BlankRows,
    Until,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowStopConfig {
    #[serde(default)]
    pub mode: RowStopMode,
    pub until_regex: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvOptions {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default)]
    pub skip_rows: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            charset: default_charset(),
            skip_rows: 0,
        }
    }
}

/// Layout of a page-based (PDF) statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    pub pdf_table: PdfTableConfig,
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub date_parse: DateParseConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub pay_in_rule: PayInRuleConfig,
    #[serde(default)]
    pub numeric: NumericConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfTableConfig {
    pub start_after_regex: Option<String>,
    pub stop_before_regex: Option<String>,
    /// Named groups: date, time, reference (or ref), credit, debit, amount, balance.
    pub line_pattern: String,
    pub account_regex: Option<String>,
}

fn default_one() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_neighbor_radius() -> usize {
    3
}

fn default_merge_separator() -> String {
    " ".to_string()
}

fn default_date_format() -> String {
    "dd/MM/yyyy".to_string()
}

fn default_time_format() -> String {
    "HH:mm:ss".to_string()
}

fn default_thousands() -> String {
    ",".to_string()
}

fn default_decimal() -> String {
    ".".to_string()
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_charset() -> String {
    "UTF-8".to_string()
}
