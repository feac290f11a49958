//! Account number discovery: caller overrides, a configured cell, page text,
//! and a profile-driven heuristic scan of spreadsheet preambles.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use statera_core::config::{AccountConfig, ConfigError};

use crate::header::{norm, RowSource};
use crate::sheet::Sheet;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_account_digits, r"\b\d{9,20}\b");
re!(re_non_account_key, r"(?i)\b(IFSC|CIF|Customer\s*Id|GST|PAN|MICR)\b");
re!(re_non_digit, r"\D");

// ── Profiles ─────────────────────────────────────────────────────────────────

/// Where and how one bank tends to print its account number.
#[derive(Debug, Clone)]
pub struct AccountDetectionProfile {
    /// Lowercase label fragments such as "a/c no".
    pub label_synonyms: Vec<String>,
    pub header_search_rows: usize,
    /// Zero-based columns probed directly.
    pub likely_columns: Vec<usize>,
    pub value_pattern: Regex,
    /// How far right of a label the value may sit.
    pub label_scan_columns: usize,
    /// Digit count that makes a cell a plausible account number on its own.
    pub min_digits: usize,
}

impl AccountDetectionProfile {
    pub fn new(labels: &[&str], header_search_rows: usize, likely_columns: Vec<usize>) -> Self {
        Self {
            label_synonyms: labels.iter().map(|l| l.to_lowercase()).collect(),
            header_search_rows,
            likely_columns,
            value_pattern: re_account_digits().clone(),
            label_scan_columns: 25,
            min_digits: 9,
        }
    }

    /// Digits-only content when long enough, else the first pattern match.
    fn plausible(&self, text: &str) -> Option<String> {
        let digits = re_non_digit().replace_all(text, "");
        if digits.len() >= self.min_digits {
            return Some(digits.into_owned());
        }
        self.value_pattern.find(text).map(|m| m.as_str().to_string())
    }
}

/// Immutable bank key → profile registry. Lookups never fail.
#[derive(Debug, Clone)]
pub struct AccountProfiles {
    default: AccountDetectionProfile,
    banks: HashMap<String, AccountDetectionProfile>,
}

impl AccountProfiles {
    pub fn new(default: AccountDetectionProfile) -> Self {
        Self {
            default,
            banks: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut profiles = Self::new(AccountDetectionProfile::new(
            &[
                "account no",
                "account number",
                "a/c no",
                "a/c number",
                "acc no",
                "acc number",
                "number",
                "no.",
                "ac no",
                "ac number",
            ],
            80,
            vec![10, 11, 12, 13, 14],
        ));
        profiles.insert(
            "kgb",
            AccountDetectionProfile::new(
                &["number", "account no", "account number", "a/c no", "a/c number"],
                80,
                vec![11, 12, 13],
            ),
        );
        profiles
    }

    /// `"_default"` replaces the fallback profile.
    pub fn insert(&mut self, bank: &str, profile: AccountDetectionProfile) {
        let key = bank.to_lowercase();
        if key == "_default" {
            self.default = profile;
        } else {
            self.banks.insert(key, profile);
        }
    }

    pub fn resolve(&self, bank: &str) -> &AccountDetectionProfile {
        self.banks.get(&bank.to_lowercase()).unwrap_or(&self.default)
    }
}

impl Default for AccountProfiles {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ── Sources ──────────────────────────────────────────────────────────────────

/// Reduce a caller override to digits; nothing left means no override.
pub fn cleanup_account(raw: Option<&str>) -> Option<String> {
    let cleaned = re_non_digit().replace_all(raw?, "");
    (!cleaned.is_empty()).then(|| cleaned.into_owned())
}

/// Account number from the configured cell, cleaned with `cleanup_regex`.
pub fn read_account_cell<S: RowSource + ?Sized>(
    src: &S,
    cfg: &AccountConfig,
) -> Result<Option<String>, ConfigError> {
    let Some((row, col)) = cfg.cell_position() else {
        return Ok(None);
    };
    let raw = src.value_at(row, col).unwrap_or_default();
    let cleaned = match cfg.cleanup_regex.as_deref() {
        Some(pattern) => Regex::new(pattern)
            .map_err(|e| ConfigError::InvalidRegex {
                name: "account.cleanup_regex",
                message: e.to_string(),
            })?
            .replace_all(raw, "")
            .into_owned(),
        None => re_non_digit().replace_all(raw, "").into_owned(),
    };
    let cleaned = cleaned.trim().to_string();
    Ok((!cleaned.is_empty()).then_some(cleaned))
}

/// First capture group (or the whole match) of `pattern` in `text`, digits only.
pub fn account_from_text(text: &str, pattern: &Regex) -> Option<String> {
    let caps = pattern.captures(text)?;
    let hit = caps.get(1).or_else(|| caps.get(0))?;
    cleanup_account(Some(hit.as_str()))
}

// ── Heuristic detection ──────────────────────────────────────────────────────

/// Scan the sheet preamble for an account number.
///
/// Three passes, first hit wins: a label followed by a value to its right,
/// the profile's likely columns, then any digit block that is not sitting
/// next to a different identifier (IFSC, CIF, PAN and the like).
pub fn detect_account(sheet: &Sheet, profile: &AccountDetectionProfile) -> Option<String> {
    let rows = sheet.row_count().min(profile.header_search_rows.max(20));

    by_label(sheet, profile, rows)
        .or_else(|| by_likely_columns(sheet, profile, rows))
        .or_else(|| by_broad_scan(sheet, profile, rows))
}

fn by_label(sheet: &Sheet, profile: &AccountDetectionProfile, rows: usize) -> Option<String> {
    for r in 0..rows {
        for c in 0..sheet.row_len(r) {
            let text = norm(sheet.cell_text(r, c));
            if text.is_empty() {
                continue;
            }
            let labelled = profile
                .label_synonyms
                .iter()
                .any(|syn| !syn.is_empty() && text.contains(syn.as_str()));
            if !labelled {
                continue;
            }
            let found = (c + 1..=c + profile.label_scan_columns)
                .filter_map(|rc| sheet.cell_or_merged_top_left(r, rc))
                .find_map(|v| profile.plausible(v));
            if found.is_some() {
                return found;
            }
        }
    }
    None
}

fn by_likely_columns(
    sheet: &Sheet,
    profile: &AccountDetectionProfile,
    rows: usize,
) -> Option<String> {
    (0..rows).find_map(|r| {
        profile
            .likely_columns
            .iter()
            .filter_map(|&c| sheet.cell_or_merged_top_left(r, c))
            .find_map(|v| profile.plausible(v))
    })
}

fn by_broad_scan(sheet: &Sheet, profile: &AccountDetectionProfile, rows: usize) -> Option<String> {
    let keyed = |r: usize, c: usize| {
        sheet
            .cell_or_merged_top_left(r, c)
            .is_some_and(|v| re_non_account_key().is_match(v))
    };
    for r in 0..rows {
        for c in 0..sheet.row_len(r) {
            let Some(value) = sheet.cell_or_merged_top_left(r, c) else {
                continue;
            };
            let Some(m) = profile.value_pattern.find(value) else {
                continue;
            };
            let near_key = keyed(r, c) || keyed(r, c + 1) || c.checked_sub(1).is_some_and(|l| keyed(r, l));
            if !near_key {
                return Some(m.as_str().to_string());
            }
        }
    }
    None
}
