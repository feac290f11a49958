//! In-memory spreadsheet grid with merged-region metadata.
//!
//! Workbooks are read once through calamine and flattened into cell text, so
//! everything downstream works on plain strings whatever the workbook format.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Dimensions, Range, Reader, Sheets};
use regex::Regex;
use statera_core::config::{ConfigError, RowStopConfig, RowStopMode};
use tracing::debug;

use crate::datetime::excel_serial_to_datetime;
use crate::error::ParseError;
use crate::header::RowSource;

/// Inclusive merged cell block; only the top-left cell carries the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRegion {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

impl MergedRegion {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn spans_col(&self, col: usize) -> bool {
        (self.first_col..=self.last_col).contains(&col)
    }
}

impl From<&Dimensions> for MergedRegion {
    fn from(dim: &Dimensions) -> Self {
        Self {
            first_row: dim.start.0 as usize,
            last_row: dim.end.0 as usize,
            first_col: dim.start.1 as usize,
            last_col: dim.end.1 as usize,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    rows: Vec<Vec<String>>,
    merged: Vec<MergedRegion>,
}

impl Sheet {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows,
            merged: Vec::new(),
        }
    }

    pub fn with_merged(mut self, region: MergedRegion) -> Self {
        self.merged.push(region);
        self
    }

    /// Load one worksheet of a workbook. The container is sniffed from the
    /// bytes, so a legacy `.xls` and a modern `.xlsx` load the same way
    /// whatever the upload was called.
    pub fn load(bytes: &[u8], sheet_index: usize) -> Result<Self, ParseError> {
        let mut wb = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let name = sheet_name(&wb.sheet_names(), sheet_index)?;
        let range = wb.worksheet_range(&name)?;
        let merged: Vec<MergedRegion> = match &mut wb {
            Sheets::Xlsx(xlsx) => {
                xlsx.load_merged_regions().map_err(calamine::Error::from)?;
                xlsx.merged_regions_by_sheet(&name)
                    .into_iter()
                    .map(|(_, _, dim)| MergedRegion::from(dim))
                    .collect()
            }
            Sheets::Xls(xls) => xls
                .worksheet_merge_cells(&name)
                .unwrap_or_default()
                .iter()
                .map(MergedRegion::from)
                .collect(),
            _ => Vec::new(),
        };
        debug!(sheet = %name, merged = merged.len(), "Loaded worksheet");
        Ok(Self::from_range(&range, merged))
    }

    /// Positions in `range` are relative to its start; the grid is padded so
    /// indices match the worksheet's absolute row and column numbers.
    fn from_range(range: &Range<Data>, merged: Vec<MergedRegion>) -> Self {
        let (row0, col0) = range
            .start()
            .map_or((0, 0), |(r, c)| (r as usize, c as usize));
        let mut rows: Vec<Vec<String>> = vec![Vec::new(); row0];
        for cells in range.rows() {
            let mut row = vec![String::new(); col0];
            row.extend(cells.iter().map(render_cell));
            while row.last().is_some_and(|c| c.is_empty()) {
                row.pop();
            }
            rows.push(row);
        }
        Self { rows, merged }
    }

    pub fn merged_region_at(&self, row: usize, col: usize) -> Option<&MergedRegion> {
        self.merged.iter().find(|m| m.contains(row, col))
    }

    /// Trimmed direct cell text, else the trimmed top-left text of the merged
    /// region covering the cell. `None` when both are blank.
    pub fn cell_or_merged_top_left(&self, row: usize, col: usize) -> Option<&str> {
        let direct = self.cell_text(row, col).trim();
        if !direct.is_empty() {
            return Some(direct);
        }
        let region = self.merged_region_at(row, col)?;
        let top_left = self.cell_text(region.first_row, region.first_col).trim();
        (!top_left.is_empty()).then_some(top_left)
    }

    pub fn row_is_blank(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .map_or(true, |cells| cells.iter().all(|c| c.trim().is_empty()))
    }

    /// Row cells joined by single spaces.
    pub fn row_line(&self, row: usize) -> String {
        self.rows
            .get(row)
            .map(|cells| cells.join(" ").trim().to_string())
            .unwrap_or_default()
    }
}

impl RowSource for Sheet {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row_len(&self, row: usize) -> usize {
        self.rows.row_len(row)
    }

    fn cell_text(&self, row: usize, col: usize) -> &str {
        self.rows.cell_text(row, col)
    }

    fn value_at(&self, row: usize, col: usize) -> Option<&str> {
        self.cell_or_merged_top_left(row, col)
    }
}

fn sheet_name(names: &[String], index: usize) -> Result<String, ParseError> {
    names
        .get(index)
        .cloned()
        .ok_or(ParseError::MissingSheet { index })
}

/// Formula cells arrive as their cached result; a formula without one is blank.
fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match excel_serial_to_datetime(serial) {
                Some(ts) if serial < 1.0 => ts.format("%H:%M:%S").to_string(),
                Some(ts) => ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
                None => serial.to_string(),
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Early end-of-table detection for spreadsheet scans.
#[derive(Debug, Clone)]
pub enum RowStop {
    Never,
    BlankRow,
    Until(Regex),
}

impl RowStop {
    pub fn from_config(cfg: &RowStopConfig) -> Result<Self, ConfigError> {
        Ok(match (cfg.mode, cfg.until_regex.as_deref()) {
            (RowStopMode::None, _) | (RowStopMode::Until, None) => Self::Never,
            (RowStopMode::BlankRows, _) => Self::BlankRow,
            (RowStopMode::Until, Some(pattern)) => {
                Self::Until(Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
                    name: "row_stop.until_regex",
                    message: e.to_string(),
                })?)
            }
        })
    }

    pub fn stops_at(&self, sheet: &Sheet, row: usize) -> bool {
        match self {
            Self::Never => false,
            Self::BlankRow => sheet.row_is_blank(row),
            Self::Until(re) => re.is_match(&sheet.row_line(row)),
        }
    }
}
