use statera_core::{Field, FieldKind};

use crate::header::{HeaderContext, HeaderMapping};
use crate::numeric::NumericConvention;
use crate::sheet::Sheet;

/// Reads logical fields from spreadsheet rows.
///
/// When the mapped cell is blank or unusable, neighbors up to `radius`
/// columns away are probed (right before left at each distance), skipping
/// any column owned by another field.
pub struct CellReader<'a> {
    sheet: &'a Sheet,
    mapping: &'a HeaderMapping,
    context: Option<&'a HeaderContext>,
    numeric: &'a NumericConvention,
    radius: usize,
}

impl<'a> CellReader<'a> {
    pub fn new(
        sheet: &'a Sheet,
        mapping: &'a HeaderMapping,
        context: Option<&'a HeaderContext>,
        numeric: &'a NumericConvention,
        radius: usize,
    ) -> Self {
        Self {
            sheet,
            mapping,
            context,
            numeric,
            radius,
        }
    }

    pub fn read(&self, row: usize, field: Field) -> Option<String> {
        let col = self.mapping.get(field)?;
        if let Some(v) = self.acceptable(row, col, field) {
            return Some(v.to_string());
        }
        for off in 1..=self.radius {
            let right = col + off;
            if !self.owned_elsewhere(row, field, right) {
                if let Some(v) = self.acceptable(row, right, field) {
                    return Some(v.to_string());
                }
            }
            if let Some(left) = col.checked_sub(off) {
                if !self.owned_elsewhere(row, field, left) {
                    if let Some(v) = self.acceptable(row, left, field) {
                        return Some(v.to_string());
                    }
                }
            }
        }
        None
    }

    fn acceptable(&self, row: usize, col: usize, field: Field) -> Option<&'a str> {
        let value = self.sheet.cell_or_merged_top_left(row, col)?;
        match field.kind() {
            FieldKind::Numeric => self.numeric.is_number(value).then_some(value),
            FieldKind::Text => Some(value),
        }
    }

    fn owned_elsewhere(&self, row: usize, field: Field, probe: usize) -> bool {
        if self
            .context
            .is_some_and(|ctx| ctx.owned_by_other(field, probe))
        {
            return true;
        }
        let region = self.sheet.merged_region_at(row, probe);
        self.mapping
            .columns_except(field)
            .any(|other| other == probe || region.is_some_and(|m| m.spans_col(other)))
    }
}
