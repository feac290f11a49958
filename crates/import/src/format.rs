use crate::error::ParseError;

/// The kinds of statement file the engine can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    DelimitedText,
    SpreadsheetModern,
    SpreadsheetLegacy,
    PageDocument,
}

impl FileKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::DelimitedText => "csv",
            Self::SpreadsheetModern => "xlsx",
            Self::SpreadsheetLegacy => "xls",
            Self::PageDocument => "pdf",
        }
    }
}

/// Pick the file kind from the extension, then from the content type.
pub fn detect(filename: &str, content_type: Option<&str>) -> Result<FileKind, ParseError> {
    let name = filename.trim().to_lowercase();
    let by_extension = if name.ends_with(".csv") {
        Some(FileKind::DelimitedText)
    } else if name.ends_with(".xlsx") {
        Some(FileKind::SpreadsheetModern)
    } else if name.ends_with(".xls") {
        Some(FileKind::SpreadsheetLegacy)
    } else if name.ends_with(".pdf") {
        Some(FileKind::PageDocument)
    } else {
        None
    };
    if let Some(kind) = by_extension {
        return Ok(kind);
    }

    let ct = content_type.unwrap_or_default().to_lowercase();
    if ct.contains("csv") {
        Ok(FileKind::DelimitedText)
    } else if ct.contains("spreadsheetml") {
        Ok(FileKind::SpreadsheetModern)
    } else if ct.contains("excel") {
        Ok(FileKind::SpreadsheetLegacy)
    } else if ct.contains("pdf") {
        Ok(FileKind::PageDocument)
    } else {
        Err(ParseError::UnsupportedFormat {
            filename: filename.to_string(),
        })
    }
}
