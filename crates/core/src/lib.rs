pub mod config;
pub mod field;
pub mod row;

pub use config::{BankConfig, ConfigError, ParserConfig, PdfConfig, SourceConfig};
pub use field::{Field, FieldKind};
pub use row::ParsedRow;
