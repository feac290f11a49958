use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical statement column the engine knows how to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Date,
    Time,
    Reference,
    Credit,
    Debit,
    Amount,
    Balance,
}

/// Whether a value read for a field must parse as a number to be usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Text,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Date,
        Field::Time,
        Field::Reference,
        Field::Credit,
        Field::Debit,
        Field::Amount,
        Field::Balance,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::Time => "time",
            Field::Reference => "reference",
            Field::Credit => "credit",
            Field::Debit => "debit",
            Field::Amount => "amount",
            Field::Balance => "balance",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Credit | Field::Debit | Field::Amount | Field::Balance => FieldKind::Numeric,
            Field::Date | Field::Time | Field::Reference => FieldKind::Text,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date" => Ok(Field::Date),
            "time" => Ok(Field::Time),
            "reference" | "ref" => Ok(Field::Reference),
            "credit" => Ok(Field::Credit),
            "debit" => Ok(Field::Debit),
            "amount" => Ok(Field::Amount),
            "balance" => Ok(Field::Balance),
            other => Err(format!("Unknown field: '{other}'")),
        }
    }
}
