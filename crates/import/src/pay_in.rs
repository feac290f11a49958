use rust_decimal::Decimal;
use statera_core::config::PayInRuleConfig;
use tracing::warn;

/// Decides whether a row is money received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PayInRule {
    #[default]
    AmountPositive,
    CreditColumn,
    OrderIdNoSpace,
    UtrNoSpace,
    /// Lowercased needles; matched case-insensitively against the reference.
    NarrationContains(Vec<String>),
}

impl PayInRule {
    /// Unknown or unset rule types use the default rule.
    pub fn from_config(cfg: &PayInRuleConfig) -> Self {
        let Some(kind) = cfg.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) else {
            return Self::default();
        };
        match kind {
            "amount_positive" | "amountPositive" => Self::AmountPositive,
            "credit_column" | "creditColumn" => Self::CreditColumn,
            "order_id_no_space" | "orderIdNoSpace" => Self::OrderIdNoSpace,
            "utr_no_space" | "utrNoSpace" => Self::UtrNoSpace,
            "narration_contains" | "narrationContains" => Self::NarrationContains(
                cfg.narration_contains_any
                    .iter()
                    .map(|n| n.trim().to_lowercase())
                    .filter(|n| !n.is_empty())
                    .collect(),
            ),
            other => {
                warn!(rule = other, "Unknown pay-in rule, using amount_positive");
                Self::default()
            }
        }
    }

    pub fn is_pay_in(
        &self,
        amount: Decimal,
        reference: &str,
        order_id: Option<&str>,
        utr: Option<&str>,
    ) -> bool {
        let positive = amount > Decimal::ZERO;
        match self {
            Self::AmountPositive | Self::CreditColumn => positive,
            Self::OrderIdNoSpace => positive && no_internal_space(order_id),
            Self::UtrNoSpace => positive && no_internal_space(utr),
            Self::NarrationContains(needles) => {
                let haystack = reference.to_lowercase();
                needles.iter().any(|n| haystack.contains(n.as_str()))
            }
        }
    }
}

fn no_internal_space(value: Option<&str>) -> bool {
    value.map_or(true, |v| !v.contains(char::is_whitespace))
}
