use regex::Regex;
use statera_core::config::{ConfigError, PartIndex, PartsCount, ReferenceConfig};

/// Order identifier and UTR pulled out of a reference string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecomposedReference {
    pub order_id: Option<String>,
    pub utr: Option<String>,
}

/// Splits payment references into order id and UTR, with a regex fallback for the UTR.
#[derive(Debug, Clone, Default)]
pub struct ReferenceDecomposer {
    splitter: Option<String>,
    parts_count: Option<PartsCount>,
    order_id: Option<PartIndex>,
    utr: Option<PartIndex>,
    utr_fallback: Option<Regex>,
}

impl ReferenceDecomposer {
    pub fn new(cfg: &ReferenceConfig) -> Result<Self, ConfigError> {
        let utr_fallback = cfg
            .utr_fallback
            .as_ref()
            .map(|fb| {
                Regex::new(&fb.regex).map_err(|e| ConfigError::InvalidRegex {
                    name: "utr_fallback",
                    message: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            splitter: cfg.splitter.clone().filter(|s| !s.is_empty()),
            parts_count: cfg.parts_count.clone(),
            order_id: cfg.order_id,
            utr: cfg.utr,
            utr_fallback,
        })
    }

    /// A part count the config rejects yields no parts-based extraction;
    /// that is an empty result, never an error.
    pub fn decompose(&self, reference: &str) -> DecomposedReference {
        let parts = self.split(reference);
        let parts_ok = self
            .parts_count
            .as_ref()
            .map_or(true, |pc| pc.accepts(parts.len()));

        let mut out = DecomposedReference::default();
        if parts_ok {
            out.order_id = self.order_id.and_then(|def| pick(&parts, def));
            out.utr = self.utr.and_then(|def| pick(&parts, def));
        }

        let utr_missing = out.utr.as_deref().map_or(true, |u| u.trim().is_empty());
        if utr_missing {
            if let Some(m) = self.utr_fallback.as_ref().and_then(|re| re.find(reference)) {
                out.utr = Some(m.as_str().to_string());
            }
        }
        out
    }

    /// Trailing empty parts are dropped, so `"A/B/"` splits into two parts.
    fn split<'a>(&self, reference: &'a str) -> Vec<&'a str> {
        let mut parts: Vec<&str> = match &self.splitter {
            Some(sp) => reference.split(sp.as_str()).collect(),
            None => vec![reference],
        };
        while parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }
        parts
    }
}

fn pick(parts: &[&str], def: PartIndex) -> Option<String> {
    let raw = parts.get(def.index)?;
    let cleaned = raw.replace('\u{00A0}', " ");
    let cleaned = cleaned.trim();
    Some(if def.digits_only {
        cleaned.chars().filter(char::is_ascii_digit).collect()
    } else {
        cleaned.to_string()
    })
}
