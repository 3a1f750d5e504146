//! Currency code
//!
//! Accounts carry a three-letter currency code. The ledger stores it verbatim
//! and never converts between currencies.

const CODE_LEN: usize = 3;

/// Upper-case, three-letter currency code (e.g. `USD`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Currency(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurrencyError {
    #[error("Currency code must be {CODE_LEN} ASCII letters (got {0:?})")]
    InvalidCode(String),
}

impl Currency {
    pub fn new(code: &str) -> Result<Self, CurrencyError> {
        let code = code.trim();
        if code.len() != CODE_LEN || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CurrencyError::InvalidCode(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_normalizes_case() {
        assert_eq!(Currency::new("usd").unwrap().as_str(), "USD");
        assert_eq!(Currency::new(" eur ").unwrap().as_str(), "EUR");
    }

    #[test]
    fn test_currency_rejects_bad_codes() {
        for code in ["", "US", "USDT", "U5D", "€€€"] {
            assert!(Currency::new(code).is_err(), "expected error for {:?}", code);
        }
    }
}
