//! Money and currency types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency codes (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
    CHF,
    MXN,
    BRL,
    SEK,
    NZD,
    KRW,
}

impl Currency {
    pub const ALL: [Currency; 12] = [
        Self::USD,
        Self::EUR,
        Self::GBP,
        Self::JPY,
        Self::CAD,
        Self::AUD,
        Self::CHF,
        Self::MXN,
        Self::BRL,
        Self::SEK,
        Self::NZD,
        Self::KRW,
    ];

    /// Get currency code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::JPY => "JPY",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::CHF => "CHF",
            Self::MXN => "MXN",
            Self::BRL => "BRL",
            Self::SEK => "SEK",
            Self::NZD => "NZD",
            Self::KRW => "KRW",
        }
    }

    /// Lower-case code, the form processor APIs and event payloads use
    pub fn api_code(&self) -> String {
        self.code().to_ascii_lowercase()
    }

    /// Get currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD | Self::NZD | Self::MXN => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::JPY => "¥",
            Self::CHF => "CHF",
            Self::BRL => "R$",
            Self::SEK => "kr",
            Self::KRW => "₩",
        }
    }

    /// Get decimal places (0 for zero-decimal currencies)
    pub fn decimals(&self) -> u32 {
        match self {
            Self::JPY | Self::KRW => 0,
            _ => 2,
        }
    }

    pub fn is_zero_decimal(&self) -> bool {
        self.decimals() == 0
    }

    /// Parse from string, case-insensitive
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::USD
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unknown currency code '{}'", s))
    }
}

/// Money amount with currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in smallest currency unit (cents, pence, etc.)
    pub amount: i64,
    pub currency: Currency,
}

impl Money {
    /// Create a new money amount from smallest unit
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Create USD amount from cents
    pub fn usd(cents: i64) -> Self {
        Self::new(cents, Currency::USD)
    }

    /// Create EUR amount from cents
    pub fn eur(cents: i64) -> Self {
        Self::new(cents, Currency::EUR)
    }

    /// Create GBP amount from pence
    pub fn gbp(pence: i64) -> Self {
        Self::new(pence, Currency::GBP)
    }

    /// Format for display
    pub fn format(&self) -> String {
        let decimals = self.currency.decimals();
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        if decimals == 0 {
            return format!("{}{}{}", sign, self.currency.symbol(), abs);
        }
        let divisor = 10u64.pow(decimals);
        format!(
            "{}{}{}.{:0width$}",
            sign,
            self.currency.symbol(),
            abs / divisor,
            abs % divisor,
            width = decimals as usize
        )
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Sum of two amounts in the same currency
    pub fn checked_add(self, other: Self) -> Option<Self> {
        if self.currency != other.currency {
            return None;
        }
        self.amount
            .checked_add(other.amount)
            .map(|amount| Self::new(amount, self.currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let money = Money::usd(2999);
        assert_eq!(money.amount, 2999);
        assert_eq!(money.currency, Currency::USD);
    }

    #[test]
    fn test_money_format() {
        assert_eq!(Money::usd(2999).format(), "$29.99");
        assert_eq!(Money::usd(5).format(), "$0.05");
        assert_eq!(Money::usd(-150).format(), "-$1.50");
        assert_eq!(Money::new(1000, Currency::JPY).format(), "¥1000");
    }

    #[test]
    fn test_checked_add() {
        assert_eq!(Money::usd(1000).checked_add(Money::usd(500)), Some(Money::usd(1500)));
        assert_eq!(Money::usd(1000).checked_add(Money::eur(500)), None);
    }

    #[test]
    fn test_currency() {
        assert_eq!(Currency::USD.symbol(), "$");
        assert_eq!(Currency::EUR.symbol(), "€");
        assert!(Currency::JPY.is_zero_decimal());
        assert_eq!(Currency::from_code("usd"), Some(Currency::USD));
        assert_eq!(Currency::from_code(" Gbp "), Some(Currency::GBP));
        assert_eq!(Currency::from_code("xyz"), None);
        assert_eq!(Currency::CAD.api_code(), "cad");
        assert!("zzz".parse::<Currency>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Money::eur(100)).unwrap();
        assert_eq!(json, r#"{"amount":100,"currency":"eur"}"#);
    }
}
