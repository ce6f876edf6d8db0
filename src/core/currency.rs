//! Currency types and the exchange-rate provider abstraction

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Jpy,
    Usd,
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Currency::Jpy => "JPY",
                Currency::Usd => "USD",
            }
        )
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "JPY" => Ok(Currency::Jpy),
            "USD" => Ok(Currency::Usd),
            _ => Err(anyhow::anyhow!("Unsupported currency: {}", s)),
        }
    }
}

/// A quoted pair: one unit of `base` costs `rate` units of `quote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

impl CurrencyPair {
    pub const USD_JPY: CurrencyPair = CurrencyPair {
        base: Currency::Usd,
        quote: Currency::Jpy,
    };
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.base, self.quote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub rate: f64,
    pub pair: CurrencyPair,
    pub fetched_at: DateTime<Utc>,
}

impl ExchangeRate {
    /// Converts `amount` between the two currencies of this pair.
    ///
    /// Returns `None` when either currency is outside the pair or the rate is
    /// not usable.
    pub fn convert(&self, amount: f64, from: Currency, to: Currency) -> Option<f64> {
        if from == to {
            return Some(amount);
        }
        if self.rate <= 0.0 {
            return None;
        }
        if from == self.pair.base && to == self.pair.quote {
            Some(amount * self.rate)
        } else if from == self.pair.quote && to == self.pair.base {
            Some(amount / self.rate)
        } else {
            None
        }
    }
}

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd_jpy(rate: f64) -> ExchangeRate {
        ExchangeRate {
            rate,
            pair: CurrencyPair::USD_JPY,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_convert_both_directions() {
        let rate = usd_jpy(150.0);
        assert_eq!(rate.convert(10.0, Currency::Usd, Currency::Jpy), Some(1500.0));
        assert_eq!(rate.convert(3000.0, Currency::Jpy, Currency::Usd), Some(20.0));
        assert_eq!(rate.convert(42.0, Currency::Jpy, Currency::Jpy), Some(42.0));
    }

    #[test]
    fn test_convert_rejects_zero_rate() {
        let rate = usd_jpy(0.0);
        assert_eq!(rate.convert(10.0, Currency::Usd, Currency::Jpy), None);
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!("jpy".parse::<Currency>().unwrap(), Currency::Jpy);
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Usd);
        assert!("EUR".parse::<Currency>().is_err());
        assert_eq!(CurrencyPair::USD_JPY.to_string(), "USDJPY");
    }
}
