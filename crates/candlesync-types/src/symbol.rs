//! Exchange-prefixed symbol definitions.

use serde::{Deserialize, Serialize};

/// Market group used when filtering symbol lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    /// Indian equities and their spreads.
    Nse,
    /// S&P constituents and their spreads.
    Snp,
    /// Exchange-traded funds and their spreads.
    Etf,
    /// Crypto pairs and exchange spreads.
    Crypto,
}

impl Market {
    /// Returns the market as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Nse => "nse",
            Self::Snp => "snp",
            Self::Etf => "etf",
            Self::Crypto => "crypto",
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nse" => Ok(Self::Nse),
            "snp" => Ok(Self::Snp),
            "etf" => Ok(Self::Etf),
            "crypto" => Ok(Self::Crypto),
            _ => Err(format!(
                "unknown market '{s}', expected one of: nse, snp, etf, crypto"
            )),
        }
    }
}

/// Source exchange, derived from a symbol's prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exchange {
    /// `NSE_SPREADS_` spread.
    NseSpreads,
    /// `SNP_SPREADS_` spread.
    SnpSpreads,
    /// `ETF_SPREADS_` spread.
    EtfSpreads,
    /// `BINANCE_` spread.
    Binance,
    /// `FYERS_` spread.
    Fyers,
    /// `SPREADS_` spread.
    Spreads,
    /// `NSE_` stock.
    Nse,
    /// `SNP_` stock.
    Snp,
    /// `ETF_` fund.
    Etf,
    /// `CRYPTO_` pair.
    Crypto,
    /// No recognised prefix.
    Other,
}

impl Exchange {
    /// Prefixed exchanges, longest prefix first so that lookups are unambiguous.
    const PREFIXED: [Self; 10] = [
        Self::NseSpreads,
        Self::SnpSpreads,
        Self::EtfSpreads,
        Self::Binance,
        Self::Spreads,
        Self::Crypto,
        Self::Fyers,
        Self::Nse,
        Self::Snp,
        Self::Etf,
    ];

    /// Returns the symbol prefix for this exchange.
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::NseSpreads => "NSE_SPREADS_",
            Self::SnpSpreads => "SNP_SPREADS_",
            Self::EtfSpreads => "ETF_SPREADS_",
            Self::Binance => "BINANCE_",
            Self::Fyers => "FYERS_",
            Self::Spreads => "SPREADS_",
            Self::Nse => "NSE_",
            Self::Snp => "SNP_",
            Self::Etf => "ETF_",
            Self::Crypto => "CRYPTO_",
            Self::Other => "",
        }
    }

    /// Returns true if symbols of this exchange are spreads.
    #[must_use]
    pub const fn is_spread(&self) -> bool {
        matches!(
            self,
            Self::NseSpreads
                | Self::SnpSpreads
                | Self::EtfSpreads
                | Self::Binance
                | Self::Fyers
                | Self::Spreads
        )
    }

    /// Returns the market group, if any.
    #[must_use]
    pub const fn market(&self) -> Option<Market> {
        match self {
            Self::Nse | Self::NseSpreads => Some(Market::Nse),
            Self::Snp | Self::SnpSpreads => Some(Market::Snp),
            Self::Etf | Self::EtfSpreads => Some(Market::Etf),
            Self::Crypto | Self::Binance | Self::Fyers | Self::Spreads => Some(Market::Crypto),
            Self::Other => None,
        }
    }
}

/// An exchange-prefixed instrument symbol such as `NSE_TCS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a symbol from its full name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the full symbol name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the exchange derived from the prefix (case-insensitive).
    #[must_use]
    pub fn exchange(&self) -> Exchange {
        let upper = self.0.to_uppercase();
        Exchange::PREFIXED
            .into_iter()
            .find(|exchange| upper.starts_with(exchange.prefix()))
            .unwrap_or(Exchange::Other)
    }

    /// Returns true if this symbol names a spread.
    #[must_use]
    pub fn is_spread(&self) -> bool {
        self.exchange().is_spread()
    }

    /// Returns the symbol without its exchange prefix.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let prefix_len = self.exchange().prefix().len();
        self.0.get(prefix_len..).unwrap_or(&self.0)
    }

    /// Returns true if the symbol belongs to `market` and contains `term`
    /// (case-insensitive).
    #[must_use]
    pub fn matches(&self, market: Market, term: &str) -> bool {
        self.exchange().market() == Some(market)
            && self.0.to_uppercase().contains(&term.trim().to_uppercase())
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_from_prefix() {
        assert_eq!(Symbol::new("NSE_TCS").exchange(), Exchange::Nse);
        assert_eq!(Symbol::new("NSE_SPREADS_TCS_INFY").exchange(), Exchange::NseSpreads);
        assert_eq!(Symbol::new("binance_avaxusdt_bnbusdt").exchange(), Exchange::Binance);
        assert_eq!(Symbol::new("CRYPTO_BTCUSDT").exchange(), Exchange::Crypto);
        assert_eq!(Symbol::new("AAPL").exchange(), Exchange::Other);
    }

    #[test]
    fn test_display_name_strips_prefix() {
        assert_eq!(Symbol::new("NSE_TCS").display_name(), "TCS");
        assert_eq!(Symbol::new("SNP_SPREADS_AAPL_MSFT").display_name(), "AAPL_MSFT");
        assert_eq!(Symbol::new("AAPL").display_name(), "AAPL");
    }

    #[test]
    fn test_market_filter() {
        let tcs = Symbol::new("NSE_TCS");
        assert!(tcs.matches(Market::Nse, "tc"));
        assert!(!tcs.matches(Market::Crypto, ""));
        assert!(Symbol::new("FYERS_NIFTY_BANKNIFTY").matches(Market::Crypto, ""));
        assert!(Symbol::new("BINANCE_A_B").is_spread());
        assert!(!tcs.is_spread());
    }
}
