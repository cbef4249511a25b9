//! Symbols command implementation.
//!
//! Lists the symbols the data service has tables for, optionally narrowed
//! to one market and a search term.

use crate::display::print_symbols;
use crate::settings::Settings;
use anyhow::{Context, Result};
use candlesync_lib::prelude::*;

/// Fetches and prints the symbol list.
pub(crate) async fn list_symbols(
    settings: &Settings,
    market: Option<Market>,
    search: Option<&str>,
    spreads: bool,
) -> Result<()> {
    let client = OhlcvClient::new(settings.client_config())?;
    let symbols = if spreads {
        client.fetch_spreads().await
    } else {
        client.fetch_tables().await
    }
    .with_context(|| format!("Failed to fetch symbol list from {}", settings.base_url))?;

    let symbols = filter_symbols(symbols, market, search);
    if symbols.is_empty() {
        println!("No symbols found.");
        return Ok(());
    }

    print_symbols(&symbols);
    Ok(())
}

/// Keeps symbols in `market` (if given) whose name contains `search`.
pub(crate) fn filter_symbols(
    symbols: Vec<Symbol>,
    market: Option<Market>,
    search: Option<&str>,
) -> Vec<Symbol> {
    let term = search.unwrap_or_default();
    symbols
        .into_iter()
        .filter(|symbol| match market {
            Some(market) => symbol.matches(market, term),
            None => symbol
                .as_str()
                .to_uppercase()
                .contains(&term.trim().to_uppercase()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> Vec<Symbol> {
        ["NSE_TCS", "NSE_INFY", "CRYPTO_BTCUSDT", "BINANCE_BTC_SPREAD", "SNP_AAPL"]
            .into_iter()
            .map(Symbol::new)
            .collect()
    }

    #[test]
    fn test_filter_by_market() {
        let nse = filter_symbols(symbols(), Some(Market::Nse), None);
        assert_eq!(nse, vec![Symbol::new("NSE_TCS"), Symbol::new("NSE_INFY")]);
    }

    #[test]
    fn test_filter_by_search_only() {
        let btc = filter_symbols(symbols(), None, Some("btc"));
        assert_eq!(btc.len(), 2);
    }

    #[test]
    fn test_no_filters_keeps_all() {
        assert_eq!(filter_symbols(symbols(), None, None).len(), 5);
    }
}
