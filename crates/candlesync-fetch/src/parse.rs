//! Response body decoding.

use candlesync_types::{RawBar, Symbol};
use serde::Deserialize;

use crate::FetchError;

/// Plain-symbol prefixes accepted from the `/tables` list.
const TABLE_PREFIXES: [&str; 4] = ["CRYPTO", "NSE", "SNP", "ETF"];

/// Parses an `/ohlcv` response body into raw bars.
///
/// The body is a JSON array of records; field values are kept as delivered
/// and validated later by the normalizer.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] if the body is not a JSON array of objects.
pub fn parse_ohlcv_page(body: &[u8]) -> Result<Vec<RawBar>, FetchError> {
    Ok(serde_json::from_slice(body)?)
}

#[derive(Debug, Deserialize)]
struct SymbolList {
    #[serde(default)]
    tables: Vec<String>,
}

/// Parses a `/tables` response into sorted, upper-cased plain symbols.
///
/// Only names of the form `<CRYPTO|NSE|SNP|ETF>_<NAME>` with a single
/// underscore are kept.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] if the body is not a `{"tables": [..]}` object.
pub fn parse_tables(body: &[u8]) -> Result<Vec<Symbol>, FetchError> {
    let list: SymbolList = serde_json::from_slice(body)?;
    let mut symbols: Vec<String> = list
        .tables
        .into_iter()
        .map(|name| name.to_uppercase())
        .filter(|name| is_plain_table(name))
        .collect();
    symbols.sort();
    Ok(symbols.into_iter().map(Symbol::from).collect())
}

/// Parses a `/spreads` response into sorted, upper-cased spread symbols.
///
/// Tuple punctuation (`(`, `)`, `,`) left over from pair names is stripped.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] if the body is not a `{"tables": [..]}` object.
pub fn parse_spreads(body: &[u8]) -> Result<Vec<Symbol>, FetchError> {
    let list: SymbolList = serde_json::from_slice(body)?;
    let mut symbols: Vec<String> = list
        .tables
        .into_iter()
        .map(|name| {
            name.chars()
                .filter(|c| !matches!(c, '(' | ')' | ','))
                .collect::<String>()
                .to_uppercase()
        })
        .collect();
    symbols.sort();
    Ok(symbols.into_iter().map(Symbol::from).collect())
}

fn is_plain_table(name: &str) -> bool {
    name.split_once('_').is_some_and(|(prefix, rest)| {
        TABLE_PREFIXES.contains(&prefix) && !rest.is_empty() && !rest.contains('_')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ohlcv_page_mixed_types() {
        let body = br#"[
            {"timestamp": 1700000000, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 10},
            {"timestamp": "1700000060", "open": "1.5", "high": "2.5", "low": "1.0", "close": "2.0"}
        ]"#;
        let raws = parse_ohlcv_page(body).unwrap();
        assert_eq!(raws.len(), 2);

        let second = raws[1].normalize().unwrap();
        assert_eq!(second.time, 1_700_000_060);
        assert!((second.close - 2.0).abs() < 1e-10);
        assert!(second.volume.abs() < 1e-10);
    }

    #[test]
    fn test_parse_ohlcv_page_empty() {
        assert!(parse_ohlcv_page(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_ohlcv_page_rejects_object() {
        let result = parse_ohlcv_page(br#"{"error": "Symbol is required"}"#);
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_parse_tables_filters_and_sorts() {
        let body = br#"{"tables": ["nse_tcs", "CRYPTO_BTCUSDT", "NSE_SPREADS_A_B", "FOO_BAR", "ETF_"]}"#;
        let symbols = parse_tables(body).unwrap();
        let names: Vec<_> = symbols.iter().map(Symbol::as_str).collect();
        assert_eq!(names, vec!["CRYPTO_BTCUSDT", "NSE_TCS"]);
    }

    #[test]
    fn test_parse_spreads_strips_tuple_punctuation() {
        let body = br#"{"tables": ["NSE_SPREADS_(TCS, INFY)", "binance_avaxusdt_bnbusdt"]}"#;
        let symbols = parse_spreads(body).unwrap();
        let names: Vec<_> = symbols.iter().map(Symbol::as_str).collect();
        assert_eq!(names, vec!["BINANCE_AVAXUSDT_BNBUSDT", "NSE_SPREADS_TCS INFY"]);
    }

    #[test]
    fn test_missing_tables_key_is_empty() {
        assert!(parse_tables(b"{}").unwrap().is_empty());
    }
}
