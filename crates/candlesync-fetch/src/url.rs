//! Data service URL construction.

use reqwest::Url;

use crate::{FetchError, PageRequest};

/// Default data service base URL.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Builds the `/ohlcv` URL for a page request.
///
/// URL format: `{base}/ohlcv?symbol={SYMBOL}&interval={1m|5m|..}&limit={n}&offset={n}`
///
/// # Errors
///
/// Returns [`FetchError::Url`] if `base` is not a valid URL.
///
/// # Example
///
/// ```
/// use candlesync_fetch::{PageRequest, url::ohlcv_url};
/// use candlesync_types::{Symbol, Timeframe};
///
/// let request = PageRequest::new(Symbol::new("NSE_TCS"), Timeframe::Minute5, 1000, 2000);
/// let url = ohlcv_url("http://localhost:5000/", &request).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "http://localhost:5000/ohlcv?symbol=NSE_TCS&interval=5m&limit=1000&offset=2000"
/// );
/// ```
pub fn ohlcv_url(base: &str, request: &PageRequest) -> Result<Url, FetchError> {
    let limit = request.limit.to_string();
    let offset = request.offset.to_string();
    Url::parse_with_params(
        &endpoint(base, "ohlcv"),
        [
            ("symbol", request.symbol.as_str()),
            ("interval", request.timeframe.interval()),
            ("limit", limit.as_str()),
            ("offset", offset.as_str()),
        ],
    )
    .map_err(|e| FetchError::Url(e.to_string()))
}

/// Builds the `/tables` URL listing plain instrument symbols.
///
/// # Errors
///
/// Returns [`FetchError::Url`] if `base` is not a valid URL.
pub fn tables_url(base: &str) -> Result<Url, FetchError> {
    Url::parse(&endpoint(base, "tables")).map_err(|e| FetchError::Url(e.to_string()))
}

/// Builds the `/spreads` URL listing spread symbols.
///
/// # Errors
///
/// Returns [`FetchError::Url`] if `base` is not a valid URL.
pub fn spreads_url(base: &str) -> Result<Url, FetchError> {
    Url::parse(&endpoint(base, "spreads")).map_err(|e| FetchError::Url(e.to_string()))
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{path}", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlesync_types::{Symbol, Timeframe};

    #[test]
    fn test_ohlcv_url_latest_page() {
        let request = PageRequest::latest(Symbol::new("NSE_TCS"), Timeframe::Minute1, 1000);
        let url = ohlcv_url(DEFAULT_BASE_URL, &request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:5000/ohlcv?symbol=NSE_TCS&interval=1m&limit=1000&offset=0"
        );
    }

    #[test]
    fn test_ohlcv_url_daily_interval() {
        let request = PageRequest::new(Symbol::new("CRYPTO_BTCUSDT"), Timeframe::Day1, 100, 0);
        let url = ohlcv_url("https://data.example.com", &request).unwrap();
        assert!(url.as_str().contains("interval=1d"));
        assert!(url.as_str().contains("limit=100"));
    }

    #[test]
    fn test_symbol_list_urls() {
        assert_eq!(
            tables_url("http://h:1/").unwrap().as_str(),
            "http://h:1/tables"
        );
        assert_eq!(
            spreads_url("http://h:1").unwrap().as_str(),
            "http://h:1/spreads"
        );
    }

    #[test]
    fn test_invalid_base() {
        let result = tables_url("not a url");
        assert!(matches!(result, Err(FetchError::Url(_))));
    }
}
