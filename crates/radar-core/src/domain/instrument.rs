//! 선물 심볼 표기 유틸리티.
//!
//! MEXC USDT 무기한 선물은 `BTC_USDT` 형식의 심볼을 사용합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// USDT 정산 선물 심볼 접미사.
pub const SETTLE_SUFFIX: &str = "_USDT";

/// 선물 거래 페이지 기본 URL.
const FUTURES_PAGE_URL: &str = "https://www.mexc.com/futures";

/// 심볼에서 코인 이름만 추출합니다 (`BTC_USDT` → `BTC`).
pub fn coin_name(instrument: &str) -> &str {
    instrument.strip_suffix(SETTLE_SUFFIX).unwrap_or(instrument)
}

/// 사용자 입력을 심볼로 정규화합니다.
///
/// `btc` → `BTC_USDT`, `eth_usdt` → `ETH_USDT`.
/// 공백만 있는 입력은 `None`.
pub fn normalize_instrument(input: &str) -> Option<String> {
    let coin = input.trim().to_uppercase();
    if coin.is_empty() {
        return None;
    }
    if coin.ends_with(SETTLE_SUFFIX) {
        Some(coin)
    } else {
        Some(format!("{}{}", coin, SETTLE_SUFFIX))
    }
}

/// 심볼의 선물 거래 페이지 URL.
pub fn futures_url(instrument: &str) -> String {
    format!("{}/{}", FUTURES_PAGE_URL, instrument)
}

/// 상장 일정 항목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// 코인 티커 (예: `XION`)
    pub coin: String,
    /// 코인 전체 이름
    pub full_name: String,
    /// 거래 시작 시각
    pub first_open_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_name() {
        assert_eq!(coin_name("BTC_USDT"), "BTC");
        assert_eq!(coin_name("1000PEPE_USDT"), "1000PEPE");
        assert_eq!(coin_name("ODD"), "ODD");
    }

    #[test]
    fn test_normalize_instrument() {
        assert_eq!(normalize_instrument("btc"), Some("BTC_USDT".to_string()));
        assert_eq!(normalize_instrument(" xion "), Some("XION_USDT".to_string()));
        assert_eq!(normalize_instrument("eth_usdt"), Some("ETH_USDT".to_string()));
        assert_eq!(normalize_instrument("   "), None);
    }

    #[test]
    fn test_futures_url() {
        assert_eq!(futures_url("BTC_USDT"), "https://www.mexc.com/futures/BTC_USDT");
    }
}
