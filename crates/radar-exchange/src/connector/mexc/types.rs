use chrono::{DateTime, Utc};
use radar_core::{ListingEntry, Sample};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{ExchangeError, ExchangeResult};

// ============================================================================
// REST 응답 타입
// ============================================================================

/// `/api/v1/contract/detail` 계약 항목.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractDetail {
    pub symbol: Option<String>,
    #[serde(rename = "settleCoin")]
    pub settle_coin: Option<String>,
    /// 0 = 거래 가능
    pub state: Option<i64>,
}

impl ContractDetail {
    /// USDT 정산이고 거래 가능한 계약이면 심볼 반환.
    pub fn active_usdt_symbol(&self) -> Option<&str> {
        match (&self.symbol, self.settle_coin.as_deref(), self.state) {
            (Some(symbol), Some("USDT"), Some(0)) => Some(symbol.as_str()),
            _ => None,
        }
    }
}

/// 상장 일정 API의 코인 항목 (`data.newCoins[]`).
#[derive(Debug, Clone, Deserialize)]
pub struct NewCoin {
    #[serde(rename = "vcoinName")]
    pub vcoin_name: Option<String>,
    #[serde(rename = "vcoinNameFull")]
    pub vcoin_name_full: Option<String>,
    /// 최초 거래 시각 (밀리초)
    #[serde(rename = "firstOpenTime")]
    pub first_open_time: Option<i64>,
}

impl NewCoin {
    /// 이름과 시각이 모두 있는 항목만 변환합니다.
    pub fn into_entry(self) -> Option<ListingEntry> {
        let coin = self.vcoin_name?;
        let first_open_time = DateTime::from_timestamp_millis(self.first_open_time?)?;
        Some(ListingEntry {
            full_name: self.vcoin_name_full.unwrap_or_else(|| coin.clone()),
            coin,
            first_open_time,
        })
    }
}

/// `{"data": ...}` 래퍼를 벗겨 계약 목록을 추출합니다.
///
/// `data`는 단일 객체 또는 배열일 수 있습니다.
pub(crate) fn parse_contracts(body: Value) -> ExchangeResult<Vec<ContractDetail>> {
    let data = match body {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    };

    match data {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        obj @ Value::Object(_) => Ok(vec![serde_json::from_value(obj)?]),
        other => Err(ExchangeError::ParseError(format!(
            "계약 목록 형식이 아님: {}",
            other
        ))),
    }
}

/// 상장 일정 응답에서 `data.newCoins`를 추출합니다.
pub(crate) fn parse_calendar(body: &Value) -> ExchangeResult<Vec<ListingEntry>> {
    let coins = body
        .get("data")
        .and_then(|d| d.get("newCoins"))
        .and_then(Value::as_array)
        .ok_or_else(|| ExchangeError::ParseError("data.newCoins 없음".to_string()))?;

    Ok(coins
        .iter()
        .filter_map(|c| serde_json::from_value::<NewCoin>(c.clone()).ok())
        .filter_map(NewCoin::into_entry)
        .collect())
}

// ============================================================================
// 스트림 메시지
// ============================================================================

/// ticker 구독 요청 메시지.
pub fn subscribe_message(symbol: &str) -> String {
    json!({
        "method": "sub.ticker",
        "param": { "symbol": symbol }
    })
    .to_string()
}

/// 서버 ping에 대한 pong 메시지.
pub(crate) fn pong_message(data: &Value) -> String {
    json!({ "pong": data }).to_string()
}

/// `push.ticker` 페이로드.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPush {
    pub symbol: String,
    #[serde(rename = "lastPrice")]
    pub last_price: Option<f64>,
    /// 24시간 거래대금 (USDT)
    pub amount24: Option<f64>,
    /// 24시간 거래량 (계약 수)
    pub volume24: Option<f64>,
}

impl TickerPush {
    /// 24시간 USDT 거래대금. `amount24`가 없거나 0이면 `volume24 * lastPrice`로 추정합니다.
    pub fn turnover_usdt(&self) -> Decimal {
        let turnover = match (self.amount24, self.volume24, self.last_price) {
            (Some(amount), _, _) if amount > 0.0 => amount,
            (_, Some(volume), Some(price)) => volume * price,
            _ => 0.0,
        };
        Decimal::try_from(turnover).unwrap_or_default()
    }

    /// 샘플로 변환합니다. 가격이 없거나 표현할 수 없으면 `None`.
    pub fn into_sample(self, observed_at: DateTime<Utc>) -> Option<Sample> {
        let last_price = Decimal::try_from(self.last_price?).ok()?;
        let turnover = self.turnover_usdt();
        Some(Sample::new(self.symbol, last_price, turnover, observed_at))
    }
}

/// 수신 메시지 분류.
#[derive(Debug, Clone)]
pub enum StreamMessage {
    /// 서버 ping (pong으로 응답해야 함)
    Ping(Value),
    /// 시세 푸시
    Ticker(TickerPush),
    /// 구독 응답 등 기타 메시지
    Other,
}

/// 텍스트 프레임을 파싱합니다.
pub fn parse_stream_message(text: &str) -> ExchangeResult<StreamMessage> {
    let value: Value = serde_json::from_str(text)?;

    if let Some(ping) = value.get("ping") {
        return Ok(StreamMessage::Ping(ping.clone()));
    }

    match value.get("channel").and_then(Value::as_str) {
        Some("ping") => return Ok(StreamMessage::Ping(value.get("data").cloned().unwrap_or(Value::Null))),
        Some("push.ticker") => {
            let mut data = value.get("data").cloned().unwrap_or(Value::Null);
            // 일부 푸시는 data 안에 symbol이 없고 최상위에만 있음
            if data.get("symbol").is_none() {
                if let (Some(obj), Some(symbol)) = (data.as_object_mut(), value.get("symbol")) {
                    obj.insert("symbol".to_string(), symbol.clone());
                }
            }
            return serde_json::from_value(data)
                .map(StreamMessage::Ticker)
                .map_err(ExchangeError::from);
        }
        _ => {}
    }

    Ok(StreamMessage::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_ticker_push() {
        let text = r#"{"channel":"push.ticker","data":{"symbol":"BTC_USDT","lastPrice":103.5,"amount24":2500000,"volume24":1000},"ts":1}"#;
        let StreamMessage::Ticker(push) = parse_stream_message(text).unwrap() else {
            panic!("ticker 메시지여야 함");
        };
        let sample = push.into_sample(Utc::now()).unwrap();
        assert_eq!(sample.instrument, "BTC_USDT");
        assert_eq!(sample.last_price, dec!(103.5));
        assert_eq!(sample.turnover_usdt, dec!(2500000));
    }

    #[test]
    fn test_turnover_falls_back_to_volume_times_price() {
        let push = TickerPush {
            symbol: "ETH_USDT".into(),
            last_price: Some(2.0),
            amount24: Some(0.0),
            volume24: Some(60000.0),
        };
        assert_eq!(push.turnover_usdt(), dec!(120000));
    }

    #[test]
    fn test_parse_ping_and_other() {
        assert!(matches!(
            parse_stream_message(r#"{"channel":"ping","data":1700000000}"#).unwrap(),
            StreamMessage::Ping(_)
        ));
        let StreamMessage::Ping(token) = parse_stream_message(r#"{"ping":12345}"#).unwrap() else {
            panic!("ping 메시지여야 함");
        };
        assert_eq!(pong_message(&token), r#"{"pong":12345}"#);
        assert!(matches!(
            parse_stream_message(r#"{"channel":"rs.sub.ticker","data":"success"}"#).unwrap(),
            StreamMessage::Other
        ));
        assert!(parse_stream_message("not json").is_err());
    }

    #[test]
    fn test_subscribe_message_shape() {
        let v: Value = serde_json::from_str(&subscribe_message("SOL_USDT")).unwrap();
        assert_eq!(v["method"], "sub.ticker");
        assert_eq!(v["param"]["symbol"], "SOL_USDT");
    }

    #[test]
    fn test_parse_contracts_filters() {
        let body = json!({
            "success": true,
            "data": [
                {"symbol": "BTC_USDT", "settleCoin": "USDT", "state": 0},
                {"symbol": "ETH_USD", "settleCoin": "ETH", "state": 0},
                {"symbol": "OLD_USDT", "settleCoin": "USDT", "state": 4}
            ]
        });
        let symbols: Vec<String> = parse_contracts(body)
            .unwrap()
            .iter()
            .filter_map(|c| c.active_usdt_symbol().map(str::to_string))
            .collect();
        assert_eq!(symbols, vec!["BTC_USDT".to_string()]);

        let single = json!({"data": {"symbol": "X_USDT", "settleCoin": "USDT", "state": 0}});
        assert_eq!(parse_contracts(single).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_calendar_skips_incomplete() {
        let body = json!({
            "data": {"newCoins": [
                {"vcoinName": "ABC", "vcoinNameFull": "Alpha Beta", "firstOpenTime": 1767225600000i64},
                {"vcoinName": "NOTIME"},
                {"vcoinName": "XYZ", "firstOpenTime": 1767225600000i64}
            ]}
        });
        let entries = parse_calendar(&body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].full_name, "Alpha Beta");
        assert_eq!(entries[1].full_name, "XYZ");
    }
}
