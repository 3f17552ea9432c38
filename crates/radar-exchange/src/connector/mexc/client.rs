use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use radar_core::{InstrumentSource, ListingCalendarSource, ListingEntry, ProviderError};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info};

use super::types::{parse_calendar, parse_contracts, ContractDetail};
use crate::retry::{with_retry, RetryConfig};
use crate::{to_provider_error, ExchangeError, ExchangeResult};

// ============================================================================
// 설정
// ============================================================================

/// MEXC 선물 엔드포인트 설정.
#[derive(Debug, Clone)]
pub struct MexcConfig {
    /// 선물 REST 기본 URL
    pub rest_base_url: String,
    /// 선물 WebSocket URL
    pub ws_url: String,
    /// 상장 일정 API URL (쿼리 제외)
    pub calendar_url: String,
    /// HTTP 요청 타임아웃
    pub request_timeout: Duration,
}

impl Default for MexcConfig {
    fn default() -> Self {
        Self {
            rest_base_url: "https://contract.mexc.com".to_string(),
            ws_url: "wss://contract.mexc.com/edge".to_string(),
            calendar_url: "https://www.mexc.com/api/operation/new_coin_calendar".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

// ============================================================================
// 클라이언트
// ============================================================================

/// MEXC 선물 REST 클라이언트.
///
/// 일시적 오류(네트워크, 429, 5xx)는 [`RetryConfig::polling`] 정책으로 재시도합니다.
pub struct MexcClient {
    config: MexcConfig,
    client: Client,
    retry: RetryConfig,
}

impl MexcClient {
    /// 새 클라이언트 생성.
    pub fn new(config: MexcConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        Ok(Self {
            config,
            client,
            retry: RetryConfig::polling(),
        })
    }

    /// 재시도 정책 교체.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// 전체 선물 계약 목록 조회.
    pub async fn get_contracts(&self) -> ExchangeResult<Vec<ContractDetail>> {
        let url = format!("{}/api/v1/contract/detail", self.config.rest_base_url);
        let url = url.as_str();
        let body = with_retry(&self.retry, move || self.get_json(url, None)).await?;
        parse_contracts(body)
    }

    /// 거래 가능한 USDT 정산 심볼 목록 조회 (정렬, 중복 제거).
    pub async fn get_active_symbols(&self) -> ExchangeResult<Vec<String>> {
        let contracts = self.get_contracts().await?;
        let total = contracts.len();

        let mut symbols: Vec<String> = contracts
            .iter()
            .filter_map(|c| c.active_usdt_symbol().map(str::to_string))
            .collect();
        symbols.sort();
        symbols.dedup();

        debug!(total, active = symbols.len(), "MEXC 선물 계약 목록 조회");
        Ok(symbols)
    }

    /// 상장 일정 조회.
    pub async fn get_listing_calendar(&self) -> ExchangeResult<Vec<ListingEntry>> {
        let url = self.config.calendar_url.as_str();
        let body = with_retry(&self.retry, move || {
            let timestamp = Utc::now().timestamp_millis();
            self.get_json(url, Some(timestamp))
        })
        .await?;

        let entries = parse_calendar(&body)?;
        info!(count = entries.len(), "상장 일정 조회 완료");
        Ok(entries)
    }

    async fn get_json(&self, url: &str, timestamp: Option<i64>) -> ExchangeResult<Value> {
        let mut request = self.client.get(url);
        if let Some(ts) = timestamp {
            request = request.query(&[("timestamp", ts)]);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000));
            return Err(ExchangeError::RateLimited { retry_after_ms });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl InstrumentSource for MexcClient {
    async fn list_active(&self) -> Result<Vec<String>, ProviderError> {
        self.get_active_symbols().await.map_err(to_provider_error)
    }
}

#[async_trait]
impl ListingCalendarSource for MexcClient {
    async fn listing_calendar(&self) -> Result<Vec<ListingEntry>, ProviderError> {
        self.get_listing_calendar().await.map_err(to_provider_error)
    }
}
