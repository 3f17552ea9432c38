//! # Radar Exchange
//!
//! MEXC 선물 커넥터.
//!
//! - [`connector::mexc::MexcClient`]: 계약 목록 / 상장 일정 REST 조회
//! - [`connector::mexc::MexcWebSocket`]: ticker 스트림, 재연결, 동적 구독
//! - [`catalog::InstrumentCatalog`]: 신규 상장 심볼 델타 감지
//! - [`retry`]: 재시도 및 재연결 백오프

pub mod catalog;
pub mod connector;
pub mod retry;

use radar_core::ProviderError;
use thiserror::Error;

pub use catalog::{CatalogDelta, InstrumentCatalog};
pub use connector::mexc::{MexcClient, MexcConfig, MexcWebSocket, SubscribeHandle};
pub use retry::{with_retry, ReconnectBackoff, RetryConfig};

/// 거래소 커넥터 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 네트워크 오류 (연결 실패, 타임아웃 등)
    #[error("네트워크 오류: {0}")]
    NetworkError(String),

    /// 스트림 연결 끊김
    #[error("연결 끊김: {0}")]
    Disconnected(String),

    /// 요청 한도 초과 (HTTP 429)
    #[error("요청 한도 초과")]
    RateLimited {
        /// 서버가 지정한 대기 시간 (밀리초)
        retry_after_ms: Option<u64>,
    },

    /// HTTP 오류 응답
    #[error("API 오류 (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// 응답/메시지 파싱 실패
    #[error("파싱 오류: {0}")]
    ParseError(String),

    /// WebSocket 프로토콜 오류
    #[error("WebSocket 오류: {0}")]
    WebSocket(String),
}

/// 거래소 커넥터 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

impl ExchangeError {
    /// 재시도로 회복 가능한 일시적 오류인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkError(_)
            | Self::Disconnected(_)
            | Self::RateLimited { .. }
            | Self::WebSocket(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::ParseError(_) => false,
        }
    }

    /// 재시도해도 결과가 같은 오류인지 확인합니다 (4xx, 429 제외).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Api { status, .. } if (400..500).contains(status) && *status != 429)
    }

    /// 에러에 지정된 재시도 대기 시간.
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ExchangeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                Self::Disconnected(err.to_string())
            }
            other => Self::WebSocket(other.to_string()),
        }
    }
}

/// ExchangeError → ProviderError 변환.
pub fn to_provider_error(e: ExchangeError) -> ProviderError {
    match e {
        ExchangeError::NetworkError(msg)
        | ExchangeError::Disconnected(msg)
        | ExchangeError::WebSocket(msg) => ProviderError::Network(msg),
        ExchangeError::RateLimited { .. } => ProviderError::Api("Rate limit exceeded".to_string()),
        ExchangeError::ParseError(msg) => ProviderError::Parse(msg),
        other => ProviderError::Api(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ExchangeError::NetworkError("timeout".into()).is_retryable());
        assert!(ExchangeError::RateLimited { retry_after_ms: None }.is_retryable());
        assert!(!ExchangeError::ParseError("bad".into()).is_retryable());
        assert!(ExchangeError::Api { status: 502, message: String::new() }.is_retryable());

        assert!(ExchangeError::Api { status: 404, message: String::new() }.is_fatal());
        assert!(!ExchangeError::Api { status: 429, message: String::new() }.is_fatal());
        assert!(!ExchangeError::NetworkError("x".into()).is_fatal());
    }

    #[test]
    fn test_to_provider_error() {
        assert_eq!(
            to_provider_error(ExchangeError::ParseError("x".into())),
            ProviderError::Parse("x".into())
        );
        assert!(matches!(
            to_provider_error(ExchangeError::Disconnected("closed".into())),
            ProviderError::Network(_)
        ));
        assert!(matches!(
            to_provider_error(ExchangeError::Api { status: 500, message: "boom".into() }),
            ProviderError::Api(_)
        ));
    }
}
