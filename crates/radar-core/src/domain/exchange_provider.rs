//! 거래소 중립적인 데이터 제공자 trait.
//!
//! 거래소 커넥터(`radar-exchange`)가 구현하고, 카탈로그와 스트림 관리자가
//! trait 객체로 사용합니다. 테스트에서는 가짜 구현으로 대체합니다.

use async_trait::async_trait;
use thiserror::Error;

use super::instrument::ListingEntry;

// =============================================================================
// 에러 타입
// =============================================================================

/// 제공자 공통 에러.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// API 에러
    #[error("API 에러: {0}")]
    Api(String),

    /// 파싱 에러
    #[error("파싱 에러: {0}")]
    Parse(String),

    /// 기타 에러
    #[error("기타 에러: {0}")]
    Other(String),
}

// =============================================================================
// Provider Traits
// =============================================================================

/// 거래 가능한 선물 심볼 목록 제공자.
#[async_trait]
pub trait InstrumentSource: Send + Sync {
    /// 현재 활성 상태인 USDT 정산 선물 심볼 목록을 조회합니다.
    async fn list_active(&self) -> Result<Vec<String>, ProviderError>;
}

/// 신규 상장 일정 제공자.
#[async_trait]
pub trait ListingCalendarSource: Send + Sync {
    /// 상장 예정 및 최근 상장 코인 목록을 조회합니다.
    async fn listing_calendar(&self) -> Result<Vec<ListingEntry>, ProviderError>;
}
