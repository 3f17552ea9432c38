//! 에러 타입 정의.

use radar_core::ProviderError;
use thiserror::Error;

/// 데몬 에러 타입
#[derive(Debug, Error)]
pub enum DaemonError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 데이터 소스 에러 (심볼 목록, 상장 일정)
    #[error("Data source error: {0}")]
    DataSource(#[from] ProviderError),

    /// 상태 파일 입출력 에러
    #[error("State file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 상태 직렬화 에러
    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<std::env::VarError> for DaemonError {
    fn from(err: std::env::VarError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, DaemonError>;
