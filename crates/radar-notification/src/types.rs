//! 알림 공통 타입.

use async_trait::async_trait;
use thiserror::Error;

/// 알림 전송 에러.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// 네트워크 오류
    #[error("네트워크 오류: {0}")]
    NetworkError(String),

    /// 요청 한도 초과 (재시도까지 대기할 초)
    #[error("요청 한도 초과: {0}초 후 재시도")]
    RateLimited(u64),

    /// 전송 실패 (API 거부 등)
    #[error("전송 실패: {0}")]
    SendFailed(String),

    /// 잘못된 설정
    #[error("설정 오류: {0}")]
    InvalidConfig(String),
}

/// 알림 Result 타입.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// 알림 수신 대상.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// 개인/그룹 채팅 (숫자 ID)
    Chat(i64),
    /// 공개 채널 (`@username`)
    Channel(String),
}

impl Destination {
    /// 설정 문자열을 파싱합니다.
    ///
    /// 숫자면 채팅 ID, 아니면 `@username` 채널로 취급합니다. 빈 문자열은 `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(id) = raw.parse::<i64>() {
            return Some(Destination::Chat(id));
        }
        if raw.starts_with('@') {
            Some(Destination::Channel(raw.to_string()))
        } else {
            Some(Destination::Channel(format!("@{}", raw)))
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Chat(id) => write!(f, "{}", id),
            Destination::Channel(name) => write!(f, "{}", name),
        }
    }
}

/// 메시지 전송 수단.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    /// HTML 형식 텍스트를 대상에게 전송합니다.
    async fn deliver(&self, destination: &Destination, text: &str) -> NotificationResult<()>;

    /// 전송 수단 이름.
    fn name(&self) -> &str;
}
