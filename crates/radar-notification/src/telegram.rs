//! 텔레그램 알림 서비스.
//!
//! teloxide `Bot`으로 HTML 메시지를 전송합니다.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient};
use teloxide::RequestError;
use tracing::{debug, warn};

use crate::types::{AlertTransport, Destination, NotificationError, NotificationResult};

/// 텔레그램 전송 설정.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// 봇 토큰
    pub token: SecretString,
    /// 전송 활성화 여부
    pub enabled: bool,
}

impl TelegramConfig {
    /// 새 텔레그램 설정을 생성합니다.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            enabled: true,
        }
    }
}

impl From<&Destination> for Recipient {
    fn from(destination: &Destination) -> Self {
        match destination {
            Destination::Chat(id) => Recipient::Id(ChatId(*id)),
            Destination::Channel(name) => Recipient::ChannelUsername(name.clone()),
        }
    }
}

/// teloxide 요청 에러 → 알림 에러.
fn to_notification_error(err: RequestError) -> NotificationError {
    match err {
        RequestError::RetryAfter(secs) => NotificationError::RateLimited(u64::from(secs.seconds())),
        RequestError::Network(e) => NotificationError::NetworkError(e.to_string()),
        other => NotificationError::SendFailed(other.to_string()),
    }
}

/// 텔레그램 알림 전송기.
pub struct TelegramTransport {
    bot: Bot,
    enabled: bool,
}

impl TelegramTransport {
    /// 새 전송기를 생성합니다.
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            bot: Bot::new(config.token.expose_secret()),
            enabled: config.enabled,
        }
    }

    /// 명령 디스패처와 공유할 봇 핸들.
    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }
}

#[async_trait]
impl AlertTransport for TelegramTransport {
    async fn deliver(&self, destination: &Destination, text: &str) -> NotificationResult<()> {
        if !self.enabled {
            debug!(%destination, "텔레그램 알림이 비활성화되어 있습니다");
            return Ok(());
        }

        self.bot
            .send_message(Recipient::from(destination), text)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(|e| {
                let err = to_notification_error(e);
                if let NotificationError::RateLimited(secs) = &err {
                    warn!(%destination, retry_after_secs = secs, "Telegram rate limited");
                }
                err
            })
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
