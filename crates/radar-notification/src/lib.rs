//! # Radar Notification
//!
//! 급등락 알림 렌더링, 수신자 팬아웃, 텔레그램 명령 처리.
//!
//! - [`dispatcher::AlertDispatcher`]: 채널 + 구독자별 필터 적용 후 동시 전송
//! - [`format`]: HTML 메시지 렌더링
//! - [`telegram::TelegramTransport`]: teloxide 기반 전송
//! - [`bot_handler`]: 봇 명령, 관리자 가드, 구독 설정 변경

pub mod bot_handler;
pub mod dispatcher;
pub mod format;
pub mod telegram;
pub mod types;

pub use bot_handler::{
    apply_command, ensure_admin, sender_id, BotContext, Command, CommandReply, StatePersister,
};
pub use dispatcher::{AlertDispatcher, DispatchReport};
pub use telegram::{TelegramConfig, TelegramTransport};
pub use types::{AlertTransport, Destination, NotificationError, NotificationResult};
