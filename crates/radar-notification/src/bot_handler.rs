//! 텔레그램 봇 명령 처리.
//!
//! 구독 설정을 바꾸는 명령은 [`ensure_admin`]을 먼저 통과해야 합니다.
//! 실제 상태 변경은 순수 함수 [`apply_command`]가 담당합니다.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use radar_core::{
    coin_name, normalize_instrument, AlertMode, ListingCalendarSource, RadarState, SharedState,
    SubscriberId,
};
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use crate::format::{escape_html, format_calendar, CalendarWindow};

const COMMAND_REGISTER_ATTEMPTS: u32 = 3;
const COMMAND_REGISTER_DELAY: Duration = Duration::from_secs(3);

const ADMIN_ONLY_REPLY: &str = "⛔ 관리자 전용 명령입니다.\n\n채널에서 알림은 계속 확인할 수 있습니다.";
const CALENDAR_FAILED_REPLY: &str = "❌ MEXC에서 상장 일정을 가져오지 못했습니다\n\
    직접 확인: https://www.mexc.com/announcements/new-listings";

/// 봇 명령.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "사용 가능한 명령:")]
pub enum Command {
    #[command(description = "시작 및 도움말")]
    Start,
    #[command(description = "개인 알림 켜기")]
    Subscribe,
    #[command(description = "개인 알림 끄기")]
    Unsubscribe,
    #[command(description = "전체 알림 (3–5% + ≥10%)")]
    Mode1,
    #[command(description = "3–5%만 알림")]
    Mode2,
    #[command(description = "≥10%만 알림")]
    Mode3,
    #[command(description = "코인 음소거 (예: /mute BTC)")]
    Mute(String),
    #[command(description = "코인 음소거 해제")]
    Unmute(String),
    #[command(description = "음소거 목록")]
    Mutelist,
    #[command(description = "7일 내 상장 예정 코인")]
    Timelist,
    #[command(description = "지난 7일간 상장 코인")]
    Coinlist,
}

impl Command {
    /// 관리자 권한이 필요한 명령인지 확인합니다.
    pub fn requires_admin(&self) -> bool {
        !matches!(self, Command::Start | Command::Timelist | Command::Coinlist)
    }
}

/// 관리자 가드. 관리자 목록이 비어 있으면 모두 허용합니다.
///
/// `caller`는 채팅이 아니라 보낸 사용자 ID입니다. 보낸 사람을 알 수 없으면 거부합니다.
pub fn ensure_admin(admins: &BTreeSet<i64>, caller: Option<i64>) -> bool {
    if admins.is_empty() {
        return true;
    }
    caller.is_some_and(|id| admins.contains(&id))
}

/// 메시지를 보낸 사용자 ID (채널 게시물 등은 `None`).
pub fn sender_id(msg: &Message) -> Option<i64> {
    msg.from.as_ref().map(|user| user.id.0 as i64)
}

/// 명령 처리 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    /// HTML 응답 텍스트
    pub text: String,
    /// 상태 저장 필요 여부
    pub persist: bool,
}

impl CommandReply {
    fn changed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            persist: true,
        }
    }

    fn unchanged(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            persist: false,
        }
    }
}

fn start_text(mode: AlertMode) -> String {
    format!(
        "🤖 <b>MEXC 선물 급등락 알림 봇</b>\n\n\
         ✅ MEXC 선물 <b>실시간</b> 시세 감시\n\
         ✅ 3% 이상 변동 즉시 알림\n\
         ✅ 동적 기준가로 급등락 놓치지 않음\n\n\
         📊 현재 모드: <b>{}</b>\n\n\
         명령:\n\
         /subscribe – 알림 켜기\n\
         /unsubscribe – 알림 끄기\n\
         /mode1 – 전체 알림 (3–5% + ≥10%)\n\
         /mode2 – 3–5%만 알림\n\
         /mode3 – ≥10%만 알림\n\
         /mute COIN – 코인 음소거 (예: /mute BTC)\n\
         /unmute COIN – 음소거 해제\n\
         /mutelist – 음소거 목록\n\
         /timelist – 상장 예정 코인\n\
         /coinlist – 최근 1주 상장 코인",
        mode.label()
    )
}

/// 명령을 상태에 적용합니다.
///
/// 상장 일정 명령(`/timelist`, `/coinlist`)은 상태와 무관하므로 `None`.
pub fn apply_command(
    state: &mut RadarState,
    chat_id: SubscriberId,
    command: &Command,
) -> Option<CommandReply> {
    let registry = &mut state.subscribers;

    let reply = match command {
        Command::Start => {
            registry.register(chat_id);
            CommandReply::changed(start_text(registry.mode(chat_id)))
        }
        Command::Subscribe => {
            registry.subscribe(chat_id);
            CommandReply::changed("✅ 알림을 켰습니다!")
        }
        Command::Unsubscribe => {
            registry.unsubscribe(chat_id);
            CommandReply::changed("✅ 알림을 껐습니다!")
        }
        Command::Mode1 => {
            registry.set_mode(chat_id, AlertMode::All);
            CommandReply::changed("✅ 모드 1: <b>전체</b> 변동 알림 (3–5% + ≥10%)")
        }
        Command::Mode2 => {
            registry.set_mode(chat_id, AlertMode::ModerateOnly);
            CommandReply::changed("✅ 모드 2: <b>3–5%만</b> 알림, ≥10% 제외")
        }
        Command::Mode3 => {
            registry.set_mode(chat_id, AlertMode::ExtremeOnly);
            CommandReply::changed("✅ 모드 3: <b>≥10%만</b> 알림, 3–5% 제외")
        }
        Command::Mute(arg) => match arg.split_whitespace().next().and_then(normalize_instrument) {
            Some(symbol) => {
                registry.mute(chat_id, &symbol);
                CommandReply::changed(format!(
                    "🔇 <code>{}</code> 알림을 음소거했습니다",
                    escape_html(coin_name(&symbol))
                ))
            }
            None => CommandReply::unchanged("❌ 코인 이름을 입력하세요\n예: /mute BTC 또는 /mute xion"),
        },
        Command::Unmute(arg) => match arg.split_whitespace().next().and_then(normalize_instrument) {
            Some(symbol) => {
                let coin = escape_html(coin_name(&symbol));
                if registry.unmute(chat_id, &symbol) {
                    CommandReply::changed(format!("🔔 <code>{}</code> 알림을 다시 켰습니다", coin))
                } else {
                    CommandReply::unchanged(format!("ℹ️ <code>{}</code>은(는) 음소거 상태가 아닙니다", coin))
                }
            }
            None => CommandReply::unchanged("❌ 코인 이름을 입력하세요\n예: /unmute BTC"),
        },
        Command::Mutelist => {
            let muted = registry.muted(chat_id);
            if muted.is_empty() {
                CommandReply::unchanged("ℹ️ 음소거한 코인이 없습니다")
            } else {
                let lines: Vec<String> = muted
                    .iter()
                    .map(|s| format!("• <code>{}</code>", escape_html(coin_name(s))))
                    .collect();
                CommandReply::unchanged(format!(
                    "🔇 <b>음소거 목록</b>\n\n{}\n\n<i>총 {}개</i>",
                    lines.join("\n"),
                    muted.len()
                ))
            }
        }
        Command::Timelist | Command::Coinlist => return None,
    };

    Some(reply)
}

/// 상태 저장소.
#[async_trait]
pub trait StatePersister: Send + Sync {
    /// 상태 스냅샷을 저장합니다. 실패는 구현체가 기록하고 삼킵니다.
    async fn persist(&self, state: &RadarState);
}

/// 명령 핸들러 공유 컨텍스트.
pub struct BotContext {
    pub state: SharedState,
    pub admins: BTreeSet<i64>,
    pub calendar: Arc<dyn ListingCalendarSource>,
    pub persister: Arc<dyn StatePersister>,
}

async fn calendar_reply(ctx: &BotContext, window: CalendarWindow) -> String {
    match ctx.calendar.listing_calendar().await {
        Ok(entries) if !entries.is_empty() => format_calendar(&entries, Utc::now(), window),
        Ok(_) => {
            warn!("상장 일정 데이터 없음");
            CALENDAR_FAILED_REPLY.to_string()
        }
        Err(e) => {
            error!(error = %e, "상장 일정 조회 실패");
            CALENDAR_FAILED_REPLY.to_string()
        }
    }
}

/// 명령 엔드포인트.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    command: Command,
    ctx: Arc<BotContext>,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;

    if command.requires_admin() && !ensure_admin(&ctx.admins, sender_id(&msg)) {
        warn!(chat_id = chat_id.0, sender = ?sender_id(&msg), command = ?command, "관리자 전용 명령 거부");
        bot.send_message(chat_id, ADMIN_ONLY_REPLY).await?;
        return Ok(());
    }

    let text = match command {
        Command::Timelist | Command::Coinlist => {
            bot.send_message(chat_id, "⏳ 상장 일정 조회 중…").await?;
            let window = if command == Command::Timelist {
                CalendarWindow::Upcoming
            } else {
                CalendarWindow::Recent
            };
            calendar_reply(&ctx, window).await
        }
        other => {
            let (reply, snapshot) = {
                let mut state = ctx.state.write().await;
                let reply = apply_command(&mut state, chat_id.0, &other);
                let snapshot = reply
                    .as_ref()
                    .filter(|r| r.persist)
                    .map(|_| state.clone());
                (reply, snapshot)
            };

            if let Some(snapshot) = snapshot {
                ctx.persister.persist(&snapshot).await;
            }
            info!(chat_id = chat_id.0, command = ?other, "봇 명령 처리");

            match reply {
                Some(reply) => reply.text,
                None => return Ok(()),
            }
        }
    };

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// 명령 메뉴 등록 (최대 3회, 3초 간격). 성공 여부를 반환합니다.
pub async fn register_commands(bot: &Bot) -> bool {
    for attempt in 1..=COMMAND_REGISTER_ATTEMPTS {
        match bot.set_my_commands(Command::bot_commands()).await {
            Ok(_) => {
                info!(attempt, "봇 명령 메뉴 등록 완료");
                return true;
            }
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts = COMMAND_REGISTER_ATTEMPTS,
                    error = %e,
                    "봇 명령 메뉴 등록 실패"
                );
                if attempt < COMMAND_REGISTER_ATTEMPTS {
                    tokio::time::sleep(COMMAND_REGISTER_DELAY).await;
                }
            }
        }
    }

    warn!("봇 명령 메뉴 등록 생략");
    false
}

/// 명령 디스패처 실행 (Ctrl-C 시 종료).
pub async fn run_dispatcher(bot: Bot, ctx: Arc<BotContext>) {
    let handler = Update::filter_message()
        .filter_command::<Command>()
        .endpoint(handle_command);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
