//! 텔레그램 HTML 메시지 렌더링.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use chrono_tz::Tz;
use radar_core::{coin_name, futures_url, AlertEvent, Direction, ListingEntry, Severity};
use rust_decimal::Decimal;

/// 가격 표시 유효 자릿수.
const PRICE_SIGNIFICANT_DIGITS: i32 = 6;

/// 상장 일정 표시 시간대.
pub const CALENDAR_TZ: Tz = chrono_tz::Asia::Ho_Chi_Minh;

/// HTML 특수문자 이스케이프.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// 가격을 유효 숫자 6자리로 표시합니다 (`103.5`, `0.0012345`).
pub fn format_price(price: Decimal) -> String {
    if price.is_zero() {
        return "0".to_string();
    }

    let abs = price.abs();
    let exponent = if abs >= Decimal::ONE {
        abs.trunc().to_string().len() as i32 - 1
    } else {
        let mut e = 0;
        let mut v = abs;
        while v < Decimal::ONE {
            v *= Decimal::TEN;
            e -= 1;
        }
        e
    };

    let dp = (PRICE_SIGNIFICANT_DIGITS - 1 - exponent).max(0) as u32;
    price.round_dp(dp).normalize().to_string()
}

/// 부호 포함 소수 둘째 자리 퍼센트 (`+3.50%`).
pub fn format_change_pct(change_pct: Decimal) -> String {
    let rounded = change_pct.round_dp(2);
    let sign = if rounded >= Decimal::ZERO { "+" } else { "" };
    format!("{}{:.2}%", sign, rounded)
}

/// 급등락 알림 메시지.
///
/// ```text
/// ⚠️초강력 변동⚠️            (EXTREME만)
/// ┌🚀🚀 BTC ⚡ +3.50% 🟢
/// └ 100 → 103.5
/// ```
pub fn format_alert(event: &AlertEvent) -> String {
    let pump = event.direction() == Direction::Pump;
    let color = if pump { "🟢" } else { "🔴" };
    let pct = format_change_pct(event.change_pct);

    let (highlight, icon, size_tag) = match event.severity {
        Severity::Extreme => (
            "⚠️<b>초강력 변동</b>⚠️\n",
            if pump { "🚀🚀🚀" } else { "💥💥💥" },
            format!("<b>{}</b>", pct),
        ),
        Severity::Moderate => ("", if pump { "🚀🚀" } else { "💥💥" }, pct),
    };

    format!(
        "{highlight}┌{icon} <a href=\"{link}\">{coin}</a> ⚡ {size_tag} {color}\n└ {old} → {new}",
        link = futures_url(&event.instrument),
        coin = escape_html(coin_name(&event.instrument)),
        old = format_price(event.base_price),
        new = format_price(event.current_price),
    )
}

/// 신규 선물 상장 안내 메시지 (심볼 정렬).
pub fn format_listing_announcement(instruments: &[String]) -> String {
    let mut coins: Vec<&str> = instruments.iter().map(|s| coin_name(s)).collect();
    coins.sort_unstable();

    coins
        .iter()
        .map(|coin| format!("🆕 <b>신규 선물 상장:</b> <code>{}</code>", escape_html(coin)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 상장 일정 조회 범위.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarWindow {
    /// 앞으로 7일 내 상장 예정
    Upcoming,
    /// 지난 7일간 상장
    Recent,
}

fn weekday_ko(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "월요일",
        Weekday::Tue => "화요일",
        Weekday::Wed => "수요일",
        Weekday::Thu => "목요일",
        Weekday::Fri => "금요일",
        Weekday::Sat => "토요일",
        Weekday::Sun => "일요일",
    }
}

/// 상장 일정 메시지.
pub fn format_calendar(entries: &[ListingEntry], now: DateTime<Utc>, window: CalendarWindow) -> String {
    let week = Duration::days(7);
    let (title, bullet, empty) = match window {
        CalendarWindow::Upcoming => (
            "📅 <b>상장 예정 코인 (7일)</b>",
            "🆕",
            "📅 앞으로 7일 내 상장 예정 코인이 없습니다",
        ),
        CalendarWindow::Recent => (
            "📋 <b>최근 상장 코인 (지난 7일)</b>",
            "✅",
            "📋 지난 7일간 상장된 코인이 없습니다",
        ),
    };

    let mut selected: Vec<&ListingEntry> = entries
        .iter()
        .filter(|e| match window {
            CalendarWindow::Upcoming => now <= e.first_open_time && e.first_open_time <= now + week,
            CalendarWindow::Recent => now - week <= e.first_open_time && e.first_open_time <= now,
        })
        .collect();

    if selected.is_empty() {
        return empty.to_string();
    }
    selected.sort_by_key(|e| e.first_open_time);

    let mut lines = vec![title.to_string(), String::new()];
    for entry in selected {
        let local = entry.first_open_time.with_timezone(&CALENDAR_TZ);
        lines.push(format!(
            "{} <code>{}</code> ({})",
            bullet,
            escape_html(&entry.coin),
            escape_html(&entry.full_name)
        ));
        lines.push(format!(
            "   ⏰ {}, {}",
            weekday_ko(local.weekday()),
            local.format("%Y-%m-%d %H:%M")
        ));
    }

    lines.join("\n")
}
