//! 구독자와 알림 모드.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::market::AlertEvent;
use super::thresholds::AlertThresholds;

/// 구독자 식별자 (텔레그램 chat id).
pub type SubscriberId = i64;

/// 구독자별 알림 모드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertMode {
    /// 모든 급등락
    #[default]
    All,
    /// `[pump, moderate_max]` 구간만
    ModerateOnly,
    /// 극단 변동만
    ExtremeOnly,
}

impl AlertMode {
    /// 변동률 절대값이 이 모드에서 수신 대상인지 확인합니다.
    ///
    /// MODERATE_ONLY 상한과 극단 임계값 사이(기본 5~10%)는
    /// ALL 모드에서만 수신됩니다.
    pub fn accepts(&self, abs_change: Decimal, thresholds: &AlertThresholds) -> bool {
        match self {
            AlertMode::All => true,
            AlertMode::ModerateOnly => thresholds.in_moderate_band(abs_change),
            AlertMode::ExtremeOnly => thresholds.is_extreme(abs_change),
        }
    }

    /// 사용자 표시용 설명.
    pub fn label(&self) -> &'static str {
        match self {
            AlertMode::All => "전체 (3–5% + ≥10%)",
            AlertMode::ModerateOnly => "3–5%만",
            AlertMode::ExtremeOnly => "≥10%만",
        }
    }
}

/// 알림 구독자.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// 구독자 ID
    pub id: SubscriberId,
    /// 알림 모드
    #[serde(default)]
    pub alert_mode: AlertMode,
    /// 음소거한 심볼 목록
    #[serde(default)]
    pub muted_instruments: BTreeSet<String>,
    /// 개인 알림 수신 여부
    #[serde(default)]
    pub active: bool,
}

impl Subscriber {
    /// 비활성 상태의 새 구독자를 생성합니다.
    pub fn new(id: SubscriberId) -> Self {
        Self {
            id,
            alert_mode: AlertMode::All,
            muted_instruments: BTreeSet::new(),
            active: false,
        }
    }

    /// 심볼 음소거 여부.
    pub fn is_muted(&self, instrument: &str) -> bool {
        self.muted_instruments.contains(instrument)
    }

    /// 이벤트를 이 구독자에게 전달해야 하는지 확인합니다.
    pub fn wants(&self, event: &AlertEvent, thresholds: &AlertThresholds) -> bool {
        !self.is_muted(&event.instrument) && self.alert_mode.accepts(event.abs_change(), thresholds)
    }
}
