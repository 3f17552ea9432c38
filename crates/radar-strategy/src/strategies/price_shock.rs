//! Price Shock 감지기 (기준가 대비 급등락)
//!
//! 심볼마다 기준가를 두고, 새 시세가 기준가 대비 임계값 이상 움직이면
//! 알림 이벤트를 만듭니다.
//!
//! # 감지 로직
//! - **필터**: 가격 <= 0 또는 24시간 거래대금 < 최소 거래대금이면 상태 변경 없이 거부
//! - **초기화**: 심볼의 첫 유효 샘플은 기준가만 설정 (알림 없음)
//! - **극값 추적**: 변동률 절대값이 기존 최대치를 넘으면 최대치와 시각 갱신
//! - **기준가 리셋**:
//!   - 변동률 절대값 < 1.5%
//!   - 마지막 극값 갱신 후 50초 초과 (이번 샘플의 극값 갱신 반영 후)
//! - **알림**: 변동률 >= +3% 또는 <= -3% (리셋 전 변동률 기준, 쿨다운 없음)
//! - **극단 정산**: 극단 이벤트 발송 후 [`PriceShockDetector::settle_extreme`]로 기준가 리셋
//! - **백업 스윕**: 5분간 알림이 없던 심볼은 기준가를 마지막 가격으로 리셋

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use radar_core::{AlertEvent, AlertThresholds, Sample, Severity};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, trace};

/// 감지기 설정.
#[derive(Debug, Clone)]
pub struct PriceShockConfig {
    /// 알림/필터 임계값
    pub thresholds: AlertThresholds,
    /// 이 값 미만의 변동률(절대값)이면 기준가 리셋
    pub drift_reset_pct: Decimal,
    /// 극값 갱신 없이 이 시간이 지나면 기준가 리셋
    pub stale_extremum: Duration,
    /// 백업 스윕: 이 시간 동안 알림이 없던 심볼의 기준가 리셋
    pub backup_reset_window: Duration,
}

impl Default for PriceShockConfig {
    fn default() -> Self {
        Self {
            thresholds: AlertThresholds::default(),
            drift_reset_pct: dec!(1.5),
            stale_extremum: Duration::seconds(50),
            backup_reset_window: Duration::seconds(300),
        }
    }
}

impl PriceShockConfig {
    /// 임계값만 교체한 기본 설정.
    pub fn with_thresholds(thresholds: AlertThresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }
}

/// 샘플 거부 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// 가격이 0 이하
    NonPositivePrice,
    /// 24시간 거래대금이 최소 기준 미만
    LowTurnover,
}

/// 샘플 평가 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// 필터에 걸려 무시됨 (상태 변경 없음)
    Rejected(RejectReason),
    /// 심볼 첫 샘플로 기준가 설정
    Initialized,
    /// 추적만 하고 알림 없음
    Tracked,
    /// 알림 이벤트 발생
    Alert(AlertEvent),
}

impl Evaluation {
    /// 알림 이벤트가 있으면 꺼냅니다.
    pub fn into_alert(self) -> Option<AlertEvent> {
        match self {
            Evaluation::Alert(event) => Some(event),
            _ => None,
        }
    }
}

/// 심볼별 추적 상태.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentState {
    /// 변동률 계산 기준가
    pub base_price: Decimal,
    /// 마지막 유효 가격
    pub last_price: Decimal,
    /// 마지막 유효 샘플 시각
    pub last_observed_at: DateTime<Utc>,
    /// 현재 기준가 이후 최대 변동률 (부호 포함)
    pub max_change_pct: Decimal,
    pub max_change_at: Option<DateTime<Utc>>,
    /// 마지막 극값 갱신 시각
    pub last_significant_change_at: Option<DateTime<Utc>>,
    /// 마지막 알림 시각
    pub last_alert_at: Option<DateTime<Utc>>,
}

impl InstrumentState {
    fn new(price: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            base_price: price,
            last_price: price,
            last_observed_at: now,
            max_change_pct: Decimal::ZERO,
            max_change_at: None,
            last_significant_change_at: None,
            last_alert_at: None,
        }
    }

    /// 기준가를 `price`로 옮기고 극값 추적을 초기화합니다.
    fn reset_base(&mut self, price: Decimal, now: DateTime<Utc>) {
        self.base_price = price;
        self.max_change_pct = Decimal::ZERO;
        self.max_change_at = Some(now);
    }
}

/// 심볼별 급등락 감지기.
///
/// 단일 워커가 소유하며 샘플을 순서대로 평가합니다.
#[derive(Debug, Default)]
pub struct PriceShockDetector {
    config: PriceShockConfig,
    states: HashMap<String, InstrumentState>,
}

impl PriceShockDetector {
    /// 새 감지기 생성.
    pub fn new(config: PriceShockConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    /// 심볼 상태 조회.
    pub fn state(&self, instrument: &str) -> Option<&InstrumentState> {
        self.states.get(instrument)
    }

    /// 추적 중인 심볼 수.
    pub fn tracked_count(&self) -> usize {
        self.states.len()
    }

    /// 샘플 하나를 평가합니다.
    pub fn on_sample(&mut self, sample: &Sample) -> Evaluation {
        let thresholds = &self.config.thresholds;
        let price = sample.last_price;
        let now = sample.observed_at;

        if price <= Decimal::ZERO {
            return Evaluation::Rejected(RejectReason::NonPositivePrice);
        }
        if sample.turnover_usdt < thresholds.min_turnover_usdt {
            return Evaluation::Rejected(RejectReason::LowTurnover);
        }

        let state = match self.states.entry(sample.instrument.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(InstrumentState::new(price, now));
                trace!(symbol = %sample.instrument, %price, "기준가 초기화");
                return Evaluation::Initialized;
            }
            Entry::Occupied(occupied) => occupied.into_mut(),
        };

        state.last_price = price;
        state.last_observed_at = now;

        let base_price = state.base_price;
        let Some(change_pct) = (price - base_price)
            .checked_div(base_price)
            .and_then(|r| r.checked_mul(dec!(100)))
        else {
            return Evaluation::Tracked;
        };
        let abs_change = change_pct.abs();

        if abs_change > state.max_change_pct.abs() {
            state.max_change_pct = change_pct;
            state.max_change_at = Some(now);
            state.last_significant_change_at = Some(now);
        }

        // 극값을 갱신한 샘플은 stale이 될 수 없음
        let stale = state
            .last_significant_change_at
            .is_some_and(|at| now - at > self.config.stale_extremum);

        if abs_change < self.config.drift_reset_pct || stale {
            state.reset_base(price, now);
            if stale {
                trace!(symbol = %sample.instrument, %price, "극값 갱신 없음, 기준가 리셋");
            }
        }

        if !thresholds.qualifies(change_pct) {
            return Evaluation::Tracked;
        }

        let severity = if thresholds.is_extreme(abs_change) {
            Severity::Extreme
        } else {
            Severity::Moderate
        };
        state.last_alert_at = Some(now);

        debug!(
            symbol = %sample.instrument,
            %base_price,
            %price,
            change_pct = %change_pct.round_dp(2),
            ?severity,
            "급등락 감지"
        );

        Evaluation::Alert(AlertEvent {
            instrument: sample.instrument.clone(),
            base_price,
            current_price: price,
            change_pct,
            severity,
            observed_at: now,
        })
    }

    /// 극단 이벤트 발송 후 기준가를 이벤트 현재가로 리셋합니다.
    ///
    /// 극단 이벤트가 아니면 아무것도 하지 않습니다.
    pub fn settle_extreme(&mut self, event: &AlertEvent) {
        if event.severity != Severity::Extreme {
            return;
        }
        if let Some(state) = self.states.get_mut(&event.instrument) {
            state.reset_base(event.current_price, event.observed_at);
            debug!(symbol = %event.instrument, price = %event.current_price, "극단 변동 후 기준가 리셋");
        }
    }

    /// 백업 스윕.
    ///
    /// 최근 `backup_reset_window` 동안 알림이 없던 심볼의 기준가를 마지막 가격으로 옮깁니다.
    /// 리셋된 심볼 수를 반환합니다.
    pub fn sweep_stale_bases(&mut self, now: DateTime<Utc>) -> usize {
        let window = self.config.backup_reset_window;
        let mut reset = 0;

        for state in self.states.values_mut() {
            let quiet = state.last_alert_at.map_or(true, |at| now - at > window);
            if quiet {
                state.base_price = state.last_price;
                reset += 1;
            }
        }

        reset
    }
}
