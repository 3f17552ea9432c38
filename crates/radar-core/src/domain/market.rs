//! 시세 샘플과 급등락 이벤트.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 스트림에서 수신한 단일 시세 샘플.
///
/// 감지기가 한 번 소비하고 버립니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// 선물 심볼 (예: `BTC_USDT`)
    pub instrument: String,
    /// 최근 체결가
    pub last_price: Decimal,
    /// 24시간 USDT 거래대금
    pub turnover_usdt: Decimal,
    /// 수신 시각
    pub observed_at: DateTime<Utc>,
}

impl Sample {
    /// 새 샘플을 생성합니다.
    pub fn new(
        instrument: impl Into<String>,
        last_price: Decimal,
        turnover_usdt: Decimal,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            last_price,
            turnover_usdt,
            observed_at,
        }
    }
}

/// 급등락 심각도.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// 임계값 이상, 극단 임계값 미만
    Moderate,
    /// 극단 임계값 이상
    Extreme,
}

/// 가격 변동 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// 급등
    Pump,
    /// 급락
    Dump,
}

/// 알림 대상 급등락 이벤트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// 선물 심볼
    pub instrument: String,
    /// 변동률 계산 기준가
    pub base_price: Decimal,
    /// 현재가
    pub current_price: Decimal,
    /// 변동률 (%) = (현재가 - 기준가) / 기준가 * 100
    pub change_pct: Decimal,
    /// 심각도
    pub severity: Severity,
    /// 감지 시각
    pub observed_at: DateTime<Utc>,
}

impl AlertEvent {
    /// 변동률 절대값.
    pub fn abs_change(&self) -> Decimal {
        self.change_pct.abs()
    }

    /// 변동 방향 (0 이상이면 급등).
    pub fn direction(&self) -> Direction {
        if self.change_pct >= Decimal::ZERO {
            Direction::Pump
        } else {
            Direction::Dump
        }
    }

    /// 극단 이벤트 여부.
    pub fn is_extreme(&self) -> bool {
        self.severity == Severity::Extreme
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn event(change_pct: Decimal, severity: Severity) -> AlertEvent {
        AlertEvent {
            instrument: "BTC_USDT".to_string(),
            base_price: dec!(100),
            current_price: dec!(100) + change_pct,
            change_pct,
            severity,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_direction_and_abs() {
        let pump = event(dec!(3.5), Severity::Moderate);
        assert_eq!(pump.direction(), Direction::Pump);
        assert_eq!(pump.abs_change(), dec!(3.5));
        assert!(!pump.is_extreme());

        let dump = event(dec!(-12), Severity::Extreme);
        assert_eq!(dump.direction(), Direction::Dump);
        assert_eq!(dump.abs_change(), dec!(12));
        assert!(dump.is_extreme());
    }

    #[test]
    fn test_severity_serde() {
        let json = serde_json::to_string(&Severity::Extreme).unwrap();
        assert_eq!(json, "\"EXTREME\"");
    }
}
