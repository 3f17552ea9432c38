//! 알림 임계값.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// 급등락 판정 및 구독자 필터에 사용하는 임계값 묶음.
///
/// 모든 값은 퍼센트 단위이며, `min_turnover_usdt`만 USDT 금액입니다.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertThresholds {
    /// 급등 임계값 (변동률 >= 이 값이면 알림)
    pub pump: Decimal,
    /// 급락 임계값 (변동률 <= 이 값이면 알림)
    pub dump: Decimal,
    /// MODERATE_ONLY 모드 상한 (포함)
    pub moderate_max: Decimal,
    /// 극단 변동 임계값
    pub extreme: Decimal,
    /// 최소 24시간 거래대금 (유동성 하한)
    pub min_turnover_usdt: Decimal,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            pump: dec!(3.0),
            dump: dec!(-3.0),
            moderate_max: dec!(5.0),
            extreme: dec!(10.0),
            min_turnover_usdt: dec!(100000),
        }
    }
}

impl AlertThresholds {
    /// 변동률이 알림 대상인지 확인합니다.
    pub fn qualifies(&self, change_pct: Decimal) -> bool {
        change_pct >= self.pump || change_pct <= self.dump
    }

    /// 변동률 절대값이 극단 구간인지 확인합니다.
    pub fn is_extreme(&self, abs_change: Decimal) -> bool {
        abs_change >= self.extreme
    }

    /// 변동률 절대값이 MODERATE_ONLY 구간 `[pump, moderate_max]`에 있는지 확인합니다.
    pub fn in_moderate_band(&self, abs_change: Decimal) -> bool {
        self.pump <= abs_change && abs_change <= self.moderate_max
    }
}
