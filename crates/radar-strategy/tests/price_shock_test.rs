//! Price Shock 감지기 통합 테스트
//!
//! ## 핵심 로직
//!
//! 1. 첫 유효 샘플: 기준가 설정, 알림 없음
//! 2. 변동률 = (현재가 - 기준가) / 기준가 * 100
//! 3. |변동률| < 1.5 또는 극값 갱신 후 50초 초과 → 기준가 리셋
//! 4. 변동률 >= 3 또는 <= -3 → 알림 (|변동률| >= 10이면 EXTREME)

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use radar_core::{AlertThresholds, Sample, Severity};
use radar_strategy::{Evaluation, PriceShockConfig, PriceShockDetector, RejectReason};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ============================================================================
// 테스트 헬퍼 함수
// ============================================================================

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// 거래대금이 충분한 샘플 생성 (t0 + secs)
fn sample(symbol: &str, price: Decimal, secs: i64) -> Sample {
    Sample::new(symbol, price, dec!(1000000), t0() + Duration::seconds(secs))
}

fn detector() -> PriceShockDetector {
    PriceShockDetector::new(PriceShockConfig::default())
}

fn expect_alert(eval: Evaluation) -> radar_core::AlertEvent {
    match eval {
        Evaluation::Alert(event) => event,
        other => panic!("알림이 발생해야 함: {:?}", other),
    }
}

// ============================================================================
// 초기화
// ============================================================================

proptest! {
    #[test]
    fn prop_first_valid_sample_never_alerts(raw in 1i64..1_000_000_000_000i64, scale in 0u32..8) {
        let price = Decimal::new(raw, scale);
        let mut det = detector();

        let eval = det.on_sample(&sample("ANY_USDT", price, 0));

        prop_assert_eq!(eval, Evaluation::Initialized);
        prop_assert_eq!(det.state("ANY_USDT").unwrap().base_price, price);
    }
}

#[test]
fn test_rejected_sample_never_creates_state() {
    let mut det = detector();

    let low = Sample::new("LOW_USDT", dec!(1.0), dec!(99999), t0());
    assert_eq!(det.on_sample(&low), Evaluation::Rejected(RejectReason::LowTurnover));

    let zero = sample("ZERO_USDT", Decimal::ZERO, 0);
    assert_eq!(det.on_sample(&zero), Evaluation::Rejected(RejectReason::NonPositivePrice));

    let negative = sample("NEG_USDT", dec!(-1), 0);
    assert_eq!(det.on_sample(&negative), Evaluation::Rejected(RejectReason::NonPositivePrice));

    assert_eq!(det.tracked_count(), 0);
}

#[test]
fn test_low_turnover_does_not_mutate_tracking_state() {
    let mut det = detector();
    det.on_sample(&sample("BTC_USDT", dec!(100), 0));
    let before = det.state("BTC_USDT").unwrap().clone();

    // 가격이 크게 움직여도 거래대금 미달이면 무시
    let thin = Sample::new("BTC_USDT", dec!(150), dec!(10), t0() + Duration::seconds(1));
    assert_eq!(det.on_sample(&thin), Evaluation::Rejected(RejectReason::LowTurnover));
    assert_eq!(det.state("BTC_USDT").unwrap(), &before);
}

// ============================================================================
// 알림
// ============================================================================

#[test]
fn test_moderate_pump() {
    let mut det = detector();
    det.on_sample(&sample("BTC_USDT", dec!(100), 0));

    let event = expect_alert(det.on_sample(&sample("BTC_USDT", dec!(103.5), 1)));
    assert_eq!(event.change_pct, dec!(3.5));
    assert_eq!(event.severity, Severity::Moderate);
    assert_eq!(event.base_price, dec!(100));
    assert_eq!(event.current_price, dec!(103.5));
}

#[test]
fn test_below_threshold_is_tracked() {
    let mut det = detector();
    det.on_sample(&sample("BTC_USDT", dec!(100), 0));

    assert_eq!(det.on_sample(&sample("BTC_USDT", dec!(102.9), 1)), Evaluation::Tracked);
    assert_eq!(det.on_sample(&sample("BTC_USDT", dec!(97.1), 2)), Evaluation::Tracked);
}

#[test]
fn test_extreme_dump_and_settle() {
    let mut det = detector();
    det.on_sample(&sample("ETH_USDT", dec!(100), 0));

    let event = expect_alert(det.on_sample(&sample("ETH_USDT", dec!(88), 1)));
    assert_eq!(event.change_pct, dec!(-12));
    assert_eq!(event.severity, Severity::Extreme);

    det.settle_extreme(&event);
    assert_eq!(det.state("ETH_USDT").unwrap().base_price, dec!(88));
    assert_eq!(det.state("ETH_USDT").unwrap().max_change_pct, Decimal::ZERO);

    // 다음 변동률은 88 기준
    let next = expect_alert(det.on_sample(&sample("ETH_USDT", dec!(92.4), 2)));
    assert_eq!(next.base_price, dec!(88));
    assert_eq!(next.change_pct, dec!(5));
    assert_eq!(next.severity, Severity::Moderate);
}

#[test]
fn test_settle_ignores_moderate_event() {
    let mut det = detector();
    det.on_sample(&sample("BTC_USDT", dec!(100), 0));
    let event = expect_alert(det.on_sample(&sample("BTC_USDT", dec!(104), 1)));

    det.settle_extreme(&event);
    assert_eq!(det.state("BTC_USDT").unwrap().base_price, dec!(100));
}

#[test]
fn test_repeated_qualifying_samples_each_alert() {
    let mut det = detector();
    det.on_sample(&sample("SOL_USDT", dec!(100), 0));

    let alerts = [dec!(104), dec!(105), dec!(104.5)]
        .into_iter()
        .enumerate()
        .filter_map(|(i, p)| det.on_sample(&sample("SOL_USDT", p, i as i64 + 1)).into_alert())
        .count();

    assert_eq!(alerts, 3);
    assert_eq!(det.state("SOL_USDT").unwrap().max_change_pct, dec!(5));
}

#[test]
fn test_custom_thresholds() {
    let thresholds = AlertThresholds {
        pump: dec!(5),
        dump: dec!(-5),
        ..AlertThresholds::default()
    };
    let mut det = PriceShockDetector::new(PriceShockConfig::with_thresholds(thresholds));
    det.on_sample(&sample("BTC_USDT", dec!(100), 0));

    assert_eq!(det.on_sample(&sample("BTC_USDT", dec!(104), 1)), Evaluation::Tracked);
    assert!(det.on_sample(&sample("BTC_USDT", dec!(94), 2)).into_alert().is_some());
}

// ============================================================================
// 기준가 리셋
// ============================================================================

#[test]
fn test_small_drift_resets_base_without_alert() {
    let mut det = detector();
    det.on_sample(&sample("BTC_USDT", dec!(100), 0));

    assert_eq!(det.on_sample(&sample("BTC_USDT", dec!(101), 1)), Evaluation::Tracked);
    assert_eq!(det.state("BTC_USDT").unwrap().base_price, dec!(101));
}

#[test]
fn test_stale_extremum_resets_base() {
    let mut det = detector();
    det.on_sample(&sample("BTC_USDT", dec!(100), 0));

    // +2%: 극값 갱신, 리셋 없음
    assert_eq!(det.on_sample(&sample("BTC_USDT", dec!(102), 1)), Evaluation::Tracked);
    assert_eq!(det.state("BTC_USDT").unwrap().base_price, dec!(100));

    // 59초 후 극값 갱신 없는 +1.8% → 기준가 리셋
    assert_eq!(det.on_sample(&sample("BTC_USDT", dec!(101.8), 60)), Evaluation::Tracked);
    assert_eq!(det.state("BTC_USDT").unwrap().base_price, dec!(101.8));
}

#[test]
fn test_stale_reset_regardless_of_magnitude() {
    let mut det = detector();
    det.on_sample(&sample("BTC_USDT", dec!(100), 0));
    det.on_sample(&sample("BTC_USDT", dec!(105), 1));

    // 50초 초과 후 극값 갱신 없는 +4%: 알림은 리셋 전 변동률로 발생, 기준가는 현재가로 이동
    let event = expect_alert(det.on_sample(&sample("BTC_USDT", dec!(104), 70)));
    assert_eq!(event.change_pct, dec!(4));
    assert_eq!(event.base_price, dec!(100));
    assert_eq!(det.state("BTC_USDT").unwrap().base_price, dec!(104));
}

#[test]
fn test_new_extremum_after_quiet_gap_keeps_base() {
    let mut det = detector();
    det.on_sample(&sample("BTC_USDT", dec!(100), 0));
    assert_eq!(det.on_sample(&sample("BTC_USDT", dec!(101.6), 1)), Evaluation::Tracked);

    // 60초 뒤 새 극값(+5%): stale 아님, 기준가 유지
    let event = expect_alert(det.on_sample(&sample("BTC_USDT", dec!(105), 61)));
    assert_eq!(event.change_pct, dec!(5));
    assert_eq!(det.state("BTC_USDT").unwrap().base_price, dec!(100));
    assert_eq!(
        det.state("BTC_USDT").unwrap().last_significant_change_at,
        Some(t0() + Duration::seconds(61))
    );

    // 1초 뒤 +4%: 같은 기준가로 다시 알림
    let event = expect_alert(det.on_sample(&sample("BTC_USDT", dec!(104), 62)));
    assert_eq!(event.base_price, dec!(100));
    assert_eq!(event.change_pct, dec!(4));
    assert_eq!(det.state("BTC_USDT").unwrap().base_price, dec!(100));
}

#[test]
fn test_within_stale_window_keeps_base() {
    let mut det = detector();
    det.on_sample(&sample("BTC_USDT", dec!(100), 0));
    det.on_sample(&sample("BTC_USDT", dec!(102), 1));

    // 정확히 50초는 리셋하지 않음
    det.on_sample(&sample("BTC_USDT", dec!(101.9), 51));
    assert_eq!(det.state("BTC_USDT").unwrap().base_price, dec!(100));
}

#[test]
fn test_backup_sweep_skips_recent_alerts() {
    let mut det = detector();
    det.on_sample(&sample("HOT_USDT", dec!(100), 0));
    det.on_sample(&sample("COLD_USDT", dec!(50), 0));

    expect_alert(det.on_sample(&sample("HOT_USDT", dec!(104), 1)));
    det.on_sample(&sample("COLD_USDT", dec!(51), 2)); // +2%, 기준가 유지
    assert_eq!(det.state("COLD_USDT").unwrap().base_price, dec!(50));

    let reset = det.sweep_stale_bases(t0() + Duration::seconds(100));
    assert_eq!(reset, 1);
    assert_eq!(det.state("HOT_USDT").unwrap().base_price, dec!(100));
    assert_eq!(det.state("COLD_USDT").unwrap().base_price, dec!(51));

    // 300초 초과 후에는 알림 심볼도 리셋
    let reset = det.sweep_stale_bases(t0() + Duration::seconds(400));
    assert_eq!(reset, 2);
    assert_eq!(det.state("HOT_USDT").unwrap().base_price, dec!(104));
}
