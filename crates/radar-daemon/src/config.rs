//! 데몬 설정 모듈.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use radar_core::AlertThresholds;
use radar_exchange::MexcConfig;
use radar_notification::{Destination, TelegramConfig};
use rust_decimal::Decimal;

use crate::error::{DaemonError, Result};

/// 데몬 전체 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 텔레그램 봇 설정
    pub telegram: TelegramConfig,
    /// 방송 채널 (없으면 구독자에게만 전송)
    pub channel: Option<Destination>,
    /// 관리자 chat id
    pub admin_ids: BTreeSet<i64>,
    /// 거래소 엔드포인트
    pub exchange: MexcConfig,
    /// 상태 파일 경로
    pub state_file: PathBuf,
    /// 알림 임계값
    pub thresholds: AlertThresholds,
    /// 기준가 백업 리셋 주기
    pub base_reset_interval: Duration,
    /// 신규 상장 조회 설정
    pub listing: ListingPollConfig,
    /// 스트림 → 감지기 샘플 채널 용량
    pub sample_channel_capacity: usize,
}

/// 신규 상장 조회 설정
#[derive(Debug, Clone)]
pub struct ListingPollConfig {
    /// 조회 주기
    pub interval: Duration,
    /// 시작 후 첫 조회까지 대기
    pub first_poll_delay: Duration,
}

impl DaemonConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// 거래소 설정만 로드 (봇 토큰 불필요)
    pub fn exchange_from_env() -> MexcConfig {
        dotenvy::dotenv().ok();
        exchange_config(&|key: &str| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정 구성
    pub fn from_vars<F>(vars: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = vars("BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                DaemonError::Config("BOT_TOKEN 환경변수가 설정되지 않았습니다".to_string())
            })?;

        let mut telegram = TelegramConfig::new(token);
        telegram.enabled = env_var_bool(&vars, "TELEGRAM_ENABLED", true);

        let channel = vars("CHANNEL_ID").and_then(|raw| Destination::parse(&raw));

        let mut admin_ids = BTreeSet::new();
        for raw in env_var_list(&vars, "ADMIN_IDS") {
            match raw.parse::<i64>() {
                Ok(id) => {
                    admin_ids.insert(id);
                }
                Err(_) => tracing::warn!(value = %raw, "잘못된 관리자 ID 무시"),
            }
        }

        let exchange = exchange_config(&vars);

        let defaults = AlertThresholds::default();
        let thresholds = AlertThresholds {
            pump: env_var_parse(&vars, "PUMP_THRESHOLD", defaults.pump),
            dump: env_var_parse(&vars, "DUMP_THRESHOLD", defaults.dump),
            moderate_max: env_var_parse(&vars, "MODERATE_MAX", defaults.moderate_max),
            extreme: env_var_parse(&vars, "EXTREME_THRESHOLD", defaults.extreme),
            min_turnover_usdt: env_var_parse::<Decimal, _>(
                &vars,
                "MIN_VOLUME_THRESHOLD",
                defaults.min_turnover_usdt,
            ),
        };

        if thresholds.pump <= Decimal::ZERO || thresholds.dump >= Decimal::ZERO {
            return Err(DaemonError::Config(format!(
                "임계값 부호가 잘못되었습니다 (pump={}, dump={})",
                thresholds.pump, thresholds.dump
            )));
        }

        Ok(Self {
            telegram,
            channel,
            admin_ids,
            exchange,
            state_file: vars("STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("radar_state.json")),
            thresholds,
            base_reset_interval: Duration::from_secs(env_var_parse(
                &vars,
                "BASE_RESET_INTERVAL_SECS",
                300u64,
            ).max(1)),
            listing: ListingPollConfig {
                interval: Duration::from_secs(env_var_parse(
                    &vars,
                    "LISTING_POLL_INTERVAL_SECS",
                    600u64,
                ).max(1)),
                first_poll_delay: Duration::from_secs(env_var_parse(
                    &vars,
                    "LISTING_FIRST_POLL_DELAY_SECS",
                    120,
                )),
            },
            sample_channel_capacity: env_var_parse(&vars, "SAMPLE_CHANNEL_CAPACITY", 4096usize).max(1),
        })
    }
}

/// 거래소 엔드포인트 설정
fn exchange_config<F>(vars: &F) -> MexcConfig
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = MexcConfig::default();
    MexcConfig {
        rest_base_url: vars("FUTURES_REST_URL").unwrap_or(defaults.rest_base_url),
        ws_url: vars("FUTURES_WS_URL").unwrap_or(defaults.ws_url),
        calendar_url: vars("LISTING_CALENDAR_URL").unwrap_or(defaults.calendar_url),
        request_timeout: defaults.request_timeout,
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T, F>(vars: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    vars(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool<F>(vars: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    vars(key)
        .map(|v| {
            let v = v.trim().to_lowercase();
            v == "true" || v == "1"
        })
        .unwrap_or(default)
}

/// 환경변수에서 쉼표로 구분된 리스트 파싱
fn env_var_list<F>(vars: &F, key: &str) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    vars(key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
