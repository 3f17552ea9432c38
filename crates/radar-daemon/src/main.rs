//! 선물 급등락 감지 데몬.
//!
//! MEXC 선물 티커 스트림을 구독하고, 심볼별 급등락을 감지해 텔레그램으로 알립니다.
//!
//! # 사용법
//!
//! ```bash
//! # 데몬 실행
//! radar-daemon run
//!
//! # 활성 USDT 선물 심볼 조회
//! radar-daemon symbols
//!
//! # 상장 일정 조회
//! radar-daemon listings
//! ```

mod config;
mod error;
mod modules;
mod monitor;
mod stats;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use radar_exchange::{InstrumentCatalog, MexcClient, MexcWebSocket};
use radar_notification::bot_handler::{register_commands, run_dispatcher};
use radar_notification::format::CALENDAR_TZ;
use radar_notification::{AlertDispatcher, BotContext, StatePersister, TelegramTransport};
use radar_strategy::{PriceShockConfig, PriceShockDetector};
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use config::DaemonConfig;
pub use error::Result;
pub use stats::JobStats;

use modules::{run_listing_poll, ListingPollJob};
use monitor::PriceMonitor;
use storage::StateFile;

#[derive(Parser)]
#[command(name = "radar-daemon")]
#[command(about = "MEXC Futures Price-Shock Radar", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 데몬 실행 (스트림 감시 + 신규 상장 감지 + 봇 명령)
    Run,

    /// 활성 USDT 선물 심볼 목록 출력
    Symbols,

    /// 상장 일정 출력 (호치민 시간)
    Listings,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 로깅 초기화 (radar_* 크레이트 모두 포함)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "radar_daemon={lvl},radar_exchange={lvl},radar_strategy={lvl},radar_notification={lvl},radar_core={lvl}",
                    lvl = cli.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Symbols => {
            let client = MexcClient::new(DaemonConfig::exchange_from_env())?;
            let symbols = client.get_active_symbols().await?;
            for symbol in &symbols {
                println!("{}", symbol);
            }
            tracing::info!(count = symbols.len(), "활성 심볼 조회 완료");
        }

        Commands::Listings => {
            let client = MexcClient::new(DaemonConfig::exchange_from_env())?;
            let mut entries = client.get_listing_calendar().await?;
            entries.sort_by_key(|e| e.first_open_time);
            for entry in &entries {
                println!(
                    "{}\t{}\t{}",
                    entry.first_open_time.with_timezone(&CALENDAR_TZ).format("%Y-%m-%d %H:%M"),
                    entry.coin,
                    entry.full_name
                );
            }
            tracing::info!(count = entries.len(), "상장 일정 조회 완료");
        }

        Commands::Run => run_daemon().await?,
    }

    Ok(())
}

async fn run_daemon() -> anyhow::Result<()> {
    tracing::info!("Futures Radar 데몬 시작");

    let config = DaemonConfig::from_env()?;
    tracing::debug!(
        ws_url = %config.exchange.ws_url,
        state_file = %config.state_file.display(),
        admins = config.admin_ids.len(),
        broadcast = config.channel.is_some(),
        "설정 로드 완료"
    );

    // 상태 복원
    let state_file = Arc::new(StateFile::new(config.state_file.clone()));
    let state = state_file.load().await?.into_shared();
    {
        let snapshot = state.read().await;
        tracing::info!(
            subscribers = snapshot.subscribers.len(),
            active = snapshot.subscribers.active_count(),
            known_instruments = snapshot.known_instruments.len(),
            "상태 파일 로드 완료"
        );
    }

    let client = Arc::new(MexcClient::new(config.exchange.clone())?);

    // 스트림 관리자
    let (sample_tx, sample_rx) = mpsc::channel(config.sample_channel_capacity);
    let mut ws = MexcWebSocket::new(config.exchange.ws_url.clone(), sample_tx)
        .with_source(client.clone());
    let catalog = InstrumentCatalog::new(client.clone(), state.clone(), ws.subscribe_handle());

    // 시작 시 심볼 목록 선조회 (실패 시 연결 직전에 다시 조회)
    match catalog.prime().await {
        Ok(symbols) => {
            tracing::info!(count = symbols.len(), "초기 심볼 목록 조회 완료");
            ws.set_instruments(symbols).await;
            let snapshot = state.read().await.clone();
            state_file.persist(&snapshot).await;
        }
        Err(e) => tracing::warn!(error = %e, "초기 심볼 목록 조회 실패, 연결 시 재조회"),
    }

    // 알림 경로
    let transport = Arc::new(TelegramTransport::new(&config.telegram));
    let bot = transport.bot();
    let dispatcher = Arc::new(AlertDispatcher::new(
        transport,
        config.channel.clone(),
        config.thresholds.clone(),
    ));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let ws_handle = tokio::spawn(async move { ws.run().await });

    let reset_window = chrono::Duration::from_std(config.base_reset_interval)
        .unwrap_or_else(|_| chrono::Duration::seconds(300));
    let detector = PriceShockDetector::new(PriceShockConfig {
        backup_reset_window: reset_window,
        ..PriceShockConfig::with_thresholds(config.thresholds.clone())
    });
    let monitor = PriceMonitor::new(detector, dispatcher.clone(), state.clone());
    let monitor_handle = tokio::spawn(monitor.run(
        sample_rx,
        shutdown_tx.subscribe(),
        config.base_reset_interval,
    ));

    let listing_job = ListingPollJob {
        catalog,
        dispatcher,
        state: state.clone(),
        persister: state_file.clone(),
    };
    let listing_handle = tokio::spawn(run_listing_poll(
        listing_job,
        config.listing.clone(),
        shutdown_tx.subscribe(),
    ));

    // 봇 명령 처리
    let bot_handle = if config.telegram.enabled {
        register_commands(&bot).await;
        let ctx = Arc::new(BotContext {
            state: state.clone(),
            admins: config.admin_ids.clone(),
            calendar: client.clone(),
            persister: state_file.clone(),
        });
        Some(tokio::spawn(run_dispatcher(bot, ctx)))
    } else {
        tracing::warn!("텔레그램 비활성화, 봇 명령 처리 생략");
        None
    };

    // Ctrl+C 대기 후 종료 시그널 전송
    tokio::signal::ctrl_c().await.ok();
    tracing::info!("종료 신호 수신, 데몬 종료 중...");
    let _ = shutdown_tx.send(());

    let _ = tokio::join!(monitor_handle, listing_handle);
    ws_handle.abort();
    if let Some(handle) = bot_handle {
        if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
            tracing::warn!("봇 디스패처 종료 대기 시간 초과");
        }
    }

    let snapshot = state.read().await.clone();
    state_file.persist(&snapshot).await;

    tracing::info!("Futures Radar 데몬 종료");
    Ok(())
}
