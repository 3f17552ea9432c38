//! 신규 선물 상장 감지 모듈.

use std::sync::Arc;
use std::time::Instant;

use radar_core::SharedState;
use radar_exchange::{CatalogDelta, InstrumentCatalog};
use radar_notification::{AlertDispatcher, StatePersister};
use tokio::sync::broadcast;
use tokio::time::{interval_at, MissedTickBehavior};

use crate::config::ListingPollConfig;
use crate::{JobStats, Result};

/// 신규 상장 감지 작업 의존성
pub struct ListingPollJob {
    pub catalog: InstrumentCatalog,
    pub dispatcher: Arc<AlertDispatcher>,
    pub state: SharedState,
    pub persister: Arc<dyn StatePersister>,
}

/// 신규 상장 1회 조회
///
/// 방송 채널도 활성 구독자도 없으면 조회하지 않습니다.
pub async fn poll_listings(job: &ListingPollJob) -> Result<JobStats> {
    let start = Instant::now();
    let mut stats = JobStats::new();

    let subscribers = job.state.read().await.subscribers.active_subscribers();
    if !job.dispatcher.has_broadcast() && subscribers.is_empty() {
        tracing::debug!("수신자 없음, 신규 상장 조회 건너뛰기");
        stats.skipped = 1;
        stats.elapsed = start.elapsed();
        return Ok(stats);
    }

    let delta = job.catalog.poll().await?;

    if let CatalogDelta::Added(added) = &delta {
        let report = job.dispatcher.announce_listings(added, &subscribers).await;
        stats.record_dispatch(&report);
    }

    if !matches!(delta, CatalogDelta::Unchanged) {
        let snapshot = job.state.read().await.clone();
        job.persister.persist(&snapshot).await;
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}

/// 신규 상장 감지 루프
///
/// 첫 조회는 `first_poll_delay` 후, 이후 `interval`마다 실행합니다.
/// 조회 실패는 기록만 하고 다음 주기를 기다립니다.
pub async fn run_listing_poll(
    job: ListingPollJob,
    config: ListingPollConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let first = tokio::time::Instant::now() + config.first_poll_delay;
    let mut ticker = interval_at(first, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        first_poll_secs = config.first_poll_delay.as_secs(),
        interval_secs = config.interval.as_secs(),
        "신규 상장 감지 시작"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("신규 상장 감지 종료 신호 수신");
                break;
            }
            _ = ticker.tick() => {
                match poll_listings(&job).await {
                    Ok(stats) if stats.total > 0 => stats.log_summary("listing_poll"),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "신규 상장 조회 실패, 다음 주기에 재시도"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use radar_core::{AlertThresholds, InstrumentSource, ProviderError, RadarState};
    use radar_exchange::MexcWebSocket;
    use radar_notification::{AlertTransport, Destination, NotificationResult};
    use tokio::sync::mpsc;

    use crate::error::DaemonError;

    struct ScriptedSource {
        responses: Mutex<VecDeque<std::result::Result<Vec<String>, ProviderError>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<std::result::Result<Vec<&str>, ProviderError>>) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.map(|v| v.into_iter().map(String::from).collect()))
                        .collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl InstrumentSource for ScriptedSource {
        async fn list_active(&self) -> std::result::Result<Vec<String>, ProviderError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Other("exhausted".into())))
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(Destination, String)>>,
    }

    #[async_trait]
    impl AlertTransport for RecordingTransport {
        async fn deliver(&self, destination: &Destination, text: &str) -> NotificationResult<()> {
            self.sent
                .lock()
                .unwrap()
                .push((destination.clone(), text.to_string()));
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[derive(Default)]
    struct CountingPersister {
        saved: Mutex<Vec<RadarState>>,
    }

    #[async_trait]
    impl StatePersister for CountingPersister {
        async fn persist(&self, state: &RadarState) {
            self.saved.lock().unwrap().push(state.clone());
        }
    }

    struct Fixture {
        job: ListingPollJob,
        transport: Arc<RecordingTransport>,
        persister: Arc<CountingPersister>,
        _samples: mpsc::Receiver<radar_core::Sample>,
    }

    fn fixture(
        responses: Vec<std::result::Result<Vec<&str>, ProviderError>>,
        broadcast: Option<Destination>,
        state: RadarState,
    ) -> Fixture {
        let (sample_tx, sample_rx) = mpsc::channel(1);
        let ws = MexcWebSocket::new("ws://127.0.0.1:1", sample_tx);
        let state = state.into_shared();

        let transport = Arc::new(RecordingTransport::default());
        let persister = Arc::new(CountingPersister::default());
        let dispatcher = AlertDispatcher::new(
            transport.clone(),
            broadcast,
            AlertThresholds::default(),
        );

        Fixture {
            job: ListingPollJob {
                catalog: InstrumentCatalog::new(
                    Arc::new(ScriptedSource::new(responses)),
                    state.clone(),
                    ws.subscribe_handle(),
                ),
                dispatcher: Arc::new(dispatcher),
                state,
                persister: persister.clone(),
            },
            transport,
            persister,
            _samples: sample_rx,
        }
    }

    fn channel() -> Destination {
        Destination::Channel("@radar_alerts".to_string())
    }

    #[tokio::test]
    async fn test_skipped_without_recipients() {
        let f = fixture(vec![Ok(vec!["BTC_USDT"])], None, RadarState::default());

        let stats = poll_listings(&f.job).await.unwrap();

        assert_eq!(stats.skipped, 1);
        assert!(f.job.state.read().await.known_instruments.is_empty());
        assert!(f.persister.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seed_then_announce_additions() {
        let f = fixture(
            vec![
                Ok(vec!["BTC_USDT", "ETH_USDT"]),
                Ok(vec!["BTC_USDT", "ETH_USDT", "NEW_USDT"]),
                Ok(vec!["BTC_USDT", "ETH_USDT", "NEW_USDT"]),
            ],
            Some(channel()),
            RadarState::default(),
        );

        // 첫 조회: 초기화만, 안내 없음
        poll_listings(&f.job).await.unwrap();
        assert!(f.transport.sent.lock().unwrap().is_empty());
        assert_eq!(f.persister.saved.lock().unwrap().len(), 1);

        // 두 번째: 신규 1개 안내 + 저장
        let stats = poll_listings(&f.job).await.unwrap();
        assert_eq!(stats.success, 1);
        {
            let sent = f.transport.sent.lock().unwrap();
            assert_eq!(sent.len(), 1);
            assert!(sent[0].1.contains("<code>NEW</code>"));
        }
        let saved = f.persister.saved.lock().unwrap().clone();
        assert_eq!(saved.len(), 2);
        assert!(saved[1].known_instruments.contains("NEW_USDT"));

        // 세 번째: 변화 없음, 저장 없음
        poll_listings(&f.job).await.unwrap();
        assert_eq!(f.transport.sent.lock().unwrap().len(), 1);
        assert_eq!(f.persister.saved.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_active_subscriber_enables_poll() {
        let mut state = RadarState::default();
        state.subscribers.register(5);
        state.known_instruments.insert("BTC_USDT".to_string());
        let f = fixture(vec![Ok(vec!["BTC_USDT", "SOL_USDT"])], None, state);

        poll_listings(&f.job).await.unwrap();

        let sent = f.transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Destination::Chat(5));
    }

    #[tokio::test]
    async fn test_failed_poll_leaves_state() {
        let mut state = RadarState::default();
        state.known_instruments.insert("BTC_USDT".to_string());
        let f = fixture(
            vec![Err(ProviderError::Network("timeout".into()))],
            Some(channel()),
            state,
        );

        let err = poll_listings(&f.job).await.unwrap_err();

        assert!(matches!(err, DaemonError::DataSource(_)));
        assert_eq!(f.job.state.read().await.known_instruments.len(), 1);
        assert!(f.persister.saved.lock().unwrap().is_empty());
    }
}
