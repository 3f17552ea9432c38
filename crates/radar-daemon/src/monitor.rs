//! 가격 감시 워커.
//!
//! 스트림에서 받은 샘플을 감지기에 순서대로 넣고, 알림 이벤트를 디스패처로 넘깁니다.
//! 감지기 상태는 이 워커만 소유합니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use radar_core::{Sample, SharedState};
use radar_notification::{AlertDispatcher, DispatchReport};
use radar_strategy::{Evaluation, PriceShockDetector};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::stats::JobStats;

/// 가격 감시 워커.
pub struct PriceMonitor {
    detector: PriceShockDetector,
    dispatcher: Arc<AlertDispatcher>,
    state: SharedState,
    stats: JobStats,
}

impl PriceMonitor {
    pub fn new(
        detector: PriceShockDetector,
        dispatcher: Arc<AlertDispatcher>,
        state: SharedState,
    ) -> Self {
        Self {
            detector,
            dispatcher,
            state,
            stats: JobStats::new(),
        }
    }

    /// 샘플 하나를 평가하고, 알림이면 전송합니다.
    ///
    /// 극단 이벤트는 전송이 끝난 뒤 기준가를 정리합니다.
    pub async fn handle_sample(&mut self, sample: &Sample) -> Option<DispatchReport> {
        let event = match self.detector.on_sample(sample) {
            Evaluation::Alert(event) => event,
            _ => return None,
        };

        let subscribers = self.state.read().await.subscribers.active_subscribers();
        let report = self.dispatcher.dispatch(&event, &subscribers).await;
        self.stats.record_dispatch(&report);

        self.detector.settle_extreme(&event);
        Some(report)
    }

    /// 백업 스윕 실행. 리셋된 심볼 수를 반환합니다.
    pub fn sweep(&mut self) -> usize {
        let reset = self.detector.sweep_stale_bases(Utc::now());
        info!(
            reset,
            tracked = self.detector.tracked_count(),
            "기준가 백업 리셋"
        );
        reset
    }

    /// 워커 루프.
    ///
    /// 샘플 채널이 닫히거나 종료 신호를 받으면 빠져나옵니다.
    pub async fn run(
        mut self,
        mut samples: mpsc::Receiver<Sample>,
        mut shutdown_rx: broadcast::Receiver<()>,
        sweep_every: Duration,
    ) {
        let mut sweep = interval(sweep_every);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);
        sweep.tick().await; // 첫 tick 즉시 반환 (소비)

        info!(sweep_secs = sweep_every.as_secs(), "가격 감시 시작");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("가격 감시 종료 신호 수신");
                    break;
                }
                maybe = samples.recv() => {
                    match maybe {
                        Some(sample) => {
                            self.handle_sample(&sample).await;
                        }
                        None => {
                            debug!("샘플 채널 닫힘");
                            break;
                        }
                    }
                }
                _ = sweep.tick() => {
                    self.sweep();
                }
            }
        }

        self.stats.log_summary("price_monitor");
    }
}
