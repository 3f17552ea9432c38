//! 알림 팬아웃.
//!
//! 메시지 하나를 방송 채널과 구독자들에게 동시에 보냅니다.
//! 수신자 하나의 실패는 기록만 하고 다른 수신자에게 영향을 주지 않습니다.

use std::sync::Arc;

use futures::future::join_all;
use radar_core::{AlertEvent, AlertThresholds, Subscriber};
use tracing::{debug, info, warn};

use crate::format::{format_alert, format_listing_announcement};
use crate::types::{AlertTransport, Destination};

/// 팬아웃 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// 전송 성공
    pub delivered: usize,
    /// 전송 실패
    pub failed: usize,
    /// 모드/음소거 필터로 제외
    pub filtered: usize,
}

impl DispatchReport {
    /// 전송 시도 수.
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// 알림 디스패처.
pub struct AlertDispatcher {
    transport: Arc<dyn AlertTransport>,
    broadcast: Option<Destination>,
    thresholds: AlertThresholds,
}

impl AlertDispatcher {
    pub fn new(
        transport: Arc<dyn AlertTransport>,
        broadcast: Option<Destination>,
        thresholds: AlertThresholds,
    ) -> Self {
        Self {
            transport,
            broadcast,
            thresholds,
        }
    }

    /// 방송 채널 설정 여부.
    pub fn has_broadcast(&self) -> bool {
        self.broadcast.is_some()
    }

    /// 급등락 이벤트 전송.
    ///
    /// 방송 채널에는 항상, 활성 구독자에게는 음소거/모드 필터를 통과한 경우에만 보냅니다.
    pub async fn dispatch(&self, event: &AlertEvent, subscribers: &[Subscriber]) -> DispatchReport {
        let text = format_alert(event);

        let mut targets: Vec<Destination> = self.broadcast.iter().cloned().collect();
        let mut filtered = 0;

        for sub in subscribers.iter().filter(|s| s.active) {
            if sub.wants(event, &self.thresholds) {
                targets.push(Destination::Chat(sub.id));
            } else {
                filtered += 1;
            }
        }

        let mut report = self.fan_out(&text, targets).await;
        report.filtered = filtered;

        info!(
            symbol = %event.instrument,
            change_pct = %event.change_pct.round_dp(2),
            severity = ?event.severity,
            delivered = report.delivered,
            failed = report.failed,
            filtered = report.filtered,
            "급등락 알림 전송"
        );
        report
    }

    /// 신규 상장 안내 전송 (필터 없음).
    pub async fn announce_listings(
        &self,
        instruments: &[String],
        subscribers: &[Subscriber],
    ) -> DispatchReport {
        if instruments.is_empty() {
            return DispatchReport::default();
        }

        let text = format_listing_announcement(instruments);
        let targets = self
            .broadcast
            .iter()
            .cloned()
            .chain(
                subscribers
                    .iter()
                    .filter(|s| s.active)
                    .map(|s| Destination::Chat(s.id)),
            )
            .collect();

        let report = self.fan_out(&text, targets).await;
        info!(
            count = instruments.len(),
            delivered = report.delivered,
            failed = report.failed,
            "신규 상장 안내 전송"
        );
        report
    }

    async fn fan_out(&self, text: &str, targets: Vec<Destination>) -> DispatchReport {
        let results = join_all(targets.iter().map(|destination| async move {
            (destination, self.transport.deliver(destination, text).await)
        }))
        .await;

        let mut report = DispatchReport::default();
        for (destination, result) in results {
            match result {
                Ok(()) => {
                    report.delivered += 1;
                    debug!(%destination, transport = self.transport.name(), "전송 완료");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(%destination, error = %e, "알림 전송 실패");
                }
            }
        }
        report
    }
}
