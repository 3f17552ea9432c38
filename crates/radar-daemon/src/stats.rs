//! 작업 통계 구조체.

use std::time::Duration;

use radar_notification::DispatchReport;

/// 주기 작업 통계
#[derive(Debug, Clone, Default)]
pub struct JobStats {
    /// 총 처리 대상 수
    pub total: usize,
    /// 성공 횟수
    pub success: usize,
    /// 에러 횟수
    pub errors: usize,
    /// 건너뛴 횟수 (필터 제외 등)
    pub skipped: usize,
    /// 소요 시간
    pub elapsed: Duration,
}

impl JobStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 전송 결과 누적
    pub fn record_dispatch(&mut self, report: &DispatchReport) {
        self.total += report.attempted() + report.filtered;
        self.success += report.delivered;
        self.errors += report.failed;
        self.skipped += report.filtered;
    }

    /// 성공률 계산 (%)
    ///
    /// skipped는 분모에서 제외.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.total.saturating_sub(self.skipped);
        if attempted == 0 {
            0.0
        } else {
            (self.success as f64 / attempted as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            errors = self.errors,
            skipped = self.skipped,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "작업 완료"
        );
    }
}
