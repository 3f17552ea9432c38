//! 상태 파일 저장소.
//!
//! 구독자 레지스트리와 알려진 심볼 집합을 JSON 파일 하나에 보관합니다.

use std::path::PathBuf;

use async_trait::async_trait;
use radar_core::RadarState;
use radar_notification::StatePersister;
use tracing::{debug, warn};

use crate::error::Result;

/// JSON 상태 파일.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 상태 로드.
    ///
    /// 파일이 없으면 빈 상태, 손상된 파일은 경고 후 빈 상태를 반환합니다.
    pub async fn load(&self) -> Result<RadarState> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "상태 파일 없음, 빈 상태로 시작");
                return Ok(RadarState::default());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<RadarState>(&raw) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "상태 파일 손상, 빈 상태로 시작");
                Ok(RadarState::default())
            }
        }
    }

    /// 상태 저장 (임시 파일 기록 후 교체).
    pub async fn save(&self, state: &RadarState) -> Result<()> {
        let body = serde_json::to_vec_pretty(state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StatePersister for StateFile {
    async fn persist(&self, state: &RadarState) {
        if let Err(e) = self.save(state).await {
            warn!(path = %self.path.display(), error = %e, "상태 저장 실패");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_core::AlertMode;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("radar-daemon-{}-{}", std::process::id(), name))
            .join("state.json")
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let file = StateFile::new(temp_path("missing"));
        let state = file.load().await.unwrap();
        assert_eq!(state, RadarState::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let file = StateFile::new(temp_path("roundtrip"));

        let mut state = RadarState::default();
        state.subscribers.register(42);
        state.subscribers.set_mode(42, AlertMode::ExtremeOnly);
        state.subscribers.mute(42, "BTC_USDT");
        state.known_instruments.insert("BTC_USDT".to_string());

        file.persist(&state).await;
        let loaded = file.load().await.unwrap();

        assert_eq!(loaded, state);
        assert_eq!(loaded.subscribers.mode(42), AlertMode::ExtremeOnly);

        let _ = tokio::fs::remove_dir_all(file.path.as_path().parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty_state() {
        let file = StateFile::new(temp_path("corrupt"));
        tokio::fs::create_dir_all(file.path.as_path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(file.path.as_path(), b"{ not json").await.unwrap();

        let state = file.load().await.unwrap();
        assert_eq!(state, RadarState::default());

        let _ = tokio::fs::remove_dir_all(file.path.as_path().parent().unwrap()).await;
    }
}
