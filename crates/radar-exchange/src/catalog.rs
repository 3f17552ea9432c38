//! 선물 심볼 카탈로그.
//!
//! 주기적으로 활성 심볼 목록을 조회해 알려진 집합과 비교합니다.
//! 첫 조회(알려진 집합이 비어 있음)는 집합을 채우기만 하고 신규로 취급하지 않습니다.

use std::collections::BTreeSet;
use std::sync::Arc;

use radar_core::{InstrumentSource, ProviderError, SharedState};
use tracing::{debug, info};

use crate::connector::mexc::SubscribeHandle;

/// 한 번의 폴링 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogDelta {
    /// 콜드 스타트: 알려진 집합을 채움 (심볼 수)
    Seeded(usize),
    /// 새로 발견된 심볼 (정렬됨)
    Added(Vec<String>),
    /// 변화 없음
    Unchanged,
}

/// 심볼 카탈로그.
pub struct InstrumentCatalog {
    source: Arc<dyn InstrumentSource>,
    state: SharedState,
    subscribe: SubscribeHandle,
}

impl InstrumentCatalog {
    pub fn new(
        source: Arc<dyn InstrumentSource>,
        state: SharedState,
        subscribe: SubscribeHandle,
    ) -> Self {
        Self {
            source,
            state,
            subscribe,
        }
    }

    /// 현재 활성 심볼 집합 조회.
    pub async fn list_active(&self) -> Result<BTreeSet<String>, ProviderError> {
        Ok(self.source.list_active().await?.into_iter().collect())
    }

    /// 신규 심볼을 감지합니다.
    ///
    /// 신규 심볼은 알려진 집합에 추가되고 동적 구독 큐에 들어갑니다.
    /// 조회 실패 시 상태를 바꾸지 않고 에러를 반환합니다.
    pub async fn poll(&self) -> Result<CatalogDelta, ProviderError> {
        let active = self.list_active().await?;

        let added: Vec<String> = {
            let mut state = self.state.write().await;

            if state.known_instruments.is_empty() {
                let count = active.len();
                state.known_instruments = active;
                info!(count, "알려진 심볼 집합 초기화 (신규 알림 없음)");
                return Ok(CatalogDelta::Seeded(count));
            }

            let added: Vec<String> = active
                .difference(&state.known_instruments)
                .cloned()
                .collect();
            state.known_instruments.extend(added.iter().cloned());
            added
        };

        if added.is_empty() {
            debug!(active = active.len(), "신규 심볼 없음");
            return Ok(CatalogDelta::Unchanged);
        }

        for symbol in &added {
            if !self.subscribe.enqueue(symbol.as_str()) {
                debug!(symbol = %symbol, "구독 큐가 닫혀 있음");
            }
        }

        info!(count = added.len(), symbols = ?added, "신규 상장 심볼 감지");
        Ok(CatalogDelta::Added(added))
    }

    /// 시작 시 1회 조회.
    ///
    /// 알려진 집합이 비어 있으면 채우고, 스트림 관리자용 심볼 목록을 반환합니다.
    pub async fn prime(&self) -> Result<Vec<String>, ProviderError> {
        let active = self.list_active().await?;

        let mut state = self.state.write().await;
        if state.known_instruments.is_empty() {
            state.known_instruments = active.clone();
        }

        Ok(active.into_iter().collect())
    }
}
