//! 구독자 레지스트리와 프로세스 공유 상태.
//!
//! # 구조
//!
//! ```text
//! RadarState                 // 영속화 대상 (JSON)
//! ├── subscribers            // SubscriberRegistry
//! └── known_instruments      // 카탈로그가 확인한 심볼 집합
//! ```
//!
//! `SharedState`(`Arc<RwLock<RadarState>>`)로 카탈로그, 봇 명령 핸들러,
//! 알림 디스패처 경로가 함께 사용합니다. 감지기 상태는 여기에 포함되지 않습니다.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::{AlertMode, Subscriber, SubscriberId};

/// 공유 상태 핸들.
pub type SharedState = Arc<RwLock<RadarState>>;

/// 구독자 ID → 설정 매핑.
///
/// 구독 해제 시에도 모드와 음소거 목록은 유지됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriberRegistry {
    subscribers: BTreeMap<SubscriberId, Subscriber>,
}

impl SubscriberRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, id: SubscriberId) -> &mut Subscriber {
        self.subscribers
            .entry(id)
            .or_insert_with(|| Subscriber::new(id))
    }

    /// 구독자 조회.
    pub fn get(&self, id: SubscriberId) -> Option<&Subscriber> {
        self.subscribers.get(&id)
    }

    /// 첫 사용 등록 (`/start`).
    ///
    /// 처음 보는 ID면 ALL 모드로 생성하고, 개인 알림을 활성화합니다.
    /// 새로 생성된 경우 `true`.
    pub fn register(&mut self, id: SubscriberId) -> bool {
        let is_new = !self.subscribers.contains_key(&id);
        self.entry(id).active = true;
        is_new
    }

    /// 개인 알림 활성화.
    pub fn subscribe(&mut self, id: SubscriberId) {
        self.entry(id).active = true;
    }

    /// 개인 알림 비활성화. 이전에 활성 상태였으면 `true`.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        match self.subscribers.get_mut(&id) {
            Some(sub) if sub.active => {
                sub.active = false;
                true
            }
            _ => false,
        }
    }

    /// 알림 모드 설정.
    pub fn set_mode(&mut self, id: SubscriberId, mode: AlertMode) {
        self.entry(id).alert_mode = mode;
    }

    /// 알림 모드 조회 (미등록 시 ALL).
    pub fn mode(&self, id: SubscriberId) -> AlertMode {
        self.subscribers
            .get(&id)
            .map(|s| s.alert_mode)
            .unwrap_or_default()
    }

    /// 심볼 음소거. 새로 추가되었으면 `true`.
    pub fn mute(&mut self, id: SubscriberId, instrument: &str) -> bool {
        self.entry(id).muted_instruments.insert(instrument.to_string())
    }

    /// 심볼 음소거 해제. 음소거되어 있었으면 `true`.
    pub fn unmute(&mut self, id: SubscriberId, instrument: &str) -> bool {
        self.subscribers
            .get_mut(&id)
            .map(|s| s.muted_instruments.remove(instrument))
            .unwrap_or(false)
    }

    /// 음소거 목록 (정렬됨).
    pub fn muted(&self, id: SubscriberId) -> Vec<String> {
        self.subscribers
            .get(&id)
            .map(|s| s.muted_instruments.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 개인 알림을 받는 구독자 스냅샷.
    pub fn active_subscribers(&self) -> Vec<Subscriber> {
        self.subscribers
            .values()
            .filter(|s| s.active)
            .cloned()
            .collect()
    }

    /// 활성 구독자 수.
    pub fn active_count(&self) -> usize {
        self.subscribers.values().filter(|s| s.active).count()
    }

    /// 등록된 전체 구독자 수 (비활성 포함).
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// 등록된 구독자가 없는지 확인.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// 영속화되는 프로세스 공유 상태.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadarState {
    /// 구독자 레지스트리
    #[serde(default)]
    pub subscribers: SubscriberRegistry,
    /// 카탈로그가 확인한 심볼 집합
    #[serde(default)]
    pub known_instruments: BTreeSet<String>,
}

impl RadarState {
    /// 공유 핸들로 감쌉니다.
    pub fn into_shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }
}
