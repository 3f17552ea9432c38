//! # Radar Core
//!
//! 선물 급등락 감지 봇의 도메인 타입과 공유 상태.
//!
//! # 구성
//!
//! ```text
//! radar-core
//! ├── domain
//! │   ├── instrument        // 심볼 표기, 상장 일정 항목
//! │   ├── market            // Sample, AlertEvent, Severity
//! │   ├── subscriber        // AlertMode, Subscriber
//! │   ├── thresholds        // 알림 임계값 묶음
//! │   └── exchange_provider // ProviderError, InstrumentSource
//! └── registry              // SubscriberRegistry, RadarState
//! ```

pub mod domain;
pub mod registry;

pub use domain::*;
pub use registry::{RadarState, SharedState, SubscriberRegistry};
