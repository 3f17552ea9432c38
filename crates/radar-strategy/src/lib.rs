//! # Radar Strategy
//!
//! 심볼별 급등락 감지기.
//!
//! 감지기는 단일 워커가 독점 소유하며, 샘플을 하나씩 평가해
//! 알림 이벤트를 만들어냅니다. I/O는 하지 않습니다.

pub mod strategies;

pub use strategies::price_shock::{
    Evaluation, InstrumentState, PriceShockConfig, PriceShockDetector, RejectReason,
};
