//! 감지 전략 모듈.

pub mod price_shock;
