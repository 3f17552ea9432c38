//! MEXC 선물 커넥터.
//!
//! - `client`: 계약 목록, 상장 일정 REST 조회
//! - `websocket`: ticker 스트림 (재연결, 동적 구독)
//! - `types`: REST 응답 및 스트림 메시지 타입

mod client;
mod types;
mod websocket;

pub use client::{MexcClient, MexcConfig};
pub use types::{
    parse_stream_message, subscribe_message, ContractDetail, NewCoin, StreamMessage, TickerPush,
};
pub use websocket::{MexcWebSocket, SubscribeHandle};
