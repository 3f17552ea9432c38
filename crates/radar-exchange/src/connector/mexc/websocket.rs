//! MEXC 선물 ticker 스트림 관리자.
//!
//! 하나의 논리 세션을 유지합니다.
//!
//! - 연결 시 심볼 목록 전체를 5ms 간격으로 구독
//! - `{"ping":N}` → `{"pong":N}` 응답, 20초마다 클라이언트 Ping
//! - 메시지를 받을 때마다 동적 구독 큐 소진
//! - 연결이 끊기면 [`ReconnectBackoff`] 대기 후 재연결
//!
//! 심볼 목록과 구독 큐는 재연결 사이에도 유지됩니다.
//! 샘플 채널 수신자가 닫히면 종료합니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{Sink, SinkExt, StreamExt};
use radar_core::{InstrumentSource, ProviderError, Sample};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;
use tokio_tungstenite::tungstenite::{self, protocol::Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::types::{parse_stream_message, pong_message, subscribe_message, StreamMessage};
use crate::retry::ReconnectBackoff;
use crate::ExchangeResult;

const PING_INTERVAL: Duration = Duration::from_secs(20);
const SUBSCRIBE_PACING: Duration = Duration::from_millis(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 동적 구독 대기 항목.
#[derive(Debug, Clone)]
struct PendingSubscription {
    symbol: String,
    /// 이미 한 번 실패해 재등록된 항목
    retried: bool,
}

/// 동적 구독 큐 핸들.
///
/// 카탈로그 폴링이 신규 심볼을 넣으면 스트림 관리자가 재연결 없이 구독합니다.
#[derive(Debug, Clone)]
pub struct SubscribeHandle {
    tx: mpsc::UnboundedSender<PendingSubscription>,
}

impl SubscribeHandle {
    /// 심볼을 구독 큐에 넣습니다. 관리자가 종료되었으면 `false`.
    pub fn enqueue(&self, symbol: impl Into<String>) -> bool {
        self.tx
            .send(PendingSubscription {
                symbol: symbol.into(),
                retried: false,
            })
            .is_ok()
    }
}

/// MEXC 선물 WebSocket 관리자.
pub struct MexcWebSocket {
    url: String,
    instruments: Arc<RwLock<Vec<String>>>,
    sample_tx: mpsc::Sender<Sample>,
    queue_tx: mpsc::UnboundedSender<PendingSubscription>,
    queue_rx: Option<mpsc::UnboundedReceiver<PendingSubscription>>,
    source: Option<Arc<dyn InstrumentSource>>,
    backoff: ReconnectBackoff,
    subscribe_pacing: Duration,
}

impl MexcWebSocket {
    /// 새 관리자 생성. 파싱된 샘플은 `sample_tx`로 전달됩니다.
    pub fn new(url: impl Into<String>, sample_tx: mpsc::Sender<Sample>) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            url: url.into(),
            instruments: Arc::new(RwLock::new(Vec::new())),
            sample_tx,
            queue_tx,
            queue_rx: Some(queue_rx),
            source: None,
            backoff: ReconnectBackoff::default(),
            subscribe_pacing: SUBSCRIBE_PACING,
        }
    }

    /// 심볼 목록이 비어 있을 때 사용할 제공자.
    pub fn with_source(mut self, source: Arc<dyn InstrumentSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_backoff(mut self, backoff: ReconnectBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_subscribe_pacing(mut self, pacing: Duration) -> Self {
        self.subscribe_pacing = pacing;
        self
    }

    /// 동적 구독 큐 핸들.
    pub fn subscribe_handle(&self) -> SubscribeHandle {
        SubscribeHandle {
            tx: self.queue_tx.clone(),
        }
    }

    /// 구독 심볼 목록 공유 핸들.
    pub fn instruments(&self) -> Arc<RwLock<Vec<String>>> {
        self.instruments.clone()
    }

    /// 구독 심볼 목록 교체 (다음 연결부터 적용).
    pub async fn set_instruments(&self, symbols: Vec<String>) {
        *self.instruments.write().await = symbols;
    }

    /// 재연결 루프 실행. 샘플 수신자가 닫힐 때까지 반환하지 않습니다.
    pub async fn run(&mut self) {
        let Some(mut queue_rx) = self.queue_rx.take() else {
            error!("MEXC WebSocket 관리자가 이미 실행 중");
            return;
        };

        loop {
            if self.sample_tx.is_closed() {
                break;
            }

            match self.ensure_instruments().await {
                Ok(_) => self.connect_and_serve(&mut queue_rx).await,
                Err(e) => warn!(error = %e, "구독 심볼 목록 조회 실패, 연결 보류"),
            }

            if self.sample_tx.is_closed() {
                break;
            }

            let delay = self.backoff.next_delay();
            warn!(delay_secs = delay.as_secs(), "재연결 대기");
            tokio::time::sleep(delay).await;
        }

        info!("샘플 수신자 종료, MEXC WebSocket 관리자 중단");
    }

    async fn connect_and_serve(
        &mut self,
        queue_rx: &mut mpsc::UnboundedReceiver<PendingSubscription>,
    ) {
        match connect_async(self.url.as_str()).await {
            Ok((ws_stream, _)) => {
                self.backoff.reset();
                info!(url = %self.url, "MEXC WebSocket 연결됨");

                match self.run_session(ws_stream, queue_rx).await {
                    Ok(()) => warn!("MEXC WebSocket 세션 종료"),
                    Err(e) => error!(error = %e, "MEXC WebSocket 세션 오류"),
                }
            }
            Err(e) => {
                error!(error = %e, url = %self.url, "MEXC WebSocket 연결 실패");
            }
        }
    }

    /// 심볼 목록이 비어 있으면 제공자에서 채웁니다.
    ///
    /// 조회 실패나 빈 목록은 에러로 돌려 재연결 대기 후 다시 시도하게 합니다.
    /// 제공자가 없으면 빈 목록 그대로 연결합니다.
    async fn ensure_instruments(&self) -> Result<usize, ProviderError> {
        let current = self.instruments.read().await.len();
        if current > 0 {
            return Ok(current);
        }
        let Some(source) = &self.source else {
            return Ok(0);
        };

        let symbols = source.list_active().await?;
        if symbols.is_empty() {
            return Err(ProviderError::Other("활성 심볼 목록이 비어 있음".to_string()));
        }

        let count = symbols.len();
        info!(count, "구독 심볼 목록 조회");
        self.set_instruments(symbols).await;
        Ok(count)
    }

    async fn run_session(
        &self,
        ws_stream: WsStream,
        queue_rx: &mut mpsc::UnboundedReceiver<PendingSubscription>,
    ) -> ExchangeResult<()> {
        let (mut ws_tx, mut ws_rx) = ws_stream.split::<Message>();

        let count = self.subscribe_all(&mut ws_tx).await?;
        info!(count, "전체 심볼 구독 완료");

        let mut ping_interval = interval(PING_INTERVAL);
        ping_interval.tick().await; // 첫 tick은 즉시 반환

        loop {
            tokio::select! {
                msg = ws_rx.next() => {
                    let Some(msg) = msg else {
                        return Ok(());
                    };
                    match msg? {
                        Message::Text(text) => self.handle_text(&text, &mut ws_tx).await?,
                        Message::Ping(payload) => ws_tx.send(Message::Pong(payload)).await?,
                        Message::Close(frame) => {
                            info!(?frame, "서버가 연결을 종료");
                            return Ok(());
                        }
                        _ => {}
                    }

                    self.drain_queue(&mut ws_tx, queue_rx).await;

                    if self.sample_tx.is_closed() {
                        return Ok(());
                    }
                }
                _ = ping_interval.tick() => {
                    ws_tx.send(Message::Ping(Vec::new())).await?;
                }
            }
        }
    }

    async fn handle_text<S>(&self, text: &str, ws_tx: &mut S) -> ExchangeResult<()>
    where
        S: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        match parse_stream_message(text) {
            Ok(StreamMessage::Ping(token)) => {
                ws_tx.send(Message::Text(pong_message(&token))).await?;
            }
            Ok(StreamMessage::Ticker(push)) => {
                if let Some(sample) = push.into_sample(Utc::now()) {
                    // 수신자가 닫혔으면 세션 루프가 종료를 처리
                    let _ = self.sample_tx.send(sample).await;
                }
            }
            Ok(StreamMessage::Other) => {}
            Err(e) => debug!(error = %e, "스트림 메시지 파싱 실패, 무시"),
        }
        Ok(())
    }

    async fn subscribe_all<S>(&self, ws_tx: &mut S) -> ExchangeResult<usize>
    where
        S: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let symbols = self.instruments.read().await.clone();

        for symbol in &symbols {
            ws_tx.send(Message::Text(subscribe_message(symbol))).await?;
            tokio::time::sleep(self.subscribe_pacing).await;
        }

        Ok(symbols.len())
    }

    /// 동적 구독 큐를 비웁니다.
    ///
    /// 전송 실패한 항목은 한 번만 다시 큐에 넣고, 두 번째 실패는 버립니다.
    /// 버려진 심볼도 목록에는 남아 다음 연결 시 구독됩니다.
    async fn drain_queue<S>(
        &self,
        ws_tx: &mut S,
        queue_rx: &mut mpsc::UnboundedReceiver<PendingSubscription>,
    ) where
        S: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let mut failed = Vec::new();

        while let Ok(pending) = queue_rx.try_recv() {
            {
                let mut instruments = self.instruments.write().await;
                if !instruments.contains(&pending.symbol) {
                    instruments.push(pending.symbol.clone());
                }
            }

            match ws_tx.send(Message::Text(subscribe_message(&pending.symbol))).await {
                Ok(()) => info!(symbol = %pending.symbol, "신규 심볼 동적 구독"),
                Err(e) if !pending.retried => {
                    warn!(symbol = %pending.symbol, error = %e, "동적 구독 실패, 재시도 예약");
                    failed.push(PendingSubscription {
                        retried: true,
                        ..pending
                    });
                }
                Err(e) => {
                    warn!(symbol = %pending.symbol, error = %e, "동적 구독 재시도 실패, 포기");
                }
            }
        }

        for pending in failed {
            let _ = self.queue_tx.send(pending);
        }
    }
}
