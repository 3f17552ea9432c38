//! 도메인 모델.

pub mod exchange_provider;
pub mod instrument;
pub mod market;
pub mod subscriber;
pub mod thresholds;

pub use exchange_provider::{InstrumentSource, ListingCalendarSource, ProviderError};
pub use instrument::{coin_name, futures_url, normalize_instrument, ListingEntry, SETTLE_SUFFIX};
pub use market::{AlertEvent, Direction, Sample, Severity};
pub use subscriber::{AlertMode, Subscriber, SubscriberId};
pub use thresholds::AlertThresholds;
