//! 주기 작업 모듈.

pub mod listing_poll;

pub use listing_poll::{poll_listings, run_listing_poll, ListingPollJob};
