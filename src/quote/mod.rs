//! Price quote service client and price history log.

mod client;
mod history;

pub use client::CoinCapClient;
pub use history::FileHistoryLog;
