//! Tour API ingestion: client, XML parsing, field mapping, paged sync loop.

pub mod client;
pub mod mapper;
pub mod sync;
pub mod xml;

pub use client::TourClient;
pub use sync::{run_festival_sync, run_paged_sync, PageSource, SyncSummary};
