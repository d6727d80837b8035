//! Object-storage ingestion: finalize-event handling for village XML uploads.

pub mod villages;

pub use villages::{handle_finalize, FinalizeEvent, TriggerOutcome};
