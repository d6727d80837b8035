pub mod api;
pub mod ingest;
pub mod logging;
pub mod poster;
pub mod schedule;
pub mod storage;
pub mod store;
pub mod tour;

pub mod util {
    pub mod env;
}
