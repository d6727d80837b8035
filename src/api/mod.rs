// HTTP surface for tour-sync: health, manual sync trigger, storage finalize
// webhook, poster composition.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use server::ApiServer;
