// API route configuration

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::health_check))
        // Manual ingestion trigger (immediate response, background run)
        .route(
            "/ingest/festivals",
            web::post().to(handlers::trigger_festival_sync),
        )
        // Object-storage finalize webhook
        .route(
            "/storage/finalize",
            web::post().to(handlers::storage_finalize),
        )
        // Poster composition
        .service(
            web::resource("/poster")
                .route(web::post().to(handlers::compose_poster))
                .default_service(web::route().to(handlers::method_not_allowed)),
        );
}
