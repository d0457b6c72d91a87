use actix_cors::Cors;
use paperclip::actix::web;

use crate::error_response::{method_not_allowed, unknown_route};
use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/health")
            .route(web::get().to(handlers::health))
            .default_service(actix_web::web::to(method_not_allowed)),
    )
    .service(
        web::scope("/api/books")
            .service(
                web::resource("")
                    .route(web::get().to(handlers::get_all_books))
                    .route(web::post().to(handlers::add_book))
                    .route(web::delete().to(handlers::delete_all_books))
                    .default_service(actix_web::web::to(method_not_allowed)),
            )
            // registered before "/{book_id}" so that it is not parsed as an id
            .service(
                web::resource("/search")
                    .route(web::get().to(handlers::search_books))
                    .default_service(actix_web::web::to(method_not_allowed)),
            )
            .service(
                web::resource("/{book_id}")
                    .route(web::get().to(handlers::get_book))
                    .route(web::put().to(handlers::update_book))
                    .route(web::patch().to(handlers::update_book))
                    .route(web::delete().to(handlers::delete_book))
                    .default_service(actix_web::web::to(method_not_allowed)),
            )
            .default_service(actix_web::web::to(unknown_route)),
    );
}

/// Any origin may call the api
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}
