use actix_web::http::header::LOCATION;
use actix_web::web::Data;
use actix_web::{Error, HttpRequest, HttpResponse};
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};

use crate::api::{BookDetails, BookDetailsPatch, BookId, DeleteAllBooksResponse, SearchQuery};
use crate::book_service::BookService;
use crate::error_response::service_error_response;

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn get_all_books(
    req: HttpRequest,
    book_service: Data<BookService>,
) -> Result<HttpResponse, Error> {
    Ok(match book_service.list_all().await {
        Ok(books) => HttpResponse::Ok().json(books),
        Err(err) => service_error_response(err, req.path()),
    })
}

#[api_v2_operation]
pub async fn add_book(
    req: HttpRequest,
    book_service: Data<BookService>,
    details: web::Json<BookDetails>,
) -> Result<HttpResponse, Error> {
    Ok(match book_service.create(details.into_inner()).await {
        Ok(book) => HttpResponse::Created()
            .append_header((LOCATION, format!("/api/books/{}", book.id)))
            .json(book),
        Err(err) => service_error_response(err, req.path()),
    })
}

#[api_v2_operation]
pub async fn delete_all_books(
    req: HttpRequest,
    book_service: Data<BookService>,
) -> Result<HttpResponse, Error> {
    Ok(match book_service.delete_all().await {
        Ok(deleted) => HttpResponse::Ok().json(DeleteAllBooksResponse { deleted }),
        Err(err) => service_error_response(err, req.path()),
    })
}

#[api_v2_operation]
pub async fn search_books(
    req: HttpRequest,
    book_service: Data<BookService>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, Error> {
    Ok(match book_service.search(query.into_inner()).await {
        Ok(books) => HttpResponse::Ok().json(books),
        Err(err) => service_error_response(err, req.path()),
    })
}

#[api_v2_operation]
pub async fn get_book(
    req: HttpRequest,
    book_service: Data<BookService>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    Ok(match book_service.get_by_id(book_id.into_inner()).await {
        Ok(book) => HttpResponse::Ok().json(book),
        Err(err) => service_error_response(err, req.path()),
    })
}

#[api_v2_operation]
pub async fn update_book(
    req: HttpRequest,
    book_service: Data<BookService>,
    book_id: web::Path<BookId>,
    patch: web::Json<BookDetailsPatch>,
) -> Result<HttpResponse, Error> {
    Ok(
        match book_service
            .update(book_id.into_inner(), patch.into_inner())
            .await
        {
            Ok(book) => HttpResponse::Ok().json(book),
            Err(err) => service_error_response(err, req.path()),
        },
    )
}

#[api_v2_operation]
pub async fn delete_book(
    req: HttpRequest,
    book_service: Data<BookService>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    Ok(match book_service.delete(book_id.into_inner()).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => service_error_response(err, req.path()),
    })
}
