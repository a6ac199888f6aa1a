use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use crate::{
    error::{AppError, AppResult},
    AppState,
};

// ── List ──────────────────────────────────────────────────────────────────────

/// `GET /products`: every product as an indented JSON array.
///
/// An encoding failure yields a bare 500 with no body.
pub async fn list_products(State(state): State<AppState>) -> Response {
    let products = state.store.get_all();

    match serde_json::to_vec_pretty(&products) {
        Ok(body) => {
            debug!(count = products.len(), "Listed products");
            (StatusCode::OK, body).into_response()
        }
        Err(err) => {
            error!(error = %err, "failed to encode product list");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ── Get by ID ─────────────────────────────────────────────────────────────────

/// `GET /products/:id`: one product as compact JSON.
///
/// The status line is committed together with the encoded body, so a
/// failure while the transport streams that body cannot be turned into a
/// different status; the connection is dropped instead.
///
/// An id that cannot be decoded (e.g. invalid UTF-8 after percent-decoding)
/// cannot name a product, so it is reported as not found.
pub async fn get_product(
    State(state): State<AppState>,
    uri: Uri,
    id: Result<Path<String>, PathRejection>,
) -> AppResult<Response> {
    let id = match id {
        Ok(Path(id)) => id,
        Err(rejection) => {
            debug!(path = %uri.path(), error = %rejection, "Undecodable product id");
            return Err(AppError::NotFound(uri.path().to_string()));
        }
    };
    let product = state.store.get_product(&id)?;
    let body = serde_json::to_vec(&product)?;

    debug!(id = %product.id, "Fetched product");

    Ok((StatusCode::OK, body).into_response())
}
