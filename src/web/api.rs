//! Defines the Axum API routes and handlers.

use crate::moonraker::UploadJob;
use crate::pool::PrinterPool;
use crate::web::models::{states_map, UploadResponse};
use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// G-code files run to tens of megabytes; axum's 2 MB default would reject
/// most real jobs.
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

pub struct AppStateInner {
    pub pool: PrinterPool,
}
pub type AppState = Arc<AppStateInner>;

/// For tests: create a router with a prebuilt pool
pub fn app_with_state(state: AppState) -> Router {
    create_router_with_state(state)
}

/// Creates the Axum router with all the endpoints.
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload_gcode))
        .route("/printer_states", get(printer_states))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Handler for `POST /upload`: route the inbound file to the first ready
/// printer. Any fault not covered by a dedicated response is converted to
/// structured 500 JSON here; a bad request must never crash the process or
/// leak a bare extractor rejection.
async fn upload_gcode(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return fault_response(&rejection),
    };
    match dispatch_upload(&state, multipart).await {
        Ok(response) => response,
        Err(err) => fault_response(&err),
    }
}

/// Convert any fault without a dedicated response into structured 500 JSON.
fn fault_response(err: &dyn std::fmt::Display) -> Response {
    tracing::error!("Upload request failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(UploadResponse::message(format!("Error: {err}"))),
    )
        .into_response()
}

/// One dispatch: receive the file, select a printer, transfer, resolve.
async fn dispatch_upload(
    state: &AppState,
    multipart: Multipart,
) -> Result<Response, MultipartError> {
    let Some(job) = read_file_part(multipart).await? else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(UploadResponse::message("No file was received.")),
        )
            .into_response());
    };

    let Some(printer) = state.pool.find_ready().await else {
        let states = state.pool.snapshot_states().await;
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(UploadResponse::no_printer_available(states)),
        )
            .into_response());
    };

    tracing::info!(
        "Uploading '{}' ({} bytes) to printer {}",
        job.filename,
        job.data.len(),
        printer
    );
    tracing::debug!(
        "Upload metadata: {}",
        serde_json::to_string(&job.upload_meta()).unwrap_or_default()
    );

    // The job is bound to the selected printer: a failed transfer is
    // reported against it, never redirected to the next ready printer.
    match state.pool.client().upload(&printer, &job).await {
        Ok(()) => Ok((StatusCode::OK, Json(UploadResponse::uploaded(printer))).into_response()),
        Err(err) => {
            tracing::error!("Error uploading file to printer {}: {}", printer, err);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UploadResponse::upload_failed(printer)),
            )
                .into_response())
        }
    }
}

/// Pull the `file` field out of the multipart form, if present.
async fn read_file_part(mut multipart: Multipart) -> Result<Option<UploadJob>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        // An absent filename is tolerated and becomes the empty string
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        return Ok(Some(UploadJob::new(filename, data.to_vec())));
    }
    Ok(None)
}

/// Handler for `GET /printer_states`: poll the whole pool for diagnostics.
async fn printer_states(State(state): State<AppState>) -> Json<BTreeMap<String, String>> {
    Json(states_map(state.pool.snapshot_states().await))
}

/// Handler for `GET /`: landing page listing the configured printers.
async fn index(State(state): State<AppState>) -> Html<String> {
    let mut items = String::new();
    for printer in state.pool.printers() {
        items.push_str(&format!("      <li>{printer}</li>\n"));
    }
    Html(format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><title>Printer Farm</title></head>\n\
         <body>\n\
           <h1>Printer Farm</h1>\n\
           <p>Upload a G-code file and it is sent to the first ready printer.</p>\n\
           <form action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">\n\
             <input type=\"file\" name=\"file\" accept=\".gcode\">\n\
             <button type=\"submit\">Print</button>\n\
           </form>\n\
           <h2>Configured printers</h2>\n\
           <ul>\n{items}    </ul>\n\
         </body>\n\
         </html>\n"
    ))
}
