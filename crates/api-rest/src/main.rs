//! PhoneVault REST API server binary.
//!
//! ## Purpose
//! Exposes the phone record storage service over HTTP: record reads,
//! multipart metadata + photo upserts, and photo retrieval.
//!
//! ## Environment Variables
//! - `PHONEVAULT_REST_ADDR`: server address (default: "0.0.0.0:3000")
//! - `PHONEVAULT_STORAGE_DIR`: storage base directory (default: "/phonevault_data")
//! - `PHONEVAULT_API_KEYS`: comma-separated pre-shared API keys

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path as AxumPath, State},
    http::header,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_rest::auth::{self, ApiKeys};
use api_rest::errors::ApiError;
use phonevault_core::{
    PhonePaths, PhoneRecordView, PhoneStorageService, PhotoRef, SledRecordStore, StorageConfig,
    UploadedPhoto,
};
use phonevault_types::{Currency, Finished, PhoneDetails, Services};

/// Multipart part carrying the JSON metadata object.
const INFO_PART: &str = "info";
/// Multipart part(s) carrying photo files.
const PHOTOS_PART: &str = "photos";

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_STORAGE_DIR: &str = "/phonevault_data";

/// Application state shared across REST API handlers.
#[derive(Clone)]
struct AppState {
    service: Arc<PhoneStorageService>,
}

#[derive(serde::Serialize, utoipa::ToSchema)]
struct HealthRes {
    ok: bool,
    message: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, get_record, upsert_record, get_photo),
    components(schemas(
        HealthRes,
        PhoneRecordView,
        PhotoRef,
        PhoneDetails,
        Services,
        Currency,
        Finished,
    ))
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("phonevault_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("PHONEVAULT_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into());
    let storage_dir =
        std::env::var("PHONEVAULT_STORAGE_DIR").unwrap_or_else(|_| DEFAULT_STORAGE_DIR.into());
    let api_keys =
        ApiKeys::from_env_value(&std::env::var("PHONEVAULT_API_KEYS").unwrap_or_default());

    if api_keys.is_empty() {
        tracing::warn!("no API keys configured; record reads/writes will be rejected");
    }
    tracing::info!(keys = api_keys.len(), "API key gate initialised");

    let config = StorageConfig::new(&storage_dir);
    config.initialise()?;
    let paths = PhonePaths::new(&config)?;
    let backend = Arc::new(SledRecordStore::open(&config.records_db_dir())?);
    let service = Arc::new(PhoneStorageService::new(paths, backend));

    tracing::info!("-- Starting PhoneVault REST API on {}", addr);

    let records = Router::new()
        .route("/records/:phone", get(get_record).post(upsert_record))
        .route("/records/:phone/photos/:file_name", get(get_photo))
        .route_layer(middleware::from_fn_with_state(
            api_keys.clone(),
            auth::require_api_key,
        ));

    let app = Router::new()
        .route("/health", get(health))
        .merge(records)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(AppState { service });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "PhoneVault is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/records/{phone}",
    params(("phone" = String, Path, description = "Raw phone number; normalized before lookup")),
    responses(
        (status = 200, description = "Merged record view", body = PhoneRecordView),
        (status = 400, description = "Invalid phone input"),
        (status = 401, description = "Missing or invalid API key")
    )
)]
async fn get_record(
    State(state): State<AppState>,
    AxumPath(phone): AxumPath<String>,
) -> Result<Json<PhoneRecordView>, ApiError> {
    let view = state.service.get(&phone)?;
    Ok(Json(view))
}

/// multipart/form-data:
/// - `info`: JSON string representing [`PhoneDetails`] (optional)
/// - `photos`: 0..N image files
#[utoipa::path(
    post,
    path = "/records/{phone}",
    params(("phone" = String, Path, description = "Raw phone number; normalized before upsert")),
    responses(
        (status = 200, description = "Merged record view after the upsert", body = PhoneRecordView),
        (status = 400, description = "Invalid phone input or malformed metadata"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 415, description = "A photo part is not an image")
    )
)]
async fn upsert_record(
    State(state): State<AppState>,
    AxumPath(phone): AxumPath<String>,
    mut multipart: Multipart,
) -> Result<Json<PhoneRecordView>, ApiError> {
    let mut info: Option<PhoneDetails> = None;
    let mut photos: Vec<UploadedPhoto> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(INFO_PART) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("unreadable info part: {e}")))?;
                let details: PhoneDetails = serde_json::from_str(&text)
                    .map_err(|e| ApiError::bad_request(format!("malformed info part: {e}")))?;
                details
                    .validate()
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                info = Some(details);
            }
            Some(PHOTOS_PART) => {
                let content_type = field.content_type().map(str::to_owned);
                let original_name = field.file_name().map(str::to_owned);
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("unreadable photo part: {e}")))?
                    .to_vec();
                photos.push(UploadedPhoto {
                    content,
                    content_type,
                    original_name,
                });
            }
            _ => {} // unknown parts are ignored
        }
    }

    let view = state.service.upsert(&phone, info.as_ref(), &photos)?;
    Ok(Json(view))
}

#[utoipa::path(
    get,
    path = "/records/{phone}/photos/{file_name}",
    params(
        ("phone" = String, Path, description = "Raw phone number"),
        ("file_name" = String, Path, description = "Stored photo filename")
    ),
    responses(
        (status = 200, description = "Photo bytes with a sniffed content type"),
        (status = 400, description = "Invalid phone input or file name"),
        (status = 404, description = "No such photo")
    )
)]
async fn get_photo(
    State(state): State<AppState>,
    AxumPath((phone, file_name)): AxumPath<(String, String)>,
) -> Result<Response, ApiError> {
    let path = state.service.resolve_photo(&phone, &file_name)?;

    let is_file = tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(ApiError::NotFound);
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::from(phonevault_core::StorageError::Io(e)))?;

    let content_type = infer::get(&bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
