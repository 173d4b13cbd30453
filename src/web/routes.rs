//! REST API routes for the web server
//!
//! Handlers validate input, store uploads, run the converter when needed and
//! call through to the print service. Printer and job state is never cached.

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::ApiError;
use crate::config::Config;
use crate::convert::{DocumentConverter, LibreOfficeConverter};
use crate::printing::{
    quality_label, CupsClient, JobState, PageRange, PrintError, PrintOptions, PrintService,
};
use crate::storage::{extension_of, FileStore, UploadRecord};

const DEFAULT_PAPER_SIZE: &str = "A4";
const DEFAULT_COLOR_MODE: &str = "color";

const CUPS_UNAVAILABLE: &str = "Could not connect to CUPS printing service.";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: FileStore,
    pub converter: Arc<dyn DocumentConverter>,
    pub print_service: Arc<dyn PrintService>,
    pub version: String,
}

impl AppState {
    pub fn new(
        config: Config,
        converter: Arc<dyn DocumentConverter>,
        print_service: Arc<dyn PrintService>,
    ) -> Self {
        let store = FileStore::new(
            &config.storage.upload_dir,
            &config.storage.convert_dir,
            &config.storage.index_dir,
        );
        Self {
            config: Arc::new(config),
            store,
            converter,
            print_service,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// State backed by LibreOffice and the configured CUPS server
    pub fn from_config(config: Config) -> Result<Self, PrintError> {
        let converter = Arc::new(LibreOfficeConverter::from_config(&config.converter));
        let print_service = Arc::new(CupsClient::from_config(&config.printing)?);
        Ok(Self::new(config, converter, print_service))
    }
}

/// Build the API router
pub fn api_routes(config: &Config) -> Router<Arc<AppState>> {
    Router::new()
        .route("/printers", get(list_printers))
        .route("/printers/{name}/options", get(printer_options))
        .route("/print", post(print_document))
        .route("/preview", post(preview_document))
        .route("/jobs/{id}", get(job_status))
        .route("/files", get(list_files))
        .route("/files/{id}", get(file_info))
        .route("/health", get(health_check))
        .nest_service("/uploads", ServeDir::new(&config.storage.upload_dir))
        .nest_service("/converted", ServeDir::new(&config.storage.convert_dir))
}

// ============ Printers ============

/// List printer names
///
/// When CUPS is unreachable the configured placeholder printers are returned
/// instead of an error, unless that list is empty.
async fn list_printers(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    match state.print_service.printers().await {
        Ok(printers) => Ok(Json(printers.into_keys().collect())),
        Err(e) if e.is_unavailable() => {
            let fallback = &state.config.printing.fallback_printers;
            if fallback.is_empty() {
                return Err(ApiError::print_service(e, CUPS_UNAVAILABLE, ""));
            }
            warn!("CUPS connection failed ({}). Returning placeholder printer list.", e);
            Ok(Json(fallback.clone()))
        }
        Err(e) => Err(ApiError::print_service(
            e,
            CUPS_UNAVAILABLE,
            "An unexpected error occurred while fetching printers.",
        )),
    }
}

/// Printer capabilities offered to the frontend
#[derive(Debug, Serialize)]
pub struct PrinterOptionsResponse {
    pub printer: String,
    pub media: Vec<String>,
    pub quality: Vec<String>,
    pub color_modes: Vec<String>,
}

async fn printer_options(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<PrinterOptionsResponse>, ApiError> {
    const OTHER: &str = "An unexpected error occurred while fetching printer options.";

    let printers = state
        .print_service
        .printers()
        .await
        .map_err(|e| ApiError::print_service(e, CUPS_UNAVAILABLE, OTHER))?;
    if !printers.contains_key(&name) {
        return Err(ApiError::NotFound(format!("Printer '{}' not found.", name)));
    }

    let attrs = state
        .print_service
        .printer_attributes(&name)
        .await
        .map_err(|e| ApiError::print_service(e, CUPS_UNAVAILABLE, OTHER))?;

    Ok(Json(PrinterOptionsResponse {
        printer: name,
        media: attrs.media_supported,
        quality: attrs
            .quality_supported
            .iter()
            .map(|q| quality_label(*q).to_string())
            .collect(),
        color_modes: attrs.color_modes_supported,
    }))
}

// ============ Uploads ============

/// File part of a multipart upload
struct FilePart {
    filename: String,
    data: Bytes,
}

/// Parsed multipart form
#[derive(Default)]
struct UploadForm {
    file: Option<FilePart>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read file: {}", e)))?;
                form.file = Some(FilePart { filename, data });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Invalid field '{}': {}", name, e)))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// Non-empty, trimmed form field
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// The file part, checked for presence and a non-empty name
    fn file(&self) -> Result<&FilePart, ApiError> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| ApiError::validation("No file part"))?;
        if file.filename.is_empty() {
            return Err(ApiError::validation("No selected file"));
        }
        Ok(file)
    }
}

/// Extension of an allowed filename, lowercased
fn allowed_extension(config: &Config, filename: &str) -> Result<String, ApiError> {
    extension_of(filename)
        .filter(|ext| config.is_extension_allowed(ext))
        .ok_or_else(|| ApiError::validation("File type not allowed"))
}

fn parse_copies(value: Option<&str>) -> Result<u32, ApiError> {
    match value {
        None => Ok(1),
        Some(v) => v
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ApiError::validation(format!("Invalid number of copies: '{}'", v))),
    }
}

// ============ Print ============

#[derive(Debug, Serialize)]
struct PrintResponse {
    status: &'static str,
    job_id: i32,
    upload_id: Uuid,
}

/// Upload a document and submit it to a printer
async fn print_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<PrintResponse>, ApiError> {
    let form = UploadForm::read(multipart).await?;

    let file = form.file()?;
    let printer = form
        .field("printer")
        .ok_or_else(|| ApiError::validation("No printer selected"))?
        .to_string();
    let ext = allowed_extension(&state.config, &file.filename)?;

    let options = PrintOptions {
        copies: parse_copies(form.field("copies"))?,
        media: Some(form.field("paper_size").unwrap_or(DEFAULT_PAPER_SIZE).to_string()),
        color_mode: Some(form.field("color_mode").unwrap_or(DEFAULT_COLOR_MODE).to_string()),
        page_ranges: match form.field("page_range") {
            Some(text) => {
                PageRange::parse_list(text).map_err(|e| ApiError::validation(e.to_string()))?
            }
            None => Vec::new(),
        },
    };

    let record = state.store.save_upload(&file.filename, &ext, &file.data).await?;

    let file_to_print = if record.is_office_document() {
        convert(&state, &record, "Failed to convert document for printing.").await?;
        state.store.converted_path(&record)
    } else {
        state.store.upload_path(&record)
    };

    const OTHER: &str = "An unexpected error occurred during printing.";
    let printers = state
        .print_service
        .printers()
        .await
        .map_err(|e| ApiError::print_service(e, CUPS_UNAVAILABLE, OTHER))?;
    if !printers.contains_key(&printer) {
        return Err(ApiError::NotFound(format!("Printer '{}' not found.", printer)));
    }

    let title = format!("WebApp Print - {}", record.original_name);
    let job_id = state
        .print_service
        .submit(&printer, &file_to_print, &title, &options)
        .await
        .map_err(|e| ApiError::print_service(e, CUPS_UNAVAILABLE, OTHER))?;

    info!(
        "Print job {} submitted: {} -> {} ({} copies)",
        job_id, record.original_name, printer, options.copies
    );
    Ok(Json(PrintResponse {
        status: "success",
        job_id,
        upload_id: record.id,
    }))
}

async fn convert(state: &AppState, record: &UploadRecord, failed_message: &str) -> Result<(), ApiError> {
    state
        .converter
        .convert_to_pdf(&state.store.upload_path(record), state.store.convert_dir())
        .await
        .map_err(|e| ApiError::conversion(e, failed_message))
}

// ============ Preview ============

#[derive(Debug, Serialize)]
struct PreviewResponse {
    preview_path: String,
}

/// Upload a document and return a URL path to a PDF rendition of it
async fn preview_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<PreviewResponse>, ApiError> {
    let form = UploadForm::read(multipart).await?;

    let file = form.file()?;
    let ext = allowed_extension(&state.config, &file.filename)?;

    let record = state.store.save_upload(&file.filename, &ext, &file.data).await?;

    let preview_path = if record.is_office_document() {
        convert(&state, &record, "Failed to convert document to PDF.").await?;
        format!("/api/converted/{}", record.converted_name())
    } else if record.is_pdf() {
        format!("/api/uploads/{}", record.stored_name)
    } else {
        return Err(ApiError::validation(
            "Preview for this file type is not supported.",
        ));
    };

    Ok(Json(PreviewResponse { preview_path }))
}

// ============ Jobs ============

/// Job status as reported to the frontend
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: i32,
    pub status: JobState,
    pub reasons: String,
}

/// Look up a job in the spooler's full job list
///
/// A job missing from the list is reported as completed; CUPS drops finished
/// jobs from its history, so this cannot distinguish an unknown id.
async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<i32>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let jobs = state.print_service.jobs().await.map_err(|e| {
        ApiError::print_service(
            e,
            "Could not connect to CUPS to check job status.",
            "An unexpected error occurred while checking job status.",
        )
    })?;

    let response = match jobs.get(&job_id) {
        Some(job) => JobStatusResponse {
            job_id,
            status: job.state(),
            reasons: if job.state_reasons.is_empty() {
                "none".to_string()
            } else {
                job.state_reasons.join(",")
            },
        },
        None => JobStatusResponse {
            job_id,
            status: JobState::Completed,
            reasons: "not-found-in-active-jobs".to_string(),
        },
    };
    Ok(Json(response))
}

// ============ Files & health ============

async fn list_files(State(state): State<Arc<AppState>>) -> Json<Vec<UploadRecord>> {
    Json(state.store.list())
}

async fn file_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UploadRecord>, ApiError> {
    state
        .store
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Upload '{}' not found.", id)))
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub converter: String,
    pub converter_available: bool,
    pub print_service_reachable: bool,
    pub uploads: usize,
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let print_service_reachable = match state.print_service.printers().await {
        Ok(_) => true,
        Err(e) => !e.is_unavailable(),
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        converter: state.converter.program().to_string(),
        converter_available: state.converter.is_available(),
        print_service_reachable,
        uploads: state.store.len(),
    })
}
