//! Print service client
//!
//! [`PrintService`] is the seam between the HTTP layer and the print spooler.
//! [`CupsClient`] implements it by speaking IPP to a CUPS server. Nothing is
//! cached: every call goes to CUPS.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

use crate::config::PrintingSection;
use crate::ipp::{
    group, operation, status, tag, IppAttribute, IppError, IppGroup, IppRequest, IppResponse,
    IppValue,
};

/// Printer attributes asked for when enumerating or querying printers
const PRINTER_ATTRIBUTES: [&str; 6] = [
    "printer-name",
    "printer-state",
    "printer-info",
    "media-supported",
    "print-quality-supported",
    "print-color-mode-supported",
];

const JOB_ATTRIBUTES: [&str; 3] = ["job-id", "job-state", "job-state-reasons"];

#[derive(Debug, Error)]
pub enum PrintError {
    /// The print service could not be reached at all
    #[error("Print service unavailable: {0}")]
    Unavailable(String),
    #[error("Printer '{0}' not found")]
    PrinterNotFound(String),
    /// The service answered with a non-success IPP status
    #[error("Print service rejected request (status {status:#06x}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Print service protocol error: {0}")]
    Protocol(String),
    /// The request could not be encoded, e.g. a value too long for the wire format
    #[error("Invalid print request: {0}")]
    InvalidRequest(String),
    #[error("Malformed IPP response: {0}")]
    Ipp(#[from] IppError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrintError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PrintError::Unavailable(_))
    }
}

/// Job lifecycle state as reported by the spooler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    Pending,
    PendingHeld,
    Processing,
    ProcessingStopped,
    Canceled,
    Aborted,
    Completed,
    Unknown,
}

impl JobState {
    /// Map an IPP `job-state` enum value
    pub fn from_code(code: i32) -> Self {
        match code {
            3 => JobState::Pending,
            4 => JobState::PendingHeld,
            5 => JobState::Processing,
            6 => JobState::ProcessingStopped,
            7 => JobState::Canceled,
            8 => JobState::Aborted,
            9 => JobState::Completed,
            _ => JobState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::PendingHeld => "pending-held",
            JobState::Processing => "processing",
            JobState::ProcessingStopped => "processing-stopped",
            JobState::Canceled => "canceled",
            JobState::Aborted => "aborted",
            JobState::Completed => "completed",
            JobState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label for an IPP `print-quality` value
pub fn quality_label(code: i32) -> &'static str {
    match code {
        3 => "draft",
        4 => "normal",
        5 => "high",
        _ => "unknown",
    }
}

/// One job from the spooler's job list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub id: i32,
    /// Raw `job-state`, if the spooler sent one
    pub state_code: Option<i32>,
    pub state_reasons: Vec<String>,
}

impl JobInfo {
    pub fn state(&self) -> JobState {
        self.state_code
            .map(JobState::from_code)
            .unwrap_or(JobState::Unknown)
    }

    fn from_group(g: &IppGroup) -> Option<Self> {
        let id = g.value("job-id").and_then(IppValue::as_int)?;
        Some(Self {
            id,
            state_code: g.value("job-state").and_then(IppValue::as_int),
            state_reasons: g.strings("job-state-reasons"),
        })
    }
}

/// Capabilities and state of one printer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrinterAttributes {
    pub state: Option<i32>,
    pub info: Option<String>,
    pub media_supported: Vec<String>,
    /// Raw `print-quality-supported` values (3 draft, 4 normal, 5 high)
    pub quality_supported: Vec<i32>,
    pub color_modes_supported: Vec<String>,
}

impl PrinterAttributes {
    fn from_group(g: &IppGroup) -> Self {
        Self {
            state: g.value("printer-state").and_then(IppValue::as_int),
            info: g
                .value("printer-info")
                .and_then(IppValue::as_str)
                .map(str::to_string),
            media_supported: g.strings("media-supported"),
            quality_supported: g.ints("print-quality-supported"),
            color_modes_supported: g.strings("print-color-mode-supported"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid page range '{0}'")]
pub struct PageRangeError(pub String);

/// Inclusive page range, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: i32,
    pub last: i32,
}

impl PageRange {
    /// Parse `"1-3,5,8-"`-style lists; an open end runs to the last page
    pub fn parse_list(text: &str) -> Result<Vec<PageRange>, PageRangeError> {
        let invalid = || PageRangeError(text.to_string());
        let mut ranges = Vec::new();
        for part in text.split(',').map(str::trim) {
            if part.is_empty() {
                return Err(invalid());
            }
            let (first, last) = match part.split_once('-') {
                Some((a, b)) => {
                    let first: i32 = a.trim().parse().map_err(|_| invalid())?;
                    let last: i32 = match b.trim() {
                        "" => i32::MAX,
                        b => b.parse().map_err(|_| invalid())?,
                    };
                    (first, last)
                }
                None => {
                    let page: i32 = part.parse().map_err(|_| invalid())?;
                    (page, page)
                }
            };
            if first < 1 || last < first {
                return Err(invalid());
            }
            ranges.push(PageRange { first, last });
        }
        Ok(ranges)
    }
}

/// Job template options sent with a print job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOptions {
    pub copies: u32,
    /// Paper size keyword, e.g. `A4` or `iso_a4_210x297mm`
    pub media: Option<String>,
    /// `color` or `monochrome`
    pub color_mode: Option<String>,
    pub page_ranges: Vec<PageRange>,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            copies: 1,
            media: None,
            color_mode: None,
            page_ranges: Vec::new(),
        }
    }
}

impl PrintOptions {
    fn job_attributes(&self) -> Vec<IppAttribute> {
        let mut attrs = vec![IppAttribute::new(
            "copies",
            IppValue::Integer(i32::try_from(self.copies).unwrap_or(i32::MAX)),
        )];
        if let Some(media) = &self.media {
            attrs.push(IppAttribute::new("media", IppValue::keyword(media.clone())));
        }
        if let Some(mode) = &self.color_mode {
            attrs.push(IppAttribute::new(
                "print-color-mode",
                IppValue::keyword(mode.clone()),
            ));
        }
        if !self.page_ranges.is_empty() {
            attrs.push(IppAttribute::multi(
                "page-ranges",
                self.page_ranges
                    .iter()
                    .map(|r| IppValue::RangeOfInteger(r.first, r.last))
                    .collect(),
            ));
        }
        attrs
    }
}

/// Operations the web layer needs from the print spooler
#[async_trait]
pub trait PrintService: Send + Sync {
    /// All printers by name
    async fn printers(&self) -> Result<BTreeMap<String, PrinterAttributes>, PrintError>;

    /// Attributes of one printer
    async fn printer_attributes(&self, name: &str) -> Result<PrinterAttributes, PrintError>;

    /// Submit a file and return the spooler's job id
    async fn submit(
        &self,
        printer: &str,
        file: &Path,
        title: &str,
        options: &PrintOptions,
    ) -> Result<i32, PrintError>;

    /// Every job the spooler knows about, for all users
    async fn jobs(&self) -> Result<BTreeMap<i32, JobInfo>, PrintError>;
}

/// IPP client for a CUPS server
#[derive(Debug)]
pub struct CupsClient {
    base: reqwest::Url,
    user: String,
    http: reqwest::Client,
    next_request_id: AtomicU32,
}

impl CupsClient {
    pub fn new(base_url: &str, user: impl Into<String>) -> Result<Self, PrintError> {
        let base = reqwest::Url::parse(base_url)
            .map_err(|e| PrintError::Protocol(format!("Invalid CUPS URL '{}': {}", base_url, e)))?;
        Ok(Self {
            base,
            user: user.into(),
            http: reqwest::Client::new(),
            next_request_id: AtomicU32::new(1),
        })
    }

    pub fn from_config(config: &PrintingSection) -> Result<Self, PrintError> {
        Self::new(&config.url, config.user.clone())
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// `printer-uri` value for a queue, or for the server when `name` is `None`
    fn printer_uri(&self, name: Option<&str>) -> String {
        let host = self.base.host_str().unwrap_or("localhost");
        let authority = match self.base.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        match name {
            Some(name) => format!("ipp://{}/printers/{}", authority, name),
            None => format!("ipp://{}/", authority),
        }
    }

    fn request(&self, op: u16) -> IppRequest {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        IppRequest::new(op, id).operation_attr(IppAttribute::new(
            "requesting-user-name",
            IppValue::name(self.user.clone()),
        ))
    }

    async fn send(&self, path: &str, request: IppRequest) -> Result<IppResponse, PrintError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| PrintError::Protocol(format!("Invalid request path '{}': {}", path, e)))?;
        tracing::debug!("IPP operation {:#06x} -> {}", request.operation, url);
        let body = request
            .encode()
            .map_err(|e| PrintError::InvalidRequest(e.to_string()))?;

        let response = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/ipp")
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let http_status = response.status();
        if !http_status.is_success() {
            return Err(PrintError::Protocol(format!("HTTP status {}", http_status)));
        }
        let body = response.bytes().await.map_err(transport_error)?;
        Ok(IppResponse::parse(&body)?)
    }
}

fn transport_error(e: reqwest::Error) -> PrintError {
    if e.is_connect() || e.is_timeout() {
        PrintError::Unavailable(e.to_string())
    } else {
        PrintError::Protocol(e.to_string())
    }
}

fn rejected(response: &IppResponse) -> PrintError {
    PrintError::Rejected {
        status: response.status,
        message: response
            .status_message()
            .unwrap_or("no status message")
            .to_string(),
    }
}

fn keywords(values: &[&str]) -> Vec<IppValue> {
    values.iter().map(|v| IppValue::keyword(*v)).collect()
}

#[async_trait]
impl PrintService for CupsClient {
    async fn printers(&self) -> Result<BTreeMap<String, PrinterAttributes>, PrintError> {
        let request = self.request(operation::CUPS_GET_PRINTERS).operation_attr(
            IppAttribute::multi("requested-attributes", keywords(&PRINTER_ATTRIBUTES)),
        );
        let response = self.send("/", request).await?;

        // CUPS answers not-found when no queues are configured
        if response.status == status::CLIENT_ERROR_NOT_FOUND {
            return Ok(BTreeMap::new());
        }
        if !response.is_success() {
            return Err(rejected(&response));
        }

        Ok(response
            .groups_of(group::PRINTER)
            .filter_map(|g| {
                let name = g.value("printer-name").and_then(IppValue::as_str)?;
                Some((name.to_string(), PrinterAttributes::from_group(g)))
            })
            .collect())
    }

    async fn printer_attributes(&self, name: &str) -> Result<PrinterAttributes, PrintError> {
        let request = self
            .request(operation::GET_PRINTER_ATTRIBUTES)
            .operation_attr(IppAttribute::new(
                "printer-uri",
                IppValue::uri(self.printer_uri(Some(name))),
            ))
            .operation_attr(IppAttribute::multi(
                "requested-attributes",
                keywords(&PRINTER_ATTRIBUTES),
            ));
        let response = self.send(&format!("/printers/{}", name), request).await?;

        if response.status == status::CLIENT_ERROR_NOT_FOUND {
            return Err(PrintError::PrinterNotFound(name.to_string()));
        }
        if !response.is_success() {
            return Err(rejected(&response));
        }

        let attrs = response
            .groups_of(group::PRINTER)
            .next()
            .map(PrinterAttributes::from_group)
            .ok_or_else(|| PrintError::Protocol("Response has no printer attributes".to_string()));
        attrs
    }

    async fn submit(
        &self,
        printer: &str,
        file: &Path,
        title: &str,
        options: &PrintOptions,
    ) -> Result<i32, PrintError> {
        let data = tokio::fs::read(file).await?;

        let mut request = self
            .request(operation::PRINT_JOB)
            .operation_attr(IppAttribute::new(
                "printer-uri",
                IppValue::uri(self.printer_uri(Some(printer))),
            ))
            .operation_attr(IppAttribute::new("job-name", IppValue::name(title)))
            .operation_attr(IppAttribute::new(
                "document-format",
                IppValue::Text {
                    tag: tag::MIME_MEDIA_TYPE,
                    value: "application/octet-stream".to_string(),
                },
            ));
        for attr in options.job_attributes() {
            request = request.job_attr(attr);
        }
        let request = request.with_data(data);

        let response = self.send(&format!("/printers/{}", printer), request).await?;
        if response.status == status::CLIENT_ERROR_NOT_FOUND {
            return Err(PrintError::PrinterNotFound(printer.to_string()));
        }
        if !response.is_success() {
            return Err(rejected(&response));
        }

        let job_id = response
            .groups_of(group::JOB)
            .find_map(|g| g.value("job-id").and_then(IppValue::as_int))
            .ok_or_else(|| PrintError::Protocol("Response has no job-id".to_string()))?;
        tracing::info!("Submitted job {} to printer {}", job_id, printer);
        Ok(job_id)
    }

    async fn jobs(&self) -> Result<BTreeMap<i32, JobInfo>, PrintError> {
        let request = self
            .request(operation::GET_JOBS)
            .operation_attr(IppAttribute::new(
                "printer-uri",
                IppValue::uri(self.printer_uri(None)),
            ))
            .operation_attr(IppAttribute::new("which-jobs", IppValue::keyword("all")))
            .operation_attr(IppAttribute::new("my-jobs", IppValue::Boolean(false)))
            .operation_attr(IppAttribute::multi(
                "requested-attributes",
                keywords(&JOB_ATTRIBUTES),
            ));
        let response = self.send("/", request).await?;

        if response.status == status::CLIENT_ERROR_NOT_FOUND {
            return Ok(BTreeMap::new());
        }
        if !response.is_success() {
            return Err(rejected(&response));
        }

        Ok(response
            .groups_of(group::JOB)
            .filter_map(JobInfo::from_group)
            .map(|job| (job.id, job))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipp::tests::encode_response;
    use axum::{body::Bytes, routing::post, Router};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_job_state_codes() {
        assert_eq!(JobState::from_code(3), JobState::Pending);
        assert_eq!(JobState::from_code(4), JobState::PendingHeld);
        assert_eq!(JobState::from_code(5), JobState::Processing);
        assert_eq!(JobState::from_code(6), JobState::ProcessingStopped);
        assert_eq!(JobState::from_code(7), JobState::Canceled);
        assert_eq!(JobState::from_code(8), JobState::Aborted);
        assert_eq!(JobState::from_code(9), JobState::Completed);
        assert_eq!(JobState::from_code(0), JobState::Unknown);
        assert_eq!(JobState::from_code(42), JobState::Unknown);
    }

    #[test]
    fn test_job_state_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&JobState::ProcessingStopped).unwrap(),
            "\"processing-stopped\""
        );
        assert_eq!(JobState::PendingHeld.to_string(), "pending-held");
    }

    #[test]
    fn test_job_without_state_is_unknown() {
        let job = JobInfo {
            id: 1,
            state_code: None,
            state_reasons: vec![],
        };
        assert_eq!(job.state(), JobState::Unknown);
    }

    #[test]
    fn test_quality_labels() {
        assert_eq!(quality_label(3), "draft");
        assert_eq!(quality_label(4), "normal");
        assert_eq!(quality_label(5), "high");
        assert_eq!(quality_label(6), "unknown");
    }

    #[test]
    fn test_page_range_parsing() {
        assert_eq!(
            PageRange::parse_list("1-3, 5,8-").unwrap(),
            vec![
                PageRange { first: 1, last: 3 },
                PageRange { first: 5, last: 5 },
                PageRange {
                    first: 8,
                    last: i32::MAX
                },
            ]
        );
        for bad in ["", "0", "3-1", "a-b", "1,,2", "-4"] {
            assert!(PageRange::parse_list(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_print_options_job_attributes() {
        let options = PrintOptions {
            copies: 2,
            media: Some("A4".to_string()),
            color_mode: Some("monochrome".to_string()),
            page_ranges: vec![PageRange { first: 1, last: 2 }],
        };
        let attrs = options.job_attributes();
        let names: Vec<_> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["copies", "media", "print-color-mode", "page-ranges"]);
        assert_eq!(attrs[0].values, vec![IppValue::Integer(2)]);

        let attrs = PrintOptions::default().job_attributes();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].values, vec![IppValue::Integer(1)]);
    }

    #[test]
    fn test_printer_uri() {
        let client = CupsClient::new("http://printhost:631", "tester").unwrap();
        assert_eq!(
            client.printer_uri(Some("Office")),
            "ipp://printhost:631/printers/Office"
        );
        assert_eq!(client.printer_uri(None), "ipp://printhost:631/");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            CupsClient::new("not a url", "u"),
            Err(PrintError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_rejects_oversized_title_before_sending() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.pdf");
        std::fs::write(&file, b"%PDF").unwrap();

        // port 1 is never contacted: encoding fails first
        let client = CupsClient::new("http://127.0.0.1:1", "tester").unwrap();
        let title = format!("WebApp Print - {}.pdf", "n".repeat(70_000));
        let err = client
            .submit("Office", &file, &title, &PrintOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PrintError::InvalidRequest(ref m) if m.contains("job-name")), "got {err}");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let client = CupsClient::new("http://127.0.0.1:1", "tester").unwrap();
        let err = client.printers().await.unwrap_err();
        assert!(err.is_unavailable(), "got {err}");
        let err = client.jobs().await.unwrap_err();
        assert!(err.is_unavailable(), "got {err}");
    }

    /// Serve canned IPP responses keyed by operation id, recording request bodies
    async fn fake_cups(
        respond: fn(u16) -> Vec<u8>,
    ) -> (String, Arc<Mutex<Vec<Vec<u8>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let handler = move |body: Bytes| {
            let log = log.clone();
            async move {
                let op = u16::from_be_bytes([body[2], body[3]]);
                log.lock().unwrap().push(body.to_vec());
                respond(op)
            }
        };
        let app = Router::new()
            .route("/", post(handler.clone()))
            .route("/printers/{name}", post(handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), seen)
    }

    fn printer_group(name: &str) -> IppGroup {
        let mut g = IppGroup::new(group::PRINTER);
        g.attributes
            .push(IppAttribute::new("printer-name", IppValue::name(name)));
        g.attributes
            .push(IppAttribute::new("printer-state", IppValue::Enum(3)));
        g.attributes.push(IppAttribute::multi(
            "media-supported",
            vec![IppValue::keyword("iso_a4_210x297mm"), IppValue::keyword("na_letter_8.5x11in")],
        ));
        g.attributes.push(IppAttribute::multi(
            "print-quality-supported",
            vec![IppValue::Enum(3), IppValue::Enum(4), IppValue::Enum(5)],
        ));
        g.attributes.push(IppAttribute::multi(
            "print-color-mode-supported",
            vec![IppValue::keyword("monochrome"), IppValue::keyword("color")],
        ));
        g
    }

    fn canned(op: u16) -> Vec<u8> {
        let ok = status::SUCCESSFUL_OK;
        match op {
            operation::CUPS_GET_PRINTERS => encode_response(
                ok,
                1,
                &[
                    IppGroup::new(group::OPERATION),
                    printer_group("Office"),
                    printer_group("Lab"),
                ],
            ),
            operation::GET_PRINTER_ATTRIBUTES => encode_response(
                ok,
                1,
                &[IppGroup::new(group::OPERATION), printer_group("Office")],
            ),
            operation::PRINT_JOB => {
                let mut job = IppGroup::new(group::JOB);
                job.attributes
                    .push(IppAttribute::new("job-id", IppValue::Integer(77)));
                encode_response(ok, 1, &[IppGroup::new(group::OPERATION), job])
            }
            operation::GET_JOBS => {
                let mut job = IppGroup::new(group::JOB);
                job.attributes
                    .push(IppAttribute::new("job-id", IppValue::Integer(77)));
                job.attributes
                    .push(IppAttribute::new("job-state", IppValue::Enum(5)));
                job.attributes.push(IppAttribute::new(
                    "job-state-reasons",
                    IppValue::keyword("job-printing"),
                ));
                encode_response(ok, 1, &[IppGroup::new(group::OPERATION), job])
            }
            _ => encode_response(0x0501, 1, &[IppGroup::new(group::OPERATION)]),
        }
    }

    fn empty_not_found(_op: u16) -> Vec<u8> {
        encode_response(
            status::CLIENT_ERROR_NOT_FOUND,
            1,
            &[IppGroup::new(group::OPERATION)],
        )
    }

    #[tokio::test]
    async fn test_printers_against_fake_cups() {
        let (url, seen) = fake_cups(canned).await;
        let client = CupsClient::new(&url, "tester").unwrap();

        let printers = client.printers().await.unwrap();
        assert_eq!(printers.keys().collect::<Vec<_>>(), vec!["Lab", "Office"]);
        let office = &printers["Office"];
        assert_eq!(office.state, Some(3));
        assert_eq!(office.quality_supported, vec![3, 4, 5]);
        assert_eq!(office.color_modes_supported, vec!["monochrome", "color"]);

        let bodies = seen.lock().unwrap();
        assert!(bodies[0].windows(6).any(|w| w == b"tester"));
    }

    #[tokio::test]
    async fn test_printer_attributes_against_fake_cups() {
        let (url, _) = fake_cups(canned).await;
        let client = CupsClient::new(&url, "tester").unwrap();
        let attrs = client.printer_attributes("Office").await.unwrap();
        assert_eq!(
            attrs.media_supported,
            vec!["iso_a4_210x297mm", "na_letter_8.5x11in"]
        );
    }

    #[tokio::test]
    async fn test_submit_against_fake_cups() {
        let (url, seen) = fake_cups(canned).await;
        let client = CupsClient::new(&url, "tester").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doc.pdf");
        std::fs::write(&file, b"%PDF-1.4 body").unwrap();

        let options = PrintOptions {
            copies: 3,
            ..PrintOptions::default()
        };
        let job_id = client
            .submit("Office", &file, "WebApp Print - doc.pdf", &options)
            .await
            .unwrap();
        assert_eq!(job_id, 77);

        let body = seen.lock().unwrap()[0].clone();
        assert!(body.ends_with(b"%PDF-1.4 body"));
        assert!(body.windows(6).any(|w| w == b"copies"));
        assert!(body
            .windows(b"WebApp Print - doc.pdf".len())
            .any(|w| w == b"WebApp Print - doc.pdf"));
    }

    #[tokio::test]
    async fn test_submit_missing_file_is_io_error() {
        let (url, _) = fake_cups(canned).await;
        let client = CupsClient::new(&url, "tester").unwrap();
        let err = client
            .submit("Office", Path::new("/nonexistent/x.pdf"), "t", &PrintOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PrintError::Io(_)));
    }

    #[tokio::test]
    async fn test_jobs_against_fake_cups() {
        let (url, _) = fake_cups(canned).await;
        let client = CupsClient::new(&url, "tester").unwrap();
        let jobs = client.jobs().await.unwrap();
        let job = &jobs[&77];
        assert_eq!(job.state(), JobState::Processing);
        assert_eq!(job.state_reasons, vec!["job-printing"]);
    }

    #[tokio::test]
    async fn test_not_found_statuses() {
        let (url, _) = fake_cups(empty_not_found).await;
        let client = CupsClient::new(&url, "tester").unwrap();

        assert!(client.printers().await.unwrap().is_empty());
        assert!(client.jobs().await.unwrap().is_empty());
        assert!(matches!(
            client.printer_attributes("Ghost").await,
            Err(PrintError::PrinterNotFound(ref n)) if n == "Ghost"
        ));
    }
}
