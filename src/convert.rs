//! Document-to-PDF conversion through an external tool
//!
//! The default converter runs LibreOffice headless:
//!
//! ```text
//! libreoffice --headless --convert-to pdf --outdir <dir> <input>
//! ```
//!
//! Success is the tool's exit status alone; the output file is not checked.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use crate::config::ConverterSection;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// The conversion program is not installed or not on PATH
    #[error("Conversion tool '{program}' not found")]
    ToolMissing { program: String },
    /// The tool ran and reported failure for this input
    #[error("Conversion failed (exit code {code:?}): {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("Conversion timed out after {after:?}")]
    TimedOut { after: Duration },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can turn an office document into a PDF
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert `input` into `<output_dir>/<input stem>.pdf`
    async fn convert_to_pdf(&self, input: &Path, output_dir: &Path) -> Result<(), ConvertError>;

    /// Whether the underlying tool can be found
    fn is_available(&self) -> bool;

    /// Program name, for diagnostics
    fn program(&self) -> &str;
}

/// Converter backed by a LibreOffice (or compatible `soffice`) binary
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    program: String,
    timeout: Option<Duration>,
}

impl Default for LibreOfficeConverter {
    fn default() -> Self {
        Self::new("libreoffice")
    }
}

impl LibreOfficeConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    pub fn from_config(config: &ConverterSection) -> Self {
        Self::new(config.program.clone()).with_timeout(config.timeout_secs.map(Duration::from_secs))
    }

    /// Kill the tool if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments passed to the tool for one conversion
    pub fn command_args(input: &Path, output_dir: &Path) -> Vec<OsString> {
        vec![
            "--headless".into(),
            "--convert-to".into(),
            "pdf".into(),
            "--outdir".into(),
            output_dir.as_os_str().to_owned(),
            input.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl DocumentConverter for LibreOfficeConverter {
    async fn convert_to_pdf(&self, input: &Path, output_dir: &Path) -> Result<(), ConvertError> {
        tracing::info!(
            "Converting {} to PDF in {}",
            input.display(),
            output_dir.display()
        );

        let child = Command::new(&self.program)
            .args(Self::command_args(input, output_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConvertError::ToolMissing {
                        program: self.program.clone(),
                    }
                } else {
                    ConvertError::Io(e)
                }
            })?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ConvertError::TimedOut { after: limit })??,
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            return Err(ConvertError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }

    fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    fn program(&self) -> &str {
        &self.program
    }
}
