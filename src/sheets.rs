use std::io;
use std::time::Duration;

use calamine::{Data, Reader, Xlsx, open_workbook};
use camino::Utf8Path;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::PipelineError;
use crate::table::{RawCell, RawTable};

const SOURCE: &str = "sheets";
pub const DEFAULT_BASE_URL: &str = "https://docs.google.com/spreadsheets/d";
pub const DEFAULT_SPREADSHEET_ID: &str = "1jLIxEXVzE2SAzIB0UxBfcFoHrzjzf9euB6ART2VDE8c";

/// Client for one spreadsheet's tabular sheet exports.
pub trait SheetsClient: Send + Sync {
    fn fetch(&self, gid: &str, destination: &Utf8Path) -> Result<(), PipelineError>;
    fn export_url(&self, gid: &str) -> String;
}

#[derive(Clone)]
pub struct SheetsHttpClient {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
}

impl SheetsHttpClient {
    pub fn new(base_url: &str, spreadsheet_id: &str) -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("opentecr-pipeline/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PipelineError::Config(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| PipelineError::Transport {
                source_name: SOURCE.to_string(),
                detail: err.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, PipelineError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "sheet export request failed".to_string());
        Err(PipelineError::Status {
            source_name: SOURCE.to_string(),
            status,
            message,
        })
    }
}

impl SheetsClient for SheetsHttpClient {
    fn export_url(&self, gid: &str) -> String {
        format!(
            "{}/{}/export?gid={}&format=xlsx",
            self.base_url, self.spreadsheet_id, gid
        )
    }

    fn fetch(&self, gid: &str, destination: &Utf8Path) -> Result<(), PipelineError> {
        let url = self.export_url(gid);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| PipelineError::Transport {
                source_name: SOURCE.to_string(),
                detail: err.to_string(),
            })?;
        let mut response = Self::handle_status(response)?;

        let parent = destination
            .parent()
            .ok_or_else(|| PipelineError::Filesystem("invalid destination path".to_string()))?;
        std::fs::create_dir_all(parent.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix("sheet")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        io::copy(&mut response, &mut temp).map_err(|err| PipelineError::Transport {
            source_name: SOURCE.to_string(),
            detail: err.to_string(),
        })?;
        temp.persist(destination.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// Parse the first worksheet of a stored sheet export.
pub fn read_sheet(path: &Utf8Path) -> Result<RawTable, PipelineError> {
    let mut workbook: Xlsx<_> = open_workbook(path.as_std_path())
        .map_err(|err| PipelineError::Parse(format!("spreadsheet {path}: {err}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PipelineError::Parse(format!("spreadsheet {path}: no worksheets")))?
        .map_err(|err| PipelineError::Parse(format!("spreadsheet {path}: {err}")))?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(row) => row.iter().map(|cell| cell.to_string().trim().to_string()).collect(),
        None => Vec::new(),
    };
    let rows = rows
        .map(|row| row.iter().map(to_raw_cell).collect())
        .collect();
    Ok(RawTable { headers, rows })
}

fn to_raw_cell(data: &Data) -> RawCell {
    match data {
        Data::Empty => RawCell::Null,
        Data::String(value) => RawCell::Text(value.clone()),
        Data::Float(value) => RawCell::Float(*value),
        Data::Int(value) => RawCell::Int(*value),
        Data::Bool(value) => RawCell::Bool(*value),
        Data::DateTime(value) => RawCell::Float(value.as_f64()),
        Data::DateTimeIso(value) | Data::DurationIso(value) => RawCell::Text(value.clone()),
        Data::Error(error) => RawCell::Text(format!("{error:?}")),
    }
}
