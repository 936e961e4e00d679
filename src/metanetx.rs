use std::fs::File;
use std::io::{self, Read, Write};
use std::time::Duration;

use camino::Utf8Path;
use md5::{Digest, Md5};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::PipelineError;
use crate::schema::SchemaKind;
use crate::table::{RawCell, RawTable};

const SOURCE: &str = "metanetx";
pub const DEFAULT_BASE_URL: &str = "https://www.metanetx.org/ftp";
pub const DEFAULT_VERSION: &str = "4.4";

/// Compression level for stored table artifacts.
const ZSTD_LEVEL: i32 = 22;

/// Client for versioned MetaNetX table files with checksum sidecars.
pub trait MetaNetXClient: Send + Sync {
    /// Fetch `table`, verify it, and store it compressed at `destination`.
    fn fetch(&self, table: &str, destination: &Utf8Path) -> Result<(), PipelineError>;
    fn table_url(&self, table: &str) -> String;
}

#[derive(Clone)]
pub struct MetaNetXHttpClient {
    client: Client,
    base_url: String,
    version: String,
}

impl MetaNetXHttpClient {
    pub fn new(base_url: &str, version: &str) -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("opentecr-pipeline/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PipelineError::Config(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| PipelineError::Transport {
                source_name: SOURCE.to_string(),
                detail: err.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            version: version.to_string(),
        })
    }

    fn checksum_url(&self, table: &str) -> String {
        format!("{}.md5", self.table_url(table))
    }

    /// Fetch and parse the checksum sidecar before the main download.
    fn fetch_checksum(&self, table: &str) -> Result<String, PipelineError> {
        let response = self
            .client
            .get(self.checksum_url(table))
            .send()
            .map_err(|err| PipelineError::Transport {
                source_name: SOURCE.to_string(),
                detail: err.to_string(),
            })?;
        let response = Self::handle_status(response)?;
        let body = response.text().map_err(|err| PipelineError::Transport {
            source_name: SOURCE.to_string(),
            detail: err.to_string(),
        })?;
        parse_checksum_line(&body, table)
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
            .unwrap_or_else(|_| "MetaNetX request failed".to_string());
        Err(PipelineError::Status {
            source_name: SOURCE.to_string(),
            status,
            message,
        })
    }
}

impl MetaNetXClient for MetaNetXHttpClient {
    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.version, table)
    }

    fn fetch(&self, table: &str, destination: &Utf8Path) -> Result<(), PipelineError> {
        let expected_md5 = self.fetch_checksum(table)?;

        let response = self
            .client
            .get(self.table_url(table))
            .send()
            .map_err(|err| PipelineError::Transport {
                source_name: SOURCE.to_string(),
                detail: err.to_string(),
            })?;
        let mut response = Self::handle_status(response)?;
        let declared_len = response.content_length();
        store_verified(&mut response, declared_len, &expected_md5, destination)?;
        Ok(())
    }
}

/// Parse a `<hex checksum> <filename>` sidecar, expecting a single pair.
fn parse_checksum_line(body: &str, table: &str) -> Result<String, PipelineError> {
    let mut fields = body.lines().next().unwrap_or("").split_whitespace();
    let checksum = fields.next().ok_or_else(|| PipelineError::MalformedChecksum {
        table: table.to_string(),
        detail: "no checksum entry found".to_string(),
    })?;
    let filename = fields.next().ok_or_else(|| PipelineError::MalformedChecksum {
        table: table.to_string(),
        detail: "entry is missing the filename".to_string(),
    })?;
    if filename != table {
        return Err(PipelineError::MalformedChecksum {
            table: table.to_string(),
            detail: format!("sidecar names {filename}, not the expected table"),
        });
    }
    Ok(checksum.to_ascii_lowercase())
}

/// Stream `reader` into a zstd-compressed file at `destination`, verifying the
/// byte count against `declared_len` and the MD5 digest against
/// `expected_md5`.
///
/// The destination is only created after both checks pass; on any failure the
/// partially written temp file is discarded and the destination path is left
/// untouched.
pub fn store_verified(
    reader: &mut dyn Read,
    declared_len: Option<u64>,
    expected_md5: &str,
    destination: &Utf8Path,
) -> Result<u64, PipelineError> {
    let parent = destination
        .parent()
        .ok_or_else(|| PipelineError::Filesystem("invalid destination path".to_string()))?;
    std::fs::create_dir_all(parent.as_std_path())
        .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix("mnx-table")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| PipelineError::Filesystem(err.to_string()))?;

    let mut encoder = zstd::stream::write::Encoder::new(temp, ZSTD_LEVEL)
        .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
    encoder
        .include_checksum(true)
        .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
    encoder
        .set_pledged_src_size(declared_len)
        .map_err(|err| PipelineError::Filesystem(err.to_string()))?;

    let mut hasher = Md5::new();
    let mut total: u64 = 0;
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer).map_err(|err| PipelineError::Transport {
            source_name: SOURCE.to_string(),
            detail: err.to_string(),
        })?;
        if read == 0 {
            break;
        }
        total += read as u64;
        hasher.update(&buffer[..read]);
        encoder
            .write_all(&buffer[..read])
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
    }

    if let Some(expected) = declared_len {
        if total != expected {
            return Err(PipelineError::SizeMismatch {
                actual: total,
                expected,
            });
        }
    }
    let temp = encoder
        .finish()
        .map_err(|err| PipelineError::Filesystem(err.to_string()))?;

    let actual = hex::encode(hasher.finalize());
    if actual != expected_md5 {
        return Err(PipelineError::ChecksumMismatch {
            actual,
            expected: expected_md5.to_string(),
        });
    }

    temp.persist(destination.as_std_path())
        .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
    Ok(total)
}

/// Decompress and parse a stored table into raw rows, with column names
/// assigned positionally from the schema.
pub fn read_table(path: &Utf8Path, kind: SchemaKind) -> Result<RawTable, PipelineError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| PipelineError::Filesystem(format!("open {path}: {err}")))?;
    let decoder = zstd::stream::read::Decoder::new(file)
        .map_err(|err| PipelineError::Parse(format!("zstd frame {path}: {err}")))?;
    read_tsv(decoder, kind)
}

/// Parse headerless tab-separated rows; `#`-prefixed lines are comments.
pub fn read_tsv<R: Read>(reader: R, kind: SchemaKind) -> Result<RawTable, PipelineError> {
    let schema = kind.schema();
    let mut tsv = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in tsv.records() {
        let record = record.map_err(|err| PipelineError::Parse(format!("tsv record: {err}")))?;
        if record.len() > schema.columns.len() {
            return Err(PipelineError::ColumnCount {
                schema: schema.name.to_string(),
                expected: schema.columns.len(),
                actual: record.len(),
            });
        }
        let mut cells: Vec<RawCell> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    RawCell::Null
                } else {
                    RawCell::Text(field.to_string())
                }
            })
            .collect();
        // Trailing empty columns may be absent from the line entirely.
        cells.resize(schema.columns.len(), RawCell::Null);
        rows.push(cells);
    }

    Ok(RawTable {
        headers: schema
            .columns
            .iter()
            .map(|spec| spec.name.to_string())
            .collect(),
        rows,
    })
}
