use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::schema::SchemaKind;
use crate::{metanetx, sheets};

/// On-disk configuration; every field is optional and falls back to the
/// published sources.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default)]
    pub sheets: Option<SheetsSection>,
    #[serde(default)]
    pub metanetx: Option<MetaNetXSection>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SheetsSection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default)]
    pub metadata_gid: Option<String>,
    #[serde(default)]
    pub comments_gid: Option<String>,
    #[serde(default)]
    pub data_gid: Option<String>,
    #[serde(default)]
    pub references_gid: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MetaNetXSection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tables: Option<Vec<TableEntry>>,
}

/// One MetaNetX table paired with the name of its validation model.
#[derive(Debug, Deserialize, Serialize)]
pub struct TableEntry {
    pub table: String,
    pub model: String,
}

/// A sheet GID paired with its resolved schema.
#[derive(Debug, Clone)]
pub struct SheetSpec {
    pub gid: String,
    pub kind: SchemaKind,
}

/// A MetaNetX table file paired with its resolved schema.
#[derive(Debug, Clone)]
pub struct MnxTableSpec {
    pub table: String,
    pub kind: SchemaKind,
}

#[derive(Debug, Clone)]
pub struct OpenTecrSheets {
    pub metadata: SheetSpec,
    pub comments: SheetSpec,
    pub data: SheetSpec,
    pub references: SheetSpec,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_path: Option<Utf8PathBuf>,
    pub sheets_base_url: String,
    pub spreadsheet_id: String,
    pub opentecr: OpenTecrSheets,
    pub mnx_base_url: String,
    pub mnx_version: String,
    pub mnx_tables: Vec<MnxTableSpec>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolve configuration, reading overrides from `path` when given.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, PipelineError> {
        let config = match path {
            Some(path) => {
                let content = fs::read_to_string(PathBuf::from(path)).map_err(|err| {
                    PipelineError::Config(format!("failed to read config {path}: {err}"))
                })?;
                serde_json::from_str(&content)
                    .map_err(|err| PipelineError::Config(err.to_string()))?
            }
            None => Config::default(),
        };
        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, PipelineError> {
        let sheets_section = config.sheets.unwrap_or_default();
        let mnx_section = config.metanetx.unwrap_or_default();

        let sheet = |gid: Option<String>, fallback: &str, kind: SchemaKind| SheetSpec {
            gid: gid.unwrap_or_else(|| fallback.to_string()),
            kind,
        };
        let opentecr = OpenTecrSheets {
            metadata: sheet(
                sheets_section.metadata_gid,
                "652907302",
                SchemaKind::OpenTecrMetadata,
            ),
            comments: sheet(
                sheets_section.comments_gid,
                "1475422539",
                SchemaKind::OpenTecrComment,
            ),
            data: sheet(sheets_section.data_gid, "2123069643", SchemaKind::OpenTecrData),
            references: sheet(
                sheets_section.references_gid,
                "81596307",
                SchemaKind::OpenTecrReference,
            ),
        };

        let mnx_tables = match mnx_section.tables {
            Some(entries) => entries
                .into_iter()
                .map(|entry| {
                    Ok(MnxTableSpec {
                        kind: entry.model.parse()?,
                        table: entry.table,
                    })
                })
                .collect::<Result<Vec<_>, PipelineError>>()?,
            None => default_mnx_tables(),
        };

        Ok(ResolvedConfig {
            base_path: config.base_path.map(Utf8PathBuf::from),
            sheets_base_url: sheets_section
                .base_url
                .unwrap_or_else(|| sheets::DEFAULT_BASE_URL.to_string()),
            spreadsheet_id: sheets_section
                .spreadsheet_id
                .unwrap_or_else(|| sheets::DEFAULT_SPREADSHEET_ID.to_string()),
            opentecr,
            mnx_base_url: mnx_section
                .base_url
                .unwrap_or_else(|| metanetx::DEFAULT_BASE_URL.to_string()),
            mnx_version: mnx_section
                .version
                .unwrap_or_else(|| metanetx::DEFAULT_VERSION.to_string()),
            mnx_tables,
        })
    }
}

pub fn default_mnx_tables() -> Vec<MnxTableSpec> {
    let spec = |table: &str, kind: SchemaKind| MnxTableSpec {
        table: table.to_string(),
        kind,
    };
    vec![
        spec("chem_depr.tsv", SchemaKind::MnxDeprecation),
        spec("chem_isom.tsv", SchemaKind::MnxStereochemistry),
        spec("chem_prop.tsv", SchemaKind::MnxChemicalProperty),
        spec("chem_xref.tsv", SchemaKind::MnxCrossReference),
        spec("comp_depr.tsv", SchemaKind::MnxDeprecation),
        spec("comp_prop.tsv", SchemaKind::MnxCompartmentProperty),
        spec("comp_xref.tsv", SchemaKind::MnxCrossReference),
        spec("reac_depr.tsv", SchemaKind::MnxDeprecation),
        spec("reac_prop.tsv", SchemaKind::MnxReactionProperty),
        spec("reac_xref.tsv", SchemaKind::MnxCrossReference),
    ]
}
