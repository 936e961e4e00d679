use serde::Serialize;

use crate::clean::{clean_comments, clean_data, clean_metadata, extract_references};
use crate::config::{MnxTableSpec, OpenTecrSheets, SheetSpec};
use crate::domain::{CompoundRow, DenormalizedRow, TableInfoRow, UniqueReaction};
use crate::error::PipelineError;
use crate::join::{denormalized, table_info};
use crate::metanetx::{self, MetaNetXClient};
use crate::reaction::{decompose_compounds, unique_reactions};
use crate::sheets::{SheetsClient, read_sheet};
use crate::store::Store;
use crate::table::ValidatedTable;
use crate::validate::{ValidationReport, validate};

/// Observability record for one materialized table.
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table: String,
    pub schema: &'static str,
    pub source_url: String,
    pub row_count: usize,
    pub column_count: usize,
    pub dropped_rows: usize,
    pub finished_at: String,
}

impl TableReport {
    fn new(table: String, source_url: String, report: &ValidationReport) -> Self {
        Self {
            table,
            schema: report.schema,
            source_url,
            row_count: report.row_count,
            column_count: report.column_count,
            dropped_rows: report.dropped_rows,
            finished_at: iso_timestamp(),
        }
    }
}

/// The silver and gold layers derived from the four validated sheets.
#[derive(Debug, Clone)]
pub struct OpenTecrDataset {
    pub table_info: Vec<TableInfoRow>,
    pub reactions: Vec<UniqueReaction>,
    pub compounds: Vec<CompoundRow>,
    pub denormalized: Vec<DenormalizedRow>,
}

/// Result of materializing the whole openTECR chain.
#[derive(Debug, Clone)]
pub struct OpenTecrRun {
    pub bronze: Vec<TableReport>,
    pub dataset: OpenTecrDataset,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenTecrSummary {
    pub bronze: Vec<TableReport>,
    pub table_info_rows: usize,
    pub unique_reactions: usize,
    pub compound_rows: usize,
    pub denormalized_rows: usize,
    pub finished_at: String,
}

impl OpenTecrRun {
    pub fn summary(&self) -> OpenTecrSummary {
        OpenTecrSummary {
            bronze: self.bronze.clone(),
            table_info_rows: self.dataset.table_info.len(),
            unique_reactions: self.dataset.reactions.len(),
            compound_rows: self.dataset.compounds.len(),
            denormalized_rows: self.dataset.denormalized.len(),
            finished_at: iso_timestamp(),
        }
    }
}

/// Derive the silver and gold layers from the validated bronze sheets.
///
/// Pure with respect to the filesystem and network; every join re-asserts
/// its cardinality invariant.
pub fn refine_opentecr(
    metadata: &ValidatedTable,
    comments: &ValidatedTable,
    data: &ValidatedTable,
    references: &ValidatedTable,
) -> Result<OpenTecrDataset, PipelineError> {
    let comments = clean_comments(comments)?;
    let metadata = clean_metadata(metadata)?;
    let data = clean_data(data)?;
    let references = extract_references(references)?;

    let table_info = table_info(&comments, &metadata, &references)?;
    let reactions = unique_reactions(&metadata);
    let compounds = decompose_compounds(&reactions);
    let denormalized = denormalized(&data, &table_info)?;

    Ok(OpenTecrDataset {
        table_info,
        reactions,
        compounds,
        denormalized,
    })
}

/// Runs the per-table pipelines against a local store.
///
/// Holds no state beyond its clients; each table flows fetch, parse,
/// validate, clean, join strictly in that order.
#[derive(Clone)]
pub struct Pipeline<S: SheetsClient, M: MetaNetXClient> {
    store: Store,
    sheets: S,
    metanetx: M,
}

impl<S: SheetsClient, M: MetaNetXClient> Pipeline<S, M> {
    pub fn new(store: Store, sheets: S, metanetx: M) -> Self {
        Self {
            store,
            sheets,
            metanetx,
        }
    }

    /// Fetch, parse, and validate one sheet export.
    pub fn bronze_sheet(
        &self,
        spec: &SheetSpec,
    ) -> Result<(ValidatedTable, TableReport), PipelineError> {
        self.store.ensure_base()?;
        let destination = self.store.sheet_path(&spec.gid);
        let source_url = self.sheets.export_url(&spec.gid);
        tracing::info!(gid = %spec.gid, url = %source_url, "fetching sheet");
        self.sheets.fetch(&spec.gid, &destination)?;

        let raw = read_sheet(&destination)?;
        let (table, report) = validate(&raw, spec.kind)?;
        tracing::info!(
            gid = %spec.gid,
            schema = report.schema,
            rows = report.row_count,
            dropped = report.dropped_rows,
            "validated sheet"
        );
        Ok((table, TableReport::new(spec.gid.clone(), source_url, &report)))
    }

    /// Fetch (verified), decompress, parse, and validate one MetaNetX table.
    pub fn bronze_mnx(
        &self,
        spec: &MnxTableSpec,
    ) -> Result<(ValidatedTable, TableReport), PipelineError> {
        self.store.ensure_base()?;
        let destination = self.store.mnx_table_path(&spec.table);
        let source_url = self.metanetx.table_url(&spec.table);
        tracing::info!(table = %spec.table, url = %source_url, "fetching table");
        self.metanetx.fetch(&spec.table, &destination)?;

        let raw = metanetx::read_table(&destination, spec.kind)?;
        let (table, report) = validate(&raw, spec.kind)?;
        tracing::info!(
            table = %spec.table,
            schema = report.schema,
            rows = report.row_count,
            dropped = report.dropped_rows,
            "validated table"
        );
        Ok((
            table,
            TableReport::new(spec.table.clone(), source_url, &report),
        ))
    }

    /// Materialize the full openTECR chain: four bronze sheets, the cleaned
    /// silver tables and their joins, and the gold denormalized dataset.
    pub fn materialize_opentecr(
        &self,
        sheets: &OpenTecrSheets,
    ) -> Result<OpenTecrRun, PipelineError> {
        let (metadata, metadata_report) = self.bronze_sheet(&sheets.metadata)?;
        let (comments, comments_report) = self.bronze_sheet(&sheets.comments)?;
        let (data, data_report) = self.bronze_sheet(&sheets.data)?;
        let (references, references_report) = self.bronze_sheet(&sheets.references)?;

        let dataset = refine_opentecr(&metadata, &comments, &data, &references)?;
        tracing::info!(
            denormalized = dataset.denormalized.len(),
            reactions = dataset.reactions.len(),
            compounds = dataset.compounds.len(),
            "materialized openTECR dataset"
        );

        Ok(OpenTecrRun {
            bronze: vec![
                metadata_report,
                comments_report,
                data_report,
                references_report,
            ],
            dataset,
        })
    }

    /// Materialize every configured MetaNetX table.
    pub fn materialize_metanetx(
        &self,
        tables: &[MnxTableSpec],
    ) -> Result<Vec<(ValidatedTable, TableReport)>, PipelineError> {
        tables.iter().map(|spec| self.bronze_mnx(spec)).collect()
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
