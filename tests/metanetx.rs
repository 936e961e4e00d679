use std::fs::File;
use std::io::Write;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};

use opentecr_pipeline::config::MnxTableSpec;
use opentecr_pipeline::error::PipelineError;
use opentecr_pipeline::metanetx::MetaNetXClient;
use opentecr_pipeline::pipeline::Pipeline;
use opentecr_pipeline::schema::SchemaKind;
use opentecr_pipeline::sheets::SheetsClient;
use opentecr_pipeline::store::Store;
use opentecr_pipeline::table::Value;

struct NopSheets;

impl SheetsClient for NopSheets {
    fn fetch(&self, _gid: &str, _destination: &Utf8Path) -> Result<(), PipelineError> {
        Err(PipelineError::Transport {
            source_name: "sheets".to_string(),
            detail: "sheets client not configured".to_string(),
        })
    }

    fn export_url(&self, gid: &str) -> String {
        format!("mock://sheets/{gid}")
    }
}

/// Serves a fixed TSV body as a verified, compressed artifact.
struct FixtureMetaNetX {
    body: &'static str,
}

impl MetaNetXClient for FixtureMetaNetX {
    fn fetch(&self, _table: &str, destination: &Utf8Path) -> Result<(), PipelineError> {
        let file = File::create(destination.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let mut encoder = zstd::stream::write::Encoder::new(file, 3)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        encoder
            .write_all(self.body.as_bytes())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        encoder
            .finish()
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        Ok(())
    }

    fn table_url(&self, table: &str) -> String {
        format!("mock://metanetx/{table}")
    }
}

struct FailingMetaNetX;

impl MetaNetXClient for FailingMetaNetX {
    fn fetch(&self, table: &str, _destination: &Utf8Path) -> Result<(), PipelineError> {
        Err(PipelineError::MalformedChecksum {
            table: table.to_string(),
            detail: "sidecar names chem_xref.tsv, not the expected table".to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("mock://metanetx/{table}")
    }
}

fn store(temp: &tempfile::TempDir) -> Store {
    Store::new_with_base(Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap())
}

#[test]
fn bronze_table_round_trips_through_the_store() {
    let temp = tempfile::tempdir().unwrap();
    let body = "\
#deprecated_id\treplacement_id\tversion\n\
MNXM01\tMNXM1\t4.4\n\
MNXM1000\tMNXM726\t4.4\n";
    let pipeline = Pipeline::new(store(&temp), NopSheets, FixtureMetaNetX { body });

    let spec = MnxTableSpec {
        table: "chem_depr.tsv".to_string(),
        kind: SchemaKind::MnxDeprecation,
    };
    let (table, report) = pipeline.bronze_mnx(&spec).unwrap();

    assert_eq!(report.row_count, 2);
    assert_eq!(report.column_count, 3);
    assert_eq!(report.dropped_rows, 0);
    assert_eq!(report.source_url, "mock://metanetx/chem_depr.tsv");
    assert_eq!(
        table.value(&table.rows[0], "replacement_id").unwrap(),
        &Value::Text("MNXM1".to_string())
    );
    assert!(temp.path().join("chem_depr.tsv.zst").exists());
}

#[test]
fn reaction_properties_coerce_flags_and_drop_bad_rows() {
    let temp = tempfile::tempdir().unwrap();
    let body = "\
MNXR94688\t1 MNXM1@MNXD1 = 1 MNXM1@MNXD2\tmnx:TRANSPORT\t\tTrue\tTrue\n\
MNXR96070\t1 MNXM10@MNXD1 + 1 MNXM3150@MNXD1 = 1 MNXM8@MNXD1\trhea:19985\t1.6.1.1\tnot-a-flag\tFalse\n";
    let pipeline = Pipeline::new(store(&temp), NopSheets, FixtureMetaNetX { body });

    let spec = MnxTableSpec {
        table: "reac_prop.tsv".to_string(),
        kind: SchemaKind::MnxReactionProperty,
    };
    let (table, report) = pipeline.bronze_mnx(&spec).unwrap();

    assert_eq!(report.row_count, 1);
    assert_eq!(report.dropped_rows, 1);
    assert_eq!(
        table.value(&table.rows[0], "is_balanced").unwrap(),
        &Value::Bool(true)
    );
    assert_eq!(table.value(&table.rows[0], "ec_number").unwrap(), &Value::Null);
}

#[test]
fn checksum_failures_abort_before_any_parsing() {
    let temp = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(store(&temp), NopSheets, FailingMetaNetX);

    let spec = MnxTableSpec {
        table: "chem_prop.tsv".to_string(),
        kind: SchemaKind::MnxChemicalProperty,
    };
    let err = pipeline.bronze_mnx(&spec).unwrap_err();
    assert_matches!(err, PipelineError::MalformedChecksum { .. });
    assert!(!temp.path().join("chem_prop.tsv.zst").exists());
}

#[test]
fn empty_table_body_is_not_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(store(&temp), NopSheets, FixtureMetaNetX { body: "" });

    let spec = MnxTableSpec {
        table: "comp_prop.tsv".to_string(),
        kind: SchemaKind::MnxCompartmentProperty,
    };
    let (table, report) = pipeline.bronze_mnx(&spec).unwrap();
    assert_eq!(table.row_count(), 0);
    assert_eq!(report.dropped_rows, 0);
}
