use std::fs;

use opentecr_pipeline::config::ConfigLoader;
use opentecr_pipeline::schema::SchemaKind;

#[test]
fn resolve_without_file_uses_published_defaults() {
    let resolved = ConfigLoader::resolve(None).unwrap();
    assert_eq!(
        resolved.sheets_base_url,
        "https://docs.google.com/spreadsheets/d"
    );
    assert_eq!(resolved.mnx_base_url, "https://www.metanetx.org/ftp");
    assert_eq!(resolved.opentecr.metadata.kind, SchemaKind::OpenTecrMetadata);
    assert_eq!(resolved.opentecr.data.kind, SchemaKind::OpenTecrData);
}

#[test]
fn resolve_reads_overrides_from_json() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("pipeline.json");
    fs::write(
        &path,
        r#"{
            "base_path": "/tmp/tables",
            "sheets": { "data_gid": "42" },
            "metanetx": {
                "version": "4.5",
                "tables": [
                    { "table": "reac_prop.tsv", "model": "MetaNetXReactionProperty" }
                ]
            }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(
        resolved.base_path.as_ref().map(|path| path.as_str()),
        Some("/tmp/tables")
    );
    assert_eq!(resolved.opentecr.data.gid, "42");
    // Untouched sheets keep their defaults.
    assert_eq!(resolved.opentecr.references.gid, "81596307");
    assert_eq!(resolved.mnx_version, "4.5");
    assert_eq!(resolved.mnx_tables.len(), 1);
    assert_eq!(resolved.mnx_tables[0].kind, SchemaKind::MnxReactionProperty);
}

#[test]
fn missing_config_file_is_an_error() {
    assert!(ConfigLoader::resolve(Some("/nonexistent/pipeline.json")).is_err());
}
