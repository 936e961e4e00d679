use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Text,
    Integer,
    Float,
    Boolean,
}

/// How a schema treats source columns it does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrictMode {
    /// Unexpected columns are dropped before validation.
    Filter,
    /// The source must supply exactly the declared columns.
    Reject,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub alias: Option<&'static str>,
    pub ty: SemanticType,
    pub nullable: bool,
    pub coerce: bool,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, ty: SemanticType) -> Self {
        Self {
            name,
            alias: None,
            ty,
            nullable: false,
            coerce: false,
        }
    }

    pub const fn aliased(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn coerced(mut self) -> Self {
        self.coerce = true;
        self
    }

    /// The column header expected in the source file.
    pub fn source_name(&self) -> &'static str {
        self.alias.unwrap_or(self.name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub name: &'static str,
    pub strict: StrictMode,
    pub columns: &'static [ColumnSpec],
    /// Canonical column names forming a composite unique key, if any.
    pub unique: &'static [&'static str],
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns.iter().find(|spec| spec.name == name)
    }
}

const OPENTECR_KEY: &[&str] = &["part", "page", "column", "table_index"];

static OPENTECR_METADATA: TableSchema = TableSchema {
    name: "OpenTECRTableMetadata",
    strict: StrictMode::Filter,
    unique: OPENTECR_KEY,
    columns: &[
        ColumnSpec::new("part", SemanticType::Integer),
        ColumnSpec::new("page", SemanticType::Integer),
        ColumnSpec::new("column", SemanticType::Integer).aliased("col l/r"),
        ColumnSpec::new("table_index", SemanticType::Integer).aliased("table from top"),
        ColumnSpec::new("reaction", SemanticType::Text),
        ColumnSpec::new("reference_code", SemanticType::Text),
        ColumnSpec::new("secondary_comment", SemanticType::Text)
            .aliased("curator comment")
            .nullable()
            .coerced(),
        ColumnSpec::new("method", SemanticType::Text).nullable(),
        ColumnSpec::new("buffer", SemanticType::Text).nullable(),
    ],
};

static OPENTECR_COMMENT: TableSchema = TableSchema {
    name: "OpenTECRTableComment",
    strict: StrictMode::Filter,
    unique: OPENTECR_KEY,
    columns: &[
        ColumnSpec::new("part", SemanticType::Integer),
        ColumnSpec::new("page", SemanticType::Integer),
        ColumnSpec::new("column", SemanticType::Integer).aliased("col l/r"),
        ColumnSpec::new("table_index", SemanticType::Integer).aliased("table from top"),
        ColumnSpec::new("was_spellchecked", SemanticType::Integer)
            .aliased("manually spellchecked")
            .nullable()
            .coerced(),
        ColumnSpec::new("primary_comment", SemanticType::Text)
            .aliased("comment")
            .nullable(),
    ],
};

static OPENTECR_DATA: TableSchema = TableSchema {
    name: "OpenTECRData",
    strict: StrictMode::Filter,
    unique: &[],
    columns: &[
        ColumnSpec::new("part", SemanticType::Integer).nullable().coerced(),
        ColumnSpec::new("page", SemanticType::Integer).nullable().coerced(),
        ColumnSpec::new("column", SemanticType::Integer)
            .aliased("col l/r")
            .nullable()
            .coerced(),
        ColumnSpec::new("table_index", SemanticType::Integer)
            .aliased("table from top")
            .nullable()
            .coerced(),
        // Text on purpose: the sheet marks known-bad rows with the literal
        // values `duplicate` and `error`, which the cleaner removes later.
        ColumnSpec::new("entry_index", SemanticType::Text)
            .aliased("entry nr")
            .nullable()
            .coerced(),
        ColumnSpec::new("id", SemanticType::Text).nullable(),
        ColumnSpec::new("temperature", SemanticType::Float),
        ColumnSpec::new("ionic_strength", SemanticType::Float).nullable(),
        ColumnSpec::new("hydrogen_potential", SemanticType::Float)
            .aliased("p_h")
            .nullable(),
        ColumnSpec::new("magnesium_potential", SemanticType::Float)
            .aliased("p_mg")
            .nullable(),
        ColumnSpec::new("apparent_equilibrium", SemanticType::Float)
            .aliased("K_prime")
            .nullable(),
        ColumnSpec::new("additional_info", SemanticType::Text)
            .aliased("additional data")
            .nullable()
            .coerced(),
    ],
};

static OPENTECR_REFERENCE: TableSchema = TableSchema {
    name: "OpenTECRReference",
    strict: StrictMode::Filter,
    unique: &[],
    columns: &[
        ColumnSpec::new("reference_code", SemanticType::Text),
        ColumnSpec::new("pmid", SemanticType::Text).nullable().coerced(),
        ColumnSpec::new("doi", SemanticType::Text).nullable(),
    ],
};

static MNX_DEPRECATION: TableSchema = TableSchema {
    name: "MetaNetXDeprecation",
    strict: StrictMode::Reject,
    unique: &[],
    columns: &[
        ColumnSpec::new("deprecated_id", SemanticType::Text),
        ColumnSpec::new("replacement_id", SemanticType::Text),
        ColumnSpec::new("version", SemanticType::Text),
    ],
};

static MNX_CROSS_REFERENCE: TableSchema = TableSchema {
    name: "MetaNetXCrossReference",
    strict: StrictMode::Reject,
    unique: &[],
    columns: &[
        ColumnSpec::new("external_id", SemanticType::Text),
        ColumnSpec::new("mnx_id", SemanticType::Text),
        ColumnSpec::new("description", SemanticType::Text),
    ],
};

static MNX_CHEMICAL_PROPERTY: TableSchema = TableSchema {
    name: "MetaNetXChemicalProperty",
    strict: StrictMode::Reject,
    unique: &[],
    columns: &[
        ColumnSpec::new("mnx_id", SemanticType::Text),
        ColumnSpec::new("name", SemanticType::Text),
        ColumnSpec::new("reference", SemanticType::Text),
        ColumnSpec::new("formula", SemanticType::Text).nullable(),
        ColumnSpec::new("charge", SemanticType::Integer).nullable().coerced(),
        ColumnSpec::new("mass", SemanticType::Float).nullable().coerced(),
        ColumnSpec::new("inchi", SemanticType::Text).nullable(),
        ColumnSpec::new("inchi_key", SemanticType::Text).nullable(),
        ColumnSpec::new("smiles", SemanticType::Text).nullable(),
    ],
};

static MNX_STEREOCHEMISTRY: TableSchema = TableSchema {
    name: "MetaNetXStereochemistry",
    strict: StrictMode::Reject,
    unique: &[],
    columns: &[
        ColumnSpec::new("parent_id", SemanticType::Text),
        ColumnSpec::new("child_id", SemanticType::Text),
        ColumnSpec::new("relation", SemanticType::Text),
    ],
};

static MNX_COMPARTMENT_PROPERTY: TableSchema = TableSchema {
    name: "MetaNetXCompartmentProperty",
    strict: StrictMode::Reject,
    unique: &[],
    columns: &[
        ColumnSpec::new("mnx_id", SemanticType::Text),
        ColumnSpec::new("name", SemanticType::Text),
        ColumnSpec::new("reference", SemanticType::Text),
    ],
};

static MNX_REACTION_PROPERTY: TableSchema = TableSchema {
    name: "MetaNetXReactionProperty",
    strict: StrictMode::Reject,
    unique: &[],
    columns: &[
        ColumnSpec::new("mnx_id", SemanticType::Text),
        ColumnSpec::new("equation", SemanticType::Text),
        ColumnSpec::new("reference", SemanticType::Text),
        ColumnSpec::new("ec_number", SemanticType::Text).nullable(),
        ColumnSpec::new("is_balanced", SemanticType::Boolean).coerced(),
        ColumnSpec::new("is_transport", SemanticType::Boolean).coerced(),
    ],
};

/// Registry of every table kind the pipeline validates against.
///
/// Resolved once at configuration time; there is no dynamic schema lookup
/// at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaKind {
    OpenTecrMetadata,
    OpenTecrComment,
    OpenTecrData,
    OpenTecrReference,
    MnxDeprecation,
    MnxCrossReference,
    MnxChemicalProperty,
    MnxStereochemistry,
    MnxCompartmentProperty,
    MnxReactionProperty,
}

impl SchemaKind {
    pub fn schema(&self) -> &'static TableSchema {
        match self {
            SchemaKind::OpenTecrMetadata => &OPENTECR_METADATA,
            SchemaKind::OpenTecrComment => &OPENTECR_COMMENT,
            SchemaKind::OpenTecrData => &OPENTECR_DATA,
            SchemaKind::OpenTecrReference => &OPENTECR_REFERENCE,
            SchemaKind::MnxDeprecation => &MNX_DEPRECATION,
            SchemaKind::MnxCrossReference => &MNX_CROSS_REFERENCE,
            SchemaKind::MnxChemicalProperty => &MNX_CHEMICAL_PROPERTY,
            SchemaKind::MnxStereochemistry => &MNX_STEREOCHEMISTRY,
            SchemaKind::MnxCompartmentProperty => &MNX_COMPARTMENT_PROPERTY,
            SchemaKind::MnxReactionProperty => &MNX_REACTION_PROPERTY,
        }
    }

    pub fn name(&self) -> &'static str {
        self.schema().name
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SchemaKind {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "OpenTECRTableMetadata" => Ok(SchemaKind::OpenTecrMetadata),
            "OpenTECRTableComment" => Ok(SchemaKind::OpenTecrComment),
            "OpenTECRData" => Ok(SchemaKind::OpenTecrData),
            "OpenTECRReference" => Ok(SchemaKind::OpenTecrReference),
            "MetaNetXDeprecation" => Ok(SchemaKind::MnxDeprecation),
            "MetaNetXCrossReference" => Ok(SchemaKind::MnxCrossReference),
            "MetaNetXChemicalProperty" => Ok(SchemaKind::MnxChemicalProperty),
            "MetaNetXStereochemistry" => Ok(SchemaKind::MnxStereochemistry),
            "MetaNetXCompartmentProperty" => Ok(SchemaKind::MnxCompartmentProperty),
            "MetaNetXReactionProperty" => Ok(SchemaKind::MnxReactionProperty),
            other => Err(PipelineError::Config(format!(
                "unknown validation model: {other}"
            ))),
        }
    }
}
