use std::fmt;

use blake2::digest::consts::U20;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};

/// BLAKE2b truncated to 20 bytes, the digest used to key decomposed reactions.
type Blake2b160 = Blake2b<U20>;

/// Physical location of a table within a source publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableKey {
    pub part: i64,
    pub page: i64,
    pub column: i64,
    pub table_index: i64,
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.part, self.page, self.column, self.table_index
        )
    }
}

/// Stable content digest of a reaction equation string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReactionHash(String);

impl ReactionHash {
    pub fn of(equation: &str) -> Self {
        let digest = Blake2b160::digest(equation.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionSide {
    Reactant,
    Product,
}

impl ReactionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionSide::Reactant => "reactant",
            ReactionSide::Product => "product",
        }
    }
}

impl fmt::Display for ReactionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One compound on one side of one unique reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompoundRow {
    pub reaction_hash: ReactionHash,
    pub reaction_side: ReactionSide,
    pub compound: String,
}

/// A deduplicated reaction equation with its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniqueReaction {
    pub reaction: String,
    pub reaction_hash: ReactionHash,
}

/// Cleaned row of the table comments sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRow {
    pub key: TableKey,
    pub was_spellchecked: bool,
    pub primary_comment: Option<String>,
}

/// Cleaned row of the table metadata sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRow {
    pub key: TableKey,
    pub reaction: String,
    pub reference_code: String,
    pub secondary_comment: Option<String>,
    pub method: Option<String>,
    pub buffer: Option<String>,
}

/// Cleaned row of the measurement data sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataRow {
    pub key: TableKey,
    pub entry_index: i64,
    pub id: Option<String>,
    pub temperature: f64,
    pub ionic_strength: Option<f64>,
    pub hydrogen_potential: Option<f64>,
    pub magnesium_potential: Option<f64>,
    pub apparent_equilibrium: Option<f64>,
    pub additional_info: Option<String>,
}

/// Row of the references sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceRow {
    pub reference_code: String,
    pub pmid: Option<String>,
    pub doi: Option<String>,
}

/// Comments and metadata joined per table, with the publication reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfoRow {
    pub key: TableKey,
    pub was_spellchecked: bool,
    pub primary_comment: Option<String>,
    pub reaction: String,
    pub reference_code: String,
    pub secondary_comment: Option<String>,
    pub method: Option<String>,
    pub buffer: Option<String>,
    pub pmid: Option<String>,
    pub doi: Option<String>,
}

/// A measurement row combined with its table information.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenormalizedRow {
    #[serde(flatten)]
    pub data: DataRow,
    pub info: Option<TableInfoRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_hash_is_deterministic() {
        let a = ReactionHash::of("ATP + H2O = ADP + Phosphate");
        let b = ReactionHash::of("ATP + H2O = ADP + Phosphate");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 40);
    }

    #[test]
    fn reaction_hash_distinguishes_equations() {
        let a = ReactionHash::of("A = B");
        let b = ReactionHash::of("A = C");
        assert_ne!(a, b);
    }

    #[test]
    fn table_key_display() {
        let key = TableKey {
            part: 1,
            page: 72,
            column: 2,
            table_index: 1,
        };
        assert_eq!(key.to_string(), "1/72/2/1");
    }

    #[test]
    fn reactant_sorts_after_product_lexically() {
        assert!(ReactionSide::Reactant.as_str() > ReactionSide::Product.as_str());
    }
}
