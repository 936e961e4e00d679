use std::collections::HashSet;

use crate::domain::{CompoundRow, MetadataRow, ReactionHash, ReactionSide, UniqueReaction};

/// Trailing phase annotations removed from compound names, including the
/// `(1)` typo for `(l)` seen in the source tables.
const PHASE_SUFFIXES: [&str; 8] = [
    "(g)",
    "(aq)",
    "(l)",
    "(1)",
    "(sln)",
    "(ox)",
    "(red)",
    "(reduced)",
];

/// Macro-style Greek letter markers and their glyphs. The second omega
/// spelling contains a Greek omicron instead of the ASCII `o`.
const GREEK_MARKERS: [(&str, &str); 7] = [
    ("{\\alpha}", "α"),
    ("{\\beta}", "β"),
    ("{\\gamma}", "γ"),
    ("{\\Delta}", "Δ"),
    ("{\\omega}", "ω"),
    ("{\\οmega}", "ω"),
    ("{\\pm}", "±"),
];

/// Normalize one compound name: strip phase suffixes and rewrite macro-style
/// Greek letters to their glyphs.
pub fn transform_compound_name(name: &str) -> String {
    let mut result = name.trim();
    for suffix in PHASE_SUFFIXES {
        result = result.strip_suffix(suffix).unwrap_or(result);
    }

    let mut result = result.to_string();
    for (marker, glyph) in GREEK_MARKERS {
        result = result.replace(marker, glyph);
    }
    result.trim().to_string()
}

/// Deduplicate reaction strings in first-seen order and assign each a
/// content-derived hash used as the join key for its compounds.
pub fn unique_reactions(metadata: &[MetadataRow]) -> Vec<UniqueReaction> {
    let mut seen = HashSet::new();
    let mut reactions = Vec::new();
    for row in metadata {
        if seen.insert(row.reaction.clone()) {
            reactions.push(UniqueReaction {
                reaction_hash: ReactionHash::of(&row.reaction),
                reaction: row.reaction.clone(),
            });
        }
    }
    reactions
}

/// Explode reaction equations into one row per (reaction, side, compound).
///
/// The equation splits once on `=` into reactants and products; an equation
/// without `=` has no product side. Rows sort by hash and then side, both
/// descending, so reactant rows precede product rows for every reaction.
pub fn decompose_compounds(reactions: &[UniqueReaction]) -> Vec<CompoundRow> {
    let mut rows = Vec::new();
    for reaction in reactions {
        let (reactants, products) = match reaction.reaction.split_once('=') {
            Some((left, right)) => (left, Some(right)),
            None => (reaction.reaction.as_str(), None),
        };
        push_side(&mut rows, &reaction.reaction_hash, ReactionSide::Reactant, reactants);
        if let Some(products) = products {
            push_side(&mut rows, &reaction.reaction_hash, ReactionSide::Product, products);
        }
    }
    rows.sort_by(|a, b| {
        b.reaction_hash
            .cmp(&a.reaction_hash)
            .then_with(|| b.reaction_side.as_str().cmp(a.reaction_side.as_str()))
    });
    rows
}

fn push_side(rows: &mut Vec<CompoundRow>, hash: &ReactionHash, side: ReactionSide, tokens: &str) {
    for token in tokens.split(" + ") {
        rows.push(CompoundRow {
            reaction_hash: hash.clone(),
            reaction_side: side,
            compound: transform_compound_name(token),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TableKey;

    fn metadata(reaction: &str) -> MetadataRow {
        MetadataRow {
            key: TableKey {
                part: 1,
                page: 4,
                column: 1,
                table_index: 1,
            },
            reaction: reaction.to_string(),
            reference_code: "bur55".to_string(),
            secondary_comment: None,
            method: None,
            buffer: None,
        }
    }

    #[test]
    fn phase_suffixes_are_stripped() {
        assert_eq!(transform_compound_name("ATP(aq)"), "ATP");
        assert_eq!(transform_compound_name(" H2O (l) "), "H2O");
        assert_eq!(transform_compound_name("NAD(ox)"), "NAD");
        assert_eq!(transform_compound_name("glutathione(reduced)"), "glutathione");
        assert_eq!(transform_compound_name("ethanol(1)"), "ethanol");
    }

    #[test]
    fn greek_markers_become_glyphs() {
        assert_eq!(
            transform_compound_name("{\\alpha}-D-glucose"),
            "α-D-glucose"
        );
        assert_eq!(transform_compound_name("{\\beta}-lactose(aq)"), "β-lactose");
    }

    #[test]
    fn names_without_markers_pass_through() {
        assert_eq!(transform_compound_name("ATP"), "ATP");
    }

    #[test]
    fn reactions_deduplicate_in_first_seen_order() {
        let rows = vec![
            metadata("A + B = C"),
            metadata("D = E"),
            metadata("A + B = C"),
        ];
        let reactions = unique_reactions(&rows);
        assert_eq!(reactions.len(), 2);
        assert_eq!(reactions[0].reaction, "A + B = C");
        assert_eq!(reactions[0].reaction_hash, ReactionHash::of("A + B = C"));
    }

    #[test]
    fn decomposition_emits_reactants_before_products() {
        let reactions = unique_reactions(&[metadata("A + B = C")]);
        let compounds = decompose_compounds(&reactions);
        assert_eq!(compounds.len(), 3);
        assert_eq!(compounds[0].reaction_side, ReactionSide::Reactant);
        assert_eq!(compounds[0].compound, "A");
        assert_eq!(compounds[1].reaction_side, ReactionSide::Reactant);
        assert_eq!(compounds[1].compound, "B");
        assert_eq!(compounds[2].reaction_side, ReactionSide::Product);
        assert_eq!(compounds[2].compound, "C");
        assert!(
            compounds
                .iter()
                .all(|row| row.reaction_hash == reactions[0].reaction_hash)
        );
    }

    #[test]
    fn compounds_group_by_reaction_hash() {
        let reactions = unique_reactions(&[metadata("A = B"), metadata("C = D")]);
        let compounds = decompose_compounds(&reactions);
        assert_eq!(compounds.len(), 4);
        // Rows sort by hash descending, sides grouped within each hash.
        let first_hash = &compounds[0].reaction_hash;
        assert_eq!(&compounds[1].reaction_hash, first_hash);
        assert_ne!(&compounds[2].reaction_hash, first_hash);
        assert!(first_hash >= &compounds[2].reaction_hash);
    }

    #[test]
    fn equation_without_equals_has_no_products() {
        let reactions = unique_reactions(&[metadata("A + B")]);
        let compounds = decompose_compounds(&reactions);
        assert_eq!(compounds.len(), 2);
        assert!(
            compounds
                .iter()
                .all(|row| row.reaction_side == ReactionSide::Reactant)
        );
    }
}
