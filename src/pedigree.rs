//! Pedigree layout detection.
//!
//! PLINK-style tables open with family id, sample id, father id, mother id
//! and sex. The check runs on inferred columns only; when it matches,
//! columns 0 to 2 are relabelled as family, sample and father ids unless
//! they are fixed. Mother id and sex take part in the check but keep their
//! classes.

use crate::column_class::{ColumnClass, ColumnDefinition};

const MIN_PEDIGREE_COLUMNS: usize = 6;

pub fn looks_like_pedigree(columns: &[ColumnDefinition]) -> bool {
    if columns.len() < MIN_PEDIGREE_COLUMNS {
        return false;
    }
    let id_like = |column: &ColumnDefinition| column.class == ColumnClass::Id;
    let parent_like = |column: &ColumnDefinition| {
        column.value_type == columns[1].value_type || column.class.is_fixed()
    };

    (id_like(&columns[0]) || id_like(&columns[1]))
        && parent_like(&columns[2])
        && parent_like(&columns[3])
        && matches!(
            columns[4].class,
            ColumnClass::Binary { .. } | ColumnClass::Fixed { .. }
        )
}

/// Relabels the leading columns when the table has a pedigree layout.
/// Returns whether the layout matched.
pub fn apply_pedigree_roles(columns: &mut [ColumnDefinition]) -> bool {
    if !looks_like_pedigree(columns) {
        return false;
    }
    let roles = [
        ColumnClass::FamilyId,
        ColumnClass::SampleId,
        ColumnClass::FatherId,
    ];
    for (column, role) in columns.iter_mut().zip(roles) {
        if !column.class.is_fixed() {
            column.class = role;
        }
    }
    true
}
