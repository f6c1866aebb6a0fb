//! Column class inference from aggregated value histograms.
//!
//! A column's class depends only on its [`ColumnHistogram`], never on row
//! order. Rules are evaluated in order and the first match wins:
//!
//! 1. Empty tokens never take part in the decision.
//! 2. A single kind is classified directly (`id`, `fixed`, `binary`,
//!    `descr`/`categorical` for strings, `numeric` for numbers).
//! 3. `int` mixed with `float` is promoted to `float` and classified as one.
//! 4. Any kind mixed with a single distinct string keeps the other kind and
//!    records that string as the column's missing-data code.
//!
//! Anything else is undecidable and yields `None`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    histogram::{ColumnHistogram, ValueCounts},
    raw_type::RawType,
};

/// Distinct/total ratio above which a string column is free text.
const DESCRIPTION_RATIO: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Int,
    Float,
    Bool,
    Str,
}

impl From<RawType> for ValueType {
    fn from(kind: RawType) -> Self {
        match kind {
            RawType::Int => ValueType::Int,
            RawType::Float => ValueType::Float,
            RawType::Bool => ValueType::Bool,
            RawType::Empty | RawType::Str => ValueType::Str,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Str => "str",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum ColumnClass {
    Id,
    Fixed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    Binary {
        levels: Vec<String>,
    },
    Categorical {
        levels: Vec<String>,
    },
    Descr,
    Numeric,
    FamilyId,
    SampleId,
    FatherId,
    MotherId,
    Sex,
}

impl ColumnClass {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnClass::Id => "id",
            ColumnClass::Fixed { .. } => "fixed",
            ColumnClass::Binary { .. } => "binary",
            ColumnClass::Categorical { .. } => "categorical",
            ColumnClass::Descr => "descr",
            ColumnClass::Numeric => "numeric",
            ColumnClass::FamilyId => "family_id",
            ColumnClass::SampleId => "sample_id",
            ColumnClass::FatherId => "father_id",
            ColumnClass::MotherId => "mother_id",
            ColumnClass::Sex => "sex",
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, ColumnClass::Fixed { .. })
    }

    pub fn levels(&self) -> Option<&[String]> {
        match self {
            ColumnClass::Binary { levels } | ColumnClass::Categorical { levels } => Some(levels),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Class, type and missing-data code inferred for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredColumn {
    pub class: ColumnClass,
    pub value_type: ValueType,
    pub missing: Option<String>,
}

impl InferredColumn {
    fn new(class: ColumnClass, value_type: ValueType) -> Self {
        Self {
            class,
            value_type,
            missing: None,
        }
    }

    /// Conservative stand-in for a column whose kinds cannot be reconciled.
    pub fn undecidable() -> Self {
        Self::new(ColumnClass::Descr, ValueType::Str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(flatten)]
    pub class: ColumnClass,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, inferred: InferredColumn) -> Self {
        Self {
            name: name.into(),
            class: inferred.class,
            value_type: inferred.value_type,
            missing: inferred.missing,
        }
    }
}

pub fn infer_column_class(histogram: &ColumnHistogram) -> Option<InferredColumn> {
    let buckets = histogram.non_empty();
    match buckets.len() {
        0 => Some(InferredColumn::new(
            ColumnClass::Fixed { value: None },
            ValueType::Str,
        )),
        1 => buckets
            .into_iter()
            .next()
            .map(|(kind, counts)| classify_bucket(kind, counts)),
        2 if buckets.contains_key(&RawType::Int) && buckets.contains_key(&RawType::Float) => {
            let mut merged = ValueCounts::new();
            for counts in buckets.values() {
                for (value, count) in counts.iter() {
                    *merged.entry(value.clone()).or_insert(0) += count;
                }
            }
            Some(classify_bucket(RawType::Float, &merged))
        }
        2 => {
            let sentinel = buckets
                .get(&RawType::Str)
                .filter(|counts| counts.len() == 1)
                .and_then(|counts| counts.keys().next())?;
            let (kind, counts) = buckets
                .iter()
                .find(|(kind, _)| **kind != RawType::Str)?;
            let mut inferred = classify_bucket(*kind, counts);
            inferred.missing = Some(sentinel.clone());
            Some(inferred)
        }
        _ => None,
    }
}

fn classify_bucket(kind: RawType, counts: &ValueCounts) -> InferredColumn {
    let n_vals: usize = counts.values().sum();
    let n_uniq = counts.len();
    let value_type = ValueType::from(kind);
    let levels = || counts.keys().cloned().collect::<Vec<_>>();

    let class = if n_vals == n_uniq && kind != RawType::Float {
        ColumnClass::Id
    } else if n_uniq == 1 {
        ColumnClass::Fixed {
            value: counts.keys().next().cloned(),
        }
    } else if n_uniq == 2 {
        ColumnClass::Binary { levels: levels() }
    } else {
        match kind {
            RawType::Int | RawType::Float => ColumnClass::Numeric,
            RawType::Str if n_uniq as f64 / n_vals as f64 > DESCRIPTION_RATIO => {
                ColumnClass::Descr
            }
            _ => ColumnClass::Categorical { levels: levels() },
        }
    };
    InferredColumn::new(class, value_type)
}
