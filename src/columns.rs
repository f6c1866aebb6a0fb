//! Column listing for a metadata document.
//!
//! Renders each column definition as one table row: position, name, class,
//! value type, class payload (levels or the fixed value) and the missing-data
//! sentinel.

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::ColumnsArgs,
    column_class::{ColumnClass, ColumnDefinition},
    metadata::{Metadata, MetadataBuilder},
    table::Table,
};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let (metadata, source) = match (&args.meta, &args.input) {
        (Some(path), _) => (
            Metadata::load(path).with_context(|| format!("Loading metadata from {path:?}"))?,
            path,
        ),
        (None, Some(path)) => (
            MetadataBuilder::new(path)
                .options(args.infer.to_options()?)
                .build()
                .with_context(|| format!("Inferring metadata from {path:?}"))?,
            path,
        ),
        (None, None) => anyhow::bail!("either --meta or --input is required"),
    };

    if metadata.columns.is_empty() {
        info!("{:?} does not define any columns", source);
        return Ok(());
    }
    print!("{}", column_table(&metadata).render());
    info!("Listed {} column(s) from {:?}", metadata.columns.len(), source);
    Ok(())
}

pub fn column_table(metadata: &Metadata) -> Table {
    let mut table = Table::new(["#", "name", "class", "type", "detail", "missing"]);
    for (idx, column) in metadata.columns.iter().enumerate() {
        table.push_row(vec![
            (idx + 1).to_string(),
            column.name.clone(),
            column.class.to_string(),
            column.value_type.to_string(),
            detail(column),
            column.missing.clone().unwrap_or_default(),
        ]);
    }
    table
}

fn detail(column: &ColumnDefinition) -> String {
    match &column.class {
        ColumnClass::Fixed { value: Some(value) } => format!("value={value}"),
        ColumnClass::Binary { levels } | ColumnClass::Categorical { levels } => {
            levels.join("|")
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        column_class::{InferredColumn, ValueType},
        dialect::Dialect,
        header::HeaderSource,
        metadata::Layout,
    };

    #[test]
    fn table_lists_class_payloads() {
        let metadata = Metadata {
            layout: Layout {
                dialect: Dialect::default(),
                comment: "#".to_string(),
                header: HeaderSource::FirstRow,
                skip: 1,
            },
            columns: vec![
                ColumnDefinition::new(
                    "status",
                    InferredColumn {
                        class: ColumnClass::Binary {
                            levels: vec!["case".to_string(), "control".to_string()],
                        },
                        value_type: ValueType::Str,
                        missing: Some("NA".to_string()),
                    },
                ),
                ColumnDefinition::new(
                    "batch",
                    InferredColumn {
                        class: ColumnClass::Fixed {
                            value: Some("b1".to_string()),
                        },
                        value_type: ValueType::Str,
                        missing: None,
                    },
                ),
            ],
        };
        let rendered = column_table(&metadata).render();
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("case|control"));
        assert!(lines[2].ends_with("NA"));
        assert!(lines[3].contains("value=b1"));
    }
}
