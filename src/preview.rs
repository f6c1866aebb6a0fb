use anyhow::{Context, Result};
use log::info;

use crate::{cli::PreviewArgs, open_reader, reader::TableReader, table::Table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let reader = open_reader(&args.input, args.meta.as_deref(), args.infer.to_options()?)?;
    let table = preview_table(&reader, args.rows)
        .with_context(|| format!("Reading rows from {:?}", args.input))?;
    print!("{}", table.render());
    info!("Displayed {} row(s) from {:?}", table.len(), args.input);
    Ok(())
}

/// The first `limit` data rows under their column names.
pub fn preview_table(reader: &TableReader, limit: usize) -> crate::error::Result<Table> {
    let mut table = Table::new(reader.metadata().column_names());
    for row in reader.rows()?.take(limit) {
        table.push_row(row?);
    }
    Ok(table)
}
