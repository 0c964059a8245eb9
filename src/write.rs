use crate::{
    compute::{file_name, Group},
    data::{Column, InvoiceLine, Projection},
    schema::Schema,
};
use anyhow::Context;
use log::{error, info};
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

/// Basic CSV exporter for `InvoiceLine`s: a header row with the declared columns, then one
/// row per line. The header is written even when there are no lines.
pub(crate) fn write_lines<W: std::io::Write>(
    writer: W,
    columns: &[Column],
    lines: &[InvoiceLine],
) -> Result<(), anyhow::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(columns.iter().map(|column| column.header()))?;
    for line in lines {
        wtr.serialize(Projection { columns, line })?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_file(path: &Path, columns: &[Column], lines: &[InvoiceLine]) -> Result<(), anyhow::Error> {
    let file = File::create(path).with_context(|| format!("can't create {}", path.display()))?;
    write_lines(BufWriter::new(file), columns, lines)
        .with_context(|| format!("can't write {}", path.display()))?;
    info!("Created: {}", path.display());
    Ok(())
}

/// Files written for a grouped run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct WriteSummary {
    pub written: Vec<PathBuf>,
    pub failed: usize,
}

/// Writes one file per group in `dir`. Groups are independent: a group that can't be
/// written is logged and the others are still written.
pub(crate) fn write_groups(dir: &Path, schema: &Schema, groups: &[Group]) -> WriteSummary {
    let mut summary = WriteSummary::default();
    for group in groups {
        let path = dir.join(file_name(&group.label, &schema.extension));
        match write_file(&path, &schema.output, &group.lines) {
            Ok(()) => summary.written.push(path),
            Err(e) => {
                error!("Listing {:?} not written: {e:#}", group.label);
                summary.failed += 1;
            }
        }
    }
    summary
}

/// Writes every line to a single file. Unlike grouped output, a failure here is fatal.
pub(crate) fn write_single(
    path: &Path,
    schema: &Schema,
    lines: &[InvoiceLine],
) -> Result<(), anyhow::Error> {
    write_file(path, &schema.output, lines)
}
