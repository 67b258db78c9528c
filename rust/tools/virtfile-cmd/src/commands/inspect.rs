//! Inspect command implementation

use anyhow::{Context, Result};
use serde_json::{Value, json};
use virtfile_parquet::{PageLayout, VirtualParquetFile};

use super::{SourceArgs, open_virtual_file};
use crate::utils::format_size;

pub fn run(source: SourceArgs) -> Result<()> {
    let file = open_virtual_file(&source)?;
    let layout = describe(&file);
    println!(
        "{}",
        serde_json::to_string_pretty(&layout).context("Failed to serialize layout")?
    );
    eprintln!(
        "{}: virtual file of {}",
        source.file,
        format_size(file.predicted_size())
    );
    Ok(())
}

fn describe_page(page: &PageLayout) -> Value {
    json!({
        "kind": format!("{:?}", page.kind),
        "offset": page.offset,
        "header_size": page.header_size,
        "payload_size": page.payload_size,
        "num_values": page.num_values,
    })
}

/// JSON summary of the file layout.
pub fn describe(file: &VirtualParquetFile) -> Value {
    let table = file.offset_table();
    let fields = file.schema().fields();
    let chunks = table
        .chunks()
        .iter()
        .map(|chunk| {
            json!({
                "row_group": chunk.row_group,
                "column": fields[chunk.column].name(),
                "tuple_count": chunk.tuple_count,
                "start": chunk.start(),
                "size": chunk.size(),
                "dictionary_page": chunk.dictionary_page.as_ref().map(describe_page),
                "data_page": describe_page(&chunk.data_page),
            })
        })
        .collect::<Vec<_>>();

    json!({
        "size": file.predicted_size(),
        "row_groups": table.num_row_groups(),
        "columns": fields.iter().map(|field| field.name().as_str()).collect::<Vec<_>>(),
        "data_start": table.data_start(),
        "footer_offset": table.data_end(),
        "footer_length": file.footer().len(),
        "created_by": file.parquet_metadata().file_metadata().created_by(),
        "chunks": chunks,
    })
}
