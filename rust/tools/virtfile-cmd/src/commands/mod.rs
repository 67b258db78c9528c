//! Command implementations for virtfile-cmd

use anyhow::{Context, Result, bail};
use arrow_array::{
    ArrayRef, DictionaryArray, RecordBatch, cast::AsArray, types::Int32Type,
};
use arrow_json::{ReaderBuilder, reader::infer_json_schema_from_seekable};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use clap::Args;
use std::{
    fs::{self, File},
    io::{BufReader, Seek, SeekFrom},
    sync::Arc,
};
use virtfile_parquet::{VirtualFileOptions, VirtualParquetFile};

use crate::utils;

pub mod inspect;
pub mod materialize;
pub mod range;

/// Data and layout options shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Newline-delimited JSON file holding the table rows
    pub file: String,

    /// Rows per row group
    #[arg(long, default_value_t = 1024)]
    pub rows_per_group: usize,

    /// JSON file with virtual file options
    #[arg(long)]
    pub options: Option<String>,

    /// Dictionary-encode this text column (can be specified multiple times)
    #[arg(long)]
    pub dictionary: Vec<String>,
}

/// Loads the NDJSON source and lays out its virtual file.
pub fn open_virtual_file(args: &SourceArgs) -> Result<VirtualParquetFile> {
    utils::validate_file_exists(&args.file)
        .with_context(|| format!("Invalid source file: {}", args.file))?;
    if args.rows_per_group == 0 {
        bail!("--rows-per-group must be positive");
    }

    let options = match &args.options {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read options file: {path}"))?;
            serde_json::from_str::<VirtualFileOptions>(&json)
                .with_context(|| format!("Failed to parse options file: {path}"))?
        }
        None => VirtualFileOptions::default(),
    };

    let (schema, batches) = read_batches(&args.file, args.rows_per_group, &args.dictionary)?;
    log::debug!(
        "loaded {} row groups, {} columns from {}",
        batches.len(),
        schema.fields().len(),
        args.file
    );
    VirtualParquetFile::from_batches(schema, batches, options)
        .with_context(|| format!("Failed to lay out virtual file for {}", args.file))
}

/// Reads `path` into batches of at most `rows_per_group` rows.
///
/// Inferred `Int64` columns are narrowed to `Int32`; columns named in `dictionary`
/// are dictionary-encoded.
fn read_batches(
    path: &str,
    rows_per_group: usize,
    dictionary: &[String],
) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let file = File::open(path).with_context(|| format!("Failed to open JSON file: {path}"))?;
    let mut buf_reader = BufReader::new(file);
    let (inferred, _) = infer_json_schema_from_seekable(&mut buf_reader, None)
        .with_context(|| format!("Failed to infer JSON schema from file: {path}"))?;
    buf_reader.seek(SeekFrom::Start(0))?;

    for name in dictionary {
        match inferred.field_with_name(name) {
            Ok(field) if field.data_type() == &DataType::Utf8 => {}
            Ok(field) => bail!(
                "Cannot dictionary-encode column {name} of type {}",
                field.data_type()
            ),
            Err(_) => bail!("Unknown dictionary column: {name}"),
        }
    }

    let read_schema = Arc::new(Schema::new(
        inferred
            .fields()
            .iter()
            .map(|field| {
                let data_type = match field.data_type() {
                    DataType::Int64 => DataType::Int32,
                    other => other.clone(),
                };
                Field::new(field.name(), data_type, field.is_nullable())
            })
            .collect::<Vec<_>>(),
    ));
    let file_schema = Arc::new(Schema::new(
        read_schema
            .fields()
            .iter()
            .map(|field| {
                if dictionary.contains(field.name()) {
                    Field::new(
                        field.name(),
                        DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
                        field.is_nullable(),
                    )
                } else {
                    field.as_ref().clone()
                }
            })
            .collect::<Vec<_>>(),
    ));

    let json_reader = ReaderBuilder::new(read_schema.clone())
        .with_batch_size(rows_per_group)
        .build(buf_reader)
        .with_context(|| format!("Failed to create JSON reader for {path}"))?;

    let mut batches = Vec::new();
    for batch in json_reader {
        let batch = batch.with_context(|| format!("Failed to read JSON batch from {path}"))?;
        let columns = batch
            .columns()
            .iter()
            .zip(read_schema.fields())
            .map(|(column, field)| -> ArrayRef {
                if dictionary.contains(field.name()) {
                    let encoded: DictionaryArray<Int32Type> =
                        column.as_string::<i32>().iter().collect();
                    Arc::new(encoded)
                } else {
                    column.clone()
                }
            })
            .collect::<Vec<_>>();
        batches.push(
            RecordBatch::try_new(file_schema.clone(), columns)
                .context("Failed to assemble record batch")?,
        );
    }
    Ok((file_schema, batches))
}
