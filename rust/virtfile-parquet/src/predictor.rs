//! Size prediction for the Parquet chunk layout.

use virtfile_common::{Result, error::Error};

use crate::{
    column_writer::padded_index_count,
    constants::{BYTE_ARRAY_LENGTH_SIZE, MAGIC_SIZE},
    layout::{ChunkDescriptor, PageKind, PredictedChunkInfo, PredictedPage, SizePredictor},
    stats::DictionaryChunkInfo,
    value_kind::ValueKind,
};

/// Number of bytes per dictionary index for a dictionary of `unique_value_count`
/// entries: enough bits for the largest index, rounded up to whole bytes, at least one.
pub fn dictionary_index_byte_length(unique_value_count: u64) -> u8 {
    let bits = u64::BITS - unique_value_count.saturating_sub(1).leading_zeros();
    bits.div_ceil(8).max(1) as u8
}

/// Predicts chunk sizes from their statistics, given the value kind of each column.
#[derive(Debug, Clone)]
pub struct ParquetSizePredictor {
    kinds: Vec<ValueKind>,
}

impl ParquetSizePredictor {
    pub fn new(kinds: Vec<ValueKind>) -> ParquetSizePredictor {
        ParquetSizePredictor { kinds }
    }

    pub fn kinds(&self) -> &[ValueKind] {
        &self.kinds
    }

    fn kind(&self, chunk: &ChunkDescriptor) -> Result<ValueKind> {
        self.kinds.get(chunk.column).copied().ok_or_else(|| {
            Error::invalid_arg(
                "chunk_infos",
                format!(
                    "column {} has no schema field ({} fields)",
                    chunk.column,
                    self.kinds.len()
                ),
            )
        })
    }

    fn predict_dictionary_chunk(
        &self,
        chunk: &ChunkDescriptor,
        kind: ValueKind,
        dictionary: &DictionaryChunkInfo,
    ) -> Result<PredictedChunkInfo> {
        let tuple_count = chunk.info.tuple_count;
        let unique = dictionary.unique_value_count;
        if unique == 0 && tuple_count != 0 {
            return Err(invalid_chunk(chunk, "dictionary without values"));
        }

        let dictionary_payload = match kind.fixed_width() {
            Some(width) => {
                if unique.checked_mul(width) != Some(dictionary.unique_values_byte_length) {
                    return Err(invalid_chunk(
                        chunk,
                        format!(
                            "{unique} distinct {kind} values cannot span {} bytes",
                            dictionary.unique_values_byte_length
                        ),
                    ));
                }
                dictionary.unique_values_byte_length
            }
            None => unique
                .checked_mul(BYTE_ARRAY_LENGTH_SIZE)
                .and_then(|prefixes| prefixes.checked_add(dictionary.unique_values_byte_length))
                .ok_or_else(|| invalid_chunk(chunk, "dictionary size overflows"))?,
        };

        let byte_length = dictionary_index_byte_length(unique);
        if byte_length != 1 {
            return Err(Error::not_implemented(format!(
                "column {} row group {}: dictionary of {unique} values needs {byte_length}-byte indices",
                chunk.column, chunk.row_group
            )));
        }
        let index_payload = padded_index_count(tuple_count)
            .and_then(|slots| slots.checked_mul(byte_length as u64))
            .ok_or_else(|| invalid_chunk(chunk, format!("{tuple_count} indices overflow")))?;

        Ok(PredictedChunkInfo {
            dictionary_page: Some(PredictedPage::new(
                PageKind::Dictionary,
                unique,
                dictionary_payload,
            )?),
            data_page: PredictedPage::new(
                PageKind::DictionaryIndices {
                    bit_width: byte_length * 8,
                },
                tuple_count,
                index_payload,
            )?,
        })
    }

    fn predict_plain_chunk(
        &self,
        chunk: &ChunkDescriptor,
        kind: ValueKind,
    ) -> Result<PredictedChunkInfo> {
        let info = chunk.info;
        let payload = match kind.fixed_width() {
            Some(width) => {
                if info.tuple_count.checked_mul(width) != Some(info.uncompressed_size) {
                    return Err(invalid_chunk(
                        chunk,
                        format!(
                            "{} {kind} values cannot span {} bytes",
                            info.tuple_count, info.uncompressed_size
                        ),
                    ));
                }
                info.uncompressed_size
            }
            None => {
                // The logical size counts n + 1 offsets; the page stores n length prefixes.
                let offsets_size = info
                    .tuple_count
                    .checked_add(1)
                    .and_then(|offsets| offsets.checked_mul(BYTE_ARRAY_LENGTH_SIZE))
                    .ok_or_else(|| {
                        invalid_chunk(chunk, format!("{} text values overflow", info.tuple_count))
                    })?;
                if info.uncompressed_size < offsets_size {
                    return Err(invalid_chunk(
                        chunk,
                        format!(
                            "{} text values need at least {offsets_size} bytes, got {}",
                            info.tuple_count, info.uncompressed_size
                        ),
                    ));
                }
                info.uncompressed_size - BYTE_ARRAY_LENGTH_SIZE
            }
        };
        Ok(PredictedChunkInfo {
            dictionary_page: None,
            data_page: PredictedPage::new(PageKind::Plain, info.tuple_count, payload)?,
        })
    }
}

impl SizePredictor for ParquetSizePredictor {
    fn data_offset(&self) -> u64 {
        MAGIC_SIZE
    }

    fn predict_chunk(&self, chunk: &ChunkDescriptor) -> Result<PredictedChunkInfo> {
        let kind = self.kind(chunk)?;
        if let Some(zone_map) = &chunk.info.zone_map {
            if zone_map.kind() != Some(kind) {
                return Err(invalid_chunk(
                    chunk,
                    format!("zone map {zone_map:?} does not match column kind {kind}"),
                ));
            }
        }
        match &chunk.info.dictionary {
            Some(dictionary) => self.predict_dictionary_chunk(chunk, kind, dictionary),
            None => self.predict_plain_chunk(chunk, kind),
        }
    }
}

fn invalid_chunk(chunk: &ChunkDescriptor, message: impl std::fmt::Display) -> Error {
    Error::invalid_arg(
        "chunk_info",
        format!(
            "column {} row group {}: {message}",
            chunk.column, chunk.row_group
        ),
    )
}
