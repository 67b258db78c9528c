use parquet::file::{metadata::ParquetMetaDataReader, statistics::Statistics};
use virtfile_common::error::ErrorKind;

use crate::{
    PageKind, VirtualFileOptions, VirtualParquetFile,
    constants::{DICTIONARY_PAGE_HEADER_FIELD, NEXT_INTEGER_FIELD},
    tests::data_generator::{
        generate_dictionary_batches, generate_fixed_dictionary_batches, read_all,
    },
};

fn dictionary_file(rows_per_group: &[usize], cardinality: usize) -> VirtualParquetFile {
    let (schema, batches) = generate_dictionary_batches(rows_per_group, cardinality, 42);
    VirtualParquetFile::from_batches(schema, batches, VirtualFileOptions::default()).unwrap()
}

#[test]
fn test_dictionary_chunk_layout() {
    let file = dictionary_file(&[30, 13], 5);
    let table = file.offset_table();
    for row_group in 0..table.num_row_groups() {
        assert!(!table.get(row_group, 0).has_dictionary_page());

        let chunk = table.get(row_group, 1);
        let dictionary_page = chunk.dictionary_page.unwrap();
        let info = file.statistics().get(1, row_group);
        let dict = info.dictionary.unwrap();
        assert_eq!(dictionary_page.kind, PageKind::Dictionary);
        assert_eq!(dictionary_page.num_values, dict.unique_value_count);
        assert_eq!(
            dictionary_page.payload_size,
            dict.unique_values_byte_length + 4 * dict.unique_value_count
        );
        assert_eq!(chunk.data_page.kind, PageKind::DictionaryIndices { bit_width: 8 });
        assert_eq!(
            chunk.data_page.payload_size,
            chunk.tuple_count.div_ceil(8) * 8
        );
        assert_eq!(dictionary_page.range().end, chunk.data_page.offset);
    }
}

#[test]
fn test_dictionary_page_bytes() {
    let file = dictionary_file(&[16], 3);
    let chunk = *file.offset_table().get(0, 1);
    let dictionary_page = chunk.dictionary_page.unwrap();
    let bytes = file
        .get_range(dictionary_page.offset, chunk.end() - 1)
        .unwrap();

    // type = DICTIONARY_PAGE
    assert_eq!(&bytes[..2], &[NEXT_INTEGER_FIELD, 0x04]);
    assert_eq!(bytes[6], DICTIONARY_PAGE_HEADER_FIELD);

    let dictionary_payload =
        &bytes[dictionary_page.header_size as usize..dictionary_page.size() as usize];
    let first_len = u32::from_le_bytes(dictionary_payload[..4].try_into().unwrap()) as usize;
    assert!(std::str::from_utf8(&dictionary_payload[4..4 + first_len])
        .unwrap()
        .starts_with("word_"));

    // Index payload: values below the cardinality, then zero padding
    let indices = &bytes[bytes.len() - chunk.data_page.payload_size as usize..];
    assert_eq!(indices.len(), 16);
    assert!(indices.iter().all(|&index| (index as u64) < dictionary_page.num_values));
}

#[test]
fn test_index_padding() {
    let file = dictionary_file(&[13], 4);
    let chunk = *file.offset_table().get(0, 1);
    let bytes = read_all(&file);
    let end = chunk.end() as usize;
    assert_eq!(chunk.data_page.payload_size, 16);
    assert_eq!(&bytes[end - 3..end], &[0, 0, 0]);
}

#[test]
fn test_dictionary_statistics() {
    let file = dictionary_file(&[50], 6);
    let metadata = ParquetMetaDataReader::decode_metadata(file.footer().as_slice()).unwrap();
    let column = metadata.row_group(0).column(1);
    let dict = file.statistics().get(1, 0).dictionary.unwrap();
    assert_eq!(
        column.dictionary_page_offset(),
        Some(file.offset_table().get(0, 1).start() as i64)
    );
    match column.statistics() {
        Some(Statistics::ByteArray(stats)) => {
            assert_eq!(stats.distinct_count(), Some(dict.unique_value_count));
            let min = std::str::from_utf8(stats.min_opt().unwrap().data()).unwrap();
            let max = std::str::from_utf8(stats.max_opt().unwrap().data()).unwrap();
            assert!(min <= max);
        }
        other => panic!("unexpected statistics {other:?}"),
    }
}

#[test]
fn test_largest_single_byte_dictionary() {
    let (schema, batches) = generate_dictionary_batches(&[4096], 256, 1);
    let file =
        VirtualParquetFile::from_batches(schema, batches, VirtualFileOptions::default()).unwrap();
    let dict = file.statistics().get(1, 0).dictionary.unwrap();
    assert!(dict.unique_value_count > 200 && dict.unique_value_count <= 256);
    assert_eq!(read_all(&file).len() as u64, file.predicted_size());
}

#[test]
fn test_oversized_dictionary_rejected() {
    let (schema, batches) = generate_dictionary_batches(&[8000], 1000, 2);
    let err =
        VirtualParquetFile::from_batches(schema, batches, VirtualFileOptions::default()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotImplemented { .. }));
}

#[test]
fn test_fixed_width_dictionary_pages() {
    let (schema, batches) = generate_fixed_dictionary_batches(&[40, 9], 6, 17);
    let file =
        VirtualParquetFile::from_batches(schema, batches, VirtualFileOptions::default()).unwrap();
    let table = file.offset_table();
    let full = read_all(&file);
    assert_eq!(full.len() as u64, file.predicted_size());

    for (column, width) in [(0, 4u64), (1, 8u64)] {
        for row_group in 0..table.num_row_groups() {
            let chunk = table.get(row_group, column);
            let dictionary_page = chunk.dictionary_page.unwrap();
            let dict = file.statistics().get(column, row_group).dictionary.unwrap();
            assert_eq!(dict.unique_value_count, 6);
            // Fixed-width dictionary values carry no length prefixes.
            assert_eq!(dict.unique_values_byte_length, 6 * width);
            assert_eq!(dictionary_page.payload_size, 6 * width);
            assert_eq!(
                chunk.data_page.payload_size,
                chunk.tuple_count.div_ceil(8) * 8
            );

            let payload_start = (dictionary_page.offset + dictionary_page.header_size) as usize;
            let payload = &full[payload_start..dictionary_page.range().end as usize];
            let first = match column {
                0 => i32::from_le_bytes(payload[..4].try_into().unwrap()) as f64,
                _ => f64::from_le_bytes(payload[..8].try_into().unwrap()),
            };
            assert_eq!(first, if column == 0 { -50.0 } else { -3.0 });

            // Pages read on their own match the full file.
            for page in chunk.pages() {
                let range = page.range();
                let bytes = file.get_range(range.start, range.end - 1).unwrap();
                assert_eq!(bytes, &full[range.start as usize..range.end as usize]);
            }
            let partial = file.get_range(chunk.start() + 3, chunk.end() - 2).unwrap();
            assert_eq!(
                partial,
                &full[chunk.start() as usize + 3..chunk.end() as usize - 1]
            );
        }
    }
}
