//! JSONL import functionality
//!
//! Loads full phrasebook entries (including translation and usage, which
//! the regular insert path does not accept) from JSONL files, one JSON
//! object per line. Lines are inserted in chunks, one multi-row statement
//! per chunk.
//!
//! Supports both raw JSONL and gzip-compressed JSONL files (.jsonl.gz).

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::executor::QueryExecutor;
use crate::models::ImportEntry;
use crate::write::{InsertBuilder, IMPORT_COLUMNS};
use crate::{Error, Result};

/// Records per insert statement
///
/// 500 records of 7 columns stays well below SQLite's bound parameter limit.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Import statistics returned after processing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Total number of lines processed
    pub lines_processed: u64,
    /// Number of entries inserted
    pub entries_imported: u64,
    /// Number of lines that could not be read or decoded
    pub errors: u64,
    /// Number of skipped (blank) lines
    pub skipped: u64,
}

/// Import entries from a JSONL file through `executor`
///
/// # Arguments
///
/// * `executor` - Store to insert into
/// * `jsonl_path` - Path to the source file (can be .jsonl or .jsonl.gz)
/// * `batch_size` - Records per insert statement
/// * `progress` - Callback function receiving (current_line, total_lines)
pub fn import_from_jsonl<E: QueryExecutor>(
    executor: &E,
    jsonl_path: &str,
    batch_size: usize,
    progress: impl Fn(u64, u64),
) -> Result<ImportStats> {
    if batch_size == 0 {
        return Err(Error::InvalidRequest(
            "Import batch size must be at least 1".to_string(),
        ));
    }

    let is_gzipped = Path::new(jsonl_path)
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    // Count total lines for progress reporting
    let total_lines = count_lines(open_reader(jsonl_path, is_gzipped)?)?;
    let reader = open_reader(jsonl_path, is_gzipped)?;

    let mut stats = ImportStats::default();
    let mut pending: Vec<ImportEntry> = Vec::with_capacity(batch_size);

    for line_result in reader.lines() {
        stats.lines_processed += 1;

        if stats.lines_processed % 1000 == 0 {
            progress(stats.lines_processed, total_lines);
        }

        let line = match line_result {
            Ok(l) => l,
            Err(e) if is_line_error(&e) => {
                log::debug!("Unreadable line {}: {}", stats.lines_processed, e);
                stats.errors += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if line.trim().is_empty() {
            stats.skipped += 1;
            continue;
        }

        match serde_json::from_str::<ImportEntry>(&line) {
            Ok(entry) => pending.push(entry),
            Err(e) => {
                log::debug!("JSON parse error at line {}: {}", stats.lines_processed, e);
                stats.errors += 1;
                continue;
            }
        }

        if pending.len() == batch_size {
            stats.entries_imported += insert_chunk(executor, &pending)? as u64;
            pending.clear();
        }
    }

    if !pending.is_empty() {
        stats.entries_imported += insert_chunk(executor, &pending)? as u64;
    }

    progress(stats.lines_processed, total_lines);

    log::info!(
        "Import complete: {} lines, {} entries, {} errors, {} skipped",
        stats.lines_processed,
        stats.entries_imported,
        stats.errors,
        stats.skipped
    );

    Ok(stats)
}

/// Insert one chunk of entries with a single statement
pub fn insert_chunk<E: QueryExecutor>(executor: &E, entries: &[ImportEntry]) -> Result<usize> {
    let mut builder = InsertBuilder::new(&IMPORT_COLUMNS);
    for entry in entries {
        builder.push(entry.column_values()?)?;
    }
    let output = executor.execute(&builder.build()?)?;
    Ok(output.row_count)
}

/// Whether a read error is confined to the current line
///
/// Invalid UTF-8 consumes the offending line. Anything else (a truncated or
/// corrupt gzip stream, a failing disk) fails again on every later read.
fn is_line_error(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::InvalidData
}

fn count_lines(reader: impl BufRead) -> Result<u64> {
    let mut total = 0;
    for line in reader.lines() {
        match line {
            Err(e) if !is_line_error(&e) => return Err(e.into()),
            _ => total += 1,
        }
    }
    Ok(total)
}

fn open_reader(path: &str, is_gzipped: bool) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    Ok(if is_gzipped {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;
    use crate::db::SqliteStore;
    use crate::pagination::Pagination;
    use crate::service::Phrasebook;

    const SAMPLE: &str = r#"{"phrase":"一石二鸟","pronounciation":"yī shí èr niǎo","mandarin":"kill two birds with one stone","usage":"Proverb","tags":["idiom"]}
{"phrase":"你好","pronunciation":"nǐhǎo","translation":"hello","usage":"EL","tags":["greeting"],"audioURL":"nihao.mp3"}

not json
{"phrase":"谢谢","tags":["greeting","polite"]}
"#;

    fn write_sample(dir: &tempfile::TempDir, name: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, SAMPLE).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_import_counts_and_inserts() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir, "words.jsonl");
        let store = SqliteStore::open_in_memory().unwrap();

        let stats = import_from_jsonl(&store, &path, 2, |_, _| {}).unwrap();
        assert_eq!(
            stats,
            ImportStats {
                lines_processed: 5,
                entries_imported: 3,
                errors: 1,
                skipped: 1,
            }
        );

        let book = Phrasebook::new(store, Pagination::default());
        let proverbs = book.filter_page("Proverb", 1).unwrap();
        assert_eq!(proverbs.total_count, 1);
        assert_eq!(
            proverbs.entries[0].translation.as_deref(),
            Some("kill two birds with one stone")
        );
        assert_eq!(book.filter_page("greeting", 1).unwrap().total_count, 2);
    }

    #[test]
    fn test_import_gzipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.jsonl.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let stats =
            import_from_jsonl(&store, path.to_str().unwrap(), DEFAULT_BATCH_SIZE, |_, _| {})
                .unwrap();
        assert_eq!(stats.entries_imported, 3);
    }

    #[test]
    fn test_progress_reports_final_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir, "words.jsonl");
        let store = SqliteStore::open_in_memory().unwrap();
        let last = Cell::new((0, 0));

        import_from_jsonl(&store, &path, 10, |current, total| last.set((current, total))).unwrap();
        assert_eq!(last.get(), (5, 5));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = import_from_jsonl(&store, "unused.jsonl", 0, |_, _| {}).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_truncated_gzip_is_io_error() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        for i in 0..2000 {
            writeln!(
                encoder,
                r#"{{"phrase":"词{}","pronunciation":"cí","tags":["t{}"]}}"#,
                i,
                i % 37
            )
            .unwrap();
        }
        let compressed = encoder.finish().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.jsonl.gz");
        std::fs::write(&path, &compressed[..compressed.len() / 2]).unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let err = import_from_jsonl(&store, path.to_str().unwrap(), 100, |_, _| {}).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_invalid_utf8_line_counts_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.jsonl");
        let mut bytes = b"{\"phrase\":\"a\"}\n".to_vec();
        bytes.extend_from_slice(b"\xff\xfe\n");
        bytes.extend_from_slice(b"{\"phrase\":\"b\"}\n");
        std::fs::write(&path, bytes).unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let stats = import_from_jsonl(&store, path.to_str().unwrap(), 10, |_, _| {}).unwrap();
        assert_eq!(stats.lines_processed, 3);
        assert_eq!(stats.entries_imported, 2);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = import_from_jsonl(&store, "/nonexistent/words.jsonl", 10, |_, _| {}).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
