use crate::error::DashError;
use crate::ingest::row::RawRow;
use std::fs::File;
use std::io::Read;

/// Read a CSV log export from disk into raw rows.
///
/// The header row names the columns; names are trimmed before use and a
/// column with an empty name (an exported row index) is dropped. A row
/// shorter than the header leaves its trailing fields absent; a row with
/// more cells than the header makes the source unreadable.
///
/// Example:
/// ,Timestamp,LogLevel,Service,TimeTaken
/// 0,2024-03-01 10:00:00,info,auth,12.5
pub fn read_source_file(path: &str) -> Result<Vec<RawRow>, DashError> {
    let file = File::open(path).map_err(|e| DashError::SourceUnreadable {
        source_id: path.to_string(),
        reason: e.to_string(),
    })?;
    read_source(path, file)
}

/// Read CSV text from any reader. `source_id` only labels errors.
pub fn read_source<R: Read>(source_id: &str, input: R) -> Result<Vec<RawRow>, DashError> {
    let unreadable = |reason: String| DashError::SourceUnreadable {
        source_id: source_id.to_string(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| unreadable(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(unreadable("missing header row".to_string()));
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // Header is line 1.
        let record = record.map_err(|e| unreadable(format!("row {}: {}", idx + 2, e)))?;
        if record.len() > headers.len() {
            return Err(unreadable(format!(
                "row {}: {} cells but the header names {} columns",
                idx + 2,
                record.len(),
                headers.len()
            )));
        }

        let mut row = RawRow::new();
        for (name, value) in headers.iter().zip(record.iter()) {
            if name.is_empty() {
                continue;
            }
            row.insert(name.clone(), value.to_string());
        }
        rows.push(row);
    }

    log::debug!("read {} rows from {}", rows.len(), source_id);
    Ok(rows)
}
