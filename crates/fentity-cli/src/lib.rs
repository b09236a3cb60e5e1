use fentity_core::models::FileRecord;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// One table row for `list --format table`
pub fn format_record_row(record: &FileRecord) -> String {
    format!(
        "{:<36}  {:<30}  {:<16}  {:>10}  {}",
        record.id,
        truncate_string(&record.filename, 30),
        truncate_string(&record.file_type, 16),
        record.filesize,
        record.status
    )
}

/// Initialize tracing for CLI binaries. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fentity_core::models::FileStatus;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_multibyte() {
        assert_eq!(truncate_string("éééééé", 5), "éé...");
    }

    #[test]
    fn record_row_contains_key_columns() {
        let now = Utc::now();
        let record = FileRecord {
            id: Uuid::new_v4(),
            uri: "files/x/a-very-long-file-name-that-does-not-fit.txt".to_string(),
            filename: "a-very-long-file-name-that-does-not-fit.txt".to_string(),
            filemime: "text/plain".to_string(),
            filesize: 42,
            status: FileStatus::Temporary,
            file_type: "undefined".to_string(),
            owner_id: None,
            description: None,
            metadata: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        };

        let row = format_record_row(&record);
        assert!(row.starts_with(&record.id.to_string()));
        assert!(row.contains("a-very-long-file-name-that-..."));
        assert!(row.ends_with("temporary"));
    }
}
