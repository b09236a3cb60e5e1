//! Shared key generation for stored content.
//!
//! Key format: uploads live under `files/{file_id}/{filename}`, staged
//! replacements under `{staging_prefix}/{file_id}/{staged_id}.{ext}`.

use fentity_core::constants::FILES_PREFIX;
use uuid::Uuid;

/// Generate the storage key for a newly uploaded file.
///
/// Path separators in `filename` are replaced so the name always occupies a
/// single key segment.
pub fn file_key(file_id: Uuid, filename: &str) -> String {
    format!("{}/{}/{}", FILES_PREFIX, file_id, sanitize_segment(filename))
}

/// Generate the storage key for a staged replacement upload.
pub fn staging_key(prefix: &str, file_id: Uuid, staged_id: Uuid, extension: Option<&str>) -> String {
    let prefix = prefix.trim_matches('/');
    match extension {
        Some(ext) if !ext.is_empty() => format!("{}/{}/{}.{}", prefix, file_id, staged_id, ext),
        _ => format!("{}/{}/{}", prefix, file_id, staged_id),
    }
}

/// Prefix holding every staged replacement of one file
pub fn staging_dir(prefix: &str, file_id: Uuid) -> String {
    format!("{}/{}", prefix.trim_matches('/'), file_id)
}

fn sanitize_segment(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "file".to_string(),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_key() {
        let id = Uuid::new_v4();
        assert_eq!(file_key(id, "report.pdf"), format!("files/{}/report.pdf", id));
        assert_eq!(file_key(id, "../evil.sh"), format!("files/{}/.._evil.sh", id));
        assert_eq!(file_key(id, ".."), format!("files/{}/file", id));
    }

    #[test]
    fn test_staging_key() {
        let file_id = Uuid::new_v4();
        let staged_id = Uuid::new_v4();
        assert_eq!(
            staging_key("/staging/", file_id, staged_id, Some("pdf")),
            format!("staging/{}/{}.pdf", file_id, staged_id)
        );
        assert_eq!(
            staging_key("staging", file_id, staged_id, None),
            format!("staging/{}/{}", file_id, staged_id)
        );
        assert!(staging_key("staging", file_id, staged_id, Some("pdf"))
            .starts_with(&format!("{}/", staging_dir("/staging/", file_id))));
        assert_eq!(
            staging_dir("staging", file_id),
            format!("staging/{}", file_id)
        );
    }
}
