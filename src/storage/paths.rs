//! # Staging Paths
//!
//! Builders for the storage layout conventions. Every processing stage is a
//! folder; downstream consumers react to where a file lands.

use reqwest::Url;

use super::errors::{StorageError, StorageResult};
use crate::constants::folders;

/// `import/<file_name>`: single reports awaiting forwarding
pub fn import_path(file_name: &str) -> String {
    format!("{}/{}", folders::IMPORT, file_name)
}

/// `unzip/<file_name>`: staged archives awaiting extraction
pub fn unzip_path(file_name: &str) -> String {
    format!("{}/{}", folders::UNZIP, file_name)
}

/// `unzip/success/<file_name>` or `unzip/failure/<file_name>` for a processed archive
pub fn archive_outcome_path(archive_blob_path: &str, succeeded: bool) -> String {
    let outcome = if succeeded {
        folders::SUCCESS
    } else {
        folders::FAILURE
    };
    format!(
        "{}/{}/{}",
        folders::UNZIP,
        outcome,
        file_name(archive_blob_path)
    )
}

/// `failure/<archive_name>.txt`: per-archive error ledger
pub fn error_ledger_path(archive_name: &str) -> String {
    format!("{}/{}.txt", folders::FAILURE, archive_name)
}

/// `config/<partner_id>.json`: partner settings document
pub fn partner_config_path(partner_id: &str) -> String {
    format!("{}/{}.json", folders::CONFIG, partner_id)
}

/// Last segment of a slash-separated path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Replace the first path segment equal to `from` with `to`
///
/// Returns `None` when no segment matches, so callers can refuse to move a
/// file that is not where they expect it.
pub fn replace_folder_segment(path: &str, from: &str, to: &str) -> Option<String> {
    let mut segments: Vec<&str> = path.split('/').collect();
    let index = segments.iter().position(|segment| *segment == from)?;
    segments[index] = to;
    Some(segments.join("/"))
}

/// Extract the container-relative blob path from a storage URL
///
/// `https://host/container/customer/import/msg2.hl7` -> `customer/import/msg2.hl7`
///
/// Segments are percent-decoded, so `lab%20report.hl7` names the blob
/// `lab report.hl7`.
pub fn blob_path_from_url(url: &str) -> StorageResult<String> {
    let parsed = Url::parse(url).map_err(|e| StorageError::invalid_url(url, e.to_string()))?;

    let segments = parsed
        .path_segments()
        .ok_or_else(|| StorageError::invalid_url(url, "URL has no path"))?
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .map_err(|e| StorageError::invalid_url(url, format!("undecodable segment: {e}")))
        })
        .collect::<StorageResult<Vec<String>>>()?;

    if segments.len() < 2 {
        return Err(StorageError::invalid_url(
            url,
            "expected a container followed by a blob path",
        ));
    }

    Ok(segments[1..].join("/"))
}

/// Reject paths that could escape a storage root or address nothing
pub fn validate_blob_path(path: &str) -> StorageResult<()> {
    if path.is_empty() {
        return Err(StorageError::invalid_path(path, "empty path"));
    }
    if path.starts_with('/') {
        return Err(StorageError::invalid_path(path, "absolute path"));
    }
    if path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::invalid_path(path, "empty or relative segment"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_paths() {
        assert_eq!(import_path("a.hl7"), "import/a.hl7");
        assert_eq!(unzip_path("report.zip"), "unzip/report.zip");
        assert_eq!(error_ledger_path("report.zip"), "failure/report.zip.txt");
        assert_eq!(partner_config_path("ca-phl"), "config/ca-phl.json");
    }

    #[test]
    fn test_archive_outcome_path() {
        assert_eq!(
            archive_outcome_path("unzip/report.zip", true),
            "unzip/success/report.zip"
        );
        assert_eq!(
            archive_outcome_path("unzip/report.zip", false),
            "unzip/failure/report.zip"
        );
    }

    #[test]
    fn test_replace_folder_segment() {
        assert_eq!(
            replace_folder_segment("customer/import/msg2.hl7", "import", "success").as_deref(),
            Some("customer/success/msg2.hl7")
        );
        // Only whole segments match
        assert_eq!(
            replace_folder_segment("customer/important/msg.hl7", "import", "success"),
            None
        );
    }

    #[test]
    fn test_blob_path_from_url() {
        assert_eq!(
            blob_path_from_url("https://host/container/customer/import/msg2.hl7").unwrap(),
            "customer/import/msg2.hl7"
        );
        assert!(matches!(
            blob_path_from_url("https://host/container"),
            Err(StorageError::InvalidUrl { .. })
        ));
        assert!(matches!(
            blob_path_from_url("not a url"),
            Err(StorageError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_blob_path_from_url_decodes_segments() {
        assert_eq!(
            blob_path_from_url("https://host/container/customer/import/lab%20report.hl7").unwrap(),
            "customer/import/lab report.hl7"
        );
        assert_eq!(
            blob_path_from_url("https://host/container/customer/import/r%C3%A9sultat.hl7").unwrap(),
            "customer/import/résultat.hl7"
        );
        // %FF is not valid UTF-8 once decoded
        assert!(matches!(
            blob_path_from_url("https://host/container/customer/import/bad%FF.hl7"),
            Err(StorageError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validate_blob_path() {
        assert!(validate_blob_path("import/a.hl7").is_ok());
        assert!(validate_blob_path("").is_err());
        assert!(validate_blob_path("/etc/passwd").is_err());
        assert!(validate_blob_path("import/../../etc").is_err());
        assert!(validate_blob_path("import//a").is_err());
    }
}
