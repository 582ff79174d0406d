//! Types shared across StudyStage crates.

use serde_json::Value;

/// Open key-value metadata attached to an indexed document.
///
/// The index never inspects or validates it; any schema is the caller's
/// concern.
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key holding the uploaded file name.
pub const FILENAME_KEY: &str = "filename";

/// Build metadata carrying only a file name.
pub fn filename_metadata(filename: &str) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert(FILENAME_KEY.to_string(), Value::String(filename.to_string()));
    meta
}

/// Read the file name back out of metadata, if present.
pub fn metadata_filename(meta: &Metadata) -> Option<&str> {
    meta.get(FILENAME_KEY).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_round_trip() {
        let meta = filename_metadata("week5-svm.pdf");
        assert_eq!(metadata_filename(&meta), Some("week5-svm.pdf"));
    }

    #[test]
    fn test_metadata_filename_missing_or_wrong_type() {
        let mut meta = Metadata::new();
        assert_eq!(metadata_filename(&meta), None);
        meta.insert(FILENAME_KEY.to_string(), Value::from(42));
        assert_eq!(metadata_filename(&meta), None);
    }
}
