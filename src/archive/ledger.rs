//! Per-member extraction failures for one archive.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub file_name: String,
    pub message: String,
}

impl FileError {
    pub fn new(file_name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            file_name: file_name.into(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLedger {
    entries: Vec<FileError>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, error: FileError) {
        self.entries.push(error);
    }

    pub fn entries(&self) -> &[FileError] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `"<name>: <message>\n"` line per failed member
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}\n", e.file_name, e.message))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lines() {
        let mut ledger = ErrorLedger::new();
        assert_eq!(ledger.render(), "");

        ledger.record(FileError::new("bad.hl7", "invalid password"));
        ledger.record(FileError::new("nested/worse.hl7", "crc mismatch"));

        assert_eq!(
            ledger.render(),
            "bad.hl7: invalid password\nnested/worse.hl7: crc mismatch\n"
        );
        assert_eq!(ledger.len(), 2);
    }
}
