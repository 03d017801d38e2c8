//! Source file reading
//!
//! Handles the cases a scan over arbitrary files runs into:
//! - Oversized files (skipped before reading)
//! - Binary files (skipped)
//! - Non-UTF-8 files (lossy conversion, or skipped)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Default maximum file size in bytes (5 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// How many leading bytes are checked for NUL when sniffing binaries
const BINARY_SNIFF_LEN: usize = 8192;

/// Strategy for handling non-UTF-8 content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingStrategy {
    /// Skip non-UTF-8 files entirely
    Skip,
    /// Replace invalid sequences with U+FFFD
    #[default]
    Lossy,
}

/// Configuration for file reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReadConfig {
    /// Files larger than this are not read at all (bytes)
    pub max_file_size: u64,

    /// How to handle non-UTF-8 content
    pub encoding_strategy: EncodingStrategy,
}

impl Default for FileReadConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            encoding_strategy: EncodingStrategy::Lossy,
        }
    }
}

/// Why a file was not read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TooLarge { size: u64, limit: u64 },
    Binary,
    InvalidUtf8,
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooLarge { size, limit } => {
                write!(f, "file size {} exceeds limit {}", size, limit)
            }
            SkipReason::Binary => write!(f, "binary file"),
            SkipReason::InvalidUtf8 => write!(f, "invalid UTF-8"),
            SkipReason::Unreadable(e) => write!(f, "cannot read file: {}", e),
        }
    }
}

/// Result of reading a file
#[derive(Debug, Clone)]
pub struct FileReadResult {
    /// The file content (if successfully read)
    pub content: Option<String>,

    /// Whether lossy conversion was used
    pub lossy_conversion: bool,

    /// Reason for skipping (if skipped)
    pub skip_reason: Option<SkipReason>,
}

impl FileReadResult {
    /// Create a successful read result
    pub fn success(content: String) -> Self {
        Self {
            content: Some(content),
            lossy_conversion: false,
            skip_reason: None,
        }
    }

    /// Create a skipped result
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            content: None,
            lossy_conversion: false,
            skip_reason: Some(reason),
        }
    }

    /// Mark as lossy conversion
    pub fn with_lossy(mut self) -> Self {
        self.lossy_conversion = true;
        self
    }

    pub fn is_skipped(&self) -> bool {
        self.skip_reason.is_some()
    }
}

/// Read a file with the given configuration
pub fn read_file_with_config(path: &Path, config: &FileReadConfig) -> FileReadResult {
    // Check file size first
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => return FileReadResult::skipped(SkipReason::Unreadable(e.to_string())),
    };

    if metadata.len() > config.max_file_size {
        return FileReadResult::skipped(SkipReason::TooLarge {
            size: metadata.len(),
            limit: config.max_file_size,
        });
    }

    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => return FileReadResult::skipped(SkipReason::Unreadable(e.to_string())),
    };

    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return FileReadResult::skipped(SkipReason::Binary);
    }

    match String::from_utf8(bytes) {
        Ok(content) => FileReadResult::success(content),
        Err(e) => match config.encoding_strategy {
            EncodingStrategy::Skip => FileReadResult::skipped(SkipReason::InvalidUtf8),
            EncodingStrategy::Lossy => {
                let content = String::from_utf8_lossy(e.as_bytes()).into_owned();
                FileReadResult::success(content).with_lossy()
            }
        },
    }
}

/// Convenience function with default config
pub fn read_file_safe(path: &Path) -> FileReadResult {
    read_file_with_config(path, &FileReadConfig::default())
}

/// Read one explicitly requested file, lossily, with no size limit
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_file_read_config_default() {
        let config = FileReadConfig::default();
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.encoding_strategy, EncodingStrategy::Lossy);
    }

    #[test]
    fn test_read_file_success() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("test.cs");
        fs::write(&file_path, "// TODO: x").unwrap();

        let result = read_file_safe(&file_path);
        assert!(!result.is_skipped());
        assert_eq!(result.content.as_deref(), Some("// TODO: x"));
        assert!(!result.lossy_conversion);
    }

    #[test]
    fn test_read_file_skip_size() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("test.txt");
        fs::write(&file_path, "Hello").unwrap();

        let config = FileReadConfig {
            max_file_size: 1,
            ..Default::default()
        };

        let result = read_file_with_config(&file_path, &config);
        assert_eq!(
            result.skip_reason,
            Some(SkipReason::TooLarge { size: 5, limit: 1 })
        );
    }

    #[test]
    fn test_read_file_binary() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("binary.bin");

        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(&[0x00, 0x01, 0x02, 0x00, 0x03]).unwrap();

        let result = read_file_safe(&file_path);
        assert_eq!(result.skip_reason, Some(SkipReason::Binary));
    }

    #[test]
    fn test_read_file_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("latin1.txt");
        fs::write(&file_path, [b'c', b'a', b'f', 0xE9]).unwrap();

        let result = read_file_safe(&file_path);
        assert!(result.lossy_conversion);
        assert_eq!(result.content.as_deref(), Some("caf\u{FFFD}"));

        let config = FileReadConfig {
            encoding_strategy: EncodingStrategy::Skip,
            ..Default::default()
        };
        let result = read_file_with_config(&file_path, &config);
        assert_eq!(result.skip_reason, Some(SkipReason::InvalidUtf8));
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_file_safe(Path::new("/definitely/not/here.cs"));
        assert!(matches!(result.skip_reason, Some(SkipReason::Unreadable(_))));
        assert!(read_source(Path::new("/definitely/not/here.cs")).is_err());
    }
}
