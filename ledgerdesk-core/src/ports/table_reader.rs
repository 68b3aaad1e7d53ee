//! Table reader port - turns an uploaded file into raw rows

use std::path::Path;

use crate::domain::result::Result;
use crate::domain::RawTable;

/// Reads a tabular file (first sheet only) into a header row and data rows.
///
/// A file that cannot be opened or parsed is reported as `Error::Read`.
pub trait TableReader: Send + Sync {
    /// Lower-case file extensions this reader understands
    fn supported_extensions(&self) -> &[&str];

    /// Whether `path` has one of the supported extensions
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .map(|e| self.supported_extensions().contains(&e.as_str()))
            .unwrap_or(false)
    }

    fn read_table(&self, path: &Path) -> Result<RawTable>;
}
