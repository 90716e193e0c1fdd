pub use crate::types::RaptorError;

use std::path::Path;

pub type Result<T> = std::result::Result<T, RaptorError>;

/// Attaches the offending path to filesystem errors.
pub trait IoContext<T> {
    fn with_path(self, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn with_path(self, path: &Path) -> Result<T> {
        self.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                RaptorError::ArtifactExists(path.to_path_buf())
            } else {
                RaptorError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })
    }
}
