//! Pre-shared overlay auth key loading.

use std::path::{Path, PathBuf};

/// The auth key file could not be read.
#[derive(Debug, thiserror::Error)]
#[error("failed to read auth key {path:?}: {source}")]
pub struct AuthKeyError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Read the auth key file and strip exactly one trailing newline.
pub async fn load_auth_key(path: &Path) -> Result<String, AuthKeyError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AuthKeyError {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(strip_trailing_newline(content))
}

fn strip_trailing_newline(mut content: String) -> String {
    if content.ends_with('\n') {
        content.pop();
    }
    content
}
