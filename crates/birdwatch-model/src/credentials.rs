//! API-key file handling.
//!
//! The key lives in a single-line file. When the file is absent, empty, or
//! the service has rejected its contents, the operator is prompted once on
//! stdin and the replacement is persisted for subsequent runs.

use std::io::Write;
use std::path::Path;

use crate::ModelError;

/// Reads the key file, prompting interactively when it is absent or empty.
///
/// # Errors
///
/// Returns [`ModelError::MissingKey`] if prompting also yields nothing, or
/// [`ModelError::Io`] if stdin cannot be read.
pub fn load_or_prompt(path: &Path) -> Result<String, ModelError> {
    if let Ok(contents) = std::fs::read_to_string(path) {
        let key = contents.trim();
        if !key.is_empty() {
            tracing::debug!(path = %path.display(), "API key loaded from file");
            return Ok(key.to_string());
        }
    }

    prompt_and_store(path)
}

/// Prompts for a key on stdin and persists it to `path`.
///
/// A failure to persist is logged but not fatal: the freshly entered key
/// is still returned so the current run can proceed.
///
/// # Errors
///
/// Returns [`ModelError::MissingKey`] when the operator enters nothing, or
/// [`ModelError::Io`] if stdin cannot be read.
pub fn prompt_and_store(path: &Path) -> Result<String, ModelError> {
    print!("Model service API key not found or invalid. Enter a key: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let key = line.trim().to_string();
    if key.is_empty() {
        return Err(ModelError::MissingKey);
    }

    match std::fs::write(path, &key) {
        Ok(()) => tracing::info!(path = %path.display(), "API key saved"),
        Err(e) => tracing::error!(path = %path.display(), error = %e, "failed to save API key"),
    }

    Ok(key)
}

/// Discards a rejected key file so the next load prompts afresh.
pub fn invalidate(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::info!(path = %path.display(), "discarded rejected API key"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove API key file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_key_is_loaded_and_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.txt");
        std::fs::write(&path, "  sk-something\n").unwrap();

        let key = load_or_prompt(&path).expect("should load from file");
        assert_eq!(key, "sk-something");
    }

    #[test]
    fn invalidate_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.txt");
        std::fs::write(&path, "sk-old").unwrap();

        invalidate(&path);
        assert!(!path.exists());

        // A second invalidation of a missing file is silent.
        invalidate(&path);
    }
}
