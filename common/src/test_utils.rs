use std::path::PathBuf;

/// Returns the workspace root directory (parent of this crate's manifest dir).
fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Returns an empty `test_output/<name>` directory, wiping leftovers from earlier runs.
///
/// Each test should use its own `name`; tests run in parallel.
pub fn test_output_dir(name: &str) -> PathBuf {
    let dir = workspace_root().join("test_output").join(name);
    if dir.exists() {
        std::fs::remove_dir_all(&dir)
            .unwrap_or_else(|e| panic!("Failed to clear {}: {}", dir.display(), e));
    }
    std::fs::create_dir_all(&dir)
        .unwrap_or_else(|e| panic!("Failed to create {}: {}", dir.display(), e));
    dir
}

/// Returns the path to a file inside a fresh `test_output/<name>` directory.
pub fn test_output_path(name: &str, file_name: &str) -> PathBuf {
    test_output_dir(name).join(file_name)
}
