//! Where optional real scenes live, and scratch output directories.

use std::path::{Path, PathBuf};

/// Environment variable pointing at a directory of real imagery.
pub const TEST_DATA_ENV: &str = "CLIPTILES_TEST_DATA";

/// Workspace root, two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let here = Path::new(env!("CARGO_MANIFEST_DIR"));
    here.ancestors()
        .nth(2)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| here.to_path_buf())
}

/// Look up a real scene by file name.
///
/// `$CLIPTILES_TEST_DATA` wins, then `testdata/` at the workspace root.
/// Scenes are large, so none are checked in.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    std::env::var_os(TEST_DATA_ENV)
        .map(PathBuf::from)
        .into_iter()
        .chain(std::iter::once(workspace_root().join("testdata")))
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// Scratch directory for a pyramid run, removed on drop.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("cliptiles-")
        .tempdir()
        .expect("create scratch directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_has_manifest() {
        assert!(workspace_root().join("Cargo.toml").is_file());
        assert!(workspace_root().join("crates/test-utils").is_dir());
    }

    #[test]
    fn test_missing_scene_is_none() {
        assert_eq!(find_test_file("no_such_scene_0000.tif"), None);
    }

    #[test]
    fn test_scratch_dir_prefix() {
        let dir = temp_test_dir();
        let name = dir.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("cliptiles-"));
    }
}
