//! Test helpers shared by the cliptiles crates.
//!
//! Synthetic bands come from [`generators`], GeoTIFF scenes and tile-tree
//! inspection from [`fixtures`]. Real imagery is optional: tests that need
//! it use [`require_test_file!`] and skip when the scene is absent.

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Resolve a real scene via [`find_test_file`] or return from the test.
///
/// ```ignore
/// #[test]
/// fn test_real_scene() {
///     let path = require_test_file!("K3A_sample.tif");
///     // ...
/// }
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "skipping: scene '{}' not found (set {})",
                    $name,
                    $crate::TEST_DATA_ENV
                );
                return;
            }
        }
    }};
}
