//! Extension to finder dispatch.

use crate::language::Language;
use crate::type_finder::TypeFinder;
use std::path::Path;

/// Returns the finder registered for `ext`, or `None` when no language claims it.
///
/// A leading dot is accepted, so both `"kt"` and `".kt"` resolve.
pub fn finder_for_extension(ext: &str) -> Option<TypeFinder> {
    let ext = ext.strip_prefix('.').unwrap_or(ext);
    Language::from_extension(ext).map(TypeFinder::new)
}

/// Same as [`finder_for_extension`] using the extension of `path`.
pub fn finder_for_path(path: &Path) -> Option<TypeFinder> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(finder_for_extension)
}
