//! File-name matching over image references.
//!
//! Image references are compared by basename only, so a caller can name
//! `"0.jpg"` and find `"azureml://datastores/x/paths/images/0.jpg"`.
//! Augmented copies follow the naming convention
//! `<stem>_upsampled_<NN>.upsampled.<ext>` and can be pulled in alongside
//! the file they were generated from.

use std::collections::HashSet;
use std::path::Path;

/// Default marker between the stem and the copy number of an upsampled file.
pub const DEFAULT_UPSAMPLE_PREFIX: &str = "_upsampled_";

/// Default marker placed before the original extension of an upsampled file.
pub const DEFAULT_UPSAMPLE_EXT: &str = ".upsampled";

/// Options for [`get_file_paths`].
#[derive(Clone, Debug)]
pub struct MatchOptions {
    /// Also return upsampled copies of the searched files.
    pub include_upsample_files: bool,
    pub upsample_prefix: String,
    pub upsample_ext: String,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            include_upsample_files: true,
            upsample_prefix: DEFAULT_UPSAMPLE_PREFIX.to_string(),
            upsample_ext: DEFAULT_UPSAMPLE_EXT.to_string(),
        }
    }
}

impl MatchOptions {
    /// Exact basename matching only.
    pub fn exact() -> Self {
        Self {
            include_upsample_files: false,
            ..Self::default()
        }
    }
}

/// Returns the final path component of a reference, or `""` if it has none.
pub fn basename(reference: &str) -> &str {
    Path::new(reference)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("")
}

/// Joins a prefix and a file name with a single `/`.
///
/// References may be URLs (`azureml://...`), so this stays string-based
/// instead of going through the platform path separator.
pub fn join_reference(prefix: &str, file_name: &str) -> String {
    if prefix.is_empty() {
        file_name.to_string()
    } else if prefix.ends_with('/') {
        format!("{prefix}{file_name}")
    } else {
        format!("{prefix}/{file_name}")
    }
}

fn stem_and_suffix(file_name: &str) -> (&str, String) {
    let path = Path::new(file_name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let suffix = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    (stem, suffix)
}

/// Selects every path in `all_filepaths` whose basename matches one of
/// `search_filenames`.
///
/// With [`MatchOptions::include_upsample_files`], a path also matches when its
/// basename starts with `<stem><upsample_prefix>` and ends with
/// `<upsample_ext><suffix>` for some searched `<stem><suffix>`. Results keep
/// the order of `all_filepaths`.
pub fn get_file_paths<S, P>(
    search_filenames: &[S],
    all_filepaths: &[P],
    options: &MatchOptions,
) -> Vec<String>
where
    S: AsRef<str>,
    P: AsRef<str>,
{
    let wanted: HashSet<&str> = search_filenames
        .iter()
        .map(|name| basename(name.as_ref()))
        .collect();

    let upsample_patterns: Vec<(String, String)> = if options.include_upsample_files {
        wanted
            .iter()
            .map(|name| {
                let (stem, suffix) = stem_and_suffix(name);
                (
                    format!("{stem}{}", options.upsample_prefix),
                    format!("{}{suffix}", options.upsample_ext),
                )
            })
            .collect()
    } else {
        Vec::new()
    };

    all_filepaths
        .iter()
        .map(AsRef::as_ref)
        .filter(|path| {
            let name = basename(path);
            wanted.contains(name)
                || upsample_patterns
                    .iter()
                    .any(|(prefix, ext)| name.starts_with(prefix.as_str()) && name.ends_with(ext.as_str()))
        })
        .map(str::to_string)
        .collect()
}
