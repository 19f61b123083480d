use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// The UTF-8 byte-order mark some exporters put in front of CSV files.
const BOM: char = '\u{FEFF}';

/// Write a file, creating its parent directory first.
pub(crate) fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        make_dir(parent)?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("Unable to write to {}", path.to_string_lossy()))
}

/// Read a file to a `String`.
pub(crate) fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file at {}", path.display()))
}

/// Read a text file to a `String`, dropping a leading byte-order mark.
pub(crate) fn read_text(path: &Path) -> Result<String> {
    Ok(strip_bom(read(path)?))
}

pub(crate) fn strip_bom(mut content: String) -> String {
    if content.starts_with(BOM) {
        content.replace_range(..BOM.len_utf8(), "");
    }
    content
}

pub(crate) fn make_dir(p: &Path) -> Result<()> {
    if p.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(p)
        .with_context(|| format!("Unable to create directory at {}", p.to_string_lossy()))
}

/// Finds the single file in `dir` whose extension is `extension` (case-insensitive).
///
/// # Errors
/// - If `dir` cannot be read.
/// - If there is no such file, or more than one.
pub(crate) fn single_file_with_extension(dir: &Path, extension: &str) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Unable to read the input directory {}", dir.display()))?;
    let mut found = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Unable to read the input directory {}", dir.display()))?
            .path();
        let matches = path.is_file()
            && path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches {
            found.push(path);
        }
    }
    found.sort();
    match found.len() {
        0 => bail!(
            "No .{extension} files found in {}. Please specify an input file or place one \
            .{extension} file there.",
            dir.display()
        ),
        1 => Ok(found.remove(0)),
        n => bail!(
            "{n} .{extension} files found in {}. Please specify which file to convert.",
            dir.display()
        ),
    }
}
