use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

/// Writes `content` next to `path` first and renames it into place, so
/// readers only ever see the old file or the complete new one.
pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(directory)?;
    staged.write_all(normalize_text_artifact(content).as_bytes())?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|error| error.error)?;
    Ok(())
}
