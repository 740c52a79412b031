use anyhow::{Context, Result};
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

pub fn validate_tsv_or_csv_file(path: &str) -> Result<()> {
    let pb = PathBuf::from(path);

    let ext = pb
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("tsv") | Some("csv") => {}
        _ => anyhow::bail!("File must have a .tsv or .csv extension: {}", path),
    }

    if !pb.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }

    Ok(())
}

/// Write `contents` to `path`, or to stdout when no path is given.
pub fn write_text_output(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            file.write_all(contents.as_bytes())?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(contents.as_bytes())?;
        }
    }
    Ok(())
}
