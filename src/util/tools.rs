//! Locating the external demultiplexers named in the configuration.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Paths are checked as given; bare names are searched on PATH.
pub fn resolve_bin(bin: &Path) -> Result<PathBuf> {
    if bin.components().count() > 1 || bin.is_absolute() {
        if bin.exists() {
            Ok(bin.to_path_buf())
        } else {
            Err(anyhow!("{} not found", bin.display()))
        }
    } else {
        which::which(bin).with_context(|| format!("{} not found in PATH", bin.display()))
    }
}

/// First non-empty line a tool prints for `--version`. bcl2fastq reports on stderr.
pub fn get_version(bin: &Path) -> Result<String> {
    let output = Command::new(bin)
        .arg("--version")
        .output()
        .with_context(|| format!("spawn {} --version", bin.display()))?;

    let first_line = |bytes: &[u8]| {
        String::from_utf8_lossy(bytes)
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(String::from)
    };
    first_line(&output.stdout)
        .or_else(|| first_line(&output.stderr))
        .ok_or_else(|| anyhow!("{} --version produced no output", bin.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_explicit_path_is_reported() {
        let err = resolve_bin(Path::new("/definitely/not/here/bcl2fastq")).unwrap_err();
        assert!(err.to_string().contains("bcl2fastq"));
    }

    #[test]
    fn missing_bare_name_is_reported() {
        let err = resolve_bin(Path::new("no-such-demultiplexer-xyz")).unwrap_err();
        assert!(err.to_string().contains("not found in PATH"));
    }
}
