// src/merge.rs
//! Line-set union used between every pipeline stage.
//!
//! Both sources are read completely before the destination is touched, so the
//! destination may be one of the sources. Output lines are trimmed, non-blank,
//! unique and sorted byte-wise, one per line.

use crate::error::{IoContext, Result};
use log::debug;
use std::collections::BTreeSet;
use std::path::Path;
use tokio::fs;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Sorted, unique, blank-free form of the given byte blocks. Lines are keyed
/// by their exact bytes; only ASCII whitespace is trimmed.
pub fn normalize<'a, I>(blocks: I) -> BTreeSet<Vec<u8>>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    blocks
        .into_iter()
        .flat_map(|block| block.split(|&b| b == b'\n'))
        .map(trim_ascii)
        .filter(|line| !line.is_empty())
        .map(<[u8]>::to_vec)
        .collect()
}

fn trim_ascii(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &line[start..end]
}

/// Renders a line set as newline-terminated bytes.
pub fn render<T: AsRef<[u8]>>(lines: &BTreeSet<T>) -> Vec<u8> {
    let mut out = Vec::with_capacity(lines.iter().map(|l| l.as_ref().len() + 1).sum());
    for line in lines {
        out.extend_from_slice(line.as_ref());
        out.push(b'\n');
    }
    out
}

/// Merges `source_a` and `source_b` into `destination`, replacing whatever the
/// destination held. Returns the number of lines written.
pub async fn merge(source_a: &Path, source_b: &Path, destination: &Path) -> Result<usize> {
    debug!(
        "merging {} with {} and saving as {}",
        file_name(source_a),
        file_name(source_b),
        file_name(destination)
    );

    let a = fs::read(source_a).await.with_path(source_a)?;
    let b = if source_b == source_a {
        a.clone()
    } else {
        fs::read(source_b).await.with_path(source_b)?
    };

    let lines = normalize([a.as_slice(), b.as_slice()]);
    fs::write(destination, render(&lines)).await.with_path(destination)?;

    debug!("{}: {} unique lines", file_name(destination), lines.len());
    Ok(lines.len())
}

/// Whether two artifact paths name the same file.
pub fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[tokio::test]
    async fn test_merge_trims_sorts_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(&dir, "a", "www.example.com\n  api.example.com \n\n");
        let b = write(&dir, "b", "api.example.com\nmail.example.com\n   \n");
        let out = dir.path().join("out");

        let count = merge(&a, &b, &out).await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(read(&out), "api.example.com\nmail.example.com\nwww.example.com\n");
    }

    #[tokio::test]
    async fn test_merge_is_idempotent_on_self() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(&dir, "a", "b.example.com\n\na.example.com\nb.example.com\r\n");

        merge(&a, &a, &a).await.unwrap();
        assert_eq!(read(&a), "a.example.com\nb.example.com\n");

        merge(&a, &a, &a).await.unwrap();
        assert_eq!(read(&a), "a.example.com\nb.example.com\n");
    }

    #[tokio::test]
    async fn test_merge_content_is_commutative() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(&dir, "a", "zeta.example.com\nalpha.example.com\n");
        let b = write(&dir, "b", "mid.example.com\nalpha.example.com\n");
        let x = dir.path().join("x");
        let y = dir.path().join("y");

        merge(&a, &b, &x).await.unwrap();
        merge(&b, &a, &y).await.unwrap();
        assert_eq!(std::fs::read(&x).unwrap(), std::fs::read(&y).unwrap());
    }

    #[tokio::test]
    async fn test_self_merge_matches_merge_then_copy() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(&dir, "a", "c.example.com\na.example.com\n");
        let a_copy = write(&dir, "a_copy", "c.example.com\na.example.com\n");
        let b = write(&dir, "b", "b.example.com\nc.example.com\n");
        let c = dir.path().join("c");

        merge(&a, &b, &a).await.unwrap();
        merge(&a_copy, &b, &c).await.unwrap();
        assert_eq!(read(&a), read(&c));

        // destination aliasing the second source
        merge(&a_copy, &b, &b).await.unwrap();
        assert_eq!(read(&b), read(&c));
    }

    #[tokio::test]
    async fn test_merge_is_case_sensitive_and_bytewise() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(&dir, "a", "b.example.com\nB.example.com\n");
        let b = write(&dir, "b", "a.example.com\n");
        let out = dir.path().join("out");

        merge(&a, &b, &out).await.unwrap();
        assert_eq!(read(&out), "B.example.com\na.example.com\nb.example.com\n");
    }

    #[tokio::test]
    async fn test_merge_truncates_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(&dir, "a", "a.example.com\n");
        let b = write(&dir, "b", "");
        let out = write(&dir, "out", "stale.example.com\nmore.example.com\n");

        merge(&a, &b, &out).await.unwrap();
        assert_eq!(read(&out), "a.example.com\n");
    }

    #[tokio::test]
    async fn test_merge_fails_on_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(&dir, "a", "a.example.com\n");
        let missing = dir.path().join("missing");
        let out = dir.path().join("out");

        assert!(merge(&a, &missing, &out).await.is_err());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_empty_sources_produce_empty_destination() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(&dir, "a", "\n\n");
        let b = write(&dir, "b", "");
        let out = dir.path().join("out");

        assert_eq!(merge(&a, &b, &out).await.unwrap(), 0);
        assert_eq!(read(&out), "");
    }

    #[tokio::test]
    async fn test_merge_keeps_non_utf8_lines_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"x\xff.example.com\n").unwrap();
        std::fs::write(&b, b" x\xfe.example.com\r\nx\xff.example.com\n").unwrap();
        let out = dir.path().join("out");

        assert_eq!(merge(&a, &b, &out).await.unwrap(), 2);
        assert_eq!(
            std::fs::read(&out).unwrap(),
            b"x\xfe.example.com\nx\xff.example.com\n"
        );
    }

    #[test]
    fn test_normalize_trims_only_ascii_whitespace() {
        let lines = normalize([b"\t a.example.com \r\n\n\xc2\xa0b.example.com\n".as_slice()]);
        let expected: BTreeSet<Vec<u8>> = [
            b"a.example.com".to_vec(),
            b"\xc2\xa0b.example.com".to_vec(),
        ]
        .into_iter()
        .collect();
        assert_eq!(lines, expected);
    }

    #[test]
    fn test_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(&dir, "a", "");
        let dotted = dir.path().join(".").join("a");
        assert!(same_file(&a, &a));
        assert!(same_file(&a, &dotted));
        assert!(!same_file(&a, &dir.path().join("b")));
    }
}
