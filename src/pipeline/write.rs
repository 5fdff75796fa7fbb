//! Artifact naming and writing.
//!
//! Files are written atomically: the bytes go to a uniquely named temp file
//! in the output directory which is then renamed over the target, so a
//! reader never sees a half-written PDF even when two records race for the
//! same name.

use crate::pipeline::template::artifact_file_name;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// What to do when two records in one run derive the same file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Last writer wins (default).
    #[default]
    Overwrite,
    /// Claim `name.pdf`, then `name_2.pdf`, `name_3.pdf`, … in completion
    /// order. Files left over from earlier runs are still overwritten.
    Suffix,
}

/// Resolves target paths for one batch run and writes the bytes.
#[derive(Debug)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
    policy: CollisionPolicy,
    claimed: Mutex<HashSet<String>>,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>, policy: CollisionPolicy) -> Self {
        Self {
            output_dir: output_dir.into(),
            policy,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// Target path for `record` under the configured policy.
    ///
    /// Under [`CollisionPolicy::Suffix`] this reserves the name; call it only
    /// once the bytes are ready and [`release`](Self::release) the path if
    /// the write then fails.
    pub fn target_path(&self, record: &Record) -> PathBuf {
        let file_name = artifact_file_name(record);
        let file_name = match self.policy {
            CollisionPolicy::Overwrite => file_name,
            CollisionPolicy::Suffix => self.claim(file_name),
        };
        self.output_dir.join(file_name)
    }

    fn claim(&self, file_name: String) -> String {
        let mut claimed = self
            .claimed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if claimed.insert(file_name.clone()) {
            return file_name;
        }

        let stem = file_name.strip_suffix(".pdf").unwrap_or(&file_name);
        let mut n = 2usize;
        loop {
            let candidate = format!("{stem}_{n}.pdf");
            if claimed.insert(candidate.clone()) {
                debug!("Name collision on {file_name}: using {candidate}");
                return candidate;
            }
            n += 1;
        }
    }

    /// Give a reserved name back so the next record with the same name can
    /// take it.
    pub fn release(&self, path: &Path) {
        if self.policy != CollisionPolicy::Suffix {
            return;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            self.claimed
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .remove(name);
        }
    }

    /// Write `bytes` to `path`, replacing any existing file. Blocking.
    pub fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let dir = path.parent().unwrap_or(&self.output_dir);
        let mut tmp = tempfile::Builder::new()
            .prefix(".pass2pdf-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: &str, seat: &str) -> Record {
        Record {
            passenger_name: name.into(),
            flight_number: "BA117".into(),
            seat: seat.into(),
            ..Default::default()
        }
    }

    #[test]
    fn overwrite_policy_reuses_the_name() {
        let w = ArtifactWriter::new("/out", CollisionPolicy::Overwrite);
        let a = w.target_path(&record("Ada Lovelace", "1A"));
        let b = w.target_path(&record("Ada Lovelace", "1A"));
        assert_eq!(a, b);
        assert_eq!(a, PathBuf::from("/out/Ada_Lovelace_BA117_1A.pdf"));
    }

    #[test]
    fn suffix_policy_disambiguates_in_claim_order() {
        let w = ArtifactWriter::new("/out", CollisionPolicy::Suffix);
        let names: Vec<PathBuf> = (0..3)
            .map(|_| w.target_path(&record("Ada Lovelace", "1A")))
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("/out/Ada_Lovelace_BA117_1A.pdf"),
                PathBuf::from("/out/Ada_Lovelace_BA117_1A_2.pdf"),
                PathBuf::from("/out/Ada_Lovelace_BA117_1A_3.pdf"),
            ]
        );
        // Distinct records are untouched.
        assert_eq!(
            w.target_path(&record("Bob", "2B")),
            PathBuf::from("/out/Bob_BA117_2B.pdf")
        );
    }

    #[test]
    fn released_name_is_handed_out_again() {
        let w = ArtifactWriter::new("/out", CollisionPolicy::Suffix);
        let first = w.target_path(&record("Ada Lovelace", "1A"));
        w.release(&first);
        assert_eq!(w.target_path(&record("Ada Lovelace", "1A")), first);
        assert_eq!(
            w.target_path(&record("Ada Lovelace", "1A")),
            PathBuf::from("/out/Ada_Lovelace_BA117_1A_2.pdf")
        );
    }

    #[test]
    fn write_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let w = ArtifactWriter::new(dir.path(), CollisionPolicy::Overwrite);
        let path = dir.path().join("x.pdf");
        w.write(&path, b"first").unwrap();
        w.write(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");

        // No temp files left behind.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");
        let w = ArtifactWriter::new(&missing, CollisionPolicy::Overwrite);
        assert!(w.write(&missing.join("x.pdf"), b"data").is_err());
    }
}
