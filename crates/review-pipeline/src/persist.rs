use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

const STAGING_SUFFIX: &str = "tmp";
const BACKUP_SUFFIX: &str = "bak";

/// Files written under a temporary name and renamed into place together on
/// [`StagedDir::commit`]. Dropping without committing removes the staged files.
///
/// A failed commit restores whatever the targets held before. A process
/// killed in the middle of a commit can still leave `*.bak` files behind.
#[derive(Debug)]
pub struct StagedDir {
    dir: PathBuf,
    pending: Vec<(PathBuf, PathBuf)>,
}

impl StagedDir {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;
        Ok(Self {
            dir,
            pending: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stage `name`, filling it through `fill`.
    pub fn write_with<F>(&mut self, name: &str, fill: F) -> Result<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> Result<()>,
    {
        let target = self.dir.join(name);
        let staged = self.dir.join(format!("{name}.{STAGING_SUFFIX}"));
        // Registered before writing so a failed write is cleaned up too.
        self.pending.push((staged.clone(), target));

        let file = File::create(&staged).map_err(|e| PipelineError::io(&staged, e))?;
        let mut writer = BufWriter::new(file);
        fill(&mut writer)?;
        writer.flush().map_err(|e| PipelineError::io(&staged, e))?;
        Ok(())
    }

    pub fn write_json<T: Serialize>(&mut self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        self.write_with(name, |w| {
            serde_json::to_writer_pretty(&mut *w, value)
                .map_err(|e| PipelineError::io(&path, e.into()))?;
            writeln!(w).map_err(|e| PipelineError::io(&path, e))
        })
    }

    /// One JSON document per line.
    pub fn write_jsonl<'a, T, I>(&mut self, name: &str, rows: I) -> Result<()>
    where
        T: Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let path = self.dir.join(name);
        self.write_with(name, |w| {
            for row in rows {
                serde_json::to_writer(&mut *w, row)
                    .map_err(|e| PipelineError::io(&path, e.into()))?;
                writeln!(w).map_err(|e| PipelineError::io(&path, e))?;
            }
            Ok(())
        })
    }

    /// Move every staged file to its final name. Existing targets are set
    /// aside first and put back if any rename fails.
    pub fn commit(mut self) -> Result<Vec<PathBuf>> {
        let mut backups = Vec::new();
        let mut written = Vec::with_capacity(self.pending.len());
        if let Err(err) = self.swap_in(&mut backups, &mut written) {
            roll_back(&backups, &written);
            // `pending` is left as is; Drop removes the staged files still there.
            return Err(err);
        }
        self.pending.clear();
        for (backup, _) in &backups {
            if let Err(err) = fs::remove_file(backup) {
                warn!("failed to remove backup {}: {err}", backup.display());
            }
        }
        for target in &written {
            debug!("wrote {}", target.display());
        }
        Ok(written)
    }

    fn swap_in(
        &self,
        backups: &mut Vec<(PathBuf, PathBuf)>,
        written: &mut Vec<PathBuf>,
    ) -> Result<()> {
        for (_, target) in &self.pending {
            if target.exists() {
                let backup = with_suffix(target, BACKUP_SUFFIX);
                fs::rename(target, &backup).map_err(|e| PipelineError::io(target, e))?;
                backups.push((backup, target.clone()));
            }
        }
        for (staged, target) in &self.pending {
            fs::rename(staged, target).map_err(|e| PipelineError::io(target, e))?;
            written.push(target.clone());
        }
        Ok(())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn roll_back(backups: &[(PathBuf, PathBuf)], written: &[PathBuf]) {
    for target in written.iter().rev() {
        if let Err(err) = fs::remove_file(target) {
            warn!("failed to remove partial output {}: {err}", target.display());
        }
    }
    for (backup, target) in backups.iter().rev() {
        if let Err(err) = fs::rename(backup, target) {
            warn!(
                "failed to restore {} from {}: {err}",
                target.display(),
                backup.display()
            );
        }
    }
}

impl Drop for StagedDir {
    fn drop(&mut self) {
        for (staged, _) in self.pending.drain(..) {
            if staged.exists() {
                if let Err(err) = fs::remove_file(&staged) {
                    warn!("failed to remove staged file {}: {err}", staged.display());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_is_visible_before_commit() {
        let dir = tempfile::tempdir().unwrap();
        let mut staged = StagedDir::new(dir.path()).unwrap();
        staged.write_json("a.json", &vec![1, 2, 3]).unwrap();
        assert!(!dir.path().join("a.json").exists());

        let written = staged.commit().unwrap();
        assert_eq!(written, [dir.path().join("a.json")]);
        let text = fs::read_to_string(dir.path().join("a.json")).unwrap();
        assert_eq!(serde_json::from_str::<Vec<u32>>(&text).unwrap(), [1, 2, 3]);
        assert!(!dir.path().join("a.json.tmp").exists());
    }

    #[test]
    fn dropping_discards_staged_files() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut staged = StagedDir::new(dir.path()).unwrap();
            staged.write_jsonl("rows.jsonl", &[1u32, 2]).unwrap();
            let err = staged.write_with("bad.json", |_| {
                Err(PipelineError::io("bad.json", std::io::Error::other("boom")))
            });
            assert!(err.is_err());
        }
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn commit_replaces_previous_outputs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "old").unwrap();
        let mut staged = StagedDir::new(dir.path()).unwrap();
        staged.write_json("a.json", &7u32).unwrap();
        staged.commit().unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a.json")).unwrap(), "7\n");
        assert!(!dir.path().join("a.json.bak").exists());
    }

    #[test]
    fn failed_commit_restores_previous_outputs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.json", "b.json"] {
            fs::write(dir.path().join(name), "old").unwrap();
        }
        let mut staged = StagedDir::new(dir.path()).unwrap();
        staged.write_json("a.json", &1u32).unwrap();
        staged.write_json("b.json", &2u32).unwrap();
        // The second rename fails once its staged file is gone.
        fs::remove_file(dir.path().join("b.json.tmp")).unwrap();
        assert!(staged.commit().is_err());

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["a.json", "b.json"]);
        for name in ["a.json", "b.json"] {
            assert_eq!(fs::read_to_string(dir.path().join(name)).unwrap(), "old");
        }
    }

    #[test]
    fn jsonl_writes_one_row_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut staged = StagedDir::new(dir.path()).unwrap();
        staged.write_jsonl("rows.jsonl", &[vec![1u32], vec![2, 3]]).unwrap();
        staged.commit().unwrap();
        let text = fs::read_to_string(dir.path().join("rows.jsonl")).unwrap();
        assert_eq!(text, "[1]\n[2,3]\n");
    }
}
