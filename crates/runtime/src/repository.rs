//! File-based save-game repository.
//!
//! Stores [`SaveGame`] snapshots as individual bincode files indexed by a
//! caller-chosen slot name. Writes go to a temp file first and land with an
//! atomic rename, so a crash mid-save never corrupts an existing slot. A
//! failed load returns an error and touches nothing; the caller's
//! in-memory session stays authoritative.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::session::SaveGame;

/// Errors surfaced by the save repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("no save in slot `{0}`")]
    SlotNotFound(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// File-based save-game store, one `.sav` file per slot.
pub struct FileSaveRepository {
    base_dir: PathBuf,
}

impl FileSaveRepository {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.base_dir.join(format!("{slot}.sav"))
    }

    /// Writes a snapshot to `slot`, replacing any previous save atomically.
    pub fn save(&self, slot: &str, save: &SaveGame) -> Result<()> {
        let path = self.slot_path(slot);
        let temp_path = path.with_extension("sav.tmp");

        let bytes =
            bincode::serialize(save).map_err(|e| RepositoryError::Encoding(e.to_string()))?;
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        tracing::info!(slot, path = %path.display(), "saved game");
        Ok(())
    }

    /// Reads the snapshot in `slot`.
    pub fn load(&self, slot: &str) -> Result<SaveGame> {
        let path = self.slot_path(slot);
        if !path.exists() {
            return Err(RepositoryError::SlotNotFound(slot.to_owned()));
        }

        let bytes = fs::read(&path)?;
        let save: SaveGame = bincode::deserialize(&bytes).map_err(|e| {
            tracing::error!(slot, error = %e, "save slot failed to decode");
            RepositoryError::Encoding(e.to_string())
        })?;

        tracing::info!(slot, path = %path.display(), "loaded game");
        Ok(save)
    }

    pub fn exists(&self, slot: &str) -> bool {
        self.slot_path(slot).exists()
    }

    pub fn delete(&self, slot: &str) -> Result<()> {
        let path = self.slot_path(slot);
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::info!(slot, "deleted save");
        }
        Ok(())
    }

    /// Slot names of every save in the store, sorted.
    pub fn list_slots(&self) -> Result<Vec<String>> {
        let mut slots = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if let Some(name) = path.file_name().and_then(|s| s.to_str())
                && let Some(slot) = name.strip_suffix(".sav")
            {
                slots.push(slot.to_owned());
            }
        }
        slots.sort_unstable();
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, SessionConfig};

    fn sample_save() -> SaveGame {
        let (session, _) = Session::new(SessionConfig {
            num_players: 4,
            territory_count: 12,
            continents: Vec::new(),
            seed: Some(3),
        })
        .unwrap();
        session.snapshot()
    }

    #[test]
    fn save_then_load_returns_the_same_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileSaveRepository::new(dir.path()).unwrap();
        let save = sample_save();

        repo.save("autosave", &save).unwrap();
        assert!(repo.exists("autosave"));
        let loaded = repo.load("autosave").unwrap();
        assert_eq!(loaded, save);
    }

    #[test]
    fn missing_slot_is_reported_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileSaveRepository::new(dir.path()).unwrap();
        assert!(matches!(
            repo.load("nope"),
            Err(RepositoryError::SlotNotFound(slot)) if slot == "nope"
        ));
    }

    #[test]
    fn corrupt_bytes_fail_to_decode_without_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileSaveRepository::new(dir.path()).unwrap();
        fs::write(dir.path().join("bad.sav"), b"not a save").unwrap();
        assert!(matches!(
            repo.load("bad"),
            Err(RepositoryError::Encoding(_))
        ));
    }

    #[test]
    fn overwrite_replaces_the_previous_save() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileSaveRepository::new(dir.path()).unwrap();
        let save = sample_save();
        repo.save("slot", &save).unwrap();

        let mut newer = save.clone();
        newer.blocks.truncate(2);
        repo.save("slot", &newer).unwrap();
        assert_eq!(repo.load("slot").unwrap(), newer);
        // The temp file never lingers after a completed save.
        assert!(!dir.path().join("slot.sav.tmp").exists());
    }

    #[test]
    fn slots_are_listed_sorted_and_deletable() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileSaveRepository::new(dir.path()).unwrap();
        let save = sample_save();
        repo.save("beta", &save).unwrap();
        repo.save("alpha", &save).unwrap();
        assert_eq!(repo.list_slots().unwrap(), ["alpha", "beta"]);

        repo.delete("beta").unwrap();
        assert_eq!(repo.list_slots().unwrap(), ["alpha"]);
        repo.delete("beta").unwrap();
    }
}
