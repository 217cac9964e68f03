use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use jumpkit_core::{
    Result,
    profiles::{Profile, ProfileDraft},
    registry::merge,
    seed::default_seed,
};

pub const DATA_FILE_NAME: &str = "servers.json";

#[derive(Clone, Debug)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(data_dir: &Path) -> Self {
        let path = data_dir.join(DATA_FILE_NAME);
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Profile>> {
        Ok(self
            .read()?
            .map(|(_, profiles)| profiles)
            .unwrap_or_default())
    }

    /// Like `load`, but writes the starter set when there is no file and
    /// rewrites a file whose records normalization changed, so generated ids
    /// stay stable across runs.
    pub fn load_or_seed(&self) -> Result<Vec<Profile>> {
        match self.read()? {
            Some((raw, profiles)) => {
                if serde_json::to_value(&profiles)? != raw {
                    tracing::info!(path = %self.path.display(), "Rewriting normalized profiles");
                    self.save(&profiles)?;
                }
                Ok(profiles)
            }
            None => {
                let seed = default_seed();
                tracing::info!(path = %self.path.display(), "Writing starter profiles");
                self.save(&seed)?;
                Ok(seed)
            }
        }
    }

    pub fn save(&self, profiles: &[Profile]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(profiles)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), count = profiles.len(), "Saved profiles");
        Ok(())
    }

    fn read(&self) -> Result<Option<(serde_json::Value, Vec<Profile>)>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };
        let raw: serde_json::Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        let drafts: Vec<ProfileDraft> = serde_json::from_value(raw.clone())
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(Some((raw, merge(drafts))))
    }
}

#[cfg(test)]
mod tests {
    use jumpkit_core::profiles::ProfileKind;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());

        assert!(store.load().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn load_or_seed_writes_the_seed_once() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());

        assert_eq!(store.load_or_seed().unwrap(), default_seed());
        assert!(store.path().exists());

        store.save(&default_seed()[..1]).unwrap();
        assert_eq!(store.load_or_seed().unwrap().len(), 1);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(&dir.path().join("nested"));

        store.save(&default_seed()).unwrap();

        assert_eq!(store.load().unwrap(), default_seed());
    }

    #[test]
    fn saved_records_omit_fields_of_the_other_kind() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        store.save(&default_seed()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let rdp = &raw[0];
        let ssh = &raw[1];

        assert_eq!(rdp["kind"], "rdp");
        assert!(rdp.get("port").is_none());
        assert!(rdp.get("username").is_none());
        assert!(rdp.get("password").is_none());
        assert_eq!(ssh["kind"], "ssh");
        assert!(ssh.get("rdpUsername").is_none());
        assert!(ssh.get("rdpFullscreen").is_none());
        assert_eq!(ssh["note"], "");
    }

    #[test]
    fn loading_cleans_up_hand_edited_files() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        fs::write(
            store.path(),
            r#"[
                {"id": "1", "name": "A", "kind": "ssh", "host": "Alpha", "port": "2200", "rdpAdmin": true},
                {"id": "2", "name": "B", "kind": "vnc", "host": "beta"},
                {"id": "3", "name": "A2", "kind": "ssh", "host": "alpha", "note": null}
            ]"#,
        )
        .unwrap();

        let profiles = store.load().unwrap();

        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "A2");
        assert_eq!(profiles[0].kind(), ProfileKind::Ssh);
        assert_eq!(profiles[0].note, "");
    }

    #[test]
    fn generated_ids_survive_the_next_load() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        fs::write(
            store.path(),
            r#"[{"name": "A", "kind": "ssh", "host": "alpha"}, {"name": "B", "kind": "vnc", "host": "b"}]"#,
        )
        .unwrap();

        let first = store.load_or_seed().unwrap();
        let second = store.load_or_seed().unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert_eq!(store.load().unwrap(), first);
    }

    #[test]
    fn clean_files_are_not_rewritten() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        store.save(&default_seed()).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();
        fs::write(store.path(), before.replace("\n", "\r\n")).unwrap();

        store.load_or_seed().unwrap();

        assert!(fs::read_to_string(store.path()).unwrap().contains("\r\n"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        fs::write(store.path(), "{not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
