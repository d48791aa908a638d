//! # scenedeck-store
//!
//! Read-modify-write persistence over three JSON files in the data directory:
//!
//! - `buttons.json`: [`ButtonRepo`]
//! - `categories.json`: [`CategoryRepo`]
//! - `settings.json`: [`SettingsRepo`], also the [`CredentialSource`] the
//!   connection supervisor reads the password from
//!
//! Files are created with seed content by [`DataStore::open`]. There is no
//! locking: concurrent writers race and the last write wins.
//!
//! [`CredentialSource`]: scenedeck_core::CredentialSource

#![deny(unsafe_code)]

pub mod buttons;
pub mod categories;
pub mod errors;
pub mod files;
pub mod settings;

pub use buttons::ButtonRepo;
pub use categories::CategoryRepo;
pub use errors::{Result, StoreError};
pub use settings::SettingsRepo;

use std::path::{Path, PathBuf};

use scenedeck_core::ids::CategoryId;

/// All repositories rooted at one data directory.
#[derive(Clone, Debug)]
pub struct DataStore {
    dir: PathBuf,
    /// Buttons.
    pub buttons: ButtonRepo,
    /// Categories.
    pub categories: CategoryRepo,
    /// App settings.
    pub settings: SettingsRepo,
}

impl DataStore {
    /// Open the data directory, creating it and any missing file with seed content.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let store = Self {
            buttons: ButtonRepo::new(dir.join(buttons::FILE_NAME)),
            categories: CategoryRepo::new(dir.join(categories::FILE_NAME)),
            settings: SettingsRepo::new(dir.join(settings::FILE_NAME)),
            dir,
        };
        store.buttons.seed_if_missing()?;
        store.categories.seed_if_missing()?;
        store.settings.seed_if_missing()?;
        tracing::debug!(dir = %store.dir.display(), "data store ready");
        Ok(store)
    }

    /// The data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Delete a category and move its buttons to the default category.
    ///
    /// Returns how many buttons were moved.
    pub fn delete_category(&self, id: CategoryId) -> Result<usize> {
        self.categories.delete(id)?;
        self.buttons
            .reassign_category(id, scenedeck_core::ids::DEFAULT_CATEGORY_ID)
    }
}

/// A fresh id: the current time in epoch milliseconds, bumped past `existing`.
pub(crate) fn next_id(existing: impl Iterator<Item = u64>) -> u64 {
    let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
    let max = existing.max().unwrap_or(0);
    now.max(max.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenedeck_core::model::{ButtonDraft, CategoryDraft};

    #[test]
    fn open_seeds_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::open(dir.path().join("data")).unwrap();

        assert!(store.dir().join("buttons.json").exists());
        assert!(store.dir().join("categories.json").exists());
        assert!(store.dir().join("settings.json").exists());
        assert_eq!(store.buttons.list().unwrap().len(), 2);
        assert_eq!(store.categories.list().unwrap().len(), 1);
    }

    #[test]
    fn open_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("buttons.json"), "[]").unwrap();
        let store = DataStore::open(dir.path()).unwrap();
        assert!(store.buttons.list().unwrap().is_empty());
    }

    #[test]
    fn delete_category_moves_buttons_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::open(dir.path()).unwrap();
        let cat = store
            .categories
            .create(CategoryDraft {
                name: Some("Cameras".into()),
                order: Some(1),
            })
            .unwrap();
        let button = store
            .buttons
            .create(ButtonDraft {
                name: Some("Cam 1".into()),
                scene: Some("Cam1".into()),
                category_id: Some(cat.id),
                ..ButtonDraft::default()
            })
            .unwrap();

        let moved = store.delete_category(cat.id).unwrap();
        assert_eq!(moved, 1);
        let reloaded = store.buttons.get(button.id).unwrap();
        assert_eq!(reloaded.category_id, Some(scenedeck_core::ids::DEFAULT_CATEGORY_ID));
    }

    #[test]
    fn next_id_is_past_existing() {
        let far_future = u64::MAX / 2;
        assert_eq!(next_id([1, far_future].into_iter()), far_future + 1);
        assert!(next_id(std::iter::empty()) > 1_600_000_000_000);
    }
}
