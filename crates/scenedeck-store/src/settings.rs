//! `settings.json` repository and the password source.

use std::path::PathBuf;

use async_trait::async_trait;
use scenedeck_core::CredentialSource;
use scenedeck_core::model::{AppSettings, SettingsPatch};

use crate::errors::Result;
use crate::files::{read_json, write_json, write_json_if_missing};

/// File name inside the data directory.
pub const FILE_NAME: &str = "settings.json";

/// Outcome of a settings update.
#[derive(Clone, Debug)]
pub struct SettingsUpdate {
    /// Settings as written.
    pub settings: AppSettings,
    /// Whether the OBS password changed (the caller should reconnect).
    pub password_changed: bool,
}

/// Read-modify-write access to the app settings.
#[derive(Clone, Debug)]
pub struct SettingsRepo {
    path: PathBuf,
}

impl SettingsRepo {
    /// Repository over the given file.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Write default settings if the file does not exist.
    pub fn seed_if_missing(&self) -> Result<()> {
        let _ = write_json_if_missing(&self.path, &AppSettings::default())?;
        Ok(())
    }

    /// Current settings; a missing file yields defaults.
    pub fn load(&self) -> Result<AppSettings> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    /// Apply a partial update and persist it.
    pub fn update(&self, patch: &SettingsPatch) -> Result<SettingsUpdate> {
        let mut settings = self.load()?;
        let password_changed = settings.apply(patch);
        write_json(&self.path, &settings)?;
        Ok(SettingsUpdate {
            settings,
            password_changed,
        })
    }
}

#[async_trait]
impl CredentialSource for SettingsRepo {
    async fn password(&self) -> Option<String> {
        match self.load() {
            Ok(settings) => settings.password().map(ToString::to_string),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read settings, connecting without password");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> (tempfile::TempDir, SettingsRepo) {
        let dir = tempfile::tempdir().unwrap();
        let repo = SettingsRepo::new(dir.path().join(FILE_NAME));
        repo.seed_if_missing().unwrap();
        (dir, repo)
    }

    #[test]
    fn seed_has_default_title_and_no_password() {
        let (_dir, repo) = repo();
        let s = repo.load().unwrap();
        assert_eq!(s.app_title, "OBS Controller");
        assert!(s.password().is_none());
    }

    #[test]
    fn update_reports_password_change() {
        let (_dir, repo) = repo();
        let out = repo
            .update(&SettingsPatch {
                app_title: Some("Studio A".into()),
                obs_password: Some("s3cret".into()),
            })
            .unwrap();
        assert!(out.password_changed);
        assert_eq!(out.settings.app_title, "Studio A");

        let again = repo
            .update(&SettingsPatch {
                app_title: Some("Studio B".into()),
                obs_password: None,
            })
            .unwrap();
        assert!(!again.password_changed);
        assert_eq!(repo.load().unwrap().obs_password, "s3cret");
    }

    #[tokio::test]
    async fn credential_source_reads_latest_password() {
        let (_dir, repo) = repo();
        assert_eq!(repo.password().await, None);
        let _ = repo
            .update(&SettingsPatch {
                obs_password: Some("pw".into()),
                ..SettingsPatch::default()
            })
            .unwrap();
        assert_eq!(repo.password().await.as_deref(), Some("pw"));
    }

    #[tokio::test]
    async fn credential_source_survives_corrupt_file() {
        let (dir, repo) = repo();
        std::fs::write(dir.path().join(FILE_NAME), "{oops").unwrap();
        assert_eq!(repo.password().await, None);
    }
}
