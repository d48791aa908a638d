//! `buttons.json` repository.

use std::path::PathBuf;

use scenedeck_core::ids::{ButtonId, CategoryId, DEFAULT_CATEGORY_ID};
use scenedeck_core::model::{
    Button, ButtonDraft, ButtonPatch, DEFAULT_BUTTON_IMAGE, DEFAULT_CATEGORY_NAME,
};

use crate::errors::{Result, StoreError};
use crate::files::{read_json, write_json, write_json_if_missing};

/// File name inside the data directory.
pub const FILE_NAME: &str = "buttons.json";

/// Read-modify-write access to the button list.
#[derive(Clone, Debug)]
pub struct ButtonRepo {
    path: PathBuf,
}

impl ButtonRepo {
    /// Repository over the given file.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Write the two starter buttons if the file does not exist.
    pub fn seed_if_missing(&self) -> Result<()> {
        let _ = write_json_if_missing(&self.path, &seed_buttons())?;
        Ok(())
    }

    /// All buttons in file order.
    pub fn list(&self) -> Result<Vec<Button>> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    /// One button by id.
    pub fn get(&self, id: ButtonId) -> Result<Button> {
        self.list()?
            .into_iter()
            .find(|b| b.id == id)
            .ok_or(StoreError::NotFound { entity: "button", id })
    }

    /// Append a new button.
    pub fn create(&self, draft: ButtonDraft) -> Result<Button> {
        let mut buttons = self.list()?;
        let id = crate::next_id(buttons.iter().map(|b| b.id));
        let button = draft.into_button(id).map_err(|field| StoreError::Invalid {
            entity: "button",
            reason: format!("{field} is required"),
        })?;
        buttons.push(button.clone());
        write_json(&self.path, &buttons)?;
        Ok(button)
    }

    /// Apply a partial update to one button.
    pub fn update(&self, id: ButtonId, patch: &ButtonPatch) -> Result<Button> {
        let mut buttons = self.list()?;
        let button = buttons
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::NotFound { entity: "button", id })?;
        button.apply(patch);
        let updated = button.clone();
        write_json(&self.path, &buttons)?;
        Ok(updated)
    }

    /// Remove one button.
    pub fn delete(&self, id: ButtonId) -> Result<()> {
        let buttons = self.list()?;
        let before = buttons.len();
        let remaining: Vec<Button> = buttons.into_iter().filter(|b| b.id != id).collect();
        if remaining.len() == before {
            return Err(StoreError::NotFound { entity: "button", id });
        }
        write_json(&self.path, &remaining)
    }

    /// Move every button of category `from` to category `to`.
    pub fn reassign_category(&self, from: CategoryId, to: CategoryId) -> Result<usize> {
        let mut buttons = self.list()?;
        let mut moved = 0;
        for button in buttons
            .iter_mut()
            .filter(|b| b.category_id == Some(from))
        {
            button.category_id = Some(to);
            moved += 1;
        }
        if moved > 0 {
            write_json(&self.path, &buttons)?;
        }
        Ok(moved)
    }
}

fn seed_buttons() -> Vec<Button> {
    vec![
        Button {
            id: 1,
            name: "Main scene".into(),
            category: DEFAULT_CATEGORY_NAME.into(),
            category_id: Some(DEFAULT_CATEGORY_ID),
            button_order: None,
            scene: "Scene".into(),
            image: DEFAULT_BUTTON_IMAGE.into(),
            favorite: false,
        },
        Button {
            id: 2,
            name: "Shared screen".into(),
            category: DEFAULT_CATEGORY_NAME.into(),
            category_id: Some(DEFAULT_CATEGORY_ID),
            button_order: None,
            scene: "Desktop".into(),
            image: DEFAULT_BUTTON_IMAGE.into(),
            favorite: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn repo() -> (tempfile::TempDir, ButtonRepo) {
        let dir = tempfile::tempdir().unwrap();
        let repo = ButtonRepo::new(dir.path().join(FILE_NAME));
        repo.seed_if_missing().unwrap();
        (dir, repo)
    }

    fn draft(name: &str, scene: &str) -> ButtonDraft {
        ButtonDraft {
            name: Some(name.into()),
            scene: Some(scene.into()),
            ..ButtonDraft::default()
        }
    }

    #[test]
    fn seed_has_two_buttons() {
        let (_dir, repo) = repo();
        let scenes: Vec<_> = repo.list().unwrap().into_iter().map(|b| b.scene).collect();
        assert_eq!(scenes, vec!["Scene", "Desktop"]);
    }

    #[test]
    fn create_appends_with_fresh_id() {
        let (_dir, repo) = repo();
        let created = repo.create(draft("Intro", "Intro")).unwrap();
        assert!(created.id > 2);
        let all = repo.list().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.last().unwrap().id, created.id);
    }

    #[test]
    fn create_rejects_missing_scene() {
        let (_dir, repo) = repo();
        let err = repo
            .create(ButtonDraft {
                name: Some("x".into()),
                ..ButtonDraft::default()
            })
            .unwrap_err();
        assert_matches!(err, StoreError::Invalid { entity: "button", .. });
        assert_eq!(repo.list().unwrap().len(), 2);
    }

    #[test]
    fn update_merges_fields() {
        let (_dir, repo) = repo();
        let updated = repo
            .update(
                1,
                &ButtonPatch {
                    name: Some("Camera".into()),
                    favorite: Some(true),
                    ..ButtonPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Camera");
        assert_eq!(updated.scene, "Scene");
        assert!(repo.get(1).unwrap().favorite);
    }

    #[test]
    fn update_unknown_id() {
        let (_dir, repo) = repo();
        assert_matches!(
            repo.update(999, &ButtonPatch::default()),
            Err(StoreError::NotFound { id: 999, .. })
        );
    }

    #[test]
    fn delete_removes_button() {
        let (_dir, repo) = repo();
        repo.delete(2).unwrap();
        assert_eq!(repo.list().unwrap().len(), 1);
        assert_matches!(repo.delete(2), Err(StoreError::NotFound { .. }));
    }

    #[test]
    fn button_order_survives_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        std::fs::write(
            &path,
            r#"[{"id":1,"name":"Main","category":"General","categoryId":1,"scene":"Scene","image":"/images/default.svg","favorite":false,"buttonOrder":3}]"#,
        )
        .unwrap();
        let repo = ButtonRepo::new(path.clone());

        let draft: ButtonDraft =
            serde_json::from_str(r#"{"name":"Intro","scene":"Intro","buttonOrder":2}"#).unwrap();
        let created = repo.create(draft).unwrap();
        assert_eq!(created.button_order, Some(2));

        let _ = repo.reassign_category(1, 5).unwrap();
        let _ = repo
            .update(
                created.id,
                &ButtonPatch {
                    favorite: Some(true),
                    ..ButtonPatch::default()
                },
            )
            .unwrap();

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk[0]["buttonOrder"], 3);
        assert_eq!(on_disk[1]["buttonOrder"], 2);
    }

    #[test]
    fn missing_file_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ButtonRepo::new(dir.path().join(FILE_NAME));
        assert!(repo.list().unwrap().is_empty());
    }
}
