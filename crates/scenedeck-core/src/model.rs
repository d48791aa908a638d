//! Persisted records: buttons, categories and app settings.
//!
//! Field names are camelCase on the wire and on disk. Partial updates follow
//! the dashboard's form semantics: an absent or empty string keeps the current
//! value, except the OBS password which may be cleared with `""`.

use serde::{Deserialize, Serialize};

use crate::ids::{ButtonId, CategoryId, DEFAULT_CATEGORY_ID};

/// Image shown on buttons that have none.
pub const DEFAULT_BUTTON_IMAGE: &str = "/images/default.svg";

/// Category label written on buttons that have none.
pub const DEFAULT_CATEGORY_NAME: &str = "General";

/// Position given to buttons without an explicit order.
pub const UNORDERED_BUTTON_POSITION: i64 = 999;

/// Default dashboard title.
pub const DEFAULT_APP_TITLE: &str = "OBS Controller";

/// A dashboard button that switches to one scene.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    /// Unique id.
    pub id: ButtonId,
    /// Label shown on the button.
    pub name: String,
    /// Legacy free-text category label.
    #[serde(default = "default_category_name")]
    pub category: String,
    /// Category the button is grouped under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    /// Position within its category; unset or `0` sorts last.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_order: Option<i64>,
    /// Scene the button switches to.
    pub scene: String,
    /// Image path or URL.
    #[serde(default = "default_image")]
    pub image: String,
    /// Whether the button is pinned to the favorites strip.
    #[serde(default)]
    pub favorite: bool,
}

impl Button {
    /// Category used for grouping, falling back to the default category.
    pub fn effective_category(&self) -> CategoryId {
        self.category_id.unwrap_or(DEFAULT_CATEGORY_ID)
    }

    /// Sort position within the category.
    pub fn position(&self) -> i64 {
        self.button_order
            .filter(|order| *order != 0)
            .unwrap_or(UNORDERED_BUTTON_POSITION)
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &ButtonPatch) {
        if let Some(name) = non_empty(patch.name.as_deref()) {
            self.name = name.to_string();
        }
        if let Some(category) = non_empty(patch.category.as_deref()) {
            self.category = category.to_string();
        } else if self.category.is_empty() {
            self.category = DEFAULT_CATEGORY_NAME.to_string();
        }
        if patch.category_id.is_some() {
            self.category_id = patch.category_id;
        }
        if patch.button_order.is_some() {
            self.button_order = patch.button_order;
        }
        if let Some(scene) = non_empty(patch.scene.as_deref()) {
            self.scene = scene.to_string();
        }
        if let Some(image) = non_empty(patch.image.as_deref()) {
            self.image = image.to_string();
        }
        if let Some(favorite) = patch.favorite {
            self.favorite = favorite;
        }
    }
}

/// Body of `POST /api/buttons`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ButtonDraft {
    /// Label (required).
    pub name: Option<String>,
    /// Legacy category label.
    pub category: Option<String>,
    /// Category id.
    pub category_id: Option<CategoryId>,
    /// Position within the category.
    pub button_order: Option<i64>,
    /// Target scene (required).
    pub scene: Option<String>,
    /// Image path.
    pub image: Option<String>,
    /// Favorite flag.
    pub favorite: Option<bool>,
}

impl ButtonDraft {
    /// Turn the draft into a button, or name the first missing required field.
    pub fn into_button(self, id: ButtonId) -> Result<Button, &'static str> {
        let name = non_empty(self.name.as_deref()).ok_or("name")?.to_string();
        let scene = non_empty(self.scene.as_deref()).ok_or("scene")?.to_string();
        Ok(Button {
            id,
            name,
            category: non_empty(self.category.as_deref())
                .unwrap_or(DEFAULT_CATEGORY_NAME)
                .to_string(),
            category_id: self.category_id,
            button_order: self.button_order,
            scene,
            image: non_empty(self.image.as_deref())
                .unwrap_or(DEFAULT_BUTTON_IMAGE)
                .to_string(),
            favorite: self.favorite.unwrap_or(false),
        })
    }
}

/// Body of `PUT /api/buttons/{id}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ButtonPatch {
    /// New label.
    pub name: Option<String>,
    /// New legacy category label.
    pub category: Option<String>,
    /// New category id.
    pub category_id: Option<CategoryId>,
    /// New position within the category.
    pub button_order: Option<i64>,
    /// New target scene.
    pub scene: Option<String>,
    /// New image path.
    pub image: Option<String>,
    /// New favorite flag.
    pub favorite: Option<bool>,
}

/// A named group of buttons.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Unique id.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// Sort key; ties are broken by name.
    #[serde(default)]
    pub order: i64,
}

/// Body of `POST /api/categories` and `PUT /api/categories/{id}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryDraft {
    /// Display name (required on create).
    pub name: Option<String>,
    /// Sort key.
    pub order: Option<i64>,
}

/// Sort categories the way the dashboard lists them: by `order`, then by name.
pub fn sort_categories(categories: &mut [Category]) {
    categories.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
}

/// Sort buttons the way the dashboard shows them inside a category: by
/// [`Button::position`], then by name.
pub fn sort_buttons(buttons: &mut [Button]) {
    buttons.sort_by(|a, b| {
        a.position()
            .cmp(&b.position())
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// User-editable settings stored in `settings.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Dashboard title.
    #[serde(default = "default_app_title")]
    pub app_title: String,
    /// Password for the control endpoint; empty means no authentication.
    #[serde(default)]
    pub obs_password: String,
    /// Keys this version does not know about, preserved on write.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_title: DEFAULT_APP_TITLE.to_string(),
            obs_password: String::new(),
            extra: serde_json::Map::new(),
        }
    }
}

impl AppSettings {
    /// The password to authenticate with, if one is set.
    pub fn password(&self) -> Option<&str> {
        non_empty(Some(&self.obs_password))
    }

    /// Apply a partial update. Returns `true` when the password changed.
    pub fn apply(&mut self, patch: &SettingsPatch) -> bool {
        if let Some(title) = non_empty(patch.app_title.as_deref()) {
            self.app_title = title.to_string();
        }
        match &patch.obs_password {
            Some(password) if *password != self.obs_password => {
                self.obs_password.clone_from(password);
                true
            }
            _ => false,
        }
    }
}

/// Body of `PUT /api/settings`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    /// New title; empty keeps the current one.
    pub app_title: Option<String>,
    /// New password; `""` clears it.
    pub obs_password: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn default_category_name() -> String {
    DEFAULT_CATEGORY_NAME.to_string()
}

fn default_image() -> String {
    DEFAULT_BUTTON_IMAGE.to_string()
}

fn default_app_title() -> String {
    DEFAULT_APP_TITLE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button() -> Button {
        Button {
            id: 7,
            name: "Intro".into(),
            category: "General".into(),
            category_id: None,
            button_order: None,
            scene: "Intro".into(),
            image: DEFAULT_BUTTON_IMAGE.into(),
            favorite: false,
        }
    }

    #[test]
    fn draft_requires_name_and_scene() {
        let missing_name = ButtonDraft {
            scene: Some("Scene".into()),
            ..ButtonDraft::default()
        };
        assert_eq!(missing_name.into_button(1).unwrap_err(), "name");

        let missing_scene = ButtonDraft {
            name: Some("Main".into()),
            scene: Some(String::new()),
            ..ButtonDraft::default()
        };
        assert_eq!(missing_scene.into_button(1).unwrap_err(), "scene");
    }

    #[test]
    fn draft_fills_defaults() {
        let draft = ButtonDraft {
            name: Some("Main".into()),
            scene: Some("Scene".into()),
            ..ButtonDraft::default()
        };
        let button = draft.into_button(42).unwrap();
        assert_eq!(button.id, 42);
        assert_eq!(button.category, DEFAULT_CATEGORY_NAME);
        assert_eq!(button.image, DEFAULT_BUTTON_IMAGE);
        assert!(!button.favorite);
        assert_eq!(button.effective_category(), DEFAULT_CATEGORY_ID);
    }

    #[test]
    fn patch_keeps_values_for_empty_fields() {
        let mut b = button();
        b.apply(&ButtonPatch {
            name: Some(String::new()),
            scene: Some("Outro".into()),
            favorite: Some(true),
            ..ButtonPatch::default()
        });
        assert_eq!(b.name, "Intro");
        assert_eq!(b.scene, "Outro");
        assert!(b.favorite);
    }

    #[test]
    fn patch_moves_category() {
        let mut b = button();
        b.apply(&ButtonPatch {
            category_id: Some(3),
            ..ButtonPatch::default()
        });
        assert_eq!(b.effective_category(), 3);
    }

    #[test]
    fn button_deserializes_legacy_record() {
        let b: Button =
            serde_json::from_str(r#"{"id":1,"name":"Main","scene":"Scene"}"#).unwrap();
        assert_eq!(b.category, DEFAULT_CATEGORY_NAME);
        assert_eq!(b.image, DEFAULT_BUTTON_IMAGE);
        assert!(b.category_id.is_none());
    }

    #[test]
    fn button_order_round_trips_and_patches() {
        let mut b: Button = serde_json::from_str(
            r#"{"id":1,"name":"Main","scene":"Scene","buttonOrder":3}"#,
        )
        .unwrap();
        assert_eq!(b.button_order, Some(3));

        b.apply(&ButtonPatch {
            button_order: Some(1),
            ..ButtonPatch::default()
        });
        assert_eq!(serde_json::to_value(&b).unwrap()["buttonOrder"], 1);

        // absent field stays absent on disk
        let plain = button();
        assert!(serde_json::to_value(&plain).unwrap().get("buttonOrder").is_none());
    }

    #[test]
    fn buttons_sort_by_order_then_name() {
        let mut a = button();
        a.id = 1;
        a.name = "Zoom".into();
        a.button_order = Some(2);
        let mut b = button();
        b.id = 2;
        b.name = "Alpha".into();
        let mut c = button();
        c.id = 3;
        c.name = "Wide".into();
        c.button_order = Some(0);
        let mut d = button();
        d.id = 4;
        d.name = "Close".into();
        d.button_order = Some(1);

        let mut buttons = vec![a, b, c, d];
        sort_buttons(&mut buttons);
        let ids: Vec<_> = buttons.iter().map(|b| b.id).collect();
        // unset and 0 both sort last, then by name
        assert_eq!(ids, vec![4, 1, 2, 3]);
    }

    #[test]
    fn categories_sort_by_order_then_name() {
        let mut cats = vec![
            Category { id: 3, name: "Zeta".into(), order: 1 },
            Category { id: 2, name: "Alpha".into(), order: 1 },
            Category { id: 1, name: "General".into(), order: 0 },
        ];
        sort_categories(&mut cats);
        let ids: Vec<_> = cats.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn settings_patch_reports_password_change() {
        let mut s = AppSettings::default();
        assert!(s.password().is_none());

        assert!(s.apply(&SettingsPatch {
            obs_password: Some("hunter2".into()),
            ..SettingsPatch::default()
        }));
        assert_eq!(s.password(), Some("hunter2"));

        // same password again is not a change
        assert!(!s.apply(&SettingsPatch {
            obs_password: Some("hunter2".into()),
            ..SettingsPatch::default()
        }));
    }

    #[test]
    fn settings_patch_keeps_title_when_empty() {
        let mut s = AppSettings::default();
        let changed = s.apply(&SettingsPatch {
            app_title: Some(String::new()),
            obs_password: None,
        });
        assert!(!changed);
        assert_eq!(s.app_title, DEFAULT_APP_TITLE);
    }

    #[test]
    fn settings_preserve_unknown_keys() {
        let s: AppSettings =
            serde_json::from_str(r#"{"appTitle":"Deck","obsPassword":"","theme":"dark"}"#)
                .unwrap();
        let back = serde_json::to_value(&s).unwrap();
        assert_eq!(back["theme"], "dark");
        assert_eq!(back["appTitle"], "Deck");
    }
}
