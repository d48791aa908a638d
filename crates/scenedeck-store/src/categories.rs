//! `categories.json` repository.

use std::path::PathBuf;

use scenedeck_core::ids::{CategoryId, DEFAULT_CATEGORY_ID};
use scenedeck_core::model::{Category, CategoryDraft, DEFAULT_CATEGORY_NAME, sort_categories};

use crate::errors::{Result, StoreError};
use crate::files::{read_json, write_json, write_json_if_missing};

/// File name inside the data directory.
pub const FILE_NAME: &str = "categories.json";

/// Read-modify-write access to the category list.
#[derive(Clone, Debug)]
pub struct CategoryRepo {
    path: PathBuf,
}

impl CategoryRepo {
    /// Repository over the given file.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Write the default category if the file does not exist.
    pub fn seed_if_missing(&self) -> Result<()> {
        let seed = vec![Category {
            id: DEFAULT_CATEGORY_ID,
            name: DEFAULT_CATEGORY_NAME.into(),
            order: 0,
        }];
        let _ = write_json_if_missing(&self.path, &seed)?;
        Ok(())
    }

    /// All categories sorted by order, then name.
    pub fn list(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = read_json(&self.path)?.unwrap_or_default();
        sort_categories(&mut categories);
        Ok(categories)
    }

    /// Create a category. A missing order sorts it after the existing ones.
    pub fn create(&self, draft: CategoryDraft) -> Result<Category> {
        let name = draft
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| StoreError::Invalid {
                entity: "category",
                reason: "name is required".into(),
            })?;
        let mut categories = self.list()?;
        let order = draft
            .order
            .unwrap_or_else(|| categories.iter().map(|c| c.order).max().map_or(0, |m| m + 1));
        let category = Category {
            id: crate::next_id(categories.iter().map(|c| c.id)),
            name,
            order,
        };
        categories.push(category.clone());
        write_json(&self.path, &categories)?;
        Ok(category)
    }

    /// Rename and/or reorder a category.
    pub fn update(&self, id: CategoryId, draft: &CategoryDraft) -> Result<Category> {
        let mut categories = self.list()?;
        let category = categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound { entity: "category", id })?;
        if let Some(name) = draft.name.as_deref().filter(|n| !n.trim().is_empty()) {
            category.name = name.to_string();
        }
        if let Some(order) = draft.order {
            category.order = order;
        }
        let updated = category.clone();
        write_json(&self.path, &categories)?;
        Ok(updated)
    }

    /// Delete a category. The default category cannot be deleted.
    pub fn delete(&self, id: CategoryId) -> Result<()> {
        if id == DEFAULT_CATEGORY_ID {
            return Err(StoreError::Invalid {
                entity: "category",
                reason: "the default category cannot be deleted".into(),
            });
        }
        let categories = self.list()?;
        let before = categories.len();
        let remaining: Vec<Category> = categories.into_iter().filter(|c| c.id != id).collect();
        if remaining.len() == before {
            return Err(StoreError::NotFound { entity: "category", id });
        }
        write_json(&self.path, &remaining)
    }
}
