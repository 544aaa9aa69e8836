//! In-memory item store.
//!
//! Constructed once at startup and handed to handlers through `AppState`.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("item `{0}` already exists")]
    AlreadyExists(String),
}

/// Thread-safe map of item id to item.
#[derive(Debug, Default)]
pub struct ItemStore {
    items: DashMap<String, Item>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with the sample items served by a fresh instance.
    pub fn with_fixtures() -> Self {
        let store = Self::new();
        for (id, title) in [("plumbus", "Plumbus"), ("gun", "Portal Gun")] {
            store.items.insert(
                id.to_string(),
                Item {
                    id: id.to_string(),
                    title: title.to_string(),
                    description: None,
                },
            );
        }
        store
    }

    pub fn get(&self, id: &str) -> Option<Item> {
        self.items.get(id).map(|entry| entry.value().clone())
    }

    /// Insert a new item; existing ids are never overwritten.
    pub fn insert(&self, item: Item) -> Result<(), StoreError> {
        match self.items.entry(item.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(item.id)),
            Entry::Vacant(slot) => {
                slot.insert(item);
                Ok(())
            }
        }
    }

    /// Items ordered by id, `skip` then at most `limit`.
    pub fn list(&self, skip: usize, limit: usize) -> Vec<Item> {
        let mut items: Vec<Item> = self.items.iter().map(|entry| entry.value().clone()).collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items.into_iter().skip(skip).take(limit).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> Item {
        Item {
            id: id.into(),
            title: id.to_uppercase(),
            description: None,
        }
    }

    #[test]
    fn fixtures_are_seeded() {
        let store = ItemStore::with_fixtures();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("plumbus").unwrap().title, "Plumbus");
        assert_eq!(store.get("gun").unwrap().title, "Portal Gun");
        assert!(store.get("baz").is_none());
    }

    #[test]
    fn insert_rejects_existing_id() {
        let store = ItemStore::new();
        store.insert(item("foo")).unwrap();

        let mut replacement = item("foo");
        replacement.title = "other".into();
        assert_eq!(
            store.insert(replacement),
            Err(StoreError::AlreadyExists("foo".into()))
        );
        assert_eq!(store.get("foo").unwrap().title, "FOO");
    }

    #[test]
    fn list_pages_in_id_order() {
        let store = ItemStore::new();
        for id in ["c", "a", "d", "b"] {
            store.insert(item(id)).unwrap();
        }

        let ids: Vec<_> = store.list(1, 2).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(store.list(10, 5).is_empty());
    }
}
