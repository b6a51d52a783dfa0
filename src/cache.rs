use std::sync::{Mutex, MutexGuard};

use crate::models::{DailyTaskRecord, ProjectRecord, SubtaskRecord, WeeklyTaskRecord};

pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for ProjectRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for SubtaskRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for DailyTaskRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for WeeklyTaskRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Keyed-by-id store mirroring server state on the client, in server list
/// order (`replace_all` keeps the order it was given; `insert` appends).
///
/// Optimistic updates: take a `snapshot()`, apply the local change with
/// `insert`/`patch`/`remove`, then call the server. If the call fails,
/// `restore` the snapshot and reconcile with a `replace_all` refetch.
#[derive(Debug)]
pub struct EntityCache<T> {
    entries: Mutex<Vec<T>>,
}

impl<T> Default for EntityCache<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<T> EntityCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<T>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl<T: Keyed + Clone> EntityCache<T> {
    pub fn replace_all(&self, items: Vec<T>) {
        *self.entries() = items;
    }

    pub fn all(&self) -> Vec<T> {
        self.entries().clone()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.entries().iter().find(|item| item.key() == id).cloned()
    }

    /// Appends, or replaces in place when the id is already cached.
    pub fn insert(&self, item: T) {
        let mut entries = self.entries();
        match entries.iter().position(|existing| existing.key() == item.key()) {
            Some(index) => entries[index] = item,
            None => entries.push(item),
        }
    }

    /// Applies `apply` to the cached entity; returns false when the id is
    /// not cached.
    pub fn patch(&self, id: &str, apply: impl FnOnce(&mut T)) -> bool {
        let mut entries = self.entries();
        match entries.iter_mut().find(|item| item.key() == id) {
            Some(item) => {
                apply(item);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) -> Option<T> {
        let mut entries = self.entries();
        let index = entries.iter().position(|item| item.key() == id)?;
        Some(entries.remove(index))
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.all()
    }

    pub fn restore(&self, snapshot: Vec<T>) {
        self.replace_all(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn project(id: &str, title: &str) -> ProjectRecord {
        let now = Utc::now();
        ProjectRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            is_archived: false,
            is_done: false,
            created_at: now,
            updated_at: now,
            subtasks: Vec::new(),
        }
    }

    #[test]
    fn restore_reverts_optimistic_changes() {
        let cache = EntityCache::new();
        cache.replace_all(vec![project("a", "First"), project("b", "Second")]);

        let snapshot = cache.snapshot();
        assert!(cache.patch("a", |p| p.is_done = true));
        cache.remove("b");
        assert_eq!(cache.len(), 1);

        cache.restore(snapshot);
        assert_eq!(cache.len(), 2);
        let reverted = cache.get("a").expect("project a");
        assert!(!reverted.is_done);
    }

    #[test]
    fn insert_replaces_existing_id_in_place() {
        let cache = EntityCache::new();
        cache.replace_all(vec![project("a", "First"), project("b", "Second")]);

        cache.insert(project("a", "Renamed"));
        let all = cache.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Renamed");
        assert_eq!(all[1].id, "b");
    }

    #[test]
    fn patch_on_unknown_id_is_a_no_op() {
        let cache = EntityCache::new();
        cache.replace_all(vec![project("a", "First")]);
        assert!(!cache.patch("missing", |p| p.is_done = true));
        assert!(!cache.get("a").expect("project a").is_done);
    }

    #[test]
    fn order_follows_server_with_appended_inserts() {
        let cache = EntityCache::new();
        cache.replace_all(vec![project("b", "Second"), project("a", "First")]);
        cache.insert(project("c", "Third"));

        let ids: Vec<String> = cache.all().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }
}
