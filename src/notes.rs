//! Free-form notes.

use chrono::Utc;

use crate::error::Result;
use crate::models::Note;
use crate::store::{Query, RowStore};

/// Changes to apply to a note. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub pinned: Option<bool>,
    pub category: Option<String>,
    pub project: Option<String>,
}

pub fn create<S: RowStore>(
    store: &mut S,
    owner: &str,
    title: &str,
    content: &str,
    pinned: bool,
) -> Result<Note> {
    let now = Utc::now();
    let note = Note {
        id: 0,
        owner: owner.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        pinned,
        category: None,
        project: None,
        created_at: now,
        updated_at: now,
    };
    Ok(store.insert(note)?)
}

/// The owner's notes: pinned first, then most recently updated.
pub fn list<S: RowStore>(store: &S, owner: &str) -> Result<Vec<Note>> {
    Ok(store.query(
        &Query::all()
            .filter(|n: &Note| n.owner == owner)
            .order_by(|a: &Note, b: &Note| {
                b.pinned
                    .cmp(&a.pinned)
                    .then(b.updated_at.cmp(&a.updated_at))
                    .then(b.id.cmp(&a.id))
            }),
    )?)
}

pub fn update<S: RowStore>(store: &mut S, id: u64, patch: NotePatch) -> Result<Note> {
    let now = Utc::now();
    Ok(store.update(id, |n: &mut Note| {
        if let Some(t) = patch.title { n.title = t; }
        if let Some(c) = patch.content { n.content = c; }
        if let Some(p) = patch.pinned { n.pinned = p; }
        if let Some(c) = patch.category { n.category = Some(c); }
        if let Some(p) = patch.project { n.project = Some(p); }
        n.updated_at = now;
    })?)
}

pub fn remove<S: RowStore>(store: &mut S, id: u64) -> Result<()> {
    Ok(store.delete::<Note>(id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn pinned_notes_come_first() {
        let mut store = MemoryStore::new();
        let a = create(&mut store, "me", "Groceries", "milk", false).unwrap();
        let b = create(&mut store, "me", "Ideas", "", true).unwrap();
        create(&mut store, "you", "Secret", "", true).unwrap();

        let ids: Vec<u64> = list(&store, "me").unwrap().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);

        let patch =
            NotePatch { pinned: Some(false), content: Some("eggs".into()), ..Default::default() };
        let updated = update(&mut store, b.id, patch).unwrap();
        assert!(!updated.pinned);
        assert_eq!(updated.content, "eggs");
        assert!(updated.updated_at >= updated.created_at);

        remove(&mut store, a.id).unwrap();
        assert!(remove(&mut store, a.id).is_err());
        assert_eq!(list(&store, "me").unwrap().len(), 1);
    }
}
