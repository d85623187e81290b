// src/store/subscribers.rs
use std::path::PathBuf;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::model::{normalize_tags, Subscriber};

use super::{read_json_vec, write_json_vec_atomic};

/// Subscriber preference records, keyed by email. All mutations funnel
/// through [`SubscriberStore::mutate`] so concurrent fan-out, auth, and
/// reinforcement tasks cannot lose each other's writes.
#[derive(Debug)]
pub struct SubscriberStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SubscriberStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Tags are normalized on the way out, so callers always see the
    /// canonical numeric form even over legacy data files.
    pub async fn load_all(&self) -> Vec<Subscriber> {
        let mut subs: Vec<Subscriber> = read_json_vec(&self.path);
        for s in subs.iter_mut() {
            normalize_tags(&mut s.tags);
        }
        subs
    }

    /// Single-writer read-modify-write. The closure mutates the full list
    /// and reports whether anything changed; the file is only rewritten
    /// (atomically) when it did.
    pub async fn mutate<F>(&self, f: F) -> Result<bool>
    where
        F: FnOnce(&mut Vec<Subscriber>) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let mut subs: Vec<Subscriber> = read_json_vec(&self.path);
        for s in subs.iter_mut() {
            normalize_tags(&mut s.tags);
        }
        let changed = f(&mut subs);
        if changed {
            write_json_vec_atomic(&self.path, &subs)?;
        }
        Ok(changed)
    }

    pub async fn find_by_email(&self, email: &str) -> Option<Subscriber> {
        self.load_all().await.into_iter().find(|s| s.email == email)
    }

    pub async fn find_by_token(&self, token: &str) -> Option<Subscriber> {
        self.load_all()
            .await
            .into_iter()
            .find(|s| s.token.as_deref() == Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tag;

    #[tokio::test]
    async fn mutate_persists_only_on_change() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("users.json");
        let store = SubscriberStore::new(p.clone());

        let changed = store
            .mutate(|subs| {
                subs.push(Subscriber::new("a@example.com"));
                true
            })
            .await
            .unwrap();
        assert!(changed);
        assert!(p.exists());

        let noop = store.mutate(|_| false).await.unwrap();
        assert!(!noop);
        assert_eq!(store.load_all().await.len(), 1);
    }

    #[tokio::test]
    async fn legacy_tag_shapes_are_normalized_on_load() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("users.json");
        std::fs::write(
            &p,
            r#"[{"email":"a@example.com","tags":["iot",{"tag":"malware","confidence":"high"}]}]"#,
        )
        .unwrap();
        let store = SubscriberStore::new(p);
        let subs = store.load_all().await;
        assert_eq!(
            subs[0].tags,
            vec![Tag::new("iot", 0.5), Tag::new("malware", 0.85)]
        );
    }

    #[tokio::test]
    async fn token_lookup() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SubscriberStore::new(tmp.path().join("users.json"));
        store
            .mutate(|subs| {
                let mut s = Subscriber::new("a@example.com");
                s.token = Some("tok-1".into());
                subs.push(s);
                true
            })
            .await
            .unwrap();
        assert!(store.find_by_token("tok-1").await.is_some());
        assert!(store.find_by_token("nope").await.is_none());
    }
}
