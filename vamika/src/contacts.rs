//! Emergency contact store.
//!
//! Contacts are kept per user. The in-memory store can optionally mirror
//! its contents to a JSON file so contacts survive a daemon restart. A
//! change becomes visible only once the mirror has been written.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::api_client::types::{Contact, ContactId, NewContact, UserId};
use crate::error::{Error, Result};
use crate::tracing::prelude::*;

/// Digits, spaces, parentheses, dots and dashes, with an optional leading
/// plus.
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ().-]+$").expect("phone pattern is valid"));

/// Fewest digits a callable number can have (e.g., "911").
const MIN_PHONE_DIGITS: usize = 3;

#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Contacts of `owner`, in insertion order.
    async fn list(&self, owner: UserId) -> Result<Vec<Contact>>;

    /// Validate and store a new contact, returning it with its id.
    async fn add(&self, owner: UserId, contact: NewContact) -> Result<Contact>;

    async fn remove(&self, owner: UserId, id: ContactId) -> Result<()>;
}

/// Give a fresh account the example contacts, unless it already has some.
pub async fn seed_examples(store: &dyn ContactStore, owner: UserId) -> Result<()> {
    if !store.list(owner).await?.is_empty() {
        return Ok(());
    }

    for contact in example_contacts() {
        store.add(owner, contact).await?;
    }
    debug!(owner, "Seeded example emergency contacts");
    Ok(())
}

fn example_contacts() -> Vec<NewContact> {
    vec![
        NewContact {
            name: "Mom".into(),
            phone: "+1 (555) 123-4567".into(),
            relation: "Family".into(),
        },
        NewContact {
            name: "Sarah (Roommate)".into(),
            phone: "+1 (555) 987-6543".into(),
            relation: "Friend".into(),
        },
    ]
}

/// Trim fields and reject contacts that could not be called.
fn normalize(contact: NewContact) -> Result<NewContact> {
    let name = contact.name.trim().to_string();
    let phone = contact.phone.trim().to_string();

    if name.is_empty() || phone.is_empty() {
        return Err(Error::Invalid(
            "please provide both name and phone number".into(),
        ));
    }

    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !PHONE_PATTERN.is_match(&phone) || digits < MIN_PHONE_DIGITS {
        return Err(Error::Invalid(format!("not a phone number: {phone:?}")));
    }

    Ok(NewContact {
        name,
        phone,
        relation: contact.relation.trim().to_string(),
    })
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct ContactBook {
    next_id: ContactId,
    by_owner: HashMap<UserId, Vec<Contact>>,
}

/// Contact store held in memory, optionally mirrored to a JSON file.
pub struct InMemoryContactStore {
    book: Mutex<ContactBook>,
    mirror: Option<PathBuf>,
    /// Held across a whole change, mirror write included.
    writer: tokio::sync::Mutex<()>,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self {
            book: Mutex::new(ContactBook::default()),
            mirror: None,
            writer: tokio::sync::Mutex::new(()),
        }
    }

    /// Create a store backed by `path`, loading its contents if the file
    /// exists. Every change rewrites the file.
    pub fn with_mirror(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let book = if path.exists() {
            let bytes = std::fs::read(&path)?;
            let book: ContactBook = serde_json::from_slice(&bytes)?;
            info!(
                path = %path.display(),
                owners = book.by_owner.len(),
                "Loaded emergency contacts"
            );
            book
        } else {
            ContactBook::default()
        };

        Ok(Self {
            book: Mutex::new(book),
            mirror: Some(path),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    /// Apply `change` to a copy of the book, write the copy to the mirror
    /// and only then make it current. If either step fails the stored
    /// contacts are untouched. Readers never wait on the file system.
    async fn commit<T>(&self, change: impl FnOnce(&mut ContactBook) -> Result<T>) -> Result<T> {
        let _writer = self.writer.lock().await;

        let mut book = self.book.lock().clone();
        let value = change(&mut book)?;

        if let Some(path) = &self.mirror {
            let bytes = serde_json::to_vec_pretty(&book)?;
            if let Err(e) = write_atomically(path, &bytes).await {
                error!(path = %path.display(), error = %e, "Could not save emergency contacts");
                return Err(e);
            }
        }

        *self.book.lock() = book;
        Ok(value)
    }
}

impl Default for InMemoryContactStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl ContactStore for InMemoryContactStore {
    async fn list(&self, owner: UserId) -> Result<Vec<Contact>> {
        Ok(self
            .book
            .lock()
            .by_owner
            .get(&owner)
            .cloned()
            .unwrap_or_default())
    }

    async fn add(&self, owner: UserId, contact: NewContact) -> Result<Contact> {
        let contact = normalize(contact)?;

        let stored = self
            .commit(|book| {
                book.next_id += 1;
                let stored = Contact {
                    id: book.next_id,
                    name: contact.name,
                    phone: contact.phone,
                    relation: contact.relation,
                };
                book.by_owner.entry(owner).or_default().push(stored.clone());
                Ok(stored)
            })
            .await?;

        info!(owner, contact_id = stored.id, "Emergency contact added");
        Ok(stored)
    }

    async fn remove(&self, owner: UserId, id: ContactId) -> Result<()> {
        self.commit(|book| {
            let contacts = book.by_owner.get_mut(&owner).ok_or_else(|| not_found(id))?;
            let before = contacts.len();
            contacts.retain(|c| c.id != id);
            if contacts.len() == before {
                return Err(not_found(id));
            }
            Ok(())
        })
        .await?;

        info!(owner, contact_id = id, "Emergency contact removed");
        Ok(())
    }
}

fn not_found(id: ContactId) -> Error {
    Error::NotFound(format!("contact {id}"))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn new_contact(name: &str, phone: &str) -> NewContact {
        NewContact {
            name: name.into(),
            phone: phone.into(),
            relation: String::new(),
        }
    }

    #[tokio::test]
    async fn add_assigns_ids_and_lists_in_order() {
        let store = InMemoryContactStore::new();

        let a = store.add(1, new_contact("Mom", "555-1234")).await.unwrap();
        let b = store.add(1, new_contact("Dad", "555-9876")).await.unwrap();
        assert_ne!(a.id, b.id);

        let listed = store.list(1).await.unwrap();
        assert_eq!(listed, vec![a, b]);
    }

    #[tokio::test]
    async fn contacts_are_scoped_to_owner() {
        let store = InMemoryContactStore::new();
        store.add(1, new_contact("Mom", "555-1234")).await.unwrap();

        assert!(store.list(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_trims_fields() {
        let store = InMemoryContactStore::new();
        let contact = NewContact {
            name: "  Mom ".into(),
            phone: " +1 (555) 123-4567 ".into(),
            relation: " Family".into(),
        };

        let stored = store.add(1, contact).await.unwrap();
        assert_eq!(stored.name, "Mom");
        assert_eq!(stored.phone, "+1 (555) 123-4567");
        assert_eq!(stored.relation, "Family");
    }

    #[test_case("", "555-1234" ; "missing name")]
    #[test_case("Mom", "" ; "missing phone")]
    #[test_case("   ", "555-1234" ; "blank name")]
    #[test_case("Mom", "call me" ; "letters in phone")]
    #[test_case("Mom", "12" ; "too few digits")]
    #[test_case("Mom", "+()" ; "no digits")]
    fn rejects_invalid_contacts(name: &str, phone: &str) {
        assert!(matches!(
            normalize(new_contact(name, phone)),
            Err(Error::Invalid(_))
        ));
    }

    #[test_case("911" ; "short emergency number")]
    #[test_case("+1 (555) 987-6543" ; "formatted international")]
    #[test_case("555.987.6543" ; "dotted")]
    fn accepts_callable_numbers(phone: &str) {
        assert!(normalize(new_contact("Someone", phone)).is_ok());
    }

    #[tokio::test]
    async fn remove_deletes_only_that_contact() {
        let store = InMemoryContactStore::new();
        let a = store.add(1, new_contact("Mom", "555-1234")).await.unwrap();
        let b = store.add(1, new_contact("Dad", "555-9876")).await.unwrap();

        store.remove(1, a.id).await.unwrap();
        assert_eq!(store.list(1).await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn remove_unknown_id_is_not_found() {
        let store = InMemoryContactStore::new();
        let a = store.add(1, new_contact("Mom", "555-1234")).await.unwrap();

        assert!(matches!(
            store.remove(1, a.id + 100).await,
            Err(Error::NotFound(_))
        ));
        // Another owner cannot remove it either
        assert!(matches!(store.remove(2, a.id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn seed_examples_only_fills_empty_books() {
        let store = InMemoryContactStore::new();

        seed_examples(&store, 1).await.unwrap();
        assert_eq!(store.list(1).await.unwrap().len(), 2);

        seed_examples(&store, 1).await.unwrap();
        assert_eq!(store.list(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn mirror_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contacts.json");

        let stored = {
            let store = InMemoryContactStore::with_mirror(&path).unwrap();
            store.add(7, new_contact("Mom", "555-1234")).await.unwrap()
        };

        let reloaded = InMemoryContactStore::with_mirror(&path).unwrap();
        assert_eq!(reloaded.list(7).await.unwrap(), vec![stored.clone()]);

        // Ids keep increasing after reload
        let next = reloaded
            .add(7, new_contact("Dad", "555-9876"))
            .await
            .unwrap();
        assert!(next.id > stored.id);
    }

    #[tokio::test]
    async fn failed_mirror_write_leaves_contacts_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();
        let store = InMemoryContactStore::with_mirror(data_dir.join("contacts.json")).unwrap();
        let mom = store.add(7, new_contact("Mom", "555-1234")).await.unwrap();

        std::fs::remove_dir_all(&data_dir).unwrap();

        assert!(matches!(
            store.add(7, new_contact("Dad", "555-9876")).await,
            Err(Error::Io(_))
        ));
        assert!(matches!(store.remove(7, mom.id).await, Err(Error::Io(_))));
        assert_eq!(store.list(7).await.unwrap(), vec![mom.clone()]);

        // Once the mirror is writable again, changes go through
        std::fs::create_dir(&data_dir).unwrap();
        let dad = store.add(7, new_contact("Dad", "555-9876")).await.unwrap();
        assert_eq!(dad.id, mom.id + 1);
        assert_eq!(store.list(7).await.unwrap(), vec![mom, dad]);
    }
}
