use shorturl_core::{Record, ShortCode, UserUrl};
use std::collections::{HashMap, HashSet};

/// What the index keeps per short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    pub value: String,
    pub owner_token: String,
    pub deleted: bool,
    pub sequence: u64,
}

impl Entry {
    pub fn to_record(&self, owner: &str, key: &ShortCode) -> Record {
        Record {
            owner: owner.to_string(),
            key: key.clone(),
            sequence: self.sequence,
            value: self.value.clone(),
            owner_token: self.owner_token.clone(),
            deleted: self.deleted,
        }
    }
}

impl From<&Record> for Entry {
    fn from(record: &Record) -> Self {
        Self {
            value: record.value.clone(),
            owner_token: record.owner_token.clone(),
            deleted: record.deleted,
            sequence: record.sequence,
        }
    }
}

/// `owner -> short code -> entry`.
///
/// Not synchronized; the store wraps it in a single reader/writer lock.
#[derive(Debug, Default)]
pub(crate) struct Index {
    owners: HashMap<String, HashMap<ShortCode, Entry>>,
}

impl Index {
    pub fn get(&self, owner: &str, key: &str) -> Option<&Entry> {
        self.owners.get(owner)?.get(key)
    }

    pub fn get_mut(&mut self, owner: &str, key: &str) -> Option<&mut Entry> {
        self.owners.get_mut(owner)?.get_mut(key)
    }

    pub fn contains(&self, owner: &str, key: &str) -> bool {
        self.get(owner, key).is_some()
    }

    pub fn insert(&mut self, record: &Record) {
        self.owners
            .entry(record.owner.clone())
            .or_default()
            .insert(record.key.clone(), Entry::from(record));
    }

    /// Folds one replayed record into the index.
    ///
    /// A record with a higher sequence replaces the entry for its key. With an
    /// equal sequence only the deleted flag can change, and only towards
    /// `true`. Older records are ignored.
    pub fn merge(&mut self, record: &Record) {
        let slot = self.owners.entry(record.owner.clone()).or_default();
        match slot.get_mut(record.key.as_str()) {
            None => {
                slot.insert(record.key.clone(), Entry::from(record));
            }
            Some(existing) if record.sequence > existing.sequence => {
                *existing = Entry::from(record);
            }
            Some(existing) if record.sequence == existing.sequence => {
                existing.deleted |= record.deleted;
            }
            Some(_) => {}
        }
    }

    pub fn max_sequence(&self) -> u64 {
        self.owners
            .values()
            .flat_map(HashMap::values)
            .map(|entry| entry.sequence)
            .max()
            .unwrap_or(0)
    }

    /// Entries of `owner` whose token matches, ordered by creation.
    pub fn list(&self, owner: &str, token: &str, base_url: &str) -> Vec<UserUrl> {
        let Some(codes) = self.owners.get(owner) else {
            return Vec::new();
        };

        let mut matching: Vec<(&ShortCode, &Entry)> = codes
            .iter()
            .filter(|(_, entry)| entry.owner_token == token)
            .collect();
        matching.sort_by_key(|(_, entry)| entry.sequence);

        matching
            .into_iter()
            .map(|(code, entry)| UserUrl {
                short_url: code.to_url(base_url),
                original_url: entry.value.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.owners.values().map(HashMap::len).sum()
    }

    pub fn distinct_tokens(&self) -> usize {
        self.owners
            .values()
            .flat_map(HashMap::values)
            .map(|entry| entry.owner_token.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}
