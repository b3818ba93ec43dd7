//! # Hash Table Operations
//!
//! The engine-facing hash index: insert, search, remove, and full key
//! enumeration over one header page plus 256 bucket chains.
//!
//! ## Chain Walk Discipline
//!
//! `insert` makes a full pass over the target chain looking for the key
//! before committing to a slot: an existing entry is updated in place, and
//! only if the key is absent does the entry land in the first page with
//! spare room. A chain with no room at all grows by one overflow page linked
//! from the tail. This ordering guarantees a key never appears twice in a
//! chain, even after interleaved removals have opened holes in earlier
//! pages.
//!
//! `remove` compacts the surviving entries of the affected page but leaves
//! the chain itself alone — overflow pages are never unlinked or returned to
//! the free list.
//!
//! ## Thread Safety
//!
//! As with the B+Tree: mutating operations take `&mut self`, so sharing a
//! table across threads requires a lock around it. Page-level access is
//! serialized by the engine.

use eyre::Result;
use tracing::debug;

use super::bucket::{HashBucket, HashTableHeader};
use super::fnv1a;
use crate::config::{BUCKET_COUNT, MAX_KEY_LEN};
use crate::error::EngineError;
use crate::storage::{Page, PageType, RecordLocation, StorageEngine};

pub struct HashTable<'a> {
    engine: &'a StorageEngine,
    header_page_id: u64,
    header: HashTableHeader,
}

impl<'a> HashTable<'a> {
    /// A table with no pages yet; call [`initialize`](Self::initialize)
    /// before use.
    pub fn new(engine: &'a StorageEngine) -> Self {
        Self {
            engine,
            header_page_id: 0,
            header: HashTableHeader::new(),
        }
    }

    /// Allocates the header page and all 256 primary bucket pages.
    pub fn initialize(&mut self) -> Result<()> {
        self.header_page_id = self.engine.allocate_page()?;
        self.header = HashTableHeader::new();

        for i in 0..BUCKET_COUNT {
            let bucket_page = self.engine.allocate_page()?;
            self.header.set_bucket_page(i, bucket_page);
            self.save_bucket(bucket_page, &HashBucket::new())?;
        }

        self.save_header()?;

        debug!(
            header_page = self.header_page_id,
            buckets = BUCKET_COUNT,
            "hash table initialized"
        );
        Ok(())
    }

    /// Re-reads an existing table's header page (from the database header).
    pub fn load(engine: &'a StorageEngine, header_page_id: u64) -> Result<Self> {
        let page = engine.read_page(header_page_id)?;
        let header = HashTableHeader::from_bytes(&page.data)?;

        Ok(Self {
            engine,
            header_page_id,
            header,
        })
    }

    /// The header page id. Callers persist this into the database header.
    pub fn header_page_id(&self) -> u64 {
        self.header_page_id
    }

    fn save_header(&self) -> Result<()> {
        let mut page = Page::new(PageType::HashBucket);
        self.header.write_to(&mut page.data)?;
        self.engine.write_page(self.header_page_id, &page)
    }

    fn load_bucket(&self, page_id: u64) -> Result<HashBucket> {
        let page = self.engine.read_page(page_id)?;
        HashBucket::from_bytes(&page.data)
    }

    fn save_bucket(&self, page_id: u64, bucket: &HashBucket) -> Result<()> {
        let mut page = Page::new(PageType::HashBucket);
        bucket.write_to(&mut page.data)?;
        self.engine.write_page(page_id, &page)
    }

    fn bucket_page_for(&self, hash_value: u64) -> u64 {
        let idx = (hash_value % self.header.bucket_count() as u64) as usize;
        self.header.bucket_page(idx)
    }

    /// Binds `key` to `location`, updating in place if the key is present.
    pub fn insert(&mut self, key: &str, location: RecordLocation) -> Result<()> {
        if key.len() > MAX_KEY_LEN {
            return Err(EngineError::KeyTooLong {
                len: key.len(),
                max: MAX_KEY_LEN,
            }
            .into());
        }

        let hash_value = fnv1a(key.as_bytes());
        let first_page = self.bucket_page_for(hash_value);

        // Full pass first: update an existing binding in place, remembering
        // where a new one could go.
        let mut page_with_room = 0u64;
        let mut tail_page = first_page;
        let mut current = first_page;
        while current != 0 {
            let mut bucket = self.load_bucket(current)?;

            for i in 0..bucket.entry_count() {
                if bucket.entries()[i].matches(hash_value, key) {
                    bucket.entries_mut()[i].set_location(location);
                    return self.save_bucket(current, &bucket);
                }
            }

            if page_with_room == 0 && !bucket.is_full() {
                page_with_room = current;
            }
            tail_page = current;
            current = bucket.overflow_page();
        }

        if page_with_room != 0 {
            let mut bucket = self.load_bucket(page_with_room)?;
            bucket.push(hash_value, key, location)?;
            return self.save_bucket(page_with_room, &bucket);
        }

        // Every page in the chain is full: grow it by one overflow page.
        let overflow_page = self.engine.allocate_page()?;
        let mut tail = self.load_bucket(tail_page)?;
        tail.set_overflow_page(overflow_page);
        self.save_bucket(tail_page, &tail)?;

        let mut overflow = HashBucket::new();
        overflow.push(hash_value, key, location)?;
        self.save_bucket(overflow_page, &overflow)
    }

    pub fn search(&self, key: &str) -> Result<Option<RecordLocation>> {
        let hash_value = fnv1a(key.as_bytes());

        let mut current = self.bucket_page_for(hash_value);
        while current != 0 {
            let bucket = self.load_bucket(current)?;

            for entry in bucket.entries() {
                if entry.matches(hash_value, key) {
                    return Ok(Some(entry.location()));
                }
            }

            current = bucket.overflow_page();
        }

        Ok(None)
    }

    /// Unbinds `key`, compacting its bucket page. Returns whether an entry
    /// was removed.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let hash_value = fnv1a(key.as_bytes());

        let mut current = self.bucket_page_for(hash_value);
        while current != 0 {
            let mut bucket = self.load_bucket(current)?;

            for i in 0..bucket.entry_count() {
                if bucket.entries()[i].matches(hash_value, key) {
                    bucket.remove_at(i);
                    self.save_bucket(current, &bucket)?;
                    return Ok(true);
                }
            }

            current = bucket.overflow_page();
        }

        Ok(false)
    }

    /// Every key in the table, across all buckets and overflow pages.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        for i in 0..self.header.bucket_count() {
            let mut current = self.header.bucket_page(i);
            while current != 0 {
                let bucket = self.load_bucket(current)?;
                for entry in bucket.entries() {
                    keys.push(entry.key_string());
                }
                current = bucket.overflow_page();
            }
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_ENTRIES_PER_BUCKET;

    fn temp_table() -> (StorageEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let engine = StorageEngine::initialize(dir.path().join("hash.db")).unwrap();
        (engine, dir)
    }

    /// `count` distinct keys whose hashes all land in bucket 0.
    fn colliding_keys(count: usize) -> Vec<String> {
        let mut keys = Vec::new();
        let mut i = 0u64;
        while keys.len() < count {
            let candidate = format!("key{i}");
            if fnv1a(candidate.as_bytes()) % BUCKET_COUNT as u64 == 0 {
                keys.push(candidate);
            }
            i += 1;
        }
        keys
    }

    #[test]
    fn initialize_allocates_header_plus_buckets() {
        let (engine, _dir) = temp_table();
        let before = engine.total_pages();

        let mut table = HashTable::new(&engine);
        table.initialize().unwrap();

        assert_eq!(engine.total_pages() - before, 1 + BUCKET_COUNT as u64);
        assert_ne!(table.header_page_id(), 0);
    }

    #[test]
    fn insert_then_search() {
        let (engine, _dir) = temp_table();
        let mut table = HashTable::new(&engine);
        table.initialize().unwrap();

        table
            .insert("user@example.com", RecordLocation::new(1, 0, 272))
            .unwrap();
        table
            .insert("admin@example.com", RecordLocation::new(2, 0, 272))
            .unwrap();

        assert_eq!(
            table.search("user@example.com").unwrap(),
            Some(RecordLocation::new(1, 0, 272))
        );
        assert_eq!(
            table.search("admin@example.com").unwrap(),
            Some(RecordLocation::new(2, 0, 272))
        );
        assert!(table.search("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn insert_existing_key_updates_in_place() {
        let (engine, _dir) = temp_table();
        let mut table = HashTable::new(&engine);
        table.initialize().unwrap();

        table.insert("k", RecordLocation::new(1, 0, 10)).unwrap();
        table.insert("k", RecordLocation::new(9, 90, 900)).unwrap();

        assert_eq!(table.search("k").unwrap(), Some(RecordLocation::new(9, 90, 900)));
        assert_eq!(table.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn remove_then_search_misses() {
        let (engine, _dir) = temp_table();
        let mut table = HashTable::new(&engine);
        table.initialize().unwrap();

        table.insert("gone", RecordLocation::new(1, 0, 10)).unwrap();
        table.insert("stays", RecordLocation::new(2, 0, 10)).unwrap();

        assert!(table.remove("gone").unwrap());
        assert!(table.search("gone").unwrap().is_none());
        assert!(table.search("stays").unwrap().is_some());
        assert!(!table.remove("gone").unwrap());
    }

    #[test]
    fn key_length_limit() {
        let (engine, _dir) = temp_table();
        let mut table = HashTable::new(&engine);
        table.initialize().unwrap();

        let longest_ok = "x".repeat(MAX_KEY_LEN);
        table
            .insert(&longest_ok, RecordLocation::new(1, 0, 10))
            .unwrap();
        assert!(table.search(&longest_ok).unwrap().is_some());

        let too_long = "x".repeat(MAX_KEY_LEN + 1);
        let err = table
            .insert(&too_long, RecordLocation::new(1, 0, 10))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::KeyTooLong { len: 128, .. })
        ));
    }

    #[test]
    fn bucket_overflow_allocates_one_page() {
        let (engine, _dir) = temp_table();
        let mut table = HashTable::new(&engine);
        table.initialize().unwrap();

        let keys = colliding_keys(MAX_ENTRIES_PER_BUCKET + 1);
        for (i, key) in keys.iter().enumerate() {
            table
                .insert(key, RecordLocation::new(i as u64 + 1, 0, 10))
                .unwrap();
        }

        let primary = table.load_bucket(table.header.bucket_page(0)).unwrap();
        assert_eq!(primary.entry_count(), MAX_ENTRIES_PER_BUCKET);
        assert_ne!(primary.overflow_page(), 0);

        let overflow = table.load_bucket(primary.overflow_page()).unwrap();
        assert_eq!(overflow.entry_count(), 1);
        assert_eq!(overflow.overflow_page(), 0);

        for (i, key) in keys.iter().enumerate() {
            assert_eq!(
                table.search(key).unwrap(),
                Some(RecordLocation::new(i as u64 + 1, 0, 10)),
                "key {key}"
            );
        }
    }

    #[test]
    fn hole_in_primary_is_reused_before_growing_chain() {
        let (engine, _dir) = temp_table();
        let mut table = HashTable::new(&engine);
        table.initialize().unwrap();

        let keys = colliding_keys(MAX_ENTRIES_PER_BUCKET + 2);
        for key in keys.iter().take(MAX_ENTRIES_PER_BUCKET + 1) {
            table.insert(key, RecordLocation::new(1, 0, 10)).unwrap();
        }

        // Open a hole in the primary page; the next insert must fill it
        // rather than extend the chain.
        assert!(table.remove(&keys[0]).unwrap());
        let pages_before = engine.total_pages();
        table
            .insert(&keys[MAX_ENTRIES_PER_BUCKET + 1], RecordLocation::new(2, 0, 10))
            .unwrap();

        assert_eq!(engine.total_pages(), pages_before);
        let primary = table.load_bucket(table.header.bucket_page(0)).unwrap();
        assert_eq!(primary.entry_count(), MAX_ENTRIES_PER_BUCKET);

        // The key that lives in the overflow page is still reachable.
        assert!(table.search(&keys[MAX_ENTRIES_PER_BUCKET]).unwrap().is_some());
    }

    #[test]
    fn update_of_overflow_resident_key_does_not_duplicate() {
        let (engine, _dir) = temp_table();
        let mut table = HashTable::new(&engine);
        table.initialize().unwrap();

        let keys = colliding_keys(MAX_ENTRIES_PER_BUCKET + 1);
        for key in &keys {
            table.insert(key, RecordLocation::new(1, 0, 10)).unwrap();
        }
        let overflow_key = &keys[MAX_ENTRIES_PER_BUCKET];

        // Open room in the primary page, then update the overflow-resident
        // key: it must stay a single entry, not gain a twin up front.
        table.remove(&keys[0]).unwrap();
        table
            .insert(overflow_key, RecordLocation::new(7, 0, 10))
            .unwrap();

        assert_eq!(
            table.search(overflow_key).unwrap(),
            Some(RecordLocation::new(7, 0, 10))
        );
        let occurrences = table
            .keys()
            .unwrap()
            .into_iter()
            .filter(|k| k == overflow_key)
            .count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn keys_enumerates_every_bucket_and_chain() {
        let (engine, _dir) = temp_table();
        let mut table = HashTable::new(&engine);
        table.initialize().unwrap();

        let mut expected: Vec<String> = (0..40).map(|i| format!("user{i}@example.com")).collect();
        for (i, key) in expected.iter().enumerate() {
            table.insert(key, RecordLocation::new(i as u64, 0, 10)).unwrap();
        }

        let mut listed = table.keys().unwrap();
        listed.sort();
        expected.sort();
        assert_eq!(listed, expected);
    }

    #[test]
    fn load_reads_existing_table() {
        let (engine, _dir) = temp_table();
        let header_page_id;
        {
            let mut table = HashTable::new(&engine);
            table.initialize().unwrap();
            table.insert("persist", RecordLocation::new(5, 50, 500)).unwrap();
            header_page_id = table.header_page_id();
        }

        let table = HashTable::load(&engine, header_page_id).unwrap();
        assert_eq!(
            table.search("persist").unwrap(),
            Some(RecordLocation::new(5, 50, 500))
        );
    }
}
