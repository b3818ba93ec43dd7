//! # Storage Engine Integration Tests
//!
//! End-to-end scenarios wiring the paged heap, both indexes, the record
//! codecs, and the blob chunker together the way application managers do:
//! allocate an id, serialize a record into a fresh page, index its location,
//! persist the header, and read everything back — including across a full
//! close/reopen cycle.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

use mtdb::config::{BLOB_CHUNK_SIZE, BUCKET_COUNT, MAX_ENTRIES_PER_BUCKET};
use mtdb::hash::fnv1a;
use mtdb::storage::blob_page_count;
use mtdb::{
    BTree, FileRecord, HashTable, Message, Page, PageType, RecordLocation, StorageEngine, User,
};

/// Serializes a record buffer at offset 0 of a fresh page and returns its
/// location.
fn store_record(engine: &StorageEngine, bytes: &[u8]) -> RecordLocation {
    let page_id = engine.allocate_page().unwrap();
    let mut page = Page::new(PageType::DataOverflow);
    page.data[..bytes.len()].copy_from_slice(bytes);
    engine.write_page(page_id, &page).unwrap();
    RecordLocation::new(page_id, 0, bytes.len() as u16)
}

fn fetch_record(engine: &StorageEngine, loc: RecordLocation) -> Vec<u8> {
    let page = engine.read_page(loc.page_id()).unwrap();
    let start = loc.offset() as usize;
    page.data[start..start + loc.size() as usize].to_vec()
}

#[test]
fn empty_to_one_user_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("meetings.db");

    let loc;
    {
        let engine = StorageEngine::initialize(&path).unwrap();
        assert_eq!(engine.next_user_id(), 1);

        let user = User {
            user_id: 1,
            email: "u@e".into(),
            password_hash: "2c26b46b68ffc68f".into(),
            username: "ulrich".into(),
            created_at: 1_700_000_000,
        };
        let mut buf = vec![0u8; User::SERIALIZED_SIZE];
        user.serialize(&mut buf).unwrap();
        loc = store_record(&engine, &buf);

        let mut users = BTree::new(&engine);
        users.insert(1, loc).unwrap();
        let mut logins = HashTable::new(&engine);
        logins.initialize().unwrap();
        logins.insert("u@e", loc).unwrap();

        engine.update_header(|h| {
            h.set_users_root(users.root_page_id());
            h.set_login_hash(logins.header_page_id());
        });
        engine.write_header().unwrap();
        engine.close().unwrap();
    }

    let engine = StorageEngine::open(&path).unwrap();
    let header = engine.header();

    let users = BTree::load(&engine, header.users_root());
    assert_eq!(users.search(1).unwrap(), Some(loc));

    let logins = HashTable::load(&engine, header.login_hash()).unwrap();
    assert_eq!(logins.search("u@e").unwrap(), Some(loc));

    let restored = User::deserialize(&fetch_record(&engine, loc)).unwrap();
    assert_eq!(restored.email, "u@e");
    assert_eq!(restored.username, "ulrich");
}

#[test]
fn btree_thousand_keys_range_and_leaf_chain() {
    let dir = tempdir().unwrap();
    let engine = StorageEngine::initialize(dir.path().join("btree.db")).unwrap();

    let mut tree = BTree::new(&engine);
    for key in 1..=1000u64 {
        tree.insert(key, RecordLocation::new(key, 0, 8)).unwrap();
    }

    let results = tree.range_search(250, 260).unwrap();
    assert_eq!(results.len(), 11);
    for (i, loc) in results.iter().enumerate() {
        assert_eq!(loc.page_id(), 250 + i as u64);
    }

    let everything = tree.range_search(0, u64::MAX).unwrap();
    assert_eq!(everything.len(), 1000);
    for (i, loc) in everything.iter().enumerate() {
        assert_eq!(loc.page_id(), i as u64 + 1);
    }
}

#[test]
fn free_list_reuse_is_lifo() {
    let dir = tempdir().unwrap();
    let engine = StorageEngine::initialize(dir.path().join("free.db")).unwrap();

    let _p1 = engine.allocate_page().unwrap();
    let p2 = engine.allocate_page().unwrap();
    let _p3 = engine.allocate_page().unwrap();

    engine.free_page(p2).unwrap();
    assert_eq!(engine.allocate_page().unwrap(), p2);
}

#[test]
fn hash_bucket_overflow_at_twenty_five_colliding_keys() {
    let dir = tempdir().unwrap();
    let engine = StorageEngine::initialize(dir.path().join("hash.db")).unwrap();

    let mut table = HashTable::new(&engine);
    table.initialize().unwrap();

    // 25 distinct keys that all land in bucket 0 by construction.
    let mut keys = Vec::new();
    let mut i = 0u64;
    while keys.len() < MAX_ENTRIES_PER_BUCKET + 1 {
        let candidate = format!("collide{i}");
        if fnv1a(candidate.as_bytes()) % BUCKET_COUNT as u64 == 0 {
            keys.push(candidate);
        }
        i += 1;
    }

    let before = engine.total_pages();
    for (n, key) in keys.iter().enumerate() {
        table
            .insert(key, RecordLocation::new(n as u64 + 1, 0, 16))
            .unwrap();
    }

    // Exactly one overflow page was allocated for the chain.
    assert_eq!(engine.total_pages() - before, 1);
    for (n, key) in keys.iter().enumerate() {
        assert_eq!(
            table.search(key).unwrap(),
            Some(RecordLocation::new(n as u64 + 1, 0, 16)),
            "key {key}"
        );
    }
}

#[test]
fn btree_delete_then_search_and_range() {
    let dir = tempdir().unwrap();
    let engine = StorageEngine::initialize(dir.path().join("delete.db")).unwrap();

    let mut tree = BTree::new(&engine);
    for key in [10u64, 20, 30, 40, 50] {
        tree.insert(key, RecordLocation::new(key, 0, 8)).unwrap();
    }

    assert!(tree.remove(30).unwrap());
    assert!(tree.search(30).unwrap().is_none());

    let rest: Vec<u64> = tree
        .range_search(0, 100)
        .unwrap()
        .iter()
        .map(|loc| loc.page_id())
        .collect();
    assert_eq!(rest, vec![10, 20, 40, 50]);
}

#[test]
fn blob_round_trip_ten_thousand_bytes() {
    let dir = tempdir().unwrap();
    let engine = StorageEngine::initialize(dir.path().join("blob.db")).unwrap();

    let mut rng = StdRng::seed_from_u64(0x6D74_6462);
    let payload: Vec<u8> = (0..10_000).map(|_| rng.random()).collect();

    let before = engine.total_pages();
    let first_page = engine.write_blob(&payload).unwrap();

    assert_eq!(
        engine.total_pages() - before,
        blob_page_count(payload.len()) as u64
    );
    assert_eq!(blob_page_count(payload.len()), 10_000_usize.div_ceil(BLOB_CHUNK_SIZE));
    assert_eq!(engine.read_blob(first_page, payload.len()).unwrap(), payload);
}

#[test]
fn id_counters_survive_reopen_and_never_repeat() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ids.db");

    let mut seen = Vec::new();
    for _ in 0..3 {
        let engine = if path.exists() {
            StorageEngine::open(&path).unwrap()
        } else {
            StorageEngine::initialize(&path).unwrap()
        };
        for _ in 0..5 {
            seen.push(engine.next_meeting_id());
        }
        engine.write_header().unwrap();
        engine.close().unwrap();
    }

    let expected: Vec<u64> = (1..=15).collect();
    assert_eq!(seen, expected);
}

#[test]
fn file_upload_flow_with_blob_and_dedup_index() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("files.db");

    let mut rng = StdRng::seed_from_u64(7);
    let content: Vec<u8> = (0..25_000).map(|_| rng.random()).collect();

    let file_loc;
    {
        let engine = StorageEngine::initialize(&path).unwrap();

        let data_page_id = engine.write_blob(&content).unwrap();
        let file = FileRecord {
            file_id: engine.next_file_id(),
            meeting_id: 1,
            uploader_id: 2,
            filename: "slides.pdf".into(),
            content_hash: format!("{:016x}", fnv1a(&content)),
            file_size: content.len() as u64,
            uploaded_at: 1_700_001_000,
            data_page_id,
        };

        let mut buf = vec![0u8; FileRecord::SERIALIZED_SIZE];
        file.serialize(&mut buf).unwrap();
        file_loc = store_record(&engine, &buf);

        let mut files = BTree::new(&engine);
        files.insert(file.file_id, file_loc).unwrap();
        let mut dedup = HashTable::new(&engine);
        dedup.initialize().unwrap();
        dedup.insert(&file.content_hash, file_loc).unwrap();

        engine.update_header(|h| {
            h.set_files_root(files.root_page_id());
            h.set_file_dedup_hash(dedup.header_page_id());
        });
        engine.write_header().unwrap();
        engine.close().unwrap();
    }

    let engine = StorageEngine::open(&path).unwrap();
    let header = engine.header();

    let files = BTree::load(&engine, header.files_root());
    let found = files.search(1).unwrap().unwrap();
    assert_eq!(found, file_loc);

    let record = FileRecord::deserialize(&fetch_record(&engine, found)).unwrap();
    assert_eq!(record.filename, "slides.pdf");
    assert_eq!(record.file_size, 25_000);

    let blob = engine
        .read_blob(record.data_page_id, record.file_size as usize)
        .unwrap();
    assert_eq!(blob, content);

    let dedup = HashTable::load(&engine, header.file_dedup_hash()).unwrap();
    assert_eq!(dedup.search(&record.content_hash).unwrap(), Some(file_loc));
}

#[test]
fn chat_messages_listed_in_range_order() {
    let dir = tempdir().unwrap();
    let engine = StorageEngine::initialize(dir.path().join("chat.db")).unwrap();

    let mut messages = BTree::new(&engine);
    for n in 0..50u64 {
        let message = Message {
            message_id: engine.next_message_id(),
            meeting_id: 1,
            user_id: 1 + n % 3,
            username: format!("user{}", 1 + n % 3),
            content: format!("message number {n}"),
            timestamp: 1_700_000_000 + n,
        };

        let mut buf = vec![0u8; Message::SERIALIZED_SIZE];
        message.serialize(&mut buf).unwrap();
        let loc = store_record(&engine, &buf);
        messages.insert(message.message_id, loc).unwrap();
    }

    let locations = messages.range_search(11, 20).unwrap();
    assert_eq!(locations.len(), 10);

    for (i, loc) in locations.iter().enumerate() {
        let message = Message::deserialize(&fetch_record(&engine, *loc)).unwrap();
        assert_eq!(message.message_id, 11 + i as u64);
        assert_eq!(message.content, format!("message number {}", 10 + i));
    }
}
