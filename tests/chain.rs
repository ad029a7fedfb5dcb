use bitcoin::hashes::Hash;
use bitcoin::pow::Work;
use bitcoin::{BlockHash, TxMerkleNode};
use hive_node::error::ChainError;
use hive_node::{BlockIndex, Chain, ChainEntry, ChainStore};
use tempfile::TempDir;

fn unit_work() -> Work {
    let mut raw = [0u8; 32];
    raw[31] = 1;
    Work::from_be_bytes(raw)
}

fn entry_with_time(height: u32, branch: u8, time: u32, prev: Option<&ChainEntry>) -> ChainEntry {
    let mut raw = [0u8; 32];
    raw[0..4].copy_from_slice(&height.to_le_bytes());
    raw[4] = branch;
    raw[5] = 0xcc;
    ChainEntry {
        hash: BlockHash::from_byte_array(raw),
        version: 1,
        prev_block: prev.map_or_else(BlockHash::all_zeros, |prev| prev.hash),
        merkle_root: TxMerkleNode::all_zeros(),
        time,
        time_max: prev.map_or(time, |prev| prev.time_max.max(time)),
        bits: 0x207f_ffff,
        nonce: 0,
        height,
        chainwork: prev.map_or_else(unit_work, |prev| prev.chainwork + unit_work()),
        skip: None,
    }
}

fn entry(height: u32, branch: u8, prev: Option<&ChainEntry>) -> ChainEntry {
    entry_with_time(height, branch, 1_600_000_000 + height * 600, prev)
}

/// Link `count` new entries on top of `from`, returning them in height order
fn extend(index: &mut BlockIndex, from: &ChainEntry, count: u32, branch: u8) -> Vec<ChainEntry> {
    let mut entries = Vec::with_capacity(count as usize);
    let mut prev = *from;
    for _ in 0..count {
        let linked = index
            .insert(entry(prev.height + 1, branch, Some(&prev)))
            .unwrap();
        entries.push(linked);
        prev = linked;
    }
    entries
}

/// Genesis plus `length - 1` linked entries on branch 0
fn build_main(index: &mut BlockIndex, length: u32) -> Vec<ChainEntry> {
    let genesis = index.insert(entry(0, 0, None)).unwrap();
    let mut entries = vec![genesis];
    entries.extend(extend(index, &genesis, length - 1, 0));
    entries
}

/// Reference implementation: one previous-link at a time
fn naive_ancestor(index: &BlockIndex, from: &ChainEntry, height: u32) -> ChainEntry {
    let mut cursor = *from;
    while cursor.height > height {
        cursor = *index.get(&cursor.prev_block).unwrap();
    }
    cursor
}

#[test]
fn ancestor_matches_naive_walk() {
    let mut index = BlockIndex::new();
    let main = build_main(&mut index, 2_000);
    let tip = *main.last().unwrap();

    for height in 0..2_000 {
        let found = index.ancestor(&tip, height).unwrap();
        assert_eq!(found.height, height);
        assert_eq!(found.hash, naive_ancestor(&index, &tip, height).hash);
        assert_eq!(found.hash, main[height as usize].hash);
    }
}

#[test]
fn insert_requires_known_previous_entry() {
    let mut index = BlockIndex::new();
    let genesis = index.insert(entry(0, 0, None)).unwrap();
    let child = entry(1, 0, Some(&genesis));
    let orphan = entry(2, 0, Some(&child));

    match index.insert(orphan) {
        Err(ChainError::UnknownPreviousEntry(hash)) => assert_eq!(hash, child.hash),
        other => panic!("expected unknown previous entry, got {:?}", other.map(|e| e.hash)),
    }

    index.insert(child).unwrap();
    index.insert(orphan).unwrap();
    assert_eq!(index.len(), 3);
    assert!(index.contains(&child.hash));
    assert!(!index.is_empty());
}

#[test]
fn entry_from_header_round_trips() {
    use bitcoin::block::{Header, Version};
    use bitcoin::CompactTarget;

    let genesis_header = Header {
        version: Version::from_consensus(1),
        prev_blockhash: BlockHash::all_zeros(),
        merkle_root: TxMerkleNode::all_zeros(),
        time: 1_600_000_000,
        bits: CompactTarget::from_consensus(0x207f_ffff),
        nonce: 42,
    };
    let genesis = ChainEntry::from_block_header(&genesis_header, None, genesis_header.work());
    assert!(genesis.is_genesis());
    assert_eq!(genesis.hash, genesis_header.block_hash());
    assert_eq!(genesis.time_max, genesis_header.time);

    let child_header = Header {
        prev_blockhash: genesis_header.block_hash(),
        // an earlier timestamp must not pull the running maximum down
        time: 1_599_999_000,
        nonce: 43,
        ..genesis_header
    };
    let child = ChainEntry::from_block_header(&child_header, Some(&genesis), child_header.work());
    assert_eq!(child.height, 1);
    assert_eq!(child.prev_block, genesis.hash);
    assert_eq!(child.time_max, genesis.time_max);
    assert!(child.chainwork > genesis.chainwork);

    let mut index = BlockIndex::new();
    index.insert(genesis).unwrap();
    let linked = index.insert(child).unwrap();
    assert_eq!(linked.skip, Some(genesis.hash));

    assert_eq!(Header::from(&linked), child_header);
}

#[test]
fn last_common_ancestor_is_symmetric() {
    let mut index = BlockIndex::new();
    let main = build_main(&mut index, 100);
    let branch = extend(&mut index, &main[49], 70, 1);

    let a = *main.last().unwrap();
    let b = *branch.last().unwrap();

    let ab = index.last_common_ancestor(&a, &b).unwrap().hash;
    let ba = index.last_common_ancestor(&b, &a).unwrap().hash;
    assert_eq!(ab, ba);
    assert_eq!(ab, main[49].hash);

    // an entry is its own ancestor
    assert_eq!(index.last_common_ancestor(&a, &a).unwrap().hash, a.hash);

    // pairs drawn from both branches always meet at or below the fork
    for (x, y) in [(&main[80], &branch[10]), (&main[20], &branch[69])] {
        let lca = index.last_common_ancestor(x, y).unwrap();
        assert_eq!(
            lca.hash,
            index.last_common_ancestor(y, x).unwrap().hash
        );
        assert!(lca.height <= 49);
    }
}

#[test]
fn disjoint_roots_have_no_common_ancestor() {
    let mut index = BlockIndex::new();
    let main = build_main(&mut index, 10);
    let other_genesis = index.insert(entry(0, 7, None)).unwrap();
    let other = extend(&mut index, &other_genesis, 5, 7);

    assert!(index
        .last_common_ancestor(&main[9], other.last().unwrap())
        .is_none());
}

#[test]
fn set_tip_grows_shrinks_and_switches() {
    let mut index = BlockIndex::new();
    let main = build_main(&mut index, 100);
    let main_tip = *main.last().unwrap();

    let mut chain = Chain::new();
    assert_eq!(chain.height(), None);
    assert!(chain.tip().is_none());

    chain.set_tip(Some(&main_tip), &index);
    assert_eq!(chain.height(), Some(99));
    assert_eq!(chain.tip().unwrap().hash, main_tip.hash);
    assert_eq!(chain.genesis().unwrap().hash, main[0].hash);
    for entry in &main {
        assert!(chain.contains(entry));
        assert_eq!(chain.get(entry.height).unwrap().hash, entry.hash);
    }

    // switch to a longer branch sharing the first 50 entries
    let branch = extend(&mut index, &main[49], 70, 1);
    let branch_tip = *branch.last().unwrap();
    chain.set_tip(Some(&branch_tip), &index);

    assert_eq!(chain.height(), Some(119));
    for entry in main.iter().take(50) {
        assert_eq!(chain.get(entry.height).unwrap().hash, entry.hash);
    }
    for entry in &branch {
        assert_eq!(chain.get(entry.height).unwrap().hash, entry.hash);
    }
    // the displaced suffix of the old chain is gone
    assert!(!chain.contains(&main[50]));
    assert!(!chain.contains(&main_tip));

    // shrink to a lower tip on the same branch
    chain.set_tip(Some(&branch[9]), &index);
    assert_eq!(chain.height(), Some(59));
    assert_eq!(chain.tip().unwrap().hash, branch[9].hash);
    assert!(chain.get(60).is_none());

    chain.set_tip(None, &index);
    assert!(chain.is_empty());
}

#[test]
fn next_follows_the_active_chain_only() {
    let mut index = BlockIndex::new();
    let main = build_main(&mut index, 50);
    let branch = extend(&mut index, &main[20], 10, 1);

    let mut chain = Chain::new();
    chain.set_tip(Some(main.last().unwrap()), &index);

    assert_eq!(chain.next(&main[10]).unwrap().hash, main[11].hash);
    assert!(chain.next(main.last().unwrap()).is_none());
    assert!(chain.next(&branch[0]).is_none());
}

#[test]
fn find_fork_returns_deepest_shared_entry() {
    let mut index = BlockIndex::new();
    let main = build_main(&mut index, 100);
    let branch = extend(&mut index, &main[49], 70, 1);

    let mut chain = Chain::new();
    chain.set_tip(Some(main.last().unwrap()), &index);

    // a competing branch forks where the sharing ends
    let fork = chain.find_fork(branch.last().unwrap(), &index).unwrap();
    assert_eq!(fork.hash, main[49].hash);

    // an entry on the chain is its own fork point
    let fork = chain.find_fork(&main[30], &index).unwrap();
    assert_eq!(fork.hash, main[30].hash);

    // an entry above the tip descends to it first
    chain.set_tip(Some(&main[59]), &index);
    let fork = chain.find_fork(main.last().unwrap(), &index).unwrap();
    assert_eq!(fork.hash, main[59].hash);

    let empty = Chain::new();
    assert!(empty.find_fork(main.last().unwrap(), &index).is_none());
}

#[test]
fn find_earliest_at_least_matches_linear_scan() {
    let mut index = BlockIndex::new();
    // raw times wobble backwards; the running maximum does not
    let times = [1_000, 1_200, 1_150, 1_400, 1_350, 1_600];
    let mut prev: Option<ChainEntry> = None;
    let mut entries = Vec::new();
    for (height, time) in times.iter().enumerate() {
        let linked = index
            .insert(entry_with_time(height as u32, 0, *time, prev.as_ref()))
            .unwrap();
        entries.push(linked);
        prev = Some(linked);
    }

    let mut chain = Chain::new();
    chain.set_tip(prev.as_ref(), &index);

    for probe in [0, 1_000, 1_001, 1_150, 1_201, 1_400, 1_401, 1_600, 1_601] {
        let expected = entries.iter().find(|entry| entry.time_max >= probe);
        let found = chain.find_earliest_at_least(probe);
        assert_eq!(found.map(|e| e.hash), expected.map(|e| e.hash), "probe {}", probe);
    }
}

#[test]
fn locator_is_sparse_and_ends_at_genesis() {
    let mut index = BlockIndex::new();
    let main = build_main(&mut index, 2_000);
    let main_tip = *main.last().unwrap();

    let mut chain = Chain::new();
    chain.set_tip(Some(&main_tip), &index);

    let locator = chain.locator(None, &index);
    assert_eq!(locator.first().unwrap(), &main_tip.hash);
    assert_eq!(locator.last().unwrap(), &main[0].hash);
    assert!(locator.len() < 32, "locator has {} hashes", locator.len());

    // dense for the first ten hops, then strictly descending strides
    let heights: Vec<u32> = locator
        .iter()
        .map(|hash| index.get(hash).unwrap().height)
        .collect();
    for pair in heights.windows(2) {
        assert!(pair[1] < pair[0]);
    }
    assert_eq!(heights[0..11], (1989..=1999).rev().collect::<Vec<u32>>()[..]);

    let empty = Chain::new();
    assert!(empty.locator(None, &index).is_empty());
}

#[test]
fn locator_from_a_forked_entry_reaches_the_chain() {
    let mut index = BlockIndex::new();
    let main = build_main(&mut index, 100);
    let branch = extend(&mut index, &main[49], 30, 1);

    let mut chain = Chain::new();
    chain.set_tip(Some(main.last().unwrap()), &index);

    let locator = chain.locator(Some(branch.last().unwrap()), &index);
    assert_eq!(locator.first().unwrap(), &branch.last().unwrap().hash);
    assert_eq!(locator.last().unwrap(), &main[0].hash);
}

#[test]
fn store_round_trips_index_and_chain() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().unwrap();

    let mut index = BlockIndex::new();
    let main = build_main(&mut index, 120);
    let branch = extend(&mut index, &main[49], 90, 1);
    let branch_tip = *branch.last().unwrap();

    {
        let store = ChainStore::open(dir.path().into()).unwrap();
        for entry in main.iter().chain(branch.iter()) {
            store.save_entry(entry).unwrap();
        }
        store.set_tip(&branch_tip.hash).unwrap();
    }

    let store = ChainStore::open(dir.path().into()).unwrap();
    assert_eq!(store.tip().unwrap(), Some(branch_tip.hash));

    let loaded = store.load_index().unwrap();
    assert_eq!(loaded.len(), index.len());
    for entry in main.iter().chain(branch.iter()) {
        assert_eq!(loaded.get(&entry.hash), Some(entry));
    }

    // the reloaded skip pointers drive ancestor queries as before
    let reloaded_tip = *loaded.get(&branch_tip.hash).unwrap();
    for height in [0, 1, 49, 50, 100, 139] {
        assert_eq!(
            loaded.ancestor(&reloaded_tip, height).unwrap().hash,
            index.ancestor(&branch_tip, height).unwrap().hash
        );
    }

    let chain = store.load_chain(&loaded).unwrap();
    assert_eq!(chain.height(), Some(139));
    assert_eq!(chain.tip().unwrap().hash, branch_tip.hash);
    assert_eq!(chain.genesis().unwrap().hash, main[0].hash);
}
