//! Property tests for the pure grouping contract of the concurrent stage.

use std::path::PathBuf;

use dupsweep::duplicates::finder::group_records;
use dupsweep::scanner::{DigestKind, FileRecord};
use proptest::prelude::*;

/// Build records from (size-choice, digest-choice) pairs, indexed by
/// position. Shuffling the result simulates arbitrary hash completion
/// order.
fn records_from(pairs: Vec<(u8, u8)>) -> Vec<(usize, FileRecord)> {
    pairs
        .into_iter()
        .enumerate()
        .map(|(index, (size_choice, digest_choice))| {
            let record = FileRecord {
                path: PathBuf::from(format!("/f{index}.bin")),
                size: 100 + u64::from(size_choice),
                digest: Some(format!("digest-{size_choice}-{digest_choice}")),
                digest_kind: Some(DigestKind::Md5),
            };
            (index, record)
        })
        .collect()
}

/// Recover the discovery index baked into a test path name.
fn index_of(path: &std::path::Path) -> usize {
    let name = path.file_stem().unwrap().to_str().unwrap();
    name.trim_start_matches('f').parse().unwrap()
}

proptest! {
    /// Group membership is independent of completion order, members come
    /// back sorted by discovery index, and no singleton survives.
    #[test]
    fn group_records_restores_discovery_order(
        records in prop::collection::vec((0..3u8, 0..3u8), 0..40)
            .prop_map(records_from)
            .prop_shuffle()
    ) {
        let groups = group_records(records);

        for group in &groups {
            prop_assert!(group.len() >= 2);

            // Members are in ascending discovery order.
            let indices: Vec<usize> = group.paths.iter().map(|p| index_of(p)).collect();
            prop_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        }

        // Groups themselves are ordered by their first member's index.
        let firsts: Vec<usize> = groups
            .iter()
            .filter_map(|g| g.paths.first())
            .map(|p| index_of(p))
            .collect();
        prop_assert!(firsts.windows(2).all(|w| w[0] < w[1]));
    }

    /// Two records with different sizes never land in one group, even when
    /// their digest strings collide.
    #[test]
    fn group_records_never_mixes_sizes(
        pairs in prop::collection::vec((0..3u8, 0..3u8), 0..40)
    ) {
        let mut records = records_from(pairs);
        // Force digest collisions across sizes.
        for (_, record) in &mut records {
            record.digest = Some("colliding".to_string());
        }

        for group in group_records(records) {
            prop_assert!(group.paths.len() >= 2);
            prop_assert!(group.size >= 100 && group.size < 103);
        }
    }

    /// Records without a digest never appear in any group.
    #[test]
    fn group_records_ignores_digestless_records(
        pairs in prop::collection::vec((0..2u8, 0..2u8), 0..30),
        drop_every in 1..5usize
    ) {
        let mut records = records_from(pairs);
        let mut dropped = Vec::new();
        for (i, (_, record)) in records.iter_mut().enumerate() {
            if i % drop_every == 0 {
                record.digest = None;
                record.digest_kind = None;
                dropped.push(record.path.clone());
            }
        }

        let groups = group_records(records);
        for group in &groups {
            for path in &group.paths {
                prop_assert!(!dropped.contains(path));
            }
        }
    }
}
