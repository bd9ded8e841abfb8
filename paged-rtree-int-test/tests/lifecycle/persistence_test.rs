use paged_rtree::{BoundingBox, DiskRTree, RowId, SpatialError};
use paged_rtree_int_test::test_util::{
    brute_force_intersecting, cleanup, create_small_test_context, random_entries, run_test, sorted,
};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};

#[test]
fn test_round_trip_across_sessions() {
    run_test(
        create_small_test_context,
        |ctx| {
            let entries = random_entries(11, 500, 1000.0, 20.0);
            let mut tree = DiskRTree::create(ctx.path(), ctx.config())?;
            for (bbox, row_id) in &entries {
                tree.insert(bbox, *row_id)?;
            }
            let height = tree.height();
            tree.close()?;

            let mut tree = DiskRTree::open(ctx.path())?;
            assert_eq!(tree.size(), 500);
            assert_eq!(tree.height(), height);
            assert_eq!(tree.branching_factor(), 8);
            for query in [
                BoundingBox::new(0.0, 0.0, 100.0, 100.0),
                BoundingBox::new(400.0, 250.0, 650.0, 700.0),
                BoundingBox::point(500.0, 500.0),
            ] {
                assert_eq!(
                    sorted(tree.query_vec(&query)?),
                    brute_force_intersecting(&entries, &query)
                );
            }
            tree.check_tree()?;
            tree.close()
        },
        cleanup,
    );
}

#[test]
fn test_many_sessions_accumulate() {
    run_test(
        create_small_test_context,
        |ctx| {
            let entries = random_entries(12, 300, 500.0, 10.0);
            DiskRTree::create(ctx.path(), ctx.config())?.close()?;

            // each session adds 60 entries and removes 10 of the previous ones
            let mut live: Vec<(BoundingBox, RowId)> = Vec::new();
            for chunk in entries.chunks(60) {
                let mut tree = DiskRTree::open(ctx.path())?;
                assert_eq!(tree.size(), live.len() as u64);
                for (bbox, row_id) in chunk {
                    tree.insert(bbox, *row_id)?;
                }
                let stale = live.len().min(10);
                let removed: Vec<(BoundingBox, RowId)> = live.drain(..stale).collect();
                for (bbox, row_id) in removed {
                    assert!(tree.delete(&bbox, row_id)?);
                }
                live.extend_from_slice(chunk);
                tree.close()?;
            }

            let mut tree = DiskRTree::open(ctx.path())?;
            tree.check_tree()?;
            let mut expected: Vec<_> = live.iter().map(|(_, row_id)| *row_id).collect();
            expected.sort_unstable();
            let found = tree
                .entries()?
                .into_iter()
                .map(|(_, row_id)| row_id)
                .collect::<Vec<_>>();
            assert_eq!(sorted(found), expected);
            tree.close()
        },
        cleanup,
    );
}

#[test]
fn test_unsaved_changes_lost_on_crash() {
    run_test(
        create_small_test_context,
        |ctx| {
            let entries = random_entries(13, 200, 1000.0, 20.0);
            let mut tree = DiskRTree::create(ctx.path(), ctx.config())?;
            for (bbox, row_id) in &entries[..100] {
                tree.insert(bbox, *row_id)?;
            }
            tree.save()?;
            for (bbox, row_id) in &entries[100..] {
                tree.insert(bbox, *row_id)?;
            }
            assert!(tree.delete(&entries[0].0, entries[0].1)?);
            // the process dies before the next save
            std::mem::forget(tree);

            let mut tree = DiskRTree::open(ctx.path())?;
            assert_eq!(tree.size(), 100);
            tree.check_tree()?;
            let everything = BoundingBox::new(-1.0, -1.0, 2000.0, 2000.0);
            assert_eq!(
                sorted(tree.query_vec(&everything)?),
                (0..100).collect::<Vec<_>>()
            );
            tree.close()
        },
        cleanup,
    );
}

#[test]
fn test_drop_commits_open_tree() {
    run_test(
        create_small_test_context,
        |ctx| {
            {
                let mut tree = DiskRTree::create(ctx.path(), ctx.config())?;
                for (bbox, row_id) in random_entries(14, 50, 100.0, 5.0) {
                    tree.insert(&bbox, row_id)?;
                }
            }
            let tree = DiskRTree::open(ctx.path())?;
            assert_eq!(tree.size(), 50);
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_corrupt_header_rejected() {
    run_test(
        create_small_test_context,
        |ctx| {
            DiskRTree::create(ctx.path(), ctx.config())?.close()?;

            let mut file = OpenOptions::new().write(true).open(ctx.path())?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&[0u8; 8])?;
            file.sync_all()?;
            drop(file);

            assert!(matches!(
                DiskRTree::open(ctx.path()),
                Err(SpatialError::CorruptIndex(_))
            ));
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_truncated_file_rejected() {
    run_test(
        create_small_test_context,
        |ctx| {
            let mut tree = DiskRTree::create(ctx.path(), ctx.config())?;
            for (bbox, row_id) in random_entries(15, 300, 1000.0, 20.0) {
                tree.insert(&bbox, row_id)?;
            }
            tree.save()?;
            let page_count = tree.stats().page_count;
            tree.close()?;
            assert!(page_count > 3);

            let file = OpenOptions::new().write(true).open(ctx.path())?;
            file.set_len(ctx.config().page_size() as u64 * 2)?;
            drop(file);

            assert!(matches!(
                DiskRTree::open(ctx.path()),
                Err(SpatialError::CorruptIndex(_))
            ));
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_open_missing_file() {
    run_test(
        create_small_test_context,
        |ctx| {
            assert!(matches!(
                DiskRTree::open(ctx.sibling("missing.rtree")),
                Err(SpatialError::Io(_))
            ));
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_patched_entry_count_rejected() {
    run_test(
        create_small_test_context,
        |ctx| {
            let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
            let mut tree = DiskRTree::create(ctx.path(), ctx.config())?;
            tree.insert(&bbox, 1)?;
            tree.close()?;

            // entry_count lives at bytes 48..56 of the header page
            let mut file = OpenOptions::new().write(true).open(ctx.path())?;
            file.seek(SeekFrom::Start(48))?;
            file.write_all(&0u64.to_le_bytes())?;
            file.sync_all()?;
            drop(file);

            assert!(matches!(
                DiskRTree::open(ctx.path()),
                Err(SpatialError::CorruptIndex(_))
            ));
            Ok(())
        },
        cleanup,
    );
}
