use paged_rtree::{BoundingBox, DiskRTree, IndexConfig, RowId, SpatialResult};
use paged_rtree_int_test::test_util::{
    brute_force_intersecting, cleanup, create_test_context, random_box, random_entries, run_test,
    sorted, TestContext,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Interleaves inserts and deletes against a plain list, saving and
/// reopening on a fixed cadence and checking the tree after each phase.
fn mixed_workload(ctx: &TestContext, seed: u64, operations: usize) -> SpatialResult<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut model: Vec<(BoundingBox, RowId)> = Vec::new();
    let mut next_id: RowId = 0;
    let mut tree = DiskRTree::create(ctx.path(), ctx.config())?;

    for op in 1..=operations {
        if model.is_empty() || rng.gen_bool(0.65) {
            let bbox = random_box(&mut rng, 1000.0, 30.0);
            tree.insert(&bbox, next_id)?;
            model.push((bbox, next_id));
            next_id += 1;
        } else {
            let (bbox, row_id) = model.swap_remove(rng.gen_range(0..model.len()));
            assert!(tree.delete(&bbox, row_id)?, "row {} was not found", row_id);
        }

        if op % 100 == 0 {
            tree.check_tree()?;
            assert_eq!(tree.size(), model.len() as u64);
            let query = random_box(&mut rng, 1000.0, 200.0);
            assert_eq!(
                sorted(tree.query_vec(&query)?),
                brute_force_intersecting(&model, &query)
            );
        }
        if op % 250 == 0 {
            tree.save()?;
        }
        if op % 600 == 0 {
            tree.close()?;
            tree = DiskRTree::open(ctx.path())?;
            assert_eq!(tree.size(), model.len() as u64);
        }
    }

    tree.close()?;
    let mut tree = DiskRTree::open(ctx.path())?;
    tree.check_tree()?;
    let everything = BoundingBox::new(-1.0, -1.0, 2000.0, 2000.0);
    assert_eq!(
        sorted(tree.query_vec(&everything)?),
        brute_force_intersecting(&model, &everything)
    );
    tree.close()
}

#[test]
fn test_mixed_workload_smallest_fanout() {
    run_test(
        || create_test_context(IndexConfig::new().with_branching_factor(3).with_page_size(256)),
        |ctx| mixed_workload(&ctx, 21, 1500),
        cleanup,
    );
}

#[test]
fn test_mixed_workload_wide_fanout() {
    run_test(
        || create_test_context(IndexConfig::new().with_branching_factor(16).with_page_size(1024)),
        |ctx| mixed_workload(&ctx, 22, 3000),
        cleanup,
    );
}

#[test]
fn test_nearest_after_reopen_matches_scan() {
    run_test(
        || create_test_context(IndexConfig::new().with_branching_factor(6).with_page_size(512)),
        |ctx| {
            let entries = random_entries(23, 800, 1000.0, 10.0);
            DiskRTree::bulk_load(ctx.path(), ctx.config(), entries.clone())?.close()?;

            let mut tree = DiskRTree::open(ctx.path())?;
            let (x, y) = (412.5, 377.0);
            let found = tree.nearest(x, y, 15, None)?;
            assert_eq!(found.len(), 15);

            let mut distances: Vec<f64> = entries
                .iter()
                .map(|(bbox, _)| bbox.distance_to_point(x, y))
                .collect();
            distances.sort_by(f64::total_cmp);
            for (i, (row_id, distance)) in found.iter().enumerate() {
                assert!((distance - distances[i]).abs() < 1e-9);
                let (bbox, _) = entries[*row_id as usize];
                assert!((bbox.distance_to_point(x, y) - distance).abs() < 1e-9);
            }

            let limited = tree.nearest(x, y, usize::MAX, Some(25.0))?;
            let expected = distances.iter().filter(|d| **d <= 25.0).count();
            assert_eq!(limited.len(), expected);
            tree.close()
        },
        cleanup,
    );
}

#[test]
fn test_freed_pages_are_reused() {
    run_test(
        || create_test_context(IndexConfig::new().with_branching_factor(4).with_page_size(256)),
        |ctx| {
            let entries = random_entries(24, 1000, 1000.0, 10.0);
            let mut tree = DiskRTree::create(ctx.path(), ctx.config())?;
            for (bbox, row_id) in &entries {
                tree.insert(bbox, *row_id)?;
            }
            tree.save()?;
            let first_peak = tree.stats().page_count;

            for (bbox, row_id) in &entries {
                assert!(tree.delete(bbox, *row_id)?);
            }
            tree.save()?;
            assert!(tree.stats().free_pages > 0);

            for (bbox, row_id) in &entries {
                tree.insert(bbox, *row_id)?;
            }
            tree.save()?;
            let second_peak = tree.stats().page_count;
            assert!(
                second_peak <= first_peak + first_peak / 10 + 2,
                "file grew from {} to {} pages",
                first_peak,
                second_peak
            );
            tree.close()
        },
        cleanup,
    );
}
