use paged_rtree::{BoundingBox, DiskRTree, IndexConfig};
use paged_rtree_int_test::test_util::{cleanup, create_test_context, run_test, sorted};

#[test]
fn test_four_corners_with_smallest_fanout() {
    run_test(
        || create_test_context(IndexConfig::new().with_branching_factor(3).with_page_size(256)),
        |ctx| {
            let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
            let mut tree = DiskRTree::create(ctx.path(), ctx.config())?;
            tree.insert(&a, 1)?;
            tree.insert(&BoundingBox::new(5.0, 5.0, 6.0, 6.0), 2)?;
            tree.insert(&BoundingBox::new(0.0, 5.0, 1.0, 6.0), 3)?;
            tree.insert(&BoundingBox::new(5.0, 0.0, 6.0, 1.0), 4)?;

            assert!(tree.height() >= 2);
            assert_eq!(
                sorted(tree.query_vec(&BoundingBox::new(0.0, 0.0, 6.0, 6.0))?),
                vec![1, 2, 3, 4]
            );
            assert_eq!(tree.query_vec(&a)?, vec![1]);

            assert!(tree.delete(&a, 1)?);
            assert_eq!(tree.size(), 3);
            assert!(tree.query_vec(&a)?.is_empty());
            tree.check_tree()?;
            tree.close()?;

            let mut tree = DiskRTree::open(ctx.path())?;
            assert_eq!(tree.size(), 3);
            assert!(tree.query_vec(&a)?.is_empty());
            assert_eq!(
                sorted(tree.query_vec(&BoundingBox::new(0.0, 0.0, 6.0, 6.0))?),
                vec![2, 3, 4]
            );
            tree.close()
        },
        cleanup,
    );
}

#[test]
fn test_delete_until_empty_then_refill() {
    run_test(
        || create_test_context(IndexConfig::new().with_branching_factor(3).with_page_size(256)),
        |ctx| {
            let boxes: Vec<BoundingBox> = (0..40)
                .map(|i| {
                    let x = (i % 8) as f64 * 3.0;
                    let y = (i / 8) as f64 * 3.0;
                    BoundingBox::new(x, y, x + 2.0, y + 2.0)
                })
                .collect();

            let mut tree = DiskRTree::create(ctx.path(), ctx.config())?;
            for (i, bbox) in boxes.iter().enumerate() {
                tree.insert(bbox, i as u64)?;
            }
            tree.save()?;

            for (i, bbox) in boxes.iter().enumerate() {
                assert!(tree.delete(bbox, i as u64)?);
            }
            assert_eq!(tree.size(), 0);
            assert_eq!(tree.height(), 1);
            tree.check_tree()?;
            tree.close()?;

            let mut tree = DiskRTree::open(ctx.path())?;
            assert_eq!(tree.size(), 0);
            tree.insert(&boxes[0], 99)?;
            assert_eq!(tree.query_vec(&boxes[0])?, vec![99]);
            tree.close()
        },
        cleanup,
    );
}
