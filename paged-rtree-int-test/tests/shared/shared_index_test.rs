use paged_rtree::{BoundingBox, SharedRTree, SpatialIndex};
use paged_rtree_int_test::test_util::{cleanup, create_small_test_context, run_test};
use std::thread;

#[test]
fn test_concurrent_writers_and_readers() {
    run_test(
        create_small_test_context,
        |ctx| {
            let index = SharedRTree::create(ctx.path(), ctx.config())?;

            let writers: Vec<_> = (0..4u64)
                .map(|t| {
                    let index = index.clone();
                    thread::spawn(move || {
                        for i in 0..100u64 {
                            let x = (i % 10) as f64 * 10.0 + t as f64 * 200.0;
                            let y = (i / 10) as f64 * 10.0;
                            index
                                .add(&BoundingBox::new(x, y, x + 5.0, y + 5.0), t * 1000 + i)
                                .unwrap();
                        }
                    })
                })
                .collect();
            let reader = {
                let index = index.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let hits = index
                            .find_intersecting_keys(&BoundingBox::new(0.0, 0.0, 1000.0, 1000.0))
                            .unwrap();
                        assert!(hits.len() <= 400);
                    }
                })
            };
            for handle in writers {
                handle.join().unwrap();
            }
            reader.join().unwrap();

            assert_eq!(index.size(), 400);
            index.check_tree()?;
            // each writer owns a disjoint 200 unit wide band
            let band = index.find_contained_keys(&BoundingBox::new(200.0, 0.0, 399.0, 100.0))?;
            assert_eq!(band.len(), 100);
            assert!(band.iter().all(|row_id| (1000..1100).contains(row_id)));
            index.close()?;

            let reopened = SharedRTree::open(ctx.path())?;
            assert_eq!(reopened.size(), 400);
            reopened.close()
        },
        cleanup,
    );
}

#[test]
fn test_drop_tree_deletes_file() {
    run_test(
        create_small_test_context,
        |ctx| {
            let index = SharedRTree::create(ctx.path(), ctx.config())?;
            index.add(&BoundingBox::point(3.0, 4.0), 1)?;
            let nearest = index.find_nearest(0.0, 0.0, 1, None)?;
            assert_eq!(nearest.len(), 1);
            assert_eq!(nearest[0].0, 1);
            assert!((nearest[0].1 - 5.0).abs() < 1e-12);

            index.drop_tree()?;
            assert!(!ctx.path().exists());
            assert!(index.add(&BoundingBox::point(1.0, 1.0), 2).is_err());
            Ok(())
        },
        cleanup,
    );
}
