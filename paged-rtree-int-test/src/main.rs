use paged_rtree::{BoundingBox, DiskRTree, IndexConfig, SpatialResult};
use paged_rtree_int_test::test_util::{cleanup, create_test_context, random_entries};

fn main() -> SpatialResult<()> {
    println!("Starting stress test...");
    let ctx = create_test_context(IndexConfig::default())?;

    let count = 200_000;
    let entries = random_entries(7, count, 10_000.0, 5.0);
    let mut tree = DiskRTree::create(ctx.path(), ctx.config())?;

    let start = std::time::Instant::now();
    for (i, (bbox, row_id)) in entries.iter().enumerate() {
        tree.insert(bbox, *row_id)?;
        if (i + 1) % 50_000 == 0 {
            tree.save()?;
            println!("Inserted {} entries in {:?}", i + 1, start.elapsed());
        }
    }
    tree.close()?;
    println!("Insert of {} entries took {:?}", count, start.elapsed());

    let start = std::time::Instant::now();
    let mut tree = DiskRTree::open(ctx.path())?;
    let mut hits = 0usize;
    for i in 0..1_000 {
        let x = (i % 100) as f64 * 100.0;
        let y = (i / 100) as f64 * 1_000.0;
        hits += tree.query_vec(&BoundingBox::new(x, y, x + 50.0, y + 50.0))?.len();
    }
    println!("1000 queries after reopen took {:?} ({} hits)", start.elapsed(), hits);

    let start = std::time::Instant::now();
    for (bbox, row_id) in entries.iter().step_by(2) {
        tree.delete(bbox, *row_id)?;
    }
    tree.close()?;
    println!("Deleting half of the entries took {:?}", start.elapsed());

    let stats = DiskRTree::open(ctx.path())?.stats();
    println!("Final stats: {:?}", stats);

    cleanup(ctx)?;
    Ok(())
}
