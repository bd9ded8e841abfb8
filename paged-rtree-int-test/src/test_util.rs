use paged_rtree::{BoundingBox, IndexConfig, RowId, SpatialResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;

/// Runs a test between a setup and a teardown step.
///
/// `after` runs whether or not the test body fails, and the test body's
/// error wins over the teardown's when both fail.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> SpatialResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> SpatialResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> SpatialResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    let start_time = Instant::now();
    let result = std::panic::catch_unwind(|| {
        let backtrace = Backtrace::capture();
        let ctx = match before() {
            Ok(ctx) => ctx,
            Err(e) => return Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
        };
        let test_result = test(ctx.clone());
        let after_result = after(ctx);
        match (test_result, after_result) {
            (Ok(_), Ok(_)) => Ok(()),
            (Err(e), _) => Err((format!("Test failed: {:?}", e), backtrace.to_string())),
            (Ok(_), Err(e)) => Err((format!("After run failed: {:?}", e), backtrace.to_string())),
        }
    });

    let (message, backtrace) = match result {
        Ok(Ok(_)) => return,
        Ok(Err((message, backtrace))) => (message, Some(backtrace)),
        Err(panic_err) => {
            let message = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            (format!("Panic: {}", message), None)
        }
    };

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Took {:?}", start_time.elapsed());
    eprintln!("Error: {}", message);
    if let Some(bt) = backtrace.filter(|bt| !bt.is_empty() && !bt.contains("disabled")) {
        eprintln!("\nBacktrace:\n{}", bt);
    }
    eprintln!("=====================================================\n");
    panic!("{}", message);
}

/// Scratch directory plus the index file path a test works on.
///
/// Clones share the directory; it is removed when the last clone goes.
#[derive(Clone)]
pub struct TestContext {
    dir: Arc<TempDir>,
    path: PathBuf,
    config: IndexConfig,
}

impl TestContext {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> IndexConfig {
        self.config
    }

    /// Another file path inside the same scratch directory
    pub fn sibling(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub fn create_test_context(config: IndexConfig) -> SpatialResult<TestContext> {
    let dir = tempfile::Builder::new().prefix("paged-rtree-").tempdir()?;
    let path = dir.path().join("index.rtree");
    Ok(TestContext {
        dir: Arc::new(dir),
        path,
        config,
    })
}

/// Small pages and a small branching factor so that modest data sets
/// already build several levels.
pub fn create_small_test_context() -> SpatialResult<TestContext> {
    create_test_context(
        IndexConfig::new()
            .with_branching_factor(8)
            .with_page_size(512),
    )
}

pub fn cleanup(ctx: TestContext) -> SpatialResult<()> {
    if ctx.path.exists() {
        std::fs::remove_file(&ctx.path)?;
    }
    Ok(())
}

/// Seeded boxes with sides up to `max_side` inside `[0, extent)`.
pub fn random_entries(
    seed: u64,
    count: usize,
    extent: f64,
    max_side: f64,
) -> Vec<(BoundingBox, RowId)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count as RowId)
        .map(|row_id| (random_box(&mut rng, extent, max_side), row_id))
        .collect()
}

pub fn random_box(rng: &mut impl Rng, extent: f64, max_side: f64) -> BoundingBox {
    let x = rng.gen_range(0.0..extent);
    let y = rng.gen_range(0.0..extent);
    let w = rng.gen_range(0.0..=max_side);
    let h = rng.gen_range(0.0..=max_side);
    BoundingBox::new(x, y, x + w, y + h)
}

/// Row ids intersecting `query` by linear scan, sorted
pub fn brute_force_intersecting(
    entries: &[(BoundingBox, RowId)],
    query: &BoundingBox,
) -> Vec<RowId> {
    let mut hits: Vec<RowId> = entries
        .iter()
        .filter(|(bbox, _)| bbox.intersects(query))
        .map(|(_, row_id)| *row_id)
        .collect();
    hits.sort_unstable();
    hits
}

pub fn sorted(mut ids: Vec<RowId>) -> Vec<RowId> {
    ids.sort_unstable();
    ids
}
