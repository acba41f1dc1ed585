//! Benchmark for `search` and `neighbors` performance
//!
//! Indexes 1M randomly distributed boxes in a 100x100 space and runs box
//! searches at several coverage levels (100%, 50%, 10%, 1%, 0.01%) followed by
//! k-nearest-neighbor queries.

use hilbert_select::{HilbertRTree, PriorityQueue};
use rand::Rng;
use rand::SeedableRng;
use std::time::Instant;

/// Generate a random bounding box with size UP TO `max_size`
fn add_random_box<R: Rng>(rng: &mut R, boxes: &mut Vec<f64>, max_size: f64) {
    let min_x = rng.random_range(0.0..(100.0 - max_size));
    let min_y = rng.random_range(0.0..(100.0 - max_size));
    let max_x = min_x + rng.random_range(0.0..max_size);
    let max_y = min_y + rng.random_range(0.0..max_size);

    boxes.extend_from_slice(&[min_x, min_y, max_x, max_y]);
}

/// Benchmark search operations with different query box sizes
fn bench_search(tree: &HilbertRTree, boxes: &[f64], num_tests: usize, percentage_str: &str) {
    let mut found = 0_usize;
    let start = Instant::now();

    for chunk in boxes.chunks_exact(4) {
        found += tree
            .search(chunk[0], chunk[1], chunk[2], chunk[3])
            .map_or(0, |ids| ids.len());
    }

    let elapsed = start.elapsed();
    println!(
        "{} searches {}%: {}ms ({} hits)",
        num_tests,
        percentage_str,
        elapsed.as_millis(),
        found
    );
}

/// Benchmark K-nearest neighbor queries with a reused queue
fn bench_neighbors(tree: &HilbertRTree, coords: &[f64], num_tests: usize, k: usize) {
    let mut queue = PriorityQueue::new();
    let start = Instant::now();

    for i in 0..num_tests {
        let x = coords[4 * i];
        let y = coords[4 * i + 1];
        let _ids = tree.neighbors_with_queue(&mut queue, x, y, Some(k), None, |_| true);
    }

    let elapsed = start.elapsed();
    println!(
        "{} searches of {} neighbors: {}ms",
        num_tests,
        k,
        elapsed.as_millis()
    );
}

fn main() -> Result<(), hilbert_select::IndexError> {
    println!("Packed Hilbert R-tree Benchmark");
    println!("===============================\n");

    let num_items = 1_000_000;
    let num_tests = 1_000;

    let seed = 95756739_u64;
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let mut coords = Vec::with_capacity(4 * num_items);
    for _ in 0..num_items {
        add_random_box(&mut rng, &mut coords, 1.0);
    }

    let mut boxes_100 = Vec::new();
    let mut boxes_50 = Vec::new();
    let mut boxes_10 = Vec::new();
    let mut boxes_1 = Vec::new();
    let mut boxes_001 = Vec::new();

    for _ in 0..num_tests {
        boxes_100.extend_from_slice(&[0.0, 0.0, 100.0, 100.0]);
        add_random_box(&mut rng, &mut boxes_50, (0.5_f64).sqrt() * 100.0);
        add_random_box(&mut rng, &mut boxes_10, (0.1_f64).sqrt() * 100.0);
        add_random_box(&mut rng, &mut boxes_1, 10.0);
        add_random_box(&mut rng, &mut boxes_001, 1.0);
    }

    println!("Building index with {} items...", num_items);
    let start = Instant::now();
    let mut tree = HilbertRTree::new(num_items)?;
    for chunk in coords.chunks_exact(4) {
        tree.add(chunk[0], chunk[1], chunk[2], chunk[3])?;
    }
    tree.finish()?;
    let build_time = start.elapsed();

    println!(
        "Index built in {:.2}ms ({} bytes)\n",
        build_time.as_secs_f64() * 1000.0,
        tree.as_bytes()?.len()
    );

    println!("Running query benchmarks:");
    println!("-----------------------");
    bench_search(&tree, &boxes_100, num_tests, "100");
    bench_search(&tree, &boxes_50, num_tests, "50");
    bench_search(&tree, &boxes_10, num_tests, "10");
    bench_search(&tree, &boxes_1, num_tests, "1");
    bench_search(&tree, &boxes_001, num_tests, "0.01");
    println!();

    println!("Running neighbor benchmarks:");
    println!("-----------------------");
    bench_neighbors(&tree, &coords, num_tests, 100);
    bench_neighbors(&tree, &coords, 1, num_items);
    bench_neighbors(&tree, &coords, num_items / 10, 1);
    println!();

    Ok(())
}
