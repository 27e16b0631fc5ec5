use std::hint::black_box;
use std::time::Instant;

use spherefield_mesh::{Mesh, SphereParams};

fn bench_generate(sectors: u32, stacks: u32, iterations: usize) {
    let params = SphereParams {
        radius: 0.5,
        sectors,
        stacks,
    };

    let start = Instant::now();
    let mut vertices = 0;
    for _ in 0..iterations {
        let mesh = Mesh::sphere(black_box(params)).expect("valid sphere params");
        vertices = mesh.vertex_count();
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  sphere {sectors}x{stacks} ({vertices} vertices, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn main() {
    println!("=== Sphere Mesh Benchmarks ===\n");

    println!("Generate:");
    bench_generate(16, 8, 10000);
    bench_generate(32, 16, 1000);
    bench_generate(128, 64, 100);
    bench_generate(512, 256, 10);

    println!("\n=== Done ===");
}
