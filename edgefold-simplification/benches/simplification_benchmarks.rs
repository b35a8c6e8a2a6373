//! Benchmarks for shortest and longest first edge collapse, plus the raw heap

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use edgefold_core::{Face, Point3f, PolyMesh};
use edgefold_simplification::{
    CollapseOrder, EdgeCollapseSimplifier, MeshSimplifier, MinFirst, PriorityHeap, SimplifyParams,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn generate_grid_mesh(size: usize) -> PolyMesh {
    let mut vertices = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 / (size - 1) as f32 * std::f32::consts::PI;
            let fy = y as f32 / (size - 1) as f32 * std::f32::consts::PI;
            vertices.push(Point3f::new(
                x as f32,
                y as f32,
                (fx.sin() * fy.sin()) * 2.0,
            ));
        }
    }
    let mut faces = Vec::with_capacity((size - 1) * (size - 1) * 2);
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = y * size + x;
            let tr = tl + 1;
            let bl = (y + 1) * size + x;
            let br = bl + 1;
            faces.push(Face::triangle(tl, bl, tr));
            faces.push(Face::triangle(tr, bl, br));
        }
    }
    PolyMesh::from_vertices_and_faces(vertices, faces)
}

fn bench_simplification(c: &mut Criterion) {
    let sizes = [10, 20, 40];
    let keep = [0.7, 0.5, 0.3];

    let mut group = c.benchmark_group("simplification");

    for &size in &sizes {
        let mesh = generate_grid_mesh(size);
        let face_count = mesh.face_count();

        for &fraction in &keep {
            let target = (fraction * face_count as f32) as usize;
            for order in [CollapseOrder::ShortestFirst, CollapseOrder::LongestFirst] {
                let name = match order {
                    CollapseOrder::ShortestFirst => "shortest_first",
                    CollapseOrder::LongestFirst => "longest_first",
                };
                let label = format!("{}f_k{}", face_count, (fraction * 100.0) as u32);
                group.bench_with_input(
                    BenchmarkId::new(name, label),
                    &mesh,
                    |b, mesh| {
                        let simplifier = EdgeCollapseSimplifier::with_params(
                            SimplifyParams::new().with_target_faces(target),
                            order,
                        );
                        b.iter(|| {
                            let result = simplifier.simplify(black_box(mesh)).unwrap();
                            black_box(result);
                        });
                    },
                );
            }
        }
    }

    group.finish();
}

fn bench_heap(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap");

    for &n in &[1_000usize, 10_000, 100_000] {
        let mut rng = StdRng::seed_from_u64(7);
        let values: Vec<u32> = (0..n).map(|_| rng.gen()).collect();

        group.bench_with_input(BenchmarkId::new("insert_drain", n), &values, |b, values| {
            b.iter(|| {
                let mut heap = PriorityHeap::with_capacity(MinFirst, values.len());
                for &v in values {
                    heap.insert(v);
                }
                while let Ok(v) = heap.delete_min() {
                    black_box(v);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("delete_by_handle", n), &values, |b, values| {
            b.iter(|| {
                let mut heap = PriorityHeap::with_capacity(MinFirst, values.len());
                let handles: Vec<_> = values.iter().map(|&v| heap.insert(v)).collect();
                for handle in handles.into_iter().rev() {
                    black_box(heap.delete(handle).unwrap());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_simplification, bench_heap);
criterion_main!(benches);
