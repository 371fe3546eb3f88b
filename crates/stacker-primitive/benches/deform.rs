//! Benchmarks for box primitive deformation.
//!
//! Run with: cargo bench -p stacker-primitive

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stacker_math::{Point3, Vec3};
use stacker_primitive::{BoxPrimitive, CuboidParams, FaceId, PartMesh, PcaObbFitter};

/// A lumpy grid surface with `n * n` vertices.
fn create_sheet(n: u32) -> PartMesh {
    let mut positions = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let (x, y) = (f64::from(i) / f64::from(n), f64::from(j) / f64::from(n));
            let z = 0.1 * (6.0 * x).sin() * (4.0 * y).cos();
            positions.push(Point3::new(x, y, z));
        }
    }
    let mut triangles = Vec::new();
    for i in 0..n - 1 {
        for j in 0..n - 1 {
            let a = i * n + j;
            triangles.push([a, a + n, a + 1]);
            triangles.push([a + 1, a + n, a + n + 1]);
        }
    }
    PartMesh::new("sheet", positions, triangles)
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fit");
    for n in [32u32, 128] {
        let mesh = create_sheet(n);
        group.throughput(Throughput::Elements(u64::from(n * n)));
        group.bench_with_input(BenchmarkId::new("pca", n * n), &mesh, |b, mesh| {
            b.iter(|| BoxPrimitive::fit(black_box(mesh), &PcaObbFitter))
        });
    }
    group.finish();
}

fn bench_deform(c: &mut Criterion) {
    let mut group = c.benchmark_group("Deform");
    let params = CuboidParams {
        translation: [0.1, 0.0, 0.2],
        rotation: [5.0, 10.0, 15.0],
        scale: [1.1, 0.9, 1.2],
    };
    for n in [32u32, 128] {
        let mut mesh = create_sheet(n);
        let Ok(mut prim) = BoxPrimitive::fit(&mesh, &PcaObbFitter) else {
            continue;
        };
        group.throughput(Throughput::Elements(u64::from(n * n)));
        group.bench_function(BenchmarkId::new("deform_recover", n * n), |b| {
            b.iter(|| {
                let _ = prim.deform_cuboid(black_box(params), false, &mut mesh);
                let _ = prim.recover(&mut mesh);
            })
        });
        group.bench_function(BenchmarkId::new("reshape_face", n * n), |b| {
            let face = FaceId::from_axis(0, true);
            let target = prim.original_box().face_center(face) + Vec3::new(0.05, 0.0, 0.0);
            b.iter(|| {
                let mut p = prim.clone();
                let _ = p.reshape_face(face, black_box(target), &mut mesh);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fit, bench_deform);
criterion_main!(benches);
