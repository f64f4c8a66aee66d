use cloudshade::core::gap_fill::fill_nearest;
use cloudshade::core::shadow_caster::{ShadowCaster, ShadowParams};
use cloudshade::{MaskGrid, RealGrid};
use std::time::Instant;

fn synthetic_scene(shape: (usize, usize)) -> (MaskGrid, RealGrid, RealGrid) {
    let clouds = MaskGrid::from_shape_fn(shape, |(i, j)| {
        let (ci, cj) = (i % 64, j % 80);
        (ci as i64 - 20).pow(2) + (cj as i64 - 30).pow(2) < 100
    });
    let azimuth = RealGrid::from_shape_fn(shape, |(i, j)| 140.0 + i as f32 * 0.02 - j as f32 * 0.01);
    let zenith = RealGrid::from_shape_fn(shape, |(i, _)| 25.0 + i as f32 * 0.01);
    (clouds, azimuth, zenith)
}

#[test]
fn test_parallel_vs_sequential_ray_trace() {
    let _ = env_logger::builder().is_test(true).try_init();

    let shape = (512, 640);
    let (clouds, azimuth, zenith) = synthetic_scene(shape);
    let cloud_count = clouds.iter().filter(|&&c| c).count();
    println!("\n=== Ray trace: {} cloud pixels on {}x{} grid ===", cloud_count, shape.0, shape.1);

    let sequential = ShadowCaster::with_params(ShadowParams {
        pixel_size_m: 30.0,
        enable_parallel: false,
        ..Default::default()
    })
    .expect("valid params");
    let parallel = ShadowCaster::with_params(ShadowParams {
        pixel_size_m: 30.0,
        chunk_size: 256,
        enable_parallel: true,
        ..Default::default()
    })
    .expect("valid params");

    let start = Instant::now();
    let sequential_result = sequential
        .cast_shadows(&clouds, &azimuth, &zenith)
        .expect("sequential ray trace");
    let sequential_time = start.elapsed();

    let start = Instant::now();
    let parallel_result = parallel
        .cast_shadows(&clouds, &azimuth, &zenith)
        .expect("parallel ray trace");
    let parallel_time = start.elapsed();

    println!("  - Sequential: {:.3} seconds", sequential_time.as_secs_f64());
    println!("  - Parallel:   {:.3} seconds", parallel_time.as_secs_f64());
    println!(
        "  - Speedup:    {:.2}x",
        sequential_time.as_secs_f64() / parallel_time.as_secs_f64().max(1e-9)
    );

    // Min-reduction leaves no room for scheduling effects
    assert_eq!(sequential_result, parallel_result);
    assert!(parallel_result.iter().any(|&d| d > 0.0));
}

#[test]
fn test_gap_fill_large_grid() {
    let shape = (300, 400);
    let grid = RealGrid::from_shape_fn(shape, |(i, j)| {
        if i % 5 == 0 && j % 5 == 0 {
            (i + j) as f32
        } else {
            f32::NAN
        }
    });

    let start = Instant::now();
    let filled = fill_nearest(grid.view(), None);
    println!("Gap fill of {}x{} grid: {:.3} seconds", shape.0, shape.1, start.elapsed().as_secs_f64());

    assert!(filled.iter().all(|v| !v.is_nan()));
    // (2, 2) is nearest to (0, 0) on the 5-pixel lattice
    assert_eq!(filled[[2, 2]], 0.0);
    assert_eq!(filled[[3, 3]], 10.0);
}

#[test]
fn test_gap_fill_wide_contiguous_hole() {
    // Only the first column is valid, so the hole spans the whole grid width
    let n = 1500;
    let grid = RealGrid::from_shape_fn((n, n), |(i, j)| if j == 0 { i as f32 } else { f32::NAN });

    let start = Instant::now();
    let filled = fill_nearest(grid.view(), None);
    let elapsed = start.elapsed();
    println!("Gap fill of {}x{} grid with one valid column: {:.3} seconds", n, n, elapsed.as_secs_f64());

    for ((i, _), &v) in filled.indexed_iter() {
        assert_eq!(v, i as f32);
    }
    assert!(elapsed.as_secs_f64() < 30.0, "gap fill took {:?}", elapsed);
}
