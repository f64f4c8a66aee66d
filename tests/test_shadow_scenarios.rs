use cloudshade::core::glt::{GeometricLookupTable, UnorthoParams};
use cloudshade::core::pipeline::{CloudShadowProcessor, ProcessingParams};
use cloudshade::core::shadow_caster::{ShadowCaster, ShadowParams};
use cloudshade::{CloudShadowError, MaskGrid, RealGrid};
use ndarray::{Array2, Array3};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_single_cloud_line_is_bounded() {
    init_logging();

    let shape = (10, 10);
    let mut clouds = MaskGrid::from_elem(shape, false);
    clouds[[5, 5]] = true;
    let azimuth = RealGrid::from_elem(shape, 0.0);
    let zenith = RealGrid::from_elem(shape, 30.0);

    let params = ShadowParams {
        pixel_size_m: 60.0,
        cloud_height_m: 4000.0,
        ..Default::default()
    };
    let caster = ShadowCaster::with_params(params).expect("valid params");
    let distances = caster.cast_shadows(&clouds, &azimuth, &zenith).expect("ray trace");

    let shaded: Vec<((usize, usize), f32)> = distances
        .indexed_iter()
        .filter(|&(_, &d)| d > 0.0)
        .map(|(idx, &d)| (idx, d))
        .collect();
    println!("Shaded pixels: {:?}", shaded);

    // One pixel per row below the cloud down to the bottom edge
    assert_eq!(shaded.len(), 4);
    for (k, ((row, _), d)) in shaded.iter().enumerate() {
        assert_eq!(*row, 6 + k);
        assert!(*d >= (k + 1) as f32);
    }
    // Distances grow along the ray
    assert!(shaded.windows(2).all(|w| w[0].1 < w[1].1));
    assert_eq!(distances[[5, 5]], 0.0);
}

#[test]
fn test_nearest_cloud_wins() {
    let shape = (3, 40);
    let mut clouds = MaskGrid::from_elem(shape, false);
    clouds[[1, 10]] = true;
    clouds[[1, 14]] = true;
    // Sun in the west: shadows fall towards +x
    let azimuth = RealGrid::from_elem(shape, 255.0);
    let zenith = RealGrid::from_elem(shape, 10.0);

    let caster = ShadowCaster::with_params(ShadowParams {
        pixel_size_m: 30.0,
        ..Default::default()
    })
    .expect("valid params");
    let distances = caster.cast_shadows(&clouds, &azimuth, &zenith).expect("ray trace");

    // Column 17 is 7 pixels from one cloud and 3 from the other
    assert!((distances[[1, 17]] - 3.0).abs() < 1e-4);
    assert!((distances[[1, 12]] - 2.0).abs() < 1e-4);
    assert_eq!(distances[[0, 17]], 0.0);
}

#[test]
fn test_reverse_order_gives_identical_grid() {
    let shape = (40, 55);
    let clouds = MaskGrid::from_shape_fn(shape, |(i, j)| (i / 5 + j / 7) % 4 == 0);
    let azimuth = RealGrid::from_shape_fn(shape, |(i, j)| 100.0 + (i as f32) * 0.5 + (j as f32) * 0.25);
    let zenith = RealGrid::from_shape_fn(shape, |(i, _)| 20.0 + i as f32 * 0.5);

    let caster = ShadowCaster::with_params(ShadowParams {
        pixel_size_m: 30.0,
        chunk_size: 16,
        ..Default::default()
    })
    .expect("valid params");

    let forward = ShadowCaster::cloud_pixels(&clouds);
    let reverse: Vec<_> = forward.iter().rev().copied().collect();

    let a = caster.cast_rays(&forward, &clouds, &azimuth, &zenith).expect("forward");
    let b = caster.cast_rays(&reverse, &clouds, &azimuth, &zenith).expect("reverse");
    assert_eq!(a, b);

    let final_a = a.finalize(&clouds).expect("finalize");
    for ((i, j), &cloud) in clouds.indexed_iter() {
        if cloud {
            assert_eq!(final_a[[i, j]], 0.0);
        }
    }
}

#[test]
fn test_pipeline_with_partial_glt() {
    init_logging();

    // Sensor grid 8x12, map grid 10x14 with a one-cell nodata border
    let (sensor_rows, sensor_cols) = (8, 12);
    let (map_rows, map_cols) = (10, 14);
    let mut data = Array3::<i32>::zeros((map_rows, map_cols, 2));
    for i in 1..map_rows - 1 {
        for j in 1..map_cols - 1 {
            data[[i, j, 0]] = j as i32;
            data[[i, j, 1]] = i as i32;
        }
    }
    let glt = GeometricLookupTable::new(data).expect("valid GLT");

    let mut clouds = Array2::<f32>::zeros((sensor_rows, sensor_cols));
    clouds[[2, 3]] = 1.0;
    clouds[[2, 4]] = 1.0;
    let azimuth = Array2::<f32>::from_elem((sensor_rows, sensor_cols), 300.0);
    let zenith = Array2::<f32>::from_elem((sensor_rows, sensor_cols), 40.0);

    let processor = CloudShadowProcessor::new(ProcessingParams::default()).expect("valid params");
    let product = processor
        .process(clouds.view(), azimuth.view(), zenith.view(), &glt)
        .expect("processing");

    assert_eq!(product.map_distances.dim(), (map_rows, map_cols));
    assert_eq!(product.sensor_distances.dim(), (sensor_rows, sensor_cols));
    assert_eq!(product.stats.cloud_pixels, 2);
    assert_eq!(product.stats.valid_glt_cells, sensor_rows * sensor_cols);
    assert_eq!(product.stats.unfilled_pixels, 0);
    assert!(product.stats.shaded_pixels > 0);

    // Clouds stay at zero after the round trip
    assert_eq!(product.sensor_distances[[2, 3]], 0.0);
    assert_eq!(product.sensor_distances[[2, 4]], 0.0);

    // The sensor raster is the map raster shifted back by the border
    for i in 0..sensor_rows {
        for j in 0..sensor_cols {
            assert_eq!(product.sensor_distances[[i, j]], product.map_distances[[i + 1, j + 1]]);
        }
    }
}

#[test]
fn test_unreachable_sensor_pixels_stay_nodata() {
    // Only sensor row 0 is referenced; fill radius of one pixel reaches row 1
    let mut data = Array3::<i32>::zeros((1, 4, 2));
    for j in 0..4 {
        data[[0, j, 0]] = j as i32 + 1;
        data[[0, j, 1]] = 1;
    }
    let glt = GeometricLookupTable::new(data).expect("valid GLT");

    let clouds = Array2::<f32>::zeros((4, 4));
    let angles = Array2::<f32>::from_elem((4, 4), 30.0);
    let params = ProcessingParams {
        unortho: UnorthoParams {
            max_fill_radius: Some(1),
            ..Default::default()
        },
        ..Default::default()
    };
    let product = CloudShadowProcessor::new(params)
        .expect("valid params")
        .process(clouds.view(), angles.view(), angles.view(), &glt)
        .expect("processing");

    assert!(product.sensor_distances.row(1).iter().all(|&d| d == 0.0));
    assert!(product.sensor_distances.row(3).iter().all(|d| d.is_nan()));
    assert_eq!(product.stats.unfilled_pixels, 8);
}

#[test]
fn test_glt_outside_sensor_grid_fails_fast() {
    let mut data = Array3::<i32>::zeros((2, 2, 2));
    data[[1, 1, 0]] = 5;
    data[[1, 1, 1]] = 1;
    let glt = GeometricLookupTable::new(data).expect("valid GLT");

    let grid = Array2::<f32>::zeros((2, 2));
    let err = CloudShadowProcessor::default()
        .process(grid.view(), grid.view(), grid.view(), &glt)
        .unwrap_err();
    assert!(matches!(err, CloudShadowError::InvalidLookupTable(_)));
}
