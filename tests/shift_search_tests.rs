use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tile_shift::*;

fn reference_transform() -> AffineTransform {
    AffineTransform::new(1000.0, 1.0, 0.0, 2000.0, 0.0, -1.0)
}

fn tile_transform(x: f64, y: f64) -> AffineTransform {
    AffineTransform::new(x, 1.0, 0.0, y, 0.0, -1.0)
}

fn uniform_reference() -> Raster {
    Raster::filled(10, 10, 5, reference_transform())
}

/// Reference whose windows differ at every integer offset
fn gradient_reference() -> Raster {
    let pixels = Array2::from_shape_fn((10, 10), |(r, c)| (c * 7 + r * 13) as u8);
    Raster::new(pixels, reference_transform())
}

/// Tile cut from the reference at `(col, row)` using the `+1` convention
fn tile_from(reference: &Raster, col: i64, row: i64, ncols: usize, nrows: usize) -> Array2<u8> {
    reference.read_window(col, row, ncols, nrows).unwrap().mapv(|v| v + 1)
}

fn search(reference: &Raster) -> ShiftSearch<'_, Raster> {
    ShiftSearch::new(reference, reference.transform)
}

#[test]
fn test_uniform_scenario_whole_tile_match() {
    let reference = uniform_reference();
    let tile = Array2::from_elem((4, 4), 6u8);

    let found = search(&reference)
        .find_shift(tile.view(), &tile_transform(1003.0, 1997.0))
        .unwrap()
        .expect("tile should match");

    assert_eq!((found.dx(), found.dy()), (0.0, 0.0));
    assert_eq!(found.overlap, OverlapMask::NONE);
    assert_eq!(found.overlap.bits(), 0);
}

#[test]
fn test_uniform_scenario_corrupted_west_column() {
    let reference = uniform_reference();
    let mut tile = Array2::from_elem((4, 4), 6u8);
    tile.column_mut(0).fill(9);

    let search = search(&reference);
    let whole = search
        .try_shift(tile.view(), &tile_transform(1003.0, 1997.0), Margin::ZERO)
        .unwrap();
    assert!(whole.is_none());

    let found = search
        .find_shift(tile.view(), &tile_transform(1003.0, 1997.0))
        .unwrap()
        .expect("west exclusion should match");
    assert_eq!(found.overlap, OverlapMask::WEST);
    assert_eq!(found.overlap.bits(), 1);
    assert_eq!((found.dx(), found.dy()), (0.0, 0.0));
}

#[test]
fn test_zero_shift_identity_on_textured_reference() {
    let reference = gradient_reference();
    let tile = tile_from(&reference, 2, 3, 5, 4);

    let found = search(&reference)
        .find_shift(tile.view(), &tile_transform(1002.0, 1997.0))
        .unwrap()
        .unwrap();
    assert_eq!(found.overlap, OverlapMask::NONE);
    assert!(found.dx().abs() < 1e-9);
    assert!(found.dy().abs() < 1e-9);
}

#[test]
fn test_subpixel_misregistration_snaps_to_grid() {
    let reference = gradient_reference();
    let tile = tile_from(&reference, 2, 3, 4, 4);

    // Claimed origin maps to (1.6, 2.8); the true origin (2, 3) is the
    // (1, 1) neighbour of the floored position
    let found = search(&reference)
        .find_shift(tile.view(), &tile_transform(1001.6, 1997.2))
        .unwrap()
        .unwrap();
    assert_eq!(found.overlap, OverlapMask::NONE);
    assert!((found.dx() - 0.4).abs() < 1e-9);
    assert!((found.dy() + 0.2).abs() < 1e-9);

    let (x, y) = tile_transform(1001.6, 1997.2)
        .translated(found.dx(), found.dy())
        .to_geo(0.0, 0.0);
    assert_eq!(reference.transform.to_grid(x, y).unwrap(), (2.0, 3.0));
}

#[test]
fn test_single_edge_preferred_over_pairs() {
    let reference = uniform_reference();
    let mut tile = Array2::from_elem((6, 6), 6u8);
    tile.column_mut(0).fill(9);

    // W, W|N, W|E, ... would all match; the single edge comes first
    let found = search(&reference)
        .find_shift(tile.view(), &tile_transform(1002.0, 1998.0))
        .unwrap()
        .unwrap();
    assert_eq!(found.overlap, OverlapMask::WEST);
}

#[test]
fn test_west_east_pair_found_when_no_single_edge_works() {
    let reference = uniform_reference();
    let mut tile = Array2::from_elem((6, 6), 6u8);
    tile.column_mut(0).fill(9);
    tile.column_mut(5).fill(9);

    let found = search(&reference)
        .find_shift(tile.view(), &tile_transform(1002.0, 1998.0))
        .unwrap()
        .unwrap();
    assert_eq!(found.overlap, Edge::West | Edge::East);
    assert_eq!(found.overlap.bits(), 5);
}

#[test]
fn test_north_south_beats_later_pairs() {
    let reference = uniform_reference();
    let mut tile = Array2::from_elem((6, 6), 6u8);
    tile.row_mut(0).fill(9);
    tile.row_mut(5).fill(9);

    let found = search(&reference)
        .find_shift(tile.view(), &tile_transform(1002.0, 1998.0))
        .unwrap()
        .unwrap();
    assert_eq!(found.overlap, Edge::North | Edge::South);
}

#[test]
fn test_three_edges_excluded() {
    let reference = uniform_reference();
    let mut tile = Array2::from_elem((6, 6), 6u8);
    tile.column_mut(0).fill(9);
    tile.row_mut(0).fill(9);
    tile.row_mut(5).fill(9);

    let found = search(&reference)
        .find_shift(tile.view(), &tile_transform(1002.0, 1998.0))
        .unwrap()
        .unwrap();
    assert_eq!(found.overlap, Edge::West | Edge::North | Edge::South);
}

#[test]
fn test_nodata_pixels_never_affect_match() {
    let reference = gradient_reference();
    let mut tile = tile_from(&reference, 3, 3, 4, 4);
    tile[[0, 0]] = 255;
    tile[[2, 1]] = 255;
    tile[[3, 3]] = 255;

    let found = search(&reference)
        .find_shift(tile.view(), &tile_transform(1003.0, 1997.0))
        .unwrap()
        .unwrap();
    assert_eq!(found.overlap, OverlapMask::NONE);
}

#[test]
fn test_custom_sentinel_and_offset() {
    let reference = uniform_reference();
    let mut tile = Array2::from_elem((4, 4), 5u8);
    tile[[1, 1]] = 200;

    let config = SearchConfig {
        value_offset: 0,
        nodata_sentinel: 200,
        margin_divisor: 3,
    };
    let found = search(&reference)
        .with_config(config)
        .unwrap()
        .find_shift(tile.view(), &tile_transform(1003.0, 1997.0))
        .unwrap()
        .unwrap();
    assert_eq!(found.overlap, OverlapMask::NONE);
}

#[test]
fn test_exhaustion_returns_none() {
    let reference = uniform_reference();
    let mut tile = Array2::from_elem((4, 4), 6u8);
    // Survives every margin combination
    tile[[1, 1]] = 9;

    let found = search(&reference)
        .find_shift(tile.view(), &tile_transform(1003.0, 1997.0))
        .unwrap();
    assert!(found.is_none());
}

#[test]
fn test_tile_outside_reference_is_no_match() {
    let reference = uniform_reference();
    let tile = Array2::from_elem((4, 4), 6u8);

    let found = search(&reference)
        .find_shift(tile.view(), &tile_transform(1500.0, 1500.0))
        .unwrap();
    assert!(found.is_none());
}

#[test]
fn test_candidates_past_reference_edge_are_skipped() {
    let reference = uniform_reference();
    let tile = Array2::from_elem((4, 4), 6u8);

    // Floors to (-1, -1): only the last candidate (0, 0) lies inside
    let found = search(&reference)
        .find_shift(tile.view(), &tile_transform(999.5, 2000.5))
        .unwrap()
        .unwrap();
    assert_eq!(found.overlap, OverlapMask::NONE);
    assert!((found.dx() - 0.5).abs() < 1e-9);
    assert!((found.dy() + 0.5).abs() < 1e-9);
}

#[test]
fn test_degenerate_reference_transform_is_an_error() {
    let reference = Raster::filled(10, 10, 5, AffineTransform::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0));
    let tile = Array2::from_elem((4, 4), 6u8);

    let err = search(&reference)
        .find_shift(tile.view(), &tile_transform(3.0, 3.0))
        .unwrap_err();
    assert!(matches!(err, ShiftError::DegenerateTransform { .. }));
}

#[test]
fn test_find_shift_band_reads_tile_once() {
    let reference = uniform_reference();
    let tile = Raster::filled(4, 4, 6, tile_transform(1003.0, 1997.0));

    let found = search(&reference)
        .find_shift_band(&tile, &tile.transform)
        .unwrap()
        .unwrap();
    assert_eq!(found.overlap, OverlapMask::NONE);
}

#[test]
fn test_transform_round_trip() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..500 {
        let gt = AffineTransform::new(
            rng.gen_range(-1e6..1e6),
            rng.gen_range(0.1..100.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1e6..1e6),
            rng.gen_range(-1.0..1.0),
            -rng.gen_range(0.1..100.0),
        );
        if gt.determinant().abs() < 0.05 {
            continue;
        }

        let col: f64 = rng.gen_range(-1000.0..1000.0);
        let row: f64 = rng.gen_range(-1000.0..1000.0);
        let (x, y) = gt.to_geo(col, row);
        let (c, r) = gt.to_grid(x, y).unwrap();

        assert!((c - col).abs() < 1e-4, "col {} -> {} for {:?}", col, c, gt);
        assert!((r - row).abs() < 1e-4, "row {} -> {} for {:?}", row, r, gt);
    }
}
