use approx::assert_abs_diff_eq;
use geo_window::{PixelBox, Polygon};

fn l_shape() -> Polygon {
    // an L-shaped region: a 10x10 square missing its top-right 5x5 quarter
    Polygon::new(vec![
        (0.0, 0.0),
        (5.0, 0.0),
        (5.0, 5.0),
        (10.0, 5.0),
        (10.0, 10.0),
        (0.0, 10.0),
        (0.0, 0.0),
    ])
    .unwrap()
}

#[test]
fn polygon_area_and_bounds() {
    let aoi = l_shape();
    assert_abs_diff_eq!(aoi.area(), 75.0);
    assert_eq!(aoi.bounds(), PixelBox::from_hw(10, 10));
}

#[test]
fn polygon_contains_windows() {
    let aoi = l_shape();
    assert!(aoi.contains_box(&PixelBox::make_square(0, 0, 5)));
    assert!(aoi.contains_box(&PixelBox::make_square(5, 5, 5)));
    assert!(!aoi.contains_box(&PixelBox::make_square(0, 5, 5)));
    assert!(!aoi.contains_box(&PixelBox::make_square(2, 2, 6)));
}

#[test]
fn notched_polygon_rejects_windows_spanning_the_notch() {
    // a U-shaped region: a 10x10 square with a 2-wide notch cut up from the bottom
    let aoi = Polygon::new(vec![
        (0.0, 0.0),
        (4.0, 0.0),
        (4.0, 8.0),
        (6.0, 8.0),
        (6.0, 0.0),
        (10.0, 0.0),
        (10.0, 10.0),
        (0.0, 10.0),
    ])
    .unwrap();

    // every corner falls in one of the arms but the window straddles the notch
    let window = PixelBox::new(2, 2, 6, 8).unwrap();
    assert!(window.corners().iter().all(|&c| aoi.contains_point(c)));
    assert!(!aoi.contains_point((5.0, 4.0)));
    assert!(!aoi.contains_box(&window));

    // the notch itself has all of its corners on the boundary
    assert!(!aoi.contains_box(&PixelBox::new(0, 4, 8, 6).unwrap()));

    assert!(aoi.contains_box(&PixelBox::new(0, 0, 10, 4).unwrap()));
    assert!(aoi.contains_box(&PixelBox::new(0, 6, 10, 10).unwrap()));
    assert!(aoi.contains_box(&PixelBox::new(8, 0, 10, 10).unwrap()));
}

#[test]
fn box_polygon_round_trip() {
    let window = PixelBox::new(1, 2, 3, 4).unwrap();
    let polygon = Polygon::from(window);
    assert_eq!(polygon.bounds(), window);
    assert!(polygon.contains_box(&window));
    assert_eq!(window.to_polygon_coords().len(), 5);
}

#[test]
fn degenerate_polygon_is_rejected() {
    assert!(Polygon::new(vec![(0.0, 0.0), (1.0, 1.0)]).is_err());
    assert!(serde_json::from_str::<Polygon>("[[0, 0], [1, 0]]").is_err());
}
