use crate::{common::*, PixelBox};

/// A simple polygon in pixel coordinates, given by its exterior ring of
/// `(x, y)` points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct Polygon {
    exterior: Vec<(f64, f64)>,
}

impl Polygon {
    pub fn new(exterior: Vec<(f64, f64)>) -> Result<Self> {
        let mut exterior = exterior;

        // drop the closing point if the ring is explicitly closed
        if exterior.len() > 1 && exterior.first() == exterior.last() {
            exterior.pop();
        }

        ensure!(
            exterior.len() >= 3,
            "a polygon needs at least 3 distinct points, but get {}",
            exterior.len()
        );
        ensure!(
            exterior.iter().all(|(x, y)| x.is_finite() && y.is_finite()),
            "polygon coordinates must be finite"
        );

        Ok(Self { exterior })
    }

    pub fn exterior(&self) -> &[(f64, f64)] {
        &self.exterior
    }

    fn edges(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        self.exterior
            .iter()
            .copied()
            .zip(self.exterior.iter().copied().cycle().skip(1))
    }

    /// Smallest pixel box enclosing the polygon.
    pub fn bounds(&self) -> PixelBox {
        let (xmin, xmax) = self
            .exterior
            .iter()
            .map(|(x, _)| *x)
            .minmax()
            .into_option()
            .unwrap_or((0.0, 0.0));
        let (ymin, ymax) = self
            .exterior
            .iter()
            .map(|(_, y)| *y)
            .minmax()
            .into_option()
            .unwrap_or((0.0, 0.0));

        // the ring is non-empty and finite, so the corners are ordered
        PixelBox::new(
            ymin.floor() as i64,
            xmin.floor() as i64,
            ymax.ceil() as i64,
            xmax.ceil() as i64,
        )
        .unwrap_or_else(|_| PixelBox::from_hw(0, 0))
    }

    /// Shoelace area.
    pub fn area(&self) -> f64 {
        let twice: f64 = self
            .edges()
            .map(|((x1, y1), (x2, y2))| x1 * y2 - x2 * y1)
            .sum();
        twice.abs() / 2.0
    }

    /// Even-odd containment test. Points exactly on an edge count as inside.
    pub fn contains_point(&self, (px, py): (f64, f64)) -> bool {
        let on_edge = self.edges().any(|((x1, y1), (x2, y2))| {
            let cross = (x2 - x1) * (py - y1) - (y2 - y1) * (px - x1);
            cross.abs() <= f64::EPSILON * 16.0
                && px >= x1.min(x2)
                && px <= x1.max(x2)
                && py >= y1.min(y2)
                && py <= y1.max(y2)
        });
        if on_edge {
            return true;
        }

        self.edges()
            .filter(|&((x1, y1), (x2, y2))| {
                (y1 > py) != (y2 > py) && px < (x2 - x1) * (py - y1) / (y2 - y1) + x1
            })
            .count()
            % 2
            == 1
    }

    /// Whether the whole box lies inside the polygon.
    ///
    /// All four corners and the center must be inside, and no polygon edge
    /// may pass through the open interior of the box.
    pub fn contains_box(&self, window: &PixelBox) -> bool {
        if !window
            .corners()
            .iter()
            .all(|&corner| self.contains_point(corner))
        {
            return false;
        }
        if window.area() == 0 {
            return true;
        }

        let bounds = (
            window.xmin() as f64,
            window.ymin() as f64,
            window.xmax() as f64,
            window.ymax() as f64,
        );
        let (l, t, r, b) = bounds;
        self.contains_point(((l + r) / 2.0, (t + b) / 2.0))
            && !self
                .edges()
                .any(|edge| segment_enters_box(edge, bounds))
    }
}

/// Liang-Barsky clip of a segment against the `(l, t, r, b)` box. Returns
/// true if a part of positive length lies strictly inside the box.
fn segment_enters_box(
    ((x1, y1), (x2, y2)): ((f64, f64), (f64, f64)),
    (l, t, r, b): (f64, f64, f64, f64),
) -> bool {
    let (dx, dy) = (x2 - x1, y2 - y1);
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    for (p, q) in [(-dx, x1 - l), (dx, r - x1), (-dy, y1 - t), (dy, b - y1)] {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
        } else {
            let u = q / p;
            if p < 0.0 {
                if u > t1 {
                    return false;
                }
                t0 = t0.max(u);
            } else {
                if u < t0 {
                    return false;
                }
                t1 = t1.min(u);
            }
        }
    }
    if t1 <= t0 {
        return false;
    }

    // a clipped piece lying on a side of the box has its midpoint on that side
    let mid = (t0 + t1) / 2.0;
    let (mx, my) = (x1 + mid * dx, y1 + mid * dy);
    mx > l && mx < r && my > t && my < b
}

impl TryFrom<Vec<(f64, f64)>> for Polygon {
    type Error = anyhow::Error;

    fn try_from(exterior: Vec<(f64, f64)>) -> Result<Self, Self::Error> {
        Self::new(exterior)
    }
}

impl From<Polygon> for Vec<(f64, f64)> {
    fn from(from: Polygon) -> Self {
        from.exterior
    }
}

impl From<PixelBox> for Polygon {
    fn from(window: PixelBox) -> Self {
        Self {
            exterior: window.corners().to_vec(),
        }
    }
}
