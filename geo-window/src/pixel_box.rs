use crate::common::*;

/// An axis-aligned window in pixel coordinates.
///
/// The box covers rows `ymin..ymax` and columns `xmin..xmax`. It is
/// serialized as the array `[ymin, xmin, ymax, xmax]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "[i64; 4]", into = "[i64; 4]")]
pub struct PixelBox {
    ymin: i64,
    xmin: i64,
    ymax: i64,
    xmax: i64,
}

impl PixelBox {
    pub fn new(ymin: i64, xmin: i64, ymax: i64, xmax: i64) -> Result<Self> {
        ensure!(
            ymin <= ymax && xmin <= xmax,
            "invalid box [{}, {}, {}, {}]: min corner exceeds max corner",
            ymin,
            xmin,
            ymax,
            xmax
        );
        Ok(Self {
            ymin,
            xmin,
            ymax,
            xmax,
        })
    }

    /// Square box with the top-left corner at `(ymin, xmin)`.
    pub fn make_square(ymin: i64, xmin: i64, size: usize) -> Self {
        let size = size as i64;
        Self {
            ymin,
            xmin,
            ymax: ymin + size,
            xmax: xmin + size,
        }
    }

    /// Box with the top-left corner at the origin.
    pub fn from_hw(height: usize, width: usize) -> Self {
        Self {
            ymin: 0,
            xmin: 0,
            ymax: height as i64,
            xmax: width as i64,
        }
    }

    pub fn ymin(&self) -> i64 {
        self.ymin
    }

    pub fn xmin(&self) -> i64 {
        self.xmin
    }

    pub fn ymax(&self) -> i64 {
        self.ymax
    }

    pub fn xmax(&self) -> i64 {
        self.xmax
    }

    pub fn height(&self) -> usize {
        (self.ymax - self.ymin) as usize
    }

    pub fn width(&self) -> usize {
        (self.xmax - self.xmin) as usize
    }

    pub fn area(&self) -> usize {
        self.height() * self.width()
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// Shrink the box by `erosion` pixels on every side.
    ///
    /// The result collapses to the center line instead of inverting.
    pub fn make_eroded(&self, erosion: usize) -> Self {
        let erosion = erosion as i64;
        let dy = cmp::min(erosion, (self.ymax - self.ymin) / 2);
        let dx = cmp::min(erosion, (self.xmax - self.xmin) / 2);
        Self {
            ymin: self.ymin + dy,
            xmin: self.xmin + dx,
            ymax: self.ymax - dy,
            xmax: self.xmax - dx,
        }
    }

    /// Move the box by `(dy, dx)`.
    pub fn shift(&self, dy: i64, dx: i64) -> Self {
        Self {
            ymin: self.ymin + dy,
            xmin: self.xmin + dx,
            ymax: self.ymax + dy,
            xmax: self.xmax + dx,
        }
    }

    pub fn intersection(&self, other: &PixelBox) -> Option<PixelBox> {
        let ymin = cmp::max(self.ymin, other.ymin);
        let xmin = cmp::max(self.xmin, other.xmin);
        let ymax = cmp::min(self.ymax, other.ymax);
        let xmax = cmp::min(self.xmax, other.xmax);
        (ymin < ymax && xmin < xmax).then(|| PixelBox {
            ymin,
            xmin,
            ymax,
            xmax,
        })
    }

    pub fn contains_box(&self, other: &PixelBox) -> bool {
        self.ymin <= other.ymin
            && self.xmin <= other.xmin
            && other.ymax <= self.ymax
            && other.xmax <= self.xmax
    }

    /// Corner points in `(x, y)` order, clockwise from the top-left.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let (t, l, b, r) = (
            self.ymin as f64,
            self.xmin as f64,
            self.ymax as f64,
            self.xmax as f64,
        );
        [(l, t), (r, t), (r, b), (l, b)]
    }

    /// Closed ring of `(x, y)` coordinates, the first point repeated at the end.
    pub fn to_polygon_coords(&self) -> Vec<(f64, f64)> {
        let corners = self.corners();
        corners
            .iter()
            .copied()
            .chain(iter::once(corners[0]))
            .collect()
    }

    /// Enumerate windows of `size` (height, width) over this box with `stride`.
    ///
    /// Without padding, a window starts at every stride offset inside the
    /// box, so windows at the far edges may extend past it. With padding
    /// `(ph, pw)`, a window is kept only while it overflows the far edge by
    /// at most the padding. Windows are produced in row-major order.
    pub fn get_windows(
        &self,
        size: (usize, usize),
        stride: (usize, usize),
        padding: Option<(usize, usize)>,
    ) -> Result<Vec<PixelBox>> {
        let (size_h, size_w) = size;
        let (stride_h, stride_w) = stride;
        ensure!(
            size_h > 0 && size_w > 0,
            "window size must be positive, but get {:?}",
            size
        );
        ensure!(
            stride_h > 0 && stride_w > 0,
            "window stride must be positive, but get {:?}",
            stride
        );

        let (row_end, col_end) = match padding {
            None => (self.ymax, self.xmax),
            Some((pad_h, pad_w)) => (
                self.ymax + pad_h as i64 - size_h as i64 + 1,
                self.xmax + pad_w as i64 - size_w as i64 + 1,
            ),
        };

        let rows = (self.ymin..row_end.max(self.ymin)).step_by(stride_h);
        let windows = rows
            .flat_map(|row| {
                (self.xmin..col_end.max(self.xmin))
                    .step_by(stride_w)
                    .map(move |col| PixelBox {
                        ymin: row,
                        xmin: col,
                        ymax: row + size_h as i64,
                        xmax: col + size_w as i64,
                    })
            })
            .collect();
        Ok(windows)
    }
}

impl TryFrom<[i64; 4]> for PixelBox {
    type Error = anyhow::Error;

    fn try_from([ymin, xmin, ymax, xmax]: [i64; 4]) -> Result<Self, Self::Error> {
        Self::new(ymin, xmin, ymax, xmax)
    }
}

impl From<PixelBox> for [i64; 4] {
    fn from(from: PixelBox) -> Self {
        [from.ymin, from.xmin, from.ymax, from.xmax]
    }
}

impl fmt::Display for PixelBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.ymin, self.xmin, self.ymax, self.xmax
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_tiling_overflows_far_edge() {
        let extent = PixelBox::from_hw(10, 10);
        let windows = extent.get_windows((4, 4), (4, 4), None).unwrap();
        assert_eq!(windows.len(), 9);
        assert_eq!(windows[0], PixelBox::make_square(0, 0, 4));
        assert_eq!(windows[8], PixelBox::make_square(8, 8, 4));
    }

    #[test]
    fn padded_tiling_limits_overflow() {
        let extent = PixelBox::from_hw(10, 10);

        let windows = extent.get_windows((4, 4), (4, 4), Some((0, 0))).unwrap();
        assert_eq!(windows.len(), 4);
        assert!(windows.iter().all(|window| extent.contains_box(window)));

        let windows = extent.get_windows((4, 4), (4, 4), Some((2, 2))).unwrap();
        assert_eq!(windows.len(), 9);
    }

    #[test]
    fn erosion_does_not_invert() {
        let cell = PixelBox::make_square(0, 0, 10);
        assert_eq!(cell.make_eroded(2), PixelBox::new(2, 2, 8, 8).unwrap());
        assert_eq!(cell.make_eroded(7), PixelBox::new(5, 5, 5, 5).unwrap());
    }

    #[test]
    fn intersection_test() {
        let lhs = PixelBox::new(0, 0, 5, 5).unwrap();
        let rhs = PixelBox::new(3, 3, 8, 8).unwrap();
        assert_eq!(
            lhs.intersection(&rhs),
            Some(PixelBox::new(3, 3, 5, 5).unwrap())
        );
        assert_eq!(lhs.intersection(&PixelBox::make_square(5, 5, 2)), None);
    }

    #[test]
    fn rejects_inverted_box() {
        assert!(PixelBox::new(5, 0, 0, 5).is_err());
        assert!(serde_json::from_str::<PixelBox>("[5, 0, 0, 5]").is_err());
    }
}
