/// Axis-aligned bounding box in two dimensions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// Degenerate box around a single point.
    pub fn from_point(p: [f64; 2]) -> Self {
        Aabb2 { min: p, max: p }
    }

    pub fn include(&mut self, p: [f64; 2]) {
        self.min[0] = self.min[0].min(p[0]);
        self.min[1] = self.min[1].min(p[1]);
        self.max[0] = self.max[0].max(p[0]);
        self.max[1] = self.max[1].max(p[1]);
    }

    pub fn union(self, other: Aabb2) -> Aabb2 {
        let mut out = self;
        out.include(other.min);
        out.include(other.max);
        out
    }

    /// Bounds of a point set, `None` when empty.
    pub fn from_points<I: IntoIterator<Item = [f64; 2]>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut bounds = Aabb2::from_point(iter.next()?);
        for p in iter {
            bounds.include(p);
        }
        Some(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb2;

    #[test]
    fn from_points_spans_all_points() {
        let b = Aabb2::from_points([[1.0, 5.0], [-2.0, 3.0], [4.0, -1.0]]).unwrap();
        assert_eq!(b, Aabb2::new([-2.0, -1.0], [4.0, 5.0]));
        assert_eq!(Aabb2::from_points(std::iter::empty()), None);
    }

    #[test]
    fn union_covers_both() {
        let a = Aabb2::new([0.0, 0.0], [1.0, 1.0]);
        let b = Aabb2::new([2.0, -1.0], [3.0, 0.5]);
        assert_eq!(a.union(b), Aabb2::new([0.0, -1.0], [3.0, 1.0]));
    }
}
