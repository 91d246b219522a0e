use super::query::{HalfSpace, SphereQuery};
use nalgebra::Point3;
use thiserror::Error;

/// Maximum number of points a leaf holds before it is split.
const LEAF_CAPACITY: usize = 8;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpatialIndexError {
    #[error("Spatial index dimensionality must be at least 1")]
    InvalidDimensionality,
    #[error("Point has {found} coordinates but the index is {expected}-dimensional")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Coordinate on axis {axis} is not finite (value: {value})")]
    NonFiniteCoordinate { axis: usize, value: f64 },
    #[error("Search radius must be finite and non-negative (value: {0})")]
    InvalidRadius(f64),
    #[error("Axis {axis} is out of range for a {dimensions}-dimensional index")]
    AxisOutOfRange { axis: usize, dimensions: usize },
    #[error("Entry {entry} does not exist in an index of {len} points")]
    EntryOutOfRange { entry: usize, len: usize },
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    /// A bucket of entry indices.
    Leaf { bucket: Vec<usize> },
    /// Points with `coord[axis] <= value` live in `left`, all others in `right`.
    Split {
        axis: usize,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Default for Node {
    fn default() -> Self {
        Node::Leaf { bucket: Vec::new() }
    }
}

/// A k-dimensional space-partitioning tree over points with attached payloads.
///
/// Points are kept in leaf buckets of at most `LEAF_CAPACITY` entries. A bucket
/// that overflows is split at the median of the axis with the greatest spread,
/// so the tree stays reasonably balanced for the build-then-query pattern it is
/// designed for. Buckets of coincident points cannot be split and simply grow.
///
/// Every inserted point is identified by its *entry* number, which is its
/// insertion ordinal (`0..len()`).
///
/// The index does not support removal; it is meant to be built, queried and
/// dropped within a single operation.
#[derive(Debug, Clone)]
pub struct SpatialIndex<T> {
    dimensions: usize,
    /// Flat coordinate storage, entry `i` occupies `[i * dimensions, (i + 1) * dimensions)`.
    coords: Vec<f64>,
    payloads: Vec<T>,
    pub(crate) root: Node,
}

impl<T> SpatialIndex<T> {
    /// Creates an empty index for points of the given dimensionality.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialIndexError::InvalidDimensionality`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self, SpatialIndexError> {
        if dimensions == 0 {
            return Err(SpatialIndexError::InvalidDimensionality);
        }
        Ok(Self {
            dimensions,
            coords: Vec::new(),
            payloads: Vec::new(),
            root: Node::default(),
        })
    }

    /// Builds a 3-dimensional index from arbitrary items.
    ///
    /// The items themselves become the payloads; `position` extracts the
    /// coordinates of each one.
    pub fn from_items<I, F>(items: I, mut position: F) -> Result<Self, SpatialIndexError>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(&T) -> Point3<f64>,
    {
        let mut index = Self::new(3)?;
        index.extend(items.into_iter().map(|item| {
            let p = position(&item);
            ([p.x, p.y, p.z], item)
        }))?;
        Ok(index)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Returns the coordinates of an entry.
    pub fn point(&self, entry: usize) -> Option<&[f64]> {
        (entry < self.len()).then(|| self.point_unchecked(entry))
    }

    /// Returns the payload of an entry.
    pub fn payload(&self, entry: usize) -> Option<&T> {
        self.payloads.get(entry)
    }

    /// Returns the depth of the tree (a lone leaf has depth 1).
    pub fn depth(&self) -> usize {
        fn depth_of(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        depth_of(&self.root)
    }

    /// Inserts one point with its payload and returns the new entry number.
    ///
    /// # Errors
    ///
    /// Fails if the point has the wrong number of coordinates or a coordinate
    /// is not finite; the index is left unchanged in that case.
    pub fn insert(&mut self, point: &[f64], payload: T) -> Result<usize, SpatialIndexError> {
        self.validate_point(point)?;
        let entry = self.push_entry(point, payload);
        insert_into(&mut self.root, &self.coords, self.dimensions, entry);
        Ok(entry)
    }

    /// Inserts many points at once and rebuilds the whole tree balanced.
    ///
    /// # Errors
    ///
    /// On the first invalid point, every point added by this call is discarded
    /// and the error is returned.
    pub fn extend<I, P>(&mut self, items: I) -> Result<(), SpatialIndexError>
    where
        I: IntoIterator<Item = (P, T)>,
        P: AsRef<[f64]>,
    {
        let previous_len = self.len();
        for (point, payload) in items {
            let point = point.as_ref();
            if let Err(e) = self.validate_point(point) {
                self.coords.truncate(previous_len * self.dimensions);
                self.payloads.truncate(previous_len);
                return Err(e);
            }
            self.push_entry(point, payload);
        }
        self.root = build_node((0..self.len()).collect(), &self.coords, self.dimensions);
        Ok(())
    }

    /// Enumerates every point within `radius` of `center`.
    pub fn within_radius(
        &self,
        center: &[f64],
        radius: f64,
    ) -> Result<SphereQuery<'_, T>, SpatialIndexError> {
        self.validate_point(center)?;
        validate_radius(radius)?;
        Ok(SphereQuery::new(self, center.to_vec(), radius, None))
    }

    /// Enumerates the points within `radius` of `center` that lie on the upper
    /// side of the half-space through `center` along `axis`.
    ///
    /// A point `p` is on the upper side if `(p[axis], p[axis + 1], ...)`, with
    /// axes taken cyclically, is lexicographically greater than or equal to the
    /// same tuple of `center`. Points exactly at `center` are included.
    pub fn within_hemisphere(
        &self,
        center: &[f64],
        radius: f64,
        axis: usize,
    ) -> Result<SphereQuery<'_, T>, SpatialIndexError> {
        self.validate_point(center)?;
        validate_radius(radius)?;
        self.validate_axis(axis)?;
        Ok(SphereQuery::new(
            self,
            center.to_vec(),
            radius,
            Some(HalfSpace { axis, origin: None }),
        ))
    }

    /// Hemisphere query centred on an indexed entry.
    ///
    /// The entry itself is never reported, and points coincident with it are
    /// reported only if they were inserted after it. Running this query for every
    /// entry therefore reports each unordered pair of points within range exactly
    /// once, from the lexicographically lower point of the pair.
    pub fn neighbors_of(
        &self,
        entry: usize,
        radius: f64,
        axis: usize,
    ) -> Result<SphereQuery<'_, T>, SpatialIndexError> {
        if entry >= self.len() {
            return Err(SpatialIndexError::EntryOutOfRange {
                entry,
                len: self.len(),
            });
        }
        validate_radius(radius)?;
        self.validate_axis(axis)?;
        Ok(SphereQuery::new(
            self,
            self.point_unchecked(entry).to_vec(),
            radius,
            Some(HalfSpace {
                axis,
                origin: Some(entry),
            }),
        ))
    }

    pub(crate) fn point_unchecked(&self, entry: usize) -> &[f64] {
        let start = entry * self.dimensions;
        &self.coords[start..start + self.dimensions]
    }

    pub(crate) fn payload_unchecked(&self, entry: usize) -> &T {
        &self.payloads[entry]
    }

    fn push_entry(&mut self, point: &[f64], payload: T) -> usize {
        self.coords.extend_from_slice(point);
        self.payloads.push(payload);
        self.payloads.len() - 1
    }

    fn validate_point(&self, point: &[f64]) -> Result<(), SpatialIndexError> {
        if point.len() != self.dimensions {
            return Err(SpatialIndexError::DimensionMismatch {
                expected: self.dimensions,
                found: point.len(),
            });
        }
        match point.iter().position(|c| !c.is_finite()) {
            Some(axis) => Err(SpatialIndexError::NonFiniteCoordinate {
                axis,
                value: point[axis],
            }),
            None => Ok(()),
        }
    }

    fn validate_axis(&self, axis: usize) -> Result<(), SpatialIndexError> {
        if axis >= self.dimensions {
            return Err(SpatialIndexError::AxisOutOfRange {
                axis,
                dimensions: self.dimensions,
            });
        }
        Ok(())
    }
}

fn validate_radius(radius: f64) -> Result<(), SpatialIndexError> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(SpatialIndexError::InvalidRadius(radius));
    }
    Ok(())
}

#[inline]
fn coord(coords: &[f64], dimensions: usize, entry: usize, axis: usize) -> f64 {
    coords[entry * dimensions + axis]
}

fn insert_into(node: &mut Node, coords: &[f64], dimensions: usize, entry: usize) {
    match node {
        Node::Split {
            axis,
            value,
            left,
            right,
        } => {
            if coord(coords, dimensions, entry, *axis) <= *value {
                insert_into(left, coords, dimensions, entry);
            } else {
                insert_into(right, coords, dimensions, entry);
            }
        }
        Node::Leaf { bucket } => {
            bucket.push(entry);
            if bucket.len() > LEAF_CAPACITY {
                let bucket = std::mem::take(bucket);
                *node = build_node(bucket, coords, dimensions);
            }
        }
    }
}

/// Recursively partitions a bucket of entries into a subtree.
fn build_node(mut bucket: Vec<usize>, coords: &[f64], dimensions: usize) -> Node {
    if bucket.len() <= LEAF_CAPACITY {
        return Node::Leaf { bucket };
    }
    let Some(axis) = widest_axis(&bucket, coords, dimensions) else {
        // All points coincide.
        return Node::Leaf { bucket };
    };
    let value = split_value(&mut bucket, coords, dimensions, axis);
    let (left, right): (Vec<usize>, Vec<usize>) = bucket
        .into_iter()
        .partition(|&e| coord(coords, dimensions, e, axis) <= value);

    Node::Split {
        axis,
        value,
        left: Box::new(build_node(left, coords, dimensions)),
        right: Box::new(build_node(right, coords, dimensions)),
    }
}

/// Returns the axis with the greatest spread, or `None` if all points coincide.
fn widest_axis(bucket: &[usize], coords: &[f64], dimensions: usize) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for axis in 0..dimensions {
        let (min, max) = bucket.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), &e| {
                let c = coord(coords, dimensions, e, axis);
                (min.min(c), max.max(c))
            },
        );
        let spread = max - min;
        if spread > 0.0 && best.is_none_or(|(_, s)| spread > s) {
            best = Some((axis, spread));
        }
    }
    best.map(|(axis, _)| axis)
}

/// Picks a split value that leaves both sides non-empty.
///
/// This is the median along `axis`, unless the median equals the maximum, in
/// which case the largest value strictly below the maximum is used.
fn split_value(bucket: &mut [usize], coords: &[f64], dimensions: usize, axis: usize) -> f64 {
    let value_of = |e: usize| coord(coords, dimensions, e, axis);
    let mid = (bucket.len() - 1) / 2;
    bucket.select_nth_unstable_by(mid, |&a, &b| value_of(a).total_cmp(&value_of(b)));
    let median = value_of(bucket[mid]);
    let max = bucket
        .iter()
        .map(|&e| value_of(e))
        .fold(f64::NEG_INFINITY, f64::max);
    if median < max {
        median
    } else {
        bucket
            .iter()
            .map(|&e| value_of(e))
            .filter(|&c| c < max)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_points(n: usize) -> Vec<[f64; 3]> {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    points.push([i as f64 * 1.1, j as f64 * 0.9, k as f64 * 1.3]);
                }
            }
        }
        points
    }

    fn assert_split_invariant<T>(index: &SpatialIndex<T>) {
        fn entries_of(node: &Node, out: &mut Vec<usize>) {
            match node {
                Node::Leaf { bucket } => out.extend_from_slice(bucket),
                Node::Split { left, right, .. } => {
                    entries_of(left, out);
                    entries_of(right, out);
                }
            }
        }
        fn check<T>(index: &SpatialIndex<T>, node: &Node) {
            if let Node::Split {
                axis,
                value,
                left,
                right,
            } = node
            {
                let mut l = Vec::new();
                let mut r = Vec::new();
                entries_of(left, &mut l);
                entries_of(right, &mut r);
                assert!(!l.is_empty() && !r.is_empty());
                assert!(l.iter().all(|&e| index.point_unchecked(e)[*axis] <= *value));
                assert!(r.iter().all(|&e| index.point_unchecked(e)[*axis] > *value));
                check(index, left);
                check(index, right);
            }
        }
        let mut all = Vec::new();
        entries_of(&index.root, &mut all);
        all.sort_unstable();
        assert_eq!(all, (0..index.len()).collect::<Vec<_>>());
        check(index, &index.root);
    }

    #[test]
    fn new_rejects_zero_dimensions() {
        assert_eq!(
            SpatialIndex::<u32>::new(0).unwrap_err(),
            SpatialIndexError::InvalidDimensionality
        );
        let index = SpatialIndex::<u32>::new(3).unwrap();
        assert_eq!(index.dimensions(), 3);
        assert!(index.is_empty());
        assert_eq!(index.depth(), 1);
    }

    #[test]
    fn insert_validates_points() {
        let mut index = SpatialIndex::new(3).unwrap();
        assert_eq!(
            index.insert(&[1.0, 2.0], 'a').unwrap_err(),
            SpatialIndexError::DimensionMismatch {
                expected: 3,
                found: 2
            }
        );
        assert!(matches!(
            index.insert(&[1.0, f64::NAN, 0.0], 'a'),
            Err(SpatialIndexError::NonFiniteCoordinate { axis: 1, .. })
        ));
        assert!(index.is_empty());
        assert_eq!(index.insert(&[1.0, 2.0, 3.0], 'a').unwrap(), 0);
        assert_eq!(index.insert(&[4.0, 5.0, 6.0], 'b').unwrap(), 1);
        assert_eq!(index.point(1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(index.payload(0), Some(&'a'));
        assert_eq!(index.point(2), None);
    }

    #[test]
    fn incremental_inserts_split_buckets_and_keep_invariant() {
        let mut index = SpatialIndex::new(3).unwrap();
        for (i, p) in grid_points(6).iter().enumerate() {
            index.insert(p, i).unwrap();
        }
        assert_eq!(index.len(), 216);
        assert!(index.depth() > 1);
        assert_split_invariant(&index);
    }

    #[test]
    fn bulk_extend_builds_balanced_tree() {
        let mut index = SpatialIndex::new(3).unwrap();
        let points = grid_points(8);
        index
            .extend(points.iter().enumerate().map(|(i, p)| (*p, i)))
            .unwrap();
        assert_eq!(index.len(), 512);
        assert_split_invariant(&index);
        // 512 points in buckets of at most 8 need at least 6 levels; a median
        // split keeps the tree close to that.
        assert!(index.depth() <= 10, "depth was {}", index.depth());
    }

    #[test]
    fn extend_rolls_back_on_invalid_point() {
        let mut index = SpatialIndex::new(3).unwrap();
        index.insert(&[0.0, 0.0, 0.0], 0).unwrap();
        let result = index.extend(vec![
            ([1.0, 0.0, 0.0], 1),
            ([f64::INFINITY, 0.0, 0.0], 2),
        ]);
        assert!(matches!(
            result,
            Err(SpatialIndexError::NonFiniteCoordinate { axis: 0, .. })
        ));
        assert_eq!(index.len(), 1);
        assert_eq!(index.point(1), None);
    }

    #[test]
    fn coincident_points_stay_in_one_leaf() {
        let mut index = SpatialIndex::new(3).unwrap();
        for i in 0..50 {
            index.insert(&[1.0, 1.0, 1.0], i).unwrap();
        }
        assert_eq!(index.depth(), 1);
        assert_eq!(index.len(), 50);
    }

    #[test]
    fn heavily_tied_axis_still_splits() {
        let mut index = SpatialIndex::new(2).unwrap();
        let mut items = Vec::new();
        for i in 0..20 {
            items.push(([5.0, 0.0], i));
        }
        items.push(([1.0, 0.0], 20));
        index.extend(items).unwrap();
        assert_split_invariant(&index);
        assert!(index.depth() >= 2);
    }

    #[test]
    fn from_items_uses_position_extractor() {
        let atoms = vec![
            ("a", Point3::new(0.0, 0.0, 0.0)),
            ("b", Point3::new(1.0, 2.0, 3.0)),
        ];
        let index = SpatialIndex::from_items(atoms, |(_, p)| *p).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.point(1), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(index.payload(1).unwrap().0, "b");
    }
}
