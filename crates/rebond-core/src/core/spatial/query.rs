use super::tree::{Node, SpatialIndex};

/// Restricts a sphere query to one side of a hyperplane through its center.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HalfSpace {
    pub axis: usize,
    /// Entry the query is issued from, used to order points coincident with the center.
    pub origin: Option<usize>,
}

/// A point found by a query, together with its squared distance to the query center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a, T> {
    entry: usize,
    payload: &'a T,
    distance_squared: f64,
}

impl<'a, T> Neighbor<'a, T> {
    /// The entry number of the found point.
    pub fn entry(&self) -> usize {
        self.entry
    }

    pub fn payload(&self) -> &'a T {
        self.payload
    }

    /// The exact squared Euclidean distance to the query center.
    pub fn distance_squared(&self) -> f64 {
        self.distance_squared
    }

    pub fn distance(&self) -> f64 {
        self.distance_squared.sqrt()
    }
}

/// A lazy radius-bounded search over a [`SpatialIndex`].
///
/// The tree is walked depth-first; subtrees that cannot contain a point within
/// the radius (or that lie entirely below the half-space boundary, for
/// hemisphere queries) are never visited. The iterator is consumed as it goes
/// and cannot be restarted.
pub struct SphereQuery<'a, T> {
    index: &'a SpatialIndex<T>,
    center: Vec<f64>,
    radius_squared: f64,
    half_space: Option<HalfSpace>,
    stack: Vec<&'a Node>,
    bucket: &'a [usize],
}

impl<'a, T> SphereQuery<'a, T> {
    pub(crate) fn new(
        index: &'a SpatialIndex<T>,
        center: Vec<f64>,
        radius: f64,
        half_space: Option<HalfSpace>,
    ) -> Self {
        Self {
            index,
            center,
            radius_squared: radius * radius,
            half_space,
            stack: vec![&index.root],
            bucket: &[],
        }
    }

    fn distance_squared_to(&self, point: &[f64]) -> f64 {
        point
            .iter()
            .zip(&self.center)
            .map(|(p, c)| (p - c) * (p - c))
            .sum()
    }

    fn on_accepted_side(&self, entry: usize, point: &[f64]) -> bool {
        let Some(HalfSpace { axis, origin }) = self.half_space else {
            return true;
        };
        let dimensions = self.center.len();
        for k in 0..dimensions {
            let a = (axis + k) % dimensions;
            if point[a] > self.center[a] {
                return true;
            }
            if point[a] < self.center[a] {
                return false;
            }
        }
        // Coincident with the center.
        origin.is_none_or(|origin| entry > origin)
    }

    /// Every point of a left subtree split at `value` lies strictly below the
    /// half-space boundary when `value` is less than the center on that axis.
    fn left_is_below_boundary(&self, axis: usize, value: f64) -> bool {
        self.half_space
            .is_some_and(|h| h.axis == axis && value < self.center[axis])
    }

    fn evaluate(&self, entry: usize) -> Option<Neighbor<'a, T>> {
        let point = self.index.point_unchecked(entry);
        let distance_squared = self.distance_squared_to(point);
        if distance_squared > self.radius_squared || !self.on_accepted_side(entry, point) {
            return None;
        }
        Some(Neighbor {
            entry,
            payload: self.index.payload_unchecked(entry),
            distance_squared,
        })
    }
}

impl<'a, T> Iterator for SphereQuery<'a, T> {
    type Item = Neighbor<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            while let Some((&entry, rest)) = self.bucket.split_first() {
                self.bucket = rest;
                if let Some(found) = self.evaluate(entry) {
                    return Some(found);
                }
            }

            match self.stack.pop()? {
                Node::Leaf { bucket } => self.bucket = bucket.as_slice(),
                Node::Split {
                    axis,
                    value,
                    left,
                    right,
                } => {
                    // Compared in squared space so pruning agrees with `evaluate`.
                    let d = *value - self.center[*axis];
                    let plane_out_of_reach = d * d > self.radius_squared;
                    if !(d >= 0.0 && plane_out_of_reach) {
                        self.stack.push(right);
                    }
                    if !(d < 0.0 && plane_out_of_reach)
                        && !self.left_is_below_boundary(*axis, *value)
                    {
                        self.stack.push(left);
                    }
                }
            }
        }
    }
}
