//! Spatial indexing for radius-bounded neighbor search.
//!
//! [`SpatialIndex`] is a k-d style partitioning tree that stores points together
//! with arbitrary payloads. Queries are lazy iterators ([`SphereQuery`]) yielding
//! [`Neighbor`] matches with their exact squared distance.
//!
//! Besides the plain sphere query, the index offers a *hemisphere* query that
//! only reports points on one side of a hyperplane through the center. Issuing
//! [`SpatialIndex::neighbors_of`] for every indexed entry visits each unordered
//! pair of points at most once, which halves the work of pairwise searches such
//! as bond perception.

mod query;
mod tree;

pub use query::{Neighbor, SphereQuery};
pub use tree::{SpatialIndex, SpatialIndexError};
