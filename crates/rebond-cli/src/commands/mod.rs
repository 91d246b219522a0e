pub mod bond;
pub mod radii;
