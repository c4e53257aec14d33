//! Utility modules for navres

pub mod geo;

pub use geo::{centroid, haversine_distance_m, EARTH_RADIUS_M};
