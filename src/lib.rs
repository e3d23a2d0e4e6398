pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod events;
pub mod interaction;
pub mod palette;
pub mod point_cloud;
pub mod replay;
pub mod rotation;
pub mod scene;

/// Application name for XDG paths
pub const APP_NAME: &str = "song-galaxy";

/// Default catalog file name inside the data directory
pub const CATALOG_FILE: &str = "galaxy_data.json";

pub use aggregate::{compute_cluster_stats, compute_duration_series, compute_radar_series};
pub use hit_test::hit_test;
pub use interaction::advance_interaction;
pub use point_cloud::build_point_cloud;
pub use rotation::advance_rotation;
