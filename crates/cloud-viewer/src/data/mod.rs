pub mod point_cloud;
pub mod types;
