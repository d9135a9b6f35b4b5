pub mod model;
pub mod player;
pub mod render;
pub mod schedule;
pub mod scoring;
pub mod store;
pub mod timer;
