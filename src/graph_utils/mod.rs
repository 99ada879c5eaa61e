pub mod geometry;
pub mod pipeline;
