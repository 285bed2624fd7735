pub mod error;
pub mod geometry;
pub mod ladder;
pub mod outcome;
pub mod path;
