pub mod analytics;
pub mod common;
pub mod course;
pub mod output;
