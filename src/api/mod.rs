pub mod client;
pub mod executor;
pub mod fetchers;
pub mod model;
