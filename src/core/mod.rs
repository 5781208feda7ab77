pub mod crawler;
pub mod data_store;
pub mod dedup;
pub mod merge;
pub mod merged_schema;
pub mod processor;
pub mod scheduler;
pub mod stats;
