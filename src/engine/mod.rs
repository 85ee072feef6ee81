pub mod analyzer;
pub mod sentiment;
pub mod worker;
