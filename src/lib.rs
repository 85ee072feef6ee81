pub mod config;
pub mod engine;
pub mod feed;
pub mod lifecycle;
pub mod logs;
pub mod pipeline;
pub mod tui;
