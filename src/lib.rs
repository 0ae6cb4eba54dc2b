pub mod cli;
pub mod config;
pub mod correlate;
pub mod detect;
pub mod error;
pub mod fsutil;
pub mod link;
pub mod loader;
pub mod model;
pub mod parsers;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod resolve;
