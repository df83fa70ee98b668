pub mod config;
pub mod logging;
pub mod parser;
pub mod resolve;
pub mod version;
pub mod workspace;
