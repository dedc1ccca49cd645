pub mod config;
pub mod driver;
pub mod host;
pub mod logging;
pub mod module;
pub mod report;
pub mod scanner;
pub mod version;
