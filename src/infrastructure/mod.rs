// Infrastructure module - External dependencies and adapters
pub mod config;
pub mod logging;
pub mod serial;
pub mod store;
pub mod toolchain;
