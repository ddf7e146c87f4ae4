// Domain-driven module structure for logvault.

// Core infrastructure
pub mod docker;
pub mod client;
pub mod conf;
pub mod state;

// Domain modules
pub mod logs;
pub mod filter;
pub mod store;
pub mod export;
pub mod service;
pub mod runtime;
