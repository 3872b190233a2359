// Public modules
pub mod additional;
pub mod backend;
pub mod error;
pub mod fragments;
pub mod instance;
pub mod proxy;
pub mod script;
pub mod shell;
pub mod stage;
pub mod store;

// Internal modules - not part of public API
pub(crate) mod paths;

// Public modules for CLI access
pub mod defaults;
pub mod local_files;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
