pub mod book;
pub mod editor;
pub mod error;
pub mod logger;
pub mod orchestrator;
pub mod platform;
pub mod runner;
pub mod session;
pub mod settings;
pub mod sleep;
pub mod store;
pub mod types;

pub use error::{ChicoError, Result};
