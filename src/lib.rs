// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod attempt;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod runtime;
pub mod scheduler;
pub mod scoring;
pub mod session;
pub mod util;

pub use attempt::Attempt;
pub use catalog::{Catalog, InMemoryCatalog};
pub use error::ExamError;
pub use session::{Phase, Session, TickOutcome, Transition};
