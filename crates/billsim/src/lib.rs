//! Service layer around the `billsim_core` engine: catalog persistence,
//! the two-tier snapshot cache, the Monte Carlo job runner, and the
//! request-scoped data loader. The HTTP router is an external collaborator;
//! its thin handlers call the typed functions exposed here.

pub mod app;
pub mod cache;
pub mod error;
pub mod fingerprint;
pub mod jobs;
pub mod loader;
pub mod logging;
pub mod storage;

pub use app::{App, AppConfig};
pub use error::{Result, ServiceError};
pub use logging::init_logging;
