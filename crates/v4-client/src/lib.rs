//! v4 order client.
//!
//! `CompositeClient` combines message building and the transaction
//! pipeline into single-call operations. Configuration and logging setup
//! for binaries live here too.

pub mod composite;
pub mod config;
pub mod error;
pub mod logging;

pub use composite::{message_builder, CompositeClient};
pub use config::{ClientConfig, DenomConfig};
pub use error::{AppError, AppResult};
pub use logging::init_logging;
