//! Model artifact store
//!
//! Versioned model files named `{prefix}_v{N}.{ext}` in one directory, plus
//! the JSON mapping from artifact file name to its evaluation metrics.

pub mod schema;
pub mod store;
pub mod metrics;
pub mod digest;

pub use schema::*;
pub use store::*;
pub use metrics::*;
pub use digest::*;
