//! CLI command implementations.

pub mod keygen;
pub mod monitor;
pub mod serve;
pub mod train;
