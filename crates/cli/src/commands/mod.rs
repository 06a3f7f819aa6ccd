//! Command implementations.

mod decode;
mod info;
mod run;
mod validate;

pub use decode::run_decode;
pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;
