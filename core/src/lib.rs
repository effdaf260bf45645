//! Shared types for the `mender` source-repair tools: the diagnostic model, the rule catalog
//! consumed by both the post-compile repairer and the static scanner, configuration, and errors.

pub mod atomic;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod rules;
pub mod test_util;

pub use atomic::write_atomically;
pub use diagnostic::{
    DiagnosticRecord, DiagnosticSource, count_by_code, count_code, filter_code, group_by_file,
};
pub use error::{MenderError, MenderResult};
