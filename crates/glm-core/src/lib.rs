pub mod boundary;
pub mod common;
pub mod convert;
pub mod domain;
pub mod morphometry;
pub mod nml;

pub use domain::{BlockKind, GlmError, GlmErrorCategory, GlmErrorKind, GlmResult, ParamValue};
pub use nml::{NmlBlock, NmlDocument};
