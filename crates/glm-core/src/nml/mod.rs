//! GLM namelist model: typed blocks checked against a fixed schema, the
//! document that groups them, and the text codec for the native format.

mod block;
mod document;
pub mod literal;
pub mod parser;
pub mod schema;

pub use block::NmlBlock;
pub use document::NmlDocument;
pub use schema::{BlockSchema, LengthRule, ParamDefault, ParamSpec, ParamType, schema_for};
