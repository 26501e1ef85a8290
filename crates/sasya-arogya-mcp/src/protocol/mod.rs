//! Tool protocol: schemas, validation, progress and dispatch.

pub mod dispatcher;
pub mod progress;
pub mod schema;
pub mod validator;

pub use dispatcher::{Dispatcher, DEFAULT_STREAM_BUFFER};
pub use progress::Progress;
pub use schema::{FieldSpec, FieldType, Schema};
pub use validator::{json_type_name, validate, ValidatedArguments};
