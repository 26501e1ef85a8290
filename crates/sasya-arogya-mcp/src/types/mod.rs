//! Data types shared by the dispatch core and the transports.

pub mod error;
pub mod invocation;
pub mod outcome;

pub use error::*;
pub use invocation::*;
pub use outcome::*;
