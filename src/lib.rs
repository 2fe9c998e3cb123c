//! Deep object-graph serialization for a unit-test execution harness.
//!
//! Given an arbitrary value, [`context::SerializerContext::write_object_to_memory`]
//! reifies it and everything it transitively references into a
//! [`memory::MemoryDump`]: a content-addressed table from which a
//! structurally equivalent value can be reconstructed, with a
//! `comparable` flag recording whether that reconstruction actually round-trips.

pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod memory;
pub mod net;
pub mod repr;
pub mod typeinfo;
pub mod value;
pub mod wire;

pub use context::SerializerContext;
pub use deepdump_derive::ToPyValue;
pub use error::{DeepDumpError, Result};
pub use memory::{MemoryDump, PythonId};
pub use value::PyValue;
