//! The memory dump data model and the strategy machinery that fills it.

pub mod dump;
pub mod object;
pub mod providers;

pub use dump::{MemoryDump, PythonId};
pub use object::{ContainerKind, MemoryDetail, MemoryObject, Strategy};
