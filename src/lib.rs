//! A disk-resident B+-tree secondary index over fixed-layout records of a
//! base relation, supporting `{INT32, F64, STR10}` key domains chosen at
//! construction and fixed for the life of the index file.

pub mod config;
pub mod error;
pub mod index;
pub mod storage;

pub use config::Config;
pub use error::{IndexError, Opcode};
pub use index::{AttrType, Index, KeyValue};
pub use anyhow::Result;
