//! Test support shared by the unit tests.

mod builder;

pub use builder::{compressed, MetadataBuilder};
