//! Shared support for the integration tests: the metadata image writer the unit tests use.
#![allow(dead_code)]

#[path = "../../src/test/builder.rs"]
mod builder;

use std::sync::Arc;

use cilgraph::{CilFile, LoaderConfig, Module};

pub use builder::{compressed, MetadataBuilder};

/// Open a built image, which must be recognized
pub fn open(builder: MetadataBuilder) -> CilFile {
    open_with(builder, LoaderConfig::default())
}

/// Open a built image with `config`
pub fn open_with(builder: MetadataBuilder, config: LoaderConfig) -> CilFile {
    CilFile::from_mem_with_config(builder.build(), config)
        .expect("well-formed image")
        .expect("recognized image")
}

/// The module of a built image
pub fn module(builder: MetadataBuilder) -> Arc<Module> {
    open(builder).module().clone()
}
