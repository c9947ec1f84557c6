//! Shared building blocks for the docrag workspace: domain types, the
//! embedder/store/generator seams, configuration, document loading and
//! chunking.

#![deny(unused_imports)]
#![deny(unused_variables)]

pub mod chunker;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;
