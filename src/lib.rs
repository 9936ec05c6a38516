//! review-qa - index CSV review exports and extract answers per document
//!
//! The library half of the `review-qa` binary. Modules are exposed so that
//! benchmarks and integration tests can drive individual stages.

pub mod cli;
pub mod config;
pub mod dataframe;
pub mod document;
pub mod embedding;
pub mod error;
pub mod http;
pub mod llm;
pub mod nodes;
pub mod pipeline;
pub mod reader;
pub mod report;
pub mod retriever;
pub mod store;
