//! Read pipeline run requests and turn them into validated parameter contracts
//!
//! A raw request body goes through three stages: untyped JSON parsing, JSON schema validation,
//! then semantic validation into an immutable [`contract::ParameterContract`].

/// Reference genome builds the pipeline supports
pub mod reference;
/// Typed run requests and the validated parameter contract
pub mod contract;
/// Embedded JSON schema for run requests
pub mod schema;
/// Parse and validate raw request bodies
pub mod message;
