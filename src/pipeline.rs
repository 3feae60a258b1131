//! Run the external WGS + MitoEdit pipeline
//!
//! The pipeline is a black box started as a child process. This module builds its command
//! line, enforces the wall-clock limit and classifies how the process ended.

/// Well-known files a successful run leaves in its working directory
pub mod artifact;
/// Bounded capture of child process output
pub mod capture;
/// Pipeline command line built from a parameter contract
pub mod command;
/// Run the pipeline as a child process
pub mod runner;
