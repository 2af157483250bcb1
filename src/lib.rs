//! Transitive dependency resolution against Maven-style repositories:
//! compute the closure of a set of requested coordinates, fetch descriptors
//! and artifacts through an ordered repository chain and materialize a
//! version-reconciled artifact set in a local repository directory.

pub mod maven;
pub mod util;
