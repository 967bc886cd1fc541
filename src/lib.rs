//! # known-good
//!
//! Maintains a registry of "known-good" pins for the external modules of a
//! multi-module Bazel build and derives build descriptors and CI metadata
//! from it.
//!
//! ## Quick Example
//!
//! ```
//! use known_good::overrides::{apply_overrides, parse_override_specs};
//! use known_good::registry::{self, Pin};
//!
//! let mut registry = registry::parse(r#"{
//!     "modules": {
//!         "target_sw": {
//!             "libfoo": {"repo": "https://github.com/org/libfoo.git", "version": "1.4.0"}
//!         }
//!     },
//!     "timestamp": "2026-01-01T00:00:00Z"
//! }"#).unwrap();
//!
//! let specs = parse_override_specs(&["libfoo@def5678"]).unwrap();
//! assert_eq!(apply_overrides(&mut registry, &specs), 1);
//!
//! let libfoo = registry.group("target_sw").unwrap().get("libfoo").unwrap();
//! assert_eq!(libfoo.pin(), Pin::Commit("def5678"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Registry (`registry`, `origin`)**: modules grouped by name, each pinned
//!   to either a commit or a released version, never both.
//! - **Remote resolution (`resolver`)**: "latest commit on branch" lookups via
//!   the `gh` CLI or the REST API.
//! - **Overrides (`overrides`)**: literal pins from the command line and
//!   resolver-driven updates, validated before anything is mutated.
//! - **Generation (`generator`)**: deterministic `MODULE.bazel` fragments and
//!   coverage `BUILD` files.
//! - **Tool execution (`process`, `summary`, `quality`)**: running bazel and
//!   coverage tools with live output and summarizing their results.
//! - **Workspace export (`workspace`)**: gita workspace metadata.

pub mod defaults;
pub mod error;
pub mod exit_codes;
pub mod generator;
pub mod origin;
pub mod output;
pub mod overrides;
pub mod process;
pub mod quality;
pub mod registry;
pub mod resolver;
pub mod summary;
pub mod workspace;
