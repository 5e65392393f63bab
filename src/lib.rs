//! # gvm Core Library
//!
//! This crate contains the core logic of `gvm`, a version manager for the Go
//! toolchain: it discovers recent Go releases, downloads their archives, and
//! switches the toolchain installed in a well-known system path.
//!
//! The persisted state is a small JSON catalog (`config.json`) holding the
//! ten most recent remote versions and the archives already downloaded.
//!
//! ## Modules Overview
//! - [`catalog`] – The catalog data model and its lookups
//! - [`reconcile`] – Merging a fresh remote listing into the catalog
//! - [`store`] – Loading and saving the catalog file
//! - [`lock`] – Advisory lock serializing concurrent invocations
//! - [`registry`] – Listing remote versions from the go.dev release index
//! - [`fetch`] – Downloading archives with progress and cancellation
//! - [`installer`] – Purging, extracting and promoting toolchain trees
//! - [`manager`] – The download/activate state machine
//! - [`process`] – Running the installed `go` binary
//! - [`version`] – Version grammar, normalization and ordering
//! - [`shell`] – The `PATH` setup snippet
//! - [`util`] – Platform names and archive helpers
//! - [`global`] – Settings and well-known directories


pub mod catalog;
pub mod error;
pub mod fetch;
pub mod global;
pub mod installer;
pub mod lock;
pub mod manager;
pub mod process;
pub mod reconcile;
pub mod registry;
pub mod shell;
pub mod store;
pub mod util;
pub mod version;

pub use catalog::*;
pub use error::*;
pub use fetch::*;
pub use installer::*;
pub use lock::*;
pub use manager::*;
pub use process::*;
pub use reconcile::*;
pub use registry::*;
pub use shell::*;
pub use store::*;
pub use global::settings::Settings;
