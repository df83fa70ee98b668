//! Version layer: registry access, caching and semver decisions
//!
//! This module fetches package metadata, keeps it in a persistent cache and
//! answers every version question the resolver asks: range matching, target
//! selection, prefix rewriting and diff classification.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│   Fetcher   │◀───▶│    Cache    │
//! │   (fetch)   │     │ (coalesce)  │     │  (storage)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │    Range    │────▶│   Select    │────▶│    Diff     │
//! │  (matching) │     │  (target)   │     │ (classify)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`registry`]: Registry trait for fetching package metadata
//! - [`registries`]: Concrete registry implementations
//! - [`cache`]: SQLite-backed metadata store with a freshness window
//! - [`fetcher`]: Per-run memoization and request coalescing
//! - [`range`]: npm range grammar and satisfaction rules
//! - [`semver`]: Thin helpers over [`range`] and the `semver` crate
//! - [`prefix`]: Range-prefix extraction and re-application
//! - [`select`]: Update modes and target selection
//! - [`diff`]: Classification of version changes
//! - [`error`]: Error types for each layer
//! - [`types`]: `PackageMetadata`

pub mod cache;
pub mod diff;
pub mod error;
pub mod fetcher;
pub mod prefix;
pub mod range;
pub mod registries;
pub mod registry;
pub mod select;
pub mod semver;
pub mod types;
