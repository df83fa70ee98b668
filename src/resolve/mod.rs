//! Resolution layer
//! - mode.rs: per-package mode overrides and merging
//! - filter.rs: include/exclude name patterns
//! - specifier.rs: special specifiers, aliases and composite names
//! - dependency.rs: single-dependency pipeline
//! - batch.rs: concurrent resolution with progress reporting

pub mod batch;
pub mod dependency;
pub mod filter;
pub mod mode;
pub mod specifier;

pub use batch::{BatchOptions, resolve_all};
pub use dependency::{DependencyResolver, ResolveOptions, ResolvedDependency};
pub use filter::DependencyFilter;
pub use mode::{PackageMode, PackageModeTable, merge_mode};
