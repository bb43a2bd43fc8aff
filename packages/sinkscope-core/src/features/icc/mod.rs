//! Inter-component communication resolution
//!
//! Recognizes intra-application ICC sites, resolves their targets through
//! the manifest, and splices edges into the call graph so plain graph
//! traversal discovers multi-component paths.

pub mod domain;
pub mod infrastructure;

pub use domain::{CallerKind, IccKind, IccSite, ResolvedIcc};
pub use infrastructure::resolver::{IccResolver, IccStats};
