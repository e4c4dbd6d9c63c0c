//! Name Locator: bulk name and argument-label resolution for Swift source
//!
//! Given a syntax tree and a batch of byte offsets, the name matcher finds
//! what each offset names (a call, a declaration, a `#selector` reference)
//! and the ranges of the argument labels that belong to it. Rename tooling
//! uses the results to rewrite every label of a name in one pass.
//!
//! # Architecture
//!
//! Results are [`ResolvedLoc`] values collected in a [`ResolvedLocVector`].
//! The vector is owned through an integer handle ([`OpaqueValue`]) so it can
//! be passed to a host runtime over the C boundary in [`ffi`], read there,
//! and released exactly once. The resolution itself is pluggable through
//! [`NameMatchEngine`]; [`SwiftNameMatcher`] is the tree-sitter engine.
//!
//! # Example
//!
//! ```no_run
//! use name_locator::{run_name_matcher, SourceFile, SourceLoc, SwiftNameMatcher};
//!
//! let file = SourceFile::parse("foo(a: 1, 2)\n")?;
//! let matcher = SwiftNameMatcher::default();
//! let results = run_name_matcher(&matcher, &file, &[SourceLoc::new(0)])?;
//!
//! results.with_unbridged(|locs| {
//!     for loc in locs {
//!         println!("{} {:?}", loc.label_type(), file.text(loc.range()));
//!     }
//! })?;
//! results.destroy()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod conditions;
pub mod config;
pub mod ffi;
pub mod matcher;
pub mod pool;
pub mod resolved;
pub mod source;
pub mod ts;
pub mod vector;

// Re-exports
pub use conditions::{ActiveRegions, ConditionSet};
pub use config::{load_from_path, load_from_str, ConfigError, LocatorConfig};
pub use ffi::{BridgeError, BridgedResolvedLoc};
pub use matcher::{run_name_matcher, MatchError, NameMatchEngine, PlaceholderEngine};
pub use resolved::{
    LabelRangeType, ResolvedLoc, ResolvedLocContext, ResolvedLocError, UnknownTag,
};
pub use source::{CharSourceRange, SourceLoc};
pub use ts::{MatcherOptions, SourceFile, SwiftNameMatcher, TreeSitterError};
pub use vector::{live_vector_count, HandleError, OpaqueValue, ResolvedLocVector};
