//! Tree-sitter integration for Swift name matching.
//!
//! [`SourceFile`] owns a Swift buffer and its concrete syntax tree, and
//! [`SwiftNameMatcher`] resolves byte locations in it to the names and
//! argument labels around them.

pub mod engine;
pub mod errors;
pub mod parser;

pub use engine::{MatcherOptions, SwiftNameMatcher};
pub use errors::TreeSitterError;
pub use parser::{ErrorNode, SourceFile, SwiftParser};
