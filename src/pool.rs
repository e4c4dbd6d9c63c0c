//! Thread-local parser pooling.
//!
//! Creates a Swift parser on first use per thread and reuses it for every
//! later parse on that thread.

use crate::ts::{SwiftParser, TreeSitterError};
use std::cell::RefCell;

thread_local! {
    static SWIFT_PARSER: RefCell<Option<SwiftParser>> = const { RefCell::new(None) };
}

/// Execute function with pooled parser instance.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use name_locator::pool::with_parser;
///
/// let tree = with_parser(|parser| parser.parse("foo(a: 1)"))??;
/// assert_eq!(tree.root_node().kind(), "source_file");
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut SwiftParser) -> R,
{
    let mut parser = match SWIFT_PARSER.take() {
        Some(parser) => parser,
        None => SwiftParser::new()?,
    };
    let result = f(&mut parser);
    SWIFT_PARSER.set(Some(parser));
    Ok(result)
}
