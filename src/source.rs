//! Source location primitives.
//!
//! [`SourceLoc`] and [`CharSourceRange`] are plain byte-offset values. They are
//! stored and copied by the rest of the crate and only turned back into text
//! by callers that own the source buffer.

use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// A byte offset into a source buffer, or the invalid location.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct SourceLoc {
    raw: usize,
}

impl SourceLoc {
    /// The invalid location. Ranges starting here never resolve to text.
    pub const INVALID: SourceLoc = SourceLoc { raw: usize::MAX };

    pub const fn new(offset: usize) -> Self {
        SourceLoc { raw: offset }
    }

    pub const fn is_valid(self) -> bool {
        self.raw != usize::MAX
    }

    /// The byte offset, or `None` for [`SourceLoc::INVALID`].
    pub const fn offset(self) -> Option<usize> {
        if self.is_valid() {
            Some(self.raw)
        } else {
            None
        }
    }

    /// Move the location forward by `bytes`. Invalid locations stay invalid.
    pub fn advanced(self, bytes: usize) -> Self {
        match self.offset() {
            Some(offset) => offset
                .checked_add(bytes)
                .filter(|end| *end != usize::MAX)
                .map_or(SourceLoc::INVALID, SourceLoc::new),
            None => self,
        }
    }

    /// Raw representation used at the C boundary.
    pub const fn to_raw(self) -> usize {
        self.raw
    }

    pub const fn from_raw(raw: usize) -> Self {
        SourceLoc { raw }
    }
}

impl Default for SourceLoc {
    fn default() -> Self {
        SourceLoc::INVALID
    }
}

impl fmt::Debug for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset() {
            Some(offset) => write!(f, "SourceLoc({offset})"),
            None => write!(f, "SourceLoc(invalid)"),
        }
    }
}

impl From<usize> for SourceLoc {
    fn from(offset: usize) -> Self {
        SourceLoc::new(offset)
    }
}

/// A half-open byte range `[start, start + byte_length)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[repr(C)]
#[serde(rename_all = "camelCase")]
pub struct CharSourceRange {
    start: SourceLoc,
    byte_length: usize,
}

impl CharSourceRange {
    pub const fn new(start: SourceLoc, byte_length: usize) -> Self {
        CharSourceRange { start, byte_length }
    }

    /// Range covering `start..end`. An inverted pair collapses to an empty
    /// range at `start`.
    pub fn from_offsets(start: usize, end: usize) -> Self {
        CharSourceRange::new(SourceLoc::new(start), end.saturating_sub(start))
    }

    /// Zero-length range at `loc`. Used for arguments written without a label.
    pub const fn empty_at(loc: SourceLoc) -> Self {
        CharSourceRange::new(loc, 0)
    }

    pub const fn start(&self) -> SourceLoc {
        self.start
    }

    pub fn end(&self) -> SourceLoc {
        self.start.advanced(self.byte_length)
    }

    pub const fn byte_length(&self) -> usize {
        self.byte_length
    }

    pub const fn is_empty(&self) -> bool {
        self.byte_length == 0
    }

    pub const fn is_valid(&self) -> bool {
        self.start.is_valid()
    }

    /// Whether `loc` falls inside the range. The end is exclusive, except that
    /// an empty range contains its own start.
    pub fn contains(&self, loc: SourceLoc) -> bool {
        match (self.as_range(), loc.offset()) {
            (Some(range), Some(offset)) if range.is_empty() => offset == range.start,
            (Some(range), Some(offset)) => range.contains(&offset),
            _ => false,
        }
    }

    pub fn as_range(&self) -> Option<Range<usize>> {
        let start = self.start.offset()?;
        let end = start.checked_add(self.byte_length)?;
        Some(start..end)
    }

    /// The slice of `source` covered by this range, if it lies inside it.
    pub fn text<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.as_range()?)
    }
}

impl fmt::Debug for CharSourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_range() {
            Some(range) => write!(f, "CharSourceRange({}..{})", range.start, range.end),
            None => write!(f, "CharSourceRange(invalid)"),
        }
    }
}

impl From<Range<usize>> for CharSourceRange {
    fn from(range: Range<usize>) -> Self {
        CharSourceRange::from_offsets(range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_location_has_no_offset() {
        assert!(!SourceLoc::INVALID.is_valid());
        assert_eq!(SourceLoc::INVALID.offset(), None);
        assert_eq!(SourceLoc::default(), SourceLoc::INVALID);
        assert_eq!(SourceLoc::INVALID.advanced(4), SourceLoc::INVALID);
    }

    #[test]
    fn range_text_extraction() {
        let source = "foo(a: 1, 2)";
        let range = CharSourceRange::from_offsets(4, 7);
        assert_eq!(range.text(source), Some("a: "));
        assert_eq!(range.end(), SourceLoc::new(7));

        let out_of_bounds = CharSourceRange::from_offsets(10, 40);
        assert_eq!(out_of_bounds.text(source), None);
    }

    #[test]
    fn empty_range_contains_its_start() {
        let empty = CharSourceRange::empty_at(SourceLoc::new(10));
        assert!(empty.is_empty());
        assert!(empty.contains(SourceLoc::new(10)));
        assert!(!empty.contains(SourceLoc::new(11)));
        assert_eq!(empty.text("foo(a: 1, 2)"), Some(""));
    }

    #[test]
    fn half_open_containment() {
        let range = CharSourceRange::from(0..3);
        assert!(range.contains(SourceLoc::new(0)));
        assert!(range.contains(SourceLoc::new(2)));
        assert!(!range.contains(SourceLoc::new(3)));
        assert!(!range.contains(SourceLoc::INVALID));
    }

    #[test]
    fn default_range_is_invalid_and_empty() {
        let range = CharSourceRange::default();
        assert!(!range.is_valid());
        assert!(range.is_empty());
        assert_eq!(range.as_range(), None);
        assert_eq!(range.text("anything"), None);
    }
}
