//! Resolution results for single source locations.
//!
//! A [`ResolvedLoc`] names the base range found at a queried location and
//! the argument-label ranges that belong to it. [`LabelRangeType`] says how
//! those labels are shaped; [`ResolvedLocContext`] says where in the source
//! the name was found. Both enums carry stable `u8` tags for the C boundary.

use crate::source::CharSourceRange;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// What the `label_ranges` of a [`ResolvedLoc`] describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
#[non_exhaustive]
pub enum LabelRangeType {
    #[default]
    None = 0,

    /// `foo([a: ]2)` or `.foo([a: ]String)`
    CallArg = 1,

    /// `func foo([a b]: Int)`
    Param = 2,

    /// `subscript([a a]: Int)`
    NoncollapsibleParam = 3,

    /// `#selector(foo.func([a]:))`
    Selector = 4,
}

impl LabelRangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            LabelRangeType::None => "none",
            LabelRangeType::CallArg => "callArg",
            LabelRangeType::Param => "param",
            LabelRangeType::NoncollapsibleParam => "noncollapsibleParam",
            LabelRangeType::Selector => "selector",
        }
    }
}

impl fmt::Display for LabelRangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for LabelRangeType {
    type Error = UnknownTag;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(LabelRangeType::None),
            1 => Ok(LabelRangeType::CallArg),
            2 => Ok(LabelRangeType::Param),
            3 => Ok(LabelRangeType::NoncollapsibleParam),
            4 => Ok(LabelRangeType::Selector),
            _ => Err(UnknownTag {
                kind: "LabelRangeType",
                tag,
            }),
        }
    }
}

/// The lexical situation a location was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
#[non_exhaustive]
pub enum ResolvedLocContext {
    #[default]
    Default = 0,
    Selector = 1,
    Comment = 2,
    StringLiteral = 3,
}

impl ResolvedLocContext {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolvedLocContext::Default => "default",
            ResolvedLocContext::Selector => "selector",
            ResolvedLocContext::Comment => "comment",
            ResolvedLocContext::StringLiteral => "stringLiteral",
        }
    }
}

impl fmt::Display for ResolvedLocContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for ResolvedLocContext {
    type Error = UnknownTag;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(ResolvedLocContext::Default),
            1 => Ok(ResolvedLocContext::Selector),
            2 => Ok(ResolvedLocContext::Comment),
            3 => Ok(ResolvedLocContext::StringLiteral),
            _ => Err(UnknownTag {
                kind: "ResolvedLocContext",
                tag,
            }),
        }
    }
}

/// A raw enum tag that does not name any known variant.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown {kind} tag {tag}")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub tag: u8,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolvedLocError {
    #[error("first trailing label index {index} is out of bounds for {len} label ranges")]
    TrailingLabelOutOfBounds { index: usize, len: usize },
}

/// The resolution of one queried source location.
///
/// What `label_ranges` contains depends on [`LabelRangeType`]:
/// - call labels span from the label name (excluding trivia) to the end of
///   the colon's trailing whitespace;
/// - declaration labels span the first and second name, excluding the trivia
///   on their sides;
/// - selector labels span the label name only;
/// - an argument written without a label is an empty range at the start of
///   the argument, so the sequence always has one entry per argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLoc {
    range: CharSourceRange,
    label_ranges: Vec<CharSourceRange>,
    first_trailing_label: Option<usize>,
    label_type: LabelRangeType,
    is_active: bool,
    context: ResolvedLocContext,
}

impl ResolvedLoc {
    pub fn new(
        range: CharSourceRange,
        label_ranges: Vec<CharSourceRange>,
        first_trailing_label: Option<usize>,
        label_type: LabelRangeType,
        is_active: bool,
        context: ResolvedLocContext,
    ) -> Result<Self, ResolvedLocError> {
        if let Some(index) = first_trailing_label {
            if index >= label_ranges.len() {
                return Err(ResolvedLocError::TrailingLabelOutOfBounds {
                    index,
                    len: label_ranges.len(),
                });
            }
        }

        Ok(ResolvedLoc {
            range,
            label_ranges,
            first_trailing_label,
            label_type,
            is_active,
            context,
        })
    }

    /// Value used for locations that resolve to nothing.
    ///
    /// It is not a sentinel: a real match can look identical, so consumers
    /// pair results with their queries by index instead of inspecting it.
    pub fn placeholder() -> Self {
        ResolvedLoc {
            range: CharSourceRange::default(),
            label_ranges: Vec::new(),
            first_trailing_label: None,
            label_type: LabelRangeType::None,
            is_active: true,
            context: ResolvedLocContext::Default,
        }
    }

    /// The range of the base name.
    pub fn range(&self) -> CharSourceRange {
        self.range
    }

    pub fn label_ranges(&self) -> &[CharSourceRange] {
        &self.label_ranges
    }

    /// Index into `label_ranges` of the first trailing closure's label.
    pub fn first_trailing_label(&self) -> Option<usize> {
        self.first_trailing_label
    }

    /// Labels that belong to trailing closures, empty when there are none.
    pub fn trailing_labels(&self) -> &[CharSourceRange] {
        match self.first_trailing_label {
            Some(index) => &self.label_ranges[index..],
            None => &[],
        }
    }

    pub fn label_type(&self) -> LabelRangeType {
        self.label_type
    }

    /// Whether the location is in an active `#if` region.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn context(&self) -> ResolvedLocContext {
        self.context
    }
}

impl Default for ResolvedLoc {
    fn default() -> Self {
        ResolvedLoc::placeholder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceLoc;

    fn labels(n: usize) -> Vec<CharSourceRange> {
        (0..n)
            .map(|i| CharSourceRange::from_offsets(i * 4, i * 4 + 2))
            .collect()
    }

    #[test]
    fn placeholder_shape() {
        let loc = ResolvedLoc::default();
        assert!(!loc.range().is_valid());
        assert!(loc.label_ranges().is_empty());
        assert_eq!(loc.first_trailing_label(), None);
        assert_eq!(loc.label_type(), LabelRangeType::None);
        assert!(loc.is_active());
        assert_eq!(loc.context(), ResolvedLocContext::Default);
    }

    #[test]
    fn trailing_label_must_be_in_bounds() {
        let err = ResolvedLoc::new(
            CharSourceRange::from_offsets(0, 3),
            labels(2),
            Some(2),
            LabelRangeType::CallArg,
            true,
            ResolvedLocContext::Default,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ResolvedLocError::TrailingLabelOutOfBounds { index: 2, len: 2 }
        );

        let empty = ResolvedLoc::new(
            CharSourceRange::from_offsets(0, 3),
            Vec::new(),
            Some(0),
            LabelRangeType::CallArg,
            true,
            ResolvedLocContext::Default,
        );
        assert!(empty.is_err());
    }

    #[test]
    fn trailing_labels_slice() {
        let loc = ResolvedLoc::new(
            CharSourceRange::from_offsets(0, 3),
            labels(3),
            Some(1),
            LabelRangeType::CallArg,
            true,
            ResolvedLocContext::Default,
        )
        .unwrap();
        assert_eq!(loc.trailing_labels(), &labels(3)[1..]);

        let without = ResolvedLoc::new(
            CharSourceRange::from_offsets(0, 3),
            labels(3),
            None,
            LabelRangeType::CallArg,
            true,
            ResolvedLocContext::Default,
        )
        .unwrap();
        assert!(without.trailing_labels().is_empty());
    }

    #[test]
    fn unlabeled_argument_keeps_its_slot() {
        let loc = ResolvedLoc::new(
            CharSourceRange::from_offsets(0, 3),
            vec![
                CharSourceRange::from_offsets(4, 7),
                CharSourceRange::empty_at(SourceLoc::new(10)),
            ],
            None,
            LabelRangeType::CallArg,
            false,
            ResolvedLocContext::Default,
        )
        .unwrap();
        assert_eq!(loc.label_ranges().len(), 2);
        assert!(loc.label_ranges()[1].is_empty());
        assert!(!loc.is_active());
    }

    #[test]
    fn raw_tags_decode() {
        assert_eq!(LabelRangeType::try_from(3), Ok(LabelRangeType::NoncollapsibleParam));
        assert_eq!(
            ResolvedLocContext::try_from(3),
            Ok(ResolvedLocContext::StringLiteral)
        );
        assert_eq!(LabelRangeType::Selector as u8, 4);

        let err = LabelRangeType::try_from(9).unwrap_err();
        assert_eq!(err.to_string(), "unknown LabelRangeType tag 9");
        assert!(ResolvedLocContext::try_from(4).is_err());
    }

    #[test]
    fn serializes_with_camel_case_names() {
        let loc = ResolvedLoc::new(
            CharSourceRange::from_offsets(0, 3),
            vec![CharSourceRange::from_offsets(4, 7)],
            None,
            LabelRangeType::CallArg,
            true,
            ResolvedLocContext::StringLiteral,
        )
        .unwrap();
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json["labelType"], "callArg");
        assert_eq!(json["context"], "stringLiteral");
        assert_eq!(json["isActive"], true);
        assert_eq!(json["labelRanges"][0]["byteLength"], 3);
        assert!(json["firstTrailingLabel"].is_null());
    }
}
