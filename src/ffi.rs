//! C boundary for hosts that cannot hold Rust values.
//!
//! Result containers cross as `u64` handles ([`OpaqueValue`]); `0` means
//! "no container". Every function reports contract violations through its
//! return value and a `warn!` event, never by unwinding.

use crate::matcher::{run_name_matcher, MatchError, PlaceholderEngine};
use crate::resolved::{
    LabelRangeType, ResolvedLoc, ResolvedLocContext, ResolvedLocError, UnknownTag,
};
use crate::source::{CharSourceRange, SourceLoc};
use crate::conditions::ConditionSet;
use crate::ts::{MatcherOptions, SourceFile, SwiftNameMatcher, TreeSitterError};
use crate::vector::{HandleError, OpaqueValue, ResolvedLocVector};
use std::ptr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("null pointer passed for {0}")]
    NullPointer(&'static str),

    #[error(transparent)]
    Tag(#[from] UnknownTag),

    #[error(transparent)]
    Loc(#[from] ResolvedLocError),

    #[error(transparent)]
    Handle(#[from] HandleError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("source text is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error(transparent)]
    Parse(#[from] TreeSitterError),

    #[error("first trailing label index {index} does not fit in 32 bits")]
    TrailingLabelTooLarge { index: usize },
}

/// [`ResolvedLoc`] as laid out for C.
///
/// `label_ranges` points at `label_ranges_count` entries. In values produced
/// by [`name_locator_resolved_locs_get`] it stays valid until the owning
/// handle is destroyed.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BridgedResolvedLoc {
    pub range: CharSourceRange,
    pub label_ranges: *const CharSourceRange,
    pub label_ranges_count: usize,
    pub has_first_trailing_label: bool,
    pub first_trailing_label: u32,
    pub label_type: u8,
    pub is_active: bool,
    pub context: u8,
}

impl Default for BridgedResolvedLoc {
    fn default() -> Self {
        BridgedResolvedLoc {
            range: CharSourceRange::default(),
            label_ranges: ptr::null(),
            label_ranges_count: 0,
            has_first_trailing_label: false,
            first_trailing_label: 0,
            label_type: LabelRangeType::None as u8,
            is_active: true,
            context: ResolvedLocContext::Default as u8,
        }
    }
}

fn bridge_trailing_label(index: Option<usize>) -> Result<Option<u32>, BridgeError> {
    index
        .map(|index| u32::try_from(index).map_err(|_| BridgeError::TrailingLabelTooLarge { index }))
        .transpose()
}

impl TryFrom<&ResolvedLoc> for BridgedResolvedLoc {
    type Error = BridgeError;

    fn try_from(loc: &ResolvedLoc) -> Result<Self, BridgeError> {
        let labels = loc.label_ranges();
        let first_trailing_label = bridge_trailing_label(loc.first_trailing_label())?;
        Ok(BridgedResolvedLoc {
            range: loc.range(),
            label_ranges: if labels.is_empty() {
                ptr::null()
            } else {
                labels.as_ptr()
            },
            label_ranges_count: labels.len(),
            has_first_trailing_label: first_trailing_label.is_some(),
            first_trailing_label: first_trailing_label.unwrap_or(0),
            label_type: loc.label_type() as u8,
            is_active: loc.is_active(),
            context: loc.context() as u8,
        })
    }
}

impl BridgedResolvedLoc {
    /// Copy into an owned [`ResolvedLoc`].
    ///
    /// # Safety
    ///
    /// `label_ranges` must be null or point at `label_ranges_count` readable
    /// entries.
    pub unsafe fn to_resolved(&self) -> Result<ResolvedLoc, BridgeError> {
        let labels = if self.label_ranges_count == 0 {
            Vec::new()
        } else if self.label_ranges.is_null() {
            return Err(BridgeError::NullPointer("label_ranges"));
        } else {
            // SAFETY: guaranteed by the caller.
            unsafe { std::slice::from_raw_parts(self.label_ranges, self.label_ranges_count) }
                .to_vec()
        };
        let first_trailing_label = self
            .has_first_trailing_label
            .then_some(self.first_trailing_label as usize);

        Ok(ResolvedLoc::new(
            self.range,
            labels,
            first_trailing_label,
            LabelRangeType::try_from(self.label_type)?,
            self.is_active,
            ResolvedLocContext::try_from(self.context)?,
        )?)
    }
}

fn vector_from_raw(handle: u64) -> Result<ResolvedLocVector, BridgeError> {
    OpaqueValue::from_raw(handle)
        .map(ResolvedLocVector::from_opaque_value)
        .ok_or(BridgeError::Handle(HandleError::Null))
}

fn report<T>(operation: &'static str, result: Result<T, BridgeError>) -> Option<T> {
    result
        .map_err(|error| tracing::warn!(operation, %error, "rejected boundary call"))
        .ok()
}

/// Parse `len` bytes of UTF-8 Swift source. Returns null on invalid input.
///
/// # Safety
///
/// `buf` must point at `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn name_locator_source_file_parse(
    buf: *const u8,
    len: usize,
) -> *mut SourceFile {
    let result = (|| {
        if buf.is_null() {
            return Err(BridgeError::NullPointer("buf"));
        }
        // SAFETY: guaranteed by the caller.
        let bytes = unsafe { std::slice::from_raw_parts(buf, len) };
        let source = std::str::from_utf8(bytes)?;
        Ok(SourceFile::parse(source)?)
    })();

    match report("source_file_parse", result) {
        Some(file) => Box::into_raw(Box::new(file)),
        None => ptr::null_mut(),
    }
}

/// # Safety
///
/// `file` must be null or a pointer returned by
/// [`name_locator_source_file_parse`] that has not been destroyed.
#[no_mangle]
pub unsafe extern "C" fn name_locator_source_file_destroy(file: *mut SourceFile) {
    if !file.is_null() {
        // SAFETY: guaranteed by the caller.
        drop(unsafe { Box::from_raw(file) });
    }
}

/// Resolve `count` byte offsets against `file` and return a new handle the
/// caller must destroy, or `0` if the engine failed. A null `file` yields a
/// placeholder for every location.
///
/// No compilation conditions are set, so code under `#if` branches that need
/// one (`#if DEBUG`) reports inactive. Use
/// [`name_locator_run_name_matcher_with_conditions`] to supply them.
///
/// # Safety
///
/// `file` must be null or a live pointer from
/// [`name_locator_source_file_parse`]. `locations` must point at `count`
/// readable offsets (it may be null when `count` is zero).
#[no_mangle]
pub unsafe extern "C" fn name_locator_run_name_matcher(
    file: *const SourceFile,
    locations: *const usize,
    count: usize,
) -> u64 {
    // SAFETY: forwarded from the caller.
    let result = unsafe { run_matcher(file, locations, count, ConditionSet::new()) };
    report("run_name_matcher", result).unwrap_or(0)
}

/// [`name_locator_run_name_matcher`] with active compilation conditions.
///
/// `conditions` holds `conditions_len` bytes of UTF-8 condition names
/// separated by newlines, e.g. `"DEBUG\nos(macOS)"`. It may be null when
/// `conditions_len` is zero.
///
/// # Safety
///
/// As for [`name_locator_run_name_matcher`], and `conditions` must point at
/// `conditions_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn name_locator_run_name_matcher_with_conditions(
    file: *const SourceFile,
    locations: *const usize,
    count: usize,
    conditions: *const u8,
    conditions_len: usize,
) -> u64 {
    let result = (|| {
        let conditions = if conditions_len == 0 {
            ConditionSet::new()
        } else if conditions.is_null() {
            return Err(BridgeError::NullPointer("conditions"));
        } else {
            // SAFETY: guaranteed by the caller.
            let bytes = unsafe { std::slice::from_raw_parts(conditions, conditions_len) };
            std::str::from_utf8(bytes)?.lines().collect()
        };
        // SAFETY: forwarded from the caller.
        unsafe { run_matcher(file, locations, count, conditions) }
    })();
    report("run_name_matcher_with_conditions", result).unwrap_or(0)
}

/// # Safety
///
/// See [`name_locator_run_name_matcher`].
unsafe fn run_matcher(
    file: *const SourceFile,
    locations: *const usize,
    count: usize,
    conditions: ConditionSet,
) -> Result<u64, BridgeError> {
    let locations: Vec<SourceLoc> = if count == 0 {
        Vec::new()
    } else if locations.is_null() {
        return Err(BridgeError::NullPointer("locations"));
    } else {
        // SAFETY: guaranteed by the caller.
        unsafe { std::slice::from_raw_parts(locations, count) }
            .iter()
            .map(|raw| SourceLoc::from_raw(*raw))
            .collect()
    };

    // SAFETY: guaranteed by the caller.
    let vector = match unsafe { file.as_ref() } {
        Some(file) => {
            let matcher = SwiftNameMatcher::new(conditions, MatcherOptions::default());
            run_name_matcher(&matcher, file, &locations)?
        }
        None => run_name_matcher(&PlaceholderEngine, &(), &locations)?,
    };
    Ok(vector.opaque_value().into_raw())
}

#[no_mangle]
pub extern "C" fn name_locator_resolved_locs_create_empty() -> u64 {
    ResolvedLocVector::empty().opaque_value().into_raw()
}

/// Append a copy of `*loc`. Returns false if the handle is not live or the
/// value is malformed.
///
/// # Safety
///
/// `loc` must be null or point at a valid [`BridgedResolvedLoc`] whose label
/// pointer satisfies [`BridgedResolvedLoc::to_resolved`].
#[no_mangle]
pub unsafe extern "C" fn name_locator_resolved_locs_push_back(
    handle: u64,
    loc: *const BridgedResolvedLoc,
) -> bool {
    let result = (|| {
        let vector = vector_from_raw(handle)?;
        // SAFETY: guaranteed by the caller.
        let bridged = unsafe { loc.as_ref() }.ok_or(BridgeError::NullPointer("loc"))?;
        // SAFETY: guaranteed by the caller.
        let loc = unsafe { bridged.to_resolved() }?;
        vector.push_back(loc)?;
        Ok(())
    })();

    report("resolved_locs_push_back", result).is_some()
}

/// Number of entries, or `0` for a handle that is not live.
#[no_mangle]
pub extern "C" fn name_locator_resolved_locs_count(handle: u64) -> usize {
    let result = vector_from_raw(handle).and_then(|vector| Ok(vector.len()?));
    report("resolved_locs_count", result).unwrap_or(0)
}

/// Write entry `index` to `*out`. Returns false if the handle is not live,
/// the index is out of range, `out` is null, or the entry's trailing label
/// index does not fit the `u32` field.
///
/// # Safety
///
/// `out` must be null or point at writable memory for one
/// [`BridgedResolvedLoc`].
#[no_mangle]
pub unsafe extern "C" fn name_locator_resolved_locs_get(
    handle: u64,
    index: usize,
    out: *mut BridgedResolvedLoc,
) -> bool {
    let result = (|| {
        if out.is_null() {
            return Err(BridgeError::NullPointer("out"));
        }
        let vector = vector_from_raw(handle)?;
        vector.with_unbridged(|locs| {
            locs.get(index)
                .map(BridgedResolvedLoc::try_from)
                .transpose()
        })?
    })();

    match report("resolved_locs_get", result).flatten() {
        Some(bridged) => {
            // SAFETY: checked non-null above; writability guaranteed by the caller.
            unsafe { out.write(bridged) };
            true
        }
        None => false,
    }
}

#[no_mangle]
pub extern "C" fn name_locator_resolved_locs_is_live(handle: u64) -> bool {
    vector_from_raw(handle).is_ok_and(|vector| vector.is_live())
}

/// Release the container. Returns false for `0`, unknown handles and handles
/// that were already destroyed.
#[no_mangle]
pub extern "C" fn name_locator_resolved_locs_destroy(handle: u64) -> bool {
    let result = vector_from_raw(handle).and_then(|vector| Ok(vector.destroy()?));
    report("resolved_locs_destroy", result).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> *mut SourceFile {
        unsafe { name_locator_source_file_parse(source.as_ptr(), source.len()) }
    }

    fn get(handle: u64, index: usize) -> Option<BridgedResolvedLoc> {
        let mut out = BridgedResolvedLoc::default();
        unsafe { name_locator_resolved_locs_get(handle, index, &mut out) }.then_some(out)
    }

    fn labels(bridged: &BridgedResolvedLoc) -> &[CharSourceRange] {
        if bridged.label_ranges_count == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(bridged.label_ranges, bridged.label_ranges_count) }
    }

    #[test]
    fn matcher_round_trip_through_handles() {
        let source = "foo(a: 1, 2)\n";
        let file = parse(source);
        assert!(!file.is_null());

        let offsets = [0usize, source.find("2)").unwrap()];
        let handle =
            unsafe { name_locator_run_name_matcher(file, offsets.as_ptr(), offsets.len()) };
        assert_ne!(handle, 0);
        assert_eq!(name_locator_resolved_locs_count(handle), 2);

        let first = get(handle, 0).unwrap();
        assert_eq!(first.label_type, LabelRangeType::CallArg as u8);
        assert_eq!(first.range, CharSourceRange::from_offsets(0, 3));
        assert!(!first.has_first_trailing_label);
        let first_labels = labels(&first);
        assert_eq!(first_labels.len(), 2);
        assert_eq!(first_labels[0].text(source), Some("a: "));
        assert!(first_labels[1].is_empty());

        assert!(get(handle, 2).is_none());

        assert!(name_locator_resolved_locs_destroy(handle));
        assert!(!name_locator_resolved_locs_destroy(handle));
        assert!(!name_locator_resolved_locs_is_live(handle));
        assert_eq!(name_locator_resolved_locs_count(handle), 0);

        unsafe { name_locator_source_file_destroy(file) };
    }

    #[test]
    fn null_file_yields_placeholders() {
        let offsets = [1usize, 2, 3];
        let handle = unsafe {
            name_locator_run_name_matcher(ptr::null(), offsets.as_ptr(), offsets.len())
        };
        assert_eq!(name_locator_resolved_locs_count(handle), 3);
        let loc = get(handle, 1).unwrap();
        assert_eq!(loc.label_ranges_count, 0);
        assert_eq!(loc.label_type, LabelRangeType::None as u8);
        assert!(name_locator_resolved_locs_destroy(handle));
    }

    #[test]
    fn null_locations_with_count_fail() {
        let handle = unsafe { name_locator_run_name_matcher(ptr::null(), ptr::null(), 2) };
        assert_eq!(handle, 0);
    }

    #[test]
    fn push_back_validates_input() {
        let handle = name_locator_resolved_locs_create_empty();
        let labels = [CharSourceRange::from_offsets(4, 7)];

        let mut loc = BridgedResolvedLoc {
            range: CharSourceRange::from_offsets(0, 3),
            label_ranges: labels.as_ptr(),
            label_ranges_count: labels.len(),
            has_first_trailing_label: true,
            first_trailing_label: 0,
            label_type: LabelRangeType::CallArg as u8,
            is_active: true,
            context: ResolvedLocContext::Default as u8,
        };
        assert!(unsafe { name_locator_resolved_locs_push_back(handle, &loc) });

        loc.first_trailing_label = 1;
        assert!(!unsafe { name_locator_resolved_locs_push_back(handle, &loc) });

        loc.first_trailing_label = 0;
        loc.context = 200;
        assert!(!unsafe { name_locator_resolved_locs_push_back(handle, &loc) });

        assert!(!unsafe { name_locator_resolved_locs_push_back(handle, ptr::null()) });
        assert_eq!(name_locator_resolved_locs_count(handle), 1);

        let stored = get(handle, 0).unwrap();
        assert_eq!(labels_of(&stored), vec![CharSourceRange::from_offsets(4, 7)]);
        assert!(stored.has_first_trailing_label);

        assert!(name_locator_resolved_locs_destroy(handle));
        assert!(!unsafe { name_locator_resolved_locs_push_back(handle, &loc) });
    }

    fn labels_of(bridged: &BridgedResolvedLoc) -> Vec<CharSourceRange> {
        labels(bridged).to_vec()
    }

    #[test]
    fn zero_handle_is_never_live() {
        assert!(!name_locator_resolved_locs_is_live(0));
        assert!(!name_locator_resolved_locs_destroy(0));
        assert_eq!(name_locator_resolved_locs_count(0), 0);
        assert!(get(0, 0).is_none());
    }

    #[test]
    fn conditions_reach_the_engine() {
        let source = "#if DEBUG\nlog(level: 1)\n#endif\n";
        let file = parse(source);
        let offsets = [source.find("log").unwrap()];

        let plain =
            unsafe { name_locator_run_name_matcher(file, offsets.as_ptr(), offsets.len()) };
        assert!(!get(plain, 0).unwrap().is_active);

        let conditions = "TESTING\nDEBUG";
        let debug = unsafe {
            name_locator_run_name_matcher_with_conditions(
                file,
                offsets.as_ptr(),
                offsets.len(),
                conditions.as_ptr(),
                conditions.len(),
            )
        };
        assert!(get(debug, 0).unwrap().is_active);

        let bad = [0xffu8];
        let rejected = unsafe {
            name_locator_run_name_matcher_with_conditions(
                file,
                offsets.as_ptr(),
                offsets.len(),
                bad.as_ptr(),
                bad.len(),
            )
        };
        assert_eq!(rejected, 0);

        assert!(name_locator_resolved_locs_destroy(plain));
        assert!(name_locator_resolved_locs_destroy(debug));
        unsafe { name_locator_source_file_destroy(file) };
    }

    #[test]
    fn trailing_label_index_must_fit_u32() {
        assert_eq!(bridge_trailing_label(None).unwrap(), None);
        assert_eq!(bridge_trailing_label(Some(3)).unwrap(), Some(3));
        assert_eq!(
            bridge_trailing_label(Some(u32::MAX as usize)).unwrap(),
            Some(u32::MAX)
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_trailing_label_is_an_error() {
        let index = u32::MAX as usize + 1;
        let err = bridge_trailing_label(Some(index)).unwrap_err();
        assert!(matches!(err, BridgeError::TrailingLabelTooLarge { index: i } if i == index));
    }

    #[test]
    fn default_matches_placeholder() {
        let bridged = BridgedResolvedLoc::default();
        let converted = BridgedResolvedLoc::try_from(&ResolvedLoc::placeholder()).unwrap();
        assert_eq!(bridged.range, converted.range);
        assert_eq!(bridged.label_ranges_count, converted.label_ranges_count);
        assert_eq!(bridged.has_first_trailing_label, converted.has_first_trailing_label);
        assert_eq!(bridged.label_type, converted.label_type);
        assert_eq!(bridged.is_active, converted.is_active);
        assert_eq!(bridged.context, converted.context);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let bytes = [0xffu8, 0xfe];
        let file = unsafe { name_locator_source_file_parse(bytes.as_ptr(), bytes.len()) };
        assert!(file.is_null());
    }
}
