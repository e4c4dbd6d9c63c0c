//! Name-matcher entry point.
//!
//! [`run_name_matcher`] hands a tree and a batch of query locations to a
//! [`NameMatchEngine`] and boxes the engine's answers into a
//! [`ResolvedLocVector`]. The engine decides what each location resolves to;
//! this layer only guarantees that the container holds exactly one result per
//! query, in query order, or that no container is created at all.

pub mod errors;

pub use errors::MatchError;

use crate::resolved::ResolvedLoc;
use crate::source::SourceLoc;
use crate::vector::ResolvedLocVector;

/// Resolves source locations against a syntax tree.
///
/// Implementations must return one [`ResolvedLoc`] per input location, in
/// input order, using [`ResolvedLoc::placeholder`] for locations that do not
/// resolve to anything. An `Err` fails the whole batch.
pub trait NameMatchEngine {
    type Tree: ?Sized;
    type Error: std::error::Error + Send + Sync + 'static;

    fn resolve(
        &self,
        tree: &Self::Tree,
        locations: &[SourceLoc],
    ) -> Result<Vec<ResolvedLoc>, Self::Error>;
}

/// Resolve every location in `locations` and return the results as a newly
/// allocated vector owned by the caller.
///
/// The caller must eventually release the returned vector with
/// [`ResolvedLocVector::destroy`].
pub fn run_name_matcher<E: NameMatchEngine>(
    engine: &E,
    tree: &E::Tree,
    locations: &[SourceLoc],
) -> Result<ResolvedLocVector, MatchError> {
    tracing::debug!(locations = locations.len(), "running name matcher");

    let results = engine
        .resolve(tree, locations)
        .map_err(|error| MatchError::Engine {
            source: Box::new(error),
        })?;

    if results.len() != locations.len() {
        tracing::warn!(
            expected = locations.len(),
            actual = results.len(),
            "name matching engine broke index correspondence"
        );
        return Err(MatchError::ResultCountMismatch {
            expected: locations.len(),
            actual: results.len(),
        });
    }

    let vector = ResolvedLocVector::from_vec(results);
    tracing::debug!(handle = %vector.opaque_value(), "name matcher results ready");
    Ok(vector)
}

/// Engine used when no tree is available: every location gets a placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderEngine;

impl NameMatchEngine for PlaceholderEngine {
    type Tree = ();
    type Error = std::convert::Infallible;

    fn resolve(&self, _tree: &(), locations: &[SourceLoc]) -> Result<Vec<ResolvedLoc>, Self::Error> {
        Ok(vec![ResolvedLoc::placeholder(); locations.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolved::{LabelRangeType, ResolvedLocContext};
    use crate::source::CharSourceRange;
    use crate::vector::live_vector_count;
    use std::collections::HashMap;

    #[derive(Debug, thiserror::Error)]
    #[error("scripted failure")]
    struct ScriptedFailure;

    /// Answers from a fixed offset -> result table.
    struct ScriptedEngine {
        answers: HashMap<usize, ResolvedLoc>,
        fail: bool,
        drop_last: bool,
    }

    impl ScriptedEngine {
        fn new(answers: impl IntoIterator<Item = (usize, ResolvedLoc)>) -> Self {
            ScriptedEngine {
                answers: answers.into_iter().collect(),
                fail: false,
                drop_last: false,
            }
        }

        fn empty() -> Self {
            ScriptedEngine {
                answers: HashMap::new(),
                fail: false,
                drop_last: false,
            }
        }
    }

    impl NameMatchEngine for ScriptedEngine {
        type Tree = str;
        type Error = ScriptedFailure;

        fn resolve(
            &self,
            _tree: &str,
            locations: &[SourceLoc],
        ) -> Result<Vec<ResolvedLoc>, ScriptedFailure> {
            if self.fail {
                return Err(ScriptedFailure);
            }
            let mut results: Vec<ResolvedLoc> = locations
                .iter()
                .map(|loc| {
                    loc.offset()
                        .and_then(|offset| self.answers.get(&offset).cloned())
                        .unwrap_or_default()
                })
                .collect();
            if self.drop_last {
                results.pop();
            }
            Ok(results)
        }
    }

    fn foo_call() -> ResolvedLoc {
        // foo(a: 1, 2)
        ResolvedLoc::new(
            CharSourceRange::from_offsets(0, 3),
            vec![
                CharSourceRange::from_offsets(4, 7),
                CharSourceRange::empty_at(SourceLoc::new(10)),
            ],
            None,
            LabelRangeType::CallArg,
            true,
            ResolvedLocContext::Default,
        )
        .unwrap()
    }

    #[test]
    fn results_follow_query_order() {
        let engine = ScriptedEngine::new([(0, foo_call()), (10, foo_call())]);
        let locations = [SourceLoc::new(10), SourceLoc::new(6), SourceLoc::new(0)];

        let vector = run_name_matcher(&engine, "foo(a: 1, 2)", &locations).unwrap();
        let results = vector.into_vec().unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], foo_call());
        assert_eq!(results[1], ResolvedLoc::placeholder());
        assert_eq!(results[2], foo_call());
    }

    #[test]
    fn empty_query_yields_empty_vector() {
        let engine = ScriptedEngine::empty();
        let vector = run_name_matcher(&engine, "", &[]).unwrap();
        assert_eq!(vector.len(), Ok(0));
        vector.destroy().unwrap();
    }

    #[test]
    fn engine_failure_allocates_nothing() {
        let mut engine = ScriptedEngine::empty();
        engine.fail = true;
        let before = live_vector_count();

        let err = run_name_matcher(&engine, "x", &[SourceLoc::new(0)]).unwrap_err();
        assert!(matches!(err, MatchError::Engine { .. }));
        assert_eq!(err.to_string(), "name matching engine failed: scripted failure");
        assert_eq!(live_vector_count(), before);
    }

    #[test]
    fn short_engine_output_is_rejected() {
        let mut engine = ScriptedEngine::empty();
        engine.drop_last = true;
        let before = live_vector_count();

        let err = run_name_matcher(&engine, "x", &[SourceLoc::new(0), SourceLoc::new(1)])
            .unwrap_err();
        assert!(matches!(
            err,
            MatchError::ResultCountMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert_eq!(live_vector_count(), before);
    }

    #[test]
    fn placeholder_engine_keeps_arity() {
        let locations = vec![SourceLoc::INVALID; 4];
        let vector = run_name_matcher(&PlaceholderEngine, &(), &locations).unwrap();
        let results = vector.into_vec().unwrap();
        assert_eq!(results, vec![ResolvedLoc::placeholder(); 4]);
    }
}
