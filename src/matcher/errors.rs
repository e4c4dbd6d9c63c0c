use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("name matching engine failed: {source}")]
    Engine {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("engine produced {actual} results for {expected} locations")]
    ResultCountMismatch { expected: usize, actual: usize },
}
