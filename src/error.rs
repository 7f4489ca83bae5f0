/// Fatal engine errors. Content problems never surface here: they degrade
/// to defaults with a logged warning.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no level templates available")]
    NoLevels,
}
