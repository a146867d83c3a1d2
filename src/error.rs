/// Errors surfaced by the extraction pipeline.
///
/// Per-item data problems never show up here; they degrade to skipped
/// blocks or empty fields.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Invalid email batch: {0}")]
    InvalidBatch(String),
}
