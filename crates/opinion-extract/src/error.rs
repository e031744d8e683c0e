/// Structural failures inside the extraction pipeline.
///
/// These never reach callers of [`crate::extract`]; the entrypoint turns
/// every variant into a fallback record.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("response is empty")]
    EmptyInput,

    #[error("no labelled sections found in response")]
    NoSections,

    #[error("none of the {labels} discovered labels matched a known field")]
    NoRecognizedFields { labels: usize },
}
