/// Reasons a widget update is not relevant to image reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Unexpected widget type: {0}")]
    UnexpectedWidgetType(String),

    #[error("Empty widget id")]
    EmptyWidgetId,

    #[error("Unexpected widget state: {0}")]
    UnexpectedState(String),
}
