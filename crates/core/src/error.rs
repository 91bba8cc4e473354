/// Per-instrument failure inside the engine. Never aborts a batch; the ranker turns it into an
/// unavailable entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("missing required field: {field}")]
    MissingData { field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_the_field() {
        let err = EngineError::MissingData { field: "price" };
        assert_eq!(err.to_string(), "missing required field: price");
    }
}
