use thiserror::Error;

#[derive(Error, Debug)]
pub enum EaselError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Concurrency error: {0}")]
    Concurrency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EaselError {
    pub fn not_found(what: &str, id: &str) -> Self {
        Self::NotFound(format!("{} '{}'", what, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = EaselError::not_found("object", "obj-1");
        assert_eq!(err.to_string(), "Not found: object 'obj-1'");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err: EaselError = io.into();
        assert!(matches!(err, EaselError::Io(_)));
    }
}
