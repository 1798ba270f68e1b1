use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A sort or index name that is not registered
    UnknownReference,
    /// Ordered iteration requested from a condition that cannot provide it
    IllegalIteration,
    InvalidInput,
    Unsupported,
    Internal,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn unknown_reference(name: &str) -> Self {
        Error::new(ErrorKind::UnknownReference, format!("unknown index or sort \"{}\"", name))
    }

    pub fn illegal_iteration(key: &str) -> Self {
        Error::new(ErrorKind::IllegalIteration, format!("condition {} cannot be iterated", key))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_reference_carries_name() {
        let err = Error::unknown_reference("age");
        assert_eq!(err.kind(), ErrorKind::UnknownReference);
        assert!(err.to_string().contains("\"age\""));
        assert!(err.to_string().starts_with("UnknownReference"));
    }
}
