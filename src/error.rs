use std::{error::Error, fmt, io};

use backtrace::Backtrace;

/// The failure classes the engine distinguishes. Callers usually match on
/// the kind instead of parsing the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Internal inconsistency: schema mismatch, eviction exhaustion, access
    /// to a page that does not exist, pulling an operator that is not open.
    Database,
    /// Raised when a lock cannot be acquired within the deadlock-detection
    /// window. The transaction is dead and must be reissued by the client.
    TransactionAborted,
    Io,
    NoSuchElement,
    IllegalArgument,
}

#[derive(Debug)]
pub struct DbError {
    kind: ErrorKind,
    details: String,
    backtrace: Backtrace,
}

impl DbError {
    pub fn new(kind: ErrorKind, msg: &str) -> DbError {
        DbError {
            kind,
            details: msg.to_string(),
            backtrace: Backtrace::new(),
        }
    }

    pub fn database(msg: &str) -> DbError {
        Self::new(ErrorKind::Database, msg)
    }

    pub fn transaction_aborted(msg: &str) -> DbError {
        Self::new(ErrorKind::TransactionAborted, msg)
    }

    pub fn no_such_element(msg: &str) -> DbError {
        Self::new(ErrorKind::NoSuchElement, msg)
    }

    pub fn illegal_argument(msg: &str) -> DbError {
        Self::new(ErrorKind::IllegalArgument, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn show_backtrace(&self) {
        println!("msg: [{}]\nerror backtrace:\n{:?}", self.details, self.backtrace);
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.details)
    }
}

impl Error for DbError {}

impl From<io::Error> for DbError {
    fn from(e: io::Error) -> Self {
        Self::new(ErrorKind::Io, &e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_survives_construction() {
        let err = DbError::transaction_aborted("lock wait timed out");
        assert_eq!(err.kind(), ErrorKind::TransactionAborted);
        err.show_backtrace();
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk unreachable");
        let err: DbError = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
