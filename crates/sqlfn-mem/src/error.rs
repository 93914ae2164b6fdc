use thiserror::Error;

/// Result type local to sqlfn-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("allocation failed for {bytes} bytes ({what})")]
    AllocFailed { what: &'static str, bytes: usize },

    #[error("construction of {what} panicked; {bytes} bytes released")]
    ConstructFailed { what: &'static str, bytes: usize },

    #[error("{what} needs {bytes} bytes, more than a single engine allocation allows")]
    TooLarge { what: &'static str, bytes: usize },

    #[error("aggregate slot accessed after its instance was destroyed")]
    SlotDestroyed,
}

impl From<Error> for sqlfn_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::AllocFailed { what, bytes }
            | Error::ConstructFailed { what, bytes }
            | Error::TooLarge { what, bytes } => {
                sqlfn_core::Error::AllocationFailed { what, bytes }
            }
            Error::SlotDestroyed => sqlfn_core::Error::Misuse(e.to_string()),
        }
    }
}
