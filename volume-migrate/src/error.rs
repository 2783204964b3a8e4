use syscall::error as sys;

/// Failure modes of the extent migration engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("out of memory")]
    NoMemory,

    #[error("not enough space to reserve for migration")]
    NoSpace,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("tree lookup did not find the expected item")]
    TreeNotFound,

    #[error("i/o error: {0}")]
    Io(String),

    #[error("internal invariant violated: {0}")]
    InvalidState(&'static str),
}

impl Error {
    pub fn to_errno(&self) -> i32 {
        match self {
            Error::NoMemory => sys::ENOMEM,
            Error::NoSpace => sys::ENOSPC,
            Error::InvalidArgument(_) => sys::EINVAL,
            Error::TreeNotFound => sys::ENOENT,
            Error::Io(_) => sys::EIO,
            Error::InvalidState(_) => sys::EIO,
        }
    }
}

impl From<Error> for syscall::Error {
    fn from(err: Error) -> syscall::Error {
        syscall::Error::new(err.to_errno())
    }
}

impl From<fsx32::Error> for Error {
    fn from(err: fsx32::Error) -> Error {
        match err {
            fsx32::Error::NoMemory => Error::NoMemory,
            fsx32::Error::NoSpace => Error::NoSpace,
            fsx32::Error::InvalidArgument(m) => Error::InvalidArgument(m),
            fsx32::Error::InvalidState(m) => Error::InvalidState(m),
            _ => Error::InvalidState("unrecognized fsx32 error variant"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
