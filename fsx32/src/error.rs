use syscall::error as sys;

/// Failure modes of the distribution core.
///
/// This mirrors the abstract error kinds of the surrounding volume (no-memory,
/// no-space, invalid-argument, ...) without committing to any particular
/// transport; callers that need a `syscall::Error` use [`Error::to_errno`] or
/// the `From` impl below.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("out of memory")]
    NoMemory,

    #[error("not enough capacity on surviving bricks")]
    NoSpace,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("internal invariant violated: {0}")]
    InvalidState(&'static str),
}

impl Error {
    pub fn to_errno(&self) -> i32 {
        match self {
            Error::NoMemory => sys::ENOMEM,
            Error::NoSpace => sys::ENOSPC,
            Error::InvalidArgument(_) => sys::EINVAL,
            Error::InvalidState(_) => sys::EIO,
        }
    }
}

impl From<Error> for syscall::Error {
    fn from(err: Error) -> syscall::Error {
        syscall::Error::new(err.to_errno())
    }
}

pub type Result<T> = core::result::Result<T, Error>;
