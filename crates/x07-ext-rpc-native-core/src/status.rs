use thiserror::Error;

/// An RPC status code as the engine reports it.
///
/// The canonical codes have named constants, but any integer is carried
/// through unchanged.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StatusCode(i32);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(0);
    pub const CANCELLED: StatusCode = StatusCode(1);
    pub const UNKNOWN: StatusCode = StatusCode(2);
    pub const INVALID_ARGUMENT: StatusCode = StatusCode(3);
    pub const DEADLINE_EXCEEDED: StatusCode = StatusCode(4);
    pub const NOT_FOUND: StatusCode = StatusCode(5);
    pub const ALREADY_EXISTS: StatusCode = StatusCode(6);
    pub const PERMISSION_DENIED: StatusCode = StatusCode(7);
    pub const RESOURCE_EXHAUSTED: StatusCode = StatusCode(8);
    pub const FAILED_PRECONDITION: StatusCode = StatusCode(9);
    pub const ABORTED: StatusCode = StatusCode(10);
    pub const OUT_OF_RANGE: StatusCode = StatusCode(11);
    pub const UNIMPLEMENTED: StatusCode = StatusCode(12);
    pub const INTERNAL: StatusCode = StatusCode(13);
    pub const UNAVAILABLE: StatusCode = StatusCode(14);
    pub const DATA_LOSS: StatusCode = StatusCode(15);
    pub const UNAUTHENTICATED: StatusCode = StatusCode(16);

    pub const fn new(code: i32) -> StatusCode {
        StatusCode(code)
    }

    pub fn code(self) -> i32 {
        self.0
    }

    /// Name of a canonical code, for logs. `None` for anything else.
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "OK",
            1 => "CANCELLED",
            2 => "UNKNOWN",
            3 => "INVALID_ARGUMENT",
            4 => "DEADLINE_EXCEEDED",
            5 => "NOT_FOUND",
            6 => "ALREADY_EXISTS",
            7 => "PERMISSION_DENIED",
            8 => "RESOURCE_EXHAUSTED",
            9 => "FAILED_PRECONDITION",
            10 => "ABORTED",
            11 => "OUT_OF_RANGE",
            12 => "UNIMPLEMENTED",
            13 => "INTERNAL",
            14 => "UNAVAILABLE",
            15 => "DATA_LOSS",
            16 => "UNAUTHENTICATED",
            _ => return None,
        };
        Some(name)
    }
}

impl From<i32> for StatusCode {
    fn from(code: i32) -> Self {
        StatusCode(code)
    }
}

/// Why the engine refused to accept a submission.
///
/// This says nothing about the RPC's outcome, which is only reported through
/// the status fields of the batch context once the batch completes.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum CallError {
    #[error("call error")]
    Error = 1,
    #[error("operation is not available on the server")]
    NotOnServer = 2,
    #[error("operation is not available on the client")]
    NotOnClient = 3,
    #[error("call was already accepted")]
    AlreadyAccepted = 4,
    #[error("call was already invoked")]
    AlreadyInvoked = 5,
    #[error("call was not invoked")]
    NotInvoked = 6,
    #[error("call already finished")]
    AlreadyFinished = 7,
    #[error("too many outstanding operations")]
    TooManyOperations = 8,
    #[error("invalid flags")]
    InvalidFlags = 9,
    #[error("invalid metadata")]
    InvalidMetadata = 10,
    #[error("invalid message")]
    InvalidMessage = 11,
    #[error("completion queue is not registered with the server")]
    NotServerCompletionQueue = 12,
    #[error("batch has too many operations")]
    BatchTooBig = 13,
    #[error("payload type mismatch")]
    PayloadTypeMismatch = 14,
    #[error("completion queue is shut down")]
    CompletionQueueShutdown = 15,
}

impl CallError {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Interprets an engine result code. Zero is success; unrecognised
    /// non-zero codes become [`CallError::Error`].
    pub fn check(code: i32) -> Result<(), CallError> {
        let err = match code {
            0 => return Ok(()),
            2 => CallError::NotOnServer,
            3 => CallError::NotOnClient,
            4 => CallError::AlreadyAccepted,
            5 => CallError::AlreadyInvoked,
            6 => CallError::NotInvoked,
            7 => CallError::AlreadyFinished,
            8 => CallError::TooManyOperations,
            9 => CallError::InvalidFlags,
            10 => CallError::InvalidMetadata,
            11 => CallError::InvalidMessage,
            12 => CallError::NotServerCompletionQueue,
            13 => CallError::BatchTooBig,
            14 => CallError::PayloadTypeMismatch,
            15 => CallError::CompletionQueueShutdown,
            _ => CallError::Error,
        };
        Err(err)
    }
}

/// Flattens a submission result into the engine's integer code.
pub fn call_result_code(res: Result<(), CallError>) -> i32 {
    match res {
        Ok(()) => 0,
        Err(err) => err.code(),
    }
}
