use crate::Field;
use thiserror::Error;

/// Errors returned by the store, the indicator layer and the engine.
///
/// Every variant except `CapacityInvalid` and `Config` is a per-call failure: the
/// call that returned it left the store and every indicator untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HqError {
    #[error("capacity must be a positive integer")]
    CapacityInvalid,

    #[error("amend_last called on an empty buffer")]
    EmptyBufferAmend,

    #[error("logical index {index} out of range (len {len})")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("unknown indicator id {0}")]
    UnknownIndicatorId(u32),

    #[error("unknown indicator name `{0}`")]
    UnknownIndicatorName(String),

    #[error("indicator `{0}` is already registered")]
    DuplicateIndicator(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("timestamp {got} is older than the previous bar ({last})")]
    OutOfOrder { last: i64, got: i64 },

    #[error("field `{field}` is not a finite number")]
    NonFinite { field: Field },

    #[error("config: {0}")]
    Config(String),
}

impl HqError {
    pub(crate) fn out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            index: index as i64,
            len,
        }
    }

    /// Status code used at the C boundary.
    pub fn status(&self) -> HqStatus {
        match self {
            HqError::CapacityInvalid => HqStatus::CapacityInvalid,
            HqError::EmptyBufferAmend => HqStatus::EmptyBufferAmend,
            HqError::IndexOutOfRange { .. } => HqStatus::IndexOutOfRange,
            HqError::UnknownIndicatorId(_) | HqError::UnknownIndicatorName(_) => {
                HqStatus::UnknownIndicatorId
            }
            HqError::DuplicateIndicator(_) => HqStatus::DuplicateIndicator,
            HqError::InvalidParameter(_) | HqError::Config(_) => HqStatus::InvalidParameter,
            HqError::OutOfOrder { .. } => HqStatus::OutOfOrder,
            HqError::NonFinite { .. } => HqStatus::NonFinite,
        }
    }
}

impl From<serde_json::Error> for HqError {
    fn from(e: serde_json::Error) -> Self {
        HqError::Config(e.to_string())
    }
}

pub type Result<T, E = HqError> = core::result::Result<T, E>;

/// FFI-friendly status code. `Ok` is zero; everything else is a typed failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum HqStatus {
    Ok = 0,
    CapacityInvalid = 1,
    EmptyBufferAmend = 2,
    IndexOutOfRange = 3,
    UnknownIndicatorId = 4,
    DuplicateIndicator = 5,
    InvalidParameter = 6,
    OutOfOrder = 7,
    NonFinite = 8,
    NullPointer = 9,
    InvalidUtf8 = 10,
    Panic = 11,
}

impl HqStatus {
    pub const ALL: [HqStatus; 12] = [
        HqStatus::Ok,
        HqStatus::CapacityInvalid,
        HqStatus::EmptyBufferAmend,
        HqStatus::IndexOutOfRange,
        HqStatus::UnknownIndicatorId,
        HqStatus::DuplicateIndicator,
        HqStatus::InvalidParameter,
        HqStatus::OutOfOrder,
        HqStatus::NonFinite,
        HqStatus::NullPointer,
        HqStatus::InvalidUtf8,
        HqStatus::Panic,
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| *s as i32 == code)
    }

    pub fn message(&self) -> &'static str {
        let raw = self.message_with_nul();
        &raw[..raw.len() - 1]
    }

    /// Same text as [`HqStatus::message`], NUL-terminated for C callers.
    pub(crate) fn message_with_nul(&self) -> &'static str {
        match self {
            HqStatus::Ok => "ok\0",
            HqStatus::CapacityInvalid => "capacity must be a positive integer\0",
            HqStatus::EmptyBufferAmend => "amend on empty buffer\0",
            HqStatus::IndexOutOfRange => "logical index out of range\0",
            HqStatus::UnknownIndicatorId => "unknown indicator\0",
            HqStatus::DuplicateIndicator => "indicator name already registered\0",
            HqStatus::InvalidParameter => "invalid parameter\0",
            HqStatus::OutOfOrder => "bar timestamp goes backwards\0",
            HqStatus::NonFinite => "bar field is not finite\0",
            HqStatus::NullPointer => "null pointer\0",
            HqStatus::InvalidUtf8 => "string is not valid utf-8\0",
            HqStatus::Panic => "internal panic\0",
        }
    }
}

impl<T> From<&Result<T>> for HqStatus {
    fn from(r: &Result<T>) -> Self {
        match r {
            Ok(_) => HqStatus::Ok,
            Err(e) => e.status(),
        }
    }
}
