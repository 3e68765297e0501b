use crate::types::{AccScale, AccType, Rank};

pub type Result<T> = std::result::Result<T, StrataError>;

#[derive(Debug, thiserror::Error)]
pub enum StrataError {
    #[error("invalid stride descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("{what} = {value} is not a multiple of {unit}")]
    NotMultiple {
        what: String,
        value: usize,
        unit: usize,
    },

    #[error("strided enumeration produced {actual} blocks, expected {expected}")]
    EnumerationMismatch { expected: usize, actual: usize },

    #[error("local buffer too small: need {required} bytes, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    #[error("invalid transfer type: {0}")]
    InvalidType(String),

    #[error("transfer type used before commit")]
    UncommittedType,

    #[error("scale {scale:?} does not match accumulate type {acc}")]
    ScaleMismatch { acc: AccType, scale: AccScale },

    #[error("invalid shared pointer 0x{addr:x} on rank {rank}")]
    UnregisteredAddress { addr: u64, rank: Rank },

    #[error("invalid rank {rank}: world size is {world_size}")]
    InvalidRank { rank: Rank, world_size: u32 },

    #[error("region on rank {rank} accessed without holding its lock")]
    NotLocked { rank: Rank },

    #[error("{len} bytes at 0x{addr:x} fall outside the region segment on rank {rank}")]
    OutOfBounds { addr: u64, len: usize, rank: Rank },

    #[error("{op} to rank {rank} failed with status {status}")]
    Backend {
        op: &'static str,
        rank: Rank,
        status: i32,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("transfer task failed: {0}")]
    TaskFailed(String),

    #[error("internal lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StrataError {
    /// Create an `InvalidDescriptor` error.
    pub fn descriptor(msg: impl Into<String>) -> Self {
        Self::InvalidDescriptor(msg.into())
    }

    /// Create a `NotMultiple` error.
    pub(crate) fn not_multiple(what: impl Into<String>, value: usize, unit: usize) -> Self {
        Self::NotMultiple {
            what: what.into(),
            value,
            unit,
        }
    }

    /// True for caller contract violations and internal bugs.
    ///
    /// These are never recoverable at this layer; only `Backend` failures
    /// and ambient runtime errors are not.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidDescriptor(_)
                | Self::NotMultiple { .. }
                | Self::EnumerationMismatch { .. }
                | Self::BufferTooSmall { .. }
                | Self::InvalidType(_)
                | Self::UncommittedType
                | Self::ScaleMismatch { .. }
                | Self::UnregisteredAddress { .. }
                | Self::InvalidRank { .. }
                | Self::NotLocked { .. }
                | Self::OutOfBounds { .. }
        )
    }

    /// Status code in the `0 = success` convention.
    ///
    /// Delegated failures report the collaborator's status verbatim,
    /// everything else reports `-1`.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Backend { status, .. } => *status,
            _ => -1,
        }
    }
}
