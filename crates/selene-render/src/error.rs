//! Error types for device access, staging, and uploads.

/// A graphics device operation failed. Always fatal to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    /// The device refused to create a buffer.
    #[error("failed to allocate {size} bytes for buffer '{label}': {reason}")]
    Allocation {
        label: String,
        size: u64,
        reason: String,
    },

    /// A host write fell outside the mapped staging range.
    #[error("staging write of {len} bytes at offset {offset} exceeds buffer size {size}")]
    WriteOutOfBounds { offset: u64, len: u64, size: u64 },

    /// Mapped ranges must start on an 8-byte boundary and span a multiple of 4 bytes.
    #[error("staging write of {len} bytes at offset {offset} is misaligned")]
    Misaligned { offset: u64, len: u64 },

    /// Waiting on a submission failed; the device is gone.
    #[error("device lost while waiting for fence {fence}: {reason}")]
    Lost { fence: u64, reason: String },
}

/// Misuse or exhaustion of a [`StagingArena`](crate::StagingArena).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StagingError {
    /// A write would run past the end of the arena.
    #[error("staging arena overflow: {requested} bytes at offset {offset} exceeds capacity {capacity}")]
    CapacityExceeded {
        requested: u64,
        offset: u64,
        capacity: u64,
    },

    /// `write` or `end_batch` without an open batch.
    #[error("no staging batch is open")]
    NotOpen,

    /// `begin_batch` while a batch is already open.
    #[error("a staging batch is already open")]
    AlreadyOpen,

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Failure while moving a mesh onto the device.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Staging(#[from] StagingError),
}
