//! The crate's error type.
//!
//! Only the **structural**, **resource-shape**, and **sparse-granularity**
//! error kinds of `spec.md` §7 become [`Error`] values. **Identity errors**
//! (unknown handle, missing descriptor tuple, null-handle access) are
//! recovered locally by the handler that hits them — they are logged as
//! [`crate::recorder::Diagnostic`]s and the access is simply skipped, never
//! propagated as a `Result::Err`.

use thiserror::Error;

use crate::variable::RawHandle;

#[derive(Error, Debug)]
pub enum Error {
    /// An executed subcommand index arrived with a length other than 4 or 6.
    #[error("invalid executed-subcommand index length {0} (expected 4 or 6)")]
    InvalidSubcommandIndexLength(usize),
    /// The front of the pending-submitted-commands queue did not match the
    /// next executed index reported by the framework.
    #[error("roll-out ordering mismatch: expected subcommand {expected:?}, framework reported {actual:?}")]
    RollOutOrderingMismatch {
        expected: crate::behavior::SubcommandIndex,
        actual: crate::behavior::SubcommandIndex,
    },
    /// Tried to shrink a resource binding whose backing is not a memory
    /// span to a sub-range that does not cover it exactly.
    #[error("cannot shrink a label-backed resource binding to a partial range")]
    PartialLabelBackedBinding,
    /// Two resource bindings on the same buffer/image overlap.
    #[error("overlapping resource binding on {0:?} at offset {1}")]
    OverlappingBinding(RawHandle, u64),
    /// Could not infer an image's size because it was never created (or its
    /// wrapper was already destroyed).
    #[error("no resource state recorded for image {0:?}")]
    UnknownImage(RawHandle),
    /// Sparse image block granularity was not found for the requested
    /// aspect.
    #[error("no sparse block granularity for aspect {0:?} of image {1:?}")]
    UnknownSparseGranularity(ash::vk::ImageAspectFlags, RawHandle),
    /// A queue-submit rollout was asked to process a submit that was never
    /// registered by `VkQueueSubmit`.
    #[error("no queue submit registered for submit id {0}")]
    UnknownSubmit(u64),
}

pub type Result<T> = std::result::Result<T, Error>;
