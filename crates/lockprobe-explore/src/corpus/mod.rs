pub mod dedup;
pub mod queue;

use std::path::Path;

pub use dedup::DuplicateFilter;
pub use queue::{Queue, QueueEntry, QueueError};

/// Load a persisted queue and rebuild the tested-set from its sequences,
/// so a resumed session never re-tests an input from a prior one.
pub fn load_resume(path: &Path) -> Result<(Queue, DuplicateFilter), QueueError> {
    let queue = Queue::load(path)?;
    let tested = DuplicateFilter::from_queue(&queue);
    Ok((queue, tested))
}
