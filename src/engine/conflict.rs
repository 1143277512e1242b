use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::EngineError;

/// An existing item the candidate would collide with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub item_id: Ulid,
    pub kind: ItemKind,
    pub interval: TimeInterval,
}

/// Every interval in `existing` that overlaps `candidate` (open-interval rule).
/// Status filtering is the caller's job.
pub fn find_conflicts(candidate: &TimeInterval, existing: &[TimeInterval]) -> Vec<TimeInterval> {
    existing
        .iter()
        .filter(|other| candidate.overlaps(other))
        .copied()
        .collect()
}

/// Same as [`find_conflicts`] but keeps item identity. `exclude` skips the
/// item being edited so it never conflicts with its own stored version.
pub fn find_conflicting_items(
    candidate: &TimeInterval,
    items: &[LayoutItem],
    exclude: Option<Ulid>,
) -> Vec<Conflict> {
    items
        .iter()
        .filter(|item| Some(item.id) != exclude)
        .filter(|item| candidate.overlaps(&item.interval))
        .map(|item| Conflict {
            item_id: item.id,
            kind: item.kind,
            interval: item.interval,
        })
        .collect()
}

pub(crate) fn validate_interval(interval: &TimeInterval) -> Result<(), EngineError> {
    if interval.duration_minutes == 0 {
        return Err(EngineError::InvalidInput("duration must be positive"));
    }
    if interval.duration_minutes as i64 > MAX_DURATION_MINUTES {
        return Err(EngineError::LimitExceeded("duration longer than a day"));
    }
    Ok(())
}

pub(crate) fn validate_block(block: &ScheduleBlock) -> Result<(), EngineError> {
    validate_interval(&block.interval)?;
    if block.reason.len() > MAX_REASON_LEN {
        return Err(EngineError::LimitExceeded("block reason too long"));
    }
    Ok(())
}
