use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::*;

use super::conflict::{find_conflicting_items, Conflict};
use super::hours::is_within_hours;
use super::layout::day_items;

// ── Write validation state machine ───────────────────────────────
//
//   Drafting → ValidatingHours → ValidatingConflicts → Approved
//                    │                   │
//                    └─ AwaitingOverride ┘  (confirm advances, decline → Drafting)
//
// Both policy checks are overridable; nothing ends in Rejected today.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverrideReason {
    OutsideBusinessHours,
    TimeConflict,
}

impl OverrideReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideReason::OutsideBusinessHours => "outside-business-hours",
            OverrideReason::TimeConflict => "time-conflict",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Drafting,
    ValidatingHours,
    ValidatingConflicts,
    AwaitingOverride(OverrideReason),
    Approved,
    Rejected,
}

impl WriteStage {
    /// Stages reachable in one step. Terminal stages have none.
    pub fn successors(self) -> &'static [WriteStage] {
        use OverrideReason::*;
        use WriteStage::*;
        match self {
            Drafting => &[ValidatingHours],
            ValidatingHours => &[ValidatingConflicts, AwaitingOverride(OutsideBusinessHours)],
            ValidatingConflicts => &[Approved, AwaitingOverride(TimeConflict), Rejected],
            AwaitingOverride(OutsideBusinessHours) => &[ValidatingConflicts, Drafting],
            AwaitingOverride(TimeConflict) => &[Approved, Drafting],
            Approved | Rejected => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    pub fn can_advance_to(self, next: WriteStage) -> bool {
        self.successors().contains(&next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteOp {
    Create,
    Edit,
}

/// The appointment as it would be persisted if approved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDraft {
    pub op: WriteOp,
    pub appointment: Appointment,
}

impl BookingDraft {
    pub fn create(appointment: Appointment) -> Self {
        Self {
            op: WriteOp::Create,
            appointment,
        }
    }

    pub fn edit(appointment: Appointment) -> Self {
        Self {
            op: WriteOp::Edit,
            appointment,
        }
    }

    pub fn interval(&self) -> &TimeInterval {
        &self.appointment.interval
    }

    /// An edited appointment must not collide with its own stored version.
    fn excluded_id(&self) -> Option<Ulid> {
        match self.op {
            WriteOp::Create => None,
            WriteOp::Edit => Some(self.appointment.id),
        }
    }
}

/// Everything stored for one day, cancelled appointments included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySnapshot {
    pub appointments: Vec<Appointment>,
    pub blocks: Vec<ScheduleBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOverride {
    draft: BookingDraft,
    reason: OverrideReason,
    conflicts: Vec<Conflict>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Approved(BookingDraft),
    NeedsOverride(PendingOverride),
    /// Not produced by the current policy: every violation is overridable.
    Rejected(BookingDraft),
}

impl Verdict {
    pub fn stage(&self) -> WriteStage {
        match self {
            Verdict::Approved(_) => WriteStage::Approved,
            Verdict::NeedsOverride(p) => WriteStage::AwaitingOverride(p.reason),
            Verdict::Rejected(_) => WriteStage::Rejected,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Approved(_) => "approved",
            Verdict::NeedsOverride(p) => p.reason.as_str(),
            Verdict::Rejected(_) => "rejected",
        }
    }
}

impl PendingOverride {
    pub fn reason(&self) -> OverrideReason {
        self.reason
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    /// The stage a confirmation resumes at.
    pub fn next_stage(&self) -> WriteStage {
        match self.reason {
            OverrideReason::OutsideBusinessHours => WriteStage::ValidatingConflicts,
            OverrideReason::TimeConflict => WriteStage::Approved,
        }
    }

    /// The user accepted the warning. An hours override still has to pass
    /// conflict validation against `snapshot`.
    pub fn confirm(self, snapshot: &DaySnapshot) -> Verdict {
        match self.reason {
            OverrideReason::OutsideBusinessHours => validate_conflicts(self.draft, snapshot),
            OverrideReason::TimeConflict => Verdict::Approved(self.draft),
        }
    }

    /// Where a decline sends the draft.
    pub fn declined_stage(&self) -> WriteStage {
        WriteStage::Drafting
    }

    /// The user backed out; hand the untouched draft back.
    pub fn decline(self) -> BookingDraft {
        self.draft
    }
}

/// Run a draft from `ValidatingHours` as far as it gets without a user decision.
/// `snapshot` must be the stored content of the draft's day.
pub fn validate(draft: BookingDraft, schedule: &WeeklySchedule, snapshot: &DaySnapshot) -> Verdict {
    if !is_within_hours(draft.interval().start, schedule) {
        return Verdict::NeedsOverride(PendingOverride {
            draft,
            reason: OverrideReason::OutsideBusinessHours,
            conflicts: Vec::new(),
        });
    }
    validate_conflicts(draft, snapshot)
}

fn validate_conflicts(draft: BookingDraft, snapshot: &DaySnapshot) -> Verdict {
    let day = draft.interval().day();
    let items = day_items(day, &snapshot.appointments, &snapshot.blocks);
    let conflicts = find_conflicting_items(draft.interval(), &items, draft.excluded_id());
    if conflicts.is_empty() {
        Verdict::Approved(draft)
    } else {
        Verdict::NeedsOverride(PendingOverride {
            draft,
            reason: OverrideReason::TimeConflict,
            conflicts,
        })
    }
}
