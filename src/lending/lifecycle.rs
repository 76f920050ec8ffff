use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::domain::{LoanApplication, LoanStatus, StaffRole};

/// Staff actions that drive an application through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoanAction {
    /// Record the interview slot and move the application to `Pending`.
    ScheduleInterview { date: NaiveDate, time: NaiveTime },
    /// Reject outright: `Denied` from `Applied`, `Denied by LO` from `Pending`.
    Dismiss,
    /// Officer marks the interviewed applicant as cleared for approval.
    Clear,
    Approve,
    Deny,
    /// Release funds; the service generates the collection schedule starting
    /// at `first_due` (default one month after disbursement).
    Disburse { first_due: Option<NaiveDate> },
    /// Open the borrower account and hand the loan to collections.
    Activate { collector: Option<String> },
}

impl LoanAction {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ScheduleInterview { .. } => "schedule interview",
            Self::Dismiss => "dismiss",
            Self::Clear => "clear",
            Self::Approve => "approve",
            Self::Deny => "deny",
            Self::Disburse { .. } => "disburse",
            Self::Activate { .. } => "activate",
        }
    }
}

/// Rejections raised by the state machine. State is never mutated on failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {action} an application in status {status}")]
    InvalidTransition {
        status: &'static str,
        action: &'static str,
    },
    #[error("{action} requires the {required} role, acting role is {actor}")]
    Forbidden {
        action: &'static str,
        required: &'static str,
        actor: &'static str,
    },
    #[error(transparent)]
    InvalidSchedule(#[from] ScheduleViolation),
}

/// Interview slots must fall inside the intake window and office hours.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScheduleViolation {
    #[error("interview date {date} is before today ({today})")]
    DateInPast { date: NaiveDate, today: NaiveDate },
    #[error("interview date {date} is past the window ending {deadline}")]
    DateBeyondWindow {
        date: NaiveDate,
        deadline: NaiveDate,
    },
    #[error("interview time {time} is outside office hours 09:00-18:00")]
    OutsideOfficeHours { time: NaiveTime },
}

/// Number of days after submission during which an interview may be booked.
const INTERVIEW_WINDOW_DAYS: i64 = 7;

/// Office hours in seconds from midnight, bounds inclusive.
const OFFICE_OPEN_SECS: u32 = 9 * 3600;
const OFFICE_CLOSE_SECS: u32 = 18 * 3600;

/// Validate and apply one lifecycle transition.
///
/// The check order fixes error precedence: an action that does not exist for
/// the current status is `InvalidTransition` regardless of the actor, a known
/// action with the wrong actor is `Forbidden`, and only then are the action's
/// own arguments (the interview slot) validated. On success the returned
/// record carries the new status; the input is never mutated, so callers can
/// persist with a compare-and-set against the old status.
pub fn attempt_transition(
    application: &LoanApplication,
    action: &LoanAction,
    actor: StaffRole,
    today: NaiveDate,
) -> Result<LoanApplication, TransitionError> {
    let (required, next) = transition_row(application.status, action).ok_or(
        TransitionError::InvalidTransition {
            status: application.status.label(),
            action: action.label(),
        },
    )?;

    if actor != required {
        return Err(TransitionError::Forbidden {
            action: action.label(),
            required: required.label(),
            actor: actor.label(),
        });
    }

    let mut updated = application.clone();
    match action {
        LoanAction::ScheduleInterview { date, time } => {
            validate_interview_slot(*date, *time, application.submitted_on, today)?;
            updated.interview_date = Some(*date);
            updated.interview_time = Some(*time);
        }
        LoanAction::Activate { collector } => {
            if collector.is_some() {
                updated.assigned_collector = collector.clone();
            }
        }
        _ => {}
    }

    updated.status = next;
    Ok(updated)
}

/// The transition table: (status, action) -> (required role, next status).
fn transition_row(status: LoanStatus, action: &LoanAction) -> Option<(StaffRole, LoanStatus)> {
    use LoanAction::*;
    use LoanStatus::*;
    use StaffRole::{LoanOfficer, Manager};

    match (status, action) {
        (Applied, ScheduleInterview { .. }) => Some((LoanOfficer, Pending)),
        (Applied, Dismiss) => Some((LoanOfficer, Denied)),
        (Pending, Clear) => Some((LoanOfficer, Cleared)),
        (Pending, Dismiss) => Some((LoanOfficer, DeniedByOfficer)),
        (Cleared, Approve) => Some((Manager, Approved)),
        (Cleared, Deny) => Some((Manager, Denied)),
        (Approved, Disburse { .. }) => Some((LoanOfficer, Disbursed)),
        (Disbursed, Activate { .. }) => Some((Manager, Active)),
        _ => None,
    }
}

fn validate_interview_slot(
    date: NaiveDate,
    time: NaiveTime,
    submitted_on: NaiveDate,
    today: NaiveDate,
) -> Result<(), ScheduleViolation> {
    if date < today {
        return Err(ScheduleViolation::DateInPast { date, today });
    }

    let deadline = submitted_on + Duration::days(INTERVIEW_WINDOW_DAYS);
    if date > deadline {
        return Err(ScheduleViolation::DateBeyondWindow { date, deadline });
    }

    let seconds = time.num_seconds_from_midnight();
    if !(OFFICE_OPEN_SECS..=OFFICE_CLOSE_SECS).contains(&seconds) {
        return Err(ScheduleViolation::OutsideOfficeHours { time });
    }

    Ok(())
}
