use super::common::{build_service, date, submission, time, today};
use crate::lending::domain::{LoanStatus, StaffRole};
use crate::lending::lifecycle::{
    attempt_transition, LoanAction, ScheduleViolation, TransitionError,
};

fn all_actions() -> Vec<LoanAction> {
    vec![
        LoanAction::ScheduleInterview {
            date: today(),
            time: time(10, 0),
        },
        LoanAction::Dismiss,
        LoanAction::Clear,
        LoanAction::Approve,
        LoanAction::Deny,
        LoanAction::Disburse { first_due: None },
        LoanAction::Activate { collector: None },
    ]
}

/// The role each action requires, so completeness failures cannot be
/// mistaken for role failures.
fn required_role(action: &LoanAction) -> StaffRole {
    match action {
        LoanAction::Approve | LoanAction::Deny | LoanAction::Activate { .. } => StaffRole::Manager,
        _ => StaffRole::LoanOfficer,
    }
}

fn allowed(status: LoanStatus, action: &LoanAction) -> bool {
    matches!(
        (status, action),
        (LoanStatus::Applied, LoanAction::ScheduleInterview { .. })
            | (LoanStatus::Applied, LoanAction::Dismiss)
            | (LoanStatus::Pending, LoanAction::Clear)
            | (LoanStatus::Pending, LoanAction::Dismiss)
            | (LoanStatus::Cleared, LoanAction::Approve)
            | (LoanStatus::Cleared, LoanAction::Deny)
            | (LoanStatus::Approved, LoanAction::Disburse { .. })
            | (LoanStatus::Disbursed, LoanAction::Activate { .. })
    )
}

#[test]
fn every_pair_outside_the_table_is_invalid_and_leaves_state_untouched() {
    let (service, _, _, _) = build_service();
    let record = service.submit(submission(), today()).expect("submits");

    for status in LoanStatus::ordered() {
        let mut application = record.clone();
        application.status = status;

        for action in all_actions() {
            if allowed(status, &action) {
                continue;
            }

            match attempt_transition(&application, &action, required_role(&action), today()) {
                Err(TransitionError::InvalidTransition { .. }) => {}
                other => panic!("expected invalid transition for {status:?}/{action:?}, got {other:?}"),
            }
            assert_eq!(application.status, status);
        }
    }
}

#[test]
fn approve_as_loan_officer_is_forbidden() {
    let (service, _, _, _) = build_service();
    let record = service.submit(submission(), today()).expect("submits");
    let mut application = record.clone();
    application.status = LoanStatus::Cleared;

    match attempt_transition(
        &application,
        &LoanAction::Approve,
        StaffRole::LoanOfficer,
        today(),
    ) {
        Err(TransitionError::Forbidden {
            required: "Manager",
            ..
        }) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
    assert_eq!(application.status, LoanStatus::Cleared);
}

#[test]
fn collector_and_head_cannot_drive_the_pipeline() {
    let (service, _, _, _) = build_service();
    let record = service.submit(submission(), today()).expect("submits");

    for role in [StaffRole::Collector, StaffRole::Head] {
        match attempt_transition(&record, &LoanAction::Dismiss, role, today()) {
            Err(TransitionError::Forbidden { .. }) => {}
            other => panic!("expected forbidden for {role:?}, got {other:?}"),
        }
    }
}

#[test]
fn scheduling_an_interview_moves_the_application_to_pending() {
    let (service, _, _, _) = build_service();
    let record = service.submit(submission(), today()).expect("submits");

    let action = LoanAction::ScheduleInterview {
        date: today(),
        time: time(9, 0),
    };
    let updated = attempt_transition(&record, &action, StaffRole::LoanOfficer, today())
        .expect("schedules");

    assert_eq!(updated.status, LoanStatus::Pending);
    assert_eq!(updated.interview_date, Some(today()));
    assert_eq!(updated.interview_time, Some(time(9, 0)));
}

#[test]
fn interview_date_must_not_be_in_the_past() {
    let (service, _, _, _) = build_service();
    let record = service.submit(submission(), today()).expect("submits");

    let action = LoanAction::ScheduleInterview {
        date: today().pred_opt().expect("valid date"),
        time: time(10, 0),
    };
    match attempt_transition(&record, &action, StaffRole::LoanOfficer, today()) {
        Err(TransitionError::InvalidSchedule(ScheduleViolation::DateInPast { .. })) => {}
        other => panic!("expected past-date violation, got {other:?}"),
    }
}

#[test]
fn interview_date_window_closes_seven_days_after_submission() {
    let (service, _, _, _) = build_service();
    let record = service.submit(submission(), today()).expect("submits");

    let last_allowed = LoanAction::ScheduleInterview {
        date: date(2025, 6, 9),
        time: time(10, 0),
    };
    attempt_transition(&record, &last_allowed, StaffRole::LoanOfficer, today())
        .expect("seventh day is inside the window");

    let too_late = LoanAction::ScheduleInterview {
        date: date(2025, 6, 10),
        time: time(10, 0),
    };
    match attempt_transition(&record, &too_late, StaffRole::LoanOfficer, today()) {
        Err(TransitionError::InvalidSchedule(ScheduleViolation::DateBeyondWindow {
            deadline,
            ..
        })) => assert_eq!(deadline, date(2025, 6, 9)),
        other => panic!("expected window violation, got {other:?}"),
    }
}

#[test]
fn interview_time_must_fall_within_office_hours() {
    let (service, _, _, _) = build_service();
    let record = service.submit(submission(), today()).expect("submits");

    for (hour, minute, ok) in [(8, 59, false), (9, 0, true), (18, 0, true), (18, 1, false)] {
        let action = LoanAction::ScheduleInterview {
            date: today(),
            time: time(hour, minute),
        };
        let result = attempt_transition(&record, &action, StaffRole::LoanOfficer, today());
        if ok {
            result.expect("time inside office hours");
        } else {
            match result {
                Err(TransitionError::InvalidSchedule(
                    ScheduleViolation::OutsideOfficeHours { .. },
                )) => {}
                other => panic!("expected office-hours violation at {hour}:{minute:02}, got {other:?}"),
            }
        }
    }
}

#[test]
fn dismiss_lands_in_the_right_terminal_state_per_origin() {
    let (service, _, _, _) = build_service();
    let record = service.submit(submission(), today()).expect("submits");

    let denied = attempt_transition(&record, &LoanAction::Dismiss, StaffRole::LoanOfficer, today())
        .expect("dismiss from applied");
    assert_eq!(denied.status, LoanStatus::Denied);

    let mut pending = record.clone();
    pending.status = LoanStatus::Pending;
    let denied_by_officer =
        attempt_transition(&pending, &LoanAction::Dismiss, StaffRole::LoanOfficer, today())
            .expect("dismiss from pending");
    assert_eq!(denied_by_officer.status, LoanStatus::DeniedByOfficer);
    assert_eq!(denied_by_officer.status.label(), "Denied by LO");
}

#[test]
fn activation_records_the_assigned_collector() {
    let (service, _, _, _) = build_service();
    let record = service.submit(submission(), today()).expect("submits");
    let mut disbursed = record.clone();
    disbursed.status = LoanStatus::Disbursed;

    let action = LoanAction::Activate {
        collector: Some("collector-7".to_string()),
    };
    let active = attempt_transition(&disbursed, &action, StaffRole::Manager, today())
        .expect("activates");

    assert_eq!(active.status, LoanStatus::Active);
    assert_eq!(active.assigned_collector.as_deref(), Some("collector-7"));
}
