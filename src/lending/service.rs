use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Months, NaiveDate};

use super::domain::{ApplicationId, LoanApplication, LoanStatus, StaffRole};
use super::intake::{self, LoanSubmission, ValidationError};
use super::ledger::{
    apply_payment, generate_schedule, outstanding_balance, CollectionPeriod, LedgerError,
};
use super::lifecycle::{attempt_transition, LoanAction, TransitionError};
use super::pricing::{PricingEngine, PricingError};
use super::repository::{
    ApplicationStore, CredentialsNotifier, CredentialsReady, LoanSummaryView, PeriodStore,
    PeriodView, StoreError,
};

/// Service composing intake validation, the pricing engine, the lifecycle
/// state machine, and the collections ledger over the storage traits.
pub struct LoanService<S, P, N> {
    applications: Arc<S>,
    periods: Arc<P>,
    notifier: Arc<N>,
    pricing: Arc<PricingEngine>,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PASSWORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("ln-{id:06}"))
}

impl<S, P, N> LoanService<S, P, N>
where
    S: ApplicationStore + 'static,
    P: PeriodStore + 'static,
    N: CredentialsNotifier + 'static,
{
    pub fn new(
        applications: Arc<S>,
        periods: Arc<P>,
        notifier: Arc<N>,
        pricing: PricingEngine,
    ) -> Self {
        Self {
            applications,
            periods,
            notifier,
            pricing: Arc::new(pricing),
        }
    }

    /// Validate and price a submission, then persist the new `Applied` record.
    pub fn submit(
        &self,
        submission: LoanSubmission,
        today: NaiveDate,
    ) -> Result<LoanApplication, LendingError> {
        intake::validate(&submission)?;

        let terms = self
            .pricing
            .quote(submission.category, submission.requested_principal)?;

        let application =
            intake::build_application(next_application_id(), submission, terms, today);
        let stored = self.applications.insert(application)?;
        Ok(stored)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<LoanApplication, LendingError> {
        self.applications
            .fetch(id)?
            .ok_or_else(|| LendingError::ApplicationNotFound(id.0.clone()))
    }

    /// Apply one lifecycle transition on behalf of `actor`.
    ///
    /// Persistence is a compare-and-set against the status the transition was
    /// validated from, so a request racing another transition fails as
    /// `InvalidTransition` instead of overwriting. `disburse` persists the
    /// collection schedule first and undoes it if the status write loses the
    /// race; `activate` emits the credentials event only after the write
    /// committed, and a failed dispatch is logged, never rolled back.
    pub fn transition(
        &self,
        id: &ApplicationId,
        action: &LoanAction,
        actor: StaffRole,
        today: NaiveDate,
    ) -> Result<LoanApplication, LendingError> {
        let current = self.get(id)?;
        let expected = current.status;
        let updated = attempt_transition(&current, action, actor, today)?;

        if let LoanAction::Disburse { first_due } = action {
            let first_due = (*first_due).unwrap_or_else(|| {
                today
                    .checked_add_months(Months::new(1))
                    .unwrap_or(today)
            });
            let schedule = generate_schedule(&updated, first_due);
            self.periods.insert_all(schedule)?;

            if let Err(err) = self.applications.update(updated.clone(), expected) {
                if let Err(cleanup) = self.periods.remove_for_loan(id) {
                    tracing::error!(
                        application_id = %id.0,
                        error = %cleanup,
                        "failed to undo schedule after aborted disbursement"
                    );
                }
                return Err(self.map_update_failure(id, action, err));
            }

            return Ok(updated);
        }

        self.applications
            .update(updated.clone(), expected)
            .map_err(|err| self.map_update_failure(id, action, err))?;

        if matches!(action, LoanAction::Activate { .. }) {
            let event = issue_credentials(&updated);
            if let Err(err) = self.notifier.notify(event) {
                tracing::warn!(
                    application_id = %id.0,
                    error = %err,
                    "credentials notification failed after activation"
                );
            }
        }

        Ok(updated)
    }

    /// Replace the requested principal and atomically re-derive every
    /// computed field. Only permitted while the application is still being
    /// assessed; priced terms are frozen from approval onwards.
    pub fn reprice(
        &self,
        id: &ApplicationId,
        new_principal: f64,
    ) -> Result<LoanApplication, LendingError> {
        let mut application = self.get(id)?;

        if !matches!(
            application.status,
            LoanStatus::Applied | LoanStatus::Pending | LoanStatus::Cleared
        ) {
            return Err(LendingError::RepriceNotAllowed(application.status.label()));
        }

        let terms = self
            .pricing
            .quote(application.request.category, new_principal)?;

        let expected = application.status;
        application.request.requested_principal = new_principal;
        application.terms = terms;
        self.applications.update(application.clone(), expected)?;
        Ok(application)
    }

    /// Credit a payment against one period and refresh the loan balance.
    pub fn post_payment(
        &self,
        reference: &str,
        amount: f64,
    ) -> Result<CollectionPeriod, LendingError> {
        let mut period = self
            .periods
            .fetch(reference)?
            .ok_or_else(|| LendingError::PeriodNotFound(reference.to_string()))?;

        let expected_paid = period.paid_amount;
        apply_payment(&mut period, amount)?;

        let mut all = self.periods.list_for_loan(&period.loan_id)?;
        for sibling in &mut all {
            if sibling.reference_number == period.reference_number {
                sibling.paid_amount = period.paid_amount;
            }
        }
        period.loan_balance = outstanding_balance(&all);

        self.periods.update(period.clone(), expected_paid)?;
        Ok(period)
    }

    /// Attach or replace the collector's note on a period. Metadata only.
    pub fn set_note(
        &self,
        reference: &str,
        note: Option<String>,
    ) -> Result<CollectionPeriod, LendingError> {
        let mut period = self
            .periods
            .fetch(reference)?
            .ok_or_else(|| LendingError::PeriodNotFound(reference.to_string()))?;

        let expected_paid = period.paid_amount;
        period.note = note;
        self.periods.update(period.clone(), expected_paid)?;
        Ok(period)
    }

    pub fn period(&self, reference: &str) -> Result<CollectionPeriod, LendingError> {
        self.periods
            .fetch(reference)?
            .ok_or_else(|| LendingError::PeriodNotFound(reference.to_string()))
    }

    /// Whole-loan repayment picture with statuses derived as of `today`.
    pub fn loan_summary(
        &self,
        id: &ApplicationId,
        today: NaiveDate,
    ) -> Result<LoanSummaryView, LendingError> {
        let application = self.get(id)?;
        let periods = self.periods.list_for_loan(id)?;

        let total_paid = periods.iter().map(|period| period.paid_amount).sum();
        let outstanding = outstanding_balance(&periods);

        Ok(LoanSummaryView {
            application_id: application.application_id.clone(),
            status: application.status.label(),
            total_paid,
            outstanding_balance: outstanding,
            periods: periods.iter().map(|period| period.view(today)).collect(),
        })
    }

    pub fn applications_by_status(
        &self,
        status: LoanStatus,
    ) -> Result<Vec<LoanApplication>, LendingError> {
        Ok(self.applications.list_by_status(status)?)
    }

    /// Periods across every loan assigned to a collector, statuses derived
    /// as of `today`.
    pub fn periods_for_collector(
        &self,
        collector: &str,
        today: NaiveDate,
    ) -> Result<Vec<PeriodView>, LendingError> {
        let mut views = Vec::new();
        for application in self.applications.list_by_collector(collector)? {
            let periods = self.periods.list_for_loan(&application.application_id)?;
            views.extend(periods.iter().map(|period| period.view(today)));
        }
        Ok(views)
    }

    fn map_update_failure(
        &self,
        id: &ApplicationId,
        action: &LoanAction,
        err: StoreError,
    ) -> LendingError {
        match err {
            // The stored status moved under us: the transition was validated
            // against a stale snapshot.
            StoreError::Conflict => {
                let status = self
                    .applications
                    .fetch(id)
                    .ok()
                    .flatten()
                    .map(|application| application.status.label())
                    .unwrap_or("unknown");
                LendingError::Transition(TransitionError::InvalidTransition {
                    status,
                    action: action.label(),
                })
            }
            other => LendingError::Store(other),
        }
    }
}

fn issue_credentials(application: &LoanApplication) -> CredentialsReady {
    let digits: String = application
        .application_id
        .0
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let first_name = application
        .applicant
        .full_name
        .split_whitespace()
        .next()
        .unwrap_or("borrower")
        .to_lowercase();

    let sequence = PASSWORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);

    CredentialsReady {
        application_id: application.application_id.clone(),
        username: format!("{first_name}.{digits}"),
        temporary_password: format!("tmp-{digits}-{sequence:04}"),
    }
}

/// Error raised by the loan service.
#[derive(Debug, thiserror::Error)]
pub enum LendingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("application {0} not found")]
    ApplicationNotFound(String),
    #[error("collection period {0} not found")]
    PeriodNotFound(String),
    #[error("principal can only be edited before approval, current status is {0}")]
    RepriceNotAllowed(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}
