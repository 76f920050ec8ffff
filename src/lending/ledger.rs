use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationId, LoanApplication};

/// Repayment state of a single collection period.
///
/// Never persisted: derived from `period_balance`, `paid_amount`, and the
/// evaluation date on every read, so `Overdue` cannot go stale against the
/// wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Unpaid,
    Partial,
    Paid,
    Overdue,
}

impl PeriodStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unpaid => "Unpaid",
            Self::Partial => "Partial",
            Self::Paid => "Paid",
            Self::Overdue => "Overdue",
        }
    }
}

/// One scheduled installment of an active loan.
///
/// Holds only a non-owning back-reference to the originating application;
/// the `reference_number` is the natural key and stays stable for the life
/// of the period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPeriod {
    pub loan_id: ApplicationId,
    pub reference_number: String,
    pub due_date: NaiveDate,
    pub period_amount: f64,
    pub paid_amount: f64,
    /// Outstanding amount across the whole loan as of the last posting that
    /// touched this period.
    pub loan_balance: f64,
    pub note: Option<String>,
}

impl CollectionPeriod {
    pub fn period_balance(&self) -> f64 {
        self.period_amount - self.paid_amount
    }

    /// Derive the repayment status as of `today`.
    pub fn status(&self, today: NaiveDate) -> PeriodStatus {
        if self.period_balance() <= 0.0 {
            PeriodStatus::Paid
        } else if self.due_date < today {
            PeriodStatus::Overdue
        } else if self.paid_amount > 0.0 {
            PeriodStatus::Partial
        } else {
            PeriodStatus::Unpaid
        }
    }
}

/// Build the full repayment schedule for a disbursed loan.
///
/// Produces `term_months` consecutive monthly periods starting at
/// `first_due`, each owing the installment amount, with reference numbers
/// derived from the application id.
pub fn generate_schedule(
    application: &LoanApplication,
    first_due: NaiveDate,
) -> Vec<CollectionPeriod> {
    let terms = &application.terms;
    (0..terms.term_months)
        .map(|index| CollectionPeriod {
            loan_id: application.application_id.clone(),
            reference_number: reference_number(&application.application_id, index + 1),
            due_date: first_due
                .checked_add_months(Months::new(index))
                .unwrap_or(first_due),
            period_amount: terms.installment_amount,
            paid_amount: 0.0,
            loan_balance: terms.total_payable,
            note: None,
        })
        .collect()
}

fn reference_number(loan_id: &ApplicationId, sequence: u32) -> String {
    format!("{}-{:02}", loan_id.0, sequence)
}

/// Credit a payment against a period.
///
/// Any positive amount is accepted; an overpayment stays on this period as a
/// negative balance rather than rolling forward. The caller recomputes the
/// loan-level balance across all periods afterwards.
pub fn apply_payment(period: &mut CollectionPeriod, amount: f64) -> Result<(), LedgerError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::NonPositiveAmount(amount));
    }

    period.paid_amount += amount;
    Ok(())
}

/// Outstanding amount across a loan's periods, floored at zero per period so
/// an overpayment on one period does not mask arrears on another.
pub fn outstanding_balance(periods: &[CollectionPeriod]) -> f64 {
    periods
        .iter()
        .map(|period| period.period_balance().max(0.0))
        .sum()
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LedgerError {
    #[error("payment amount must be a positive finite amount, got {0}")]
    NonPositiveAmount(f64),
}
