use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationId, LoanApplication, LoanStatus};
use super::ledger::CollectionPeriod;

/// Persistence boundary for loan applications.
///
/// `update` is a compare-and-set on the record's status: implementations must
/// reject the write with `Conflict` when the stored status no longer matches
/// `expected`, which is how concurrent lifecycle transitions on one record
/// are serialized.
pub trait ApplicationStore: Send + Sync {
    fn insert(&self, application: LoanApplication) -> Result<LoanApplication, StoreError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplication>, StoreError>;
    fn update(
        &self,
        application: LoanApplication,
        expected: LoanStatus,
    ) -> Result<(), StoreError>;
    fn list_by_status(&self, status: LoanStatus) -> Result<Vec<LoanApplication>, StoreError>;
    fn list_by_collector(&self, collector: &str) -> Result<Vec<LoanApplication>, StoreError>;
}

/// Persistence boundary for collection periods.
///
/// `update` is a compare-and-set on `paid_amount` so two concurrent payments
/// against one period cannot lose an update; payments on different periods
/// are independent. `remove_for_loan` exists solely so a failed disbursement
/// can undo a partially persisted schedule.
pub trait PeriodStore: Send + Sync {
    fn insert_all(&self, periods: Vec<CollectionPeriod>) -> Result<(), StoreError>;
    fn fetch(&self, reference: &str) -> Result<Option<CollectionPeriod>, StoreError>;
    fn update(&self, period: CollectionPeriod, expected_paid: f64) -> Result<(), StoreError>;
    fn list_for_loan(&self, loan_id: &ApplicationId) -> Result<Vec<CollectionPeriod>, StoreError>;
    fn remove_for_loan(&self, loan_id: &ApplicationId) -> Result<(), StoreError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for the credentials-ready event raised on activation.
/// Delivery failure must never roll back the activation itself.
pub trait CredentialsNotifier: Send + Sync {
    fn notify(&self, event: CredentialsReady) -> Result<(), NotifyError>;
}

/// Payload handed to the external email/SMS sender once a loan goes active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsReady {
    pub application_id: ApplicationId,
    pub username: String,
    pub temporary_password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized application payload for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub category: &'static str,
    pub requested_principal: f64,
    pub term_months: u32,
    pub interest_rate_percent: f64,
    pub total_payable: f64,
    pub installment_amount: f64,
    pub net_released: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_collector: Option<String>,
}

impl LoanApplication {
    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.application_id.clone(),
            status: self.status.label(),
            category: self.request.category.label(),
            requested_principal: self.request.requested_principal,
            term_months: self.terms.term_months,
            interest_rate_percent: self.terms.interest_rate_percent,
            total_payable: self.terms.total_payable,
            installment_amount: self.terms.installment_amount,
            net_released: self.terms.net_released,
            interview_date: self.interview_date,
            interview_time: self.interview_time,
            assigned_collector: self.assigned_collector.clone(),
        }
    }
}

/// One period with its status derived as of the listing date.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodView {
    pub reference_number: String,
    pub due_date: NaiveDate,
    pub period_amount: f64,
    pub paid_amount: f64,
    pub period_balance: f64,
    pub loan_balance: f64,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CollectionPeriod {
    pub fn view(&self, today: NaiveDate) -> PeriodView {
        PeriodView {
            reference_number: self.reference_number.clone(),
            due_date: self.due_date,
            period_amount: self.period_amount,
            paid_amount: self.paid_amount,
            period_balance: self.period_balance(),
            loan_balance: self.loan_balance,
            status: self.status(today).label(),
            note: self.note.clone(),
        }
    }
}

/// Whole-loan repayment picture for the query surface.
#[derive(Debug, Clone, Serialize)]
pub struct LoanSummaryView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub total_paid: f64,
    pub outstanding_balance: f64,
    pub periods: Vec<PeriodView>,
}

/// Process-local application store used by the dev server and tests.
#[derive(Default, Clone)]
pub struct MemoryApplicationStore {
    records: Arc<Mutex<HashMap<ApplicationId, LoanApplication>>>,
}

impl ApplicationStore for MemoryApplicationStore {
    fn insert(&self, application: LoanApplication) -> Result<LoanApplication, StoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("application store poisoned".to_string()))?;
        if guard.contains_key(&application.application_id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(application.application_id.clone(), application.clone());
        Ok(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplication>, StoreError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("application store poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    fn update(
        &self,
        application: LoanApplication,
        expected: LoanStatus,
    ) -> Result<(), StoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("application store poisoned".to_string()))?;
        let current = guard
            .get(&application.application_id)
            .ok_or(StoreError::NotFound)?;
        if current.status != expected {
            return Err(StoreError::Conflict);
        }
        guard.insert(application.application_id.clone(), application);
        Ok(())
    }

    fn list_by_status(&self, status: LoanStatus) -> Result<Vec<LoanApplication>, StoreError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("application store poisoned".to_string()))?;
        let mut matches: Vec<LoanApplication> = guard
            .values()
            .filter(|application| application.status == status)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.application_id.0.cmp(&b.application_id.0));
        Ok(matches)
    }

    fn list_by_collector(&self, collector: &str) -> Result<Vec<LoanApplication>, StoreError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("application store poisoned".to_string()))?;
        let mut matches: Vec<LoanApplication> = guard
            .values()
            .filter(|application| application.assigned_collector.as_deref() == Some(collector))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.application_id.0.cmp(&b.application_id.0));
        Ok(matches)
    }
}

/// Process-local period store used by the dev server and tests.
#[derive(Default, Clone)]
pub struct MemoryPeriodStore {
    periods: Arc<Mutex<HashMap<String, CollectionPeriod>>>,
}

impl PeriodStore for MemoryPeriodStore {
    fn insert_all(&self, periods: Vec<CollectionPeriod>) -> Result<(), StoreError> {
        let mut guard = self
            .periods
            .lock()
            .map_err(|_| StoreError::Unavailable("period store poisoned".to_string()))?;
        if periods
            .iter()
            .any(|period| guard.contains_key(&period.reference_number))
        {
            return Err(StoreError::Conflict);
        }
        for period in periods {
            guard.insert(period.reference_number.clone(), period);
        }
        Ok(())
    }

    fn fetch(&self, reference: &str) -> Result<Option<CollectionPeriod>, StoreError> {
        let guard = self
            .periods
            .lock()
            .map_err(|_| StoreError::Unavailable("period store poisoned".to_string()))?;
        Ok(guard.get(reference).cloned())
    }

    fn update(&self, period: CollectionPeriod, expected_paid: f64) -> Result<(), StoreError> {
        let mut guard = self
            .periods
            .lock()
            .map_err(|_| StoreError::Unavailable("period store poisoned".to_string()))?;
        let current = guard
            .get(&period.reference_number)
            .ok_or(StoreError::NotFound)?;
        if current.paid_amount != expected_paid {
            return Err(StoreError::Conflict);
        }
        guard.insert(period.reference_number.clone(), period);
        Ok(())
    }

    fn list_for_loan(&self, loan_id: &ApplicationId) -> Result<Vec<CollectionPeriod>, StoreError> {
        let guard = self
            .periods
            .lock()
            .map_err(|_| StoreError::Unavailable("period store poisoned".to_string()))?;
        let mut matches: Vec<CollectionPeriod> = guard
            .values()
            .filter(|period| &period.loan_id == loan_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.reference_number.cmp(&b.reference_number));
        Ok(matches)
    }

    fn remove_for_loan(&self, loan_id: &ApplicationId) -> Result<(), StoreError> {
        let mut guard = self
            .periods
            .lock()
            .map_err(|_| StoreError::Unavailable("period store poisoned".to_string()))?;
        guard.retain(|_, period| &period.loan_id != loan_id);
        Ok(())
    }
}

/// Notifier that only logs, for environments without a wired sender.
#[derive(Default, Clone)]
pub struct LoggingNotifier;

impl CredentialsNotifier for LoggingNotifier {
    fn notify(&self, event: CredentialsReady) -> Result<(), NotifyError> {
        tracing::info!(
            application_id = %event.application_id.0,
            username = %event.username,
            "credentials ready for dispatch"
        );
        Ok(())
    }
}
