use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime};

use crate::lending::domain::{
    ApplicantProfile, ApplicationId, CharacterReference, CollateralOffer, CollateralOwnership,
    IncomeSource, LoanApplication, LoanCategory, LoanStatus, MaritalStatus, StaffRole,
};
use crate::lending::intake::LoanSubmission;
use crate::lending::ledger::CollectionPeriod;
use crate::lending::lifecycle::LoanAction;
use crate::lending::pricing::PricingEngine;
use crate::lending::repository::{
    CredentialsNotifier, CredentialsReady, MemoryApplicationStore, MemoryPeriodStore, NotifyError,
    PeriodStore, StoreError,
};
use crate::lending::service::LoanService;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

pub(super) fn today() -> NaiveDate {
    date(2025, 6, 2)
}

pub(super) fn reference(name: &str) -> CharacterReference {
    CharacterReference {
        name: name.to_string(),
        contact: "0917-555-0101".to_string(),
        relation: "Neighbor".to_string(),
    }
}

pub(super) fn applicant() -> ApplicantProfile {
    ApplicantProfile {
        full_name: "Maria Santos".to_string(),
        date_of_birth: date(1990, 3, 14),
        contact_number: "0917-555-0100".to_string(),
        email: "maria.santos@example.com".to_string(),
        marital_status: MaritalStatus::Married,
        dependents: 2,
        address: "12 Mabini St, San Pedro".to_string(),
        income: IncomeSource::Business {
            business_name: "Santos Sari-Sari Store".to_string(),
            business_address: "12 Mabini St, San Pedro".to_string(),
            monthly_revenue: 38_000.0,
        },
        references: [reference("Ana Cruz"), reference("Jose Reyes"), reference("Lito Tan")],
    }
}

pub(super) fn submission() -> LoanSubmission {
    LoanSubmission {
        applicant: applicant(),
        category: LoanCategory::WithoutCollateral,
        requested_principal: 15_000.0,
        collateral: None,
    }
}

pub(super) fn collateral_submission() -> LoanSubmission {
    LoanSubmission {
        applicant: applicant(),
        category: LoanCategory::WithCollateral,
        requested_principal: 60_000.0,
        collateral: Some(CollateralOffer {
            collateral_type: "Vehicle".to_string(),
            estimated_value: 180_000.0,
            description: "2018 multicab, plate ABC-123".to_string(),
            ownership: CollateralOwnership::Owned,
        }),
    }
}

pub(super) fn pricing_engine() -> PricingEngine {
    PricingEngine::standard(12)
}

pub(super) type TestService = LoanService<MemoryApplicationStore, MemoryPeriodStore, MemoryNotifier>;

pub(super) fn build_service() -> (
    Arc<TestService>,
    Arc<MemoryApplicationStore>,
    Arc<MemoryPeriodStore>,
    Arc<MemoryNotifier>,
) {
    let applications = Arc::new(MemoryApplicationStore::default());
    let periods = Arc::new(MemoryPeriodStore::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = Arc::new(LoanService::new(
        applications.clone(),
        periods.clone(),
        notifier.clone(),
        pricing_engine(),
    ));
    (service, applications, periods, notifier)
}

/// Walk a freshly submitted application to the requested status with the
/// correct role at every step.
pub(super) fn advance_to<S, P, N>(
    service: &LoanService<S, P, N>,
    id: &ApplicationId,
    target: LoanStatus,
) -> LoanApplication
where
    S: crate::lending::repository::ApplicationStore + 'static,
    P: PeriodStore + 'static,
    N: CredentialsNotifier + 'static,
{
    let steps: [(LoanStatus, LoanAction, StaffRole); 5] = [
        (
            LoanStatus::Pending,
            LoanAction::ScheduleInterview {
                date: today(),
                time: time(10, 0),
            },
            StaffRole::LoanOfficer,
        ),
        (LoanStatus::Cleared, LoanAction::Clear, StaffRole::LoanOfficer),
        (LoanStatus::Approved, LoanAction::Approve, StaffRole::Manager),
        (
            LoanStatus::Disbursed,
            LoanAction::Disburse { first_due: None },
            StaffRole::LoanOfficer,
        ),
        (
            LoanStatus::Active,
            LoanAction::Activate {
                collector: Some("collector-1".to_string()),
            },
            StaffRole::Manager,
        ),
    ];

    let mut current = service.get(id).expect("application exists");
    for (status, action, role) in steps {
        if current.status == target {
            break;
        }
        current = service
            .transition(id, &action, role, today())
            .unwrap_or_else(|err| panic!("transition to {status:?} failed: {err}"));
    }

    assert_eq!(current.status, target);
    current
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<CredentialsReady>>>,
    fail: Arc<Mutex<bool>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<CredentialsReady> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn fail_next(&self) {
        *self.fail.lock().expect("notifier mutex poisoned") = true;
    }
}

impl CredentialsNotifier for MemoryNotifier {
    fn notify(&self, event: CredentialsReady) -> Result<(), NotifyError> {
        let mut fail = self.fail.lock().expect("notifier mutex poisoned");
        if *fail {
            *fail = false;
            return Err(NotifyError::Transport("smtp offline".to_string()));
        }
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(event);
        Ok(())
    }
}

/// Period store that refuses every write, to exercise disbursement rollback.
pub(super) struct UnavailablePeriodStore;

impl PeriodStore for UnavailablePeriodStore {
    fn insert_all(&self, _periods: Vec<CollectionPeriod>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("ledger offline".to_string()))
    }

    fn fetch(&self, _reference: &str) -> Result<Option<CollectionPeriod>, StoreError> {
        Err(StoreError::Unavailable("ledger offline".to_string()))
    }

    fn update(&self, _period: CollectionPeriod, _expected_paid: f64) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("ledger offline".to_string()))
    }

    fn list_for_loan(
        &self,
        _loan_id: &ApplicationId,
    ) -> Result<Vec<CollectionPeriod>, StoreError> {
        Err(StoreError::Unavailable("ledger offline".to_string()))
    }

    fn remove_for_loan(&self, _loan_id: &ApplicationId) -> Result<(), StoreError> {
        Ok(())
    }
}
