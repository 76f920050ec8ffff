//! Loan origination and collections core: intake validation, pricing,
//! lifecycle transitions, and the repayment ledger, composed behind a
//! service with pluggable storage and notification boundaries.

pub mod domain;
pub mod intake;
pub mod ledger;
pub mod lifecycle;
pub mod pricing;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicantProfile, ApplicationId, CharacterReference, CollateralOffer, CollateralOwnership,
    ComputedTerms, IncomeSource, LoanApplication, LoanCategory, LoanRequest, LoanStatus,
    MaritalStatus, StaffRole,
};
pub use intake::{LoanSubmission, ValidationError};
pub use ledger::{
    generate_schedule, outstanding_balance, CollectionPeriod, LedgerError, PeriodStatus,
};
pub use lifecycle::{attempt_transition, LoanAction, ScheduleViolation, TransitionError};
pub use pricing::{service_fee, PricingEngine, PricingError, PricingTier};
pub use repository::{
    ApplicationStatusView, ApplicationStore, CredentialsNotifier, CredentialsReady,
    LoanSummaryView, LoggingNotifier, MemoryApplicationStore, MemoryPeriodStore, NotifyError,
    PeriodStore, PeriodView, StoreError,
};
pub use router::lending_router;
pub use service::{LendingError, LoanService};
