use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for loan applications, stable for the record's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Product line a loan request is priced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanCategory {
    WithCollateral,
    WithoutCollateral,
    OpenTerm,
}

impl LoanCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::WithCollateral => "With Collateral",
            Self::WithoutCollateral => "Without Collateral",
            Self::OpenTerm => "Open Term",
        }
    }
}

/// Staff roles supplied by the identity provider on every mutating call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    LoanOfficer,
    Manager,
    Collector,
    Head,
}

impl StaffRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::LoanOfficer => "Loan Officer",
            Self::Manager => "Manager",
            Self::Collector => "Collector",
            Self::Head => "Head",
        }
    }
}

/// Lifecycle status of a loan application.
///
/// `Applied` is the entry state. `Active`, `Denied`, and `DeniedByOfficer`
/// are terminal for the state machine; repayment completion is tracked by
/// the collections ledger, not a further status here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Applied,
    Pending,
    Cleared,
    Approved,
    Disbursed,
    Active,
    Denied,
    DeniedByOfficer,
}

impl LoanStatus {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::Applied,
            Self::Pending,
            Self::Cleared,
            Self::Approved,
            Self::Disbursed,
            Self::Active,
            Self::Denied,
            Self::DeniedByOfficer,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::Pending => "Pending",
            Self::Cleared => "Cleared",
            Self::Approved => "Approved",
            Self::Disbursed => "Disbursed",
            Self::Active => "Active",
            Self::Denied => "Denied",
            Self::DeniedByOfficer => "Denied by LO",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Active | Self::Denied | Self::DeniedByOfficer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    Married,
    Widowed,
    Separated,
}

/// One of the three character reference slots every submission must fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterReference {
    pub name: String,
    pub contact: String,
    pub relation: String,
}

/// Declared source of repayment capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IncomeSource {
    Business {
        business_name: String,
        business_address: String,
        monthly_revenue: f64,
    },
    Employment {
        employer: String,
        position: String,
        monthly_salary: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollateralOwnership {
    Owned,
    Mortgaged,
    CoOwned,
}

/// Security pledged against the loan, mandatory for `WithCollateral` requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollateralOffer {
    pub collateral_type: String,
    pub estimated_value: f64,
    pub description: String,
    pub ownership: CollateralOwnership,
}

/// Borrower identity and background captured at intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub contact_number: String,
    pub email: String,
    pub marital_status: MaritalStatus,
    pub dependents: u8,
    pub address: String,
    pub income: IncomeSource,
    pub references: [CharacterReference; 3],
}

/// What the borrower asked for, before pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub category: LoanCategory,
    pub requested_principal: f64,
    pub collateral: Option<CollateralOffer>,
}

/// Financial terms derived from the pricing tiers.
///
/// These fields are only ever written as a block: any principal edit replaces
/// the whole struct so payable and installment cannot drift out of sync.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComputedTerms {
    pub term_months: u32,
    pub interest_rate_percent: f64,
    pub interest_amount: f64,
    pub total_interest: f64,
    pub service_fee: f64,
    pub total_payable: f64,
    pub installment_amount: f64,
    pub net_released: f64,
}

/// The persisted loan application, the system's principal entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub application_id: ApplicationId,
    pub applicant: ApplicantProfile,
    pub request: LoanRequest,
    pub terms: ComputedTerms,
    pub status: LoanStatus,
    pub submitted_on: NaiveDate,
    pub interview_date: Option<NaiveDate>,
    pub interview_time: Option<NaiveTime>,
    pub assigned_collector: Option<String>,
}
