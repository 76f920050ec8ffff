use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicantProfile, ApplicationId, CollateralOffer, ComputedTerms, IncomeSource, LoanApplication,
    LoanCategory, LoanRequest, LoanStatus,
};

/// Raw payload supplied by the external submission forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSubmission {
    pub applicant: ApplicantProfile,
    pub category: LoanCategory,
    pub requested_principal: f64,
    pub collateral: Option<CollateralOffer>,
}

/// Rejections raised before any record is created. Always recoverable by the
/// caller; the record store is never touched on failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required field `{0}` is missing or empty")]
    MissingField(&'static str),
    #[error("character reference {slot} is incomplete")]
    IncompleteReference { slot: usize },
    #[error("collateral details are required for loans with collateral")]
    MissingCollateral,
    #[error("requested principal must be greater than zero")]
    NonPositivePrincipal,
}

/// Validate a submission against the per-category intake rules.
pub fn validate(submission: &LoanSubmission) -> Result<(), ValidationError> {
    let applicant = &submission.applicant;

    require("full_name", &applicant.full_name)?;
    require("contact_number", &applicant.contact_number)?;
    require("email", &applicant.email)?;
    require("address", &applicant.address)?;

    match &applicant.income {
        IncomeSource::Business {
            business_name,
            business_address,
            ..
        } => {
            require("business_name", business_name)?;
            require("business_address", business_address)?;
        }
        IncomeSource::Employment {
            employer, position, ..
        } => {
            require("employer", employer)?;
            require("position", position)?;
        }
    }

    for (slot, reference) in applicant.references.iter().enumerate() {
        if reference.name.trim().is_empty()
            || reference.contact.trim().is_empty()
            || reference.relation.trim().is_empty()
        {
            return Err(ValidationError::IncompleteReference { slot: slot + 1 });
        }
    }

    if !submission.requested_principal.is_finite() || submission.requested_principal <= 0.0 {
        return Err(ValidationError::NonPositivePrincipal);
    }

    if submission.category == LoanCategory::WithCollateral {
        match &submission.collateral {
            Some(offer) => {
                require("collateral_type", &offer.collateral_type)?;
                if !offer.estimated_value.is_finite() || offer.estimated_value <= 0.0 {
                    return Err(ValidationError::MissingField("collateral_estimated_value"));
                }
            }
            None => return Err(ValidationError::MissingCollateral),
        }
    }

    Ok(())
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Assemble the persisted record for a validated submission. New records
/// always enter the pipeline as `Applied`.
pub(crate) fn build_application(
    application_id: ApplicationId,
    submission: LoanSubmission,
    terms: ComputedTerms,
    submitted_on: NaiveDate,
) -> LoanApplication {
    let LoanSubmission {
        applicant,
        category,
        requested_principal,
        collateral,
    } = submission;

    LoanApplication {
        application_id,
        applicant,
        request: LoanRequest {
            category,
            requested_principal,
            collateral,
        },
        terms,
        status: LoanStatus::Applied,
        submitted_on,
        interview_date: None,
        interview_time: None,
        assigned_collector: None,
    }
}
