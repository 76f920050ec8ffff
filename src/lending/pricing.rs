use serde::{Deserialize, Serialize};

use super::domain::{ComputedTerms, LoanCategory};

/// One pricing bracket: threshold amount, fixed term (absent for open-term
/// loans), and monthly interest rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingTier {
    pub threshold: f64,
    pub months: Option<u32>,
    pub monthly_rate_percent: f64,
}

/// Pure pricing engine mapping (category, principal) to computed terms.
///
/// Tier tables are immutable configuration ordered by ascending threshold.
/// The engine holds no runtime state and may be called from any entry point
/// (intake, repricing, CLI quote, tests) with identical results.
pub struct PricingEngine {
    with_collateral: Vec<PricingTier>,
    without_collateral: Vec<PricingTier>,
    open_term: Vec<PricingTier>,
    open_term_default_months: u32,
}

const fn tier(threshold: f64, months: u32, rate: f64) -> PricingTier {
    PricingTier {
        threshold,
        months: Some(months),
        monthly_rate_percent: rate,
    }
}

const fn open_tier(threshold: f64, rate: f64) -> PricingTier {
    PricingTier {
        threshold,
        months: None,
        monthly_rate_percent: rate,
    }
}

impl PricingEngine {
    /// Standard product tables with a caller-chosen open-term amortization
    /// default.
    pub fn standard(open_term_default_months: u32) -> Self {
        Self {
            with_collateral: vec![
                tier(10_000.0, 12, 3.0),
                tier(50_000.0, 18, 2.5),
                tier(100_000.0, 24, 2.0),
                tier(300_000.0, 36, 1.8),
            ],
            without_collateral: vec![
                tier(5_000.0, 4, 12.0),
                tier(10_000.0, 5, 11.0),
                tier(15_000.0, 6, 10.0),
                tier(30_000.0, 8, 9.0),
                tier(50_000.0, 10, 8.0),
                tier(100_000.0, 12, 7.0),
            ],
            open_term: vec![
                open_tier(50_000.0, 4.0),
                open_tier(100_000.0, 3.5),
                open_tier(300_000.0, 3.0),
            ],
            open_term_default_months,
        }
    }

    /// Engine with custom tables, used by tests and repricing simulations.
    pub fn with_tables(
        with_collateral: Vec<PricingTier>,
        without_collateral: Vec<PricingTier>,
        open_term: Vec<PricingTier>,
        open_term_default_months: u32,
    ) -> Self {
        Self {
            with_collateral,
            without_collateral,
            open_term,
            open_term_default_months,
        }
    }

    pub fn tiers(&self, category: LoanCategory) -> &[PricingTier] {
        match category {
            LoanCategory::WithCollateral => &self.with_collateral,
            LoanCategory::WithoutCollateral => &self.without_collateral,
            LoanCategory::OpenTerm => &self.open_term,
        }
    }

    /// Price a request using the category's default term.
    pub fn quote(
        &self,
        category: LoanCategory,
        principal: f64,
    ) -> Result<ComputedTerms, PricingError> {
        self.quote_with_term(category, principal, None)
    }

    /// Price a request, optionally overriding the amortization term.
    ///
    /// The override only matters for open-term loans, whose tiers carry no
    /// fixed term; fixed-term categories always use the tier's own months.
    pub fn quote_with_term(
        &self,
        category: LoanCategory,
        principal: f64,
        term_override: Option<u32>,
    ) -> Result<ComputedTerms, PricingError> {
        if !principal.is_finite() || principal <= 0.0 {
            return Err(PricingError::InvalidPrincipal(principal));
        }

        let selected = self
            .select_tier(category, principal)
            .ok_or(PricingError::EmptyTierTable(category))?;
        let term_months = match selected.months {
            Some(months) => months,
            None => term_override.unwrap_or(self.open_term_default_months),
        };

        let rate = selected.monthly_rate_percent;
        let interest_amount = principal * rate / 100.0;
        let total_interest = interest_amount * term_months as f64;
        let service_fee = service_fee(principal);
        let total_payable = principal + total_interest + service_fee;

        Ok(ComputedTerms {
            term_months,
            interest_rate_percent: rate,
            interest_amount,
            total_interest,
            service_fee,
            total_payable,
            installment_amount: total_payable / term_months as f64,
            net_released: principal - service_fee,
        })
    }

    fn select_tier(&self, category: LoanCategory, principal: f64) -> Option<PricingTier> {
        let table = self.tiers(category);
        match category {
            // Fixed-term products: highest threshold not exceeding the
            // request, falling back to the lowest bracket.
            LoanCategory::WithCollateral | LoanCategory::WithoutCollateral => table
                .iter()
                .rev()
                .find(|tier| tier.threshold <= principal)
                .or(table.first())
                .copied(),
            // Open term: smallest threshold that still covers the request,
            // falling back to the highest bracket.
            LoanCategory::OpenTerm => table
                .iter()
                .find(|tier| tier.threshold >= principal)
                .or(table.last())
                .copied(),
        }
    }
}

/// One-time origination fee deducted from principal at disbursement.
///
/// The schedule is flat per band, not proportional across bands: the middle
/// band charges the same 1000 whether the principal is 20001 or 45000.
pub fn service_fee(principal: f64) -> f64 {
    if principal <= 20_000.0 {
        principal * 0.05
    } else if principal <= 45_000.0 {
        1_000.0
    } else {
        principal * 0.03
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PricingError {
    #[error("requested principal must be a positive finite amount, got {0}")]
    InvalidPrincipal(f64),
    #[error("no pricing tiers configured for category {}", .0.label())]
    EmptyTierTable(LoanCategory),
}
