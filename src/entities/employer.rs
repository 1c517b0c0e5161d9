//! Employer entity - Employers of claimants, with their program exemption window.

use crate::core::lookups::ClaimType;
use sea_orm::entity::prelude::*;

/// Employer database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "employer")]
pub struct Model {
    /// Unique identifier for the employer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Federal employer identification number
    pub employer_fein: String,
    /// Legal name
    pub employer_name: String,
    /// Exempt from family leave contributions
    pub family_exemption: bool,
    /// Exempt from medical leave contributions
    pub medical_exemption: bool,
    /// First day of the exemption, open-ended when absent
    pub exemption_commence_date: Option<Date>,
    /// Last day of the exemption, open-ended when absent
    pub exemption_cease_date: Option<Date>,
}

impl Model {
    /// Whether the employer is exempt from the program for `claim_type` on `date`.
    #[must_use]
    pub fn is_exempt(&self, claim_type: Option<ClaimType>, date: Date) -> bool {
        let exempt_for_type = match claim_type {
            Some(ClaimType::Family) => self.family_exemption,
            Some(ClaimType::Medical) => self.medical_exemption,
            None => self.family_exemption || self.medical_exemption,
        };
        if !exempt_for_type {
            return false;
        }
        match (self.exemption_commence_date, self.exemption_cease_date) {
            (Some(commence), Some(cease)) => commence <= date && date <= cease,
            (Some(commence), None) => commence <= date,
            (None, Some(cease)) => date <= cease,
            (None, None) => true,
        }
    }
}

/// Employers have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
