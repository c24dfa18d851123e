use chrono::{DateTime, Utc};

use super::domain::{EligibilityCriteria, Employee};

/// Specific reason a voter fails a campaign's eligibility criteria.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EligibilityRejection {
    #[error("voter position {found} is not in the campaign allow-list")]
    PositionNotAllowed { found: &'static str },
    #[error("voter tenure {found} days is below the required {required} days")]
    InsufficientTenure { required: i64, found: i64 },
    #[error("voter store {found} is not in the campaign store allow-list")]
    StoreNotAllowed { found: String },
    #[error("voter is excluded from this campaign")]
    Excluded,
    #[error("voter is not an active employee")]
    NotActive,
}

/// Check an employee against campaign criteria, reporting the first failing
/// rule. Rules are ordered from cheapest to most specific.
pub fn check_eligibility(
    employee: &Employee,
    criteria: &EligibilityCriteria,
    now: DateTime<Utc>,
) -> Result<(), EligibilityRejection> {
    if !employee.is_active() {
        return Err(EligibilityRejection::NotActive);
    }

    if criteria.excluded_employees.contains(&employee.id) {
        return Err(EligibilityRejection::Excluded);
    }

    if !criteria.allowed_positions.is_empty()
        && !criteria.allowed_positions.contains(&employee.position)
    {
        return Err(EligibilityRejection::PositionNotAllowed {
            found: employee.position.label(),
        });
    }

    let tenure = employee.tenure_days(now);
    if tenure < criteria.min_tenure_days {
        return Err(EligibilityRejection::InsufficientTenure {
            required: criteria.min_tenure_days,
            found: tenure,
        });
    }

    if let Some(stores) = &criteria.allowed_stores {
        if !stores.contains(&employee.current_store) {
            return Err(EligibilityRejection::StoreNotAllowed {
                found: employee.current_store.clone(),
            });
        }
    }

    Ok(())
}
