use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::domain::{CampaignId, EmployeeId};

/// Deterministic pseudonym for a (voter, campaign) pair.
///
/// This exists for duplicate-vote prevention, not anonymity: anyone who can
/// enumerate employee ids can recompute the digest and unmask a ballot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoterFingerprint(pub String);

impl VoterFingerprint {
    pub fn derive(employee: &EmployeeId, campaign: &CampaignId) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(employee.0.as_bytes());
        hasher.update(b"/");
        hasher.update(campaign.0.as_bytes());
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            hex.push_str(&format!("{byte:02x}"));
        }
        VoterFingerprint(hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let employee = EmployeeId("emp-001".to_string());
        let campaign = CampaignId("camp-001".to_string());
        assert_eq!(
            VoterFingerprint::derive(&employee, &campaign),
            VoterFingerprint::derive(&employee, &campaign)
        );
    }

    #[test]
    fn different_campaigns_produce_different_fingerprints() {
        let employee = EmployeeId("emp-001".to_string());
        let a = VoterFingerprint::derive(&employee, &CampaignId("camp-001".to_string()));
        let b = VoterFingerprint::derive(&employee, &CampaignId("camp-002".to_string()));
        assert_ne!(a, b);
    }

    #[test]
    fn separator_prevents_boundary_collisions() {
        let a = VoterFingerprint::derive(
            &EmployeeId("ab".to_string()),
            &CampaignId("c".to_string()),
        );
        let b = VoterFingerprint::derive(
            &EmployeeId("a".to_string()),
            &CampaignId("bc".to_string()),
        );
        assert_ne!(a, b);
    }
}
