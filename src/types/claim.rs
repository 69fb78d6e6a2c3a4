use std::fmt;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub tx_hash: String,
    pub market_address: String,
    /// Wallet of the requesting user. Only compared against the claimant
    /// decoded from the log; never used as the payout identity.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedClaim {
    pub market_address: String,
    pub claimant: String,
    pub outcome_index: i32,
    pub amount: BigDecimal,
    pub amount_base_units: String,
    pub tx_hash: String,
    pub block_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    MarketNotFound,
    NotResolved,
    NoBet,
    AlreadyClaimed,
    LosingOutcome,
}

impl IneligibleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IneligibleReason::MarketNotFound => "market not found",
            IneligibleReason::NotResolved => "market not resolved",
            IneligibleReason::NoBet => "no bet found",
            IneligibleReason::AlreadyClaimed => "already claimed",
            IneligibleReason::LosingOutcome => "losing outcome",
        }
    }
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimEligibility {
    pub can_claim: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ClaimEligibility {
    pub fn eligible() -> Self {
        ClaimEligibility {
            can_claim: true,
            reason: None,
        }
    }

    pub fn rejected(reason: IneligibleReason) -> Self {
        ClaimEligibility {
            can_claim: false,
            reason: Some(reason.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRequest {
    pub tx_hash: String,
    pub market_address: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedBet {
    pub tx_hash: String,
    pub market_address: String,
    pub wallet_address: String,
    pub outcome_index: i32,
    pub amount: BigDecimal,
    pub block_number: u64,
    /// False when the tx hash was already recorded.
    pub inserted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility_serializes_like_the_api() {
        let body = serde_json::to_value(ClaimEligibility::rejected(
            IneligibleReason::LosingOutcome,
        ))
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"canClaim": false, "reason": "losing outcome"})
        );

        let body = serde_json::to_value(ClaimEligibility::eligible()).unwrap();
        assert_eq!(body, serde_json::json!({"canClaim": true}));
    }
}
