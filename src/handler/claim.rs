use chrono::Utc;
use tracing::{info, warn};

use crate::{
    configuration::State,
    error::Error,
    handler::receipt::{confirmed_receipt, find_event},
    helpers::{
        address_key, normalize_address, normalize_wallet, parse_address,
        parse_tx_hash, to_display_units, tx_hash_key, u256_to_i32,
    },
    model::{Market_Snapshot, Payout},
    types::{
        abi::WinningsClaimed, ClaimEligibility, ClaimRequest, IneligibleReason,
        VerifiedClaim,
    },
};

/// Verifies a claim transaction against the chain and records the payout
/// once. Claimant, outcome and amount come only from the decoded log.
pub async fn verify_claim(
    state: &State,
    request: &ClaimRequest,
) -> Result<VerifiedClaim, Error> {
    let tx_hash = parse_tx_hash(&request.tx_hash)?;
    let market = parse_address(&request.market_address)?;
    let market_key = address_key(&market);
    let tx_key = tx_hash_key(&tx_hash);

    let receipt = confirmed_receipt(state, tx_hash).await?;
    let (event, log) = find_event::<WinningsClaimed>(&receipt, market)?;
    let claimant = address_key(&event.claimant);

    if let Some(user) = &request.user_id {
        if normalize_wallet(user) != claimant {
            warn!(
                tx = %tx_key,
                market = %market_key,
                "claim submitted for another wallet"
            );
            return Err(Error::NotEligible(format!(
                "transaction {} was claimed by another wallet",
                tx_key
            )));
        }
    }

    let already = || Error::AlreadyClaimed {
        market: market_key.clone(),
        wallet: claimant.clone(),
    };

    if state.store.get_payout(&market_key, &claimant).await?.is_some() {
        return Err(already());
    }

    let outcome_index = u256_to_i32(event.outcomeIndex, "outcomeIndex")?;
    let amount = to_display_units(event.amount)?;

    let payout = Payout {
        PO_market_address: market_key.clone(),
        PO_user_wallet: claimant.clone(),
        PO_outcome_index: outcome_index,
        PO_amount: amount.clone(),
        Tx_Hash: tx_key.clone(),
        PO_created_at: Utc::now(),
    };

    match state.store.insert_payout(payout).await {
        Ok(()) => {},
        Err(Error::StoreConflict(_)) => return Err(already()),
        Err(e) => return Err(e),
    }

    info!(
        tx = %tx_key,
        market = %market_key,
        claimant = %claimant,
        amount = %amount,
        "payout recorded"
    );

    Ok(VerifiedClaim {
        market_address: market_key,
        claimant,
        outcome_index,
        amount,
        amount_base_units: event.amount.to_string(),
        tx_hash: tx_key,
        block_number: log.block_number,
    })
}

async fn find_market(
    state: &State,
    market_id: &str,
) -> Result<Option<Market_Snapshot>, Error> {
    let market_id = market_id.trim();

    if let Ok(id) = market_id.parse::<i64>() {
        return state.store.get_market_by_id(id).await;
    }

    // Neither an id nor an address: no market can match it.
    match normalize_address(market_id) {
        Ok(address) => state.store.get_market_by_address(&address).await,
        Err(_) => Ok(None),
    }
}

/// Pre-check before a user sends the on-chain claim. Ineligibility is a
/// normal answer with a reason; only infrastructure failures are errors.
/// `market_id` is the store id or the market address.
pub async fn can_claim(
    state: &State,
    market_id: &str,
    user_id: &str,
) -> Result<ClaimEligibility, Error> {
    let wallet = normalize_wallet(user_id);

    let market = match find_market(state, market_id).await? {
        Some(market) => market,
        None => {
            return Ok(ClaimEligibility::rejected(
                IneligibleReason::MarketNotFound,
            ))
        },
    };

    let winner = match (market.MS_resolved, market.MS_winning_outcome) {
        (true, Some(winner)) => winner,
        _ => {
            return Ok(ClaimEligibility::rejected(
                IneligibleReason::NotResolved,
            ))
        },
    };

    let bets = state.store.get_bets(&market.MS_address, &wallet).await?;
    if bets.is_empty() {
        return Ok(ClaimEligibility::rejected(IneligibleReason::NoBet));
    }

    if state
        .store
        .get_payout(&market.MS_address, &wallet)
        .await?
        .is_some()
    {
        return Ok(ClaimEligibility::rejected(IneligibleReason::AlreadyClaimed));
    }

    if !bets.iter().any(|bet| bet.BT_outcome_index == winner) {
        return Ok(ClaimEligibility::rejected(IneligibleReason::LosingOutcome));
    }

    Ok(ClaimEligibility::eligible())
}

#[cfg(test)]
mod tests {
    use std::{str::FromStr, sync::Arc};

    use alloy::primitives::{Address, B256, U256};
    use bigdecimal::BigDecimal;
    use futures::future::join_all;

    use super::*;
    use crate::{
        dao::{MemoryStore, Store},
        model::Bet,
        provider::mock::{event_log, receipt, test_state, MockChain},
    };

    const USER: &str = "0xuser1";

    fn market(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn script_claim(
        chain: &MockChain,
        tx: B256,
        market: Address,
        claimant: Address,
        amount: U256,
    ) {
        let log = event_log(
            market,
            &WinningsClaimed {
                claimant,
                outcomeIndex: U256::from(1u8),
                amount,
            },
            42,
            3,
            tx,
        );
        chain.set_receipt(receipt(tx, 42, vec![log]));
    }

    fn request(
        tx: B256,
        market: Address,
        user: Option<Address>,
    ) -> ClaimRequest {
        ClaimRequest {
            tx_hash: tx.to_string(),
            market_address: market.to_string(),
            user_id: user.map(|u| u.to_string()),
        }
    }

    async fn seed_market(
        store: &MemoryStore,
        n: u8,
        resolved: bool,
        winner: Option<i32>,
    ) {
        store
            .upsert_market(Market_Snapshot {
                MS_id: 0,
                MS_address: address_key(&market(n)),
                MS_factory: String::from("0xfactory"),
                MS_factory_index: Some(i64::from(n)),
                MS_title: format!("market {}", n),
                MS_end_time: Utc::now(),
                MS_resolved: resolved,
                MS_winning_outcome: winner,
                MS_pool_totals: vec![],
                MS_last_synced_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    async fn seed_bet(store: &MemoryStore, n: u8, wallet: &str, outcome: i32) {
        store
            .insert_bet(Bet {
                Tx_Hash: format!("0xbet{}{}{}", n, wallet, outcome),
                BT_market_address: address_key(&market(n)),
                BT_wallet_address: wallet.to_string(),
                BT_outcome_index: outcome,
                BT_amount: BigDecimal::from(1),
                BT_block_number: 1,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn amount_comes_from_the_log() {
        let chain = Arc::new(MockChain::new());
        let tx = B256::repeat_byte(0x01);
        let claimant = Address::repeat_byte(0x11);
        script_claim(
            &chain,
            tx,
            market(1),
            claimant,
            U256::from(1_500_000_000_000_000_000u128),
        );
        let (state, store) = test_state(chain);

        let claim_request = request(tx, market(1), Some(claimant));
        let claim = verify_claim(&state, &claim_request).await.unwrap();

        assert_eq!(claim.amount, BigDecimal::from_str("1.5").unwrap());
        assert_eq!(claim.amount_base_units, "1500000000000000000");
        assert_eq!(claim.claimant, address_key(&claimant));
        assert_eq!(claim.outcome_index, 1);

        let payouts = store.payouts().unwrap();
        assert_eq!(payouts.len(), 1);
        assert_eq!(payouts[0].PO_amount, BigDecimal::from_str("1.5").unwrap());
    }

    #[tokio::test]
    async fn concurrent_submissions_record_one_payout() {
        let chain = Arc::new(MockChain::new());
        let tx = B256::repeat_byte(0x02);
        script_claim(
            &chain,
            tx,
            market(1),
            Address::repeat_byte(0x11),
            U256::from(10u8),
        );
        let (state, store) = test_state(chain);
        let request = request(tx, market(1), None);

        let results =
            join_all((0..8).map(|_| verify_claim(&state, &request))).await;

        let recorded = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(Error::AlreadyClaimed { .. })))
            .count();
        assert_eq!(recorded, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(store.payouts().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn claim_for_another_market_is_rejected() {
        let chain = Arc::new(MockChain::new());
        let tx = B256::repeat_byte(0x03);
        script_claim(
            &chain,
            tx,
            market(1),
            Address::repeat_byte(0x11),
            U256::from(10u8),
        );
        let (state, store) = test_state(chain);

        let result = verify_claim(&state, &request(tx, market(2), None)).await;
        assert!(matches!(result, Err(Error::EventNotFound(_))));
        assert!(store.payouts().unwrap().is_empty());
    }

    #[tokio::test]
    async fn claimant_mismatch_is_not_eligible() {
        let chain = Arc::new(MockChain::new());
        let tx = B256::repeat_byte(0x04);
        script_claim(
            &chain,
            tx,
            market(1),
            Address::repeat_byte(0x11),
            U256::from(10u8),
        );
        let (state, _) = test_state(chain);

        let result = verify_claim(
            &state,
            &request(tx, market(1), Some(Address::repeat_byte(0x22))),
        )
        .await;
        assert!(matches!(result, Err(Error::NotEligible(_))));
    }

    #[tokio::test]
    async fn losing_outcome_scenario() {
        let chain = Arc::new(MockChain::new());
        let (state, store) = test_state(chain);
        for n in 1..=6 {
            seed_market(&store, n, false, None).await;
        }
        seed_market(&store, 7, true, Some(1)).await;
        seed_bet(&store, 7, USER, 0).await;

        let answer = can_claim(&state, "7", USER).await.unwrap();
        assert_eq!(
            serde_json::to_value(&answer).unwrap(),
            serde_json::json!({"canClaim": false, "reason": "losing outcome"})
        );
    }

    #[tokio::test]
    async fn each_violated_clause_has_its_reason() {
        let chain = Arc::new(MockChain::new());
        let (state, store) = test_state(chain);
        seed_market(&store, 1, false, None).await;
        seed_market(&store, 2, true, Some(1)).await;
        seed_market(&store, 3, true, None).await;
        seed_bet(&store, 1, USER, 1).await;
        seed_bet(&store, 2, USER, 1).await;
        seed_bet(&store, 3, USER, 1).await;

        let reason =
            |answer: ClaimEligibility| answer.reason.unwrap_or_default();

        assert_eq!(
            reason(can_claim(&state, "99", USER).await.unwrap()),
            "market not found"
        );
        assert_eq!(
            reason(can_claim(&state, "1", USER).await.unwrap()),
            "market not resolved"
        );
        assert_eq!(
            reason(can_claim(&state, "3", USER).await.unwrap()),
            "market not resolved"
        );
        assert_eq!(
            reason(can_claim(&state, "2", "0xsomeoneelse").await.unwrap()),
            "no bet found"
        );

        let open = can_claim(&state, "2", USER).await.unwrap();
        assert!(open.can_claim);

        let by_address = can_claim(&state, &market(2).to_string(), "0xUSER1")
            .await
            .unwrap();
        assert!(by_address.can_claim);

        store
            .insert_payout(Payout {
                PO_market_address: address_key(&market(2)),
                PO_user_wallet: USER.to_string(),
                PO_outcome_index: 1,
                PO_amount: BigDecimal::from(2),
                Tx_Hash: String::from("0xclaim"),
                PO_created_at: Utc::now(),
            })
            .await
            .unwrap();
        assert_eq!(
            reason(can_claim(&state, "2", USER).await.unwrap()),
            "already claimed"
        );
    }

    #[tokio::test]
    async fn malformed_market_id_is_not_found() {
        let (state, store) = test_state(Arc::new(MockChain::new()));
        seed_market(&store, 1, true, Some(1)).await;

        for market_id in ["not-a-market", "0x12", ""] {
            let answer = can_claim(&state, market_id, USER).await.unwrap();
            assert_eq!(
                answer,
                ClaimEligibility::rejected(IneligibleReason::MarketNotFound)
            );
        }
    }

    #[tokio::test]
    async fn a_winning_bet_among_several_is_enough() {
        let chain = Arc::new(MockChain::new());
        let (state, store) = test_state(chain);
        seed_market(&store, 1, true, Some(2)).await;
        seed_bet(&store, 1, USER, 0).await;
        seed_bet(&store, 1, USER, 2).await;

        assert!(can_claim(&state, "1", USER).await.unwrap().can_claim);
    }
}
