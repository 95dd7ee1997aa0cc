//! Integration test: the full capsule-to-claim yield pipeline.
//!
//! Exercises the computation chain end to end:
//! 1. Register an account and a mixed capsule portfolio
//! 2. Verify the reference multiplier/yield/reward arithmetic
//! 3. Verify breakdown conservation and order independence
//! 4. Verify the minimum-claim threshold gating
//! 5. Claim and verify settlement intent shape
//!
//! This test uses gtt-engine, gtt-yield, gtt-claims, and gtt-types.

use gtt_claims::coordinator::ClaimOutcome;
use gtt_engine::{Engine, EngineConfig};
use gtt_types::{Account, Capsule, Tier, AMOUNT_EPSILON, SECONDS_PER_DAY};
use gtt_yield::convert::{aggregate, CapsuleYield, ConversionConfig};

/// Base timestamp for test scenarios.
const BASE_TIME: u64 = 1_700_000_000;

fn test_engine() -> Engine {
    let config = EngineConfig::from_toml(
        r#"
        [rewards]
        base_apy = 0.12
        conversion_rate = 0.1

        [tiers]
        tier_bonuses = [0.0, 0.10, 0.25, 0.50]
        period_steps = [[90, 0.10], [180, 0.25], [365, 0.50]]

        [vault]
        performance_fee_rate = 0.02
        "#,
    )
    .expect("config parses");
    Engine::new(&config).expect("engine builds")
}

fn reference_capsule(creator: &str) -> Capsule {
    Capsule {
        id: "c-reference".to_string(),
        creator: creator.to_string(),
        created_at: BASE_TIME - 10 * SECONDS_PER_DAY,
        views: 1000,
        shares: 50,
        verifications: 10,
        minted: true,
        veritas_sealed: false,
        quality_score: 50.0,
        category: "testimony".to_string(),
    }
}

#[tokio::test]
async fn reference_scenario_end_to_end() {
    let engine = test_engine();
    let account = "0xcreator".to_string();

    engine.register_account(Account::new(&account, Tier::Creator)).await;
    engine.ingest_capsule(reference_capsule(&account)).await;
    engine
        .deposit(&account, 500.0, BASE_TIME - 180 * SECONDS_PER_DAY)
        .await
        .expect("deposit");

    let summary = engine
        .claimable_summary(&account, BASE_TIME)
        .await
        .expect("summary");

    // yield = 1000*0.5 + 50*1.5 + 10*3.0 + 10.0 = 615
    // multiplier = 1 + 0.25 (Creator) + 0.25 (180d) = 1.50
    // reward = 615 * 1.50 * 0.1 = 92.25
    assert_eq!(summary.capsule_count, 1);
    assert!((summary.total_yield - 615.0).abs() < 1e-9);
    assert!((summary.amount - 92.25).abs() < 1e-9);

    let entry = &summary.breakdown[0];
    assert_eq!(entry.capsule_id, "c-reference");
    assert_eq!(entry.days_active, 10);
    assert!((entry.daily_rate - 61.5).abs() < 1e-9);
    // APY-equivalent: 0.12 * 1.50 * 100 = 18%.
    assert!((entry.apy - 18.0).abs() < 1e-9);
    assert!((summary.average_apy - 18.0).abs() < 1e-9);
}

#[tokio::test]
async fn breakdown_conserves_total() {
    let engine = test_engine();
    let account = "0xportfolio".to_string();

    engine.register_account(Account::new(&account, Tier::Seeker)).await;
    for (i, (views, shares, verifications)) in
        [(1000, 50, 10), (37, 2, 0), (999, 0, 3), (4, 4, 4), (0, 0, 0)]
            .iter()
            .enumerate()
    {
        engine
            .ingest_capsule(Capsule {
                id: format!("c{i}"),
                creator: account.clone(),
                created_at: BASE_TIME - (i as u64 + 1) * SECONDS_PER_DAY,
                views: *views,
                shares: *shares,
                verifications: *verifications,
                minted: i % 2 == 0,
                veritas_sealed: i % 3 == 0,
                quality_score: 50.0,
                category: String::new(),
            })
            .await;
    }

    let summary = engine
        .claimable_summary(&account, BASE_TIME)
        .await
        .expect("summary");
    assert_eq!(summary.capsule_count, 5);

    let sum: f64 = summary.breakdown.iter().map(|b| b.current_reward).sum();
    assert!(
        (sum - summary.total_reward).abs() < AMOUNT_EPSILON,
        "breakdown must conserve the aggregate total"
    );
}

#[test]
fn aggregation_is_order_independent() {
    use rand::seq::SliceRandom;

    let config = ConversionConfig {
        conversion_rate: 0.1,
        base_apy: 0.12,
        min_claim_yield: 1.0,
    };
    let account = "0xshuffle".to_string();
    let mut entries: Vec<CapsuleYield> = (0..50)
        .map(|i| CapsuleYield {
            capsule_id: format!("c{i}"),
            yield_score: (i as f64) * 3.7 + 0.13,
            multiplier: 1.0 + (i % 4) as f64 * 0.125,
            days_active: i % 30,
        })
        .collect();

    let baseline = aggregate(&account, &entries, &config).expect("aggregate");
    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        entries.shuffle(&mut rng);
        let shuffled = aggregate(&account, &entries, &config).expect("aggregate");
        assert!((shuffled.total_reward - baseline.total_reward).abs() < AMOUNT_EPSILON);
        assert!((shuffled.amount - baseline.amount).abs() < AMOUNT_EPSILON);
    }
}

#[tokio::test]
async fn below_threshold_capsules_visible_but_not_claimable() {
    let engine = test_engine();
    let account = "0xsmall".to_string();

    engine.register_account(Account::new(&account, Tier::Explorer)).await;
    // 1 view => 0.5 yield, below the 1.0 default threshold.
    engine
        .ingest_capsule(Capsule {
            id: "c-dust".to_string(),
            creator: account.clone(),
            created_at: BASE_TIME - SECONDS_PER_DAY,
            views: 1,
            shares: 0,
            verifications: 0,
            minted: false,
            veritas_sealed: false,
            quality_score: 50.0,
            category: String::new(),
        })
        .await;

    let summary = engine
        .claimable_summary(&account, BASE_TIME)
        .await
        .expect("summary");
    assert_eq!(summary.capsule_count, 1);
    assert!(!summary.breakdown[0].claimable);
    assert_eq!(summary.amount, 0.0);
    assert!(summary.total_reward > 0.0);

    // Claiming the dust is a stale-amount rejection, not a payout.
    assert!(engine.claim(&account, 0.05, BASE_TIME).await.is_err());
}

#[tokio::test]
async fn settlement_intent_carries_reconciliation_detail() {
    let engine = test_engine();
    let account = "0xsettle".to_string();

    engine.register_account(Account::new(&account, Tier::Explorer)).await;
    engine.ingest_capsule(reference_capsule(&account)).await;

    let amount = engine
        .claimable_summary(&account, BASE_TIME)
        .await
        .expect("summary")
        .amount;
    let outcome = engine.claim(&account, amount, BASE_TIME).await.expect("claim");

    match outcome {
        ClaimOutcome::Claimed { record, intent } => {
            assert_eq!(intent.account_id, account);
            assert_eq!(intent.token, "GTT");
            assert!((intent.amount - amount).abs() < AMOUNT_EPSILON);
            // Period id is the hex form of the ledger key.
            assert_eq!(intent.period_id, hex::encode(record.period_id));
            // The intent round-trips as JSON for the settlement queue.
            let json = serde_json::to_string(&intent).expect("serialize");
            assert!(json.contains("\"token\":\"GTT\""));
        }
        ClaimOutcome::AlreadyClaimed { .. } => {
            unreachable!("first claim must commit")
        }
    }
}

#[tokio::test]
async fn partial_claim_leaves_remainder() {
    let engine = test_engine();
    let account = "0xpartial".to_string();

    engine.register_account(Account::new(&account, Tier::Explorer)).await;
    engine.ingest_capsule(reference_capsule(&account)).await;

    let full = engine
        .claimable_summary(&account, BASE_TIME)
        .await
        .expect("summary")
        .amount;

    // Claim half now; the rest stays claimable next period.
    let half = full / 2.0;
    let outcome = engine.claim(&account, half, BASE_TIME).await.expect("claim");
    assert!(outcome.is_new_claim());

    let next_period = BASE_TIME + 24 * 60 * 60;
    let rest = engine
        .claimable_summary(&account, next_period)
        .await
        .expect("summary")
        .amount;
    assert!((rest - half).abs() < 1e-9);
}
