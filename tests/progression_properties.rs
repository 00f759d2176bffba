//! Derived maxima and skill pool over whole attribute/level grids.

use beyonder::progression::{advancement_steps, compute_max_vitals, compute_skill_pool};
use beyonder::sheet::{Character, SkillLedger, VitalKind};

#[test]
fn starting_level_uses_base_values_only() {
    for vig in 0..8 {
        for mys in 0..8 {
            let m = compute_max_vitals(vig, mys, 9);
            assert_eq!(m.max_health, 10 + i64::from(vig));
            assert_eq!(m.max_energy, 10 + i64::from(mys));
            // only k = 9 contributes at the starting level
            let expected_sanity = (50 + 10 * i64::from(mys) - (9 - i64::from(mys)).max(0)).max(0);
            assert_eq!(m.max_sanity, expected_sanity);
        }
    }
}

#[test]
fn health_and_energy_grow_as_sequence_drops() {
    for vig in 0..6u32 {
        let mut last = compute_max_vitals(vig, vig, 9);
        for level in (0..9u8).rev() {
            let now = compute_max_vitals(vig, vig, level);
            assert!(now.max_health > last.max_health, "vig {} level {}", vig, level);
            assert!(now.max_energy > last.max_energy);
            assert!(now.max_sanity <= last.max_sanity);
            last = now;
        }
    }
}

#[test]
fn sanity_never_negative() {
    for mys in 0..4 {
        for level in 0..=9u8 {
            assert!(compute_max_vitals(0, mys, level).max_sanity >= 0);
        }
    }
    assert_eq!(compute_max_vitals(0, 0, 0).max_sanity, 5);
}

#[test]
fn worked_example_matches_hand_calculation() {
    // VIG 2, MYS 1, Sequence 7 -> two advancement steps
    let m = compute_max_vitals(2, 1, 7);
    assert_eq!(advancement_steps(7), 2);
    assert_eq!(m.max_health, 12 + 2 * 7);
    assert_eq!(m.max_energy, 11 + 2 * 5);
    assert_eq!(m.max_sanity, 60 - (6 + 7 + 8));
}

#[test]
fn high_mysticism_removes_sanity_cost() {
    assert_eq!(compute_max_vitals(0, 12, 0).max_sanity, 170);
}

#[test]
fn skill_pool_counts_trained_points_only() {
    let mut ledger = SkillLedger::new();
    ledger.set_trained("Athletics", 4);
    ledger.set_extra("Athletics", 10);
    ledger.set_trained("Occultism", 3);

    let pool = compute_skill_pool(2, 6, &ledger);
    assert_eq!(pool.total_available, 5 + 2 + 3 * 4);
    assert_eq!(pool.spent, 7);
    assert_eq!(pool.remaining, pool.total_available - 7);
    assert!(!pool.is_over_budget());
}

#[test]
fn skill_pool_can_go_negative() {
    let mut ledger = SkillLedger::new();
    ledger.set_trained("Stealth", 20);
    let pool = compute_skill_pool(0, 9, &ledger);
    assert_eq!(pool.total_available, 5);
    assert_eq!(pool.remaining, -15);
    assert!(pool.is_over_budget());
}

#[test]
fn proposal_applies_maxima_and_clamps_current() {
    let mut c = Character::new("Audrey");
    c.attributes.vigor = 0;
    c.attributes.mysticism = 0;
    c.vitals.health.max = 40;
    c.vitals.health.current = 40;

    let proposal = c.propose_vitals();
    assert!(!proposal.is_unchanged());
    proposal.apply(&mut c.vitals);

    let expected = compute_max_vitals(0, 0, 9);
    for kind in VitalKind::ALL {
        assert_eq!(c.vitals.get(kind).max, expected.get(kind));
        assert!(c.vitals.get(kind).current <= c.vitals.get(kind).max);
    }
    assert_eq!(c.vitals.health.current, 10);
    assert!(c.propose_vitals().is_unchanged());
}
