//! # Character Progression
//!
//! Pure calculators for the numbers that derive from a character's attributes
//! and advancement level (sequence):
//!
//! - [`compute_max_vitals`] - maximum Health, Energy and Sanity
//! - [`compute_skill_pool`] - skill points available, spent and remaining
//!
//! Neither function reads or writes storage. Recomputing vitals is
//! destructive for the sheet (current values get clamped), so the caller gets a
//! [`VitalsProposal`] and decides whether to [`apply`](VitalsProposal::apply) it.
//!
//! ```rust
//! use beyonder::progression::{compute_max_vitals, compute_skill_pool};
//! use beyonder::sheet::SkillLedger;
//!
//! let max = compute_max_vitals(2, 1, 7);
//! assert_eq!((max.max_health, max.max_energy, max.max_sanity), (26, 21, 39));
//!
//! let pool = compute_skill_pool(3, 6, &SkillLedger::new());
//! assert_eq!(pool.total_available, 23);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sheet::types::{Character, SkillLedger, VitalKind, Vitals, STARTING_SEQUENCE};

const BASE_HEALTH: i64 = 10;
const BASE_ENERGY: i64 = 10;
const GROWTH_PER_STEP: i64 = 3;
const BASE_SANITY: i64 = 50;
const SANITY_PER_MYSTICISM: i64 = 10;
const BASE_SKILL_POINTS: i64 = 5;
const SKILL_POINTS_PER_STEP: i64 = 2;

/// Number of advancements taken so far: `max(0, 9 - level)`.
pub fn advancement_steps(level: u8) -> i64 {
    (i64::from(STARTING_SEQUENCE) - i64::from(level)).max(0)
}

/// Maximum values for the three vitals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxVitals {
    pub max_health: i64,
    pub max_energy: i64,
    pub max_sanity: i64,
}

impl MaxVitals {
    /// Maxima currently recorded on a sheet.
    pub fn of(vitals: &Vitals) -> Self {
        Self {
            max_health: vitals.health.max,
            max_energy: vitals.energy.max,
            max_sanity: vitals.sanity.max,
        }
    }

    pub fn get(&self, kind: VitalKind) -> i64 {
        match kind {
            VitalKind::Health => self.max_health,
            VitalKind::Energy => self.max_energy,
            VitalKind::Sanity => self.max_sanity,
        }
    }
}

/// Compute maximum Health, Energy and Sanity.
///
/// The sanity reduction sums `max(0, k - mysticism)` for every `k` from 9 down to
/// `level` inclusive, so a character still at sequence 9 already pays the cost of
/// `k = 9` once.
pub fn compute_max_vitals(vigor: u32, mysticism: u32, level: u8) -> MaxVitals {
    let steps = advancement_steps(level);
    let vigor = i64::from(vigor);
    let mysticism = i64::from(mysticism);

    let max_health = (BASE_HEALTH + vigor) + steps * (GROWTH_PER_STEP + 2 * vigor);
    let max_energy = (BASE_ENERGY + mysticism) + steps * (GROWTH_PER_STEP + 2 * mysticism);

    let base_sanity = BASE_SANITY + SANITY_PER_MYSTICISM * mysticism;
    let reduction: i64 = (level..=STARTING_SEQUENCE)
        .rev()
        .map(|k| (i64::from(k) - mysticism).max(0))
        .sum();
    let max_sanity = (base_sanity - reduction).max(0);

    MaxVitals {
        max_health,
        max_energy,
        max_sanity,
    }
}

/// Skill point accounting for one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillPool {
    pub total_available: i64,
    pub spent: i64,
    /// Negative when more points are trained than the pool allows.
    pub remaining: i64,
}

impl SkillPool {
    pub fn is_over_budget(&self) -> bool {
        self.remaining < 0
    }
}

/// Compute the spendable pool from Intelligence and level, and how much of it the
/// ledger's trained points consume. Extra points never count.
pub fn compute_skill_pool(intelligence: u32, level: u8, ledger: &SkillLedger) -> SkillPool {
    let steps = advancement_steps(level);
    let intelligence = i64::from(intelligence);
    let base_points = BASE_SKILL_POINTS + intelligence;
    let total_available = base_points + steps * (SKILL_POINTS_PER_STEP + intelligence);
    let spent = ledger.spent();
    SkillPool {
        total_available,
        spent,
        remaining: total_available - spent,
    }
}

/// Recomputed maxima awaiting the user's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalsProposal {
    pub previous: MaxVitals,
    pub proposed: MaxVitals,
}

impl VitalsProposal {
    pub fn is_unchanged(&self) -> bool {
        self.previous == self.proposed
    }

    /// `(vital, old max, new max)` for all three vitals.
    pub fn changes(&self) -> [(VitalKind, i64, i64); 3] {
        VitalKind::ALL.map(|kind| (kind, self.previous.get(kind), self.proposed.get(kind)))
    }

    /// Commit the proposed maxima, lowering current values that exceed them.
    pub fn apply(&self, vitals: &mut Vitals) {
        for kind in VitalKind::ALL {
            vitals.get_mut(kind).set_max(self.proposed.get(kind));
        }
    }
}

impl fmt::Display for VitalsProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (kind, old, new) in self.changes() {
            writeln!(f, "  {:<7} {:>4} -> {:<4}", kind.label(), old, new)?;
        }
        Ok(())
    }
}

impl Character {
    pub fn max_vitals(&self) -> MaxVitals {
        compute_max_vitals(self.attributes.vigor, self.attributes.mysticism, self.sequence)
    }

    pub fn propose_vitals(&self) -> VitalsProposal {
        VitalsProposal {
            previous: MaxVitals::of(&self.vitals),
            proposed: self.max_vitals(),
        }
    }

    pub fn skill_pool(&self) -> SkillPool {
        compute_skill_pool(self.attributes.intelligence, self.sequence, &self.skills)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::types::Resource;

    #[test]
    fn steps_saturate_at_starting_level() {
        assert_eq!(advancement_steps(9), 0);
        assert_eq!(advancement_steps(12), 0);
        assert_eq!(advancement_steps(7), 2);
        assert_eq!(advancement_steps(0), 9);
    }

    #[test]
    fn starting_level_still_charges_one_sanity_step() {
        let v = compute_max_vitals(0, 0, 9);
        assert_eq!(v.max_health, 10);
        assert_eq!(v.max_energy, 10);
        assert_eq!(v.max_sanity, 41);
    }

    #[test]
    fn worked_example_level_seven() {
        let v = compute_max_vitals(2, 1, 7);
        assert_eq!(v.max_health, 26);
        assert_eq!(v.max_energy, 21);
        assert_eq!(v.max_sanity, 39);
    }

    #[test]
    fn high_mysticism_cancels_sanity_cost() {
        // every k in 9..=5 is <= 9, so no reduction applies
        let v = compute_max_vitals(0, 9, 5);
        assert_eq!(v.max_sanity, 50 + 90);
    }

    #[test]
    fn sanity_never_negative() {
        let v = compute_max_vitals(0, 0, 0);
        // 9+8+...+0 = 45 < 50
        assert_eq!(v.max_sanity, 5);
        assert!(compute_max_vitals(0, 0, 0).max_sanity >= 0);
    }

    #[test]
    fn level_above_nine_has_no_sanity_cost() {
        let v = compute_max_vitals(1, 1, 10);
        assert_eq!(v.max_health, 11);
        assert_eq!(v.max_sanity, 60);
    }

    #[test]
    fn health_and_energy_floors_hold_and_grow() {
        for vigor in 0..6u32 {
            for mysticism in 0..6u32 {
                let mut previous: Option<MaxVitals> = None;
                for level in (0..=9u8).rev() {
                    let v = compute_max_vitals(vigor, mysticism, level);
                    assert!(v.max_health >= 10 + i64::from(vigor));
                    assert!(v.max_energy >= 10 + i64::from(mysticism));
                    if let Some(p) = previous {
                        assert!(v.max_health >= p.max_health);
                        assert!(v.max_energy >= p.max_energy);
                    }
                    previous = Some(v);
                }
            }
        }
    }

    #[test]
    fn pool_examples() {
        let ledger = SkillLedger::new();
        assert_eq!(compute_skill_pool(3, 9, &ledger).total_available, 8);
        assert_eq!(compute_skill_pool(3, 6, &ledger).total_available, 23);
    }

    #[test]
    fn overspend_is_reported_not_rejected() {
        let mut ledger = SkillLedger::new();
        ledger.set_trained("Stealth", 6);
        ledger.set_trained("Alchemy", 4);
        let pool = compute_skill_pool(0, 9, &ledger);
        assert_eq!(pool.total_available, 5);
        assert_eq!(pool.spent, 10);
        assert_eq!(pool.remaining, -5);
        assert!(pool.is_over_budget());
    }

    #[test]
    fn extra_points_do_not_touch_the_pool() {
        let mut ledger = SkillLedger::new();
        ledger.set_trained("Stealth", 2);
        let before = compute_skill_pool(1, 8, &ledger);
        ledger.set_extra("Stealth", 7);
        ledger.set_extra("Religion", 3);
        let after = compute_skill_pool(1, 8, &ledger);
        assert_eq!(before, after);
    }

    #[test]
    fn calculators_are_repeatable() {
        assert_eq!(compute_max_vitals(3, 4, 2), compute_max_vitals(3, 4, 2));
        let ledger = SkillLedger::new();
        assert_eq!(compute_skill_pool(2, 3, &ledger), compute_skill_pool(2, 3, &ledger));
    }

    #[test]
    fn applying_proposal_clamps_currents() {
        let mut c = Character::new("Audrey");
        c.vitals.health = Resource { current: 30, max: 30 };
        c.vitals.energy = Resource { current: 5, max: 30 };
        c.vitals.sanity = Resource { current: 60, max: 60 };
        let proposal = c.propose_vitals();
        assert_eq!(proposal.previous.max_health, 30);
        assert_eq!(proposal.proposed, compute_max_vitals(0, 0, 9));
        proposal.apply(&mut c.vitals);
        assert_eq!(c.vitals.health, Resource { current: 10, max: 10 });
        assert_eq!(c.vitals.energy, Resource { current: 5, max: 10 });
        assert_eq!(c.vitals.sanity, Resource { current: 41, max: 41 });
    }

    #[test]
    fn proposal_lists_old_and_new() {
        let c = Character::new("Alger");
        let text = c.propose_vitals().to_string();
        assert!(text.contains("Sanity"));
        assert!(text.contains("10 -> 41"));
    }
}
