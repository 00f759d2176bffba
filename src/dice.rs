//! Dice roller.
//!
//! Behavior:
//! - `roll(sides, modifier)`: one die, total = face + modifier; natural max is a
//!   critical success, natural 1 a critical failure
//! - `roll_percentile()`: d100 with no modifier; low is good, so faces at or below
//!   the success threshold crit-succeed and faces at or above the fail threshold crit-fail
//! - History is newest-first and capped; it can be saved per user between runs

use std::collections::VecDeque;

use rand::rngs::ThreadRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sheet::errors::SheetError;
use crate::storage::{keys, load_json, save_json, KeyValueStore};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const PERCENTILE_SIDES: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Crit {
    Success,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub sides: u32,
    pub total: i64,
    pub dice: Vec<u32>,
    pub modifier: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<Crit>,
}

impl std::fmt::Display for RollResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let faces: Vec<String> = self.dice.iter().map(|d| d.to_string()).collect();
        write!(f, "d{} [{}]", self.sides, faces.join(", "))?;
        if self.modifier != 0 {
            write!(f, " {:+}", self.modifier)?;
        }
        write!(f, " = {}", self.total)?;
        match self.crit {
            Some(Crit::Success) => write!(f, " (critical success)"),
            Some(Crit::Fail) => write!(f, " (critical failure)"),
            None => Ok(()),
        }
    }
}

/// Crit thresholds for the percentile die.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentileThresholds {
    pub success_at_or_below: u32,
    pub fail_at_or_above: u32,
}

impl Default for PercentileThresholds {
    fn default() -> Self {
        Self {
            success_at_or_below: 5,
            fail_at_or_above: 96,
        }
    }
}

/// Parse `d20`, `D6`, `20` or `d%` into a side count.
pub fn parse_sides(spec: &str) -> Result<u32, SheetError> {
    let trimmed = spec.trim();
    let digits = trimmed
        .strip_prefix('d')
        .or_else(|| trimmed.strip_prefix('D'))
        .unwrap_or(trimmed);
    if digits == "%" {
        return Ok(PERCENTILE_SIDES);
    }
    let sides: u32 = digits
        .parse()
        .map_err(|_| SheetError::InvalidInput(format!("not a die: {}", spec)))?;
    if sides < 2 {
        return Err(SheetError::InvalidInput(format!(
            "a die needs at least 2 sides, got {}",
            sides
        )));
    }
    Ok(sides)
}

pub struct DiceRoller<R: Rng = ThreadRng> {
    rng: R,
    history: VecDeque<RollResult>,
    limit: usize,
    percentile: PercentileThresholds,
}

impl DiceRoller<ThreadRng> {
    pub fn new(limit: usize) -> Self {
        Self::with_rng(rand::thread_rng(), limit)
    }
}

impl<R: Rng> DiceRoller<R> {
    pub fn with_rng(rng: R, limit: usize) -> Self {
        Self {
            rng,
            history: VecDeque::new(),
            limit,
            percentile: PercentileThresholds::default(),
        }
    }

    pub fn with_percentile_thresholds(mut self, thresholds: PercentileThresholds) -> Self {
        self.percentile = thresholds;
        self
    }

    /// Seed the history with earlier results (newest first), trimmed to the limit.
    pub fn with_history(mut self, history: Vec<RollResult>) -> Self {
        self.history = history.into_iter().take(self.limit).collect();
        self
    }

    fn record(&mut self, result: RollResult) -> RollResult {
        self.history.push_front(result.clone());
        self.history.truncate(self.limit);
        result
    }

    /// Roll one die and add `modifier`.
    pub fn roll(&mut self, sides: u32, modifier: i64) -> Result<RollResult, SheetError> {
        if sides < 2 {
            return Err(SheetError::InvalidInput(format!(
                "a die needs at least 2 sides, got {}",
                sides
            )));
        }
        let face = self.rng.gen_range(1..=sides);
        let total = i64::from(face).checked_add(modifier).ok_or_else(|| {
            SheetError::InvalidInput(format!("modifier {} is out of range", modifier))
        })?;
        let crit = if face == sides {
            Some(Crit::Success)
        } else if face == 1 {
            Some(Crit::Fail)
        } else {
            None
        };
        Ok(self.record(RollResult {
            sides,
            total,
            dice: vec![face],
            modifier,
            crit,
        }))
    }

    /// Roll a d100 check.
    pub fn roll_percentile(&mut self) -> RollResult {
        let face = self.rng.gen_range(1..=PERCENTILE_SIDES);
        let crit = if face <= self.percentile.success_at_or_below {
            Some(Crit::Success)
        } else if face >= self.percentile.fail_at_or_above {
            Some(Crit::Fail)
        } else {
            None
        };
        self.record(RollResult {
            sides: PERCENTILE_SIDES,
            total: i64::from(face),
            dice: vec![face],
            modifier: 0,
            crit,
        })
    }

    /// Newest first.
    pub fn history(&self) -> impl Iterator<Item = &RollResult> {
        self.history.iter()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn load_history<S: KeyValueStore + ?Sized>(
        self,
        store: &S,
        user: &str,
    ) -> Result<Self, SheetError> {
        let saved: Vec<RollResult> =
            load_json(store, &keys::dice_history(user))?.unwrap_or_default();
        Ok(self.with_history(saved))
    }

    pub fn save_history<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        user: &str,
    ) -> Result<(), SheetError> {
        let list: Vec<&RollResult> = self.history.iter().collect();
        save_json(store, &keys::dice_history(user), &list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded(limit: usize) -> DiceRoller<StdRng> {
        DiceRoller::with_rng(StdRng::seed_from_u64(7), limit)
    }

    #[test]
    fn faces_stay_in_range_and_crits_match_faces() {
        let mut roller = seeded(1000);
        for _ in 0..500 {
            let r = roller.roll(6, 2).unwrap();
            let face = r.dice[0];
            assert!((1..=6).contains(&face));
            assert_eq!(r.total, i64::from(face) + 2);
            match face {
                6 => assert_eq!(r.crit, Some(Crit::Success)),
                1 => assert_eq!(r.crit, Some(Crit::Fail)),
                _ => assert_eq!(r.crit, None),
            }
        }
    }

    #[test]
    fn overflowing_modifier_is_rejected_and_not_recorded() {
        let mut roller = seeded(5);
        assert!(matches!(roller.roll(20, i64::MAX), Err(SheetError::InvalidInput(_))));
        assert_eq!(roller.history().count(), 0);
        let low = roller.roll(20, i64::MIN).unwrap();
        assert_eq!(low.total, i64::MIN + i64::from(low.dice[0]));
    }

    #[test]
    fn percentile_crits_use_thresholds() {
        let mut roller = seeded(1000);
        for _ in 0..1000 {
            let r = roller.roll_percentile();
            let face = r.dice[0];
            assert!((1..=100).contains(&face));
            assert_eq!(r.modifier, 0);
            let expected = if face <= 5 {
                Some(Crit::Success)
            } else if face >= 96 {
                Some(Crit::Fail)
            } else {
                None
            };
            assert_eq!(r.crit, expected);
        }
    }

    #[test]
    fn history_is_newest_first_and_capped() {
        let mut roller = seeded(3);
        let mut rolled = Vec::new();
        for _ in 0..5 {
            rolled.push(roller.roll(20, 0).unwrap());
        }
        let history: Vec<&RollResult> = roller.history().collect();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0], &rolled[4]);
        assert_eq!(history[2], &rolled[2]);
        roller.clear();
        assert_eq!(roller.history().count(), 0);
    }

    #[test]
    fn one_sided_die_rejected() {
        let mut roller = seeded(5);
        assert!(roller.roll(1, 0).is_err());
        assert!(parse_sides("d1").is_err());
    }

    #[test]
    fn parses_die_notation() {
        assert_eq!(parse_sides("d20").unwrap(), 20);
        assert_eq!(parse_sides("D8").unwrap(), 8);
        assert_eq!(parse_sides("12").unwrap(), 12);
        assert_eq!(parse_sides("d%").unwrap(), 100);
        assert!(parse_sides("dx").is_err());
    }

    #[test]
    fn display_shows_modifier_and_crit() {
        let r = RollResult {
            sides: 20,
            total: 23,
            dice: vec![20],
            modifier: 3,
            crit: Some(Crit::Success),
        };
        assert_eq!(r.to_string(), "d20 [20] +3 = 23 (critical success)");
    }
}
