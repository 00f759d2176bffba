use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sheet::details::{Ability, Item, PersonalInfo, Talent};
use crate::sheet::errors::SheetError;

/// Least advanced sequence; every new character starts here.
pub const STARTING_SEQUENCE: u8 = 9;
/// Most advanced sequence.
pub const FINAL_SEQUENCE: u8 = 0;

pub const DEFAULT_CHARACTER_NAME: &str = "New Beyonder";
pub const DEFAULT_PATHWAY: &str = "The Fool";

/// The six base attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Strength,
    Agility,
    Intelligence,
    Vigor,
    Mysticism,
    Presence,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 6] = [
        AttributeKind::Strength,
        AttributeKind::Agility,
        AttributeKind::Intelligence,
        AttributeKind::Vigor,
        AttributeKind::Mysticism,
        AttributeKind::Presence,
    ];

    /// Three-letter code shown next to skills.
    pub fn short_name(self) -> &'static str {
        match self {
            AttributeKind::Strength => "STR",
            AttributeKind::Agility => "AGI",
            AttributeKind::Intelligence => "INT",
            AttributeKind::Vigor => "VIG",
            AttributeKind::Mysticism => "MYS",
            AttributeKind::Presence => "PRE",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttributeKind::Strength => "Strength",
            AttributeKind::Agility => "Agility",
            AttributeKind::Intelligence => "Intelligence",
            AttributeKind::Vigor => "Vigor",
            AttributeKind::Mysticism => "Mysticism",
            AttributeKind::Presence => "Presence",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AttributeKind {
    type Err = SheetError;

    /// Accepts full names and short codes, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        AttributeKind::ALL
            .into_iter()
            .find(|kind| {
                kind.label().eq_ignore_ascii_case(needle)
                    || kind.short_name().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| SheetError::InvalidInput(format!("unknown attribute: {}", needle)))
    }
}

/// Base attribute scores. Unsigned, so negative scores are rejected when parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub strength: u32,
    pub agility: u32,
    pub intelligence: u32,
    pub vigor: u32,
    pub mysticism: u32,
    pub presence: u32,
}

impl Attributes {
    pub fn get(&self, kind: AttributeKind) -> u32 {
        match kind {
            AttributeKind::Strength => self.strength,
            AttributeKind::Agility => self.agility,
            AttributeKind::Intelligence => self.intelligence,
            AttributeKind::Vigor => self.vigor,
            AttributeKind::Mysticism => self.mysticism,
            AttributeKind::Presence => self.presence,
        }
    }

    pub fn set(&mut self, kind: AttributeKind, value: u32) {
        let slot = match kind {
            AttributeKind::Strength => &mut self.strength,
            AttributeKind::Agility => &mut self.agility,
            AttributeKind::Intelligence => &mut self.intelligence,
            AttributeKind::Vigor => &mut self.vigor,
            AttributeKind::Mysticism => &mut self.mysticism,
            AttributeKind::Presence => &mut self.presence,
        };
        *slot = value;
    }
}

/// A (current, maximum) resource pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub current: i64,
    pub max: i64,
}

impl Resource {
    pub fn full(max: i64) -> Self {
        Self { current: max, max }
    }

    /// Set the current value, clamped into `[0, max]`.
    pub fn set_current(&mut self, value: i64) {
        self.current = value.clamp(0, self.max.max(0));
    }

    /// Add `delta` (may be negative) to the current value, clamped into `[0, max]`.
    pub fn adjust(&mut self, delta: i64) {
        self.set_current(self.current.saturating_add(delta));
    }

    /// Replace the maximum, pulling `current` down if it now exceeds it.
    pub fn set_max(&mut self, max: i64) {
        self.max = max;
        self.current = self.current.min(max);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VitalKind {
    Health,
    Energy,
    Sanity,
}

impl VitalKind {
    pub const ALL: [VitalKind; 3] = [VitalKind::Health, VitalKind::Energy, VitalKind::Sanity];

    pub fn label(self) -> &'static str {
        match self {
            VitalKind::Health => "Health",
            VitalKind::Energy => "Energy",
            VitalKind::Sanity => "Sanity",
        }
    }
}

impl fmt::Display for VitalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for VitalKind {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "health" | "hp" => Ok(VitalKind::Health),
            "energy" | "ee" | "spirituality" => Ok(VitalKind::Energy),
            "sanity" | "san" => Ok(VitalKind::Sanity),
            other => Err(SheetError::InvalidInput(format!("unknown vital: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: Resource,
    pub energy: Resource,
    pub sanity: Resource,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            health: Resource::full(10),
            energy: Resource::full(10),
            sanity: Resource::full(10),
        }
    }
}

impl Vitals {
    pub fn get(&self, kind: VitalKind) -> &Resource {
        match kind {
            VitalKind::Health => &self.health,
            VitalKind::Energy => &self.energy,
            VitalKind::Sanity => &self.sanity,
        }
    }

    pub fn get_mut(&mut self, kind: VitalKind) -> &mut Resource {
        match kind {
            VitalKind::Health => &mut self.health,
            VitalKind::Energy => &mut self.energy,
            VitalKind::Sanity => &mut self.sanity,
        }
    }

    /// Sanity at zero marks the character as lost to corruption.
    pub fn is_corrupted(&self) -> bool {
        self.sanity.current == 0
    }

    /// Sanity below 30% of its maximum.
    pub fn is_sanity_low(&self) -> bool {
        self.sanity.current * 10 < self.sanity.max * 3
    }

    /// Health below 20% of its maximum.
    pub fn is_health_critical(&self) -> bool {
        self.health.current * 10 < self.health.max * 2
    }
}

/// Points invested in one skill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    /// Drawn from the skill pool.
    #[serde(default)]
    pub trained: u32,
    /// Outside bonuses; never counted against the pool.
    #[serde(default)]
    pub extra: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SkillEntry {
    pub fn total(&self) -> u64 {
        u64::from(self.trained) + u64::from(self.extra)
    }

    pub fn is_trained(&self) -> bool {
        self.trained > 0
    }
}

/// Skill name -> invested points. Upserts only; no pool validation happens here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillLedger {
    entries: BTreeMap<String, SkillEntry>,
}

impl SkillLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, skill: &str) -> SkillEntry {
        self.entries.get(skill).cloned().unwrap_or_default()
    }

    pub fn set_trained(&mut self, skill: &str, value: u32) {
        self.entries.entry(skill.to_string()).or_default().trained = value;
    }

    pub fn set_extra(&mut self, skill: &str, value: u32) {
        self.entries.entry(skill.to_string()).or_default().extra = value;
    }

    pub fn set_notes(&mut self, skill: &str, notes: Option<String>) {
        self.entries.entry(skill.to_string()).or_default().notes = notes;
    }

    /// Sum of trained points across all entries.
    pub fn spent(&self) -> i64 {
        self.entries.values().map(|e| i64::from(e.trained)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SkillEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A player character sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub pathway: String,
    /// Advancement level: 9 (weakest) down to 0.
    pub sequence: u8,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub vitals: Vitals,
    #[serde(default)]
    pub skills: SkillLedger,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_choice: Option<String>,
    #[serde(default)]
    pub backstory: String,
    #[serde(default)]
    pub abilities: Vec<Ability>,
    #[serde(default)]
    pub traits: Vec<Ability>,
    #[serde(default)]
    pub talents: Vec<Talent>,
    #[serde(default)]
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub personal: PersonalInfo,
    /// Display renames; the underlying keys never change.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attribute_labels: BTreeMap<AttributeKind, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub skill_labels: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Character {
    pub fn new(name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            pathway: DEFAULT_PATHWAY.to_string(),
            sequence: STARTING_SEQUENCE,
            attributes: Attributes::default(),
            vitals: Vitals::default(),
            skills: SkillLedger::new(),
            notes: String::new(),
            origin: None,
            origin_choice: None,
            backstory: String::new(),
            abilities: Vec::new(),
            traits: Vec::new(),
            talents: Vec::new(),
            inventory: Vec::new(),
            personal: PersonalInfo::default(),
            attribute_labels: BTreeMap::new(),
            skill_labels: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Change the advancement level. Only 0..=9 is meaningful.
    pub fn set_sequence(&mut self, sequence: u8) -> Result<(), SheetError> {
        if sequence > STARTING_SEQUENCE {
            return Err(SheetError::InvalidInput(format!(
                "sequence must be between {} and {}, got {}",
                FINAL_SEQUENCE, STARTING_SEQUENCE, sequence
            )));
        }
        self.sequence = sequence;
        Ok(())
    }
}

impl Default for Character {
    fn default() -> Self {
        Self::new(DEFAULT_CHARACTER_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_character_starts_at_defaults() {
        let c = Character::new("Klein");
        assert_eq!(c.sequence, 9);
        assert_eq!(c.attributes, Attributes::default());
        assert_eq!(c.vitals.health, Resource { current: 10, max: 10 });
        assert!(c.skills.is_empty());
    }

    #[test]
    fn attribute_parsing_accepts_codes_and_names() {
        assert_eq!("vig".parse::<AttributeKind>().unwrap(), AttributeKind::Vigor);
        assert_eq!("Mysticism".parse::<AttributeKind>().unwrap(), AttributeKind::Mysticism);
        assert!("luck".parse::<AttributeKind>().is_err());
    }

    #[test]
    fn resource_adjust_clamps() {
        let mut r = Resource::full(10);
        r.adjust(-15);
        assert_eq!(r.current, 0);
        r.adjust(25);
        assert_eq!(r.current, 10);
        r.set_max(4);
        assert_eq!(r.current, 4);
    }

    #[test]
    fn sequence_above_nine_rejected() {
        let mut c = Character::default();
        assert!(c.set_sequence(10).is_err());
        c.set_sequence(0).unwrap();
        assert_eq!(c.sequence, 0);
    }

    #[test]
    fn ledger_upserts_keep_other_component() {
        let mut ledger = SkillLedger::new();
        ledger.set_trained("Stealth", 3);
        ledger.set_extra("Stealth", 2);
        ledger.set_trained("Stealth", 1);
        let e = ledger.entry("Stealth");
        assert_eq!((e.trained, e.extra), (1, 2));
        assert_eq!(ledger.spent(), 1);
    }

    #[test]
    fn records_without_narrative_fields_still_load() {
        let mut c = Character::new("Klein");
        c.relabel_attribute(AttributeKind::Vigor, Some("Spirit"));
        let mut value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["attribute_labels"]["vigor"], "Spirit");

        let obj = value.as_object_mut().unwrap();
        for key in ["backstory", "abilities", "traits", "talents", "inventory", "personal", "attribute_labels"] {
            obj.remove(key);
        }
        let old: Character = serde_json::from_value(value).unwrap();
        assert_eq!(old.name, "Klein");
        assert!(old.inventory.is_empty());
        assert_eq!(old.personal, PersonalInfo::default());
        assert_eq!(old.attribute_label(AttributeKind::Vigor), "Vigor");
    }
}
