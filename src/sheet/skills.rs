//! Reference table of skills and the attribute each one keys off.

use crate::sheet::types::AttributeKind;

/// Skill name -> governing attribute, in display order.
pub const SKILLS: &[(&str, AttributeKind)] = &[
    ("Acrobatics", AttributeKind::Agility),
    ("Fighting", AttributeKind::Strength),
    ("Marksmanship", AttributeKind::Agility),
    ("Blocking", AttributeKind::Vigor),
    ("Reflexes", AttributeKind::Agility),
    ("Rituals", AttributeKind::Mysticism),
    ("Symbolism", AttributeKind::Mysticism),
    ("Intuition", AttributeKind::Intelligence),
    ("Psychology", AttributeKind::Intelligence),
    ("Education", AttributeKind::Intelligence),
    ("Medicine", AttributeKind::Intelligence),
    ("Alchemy", AttributeKind::Intelligence),
    ("Crafting", AttributeKind::Agility),
    ("Cooking", AttributeKind::Presence),
    ("Diplomacy", AttributeKind::Presence),
    ("Intimidation", AttributeKind::Presence),
    ("Deception", AttributeKind::Presence),
    ("Investigation", AttributeKind::Intelligence),
    ("Perception", AttributeKind::Intelligence),
    ("Stealth", AttributeKind::Agility),
    ("Crime", AttributeKind::Agility),
    ("Constitution", AttributeKind::Vigor),
    ("Willpower", AttributeKind::Presence),
    ("Survival", AttributeKind::Intelligence),
    ("Animal Handling", AttributeKind::Presence),
    ("Athletics", AttributeKind::Strength),
    ("Current Affairs", AttributeKind::Intelligence),
    ("Religion", AttributeKind::Presence),
    ("Cryptozoology", AttributeKind::Intelligence),
];

/// Case-insensitive lookup returning the canonical skill name and its attribute.
pub fn find_skill(name: &str) -> Option<(&'static str, AttributeKind)> {
    let needle = name.trim();
    SKILLS
        .iter()
        .find(|(skill, _)| skill.eq_ignore_ascii_case(needle))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(
            find_skill("animal handling"),
            Some(("Animal Handling", AttributeKind::Presence))
        );
        assert_eq!(find_skill("  STEALTH "), Some(("Stealth", AttributeKind::Agility)));
        assert_eq!(find_skill("Piloting"), None);
    }

    #[test]
    fn table_has_no_duplicates() {
        let mut names: Vec<String> = SKILLS.iter().map(|(n, _)| n.to_lowercase()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), SKILLS.len());
    }
}
