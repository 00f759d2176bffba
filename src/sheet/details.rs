//! Narrative parts of a character sheet: inventory, abilities, traits,
//! talents, the personal questionnaire and the soul artifact.
//!
//! Everything here is serde-defaulted on [`Character`] so records written
//! before these fields existed still load.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sheet::errors::SheetError;
use crate::sheet::types::{AttributeKind, Character};
use crate::validation::{validate_title, MAX_TITLE};

/// Highest grade a sealed artifact can carry.
pub const MAX_ARTIFACT_GRADE: u8 = 3;

/// Anything listed on the sheet that can be removed by id or by name.
pub trait SheetEntry {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sealed_artifact: bool,
    /// 0 (most dangerous) to 3; only meaningful for sealed artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<u8>,
}

/// Shared shape of abilities and traits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Free text such as "10 Spirituality".
    #[serde(default)]
    pub cost: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TalentKind {
    Generic,
    Special,
    Combat,
    Mundane,
}

impl TalentKind {
    pub const ALL: [TalentKind; 4] = [
        TalentKind::Generic,
        TalentKind::Special,
        TalentKind::Combat,
        TalentKind::Mundane,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TalentKind::Generic => "Generic",
            TalentKind::Special => "Special",
            TalentKind::Combat => "Combat",
            TalentKind::Mundane => "Mundane",
        }
    }
}

impl fmt::Display for TalentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TalentKind {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        TalentKind::ALL
            .into_iter()
            .find(|k| k.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| SheetError::InvalidInput(format!("unknown talent type: {}", needle)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Talent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: TalentKind,
}

macro_rules! sheet_entry {
    ($($ty:ty),+) => {
        $(impl SheetEntry for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn name(&self) -> &str {
                &self.name
            }
        })+
    };
}

sheet_entry!(Item, Ability, Talent);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoulArtifact {
    pub name: String,
    pub abilities: String,
    pub disadvantage: String,
    pub sealing_method: String,
}

impl SoulArtifact {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.abilities.is_empty()
            && self.disadvantage.is_empty()
            && self.sealing_method.is_empty()
    }
}

macro_rules! personal_fields {
    ($($variant:ident => $field:ident, $label:literal;)+) => {
        /// Background and questionnaire answers, all free text.
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct PersonalInfo {
            $(pub $field: String,)+
            pub soul_artifact: SoulArtifact,
        }

        /// Names one free-text field of [`PersonalInfo`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum PersonalField {
            $($variant,)+
        }

        impl PersonalField {
            pub const ALL: &'static [PersonalField] = &[$(PersonalField::$variant),+];

            /// Field name as stored, e.g. `origin_country`.
            pub fn key(self) -> &'static str {
                match self {
                    $(PersonalField::$variant => stringify!($field),)+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $(PersonalField::$variant => $label,)+
                }
            }
        }

        impl PersonalInfo {
            pub fn get(&self, field: PersonalField) -> &str {
                match field {
                    $(PersonalField::$variant => &self.$field,)+
                }
            }

            pub fn get_mut(&mut self, field: PersonalField) -> &mut String {
                match field {
                    $(PersonalField::$variant => &mut self.$field,)+
                }
            }
        }
    };
}

personal_fields! {
    About => about, "About";
    Age => age, "Age";
    OriginCountry => origin_country, "Country of origin";
    CurrentCountry => current_country, "Current country";
    OriginCity => origin_city, "City of origin";
    CurrentCity => current_city, "Current city";
    NativeLanguage => native_language, "Native language";
    SpokenLanguages => spoken_languages, "Spoken languages";
    Profession => profession, "Profession";
    Relatives => relatives, "Relatives";
    Friends => friends, "Friends";
    Addendums => addendums, "Addendums";
    Regret => regret, "Greatest regret";
    Fear => fear, "Greatest fear";
    LossOfControl => loss_of_control, "When do you lose control";
    Improvement => improvement, "What would you improve";
    Hobby => hobby, "Hobby";
    Disgust => disgust, "What disgusts you";
    Pride => pride, "Proudest moment";
    Secret => secret, "Secret";
    FamilyAndHome => family_and_home, "Family and home";
    ImportantPeople => important_people, "Important people";
    Rumors => rumors, "Rumors about you";
    RumorsTruth => rumors_truth, "Truth behind the rumors";
    Desire => desire, "Deepest desire";
}

impl FromStr for PersonalField {
    type Err = SheetError;

    /// `origin_country`, `origin-country` and `OriginCountry` all match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squash = |v: &str| -> String {
            v.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .map(|c| c.to_ascii_lowercase())
                .collect()
        };
        let needle = squash(s);
        PersonalField::ALL
            .iter()
            .copied()
            .find(|f| squash(f.key()) == needle)
            .ok_or_else(|| SheetError::InvalidInput(format!("unknown personal field: {}", s.trim())))
    }
}

/// Exact id, then unique case-insensitive name, then unique id prefix.
fn locate<T: SheetEntry>(entries: &[T], needle: &str, what: &str) -> Result<usize, SheetError> {
    if let Some(idx) = entries.iter().position(|e| e.id() == needle) {
        return Ok(idx);
    }
    let matching = |pred: fn(&T, &str) -> bool| -> Vec<usize> {
        entries
            .iter()
            .enumerate()
            .filter(|(_, e)| pred(e, needle))
            .map(|(i, _)| i)
            .collect()
    };
    let by_name = matching(|e, n| e.name().eq_ignore_ascii_case(n.trim()));
    if by_name.len() == 1 {
        return Ok(by_name[0]);
    }
    let by_prefix = matching(|e, n| !n.is_empty() && e.id().starts_with(n));
    match by_prefix.as_slice() {
        [idx] => Ok(*idx),
        [] if by_name.is_empty() => Err(SheetError::NotFound(format!("{}: {}", what, needle))),
        _ => Err(SheetError::InvalidInput(format!(
            "'{}' matches more than one {}; use the id",
            needle, what
        ))),
    }
}

fn entry_name(field: &'static str, name: &str) -> Result<String, SheetError> {
    validate_title(field, name, MAX_TITLE).map_err(|e| SheetError::InvalidInput(e.to_string()))
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Character {
    pub fn add_item(
        &mut self,
        name: &str,
        description: &str,
        sealed_artifact: bool,
        grade: Option<u8>,
    ) -> Result<&Item, SheetError> {
        let name = entry_name("item name", name)?;
        if let Some(g) = grade {
            if !sealed_artifact {
                return Err(SheetError::InvalidInput(
                    "only sealed artifacts carry a grade".to_string(),
                ));
            }
            if g > MAX_ARTIFACT_GRADE {
                return Err(SheetError::InvalidInput(format!(
                    "artifact grade must be 0-{}, got {}",
                    MAX_ARTIFACT_GRADE, g
                )));
            }
        }
        self.inventory.push(Item {
            id: new_id(),
            name,
            description: description.trim().to_string(),
            sealed_artifact,
            grade,
        });
        Ok(&self.inventory[self.inventory.len() - 1])
    }

    pub fn remove_item(&mut self, needle: &str) -> Result<Item, SheetError> {
        let idx = locate(&self.inventory, needle, "item")?;
        Ok(self.inventory.remove(idx))
    }

    pub fn add_ability(&mut self, name: &str, description: &str, cost: &str) -> Result<&Ability, SheetError> {
        let ability = new_ability("ability name", name, description, cost)?;
        self.abilities.push(ability);
        Ok(&self.abilities[self.abilities.len() - 1])
    }

    pub fn remove_ability(&mut self, needle: &str) -> Result<Ability, SheetError> {
        let idx = locate(&self.abilities, needle, "ability")?;
        Ok(self.abilities.remove(idx))
    }

    pub fn add_trait(&mut self, name: &str, description: &str, cost: &str) -> Result<&Ability, SheetError> {
        let t = new_ability("trait name", name, description, cost)?;
        self.traits.push(t);
        Ok(&self.traits[self.traits.len() - 1])
    }

    pub fn remove_trait(&mut self, needle: &str) -> Result<Ability, SheetError> {
        let idx = locate(&self.traits, needle, "trait")?;
        Ok(self.traits.remove(idx))
    }

    pub fn add_talent(
        &mut self,
        name: &str,
        kind: TalentKind,
        description: &str,
    ) -> Result<&Talent, SheetError> {
        let name = entry_name("talent name", name)?;
        self.talents.push(Talent {
            id: new_id(),
            name,
            description: description.trim().to_string(),
            kind,
        });
        Ok(&self.talents[self.talents.len() - 1])
    }

    pub fn remove_talent(&mut self, needle: &str) -> Result<Talent, SheetError> {
        let idx = locate(&self.talents, needle, "talent")?;
        Ok(self.talents.remove(idx))
    }

    pub fn set_personal(&mut self, field: PersonalField, value: &str) {
        *self.personal.get_mut(field) = value.trim().to_string();
    }

    pub fn set_soul_artifact(&mut self, artifact: SoulArtifact) {
        self.personal.soul_artifact = artifact;
    }

    pub fn set_backstory(&mut self, text: &str) {
        self.backstory = text.trim().to_string();
    }

    /// Set the origin and its optional sub-choice. An empty origin clears both.
    pub fn set_origin(&mut self, origin: &str, choice: Option<&str>) {
        let origin = origin.trim();
        if origin.is_empty() {
            self.origin = None;
            self.origin_choice = None;
            return;
        }
        self.origin = Some(origin.to_string());
        self.origin_choice = choice
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
    }

    /// Rename how an attribute is shown; `None` or blank restores the default.
    pub fn relabel_attribute(&mut self, kind: AttributeKind, label: Option<&str>) {
        match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(l) => {
                self.attribute_labels.insert(kind, l.to_string());
            }
            None => {
                self.attribute_labels.remove(&kind);
            }
        }
    }

    pub fn attribute_label(&self, kind: AttributeKind) -> &str {
        self.attribute_labels
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.label())
    }

    /// Rename how a skill is shown. Points stay keyed by the original name.
    pub fn relabel_skill(&mut self, skill: &str, label: Option<&str>) {
        match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(l) => {
                self.skill_labels.insert(skill.to_string(), l.to_string());
            }
            None => {
                self.skill_labels.remove(skill);
            }
        }
    }

    pub fn skill_label<'a>(&'a self, skill: &'a str) -> &'a str {
        self.skill_labels.get(skill).map(String::as_str).unwrap_or(skill)
    }
}

fn new_ability(field: &'static str, name: &str, description: &str, cost: &str) -> Result<Ability, SheetError> {
    Ok(Ability {
        id: new_id(),
        name: entry_name(field, name)?,
        description: description.trim().to_string(),
        cost: cost.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_add_and_remove_by_name_or_prefix() {
        let mut c = Character::new("Klein");
        c.add_item("Revolver", "Six rounds", false, None).unwrap();
        let sealed = c.add_item("Creeping Hunger", "A glove", true, Some(1)).unwrap().id.clone();
        assert!(c.add_item("Coin", "", false, Some(2)).is_err());
        assert!(c.add_item("Too dangerous", "", true, Some(4)).is_err());
        assert!(c.add_item("   ", "", false, None).is_err());

        assert_eq!(c.remove_item(&sealed[..8]).unwrap().name, "Creeping Hunger");
        assert_eq!(c.remove_item("revolver").unwrap().name, "Revolver");
        assert!(matches!(c.remove_item("revolver"), Err(SheetError::NotFound(_))));
    }

    #[test]
    fn duplicate_names_need_an_id() {
        let mut c = Character::new("Klein");
        c.add_talent("Marksman", TalentKind::Combat, "").unwrap();
        c.add_talent("Marksman", TalentKind::Generic, "").unwrap();
        assert!(matches!(c.remove_talent("marksman"), Err(SheetError::InvalidInput(_))));
        let id = c.talents[1].id.clone();
        assert_eq!(c.remove_talent(&id).unwrap().kind, TalentKind::Generic);
        assert_eq!(c.talents.len(), 1);
    }

    #[test]
    fn abilities_and_traits_are_separate_lists() {
        let mut c = Character::new("Audrey");
        c.add_ability("Spectate", "Read emotions", "5 Spirituality").unwrap();
        c.add_trait("Observant", "", "").unwrap();
        assert!(c.remove_trait("Spectate").is_err());
        assert_eq!(c.remove_ability("spectate").unwrap().cost, "5 Spirituality");
        assert_eq!(c.traits.len(), 1);
    }

    #[test]
    fn personal_fields_parse_loosely() {
        assert_eq!("origin-country".parse::<PersonalField>().unwrap(), PersonalField::OriginCountry);
        assert_eq!("RumorsTruth".parse::<PersonalField>().unwrap(), PersonalField::RumorsTruth);
        assert!("favourite colour".parse::<PersonalField>().is_err());

        let mut c = Character::new("Derrick");
        c.set_personal(PersonalField::Fear, "  the dark  ");
        assert_eq!(c.personal.get(PersonalField::Fear), "the dark");
        assert_eq!(c.personal.fear, "the dark");
    }

    #[test]
    fn labels_fall_back_to_defaults() {
        let mut c = Character::new("Leonard");
        c.relabel_attribute(AttributeKind::Vigor, Some("Spirit"));
        assert_eq!(c.attribute_label(AttributeKind::Vigor), "Spirit");
        c.relabel_attribute(AttributeKind::Vigor, Some(" "));
        assert_eq!(c.attribute_label(AttributeKind::Vigor), "Vigor");

        c.relabel_skill("Occultism", Some("Mysteries"));
        assert_eq!(c.skill_label("Occultism"), "Mysteries");
        assert_eq!(c.skill_label("Stealth"), "Stealth");
    }

    #[test]
    fn origin_choice_cleared_with_origin() {
        let mut c = Character::new("Emlyn");
        c.set_origin("Soldier", Some("Gunslinger"));
        assert_eq!(c.origin_choice.as_deref(), Some("Gunslinger"));
        c.set_origin("", Some("ignored"));
        assert_eq!(c.origin, None);
        assert_eq!(c.origin_choice, None);
    }
}
