//! Per-user collection of character sheets.
//!
//! A roster always holds at least one character and tracks which one is active.
//! Saving a roster also publishes the active character under the user's snapshot
//! key so campaign game masters can pull it into a party.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::logutil::escape_log;
use crate::sheet::errors::SheetError;
use crate::sheet::types::Character;
use crate::storage::{keys, load_json, save_json, KeyValueStore};
use crate::validation::validate_character_name;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    owner: String,
    #[serde(default)]
    active_id: Option<String>,
    #[serde(default)]
    characters: Vec<Character>,
}

impl Roster {
    /// Fresh roster holding one default character.
    pub fn new(owner: &str) -> Self {
        let first = Character::default();
        Self {
            owner: owner.to_string(),
            active_id: Some(first.id.clone()),
            characters: vec![first],
        }
    }

    /// Load the owner's roster, creating and saving a new one on first use.
    pub fn load_or_create<S: KeyValueStore + ?Sized>(
        store: &S,
        owner: &str,
    ) -> Result<Self, SheetError> {
        match load_json::<Roster, _>(store, &keys::roster(owner))? {
            Some(mut roster) => {
                if roster.characters.is_empty() {
                    warn!("roster for {} was empty; adding a default character", escape_log(owner));
                    roster = Roster::new(owner);
                    roster.save(store)?;
                }
                Ok(roster)
            }
            None => {
                info!("creating roster for {}", escape_log(owner));
                let mut roster = Roster::new(owner);
                roster.save(store)?;
                Ok(roster)
            }
        }
    }

    /// Persist the roster and publish the active character as the owner's snapshot.
    pub fn save<S: KeyValueStore + ?Sized>(&mut self, store: &S) -> Result<(), SheetError> {
        self.active_mut().touch();
        save_json(store, &keys::roster(&self.owner), &*self)?;
        save_json(store, &keys::snapshot(&self.owner), self.active())?;
        Ok(())
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    fn active_index(&self) -> usize {
        self.active_id
            .as_deref()
            .and_then(|id| self.characters.iter().position(|c| c.id == id))
            .unwrap_or(0)
    }

    /// The active character, or the first one when the stored id is stale.
    pub fn active(&self) -> &Character {
        &self.characters[self.active_index()]
    }

    pub fn active_mut(&mut self) -> &mut Character {
        let idx = self.active_index();
        &mut self.characters[idx]
    }

    /// Resolve a full id, a unique id prefix, or a case-insensitive name.
    fn resolve(&self, needle: &str) -> Result<usize, SheetError> {
        if let Some(idx) = self.characters.iter().position(|c| c.id == needle) {
            return Ok(idx);
        }
        let by_name: Vec<usize> = self
            .characters
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name.eq_ignore_ascii_case(needle))
            .map(|(i, _)| i)
            .collect();
        if by_name.len() == 1 {
            return Ok(by_name[0]);
        }
        let by_prefix: Vec<usize> = self
            .characters
            .iter()
            .enumerate()
            .filter(|(_, c)| !needle.is_empty() && c.id.starts_with(needle))
            .map(|(i, _)| i)
            .collect();
        match by_prefix.as_slice() {
            [idx] => Ok(*idx),
            [] if by_name.is_empty() => {
                Err(SheetError::NotFound(format!("character: {}", needle)))
            }
            _ => Err(SheetError::InvalidInput(format!(
                "'{}' matches more than one character; use the id",
                needle
            ))),
        }
    }

    /// Add a character and make it active. Without a name one is numbered.
    pub fn create(&mut self, name: Option<&str>) -> Result<&Character, SheetError> {
        let name = match name {
            Some(n) => {
                validate_character_name(n).map_err(|e| SheetError::InvalidInput(e.to_string()))?
            }
            None => format!("Character {}", self.characters.len() + 1),
        };
        let character = Character::new(&name);
        info!("{} created character {}", escape_log(&self.owner), escape_log(&name));
        self.active_id = Some(character.id.clone());
        self.characters.push(character);
        Ok(self.active())
    }

    pub fn select(&mut self, needle: &str) -> Result<&Character, SheetError> {
        let idx = self.resolve(needle)?;
        self.active_id = Some(self.characters[idx].id.clone());
        Ok(&self.characters[idx])
    }

    /// Remove a character. The last remaining character cannot be deleted.
    pub fn delete(&mut self, needle: &str) -> Result<Character, SheetError> {
        let idx = self.resolve(needle)?;
        if self.characters.len() <= 1 {
            return Err(SheetError::LastCharacter);
        }
        let was_active = idx == self.active_index();
        let removed = self.characters.remove(idx);
        if was_active {
            self.active_id = self.characters.first().map(|c| c.id.clone());
        }
        info!("{} deleted character {}", escape_log(&self.owner), escape_log(&removed.name));
        Ok(removed)
    }

    pub fn find(&self, needle: &str) -> Result<&Character, SheetError> {
        let idx = self.resolve(needle)?;
        Ok(&self.characters[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn first_load_creates_and_publishes() {
        let store = MemoryStore::new();
        let roster = Roster::load_or_create(&store, "klein").unwrap();
        assert_eq!(roster.characters().len(), 1);
        let snap: Option<Character> = load_json(&store, &keys::snapshot("klein")).unwrap();
        assert_eq!(snap.unwrap().id, roster.active().id);
    }

    #[test]
    fn delete_refuses_last_character() {
        let mut roster = Roster::new("klein");
        let id = roster.active().id.clone();
        assert!(matches!(roster.delete(&id), Err(SheetError::LastCharacter)));
    }

    #[test]
    fn deleting_active_falls_back_to_first() {
        let mut roster = Roster::new("klein");
        let first = roster.active().id.clone();
        let second = roster.create(Some("Gehrman Sparrow")).unwrap().id.clone();
        assert_eq!(roster.active().id, second);
        roster.delete(&second).unwrap();
        assert_eq!(roster.active().id, first);
    }

    #[test]
    fn select_by_name_or_prefix() {
        let mut roster = Roster::new("klein");
        roster.create(Some("Dwayne Dantes")).unwrap();
        let first_id = roster.characters()[0].id.clone();
        roster.select(&first_id[..8]).unwrap();
        assert_eq!(roster.active().id, first_id);
        roster.select("dwayne dantes").unwrap();
        assert_eq!(roster.active().name, "Dwayne Dantes");
        assert!(matches!(roster.select("Nobody"), Err(SheetError::NotFound(_))));
    }

    #[test]
    fn unnamed_characters_are_numbered() {
        let mut roster = Roster::new("klein");
        assert_eq!(roster.create(None).unwrap().name, "Character 2");
    }
}
