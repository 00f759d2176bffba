//! # Campaign Book
//!
//! Campaigns hold session reports, dossiers on people and places, a free-form
//! evidence board, and the party: copies of each player's published character.
//!
//! Party entries are snapshots. They only change when the game master runs
//! [`CampaignBook::refresh_party`], which re-reads every member's latest
//! published character from the store. A player who has never published one
//! keeps their old copy.
//!
//! All campaigns live in one JSON document under [`keys::CAMPAIGNS`]; every
//! mutation is a read-modify-write of that document (last write wins).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logutil::escape_log;
use crate::sheet::errors::SheetError;
use crate::sheet::types::Character;
use crate::storage::{keys, load_json, save_json, KeyValueStore};
use crate::validation::{validate_title, MAX_TITLE};

pub const MAX_THREAT_LEVEL: u8 = 9;

/// Implements `Display`/`FromStr` over a fixed label table.
macro_rules! labelled_enum {
    ($ty:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($ty::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $ty {
            type Err = SheetError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted: String = s.chars().filter(|c| c.is_alphanumeric()).collect();
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| {
                        let label: String =
                            v.label().chars().filter(|c| c.is_alphanumeric()).collect();
                        label.eq_ignore_ascii_case(&wanted)
                    })
                    .ok_or_else(|| {
                        SheetError::InvalidInput(format!(
                            "unknown {}: {}",
                            stringify!($ty),
                            s
                        ))
                    })
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    InProgress,
    Completed,
    Hiatus,
}

labelled_enum!(CampaignStatus {
    InProgress => "In Progress",
    Completed => "Completed",
    Hiatus => "Hiatus",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clearance {
    Level1,
    Level2,
    Level3,
    TopSecret,
}

labelled_enum!(Clearance {
    Level1 => "Level 1",
    Level2 => "Level 2",
    Level3 => "Level 3",
    TopSecret => "Top Secret",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Npc,
    Threat,
    Location,
    Artifact,
}

labelled_enum!(EntityKind {
    Npc => "NPC",
    Threat => "Threat",
    Location => "Location",
    Artifact => "Artifact",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    Active,
    Missing,
    Neutralized,
    Ally,
    Deceased,
}

labelled_enum!(EntityStatus {
    Active => "Active",
    Missing => "Missing",
    Neutralized => "Neutralized",
    Ally => "Ally",
    Deceased => "Deceased",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub content: String,
    pub clearance: Clearance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDossier {
    pub id: String,
    pub name: String,
    pub kind: EntityKind,
    pub status: EntityStatus,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_level: Option<u8>,
}

/// A player's character as last copied into the party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyMember {
    /// Username whose published snapshot this came from.
    pub owner: String,
    pub character: Character,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: CampaignStatus,
    pub gamemaster: String,
    #[serde(default)]
    pub sessions: Vec<SessionLog>,
    #[serde(default)]
    pub dossiers: Vec<EntityDossier>,
    #[serde(default)]
    pub party: Vec<PartyMember>,
    #[serde(default)]
    pub evidence: String,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn is_gm(&self, user: &str) -> bool {
        self.gamemaster.eq_ignore_ascii_case(user)
    }

    pub fn is_member(&self, user: &str) -> bool {
        self.party.iter().any(|m| m.owner.eq_ignore_ascii_case(user))
    }

    /// GMs see their campaigns; players see the ones they were invited to.
    pub fn visible_to(&self, user: &str) -> bool {
        self.is_gm(user) || self.is_member(user)
    }
}

/// Outcome of a party refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub refreshed: Vec<String>,
    /// Members with no published snapshot; their old copy was kept.
    pub missing: Vec<String>,
}

/// Campaign operations against an injected store.
pub struct CampaignBook<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> CampaignBook<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn load_all(&self) -> Result<Vec<Campaign>, SheetError> {
        Ok(load_json(self.store, keys::CAMPAIGNS)?.unwrap_or_default())
    }

    fn save_all(&self, campaigns: &[Campaign]) -> Result<(), SheetError> {
        save_json(self.store, keys::CAMPAIGNS, &campaigns)
    }

    /// Exact id or unique id prefix.
    fn resolve(campaigns: &[Campaign], needle: &str) -> Result<usize, SheetError> {
        if let Some(idx) = campaigns.iter().position(|c| c.id == needle) {
            return Ok(idx);
        }
        let matches: Vec<usize> = campaigns
            .iter()
            .enumerate()
            .filter(|(_, c)| !needle.is_empty() && c.id.starts_with(needle))
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [idx] => Ok(*idx),
            [] => Err(SheetError::NotFound(format!("campaign: {}", needle))),
            _ => Err(SheetError::InvalidInput(format!(
                "'{}' matches more than one campaign",
                needle
            ))),
        }
    }

    /// Load, mutate one campaign, save. Nothing is written if `f` fails.
    fn update<T, F>(&self, id: &str, f: F) -> Result<T, SheetError>
    where
        F: FnOnce(&mut Campaign) -> Result<T, SheetError>,
    {
        let mut campaigns = self.load_all()?;
        let idx = Self::resolve(&campaigns, id)?;
        let out = f(&mut campaigns[idx])?;
        self.save_all(&campaigns)?;
        Ok(out)
    }

    fn require_gm(campaign: &Campaign, actor: &str) -> Result<(), SheetError> {
        if campaign.is_gm(actor) {
            Ok(())
        } else {
            Err(SheetError::Unauthorized(format!(
                "only the game master ({}) can do that",
                campaign.gamemaster
            )))
        }
    }

    pub fn get(&self, id: &str) -> Result<Campaign, SheetError> {
        let campaigns = self.load_all()?;
        let idx = Self::resolve(&campaigns, id)?;
        Ok(campaigns[idx].clone())
    }

    pub fn list_visible(&self, user: &str) -> Result<Vec<Campaign>, SheetError> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|c| c.visible_to(user))
            .collect())
    }

    /// Start a campaign with `gamemaster` as its GM.
    pub fn create(
        &self,
        gamemaster: &str,
        title: &str,
        description: &str,
    ) -> Result<Campaign, SheetError> {
        let title = validate_title("campaign title", title, MAX_TITLE)
            .map_err(|e| SheetError::InvalidInput(e.to_string()))?;
        let campaign = Campaign {
            id: Uuid::new_v4().to_string(),
            title,
            description: description.trim().to_string(),
            status: CampaignStatus::InProgress,
            gamemaster: gamemaster.to_string(),
            sessions: Vec::new(),
            dossiers: Vec::new(),
            party: Vec::new(),
            evidence: String::new(),
            created_at: Utc::now(),
        };
        let mut campaigns = self.load_all()?;
        campaigns.push(campaign.clone());
        self.save_all(&campaigns)?;
        info!(
            "{} created campaign {}",
            escape_log(gamemaster),
            escape_log(&campaign.title)
        );
        Ok(campaign)
    }

    pub fn delete(&self, actor: &str, id: &str) -> Result<Campaign, SheetError> {
        let mut campaigns = self.load_all()?;
        let idx = Self::resolve(&campaigns, id)?;
        Self::require_gm(&campaigns[idx], actor)?;
        let removed = campaigns.remove(idx);
        self.save_all(&campaigns)?;
        info!("{} deleted campaign {}", escape_log(actor), escape_log(&removed.title));
        Ok(removed)
    }

    pub fn set_status(
        &self,
        actor: &str,
        id: &str,
        status: CampaignStatus,
    ) -> Result<(), SheetError> {
        self.update(id, |c| {
            Self::require_gm(c, actor)?;
            c.status = status;
            Ok(())
        })
    }

    pub fn add_session_log(
        &self,
        actor: &str,
        id: &str,
        title: &str,
        content: &str,
        clearance: Clearance,
    ) -> Result<SessionLog, SheetError> {
        let title = validate_title("log title", title, MAX_TITLE)
            .map_err(|e| SheetError::InvalidInput(e.to_string()))?;
        self.update(id, |c| {
            Self::require_gm(c, actor)?;
            let log = SessionLog {
                id: Uuid::new_v4().to_string(),
                title,
                date: Utc::now(),
                content: content.to_string(),
                clearance,
            };
            c.sessions.push(log.clone());
            Ok(log)
        })
    }

    pub fn add_dossier(
        &self,
        actor: &str,
        id: &str,
        name: &str,
        kind: EntityKind,
        description: &str,
        threat_level: Option<u8>,
    ) -> Result<EntityDossier, SheetError> {
        let name = validate_title("dossier name", name, MAX_TITLE)
            .map_err(|e| SheetError::InvalidInput(e.to_string()))?;
        if let Some(level) = threat_level {
            if level > MAX_THREAT_LEVEL {
                return Err(SheetError::InvalidInput(format!(
                    "threat level must be 0-{}, got {}",
                    MAX_THREAT_LEVEL, level
                )));
            }
        }
        self.update(id, |c| {
            Self::require_gm(c, actor)?;
            let dossier = EntityDossier {
                id: Uuid::new_v4().to_string(),
                name,
                kind,
                status: EntityStatus::Active,
                description: description.to_string(),
                threat_level,
            };
            c.dossiers.push(dossier.clone());
            Ok(dossier)
        })
    }

    pub fn set_dossier_status(
        &self,
        actor: &str,
        id: &str,
        dossier: &str,
        status: EntityStatus,
    ) -> Result<(), SheetError> {
        self.update(id, |c| {
            Self::require_gm(c, actor)?;
            let entry = c
                .dossiers
                .iter_mut()
                .find(|d| d.id == dossier || (!dossier.is_empty() && d.id.starts_with(dossier)))
                .ok_or_else(|| SheetError::NotFound(format!("dossier: {}", dossier)))?;
            entry.status = status;
            Ok(())
        })
    }

    pub fn set_evidence(&self, actor: &str, id: &str, text: &str) -> Result<(), SheetError> {
        self.update(id, |c| {
            Self::require_gm(c, actor)?;
            c.evidence = text.to_string();
            Ok(())
        })
    }

    fn push_member(c: &mut Campaign, owner: &str, character: Character) -> Result<PartyMember, SheetError> {
        if c.is_member(owner) {
            return Err(SheetError::AlreadyExists(format!("{} is already in the party", owner)));
        }
        if c
            .party
            .iter()
            .any(|m| m.character.name.eq_ignore_ascii_case(character.name.trim()))
        {
            return Err(SheetError::AlreadyExists(format!(
                "a character named {} is already in the party",
                character.name
            )));
        }
        let member = PartyMember {
            owner: owner.to_string(),
            character,
            synced_at: Utc::now(),
        };
        c.party.push(member.clone());
        Ok(member)
    }

    /// Copy `username`'s published character into the party.
    pub fn invite(&self, actor: &str, id: &str, username: &str) -> Result<PartyMember, SheetError> {
        let snapshot: Character = load_json(self.store, &keys::snapshot(username))?.ok_or_else(
            || SheetError::NotFound(format!("no published character for {}", username)),
        )?;
        let member = self.update(id, |c| {
            Self::require_gm(c, actor)?;
            Self::push_member(c, username, snapshot)
        })?;
        info!(
            "{} added {} ({}) to campaign {}",
            escape_log(actor),
            escape_log(username),
            escape_log(&member.character.name),
            id
        );
        Ok(member)
    }

    /// Add a character pasted as JSON, attributed to `owner`.
    pub fn invite_json(
        &self,
        actor: &str,
        id: &str,
        owner: &str,
        json: &str,
    ) -> Result<PartyMember, SheetError> {
        let character: Character = serde_json::from_str(json)
            .map_err(|e| SheetError::InvalidInput(format!("invalid character JSON: {}", e)))?;
        self.update(id, |c| {
            Self::require_gm(c, actor)?;
            Self::push_member(c, owner, character)
        })
    }

    /// Replace every party entry with its owner's latest published character.
    pub fn refresh_party(&self, actor: &str, id: &str) -> Result<SyncReport, SheetError> {
        self.update(id, |c| {
            Self::require_gm(c, actor)?;
            let mut report = SyncReport::default();
            let now = Utc::now();
            for member in c.party.iter_mut() {
                match load_json::<Character, _>(self.store, &keys::snapshot(&member.owner))? {
                    Some(latest) => {
                        member.character = latest;
                        member.synced_at = now;
                        report.refreshed.push(member.owner.clone());
                    }
                    None => {
                        warn!("no snapshot for party member {}", escape_log(&member.owner));
                        report.missing.push(member.owner.clone());
                    }
                }
            }
            Ok(report)
        })
    }

    pub fn remove_player(&self, actor: &str, id: &str, owner: &str) -> Result<PartyMember, SheetError> {
        self.update(id, |c| {
            Self::require_gm(c, actor)?;
            Self::take_member(c, owner)
        })
    }

    /// A player leaves on their own; no GM rights needed.
    pub fn leave(&self, user: &str, id: &str) -> Result<PartyMember, SheetError> {
        self.update(id, |c| Self::take_member(c, user))
    }

    fn take_member(c: &mut Campaign, owner: &str) -> Result<PartyMember, SheetError> {
        let idx = c
            .party
            .iter()
            .position(|m| m.owner.eq_ignore_ascii_case(owner))
            .ok_or_else(|| SheetError::NotFound(format!("party member: {}", owner)))?;
        Ok(c.party.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_labels_parse_loosely() {
        assert_eq!("top-secret".parse::<Clearance>().unwrap(), Clearance::TopSecret);
        assert_eq!("Level 2".parse::<Clearance>().unwrap(), Clearance::Level2);
        assert_eq!("npc".parse::<EntityKind>().unwrap(), EntityKind::Npc);
        assert_eq!("in_progress".parse::<CampaignStatus>().unwrap(), CampaignStatus::InProgress);
        assert!("hostile".parse::<EntityStatus>().is_err());
    }

    #[test]
    fn visibility_follows_gm_and_party() {
        let mut c = Campaign {
            id: "c1".into(),
            title: "Tingen".into(),
            description: String::new(),
            status: CampaignStatus::InProgress,
            gamemaster: "dunn".into(),
            sessions: vec![],
            dossiers: vec![],
            party: vec![],
            evidence: String::new(),
            created_at: Utc::now(),
        };
        assert!(c.visible_to("Dunn"));
        assert!(!c.visible_to("klein"));
        c.party.push(PartyMember {
            owner: "klein".into(),
            character: Character::new("Klein Moretti"),
            synced_at: Utc::now(),
        });
        assert!(c.visible_to("KLEIN"));
    }
}
