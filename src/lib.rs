//! # Beyonder - Tabletop RPG Companion
//!
//! Beyonder keeps character sheets, campaign books and dice rolls for a
//! sequence-based tabletop RPG, persisted in a local key-value store.
//!
//! ## Features
//!
//! - **Progression Calculators**: maximum Health/Energy/Sanity and the skill point
//!   pool derived from attributes and sequence (advancement level).
//! - **Character Rosters**: several characters per account, one active at a time.
//! - **Full Sheets**: inventory and sealed artifacts, abilities, traits, talents,
//!   origin, backstory and the personal questionnaire with a soul artifact.
//! - **Campaign Book**: session reports, dossiers, evidence board and a party made
//!   of player-published character snapshots that the GM can re-sync.
//! - **Dice Roller**: any-sided dice with modifiers, percentile checks, crits and
//!   a bounded per-user history.
//! - **Accounts & Friends**: Argon2id-hashed passwords and `name#tag` friend lists.
//!
//! ## Quick Start
//!
//! ```rust
//! use beyonder::progression::compute_max_vitals;
//! use beyonder::sheet::Roster;
//! use beyonder::storage::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let mut roster = Roster::load_or_create(&store, "klein").unwrap();
//! let character = roster.active_mut();
//! character.attributes.vigor = 2;
//! character.attributes.mysticism = 1;
//! character.set_sequence(7).unwrap();
//!
//! let proposal = character.propose_vitals();
//! assert_eq!(proposal.proposed, compute_max_vitals(2, 1, 7));
//! proposal.apply(&mut character.vitals);
//! roster.save(&store).unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`progression`] - derived vitals and skill pool calculators
//! - [`sheet`] - character data model, skill table and rosters
//! - [`campaign`] - campaign book and party sync
//! - [`social`] - accounts, login session and friends
//! - [`dice`] - dice roller
//! - [`storage`] - key-value store trait and backends
//! - [`config`] - configuration management
//! - [`validation`] - name and tag validation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   CLI (main)    │ ← loads records, calls calculators, asks to confirm
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ sheet/campaign/ │ ← record types and their operations
//! │ social/dice     │
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  KeyValueStore  │ ← injected persistence (sled or memory)
//! └─────────────────┘
//! ```

pub mod campaign;
pub mod config;
pub mod dice;
pub mod logutil;
pub mod progression;
pub mod sheet;
pub mod social;
pub mod storage;
pub mod validation;
