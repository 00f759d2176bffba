//! Character sheet data model: attributes, vitals, the skill ledger, narrative
//! details, the reference skill table and the per-user roster of characters.

pub mod details;
pub mod errors;
pub mod roster;
pub mod skills;
pub mod types;

pub use details::{
    Ability, Item, PersonalField, PersonalInfo, SheetEntry, SoulArtifact, Talent, TalentKind,
};
pub use errors::SheetError;
pub use roster::Roster;
pub use skills::{find_skill, SKILLS};
pub use types::*;
