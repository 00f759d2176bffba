//! User accounts, login session and friend lists.
//!
//! Each account gets a random five-digit tag at registration; friends are added
//! by `name` + `tag` so two people need to have exchanged handles first.
//! Passwords are stored as Argon2id PHC strings.

use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Utc};
use log::{info, warn};
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::logutil::escape_log;
use crate::sheet::errors::SheetError;
use crate::storage::{keys, load_json, save_json, KeyValueStore};
use crate::validation::{is_valid_tag, validate_user_name};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRef {
    pub name: String,
    pub tag: String,
}

impl std::fmt::Display for FriendRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name, self.tag)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub tag: String,
    pub password_hash: String,
    #[serde(default)]
    pub friends: Vec<FriendRef>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn handle(&self) -> String {
        format!("{}#{}", self.username, self.tag)
    }
}

/// Random tag in `10000..=99999`.
pub fn generate_tag<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(10_000..=99_999u32).to_string()
}

/// Account operations against an injected store.
pub struct UserRegistry<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
    argon2: Argon2<'static>,
}

impl<'a, S: KeyValueStore + ?Sized> UserRegistry<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            argon2: Argon2::default(),
        }
    }

    /// Registry with explicit Argon2 params (from `[security.argon2]`).
    pub fn with_params(store: &'a S, params: Option<Params>) -> Self {
        let argon2 = match params {
            Some(p) => Argon2::new(Algorithm::Argon2id, Version::V0x13, p),
            None => Argon2::default(),
        };
        Self { store, argon2 }
    }

    pub fn get(&self, username: &str) -> Result<UserProfile, SheetError> {
        load_json(self.store, &keys::user(username))?
            .ok_or_else(|| SheetError::NotFound(format!("user: {}", username)))
    }

    pub fn exists(&self, username: &str) -> Result<bool, SheetError> {
        Ok(self.store.get(&keys::user(username))?.is_some())
    }

    /// Every registered account, ordered by username.
    pub fn list(&self) -> Result<Vec<UserProfile>, SheetError> {
        let mut profiles = Vec::new();
        for key in self.store.keys_with_prefix(keys::USERS_PREFIX)? {
            if let Some(profile) = load_json::<UserProfile, _>(self.store, &key)? {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }

    fn save(&self, profile: &UserProfile) -> Result<(), SheetError> {
        save_json(self.store, &keys::user(&profile.username), profile)
    }

    /// Create an account. Fails if the name is taken (case-insensitively).
    pub fn register(&self, username: &str, password: &str) -> Result<UserProfile, SheetError> {
        let username =
            validate_user_name(username).map_err(|e| SheetError::InvalidInput(e.to_string()))?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(SheetError::InvalidInput(format!(
                "password too short (minimum {} characters)",
                MIN_PASSWORD_LEN
            )));
        }
        if password.len() > MAX_PASSWORD_LEN {
            return Err(SheetError::InvalidInput("password too long".to_string()));
        }
        if self.exists(&username)? {
            return Err(SheetError::AlreadyExists(format!("username '{}'", username)));
        }

        let mut rng = rand::thread_rng();
        let salt = SaltString::generate(&mut rng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| SheetError::PasswordHash(e.to_string()))?;
        let profile = UserProfile {
            username,
            tag: generate_tag(&mut rng),
            password_hash: hash.to_string(),
            friends: Vec::new(),
            created_at: Utc::now(),
        };
        self.save(&profile)?;
        info!(target: "security", "registered user {}", escape_log(&profile.handle()));
        Ok(profile)
    }

    /// Verify credentials. Unknown users and wrong passwords give the same error.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<UserProfile, SheetError> {
        let denied = || SheetError::Unauthorized("invalid username or password".to_string());
        let profile = match self.get(username) {
            Ok(p) => p,
            Err(SheetError::NotFound(_)) => {
                warn!(target: "security", "login for unknown user {}", escape_log(username));
                return Err(denied());
            }
            Err(e) => return Err(e),
        };
        let parsed = PasswordHash::new(&profile.password_hash)
            .map_err(|e| SheetError::PasswordHash(format!("corrupt password hash: {e}")))?;
        if self.argon2.verify_password(password.as_bytes(), &parsed).is_err() {
            warn!(target: "security", "failed login for {}", escape_log(username));
            return Err(denied());
        }
        Ok(profile)
    }

    /// Add `name#tag` to `username`'s friends. Only the requester's list changes.
    pub fn add_friend(
        &self,
        username: &str,
        friend_name: &str,
        friend_tag: &str,
    ) -> Result<UserProfile, SheetError> {
        if !is_valid_tag(friend_tag) {
            return Err(SheetError::InvalidInput(format!("invalid tag: {}", friend_tag)));
        }
        let mut me = self.get(username)?;
        if me.username.eq_ignore_ascii_case(friend_name) && me.tag == friend_tag {
            return Err(SheetError::InvalidInput("you cannot add yourself".to_string()));
        }
        if me
            .friends
            .iter()
            .any(|f| f.name.eq_ignore_ascii_case(friend_name) && f.tag == friend_tag)
        {
            return Err(SheetError::AlreadyExists(format!(
                "{}#{} is already a friend",
                friend_name, friend_tag
            )));
        }
        let target = match self.get(friend_name) {
            Ok(t) if t.tag == friend_tag => t,
            Ok(_) | Err(SheetError::NotFound(_)) => {
                return Err(SheetError::NotFound(format!("user {}#{}", friend_name, friend_tag)))
            }
            Err(e) => return Err(e),
        };
        me.friends.push(FriendRef {
            name: target.username,
            tag: target.tag,
        });
        self.save(&me)?;
        Ok(me)
    }

    pub fn remove_friend(&self, username: &str, friend_name: &str) -> Result<UserProfile, SheetError> {
        let mut me = self.get(username)?;
        let before = me.friends.len();
        me.friends.retain(|f| !f.name.eq_ignore_ascii_case(friend_name));
        if me.friends.len() == before {
            return Err(SheetError::NotFound(format!("friend: {}", friend_name)));
        }
        self.save(&me)?;
        Ok(me)
    }
}

/// Remember `username` as the logged-in user.
pub fn login<S: KeyValueStore + ?Sized>(store: &S, username: &str) -> Result<(), SheetError> {
    store.set(keys::SESSION_USER, username)
}

pub fn logout<S: KeyValueStore + ?Sized>(store: &S) -> Result<bool, SheetError> {
    store.remove(keys::SESSION_USER)
}

pub fn current_user<S: KeyValueStore + ?Sized>(store: &S) -> Result<Option<String>, SheetError> {
    store.get(keys::SESSION_USER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fast_params() -> Option<Params> {
        Params::new(1024, 1, 1, None).ok()
    }

    #[test]
    fn tags_are_five_digits() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            assert!(is_valid_tag(&generate_tag(&mut rng)));
        }
    }

    #[test]
    fn register_then_authenticate() {
        let store = MemoryStore::new();
        let reg = UserRegistry::with_params(&store, fast_params());
        let profile = reg.register("klein", "tarot-club").unwrap();
        assert!(is_valid_tag(&profile.tag));
        assert_ne!(profile.password_hash, "tarot-club");
        assert_eq!(reg.authenticate("klein", "tarot-club").unwrap().tag, profile.tag);
        assert!(matches!(
            reg.authenticate("klein", "wrong-pass"),
            Err(SheetError::Unauthorized(_))
        ));
        assert!(matches!(
            reg.authenticate("nobody", "whatever1"),
            Err(SheetError::Unauthorized(_))
        ));
    }

    #[test]
    fn duplicate_and_short_passwords_rejected() {
        let store = MemoryStore::new();
        let reg = UserRegistry::with_params(&store, fast_params());
        assert!(matches!(reg.register("audrey", "short"), Err(SheetError::InvalidInput(_))));
        reg.register("audrey", "long-enough").unwrap();
        assert!(matches!(
            reg.register("Audrey", "long-enough"),
            Err(SheetError::AlreadyExists(_))
        ));
    }

    #[test]
    fn session_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(current_user(&store).unwrap(), None);
        login(&store, "klein").unwrap();
        assert_eq!(current_user(&store).unwrap().as_deref(), Some("klein"));
        assert!(logout(&store).unwrap());
        assert_eq!(current_user(&store).unwrap(), None);
    }
}
