use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::registry::Permission;

/// One row of the `tokens` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    #[serde(deserialize_with = "flag")]
    pub request_highscores: bool,
    #[serde(deserialize_with = "flag")]
    pub verify_ban: bool,
    #[serde(deserialize_with = "flag")]
    pub create_token: bool,
    #[serde(deserialize_with = "flag")]
    pub verify_players: bool,
}

impl TokenRecord {
    pub fn grants(&self, permission: Permission) -> bool {
        match permission {
            Permission::RequestHighscores => self.request_highscores,
            Permission::VerifyBan => self.verify_ban,
            Permission::CreateToken => self.create_token,
            Permission::VerifyPlayers => self.verify_players,
        }
    }
}

/// Flags requested for a new token. Absent fields default to not granted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TokenGrant {
    pub request_highscores: bool,
    pub verify_ban: bool,
    pub create_token: bool,
    pub verify_players: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewToken {
    pub token: String,
    pub grant: TokenGrant,
}

impl NewToken {
    /// Fresh token: 32 random bytes from the OS RNG, hex-encoded.
    pub fn generate(grant: TokenGrant) -> Self {
        let mut random_bytes = [0u8; 32];
        OsRng.fill_bytes(&mut random_bytes);
        Self {
            token: hex::encode(random_bytes),
            grant,
        }
    }
}

/// Flags are stored as `0`/`1` integers by MySQL and SQLite and as booleans
/// by PostgreSQL. Only `1` counts as set.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => b,
        Raw::Int(i) => i == 1,
    })
}
