use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Longest player name the hiscores accept.
pub const MAX_PLAYER_NAME_LEN: usize = 13;

/// One scraped hiscore snapshot for a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerHiscoreData {
    pub player_id: i64,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub total: i64,
    pub attack: i64,
    pub defence: i64,
    pub strength: i64,
    pub hitpoints: i64,
    pub ranged: i64,
    pub prayer: i64,
    pub magic: i64,
}

impl PlayerHiscoreData {
    pub fn validate(&self) -> Result<(), String> {
        if self.player_id < 0 {
            return Err(format!("player_id must be >= 0, got {}", self.player_id));
        }
        let skills = [
            ("total", self.total),
            ("attack", self.attack),
            ("defence", self.defence),
            ("strength", self.strength),
            ("hitpoints", self.hitpoints),
            ("ranged", self.ranged),
            ("prayer", self.prayer),
            ("magic", self.magic),
        ];
        match skills.iter().find(|(_, xp)| *xp < 0) {
            Some((name, xp)) => Err(format!("{} must be >= 0, got {}", name, xp)),
            None => Ok(()),
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS`, the format stored in the `scraped_at` column.
/// ISO-8601 with a `T` separator is accepted on input.
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn to_string(ts: &NaiveDateTime) -> String {
        ts.format(FORMAT).to_string()
    }

    pub fn parse(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
    }

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_string(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}
