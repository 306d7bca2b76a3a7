use std::collections::HashMap;

use crate::store::result::Record;

/// Capabilities a token can be granted.
/// Each maps to one boolean column of the `tokens` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    RequestHighscores,
    VerifyBan,
    CreateToken,
    VerifyPlayers,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::RequestHighscores,
        Permission::VerifyBan,
        Permission::CreateToken,
        Permission::VerifyPlayers,
    ];

    /// Name callers use when asking for this permission.
    pub fn name(self) -> &'static str {
        match self {
            Permission::RequestHighscores => "hiscore",
            Permission::VerifyBan => "ban",
            Permission::CreateToken => "create_token",
            Permission::VerifyPlayers => "verify_players",
        }
    }

    /// Column on the token record holding the flag.
    pub fn column(self) -> &'static str {
        match self {
            Permission::RequestHighscores => "request_highscores",
            Permission::VerifyBan => "verify_ban",
            Permission::CreateToken => "create_token",
            Permission::VerifyPlayers => "verify_players",
        }
    }
}

/// How a permission name reads its flag off a token record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    Flag(Permission),
    /// Unknown names. Always reads as not granted.
    Deny,
}

impl Accessor {
    pub fn permission(self) -> Option<Permission> {
        match self {
            Accessor::Flag(p) => Some(p),
            Accessor::Deny => None,
        }
    }

    /// Granted only when the column is present and holds the `1`/true sentinel.
    pub fn is_granted(self, record: &Record) -> bool {
        match self {
            Accessor::Flag(p) => record.get(p.column()).map_or(false, |v| v.is_granted()),
            Accessor::Deny => false,
        }
    }
}

/// Closed name → accessor table. Immutable once built.
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    entries: HashMap<&'static str, Permission>,
}

impl PermissionRegistry {
    pub fn standard() -> Self {
        Self {
            entries: Permission::ALL.iter().map(|p| (p.name(), *p)).collect(),
        }
    }

    /// Never fails: unrecognized names resolve to [`Accessor::Deny`].
    pub fn resolve(&self, name: &str) -> Accessor {
        self.entries
            .get(name)
            .map_or(Accessor::Deny, |p| Accessor::Flag(*p))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::params::SqlValue;
    use crate::store::result::ResultSet;

    fn token_record(flags: [i64; 4]) -> Record {
        let rs = ResultSet::new(
            vec![
                "token".into(),
                "request_highscores".into(),
                "verify_ban".into(),
                "create_token".into(),
                "verify_players".into(),
            ],
            vec![vec![
                SqlValue::from("abc"),
                SqlValue::Int(flags[0]),
                SqlValue::Int(flags[1]),
                SqlValue::Int(flags[2]),
                SqlValue::Int(flags[3]),
            ]],
        );
        rs.records().unwrap().remove(0)
    }

    #[test]
    fn test_standard_entries() {
        let registry = PermissionRegistry::standard();
        assert_eq!(registry.resolve("hiscore"), Accessor::Flag(Permission::RequestHighscores));
        assert_eq!(registry.resolve("ban"), Accessor::Flag(Permission::VerifyBan));
        assert_eq!(registry.resolve("create_token"), Accessor::Flag(Permission::CreateToken));
        assert_eq!(registry.resolve("verify_players"), Accessor::Flag(Permission::VerifyPlayers));
        assert_eq!(registry.names().count(), 4);
    }

    #[test]
    fn test_unknown_name_resolves_to_deny() {
        let registry = PermissionRegistry::standard();
        assert_eq!(registry.resolve("admin"), Accessor::Deny);
        assert_eq!(registry.resolve(""), Accessor::Deny);
        // Lookups are exact: column names and different casing are not aliases.
        assert_eq!(registry.resolve("request_highscores"), Accessor::Deny);
        assert_eq!(registry.resolve("Hiscore"), Accessor::Deny);
    }

    #[test]
    fn test_flag_accessor_reads_column() {
        let record = token_record([0, 1, 0, 1]);
        assert!(!Accessor::Flag(Permission::RequestHighscores).is_granted(&record));
        assert!(Accessor::Flag(Permission::VerifyBan).is_granted(&record));
        assert!(!Accessor::Flag(Permission::CreateToken).is_granted(&record));
        assert!(Accessor::Flag(Permission::VerifyPlayers).is_granted(&record));
    }

    #[test]
    fn test_deny_accessor_never_grants() {
        let record = token_record([1, 1, 1, 1]);
        assert!(!Accessor::Deny.is_granted(&record));
    }

    #[test]
    fn test_missing_column_denies() {
        let rs = ResultSet::new(vec!["token".into()], vec![vec![SqlValue::from("abc")]]);
        let record = rs.records().unwrap().remove(0);
        assert!(!Accessor::Flag(Permission::VerifyBan).is_granted(&record));
    }

    #[test]
    fn test_non_sentinel_values_deny() {
        let record = token_record([2, -1, 0, 0]);
        assert!(!Accessor::Flag(Permission::RequestHighscores).is_granted(&record));
        assert!(!Accessor::Flag(Permission::VerifyBan).is_granted(&record));
    }
}
