//! Storage key namespacing.
//!
//! Every object lives under a partition: a region code (`UK/...`) or a
//! per-user prefix (`users/{id}/...`). The object name is
//! `{epoch_millis}_{sanitized_file_name}`, so a key looks like
//! `UK/1717171717171_report.pdf`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Regions a file can be pinned to under the region partition strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Region {
    #[serde(rename = "UK")]
    Uk,
    #[serde(rename = "IRE")]
    Ire,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::Uk, Region::Ire];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Uk => "UK",
            Region::Ire => "IRE",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UK" => Ok(Region::Uk),
            "IRE" => Ok(Region::Ire),
            _ => Err(()),
        }
    }
}

/// How keys are partitioned for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStrategy {
    /// Shared per-region folders; callers name the region explicitly.
    Region,
    /// Private folder per authenticated user.
    User,
}

impl FromStr for PartitionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "region" => Ok(PartitionStrategy::Region),
            "user" | "users" => Ok(PartitionStrategy::User),
            other => Err(format!("unknown partition strategy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partition {
    Region(Region),
    User(String),
}

impl Partition {
    /// Listing prefix, always terminated by `/`.
    pub fn prefix(&self) -> String {
        match self {
            Partition::Region(region) => format!("{}/", region),
            Partition::User(user_id) => format!("users/{}/", user_id),
        }
    }

    pub fn key_for(&self, file_id: &str) -> String {
        format!("{}{}", self.prefix(), file_id)
    }
}

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `{epoch_millis}_{sanitized}`. Two uploads of the same name within one
/// millisecond produce the same id.
pub fn build_file_id(epoch_millis: i64, file_name: &str) -> String {
    format!("{}_{}", epoch_millis, sanitize_file_name(file_name))
}

/// Strips the leading timestamp segment from a file id.
pub fn display_name(file_id: &str) -> &str {
    file_id.split_once('_').map(|(_, rest)| rest).unwrap_or("")
}

/// A storage key split back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey<'a> {
    pub partition: &'a str,
    pub file_id: &'a str,
    pub file_name: &'a str,
}

impl ParsedKey<'_> {
    pub fn region(&self) -> Option<Region> {
        self.partition.parse().ok()
    }

    pub fn owner(&self) -> Option<&str> {
        self.partition.strip_prefix("users/")
    }
}

pub fn parse_key(key: &str) -> ParsedKey<'_> {
    let (partition, file_id) = key.rsplit_once('/').unwrap_or(("", key));
    ParsedKey {
        partition,
        file_id,
        file_name: display_name(file_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("my file (1).txt"), "my_file__1_.txt");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("测试.txt"), "__.txt");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for name in ["a b/c\\d.png", "ok-name_1.tar.gz", "ü?*:<>|.doc", ""] {
            let once = sanitize_file_name(name);
            assert_eq!(sanitize_file_name(&once), once);
            assert!(
                once.chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            );
        }
    }

    #[test]
    fn test_partition_keys() {
        let uk = Partition::Region(Region::Uk);
        assert_eq!(uk.key_for("1_a.txt"), "UK/1_a.txt");

        let user = Partition::User("u-42".to_string());
        assert_eq!(user.prefix(), "users/u-42/");
        assert_eq!(user.key_for("1_a.txt"), "users/u-42/1_a.txt");
    }

    #[test]
    fn test_key_round_trip() {
        let file_id = build_file_id(1_700_000_000_000, "report.pdf");
        let key = Partition::Region(Region::Ire).key_for(&file_id);
        let parsed = parse_key(&key);

        assert_eq!(parsed.file_id, "1700000000000_report.pdf");
        assert_eq!(parsed.file_name, "report.pdf");
        assert_eq!(parsed.region(), Some(Region::Ire));
        assert_eq!(parsed.owner(), None);
    }

    #[test]
    fn test_parse_user_key() {
        let parsed = parse_key("users/abc/12_my_notes.md");
        assert_eq!(parsed.owner(), Some("abc"));
        assert_eq!(parsed.region(), None);
        // only the timestamp segment is stripped
        assert_eq!(parsed.file_name, "my_notes.md");
    }

    #[test]
    fn test_display_name_without_timestamp() {
        assert_eq!(display_name("plainname"), "");
    }

    #[test]
    fn test_partition_strategy_parse() {
        assert_eq!(
            "region".parse::<PartitionStrategy>(),
            Ok(PartitionStrategy::Region)
        );
        assert_eq!(
            "USER".parse::<PartitionStrategy>(),
            Ok(PartitionStrategy::User)
        );
        assert!("tenant".parse::<PartitionStrategy>().is_err());
    }
}
