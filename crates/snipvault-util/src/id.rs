//! ULID-based identifier generation with prefixes.
//!
//! Identifiers in snipvault follow the pattern: `prefix_ulid`
//! For example: `snp_01hqxyz...` for snippets.

use ulid::Ulid;

/// Known identifier prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPrefix {
    Snippet,
}

impl IdPrefix {
    /// Get the string prefix for this identifier type.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdPrefix::Snippet => "snp",
        }
    }

    /// Parse a prefix from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "snp" => Some(IdPrefix::Snippet),
            _ => None,
        }
    }
}

/// Identifier generation and parsing utilities.
pub struct Identifier;

impl Identifier {
    /// Generate a new ascending identifier (newer = larger).
    pub fn ascending(prefix: IdPrefix) -> String {
        Self::with_ulid(prefix, Ulid::new())
    }

    /// Generate an identifier with a specific ULID (for testing or imports).
    pub fn with_ulid(prefix: IdPrefix, ulid: Ulid) -> String {
        format!("{}_{}", prefix.as_str(), ulid.to_string().to_lowercase())
    }

    /// Parse an identifier into its prefix and ULID parts.
    pub fn parse(id: &str) -> Option<(IdPrefix, Ulid)> {
        let (prefix, rest) = id.split_once('_')?;
        let prefix = IdPrefix::parse(prefix)?;
        let ulid = Ulid::from_string(rest).ok()?;
        Some((prefix, ulid))
    }

    /// Generate a snippet ID.
    pub fn snippet() -> String {
        Self::ascending(IdPrefix::Snippet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_id_shape() {
        let id = Identifier::snippet();
        assert!(id.starts_with("snp_"));
        assert_eq!(id.len(), 30); // "snp_" (4) + ULID (26)
    }

    #[test]
    fn test_ascending_order() {
        let id1 = Identifier::snippet();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = Identifier::snippet();
        assert!(id1 < id2, "Snippet IDs should increase over time");
    }

    #[test]
    fn test_parse_roundtrips_ulid() {
        let ulid = Ulid::new();
        let id = Identifier::with_ulid(IdPrefix::Snippet, ulid);
        let (prefix, parsed) = Identifier::parse(&id).unwrap();
        assert_eq!(prefix, IdPrefix::Snippet);
        assert_eq!(parsed, ulid);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Identifier::parse("nounderscore").is_none());
        assert!(Identifier::parse("xyz_01HQXYZ").is_none());
        assert!(Identifier::parse("snp_notaulid").is_none());
    }
}
