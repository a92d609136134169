//! CI build identifiers.

use std::fmt;

use crate::error::CiError;

/// CI-assigned token namespacing uploaded artifacts.
///
/// The id ends up as a file name on the artifact server, so it is limited to
/// ASCII alphanumerics plus `.`, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildId(String);

impl BuildId {
    pub fn parse(raw: &str) -> Result<Self, CiError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(CiError::InvalidBuildId {
                id: raw.to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(bad) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
        {
            return Err(CiError::InvalidBuildId {
                id: raw.to_string(),
                reason: format!("unexpected character {bad:?}"),
            });
        }
        if id.chars().all(|c| c == '.') {
            return Err(CiError::InvalidBuildId {
                id: raw.to_string(),
                reason: "must not be a relative path component".to_string(),
            });
        }
        Ok(BuildId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_id_accepted() {
        assert_eq!(BuildId::parse("1234").unwrap().as_str(), "1234");
    }

    #[test]
    fn surrounding_whitespace_trimmed() {
        assert_eq!(BuildId::parse(" 57\n").unwrap().as_str(), "57");
    }

    #[test]
    fn dotted_ids_accepted() {
        assert_eq!(BuildId::parse("1.0.57-rc_2").unwrap().to_string(), "1.0.57-rc_2");
    }

    #[test]
    fn empty_rejected() {
        assert!(matches!(
            BuildId::parse("  "),
            Err(CiError::InvalidBuildId { .. })
        ));
    }

    #[test]
    fn path_separators_rejected() {
        assert!(BuildId::parse("../etc").is_err());
        assert!(BuildId::parse("a/b").is_err());
        assert!(BuildId::parse("a\\b").is_err());
        assert!(BuildId::parse("..").is_err());
    }
}
