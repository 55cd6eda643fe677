//! Error and warning types for mapping configuration and execution.

use crate::schema::{TypeName, TypePair};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MapperError>;

/// Fatal errors. Any of these aborts the enclosing top-level call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapperError {
    #[error("No mapping configured from {from} to {to}")]
    UnmappedTypePair { from: TypeName, to: TypeName },

    #[error("Type {0} has no registered schema")]
    UnknownType(TypeName),

    #[error("Member '{member}' not found on {type_name}{}", detail_suffix(.detail))]
    MemberNotFound {
        type_name: TypeName,
        member: String,
        detail: Option<String>,
    },

    #[error("Cannot access member '{member}' on {type_name}: {message}")]
    MemberAccess {
        type_name: TypeName,
        member: String,
        message: String,
    },

    #[error("Failed to construct {type_name}: {message}")]
    Construction { type_name: TypeName, message: String },

    #[error("Cannot convert {found} into {target}")]
    Conversion { target: String, found: String },

    #[error("Invalid mapping configuration: {0}")]
    Configuration(String),

    #[error("Failed to load engine config from {path}: {message}")]
    ConfigLoad { path: String, message: String },
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!(" ({})", detail),
        None => String::new(),
    }
}

impl MapperError {
    pub fn member_not_found(type_name: &TypeName, member: impl Into<String>) -> Self {
        MapperError::MemberNotFound {
            type_name: type_name.clone(),
            member: member.into(),
            detail: None,
        }
    }

    pub fn member_access(
        type_name: &TypeName,
        member: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        MapperError::MemberAccess {
            type_name: type_name.clone(),
            member: member.into(),
            message: message.into(),
        }
    }

    pub fn unmapped(pair: &TypePair) -> Self {
        MapperError::UnmappedTypePair {
            from: pair.source.clone(),
            to: pair.destination.clone(),
        }
    }

    pub(crate) fn with_detail(self, text: impl Into<String>) -> Self {
        match self {
            MapperError::MemberNotFound {
                type_name, member, ..
            } => MapperError::MemberNotFound {
                type_name,
                member,
                detail: Some(text.into()),
            },
            other => other,
        }
    }
}

/// Non-fatal findings recorded while the registry is being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A rule of a `reverse_map` source definition had no inverse and was dropped.
    UninvertibleRule {
        pair: TypePair,
        member: String,
        reason: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::UninvertibleRule {
                pair,
                member,
                reason,
            } => write!(
                f,
                "Reverse of {} drops rule for '{}': {}",
                pair, member, reason
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_not_found_message() {
        let err = MapperError::member_not_found(&TypeName::new("UserDto"), "Nickname");
        assert_eq!(err.to_string(), "Member 'Nickname' not found on UserDto");

        let err = err.with_detail("member is write-only");
        assert_eq!(
            err.to_string(),
            "Member 'Nickname' not found on UserDto (member is write-only)"
        );
    }

    #[test]
    fn test_warning_display() {
        let warning = ConfigWarning::UninvertibleRule {
            pair: TypePair::new("User", "UserDto"),
            member: "FullName".to_string(),
            reason: "computed selector".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "Reverse of User -> UserDto drops rule for 'FullName': computed selector"
        );
    }
}
