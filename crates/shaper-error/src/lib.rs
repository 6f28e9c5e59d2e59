//! # shaper-error - Unified Error Handling
//!
//! This crate provides the error type shared by every shaper crate:
//! - One enum, organised by domain (mapping, arguments, properties, expansion,
//!   include paths, caller callbacks)
//! - Each variant carries a human message, optional context and a `kind`
//! - User-friendly rendering via [`ShaperError::user_message`]
//!
//! Errors raised by translators and factories are expected to be built by the
//! caller with [`ShaperError::callback`]. The expansion engine passes them
//! through untouched.

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The main unified error type for shaper
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShaperError {
    /// Type registry and classification errors
    #[error("Mapping error: {message}")]
    Mapping {
        message: String,
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        type_name: Option<String>,
        kind: MappingErrorKind,
    },

    /// Invalid arguments handed to a public operation
    #[error("Invalid argument: {message}")]
    Argument {
        message: String,
        kind: ArgumentErrorKind,
    },

    /// Dynamic property lookup errors
    #[error("Property error: {message}")]
    Property {
        message: String,
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        property: Option<String>,
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        type_name: Option<String>,
        kind: PropertyErrorKind,
    },

    /// Recursive expansion errors
    #[error("Expansion error: {message}")]
    Expansion {
        message: String,
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        type_name: Option<String>,
        kind: ExpansionErrorKind,
    },

    /// Include path parsing errors
    #[error("Include error: {message}")]
    Include {
        message: String,
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        path: Option<String>,
        kind: IncludeErrorKind,
    },

    /// Failures raised by caller-supplied translators and factories
    #[error("Callback error: {message}")]
    Callback {
        message: String,
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        property: Option<String>,
        // Note: We store the source error message instead of the error itself for cloneability
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        source_message: Option<String>,
    },
}

/// Specific kinds of mapping errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MappingErrorKind {
    #[error("No mapping registered")]
    UnknownMapping,
}

/// Specific kinds of argument errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ArgumentErrorKind {
    #[error("Value is not enumerable")]
    NotEnumerable,
    #[error("Sort direction is unknown")]
    UnknownDirection,
}

/// Specific kinds of property errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PropertyErrorKind {
    #[error("Property not found")]
    NotFound,
}

/// Specific kinds of expansion errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExpansionErrorKind {
    #[error("Maximum expansion depth exceeded")]
    TooDeep,
}

/// Specific kinds of include path errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IncludeErrorKind {
    #[error("Empty include path")]
    EmptyPath,
    #[error("Invalid path segment")]
    InvalidSegment,
}

/// Convenient result type for shaper operations
pub type Result<T> = std::result::Result<T, ShaperError>;

impl ShaperError {
    /// Create a new mapping error
    pub fn mapping<M: Into<String>>(message: M, kind: MappingErrorKind) -> Self {
        Self::Mapping {
            message: message.into(),
            type_name: None,
            kind,
        }
    }

    /// Shorthand for a top-level type that has no applicable classification
    pub fn unknown_mapping<T: Into<String>>(type_name: T) -> Self {
        let type_name = type_name.into();
        Self::Mapping {
            message: format!("no mapping registered for type '{type_name}'"),
            type_name: Some(type_name),
            kind: MappingErrorKind::UnknownMapping,
        }
    }

    /// Create a new argument error
    pub fn argument<M: Into<String>>(message: M, kind: ArgumentErrorKind) -> Self {
        Self::Argument {
            message: message.into(),
            kind,
        }
    }

    /// Create a new property error
    pub fn property<M: Into<String>>(message: M, kind: PropertyErrorKind) -> Self {
        Self::Property {
            message: message.into(),
            property: None,
            type_name: None,
            kind,
        }
    }

    /// Create a new expansion error
    pub fn expansion<M: Into<String>>(message: M, kind: ExpansionErrorKind) -> Self {
        Self::Expansion {
            message: message.into(),
            type_name: None,
            kind,
        }
    }

    /// Create a new include path error
    pub fn include<M: Into<String>, P: Into<String>>(
        message: M,
        path: P,
        kind: IncludeErrorKind,
    ) -> Self {
        Self::Include {
            message: message.into(),
            path: Some(path.into()),
            kind,
        }
    }

    /// Create a callback error from inside a translator or factory
    pub fn callback<M: Into<String>>(message: M) -> Self {
        Self::Callback {
            message: message.into(),
            property: None,
            source_message: None,
        }
    }

    /// Create a callback error that remembers the message of an underlying error
    pub fn callback_from<M: Into<String>, E: std::error::Error>(message: M, source: &E) -> Self {
        Self::Callback {
            message: message.into(),
            property: None,
            source_message: Some(source.to_string()),
        }
    }

    /// Add type name context to an existing error
    pub fn with_type_name<T: Into<String>>(mut self, name: T) -> Self {
        let name = name.into();
        match &mut self {
            Self::Mapping { type_name, .. } => *type_name = Some(name),
            Self::Property { type_name, .. } => *type_name = Some(name),
            Self::Expansion { type_name, .. } => *type_name = Some(name),
            _ => {} // Other variants don't carry a type name
        }
        self
    }

    /// Add property context to an existing error
    pub fn with_property<P: Into<String>>(mut self, name: P) -> Self {
        let name = name.into();
        match &mut self {
            Self::Property { property, .. } => *property = Some(name),
            Self::Callback { property, .. } => *property = Some(name),
            _ => {}
        }
        self
    }

    /// Check if this error reports an unexpandable top-level type
    pub fn is_unknown_mapping(&self) -> bool {
        matches!(
            self,
            Self::Mapping {
                kind: MappingErrorKind::UnknownMapping,
                ..
            }
        )
    }

    /// Check if this error is an invalid argument
    pub fn is_argument(&self) -> bool {
        matches!(self, Self::Argument { .. })
    }

    /// Check if this error reports a missing property
    pub fn is_property_not_found(&self) -> bool {
        matches!(
            self,
            Self::Property {
                kind: PropertyErrorKind::NotFound,
                ..
            }
        )
    }

    /// Check if this error reports an exceeded depth limit
    pub fn is_too_deep(&self) -> bool {
        matches!(
            self,
            Self::Expansion {
                kind: ExpansionErrorKind::TooDeep,
                ..
            }
        )
    }

    /// Check if this error came from a caller-supplied callback
    pub fn is_callback(&self) -> bool {
        matches!(self, Self::Callback { .. })
    }

    /// Get the type name associated with this error, if any
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Mapping { type_name, .. } => type_name.as_deref(),
            Self::Property { type_name, .. } => type_name.as_deref(),
            Self::Expansion { type_name, .. } => type_name.as_deref(),
            _ => None,
        }
    }

    /// Get a user-friendly error message suitable for API responses
    pub fn user_message(&self) -> String {
        match self {
            Self::Mapping { message, .. } => format!("Cannot expand value: {message}"),
            Self::Argument { message, .. } => message.clone(),
            Self::Property {
                message,
                property,
                type_name,
                ..
            } => {
                let mut msg = message.clone();
                if let Some(prop) = property {
                    msg.push_str(&format!(" (property: {prop})"));
                }
                if let Some(ty) = type_name {
                    msg.push_str(&format!(" (type: {ty})"));
                }
                msg
            }
            Self::Expansion {
                message, type_name, ..
            } => {
                let mut msg = format!("Expansion failed: {message}");
                if let Some(ty) = type_name {
                    msg.push_str(&format!(" (type: {ty})"));
                }
                msg
            }
            Self::Include { message, path, .. } => {
                if let Some(path) = path {
                    format!("Invalid include '{path}': {message}")
                } else {
                    format!("Invalid include: {message}")
                }
            }
            Self::Callback {
                message,
                property,
                source_message,
            } => {
                let mut msg = message.clone();
                if let Some(prop) = property {
                    msg.push_str(&format!(" (property: {prop})"));
                }
                if let Some(source) = source_message {
                    msg.push_str(&format!(": {source}"));
                }
                msg
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_mapping_names_type() {
        let err = ShaperError::unknown_mapping("app::Widget");
        assert!(err.is_unknown_mapping());
        assert_eq!(err.type_name(), Some("app::Widget"));
        assert!(err.to_string().contains("app::Widget"));
    }

    #[test]
    fn context_adders_only_touch_matching_variants() {
        let err = ShaperError::property("missing", PropertyErrorKind::NotFound)
            .with_property("age")
            .with_type_name("Person");
        assert!(err.is_property_not_found());
        let msg = err.user_message();
        assert!(msg.contains("property: age"));
        assert!(msg.contains("type: Person"));

        let err = ShaperError::argument("bad", ArgumentErrorKind::NotEnumerable).with_property("x");
        assert_eq!(
            err,
            ShaperError::argument("bad", ArgumentErrorKind::NotEnumerable)
        );
    }

    #[test]
    fn callback_keeps_source_message() {
        let io = std::io::Error::other("disk on fire");
        let err = ShaperError::callback_from("translator failed", &io).with_property("Avatar");
        assert!(err.is_callback());
        assert_eq!(
            err.user_message(),
            "translator failed (property: Avatar): disk on fire"
        );
    }
}
