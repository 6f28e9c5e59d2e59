//! Options controlling expansion limits and registry behaviour.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a repeated object identity turns into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CyclePlaceholder {
    /// Emit `null` in place of the repeated object
    #[default]
    Null,
    /// Drop the property (or collection element) altogether
    Omit,
}

/// Options to control traversal limits and behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExpandOptions {
    /// Maximum number of nested levels below the root. Objects and
    /// collections each count as one level.
    pub max_depth: usize,
    pub cycle_placeholder: CyclePlaceholder,
    /// Track identities only along the current path, so an object shared by
    /// two siblings is projected twice and only real cycles are cut.
    pub revisit_shared: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            max_depth: 32,
            cycle_placeholder: CyclePlaceholder::Null,
            revisit_shared: false,
        }
    }
}

impl ExpandOptions {
    pub fn validate(self) -> Self {
        let max_depth = self.max_depth.max(1);
        Self { max_depth, ..self }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RegistryOptions {
    /// Expand unregistered types that expose readable properties.
    pub blind_expansion: bool,
}
