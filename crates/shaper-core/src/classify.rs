use crate::registry::Registry;
use crate::value::{TypeInfo, TypeKind};

/// How the expander treats values of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Registered mapping
    Direct,
    /// Collection of expandable elements
    Collection,
    /// Unregistered, projected through its readable properties
    Blind,
    /// Terminal: copied as-is
    Opaque,
}

/// Classify a type. Checks run in strict priority order:
/// blacklist, registered mapping, collection, blind.
///
/// Collections are judged by their declared element type only.
pub fn classify(registry: &Registry, ty: &TypeInfo) -> Classification {
    if registry.is_blacklisted(ty.key()) {
        return Classification::Opaque;
    }
    if registry.lookup(ty.key()).is_some() {
        return Classification::Direct;
    }
    if let TypeKind::Collection(element) = ty.kind() {
        return match classify(registry, element) {
            Classification::Direct | Classification::Blind => Classification::Collection,
            Classification::Collection | Classification::Opaque => Classification::Opaque,
        };
    }
    if registry.blind_expansion() && ty.exposes_properties() {
        Classification::Blind
    } else {
        Classification::Opaque
    }
}
