//! # shaper-core
//!
//! Include-driven projection of in-memory object graphs.
//!
//! Given a source value and the property paths a caller asked for, the
//! [`Expander`] produces a new value holding only those fields, recursing
//! into nested mapped entities and cutting cycles by object identity.
//!
//! ## Key Features
//!
//! - **Type registry**: per-type [`MappingDefinition`]s with translators and factories
//! - **Include paths**: dotted [`PropertyReference`]s with `-` exclusions
//! - **Blind expansion**: optional projection of unregistered types through [`Reflect`]
//! - **Cycle safety**: identity-based visited set plus a depth limit
//! - **Sorting**: stable [`sort`] of lists by a named property
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use shaper_core::{Expander, IncludeSet, MappingDefinition, Registry, Value, reflect_properties};
//!
//! struct Person {
//!     name: String,
//!     friends: Vec<Arc<Person>>,
//! }
//!
//! reflect_properties! {
//!     Person => {
//!         "Name" => name,
//!         "Friends" => friends,
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! registry.register::<Person>(MappingDefinition::new("Person").property("Name").property("Friends"));
//!
//! let bob = Arc::new(Person { name: "Bob".into(), friends: vec![] });
//! let ada = Arc::new(Person { name: "Ada".into(), friends: vec![bob] });
//!
//! let includes = IncludeSet::parse("Name,Friends.Name")?;
//! let out = Expander::new(&registry).expand_fresh(&Value::object(ada), &includes)?;
//! let friends = out.property("Friends").unwrap();
//! assert_eq!(friends.as_list().unwrap().len(), 1);
//! # Ok::<(), shaper_core::ShaperError>(())
//! ```

pub mod classify;
pub mod context;
pub mod expander;
pub mod include;
pub mod options;
pub mod reflect;
pub mod registry;
pub mod sort;
pub mod value;

pub use classify::{Classification, classify};
pub use context::Context;
pub use expander::{CollectionHint, Expander};
pub use include::{IncludeSet, PropertyReference};
pub use options::{CyclePlaceholder, ExpandOptions, RegistryOptions};
pub use reflect::{Reflect, ToValue, Typed};
pub use registry::{
    Factory, Inclusion, MappingDefinition, PropertyRule, Registration, Registry, Resolution,
    Translator,
};
pub use sort::{SortDirection, sort};
pub use value::{List, ObjectId, ObjectRef, Record, TypeInfo, TypeKey, TypeKind, Value};

/// Canonical result type for this crate
pub use shaper_error::{Result, ShaperError};
