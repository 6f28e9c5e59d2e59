use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use log::debug;
use shaper_error::Result;

use crate::classify::{Classification, classify};
use crate::context::Context;
use crate::expander::CollectionHint;
use crate::options::RegistryOptions;
use crate::reflect::Typed;
use crate::value::{Record, TypeInfo, TypeKey, Value};

/// Computes a destination property from the source value.
pub type Translator = Arc<dyn Fn(&Value, &mut Context) -> Result<Value> + Send + Sync>;

/// Builds the destination instance for a mapped type.
pub type Factory = Arc<dyn Fn(&mut Context) -> Result<Record> + Send + Sync>;

/// When a destination property is surfaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Inclusion {
    /// Only when an include path asks for it
    #[default]
    Explicit,
    /// Always, unless an exclusion removes it
    Default,
}

/// How a destination property gets its value.
#[derive(Clone)]
pub enum Resolution {
    /// Read the named source property; expand it if it is expandable
    Copy { from: String },
    Translate(Translator),
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Copy { from } => f.debug_struct("Copy").field("from", from).finish(),
            Resolution::Translate(_) => f.write_str("Translate(..)"),
        }
    }
}

/// One destination property of a [`MappingDefinition`].
#[derive(Clone, Debug)]
pub struct PropertyRule {
    name: String,
    resolution: Resolution,
    inclusion: Inclusion,
    hint: CollectionHint,
}

impl PropertyRule {
    /// Copy the same-named source property.
    pub fn copy<N: Into<String>>(name: N) -> Self {
        let name = name.into();
        Self {
            resolution: Resolution::Copy { from: name.clone() },
            name,
            inclusion: Inclusion::Explicit,
            hint: CollectionHint::default(),
        }
    }

    pub fn translated<N, F>(name: N, translator: F) -> Self
    where
        N: Into<String>,
        F: Fn(&Value, &mut Context) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            resolution: Resolution::Translate(Arc::new(translator)),
            inclusion: Inclusion::Explicit,
            hint: CollectionHint::default(),
        }
    }

    /// Read from a differently named source property.
    pub fn from_source<S: Into<String>>(mut self, source: S) -> Self {
        self.resolution = Resolution::Copy {
            from: source.into(),
        };
        self
    }

    pub fn included_by_default(mut self) -> Self {
        self.inclusion = Inclusion::Default;
        self
    }

    /// Destination collection kind when the property holds a collection.
    pub fn with_hint(mut self, hint: CollectionHint) -> Self {
        self.hint = hint;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn inclusion(&self) -> Inclusion {
        self.inclusion
    }

    pub fn hint(&self) -> CollectionHint {
        self.hint
    }
}

/// Destination shape of a mapped source type.
#[derive(Clone, Debug)]
pub struct MappingDefinition {
    destination: String,
    properties: Vec<PropertyRule>,
}

impl MappingDefinition {
    pub fn new<D: Into<String>>(destination: D) -> Self {
        Self {
            destination: destination.into(),
            properties: Vec::new(),
        }
    }

    /// Add (or replace) a property rule.
    pub fn rule(mut self, rule: PropertyRule) -> Self {
        match self.properties.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => *existing = rule,
            None => self.properties.push(rule),
        }
        self
    }

    /// Copied property, surfaced only on request.
    pub fn property<N: Into<String>>(self, name: N) -> Self {
        self.rule(PropertyRule::copy(name))
    }

    /// Copied property, always surfaced unless excluded.
    pub fn default_property<N: Into<String>>(self, name: N) -> Self {
        self.rule(PropertyRule::copy(name).included_by_default())
    }

    pub fn translate<N, F>(self, name: N, translator: F) -> Self
    where
        N: Into<String>,
        F: Fn(&Value, &mut Context) -> Result<Value> + Send + Sync + 'static,
    {
        self.rule(PropertyRule::translated(name, translator))
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn properties(&self) -> &[PropertyRule] {
        &self.properties
    }

    pub fn find(&self, name: &str) -> Option<&PropertyRule> {
        self.properties.iter().find(|r| r.name == name)
    }
}

/// Registered mapping plus optional factory.
#[derive(Clone)]
pub struct Registration {
    definition: Arc<MappingDefinition>,
    factory: Option<Factory>,
}

impl Registration {
    pub fn definition(&self) -> &MappingDefinition {
        &self.definition
    }

    pub fn factory(&self) -> Option<&Factory> {
        self.factory.as_ref()
    }

    /// Destination instance from the factory, or an empty record.
    pub fn instantiate(&self, context: &mut Context) -> Result<Record> {
        match &self.factory {
            Some(factory) => factory(context),
            None => Ok(Record::new(self.definition.destination())),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("definition", &self.definition)
            .field("factory", &self.factory.is_some())
            .finish()
    }
}

/// Source types the expander knows how to project.
///
/// Built once during startup and shared read-only afterwards; lookups are by
/// exact type, never through wrapper or related types.
#[derive(Debug)]
pub struct Registry {
    mappings: HashMap<TypeKey, Registration>,
    blacklist: HashSet<TypeKey>,
    options: RegistryOptions,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    pub fn with_options(options: RegistryOptions) -> Self {
        let mut blacklist = HashSet::new();
        blacklist.insert(TypeKey::of::<String>());
        Registry {
            mappings: HashMap::new(),
            blacklist,
            options,
        }
    }

    /// Register a mapping for the type `T` describes.
    ///
    /// Wrappers such as `Arc<T>`, `Option<T>` or `RwLock<T>` describe their
    /// inner type, so registering one of them maps `T` itself.
    pub fn register<T: Typed>(&mut self, definition: MappingDefinition) {
        self.register_type(*T::describe().key(), definition, None);
    }

    pub fn register_with_factory<T, F>(&mut self, definition: MappingDefinition, factory: F)
    where
        T: Typed,
        F: Fn(&mut Context) -> Result<Record> + Send + Sync + 'static,
    {
        self.register_type(*T::describe().key(), definition, Some(Arc::new(factory)));
    }

    /// Last registration for a type wins.
    pub fn register_type(
        &mut self,
        key: TypeKey,
        definition: MappingDefinition,
        factory: Option<Factory>,
    ) {
        let registration = Registration {
            definition: Arc::new(definition),
            factory,
        };
        if self.mappings.insert(key, registration).is_some() {
            debug!("Replaced mapping for {}", key.name());
        } else {
            debug!("Registered mapping for {}", key.name());
        }
    }

    pub fn lookup(&self, key: &TypeKey) -> Option<&Registration> {
        self.mappings.get(key)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn blacklist<T: Typed>(&mut self) {
        self.blacklist_type(*T::describe().key());
    }

    pub fn blacklist_type(&mut self, key: TypeKey) {
        if self.blacklist.insert(key) {
            debug!("Blacklisted {}", key.name());
        }
    }

    pub fn unblacklist<T: Typed>(&mut self) {
        self.blacklist.remove(T::describe().key());
    }

    pub fn is_blacklisted(&self, key: &TypeKey) -> bool {
        self.blacklist.contains(key)
    }

    pub fn set_blind_expansion(&mut self, enabled: bool) {
        self.options.blind_expansion = enabled;
    }

    pub fn blind_expansion(&self) -> bool {
        self.options.blind_expansion
    }

    pub fn options(&self) -> RegistryOptions {
        self.options
    }

    pub fn classify(&self, ty: &TypeInfo) -> Classification {
        classify(self, ty)
    }

    pub fn will_expand_type(&self, ty: &TypeInfo) -> bool {
        self.classify(ty) != Classification::Opaque
    }

    /// Static form of [`Registry::will_expand_type`].
    pub fn will_expand_type_of<T: Typed>(&self) -> bool {
        self.will_expand_type(&T::describe())
    }

    /// `Null` never expands.
    pub fn will_expand(&self, value: &Value) -> bool {
        value
            .type_info()
            .is_some_and(|ty| self.will_expand_type(&ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    struct Widget;

    crate::reflect_properties! { Widget => {} }

    #[test]
    fn last_registration_wins() {
        let mut registry = Registry::new();
        registry.register::<Widget>(MappingDefinition::new("WidgetV1").property("Id"));
        registry.register::<Widget>(MappingDefinition::new("WidgetV2").property("Name"));
        assert_eq!(registry.len(), 1);
        let registration = registry.lookup(&TypeKey::of::<Widget>()).unwrap();
        assert_eq!(registration.definition().destination(), "WidgetV2");
        assert!(registration.definition().find("Id").is_none());
    }

    #[test]
    fn string_is_blacklisted_by_default() {
        let mut registry = Registry::new();
        assert!(registry.is_blacklisted(&TypeKey::of::<String>()));
        registry.unblacklist::<String>();
        assert!(!registry.is_blacklisted(&TypeKey::of::<String>()));
    }

    #[test]
    fn factory_builds_destination() {
        let mut registry = Registry::new();
        registry.register_with_factory::<Widget, _>(MappingDefinition::new("Widget"), |ctx| {
            let tenant = ctx.get::<String>("tenant").cloned().unwrap_or_default();
            Ok(Record::new("Widget").with("Tenant", tenant))
        });
        let registration = registry.lookup(&TypeKey::of::<Widget>()).unwrap();
        let mut ctx = Context::new().with("tenant", String::from("acme"));
        let record = registration.instantiate(&mut ctx).unwrap();
        assert_eq!(record.get("Tenant"), Some(&Value::from("acme")));
    }

    #[test]
    fn rule_replaces_same_name() {
        let definition = MappingDefinition::new("Person")
            .property("Name")
            .default_property("Name");
        assert_eq!(definition.properties().len(), 1);
        assert_eq!(definition.properties()[0].inclusion(), Inclusion::Default);
    }

    #[test]
    fn wrappers_register_their_inner_type() {
        let mut registry = Registry::new();
        registry.register::<Arc<Widget>>(MappingDefinition::new("Widget"));
        assert!(registry.lookup(&TypeKey::of::<Widget>()).is_some());
        assert!(registry.lookup(&TypeKey::of::<Arc<Widget>>()).is_none());
        let widget = Value::object(Arc::new(Widget));
        assert!(registry.will_expand(&widget));
    }

    #[test]
    fn concurrent_reads() {
        let mut registry = Registry::new();
        registry.register::<Widget>(MappingDefinition::new("Widget"));
        let registry = Arc::new(registry);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.lookup(&TypeKey::of::<Widget>()).is_some())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
    }
}
