//! Recursive include-driven projection.
//!
//! [`Expander::expand`] walks a source value, lets the [`Registry`] classify
//! every value it meets and builds the projected [`Value`]:
//!
//! - **Direct** objects become a [`Record`] holding the selected properties of
//!   their [`MappingDefinition`](crate::MappingDefinition)
//! - **Collections** become lists of their expanded elements, in source order
//! - **Blind** objects become a record of all their readable properties
//! - anything else is copied as a leaf
//!
//! Every object identity is remembered for the rest of the call. Meeting it
//! again yields the configured [`CyclePlaceholder`] instead of a second
//! projection, which is what makes cyclic graphs terminate.

use std::collections::HashMap;

use log::{debug, trace};
use shaper_error::{ExpansionErrorKind, Result, ShaperError};

use crate::classify::Classification;
use crate::context::Context;
use crate::include::IncludeSet;
use crate::options::{CyclePlaceholder, ExpandOptions};
use crate::registry::{Registration, Registry, Resolution};
use crate::value::{List, ObjectId, ObjectRef, Record, TypeInfo, Value};

/// Destination collection kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectionHint {
    /// Ordered list keeping every element
    #[default]
    List,
    /// Ordered list without repeated projected elements (first one wins)
    Distinct,
}

/// Result of one nested step.
enum Outcome {
    Value(Value),
    /// The object was already visited in this call
    Cycle,
}

/// Include paths and collection hint that apply at one level.
#[derive(Clone, Copy)]
struct Step<'a> {
    includes: &'a IncludeSet,
    hint: CollectionHint,
}

impl<'a> Step<'a> {
    fn new(includes: &'a IncludeSet) -> Self {
        Self {
            includes,
            hint: CollectionHint::default(),
        }
    }

    fn with_hint(self, hint: CollectionHint) -> Self {
        Self { hint, ..self }
    }
}

/// Per-call traversal state.
///
/// Visited objects are held alive until the call ends so that their
/// addresses cannot be reused by values built on the fly.
#[derive(Default)]
struct Walk {
    visited: HashMap<ObjectId, ObjectRef>,
    depth: usize,
}

pub struct Expander<'r> {
    registry: &'r Registry,
    options: ExpandOptions,
}

impl<'r> Expander<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            options: ExpandOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExpandOptions) -> Self {
        self.options = options.validate();
        self
    }

    pub fn options(&self) -> &ExpandOptions {
        &self.options
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Expand with an empty, throwaway context.
    pub fn expand_fresh(&self, source: &Value, includes: &IncludeSet) -> Result<Value> {
        let mut context = Context::new();
        self.expand(source, &mut context, includes, None)
    }

    /// Project `source` according to `includes`.
    ///
    /// Plain values (scalars, text, records, lists of those) and blacklisted
    /// types are returned unchanged. Any other reflected object that cannot
    /// be expanded fails with an unknown-mapping error naming its type.
    pub fn expand(
        &self,
        source: &Value,
        context: &mut Context,
        includes: &IncludeSet,
        hint: Option<CollectionHint>,
    ) -> Result<Value> {
        let Some(ty) = source.type_info() else {
            return Ok(Value::Null);
        };
        let classification = self.registry.classify(&ty);
        debug!("Expanding {} as {:?}", ty.name(), classification);

        if classification == Classification::Opaque {
            if ty.is_plain() || self.registry.is_blacklisted(ty.key()) {
                return Ok(source.clone());
            }
            return Err(ShaperError::unknown_mapping(ty.name()));
        }

        let mut walk = Walk::default();
        let step = Step::new(includes).with_hint(hint.unwrap_or_default());
        let outcome = self.expand_as(source, &ty, classification, context, step, &mut walk)?;
        debug!(
            "Expansion of {} finished, {} objects visited",
            ty.name(),
            walk.visited.len()
        );
        Ok(match outcome {
            Outcome::Value(value) => value,
            Outcome::Cycle => Value::Null,
        })
    }

    fn expand_nested(
        &self,
        value: &Value,
        context: &mut Context,
        step: Step<'_>,
        walk: &mut Walk,
    ) -> Result<Outcome> {
        let Some(ty) = value.type_info() else {
            return Ok(Outcome::Value(Value::Null));
        };
        match self.registry.classify(&ty) {
            Classification::Opaque => Ok(Outcome::Value(value.clone())),
            classification => self.expand_as(value, &ty, classification, context, step, walk),
        }
    }

    fn expand_as(
        &self,
        value: &Value,
        ty: &TypeInfo,
        classification: Classification,
        context: &mut Context,
        step: Step<'_>,
        walk: &mut Walk,
    ) -> Result<Outcome> {
        match classification {
            Classification::Direct => match self.registry.lookup(ty.key()) {
                Some(registration) => self.enter(value, ty, walk, |walk| {
                    self.project_mapped(value, ty, registration, context, step.includes, walk)
                }),
                None => Ok(Outcome::Value(value.clone())),
            },
            Classification::Blind => self.enter(value, ty, walk, |walk| {
                self.project_blind(value, ty, context, step.includes, walk)
            }),
            Classification::Collection => match value {
                Value::List(list) => self
                    .descend(ty, walk, |walk| {
                        self.project_collection(list, context, step, walk)
                    })
                    .map(Outcome::Value),
                _ => Ok(Outcome::Value(value.clone())),
            },
            Classification::Opaque => Ok(Outcome::Value(value.clone())),
        }
    }

    /// Identity bookkeeping around one object projection.
    fn enter<F>(&self, value: &Value, ty: &TypeInfo, walk: &mut Walk, project: F) -> Result<Outcome>
    where
        F: FnOnce(&mut Walk) -> Result<Value>,
    {
        let object = value.as_object();
        if let Some(object) = object {
            if walk.visited.contains_key(&object.id()) {
                trace!("Cycle at {}, emitting placeholder", ty.name());
                return Ok(Outcome::Cycle);
            }
            walk.visited.insert(object.id(), object.clone());
        }

        let result = self.descend(ty, walk, project);

        if self.options.revisit_shared {
            if let Some(object) = object {
                walk.visited.remove(&object.id());
            }
        }
        result.map(Outcome::Value)
    }

    /// Depth bookkeeping around one nested level, object or collection.
    fn descend<F>(&self, ty: &TypeInfo, walk: &mut Walk, project: F) -> Result<Value>
    where
        F: FnOnce(&mut Walk) -> Result<Value>,
    {
        // The root sits at depth zero
        if walk.depth > self.options.max_depth {
            return Err(ShaperError::expansion(
                format!("more than {} nested levels", self.options.max_depth),
                ExpansionErrorKind::TooDeep,
            )
            .with_type_name(ty.name()));
        }
        walk.depth += 1;
        let result = project(walk);
        walk.depth -= 1;
        result
    }

    fn project_mapped(
        &self,
        source: &Value,
        ty: &TypeInfo,
        registration: &Registration,
        context: &mut Context,
        includes: &IncludeSet,
        walk: &mut Walk,
    ) -> Result<Value> {
        let definition = registration.definition();
        trace!("Projecting {} into {}", ty.name(), definition.destination());
        for name in includes.unmatched(definition.properties().iter().map(|r| r.name())) {
            debug!("Ignoring include '{name}': not mapped on {}", ty.name());
        }

        let mut record = registration.instantiate(context)?;
        for rule in definition.properties() {
            if !includes.selects(rule.name(), rule.inclusion()) {
                continue;
            }
            let value = match rule.resolution() {
                Resolution::Translate(translator) => translator(source, context)?,
                Resolution::Copy { from } => {
                    let Some(raw) = source.property(from) else {
                        trace!("{} has no property '{from}', skipping", ty.name());
                        continue;
                    };
                    let nested = includes.narrow(rule.name());
                    let step = Step::new(&nested).with_hint(rule.hint());
                    match self.expand_nested(&raw, context, step, walk)? {
                        Outcome::Value(value) => value,
                        Outcome::Cycle => match self.options.cycle_placeholder {
                            CyclePlaceholder::Null => Value::Null,
                            CyclePlaceholder::Omit => continue,
                        },
                    }
                }
            };
            record.set(rule.name(), value);
        }
        Ok(Value::Record(record))
    }

    fn project_blind(
        &self,
        source: &Value,
        ty: &TypeInfo,
        context: &mut Context,
        includes: &IncludeSet,
        walk: &mut Walk,
    ) -> Result<Value> {
        let shape = source
            .as_record()
            .and_then(Record::shape)
            .unwrap_or(ty.short_name());
        let mut record = Record::new(shape);
        for name in source.property_names() {
            if includes.excludes(&name) {
                continue;
            }
            let Some(raw) = source.property(&name) else {
                continue;
            };
            let nested = includes.narrow(&name);
            match self.expand_nested(&raw, context, Step::new(&nested), walk)? {
                Outcome::Value(value) => record.set(name, value),
                Outcome::Cycle => {
                    if self.options.cycle_placeholder == CyclePlaceholder::Null {
                        record.set(name, Value::Null);
                    }
                }
            }
        }
        Ok(Value::Record(record))
    }

    fn project_collection(
        &self,
        list: &List,
        context: &mut Context,
        step: Step<'_>,
        walk: &mut Walk,
    ) -> Result<Value> {
        let element_step = Step::new(step.includes);
        let mut items: Vec<Value> = Vec::with_capacity(list.len());
        for element in list.iter() {
            let value = match self.expand_nested(element, context, element_step, walk)? {
                Outcome::Value(value) => value,
                Outcome::Cycle => match self.options.cycle_placeholder {
                    CyclePlaceholder::Null => Value::Null,
                    CyclePlaceholder::Omit => continue,
                },
            };
            if step.hint == CollectionHint::Distinct && items.contains(&value) {
                continue;
            }
            items.push(value);
        }
        Ok(Value::List(List::new(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MappingDefinition;
    use crate::{ToValue, Typed, reflect_properties};
    use std::sync::Arc;

    struct Point {
        x: i64,
        y: i64,
    }

    reflect_properties! {
        Point => {
            "X" => x,
            "Y" => y,
        }
    }

    struct Chain {
        label: String,
        next: Option<Arc<Chain>>,
    }

    reflect_properties! {
        Chain => {
            "Label" => label,
            "Next" => next,
        }
    }

    fn chain(len: usize) -> Arc<Chain> {
        let mut node: Option<Arc<Chain>> = None;
        for i in (0..len).rev() {
            node = Some(Arc::new(Chain {
                label: format!("n{i}"),
                next: node,
            }));
        }
        node.expect("len > 0")
    }

    fn point_registry() -> Registry {
        let mut registry = Registry::new();
        registry.register::<Point>(
            MappingDefinition::new("PointDto")
                .default_property("X")
                .property("Y"),
        );
        registry
    }

    #[test]
    fn default_and_explicit_properties() {
        let registry = point_registry();
        let expander = Expander::new(&registry);
        let point = Value::object(Arc::new(Point { x: 1, y: 2 }));

        let out = expander.expand_fresh(&point, &IncludeSet::new()).unwrap();
        let record = out.as_record().unwrap();
        assert_eq!(record.shape(), Some("PointDto"));
        assert_eq!(record.get("X"), Some(&Value::Int(1)));
        assert!(!record.contains("Y"));

        let out = expander
            .expand_fresh(&point, &IncludeSet::parse("Y,-X").unwrap())
            .unwrap();
        let record = out.as_record().unwrap();
        assert_eq!(record.get("Y"), Some(&Value::Int(2)));
        assert!(!record.contains("X"));
    }

    #[test]
    fn distinct_hint_drops_repeats() {
        let registry = point_registry();
        let expander = Expander::new(&registry);
        let list = Value::from(vec![Value::Int(1), Value::Int(1), Value::Int(2)]);
        let mut registry_blind = Registry::new();
        registry_blind.set_blind_expansion(true);
        let blind = Expander::new(&registry_blind);
        let out = blind
            .expand(
                &list,
                &mut Context::new(),
                &IncludeSet::new(),
                Some(CollectionHint::Distinct),
            )
            .unwrap();
        assert_eq!(out.as_list().unwrap().items(), &[Value::Int(1), Value::Int(2)]);
        // Without blind expansion an untyped list is plain and comes back as-is
        let out = expander
            .expand(
                &list,
                &mut Context::new(),
                &IncludeSet::new(),
                Some(CollectionHint::Distinct),
            )
            .unwrap();
        assert_eq!(out, list);
    }

    #[test]
    fn depth_limit_is_reported() {
        let mut registry = Registry::new();
        registry.register::<Chain>(
            MappingDefinition::new("Chain")
                .default_property("Label")
                .default_property("Next"),
        );
        let options = ExpandOptions {
            max_depth: 3,
            ..ExpandOptions::default()
        };
        let expander = Expander::new(&registry).with_options(options);

        let ok = expander.expand_fresh(&chain(4).to_value(), &IncludeSet::new());
        assert!(ok.is_ok());

        let err = expander
            .expand_fresh(&chain(5).to_value(), &IncludeSet::new())
            .unwrap_err();
        assert!(err.is_too_deep());
        assert!(err.type_name().unwrap().ends_with("Chain"));
    }

    #[derive(Clone)]
    struct Address {
        city: String,
    }

    reflect_properties! {
        Address => {
            "City" => city,
        }
    }

    /// Field that hands out a freshly allocated object on every read.
    struct Inline(Address);

    impl Typed for Inline {
        fn describe() -> TypeInfo {
            Address::describe()
        }
    }

    impl ToValue for Inline {
        fn to_value(&self) -> Value {
            Value::object(Arc::new(self.0.clone()))
        }
    }

    struct Contact {
        home: Inline,
        work: Inline,
    }

    reflect_properties! {
        Contact => {
            "Home" => home,
            "Work" => work,
        }
    }

    #[test]
    fn short_lived_siblings_are_not_cycles() {
        let mut registry = Registry::new();
        registry.register::<Address>(MappingDefinition::new("Address").default_property("City"));
        registry.register::<Contact>(
            MappingDefinition::new("Contact")
                .default_property("Home")
                .default_property("Work"),
        );
        let contact = Arc::new(Contact {
            home: Inline(Address {
                city: "Leeds".into(),
            }),
            work: Inline(Address {
                city: "York".into(),
            }),
        });
        let out = Expander::new(&registry)
            .expand_fresh(&contact.to_value(), &IncludeSet::new())
            .unwrap();
        let record = out.as_record().unwrap();
        for (name, city) in [("Home", "Leeds"), ("Work", "York")] {
            let address = record.get(name).and_then(Value::as_record).unwrap();
            assert_eq!(address.get("City"), Some(&Value::from(city)));
        }
    }

    #[test]
    fn nested_lists_count_towards_depth() {
        let mut registry = Registry::new();
        registry.set_blind_expansion(true);
        let mut nested = Value::Int(1);
        for _ in 0..100 {
            nested = Value::from(vec![nested]);
        }
        let options = ExpandOptions {
            max_depth: 3,
            ..ExpandOptions::default()
        };
        let err = Expander::new(&registry)
            .with_options(options)
            .expand_fresh(&nested, &IncludeSet::new())
            .unwrap_err();
        assert!(err.is_too_deep());

        let mut shallow = Value::Int(1);
        for _ in 0..3 {
            shallow = Value::from(vec![shallow]);
        }
        let out = Expander::new(&registry)
            .with_options(options)
            .expand_fresh(&shallow, &IncludeSet::new())
            .unwrap();
        assert_eq!(out, shallow);
    }

    #[test]
    fn null_source_is_null() {
        let registry = Registry::new();
        let out = Expander::new(&registry)
            .expand_fresh(&Value::Null, &IncludeSet::new())
            .unwrap();
        assert!(out.is_null());
    }
}
