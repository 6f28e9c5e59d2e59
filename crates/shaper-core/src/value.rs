//! Dynamic values flowing through an expansion.
//!
//! Sources are read through [`Value`]: scalars and text are plain leaves,
//! [`List`] carries the declared element type of the collection it came from,
//! [`Record`] is an ordered bag of named fields (the destination shape of every
//! projection), and [`ObjectRef`] is a shared handle to a user type that
//! implements [`Reflect`].

use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::reflect::Reflect;

/// Exact runtime identity of a Rust type, used as the registry key.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name, e.g. `app::model::Person`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name, without generic arguments.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Structural kind of a type, as far as expansion cares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// Numbers, booleans and text
    Scalar,
    /// A [`Record`]; always exposes its fields
    Record,
    /// An untyped [`Value`] slot, e.g. the element type of `Vec<Value>`
    Dynamic,
    /// A [`Reflect`] implementor
    Object { has_properties: bool },
    /// An ordered collection with a declared element type
    Collection(Box<TypeInfo>),
}

/// Type key plus structural kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeInfo {
    key: TypeKey,
    kind: TypeKind,
}

impl TypeInfo {
    pub fn scalar<T: ?Sized + 'static>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            kind: TypeKind::Scalar,
        }
    }

    pub fn text() -> Self {
        Self::scalar::<String>()
    }

    pub fn record() -> Self {
        Self {
            key: TypeKey::of::<Record>(),
            kind: TypeKind::Record,
        }
    }

    pub fn dynamic() -> Self {
        Self {
            key: TypeKey::of::<Value>(),
            kind: TypeKind::Dynamic,
        }
    }

    pub fn object<T: ?Sized + 'static>(has_properties: bool) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            kind: TypeKind::Object { has_properties },
        }
    }

    pub fn collection<C: ?Sized + 'static>(element: TypeInfo) -> Self {
        Self {
            key: TypeKey::of::<C>(),
            kind: TypeKind::Collection(Box::new(element)),
        }
    }

    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    pub fn short_name(&self) -> &'static str {
        self.key.short_name()
    }

    /// Declared element type, for collections.
    pub fn element(&self) -> Option<&TypeInfo> {
        match &self.kind {
            TypeKind::Collection(element) => Some(element),
            _ => None,
        }
    }

    /// Whether values of this type expose a list of readable properties.
    pub fn exposes_properties(&self) -> bool {
        match self.kind {
            TypeKind::Record | TypeKind::Dynamic => true,
            TypeKind::Object { has_properties } => has_properties,
            TypeKind::Scalar | TypeKind::Collection(_) => false,
        }
    }

    /// Plain data: no reflected user object can appear inside a value of this type.
    pub fn is_plain(&self) -> bool {
        match &self.kind {
            TypeKind::Scalar | TypeKind::Record | TypeKind::Dynamic => true,
            TypeKind::Object { .. } => false,
            TypeKind::Collection(element) => element.is_plain(),
        }
    }
}

/// Identity of a shared object: the address of its allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

/// Shared handle to a reflected user object.
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn Reflect>);

impl ObjectRef {
    pub fn new<T: Reflect>(object: Arc<T>) -> Self {
        Self(object)
    }

    pub fn id(&self) -> ObjectId {
        ObjectId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        self.id() == other.id()
    }
}

impl Deref for ObjectRef {
    type Target = dyn Reflect;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl<T: Reflect> From<Arc<T>> for ObjectRef {
    fn from(object: Arc<T>) -> Self {
        Self::new(object)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.type_info().short_name(), self.id().0)
    }
}

/// Ordered collection of values with the element type it was declared with.
#[derive(Clone, Debug, PartialEq)]
pub struct List {
    info: TypeInfo,
    items: Vec<Value>,
}

impl List {
    /// Untyped list: elements are `Value`.
    pub fn new(items: Vec<Value>) -> Self {
        Self::typed::<Vec<Value>>(TypeInfo::dynamic(), items)
    }

    /// List remembering the concrete collection type `C` and its element type.
    pub fn typed<C: ?Sized + 'static>(element: TypeInfo, items: Vec<Value>) -> Self {
        Self {
            info: TypeInfo::collection::<C>(element),
            items,
        }
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.info
    }

    pub fn element_type(&self) -> Option<&TypeInfo> {
        self.info.element()
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Same declared type, different items.
    pub fn with_items(&self, items: Vec<Value>) -> Self {
        Self {
            info: self.info.clone(),
            items,
        }
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Destination instance: named fields in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    shape: Option<String>,
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Empty record for the named destination shape.
    pub fn new<S: Into<String>>(shape: S) -> Self {
        Self {
            shape: Some(shape.into()),
            fields: Vec::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn shape(&self) -> Option<&str> {
        self.shape.as_deref()
    }

    /// Set a field, replacing any previous value under the same name.
    pub fn set<N: Into<String>, V: Into<Value>>(&mut self, name: N, value: V) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with<N: Into<String>, V: Into<Value>>(mut self, name: N, value: V) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A dynamically typed value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(List),
    Record(Record),
    Object(ObjectRef),
}

impl Value {
    pub fn object<T: Reflect>(object: Arc<T>) -> Self {
        Value::Object(ObjectRef::new(object))
    }

    /// Runtime type of this value. `Null` has none.
    pub fn type_info(&self) -> Option<TypeInfo> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(TypeInfo::scalar::<bool>()),
            Value::Int(_) => Some(TypeInfo::scalar::<i64>()),
            Value::Float(_) => Some(TypeInfo::scalar::<f64>()),
            Value::Text(_) => Some(TypeInfo::text()),
            Value::List(list) => Some(list.type_info().clone()),
            Value::Record(_) => Some(TypeInfo::record()),
            Value::Object(object) => Some(object.type_info()),
        }
    }

    /// Identity for cycle detection; only shared objects have one.
    pub fn identity(&self) -> Option<ObjectId> {
        match self {
            Value::Object(object) => Some(object.id()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Names of the readable properties of an object or record.
    pub fn property_names(&self) -> Vec<String> {
        match self {
            Value::Object(object) => object
                .property_names()
                .iter()
                .map(|n| n.to_string())
                .collect(),
            Value::Record(record) => record.names().map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    pub fn has_property(&self, name: &str) -> bool {
        match self {
            Value::Object(object) => object.property_names().iter().any(|n| *n == name),
            Value::Record(record) => record.contains(name),
            _ => false,
        }
    }

    /// Read a property off an object or record.
    pub fn property(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(object) => object.property(name),
            Value::Record(record) => record.get(name).cloned(),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
            Value::List(_) => 4,
            Value::Record(_) => 5,
            Value::Object(_) => 6,
        }
    }

    /// Total natural ordering: null first, then booleans, numbers, text,
    /// lists, records and objects. Integers and floats compare numerically.
    pub fn natural_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let a = self.as_f64().unwrap_or_default();
                let b = other.as_f64().unwrap_or_default();
                a.total_cmp(&b)
            }
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| x.natural_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Value::Record(a), Value::Record(b)) => a
                .iter()
                .zip(b.iter())
                .map(|((na, va), (nb, vb))| na.cmp(nb).then_with(|| va.natural_cmp(vb)))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Value::Object(a), Value::Object(b)) => a
                .type_info()
                .short_name()
                .cmp(b.type_info().short_name()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<List> for Value {
    fn from(v: List) -> Self {
        Value::List(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(List::new(v))
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(feature = "serde")]
mod serialize {
    use super::{Record, Value};
    use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

    impl Serialize for Record {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (name, value) in self.iter() {
                map.serialize_entry(name, value)?;
            }
            map.end()
        }
    }

    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Value::Null => serializer.serialize_unit(),
                Value::Bool(b) => serializer.serialize_bool(*b),
                Value::Int(i) => serializer.serialize_i64(*i),
                Value::Float(f) => serializer.serialize_f64(*f),
                Value::Text(s) => serializer.serialize_str(s),
                Value::List(list) => {
                    let mut seq = serializer.serialize_seq(Some(list.len()))?;
                    for item in list.iter() {
                        seq.serialize_element(item)?;
                    }
                    seq.end()
                }
                Value::Record(record) => record.serialize(serializer),
                // Unprojected objects stay opaque on the wire
                Value::Object(object) => serializer.serialize_str(object.type_info().short_name()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_strips_path_and_generics() {
        assert_eq!(TypeKey::of::<String>().short_name(), "String");
        assert_eq!(TypeKey::of::<Vec<Record>>().short_name(), "Vec");
        assert_eq!(TypeKey::of::<Record>().short_name(), "Record");
    }

    #[test]
    fn record_set_replaces_in_place() {
        let mut record = Record::new("Person").with("Name", "Ada").with("Age", 36);
        record.set("Name", "Grace");
        let names: Vec<_> = record.names().collect();
        assert_eq!(names, vec!["Name", "Age"]);
        assert_eq!(record.get("Name"), Some(&Value::from("Grace")));
        assert_eq!(record.remove("Age"), Some(Value::Int(36)));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn natural_ordering_mixes_numbers() {
        assert_eq!(Value::Int(2).natural_cmp(&Value::Float(2.5)), Ordering::Less);
        assert_eq!(Value::Float(3.0).natural_cmp(&Value::Int(3)), Ordering::Equal);
        assert_eq!(Value::Null.natural_cmp(&Value::Bool(false)), Ordering::Less);
        assert_eq!(
            Value::from("b").natural_cmp(&Value::from("a")),
            Ordering::Greater
        );
    }

    #[test]
    fn plain_types() {
        assert!(TypeInfo::text().is_plain());
        assert!(List::new(vec![]).type_info().is_plain());
        let objects = TypeInfo::collection::<Vec<()>>(TypeInfo::object::<()>(true));
        assert!(!objects.is_plain());
        assert!(!objects.exposes_properties());
    }
}
