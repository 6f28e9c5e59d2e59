//! Dynamic property access for user types.
//!
//! Instead of runtime reflection every expandable type implements [`Reflect`],
//! normally through the [`reflect_properties!`](crate::reflect_properties)
//! macro, and every field type implements [`ToValue`].

use std::sync::{Arc, Mutex, RwLock};

use crate::value::{List, ObjectRef, Record, TypeInfo, Value};

/// Readable property surface of a user type.
pub trait Reflect: Send + Sync + 'static {
    fn type_info(&self) -> TypeInfo;

    /// Public readable properties, in declaration order.
    fn property_names(&self) -> &'static [&'static str];

    fn property(&self, name: &str) -> Option<Value>;
}

/// Static type description, available without a value at hand.
pub trait Typed {
    fn describe() -> TypeInfo;
}

/// Conversion of a field into a [`Value`].
pub trait ToValue: Typed {
    fn to_value(&self) -> Value;
}

macro_rules! int_value {
    ($($t:ty),*) => {
        $(
            impl Typed for $t {
                fn describe() -> TypeInfo {
                    TypeInfo::scalar::<$t>()
                }
            }

            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }
            }
        )*
    };
}

macro_rules! wide_int_value {
    ($($t:ty),*) => {
        $(
            impl Typed for $t {
                fn describe() -> TypeInfo {
                    TypeInfo::scalar::<$t>()
                }
            }

            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    i64::try_from(*self)
                        .map(Value::Int)
                        .unwrap_or(Value::Float(*self as f64))
                }
            }
        )*
    };
}

int_value!(i8, i16, i32, i64, u8, u16, u32);
wide_int_value!(u64, usize, isize);

impl Typed for bool {
    fn describe() -> TypeInfo {
        TypeInfo::scalar::<bool>()
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl Typed for f32 {
    fn describe() -> TypeInfo {
        TypeInfo::scalar::<f32>()
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl Typed for f64 {
    fn describe() -> TypeInfo {
        TypeInfo::scalar::<f64>()
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl Typed for String {
    fn describe() -> TypeInfo {
        TypeInfo::text()
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl Typed for Value {
    fn describe() -> TypeInfo {
        TypeInfo::dynamic()
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl Typed for Record {
    fn describe() -> TypeInfo {
        TypeInfo::record()
    }
}

impl ToValue for Record {
    fn to_value(&self) -> Value {
        Value::Record(self.clone())
    }
}

impl<T: Typed> Typed for Option<T> {
    fn describe() -> TypeInfo {
        T::describe()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map(ToValue::to_value).unwrap_or(Value::Null)
    }
}

impl<T: Typed + 'static> Typed for Vec<T> {
    fn describe() -> TypeInfo {
        TypeInfo::collection::<Vec<T>>(T::describe())
    }
}

impl<T: ToValue + 'static> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        let items = self.iter().map(ToValue::to_value).collect();
        Value::List(List::typed::<Vec<T>>(T::describe(), items))
    }
}

impl<T: Typed + ?Sized> Typed for Arc<T> {
    fn describe() -> TypeInfo {
        T::describe()
    }
}

impl<T: Reflect + Typed> ToValue for Arc<T> {
    fn to_value(&self) -> Value {
        Value::Object(ObjectRef::new(Arc::clone(self)))
    }
}

impl<T: Typed> Typed for RwLock<T> {
    fn describe() -> TypeInfo {
        T::describe()
    }
}

impl<T: ToValue> ToValue for RwLock<T> {
    fn to_value(&self) -> Value {
        let guard = self.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.to_value()
    }
}

impl<T: Typed> Typed for Mutex<T> {
    fn describe() -> TypeInfo {
        T::describe()
    }
}

impl<T: ToValue> ToValue for Mutex<T> {
    fn to_value(&self) -> Value {
        let guard = self.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.to_value()
    }
}

/// Implement [`Typed`] and [`Reflect`] for a struct by listing its public
/// properties and the fields backing them.
///
/// # Example
/// ```rust
/// use shaper_core::reflect_properties;
///
/// struct Person {
///     name: String,
///     age: u32,
/// }
///
/// reflect_properties! {
///     Person => {
///         "Name" => name,
///         "Age" => age,
///     }
/// }
/// ```
#[macro_export]
macro_rules! reflect_properties {
    (
        $ty:ty => {
            $($name:literal => $field:ident),* $(,)?
        }
    ) => {
        impl $crate::Typed for $ty {
            fn describe() -> $crate::TypeInfo {
                const NAMES: &[&str] = &[$($name),*];
                $crate::TypeInfo::object::<$ty>(!NAMES.is_empty())
            }
        }

        impl $crate::Reflect for $ty {
            fn type_info(&self) -> $crate::TypeInfo {
                <$ty as $crate::Typed>::describe()
            }

            fn property_names(&self) -> &'static [&'static str] {
                &[$($name),*]
            }

            fn property(&self, name: &str) -> ::std::option::Option<$crate::Value> {
                match name {
                    $($name => ::std::option::Option::Some($crate::ToValue::to_value(&self.$field)),)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TypeKind;

    struct Tag {
        label: String,
        weight: Option<f32>,
    }

    reflect_properties! {
        Tag => {
            "Label" => label,
            "Weight" => weight,
        }
    }

    struct Marker;

    reflect_properties! { Marker => {} }

    #[test]
    fn macro_exposes_declared_properties() {
        let tag = Tag {
            label: "rust".into(),
            weight: None,
        };
        assert_eq!(tag.property_names(), &["Label", "Weight"]);
        assert_eq!(tag.property("Label"), Some(Value::from("rust")));
        assert_eq!(tag.property("Weight"), Some(Value::Null));
        assert_eq!(tag.property("label"), None);
        assert_eq!(
            tag.type_info().kind(),
            &TypeKind::Object {
                has_properties: true
            }
        );
    }

    #[test]
    fn marker_has_no_properties() {
        assert!(!Marker.type_info().exposes_properties());
        assert!(Marker.property_names().is_empty());
    }

    #[test]
    fn vec_of_shared_objects_declares_element_type() {
        let tags = vec![Arc::new(Tag {
            label: "a".into(),
            weight: Some(0.5),
        })];
        let value = tags.to_value();
        let list = value.as_list().expect("list");
        assert_eq!(list.element_type(), Some(&Tag::describe()));
        assert!(list.items()[0].as_object().is_some());
    }

    #[test]
    fn wide_integers_fall_back_to_float() {
        assert_eq!(u64::MAX.to_value(), Value::Float(u64::MAX as f64));
        assert_eq!(7usize.to_value(), Value::Int(7));
    }
}
