use std::convert::Infallible;
use std::str::FromStr;

use log::trace;
use shaper_error::{ArgumentErrorKind, PropertyErrorKind, Result, ShaperError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SortDirection {
    Ascending,
    Descending,
    /// Never sorted; callers must choose a direction explicitly
    #[default]
    Unknown,
}

impl FromStr for SortDirection {
    type Err = Infallible;

    /// Unrecognised input parses to [`SortDirection::Unknown`].
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => SortDirection::Ascending,
            "desc" | "descending" => SortDirection::Descending,
            _ => SortDirection::Unknown,
        })
    }
}

/// Stable sort of a list by one property of its elements.
///
/// The property is looked up on the first element only; elements further on
/// that lack it sort as `Null`. Lists of zero or one element come back
/// unchanged without any comparison. The result shares element references
/// with `source`.
pub fn sort(source: &Value, property: &str, direction: SortDirection) -> Result<Value> {
    if direction == SortDirection::Unknown {
        return Err(ShaperError::argument(
            "sort direction must be ascending or descending",
            ArgumentErrorKind::UnknownDirection,
        ));
    }
    let Value::List(list) = source else {
        let kind = source
            .type_info()
            .map(|ty| ty.short_name())
            .unwrap_or("null");
        return Err(ShaperError::argument(
            format!("cannot sort a non-enumerable {kind} value"),
            ArgumentErrorKind::NotEnumerable,
        ));
    };
    let Some(first) = list.items().first().filter(|_| list.len() > 1) else {
        trace!("Skipping sort of {} element(s)", list.len());
        return Ok(source.clone());
    };
    if !first.has_property(property) {
        let type_name = first
            .type_info()
            .map(|ty| ty.name())
            .unwrap_or("null");
        return Err(ShaperError::property(
            format!("no property '{property}' to sort by"),
            PropertyErrorKind::NotFound,
        )
        .with_property(property)
        .with_type_name(type_name));
    }

    let mut keyed: Vec<(Value, &Value)> = list
        .iter()
        .map(|item| (item.property(property).unwrap_or_default(), item))
        .collect();
    // sort_by is stable, so equal keys keep their source order either way
    match direction {
        SortDirection::Descending => keyed.sort_by(|(a, _), (b, _)| b.natural_cmp(a)),
        _ => keyed.sort_by(|(a, _), (b, _)| a.natural_cmp(b)),
    }
    let items = keyed.into_iter().map(|(_, item)| item.clone()).collect();
    Ok(Value::List(list.with_items(items)))
}
