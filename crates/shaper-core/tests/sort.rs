/// Integration tests for sorting projected and source lists
use serde_json::json;
use shaper_core::{
    Expander, IncludeSet, MappingDefinition, Record, Registry, SortDirection, ToValue, Value,
    reflect_properties, sort,
};
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn xs(values: &[i64]) -> Value {
    values
        .iter()
        .map(|x| Value::from(Record::anonymous().with("x", *x)))
        .collect::<Vec<_>>()
        .into()
}

struct Book {
    title: String,
    year: u32,
}

reflect_properties! {
    Book => {
        "Title" => title,
        "Year" => year,
    }
}

fn books() -> Vec<Arc<Book>> {
    [("Dune", 1965), ("Emma", 1815), ("Ubik", 1969), ("Kim", 1901)]
        .into_iter()
        .map(|(title, year)| {
            Arc::new(Book {
                title: title.into(),
                year,
            })
        })
        .collect()
}

#[test]
fn test_sort_by_property_ascending() {
    init_logging();
    let sorted = sort(&xs(&[3, 1, 2]), "x", SortDirection::Ascending).unwrap();
    assert_eq!(
        serde_json::to_value(&sorted).unwrap(),
        json!([{"x": 1}, {"x": 2}, {"x": 3}])
    );
}

#[test]
fn test_sort_is_stable_for_equal_keys() {
    let list: Value = vec![
        Value::from(Record::anonymous().with("x", 2).with("id", "a")),
        Value::from(Record::anonymous().with("x", 1).with("id", "b")),
        Value::from(Record::anonymous().with("x", 2).with("id", "c")),
        Value::from(Record::anonymous().with("x", 1).with("id", "d")),
    ]
    .into();
    let sorted = sort(&list, "x", SortDirection::Ascending).unwrap();
    let ids: Vec<&str> = sorted
        .as_list()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_record()?.get("id")?.as_str())
        .collect();
    assert_eq!(ids, vec!["b", "d", "a", "c"]);
}

#[test]
fn test_sort_reflected_objects() {
    let source = books().to_value();
    let sorted = sort(&source, "Year", SortDirection::Descending).unwrap();
    let titles: Vec<String> = sorted
        .as_list()
        .unwrap()
        .iter()
        .filter_map(|v| v.property("Title")?.as_str().map(str::to_string))
        .collect();
    assert_eq!(titles, vec!["Ubik", "Dune", "Kim", "Emma"]);
    // Elements are the same shared objects, not copies
    assert_eq!(
        sorted.as_list().unwrap().items()[0].identity(),
        source.as_list().unwrap().items()[2].identity()
    );
}

#[test]
fn test_sort_projected_output() {
    let mut registry = Registry::new();
    registry.register::<Book>(
        MappingDefinition::new("BookDto")
            .default_property("Title")
            .property("Year"),
    );
    let projected = Expander::new(&registry)
        .expand_fresh(&books().to_value(), &IncludeSet::new())
        .unwrap();
    let sorted = sort(&projected, "Title", SortDirection::Ascending).unwrap();
    assert_eq!(
        serde_json::to_value(&sorted).unwrap(),
        json!([{"Title": "Dune"}, {"Title": "Emma"}, {"Title": "Kim"}, {"Title": "Ubik"}])
    );
}

#[test]
fn test_short_lists_skip_validation() {
    // With zero or one element the property is never looked up
    for list in [xs(&[]), xs(&[5])] {
        let sorted = sort(&list, "missing", SortDirection::Ascending).unwrap();
        assert_eq!(sorted, list);
    }
}

#[test]
fn test_unknown_direction_always_fails() {
    for source in [xs(&[]), xs(&[1, 2]), Value::from(7)] {
        let err = sort(&source, "x", SortDirection::Unknown).unwrap_err();
        assert!(err.is_argument());
    }
    let direction: SortDirection = "upwards".parse().unwrap();
    assert!(sort(&xs(&[2, 1]), "x", direction).is_err());
}

#[test]
fn test_non_enumerable_source() {
    let err = sort(&Value::from("abc"), "x", SortDirection::Ascending).unwrap_err();
    assert!(err.is_argument());
    assert!(!err.is_property_not_found());
}

#[test]
fn test_missing_property_on_first_element() {
    let err = sort(&xs(&[2, 1]), "y", SortDirection::Ascending).unwrap_err();
    assert!(err.is_property_not_found());
    assert!(err.user_message().contains('y'));
}
