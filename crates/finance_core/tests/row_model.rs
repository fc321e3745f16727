use finance_core::{Row, TableError};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

fn hash_of(row: &Row) -> u64 {
    let mut hasher = DefaultHasher::new();
    row.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn columns_enumerate_in_insertion_order() {
    let row = Row::from_pairs([("b", "2"), ("a", "1"), ("c", "3")]).unwrap();

    assert_eq!(row.columns(), vec!["b", "a", "c"]);
    assert_eq!(row.len(), 3);
    assert_eq!(row.value("a").unwrap(), "1");
}

#[test]
fn add_column_rejects_duplicates_and_empty_names() {
    let mut row = Row::new();
    row.add_column("Amount", "10").unwrap();

    assert!(matches!(
        row.add_column("Amount", "20"),
        Err(TableError::DuplicateColumn(column)) if column == "Amount"
    ));
    assert!(matches!(row.add_column("", "x"), Err(TableError::Schema(_))));
    assert_eq!(row.value("Amount").unwrap(), "10");
}

#[test]
fn value_of_missing_column_is_key_not_found() {
    let row = Row::from_pairs([("Month", "082024")]).unwrap();

    assert!(matches!(
        row.value("Amount"),
        Err(TableError::KeyNotFound(column)) if column == "Amount"
    ));
}

#[test]
fn update_column_replaces_existing_value_or_appends() {
    let mut row = Row::from_pairs([("Month", "082024")]).unwrap();

    row.update_column("Month", "092024").unwrap();
    row.update_column("Amount", "300").unwrap();

    assert_eq!(row.value("Month").unwrap(), "092024");
    assert_eq!(row.value("Amount").unwrap(), "300");
    assert_eq!(row.columns(), vec!["Month", "Amount"]);
}

#[test]
fn update_column_rejects_empty_name() {
    let mut row = Row::from_pairs([("Month", "082024")]).unwrap();

    assert!(matches!(row.update_column("", "x"), Err(TableError::Schema(_))));
    assert_eq!(row, Row::from_pairs([("Month", "082024")]).unwrap());
    assert_eq!(row.columns(), vec!["Month"]);
}

#[test]
fn equality_and_hash_ignore_column_order() {
    let first = Row::from_pairs([("a", "1"), ("b", "2")]).unwrap();
    let second = Row::from_pairs([("b", "2"), ("a", "1")]).unwrap();

    assert_eq!(first, second);
    assert_eq!(hash_of(&first), hash_of(&second));

    let set: HashSet<Row> = [first, second].into_iter().collect();
    assert_eq!(set.len(), 1);
}

#[test]
fn rows_with_different_values_or_columns_are_not_equal() {
    let base = Row::from_pairs([("a", "1"), ("b", "2")]).unwrap();
    let other_value = Row::from_pairs([("a", "1"), ("b", "3")]).unwrap();
    let extra_column = Row::from_pairs([("a", "1"), ("b", "2"), ("c", "3")]).unwrap();

    assert_ne!(base, other_value);
    assert_ne!(base, extra_column);
}

#[test]
fn display_lists_cells_in_insertion_order() {
    let row = Row::from_pairs([("Month", "082024"), ("Amount", "300")]).unwrap();

    assert_eq!(row.to_string(), "Month: 082024 Amount: 300 ");
}
