//! Shared test harness for key-value store and repository testing
//!
//! Provides the `Person` fixture (fields spanning the `FieldValue` variants the
//! query layer compares), the band members data set, and a logging helper.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod store_harness;
//! use store_harness::*;
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod key_value_store_tests;

use std::sync::{Arc, Once};

use hazel_data::config::RepositoryDefinition;
use hazel_data::core::store::KeyValueStore;
use hazel_data::query::QueryMethod;
use hazel_data::repository::{KeyValueRepository, RepositoryFactory};
use hazel_data::storage::InMemoryMap;

hazel_data::impl_entity!(
    Person,
    "person",
    key_space: "people",
    id: u64,
    {
        firstname: String,
        lastname: String,
        age: i64,
        score: f64,
        active: bool,
        email: Option<String>,
    }
);

/// Create a person with derived score and no email
pub fn person(id: u64, firstname: &str, lastname: &str, age: i64) -> Person {
    Person::new(
        id,
        firstname.to_string(),
        lastname.to_string(),
        age,
        age as f64 / 10.0,
        age % 2 == 0,
        None,
    )
}

/// The band members data set
pub fn band_members() -> Vec<Person> {
    vec![
        person(1, "Dave", "Matthews", 47),
        person(2, "Carter", "Beauford", 52),
        person(3, "Boyd", "Tinsley", 49),
        person(4, "Stefan", "Lessard", 40),
        person(5, "LeRoi", "Moore", 46),
        person(6, "Tim", "Reynolds", 60),
        person(7, "Jeff", "Coffin", 49),
        person(8, "Rashawn", "Ross", 37),
        Person::new(
            9,
            "Buddy".to_string(),
            "Strong".to_string(),
            51,
            5.1,
            false,
            Some("buddy@dmband.com".to_string()),
        ),
    ]
}

/// `count` people with ages 1..=count, inserted in reverse age order
pub fn numbered(count: u64) -> Vec<Person> {
    (1..=count)
        .rev()
        .map(|i| person(i, &format!("Person{:02}", i), "Numbered", i as i64))
        .collect()
}

/// A fresh in-memory map named after the `Person` key space
pub fn people_store() -> Arc<dyn KeyValueStore<Person>> {
    Arc::new(InMemoryMap::<Person>::new("people"))
}

/// Store `people` in a fresh map
pub fn store_with(people: Vec<Person>) -> Arc<dyn KeyValueStore<Person>> {
    let store = people_store();
    for p in people {
        store.put(p.id, p).unwrap();
    }
    store
}

/// A repository declaring `methods`, backed by a map holding `people`
pub fn repository_with(methods: Vec<QueryMethod>, people: Vec<Person>) -> KeyValueRepository<Person> {
    let definition = methods
        .into_iter()
        .fold(RepositoryDefinition::new("person"), RepositoryDefinition::method);
    RepositoryFactory::create_from_definition(&definition, store_with(people)).unwrap()
}

/// Sorted ids of `people`
pub fn ids(people: &[Person]) -> Vec<u64> {
    let mut ids: Vec<u64> = people.iter().map(|p| p.id).collect();
    ids.sort();
    ids
}

/// Ids of `people` in their current order
pub fn ordered_ids(people: &[Person]) -> Vec<u64> {
    people.iter().map(|p| p.id).collect()
}

static TRACING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
