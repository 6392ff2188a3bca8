//! Macro-generated test suite for `KeyValueStore<Person>` contract validation.
//!
//! The `key_value_store_tests!` macro generates a test module that validates
//! any `KeyValueStore<Person>` implementation against the contract the query
//! layer relies on: map operations, predicate filtering across the
//! `FieldValue` variants, paging predicates, and concurrent access.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod store_harness;
//!
//! use store_harness::*;
//! use hazel_data::storage::InMemoryMap;
//!
//! key_value_store_tests!(InMemoryMap::<Person>::new("people"));
//! ```
//!
//! # Generated Tests
//!
//! ## Map operations
//! - `test_put_and_get`: put then get, verify all fields
//! - `test_get_missing`: get with unknown key returns None
//! - `test_put_returns_previous`: overwriting returns the old value
//! - `test_remove`: remove returns the value once, then None
//! - `test_size_and_clear`
//!
//! ## Predicates
//! - `test_values_matching_string` / `_integer` / `_float` / `_boolean` / `_null`
//! - `test_keys_and_count_matching`
//! - `test_unknown_attribute_matches_nothing`
//!
//! ## Paging
//! - `test_values_page_ordered`: 23 entries, page size 5
//! - `test_values_page_filtered`
//!
//! ## Edge Cases
//! - `test_concurrent_access`: parallel puts from spawned threads

/// Generate a full `KeyValueStore<Person>` conformance test suite.
///
/// `$factory` must evaluate to an empty store implementing
/// `KeyValueStore<Person> + Clone + 'static` (shared state via Arc pattern).
/// It is re-evaluated for each test to ensure isolation.
#[macro_export]
macro_rules! key_value_store_tests {
    ($factory:expr) => {
        mod key_value_store_contract_tests {
            use super::*;
            use hazel_data::core::store::KeyValueStore;
            use hazel_data::query::{
                Direction, EntryComparator, PagingPredicate, Predicates, PropertyComparator,
            };

            fn filled() -> impl KeyValueStore<Person> + Clone + 'static {
                let store = $factory;
                for p in band_members() {
                    store.put(p.id, p).unwrap();
                }
                store
            }

            // ==================================================================
            // Map operations
            // ==================================================================

            #[test]
            fn test_put_and_get() {
                let store = $factory;
                let dave = person(1, "Dave", "Matthews", 47);
                assert!(store.put(1, dave.clone()).unwrap().is_none());

                let retrieved = store.get(&1).unwrap().expect("stored person");
                assert_eq!(retrieved, dave);
                assert_eq!(retrieved.firstname, "Dave");
                assert!((retrieved.score - 4.7).abs() < f64::EPSILON);
            }

            #[test]
            fn test_get_missing() {
                let store = $factory;
                assert!(store.get(&42).unwrap().is_none());
                assert!(!store.contains_key(&42).unwrap());
            }

            #[test]
            fn test_put_returns_previous() {
                let store = filled();
                let previous = store.put(1, person(1, "David", "Matthews", 48)).unwrap();
                assert_eq!(previous.map(|p| p.firstname), Some("Dave".to_string()));
                assert_eq!(store.get(&1).unwrap().unwrap().firstname, "David");
                assert_eq!(store.size().unwrap(), band_members().len());
            }

            #[test]
            fn test_remove() {
                let store = filled();
                assert_eq!(store.remove(&2).unwrap().map(|p| p.id), Some(2));
                assert!(store.remove(&2).unwrap().is_none());
                assert!(!store.contains_key(&2).unwrap());
            }

            #[test]
            fn test_size_and_clear() {
                let store = filled();
                assert_eq!(store.size().unwrap(), 9);
                assert_eq!(store.values().unwrap().len(), 9);
                store.clear().unwrap();
                assert_eq!(store.size().unwrap(), 0);
                assert!(store.values().unwrap().is_empty());
            }

            // ==================================================================
            // Predicates
            // ==================================================================

            #[test]
            fn test_values_matching_string() {
                let store = filled();
                let found = store
                    .values_matching(&Predicates::equal("lastname", "Matthews"))
                    .unwrap();
                assert_eq!(ids(&found), vec![1]);
            }

            #[test]
            fn test_values_matching_integer() {
                let store = filled();
                let found = store
                    .values_matching(&Predicates::greater_equal("age", 51))
                    .unwrap();
                assert_eq!(ids(&found), vec![2, 6, 9]);
            }

            #[test]
            fn test_values_matching_float() {
                let store = filled();
                let found = store
                    .values_matching(&Predicates::less_than("score", 4.0))
                    .unwrap();
                assert_eq!(ids(&found), vec![8]);
            }

            #[test]
            fn test_values_matching_boolean() {
                let store = filled();
                let found = store
                    .values_matching(&Predicates::equal("active", true))
                    .unwrap();
                assert_eq!(ids(&found), vec![2, 4, 5, 6]);
            }

            #[test]
            fn test_values_matching_null() {
                let store = filled();
                let found = store
                    .values_matching(&Predicates::is_not_null("email"))
                    .unwrap();
                assert_eq!(ids(&found), vec![9]);
                let found = store.values_matching(&Predicates::is_null("email")).unwrap();
                assert_eq!(found.len(), 8);
            }

            #[test]
            fn test_keys_and_count_matching() {
                let store = filled();
                let predicate = Predicates::equal("age", 49);
                let mut keys = store.keys_matching(&predicate).unwrap();
                keys.sort();
                assert_eq!(keys, vec![3, 7]);
                assert_eq!(store.count_matching(&predicate).unwrap(), 2);
            }

            #[test]
            fn test_unknown_attribute_matches_nothing() {
                let store = filled();
                let found = store
                    .values_matching(&Predicates::equal("nickname", "Dave"))
                    .unwrap();
                assert!(found.is_empty());
            }

            // ==================================================================
            // Paging
            // ==================================================================

            #[test]
            fn test_values_page_ordered() {
                let store = $factory;
                for p in numbered(23) {
                    store.put(p.id, p).unwrap();
                }
                let comparator =
                    EntryComparator::new(vec![PropertyComparator::new("age", Direction::Asc)]);
                let mut paging = PagingPredicate::new(5).with_comparator(comparator);

                let mut sizes = Vec::new();
                let mut has_next = Vec::new();
                let mut seen = Vec::new();
                for _ in 0..5 {
                    let page = store.values_page(&paging).unwrap();
                    sizes.push(page.len());
                    has_next.push(page.has_next);
                    seen.extend(ordered_ids(&page.values));
                    paging.next_page();
                }
                assert_eq!(sizes, vec![5, 5, 5, 5, 3]);
                assert_eq!(has_next, vec![true, true, true, true, false]);
                assert_eq!(seen, (1..=23).collect::<Vec<u64>>());
            }

            #[test]
            fn test_values_page_filtered() {
                let store = filled();
                let comparator =
                    EntryComparator::new(vec![PropertyComparator::new("age", Direction::Desc)]);
                let paging = PagingPredicate::new(2)
                    .with_predicate(Predicates::less_than("age", 50))
                    .with_comparator(comparator);
                let page = store.values_page(&paging).unwrap();
                assert_eq!(page.len(), 2);
                assert_eq!(page.values[0].age, 49);
                assert_eq!(page.values[1].age, 49);
                assert!(page.has_next);
            }

            // ==================================================================
            // Edge Cases
            // ==================================================================

            #[test]
            fn test_concurrent_access() {
                let store = $factory;
                let handles: Vec<_> = (0..8u64)
                    .map(|worker| {
                        let store = store.clone();
                        std::thread::spawn(move || {
                            for i in 0..25u64 {
                                let id = worker * 100 + i;
                                store.put(id, person(id, "Worker", "Thread", i as i64)).unwrap();
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
                assert_eq!(store.size().unwrap(), 200);
                assert_eq!(
                    store.count_matching(&Predicates::equal("age", 0)).unwrap(),
                    8
                );
            }
        }
    };
}
