//! End-to-end tests for derived and declared query methods
//!
//! Every test declares its methods on a repository backed by an in-memory
//! map and checks the results against an independent brute-force filter or
//! a hand-computed expectation.

#[macro_use]
mod store_harness;

use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use hazel_data::config::RepositoryDefinition;
use hazel_data::core::error::Result;
use hazel_data::core::store::KeyValueStore;
use hazel_data::query::{
    Argument, CompiledQuery, Order, PageRequest, PagingPredicate, PagingResult, Predicate,
    QueryEngine, QueryLookupStrategy, QueryMethod, ReturnType, Sort,
};
use hazel_data::repository::RepositoryFactory;
use hazel_data::storage::InMemoryMap;
use store_harness::*;

fn list(repository_methods: Vec<QueryMethod>, people: Vec<Person>, name: &str, args: Vec<Argument>) -> Vec<Person> {
    repository_with(repository_methods, people)
        .execute(name, args)
        .unwrap()
        .into_list()
        .unwrap()
}

fn by_age(age: i64) -> Argument {
    Argument::value(age)
}

// ============================================================================
// Predicates against a brute-force filter
// ============================================================================

#[test]
fn test_greater_than_on_strings() {
    let people = vec![person(1, "X", "A", 1), person(2, "X", "B", 2), person(3, "X", "C", 3)];
    let found = list(
        vec![QueryMethod::new("findByLastnameGreaterThan").param("lastname")],
        people,
        "findByLastnameGreaterThan",
        vec![Argument::value("B")],
    );
    assert_eq!(ids(&found), vec![3]);
}

#[test]
fn test_operators_match_brute_force() {
    init_tracing();

    type Check = fn(&Person) -> bool;
    let cases: [(&str, Vec<Argument>, Check); 14] = [
        ("findByAge", vec![by_age(49)], |p: &Person| p.age == 49),
        ("findByAgeIs", vec![by_age(49)], |p: &Person| p.age == 49),
        ("findByAgeNot", vec![by_age(49)], |p: &Person| p.age != 49),
        ("findByAgeGreaterThan", vec![by_age(49)], |p: &Person| p.age > 49),
        ("findByAgeGreaterThanEqual", vec![by_age(49)], |p: &Person| p.age >= 49),
        ("findByAgeLessThan", vec![by_age(49)], |p: &Person| p.age < 49),
        ("findByAgeIsLessThanEqual", vec![by_age(49)], |p: &Person| p.age <= 49),
        ("findByScoreGreaterThan", vec![Argument::value(4.8)], |p: &Person| p.score > 4.8),
        ("findByActiveTrue", vec![], |p: &Person| p.active),
        ("findByActiveFalse", vec![], |p: &Person| !p.active),
        ("findByEmailIsNull", vec![], |p: &Person| p.email.is_none()),
        ("findByEmailIsNotNull", vec![], |p: &Person| p.email.is_some()),
        ("findByLastnameLike", vec![Argument::value("%o%")], |p: &Person| p.lastname.contains('o')),
        ("findByLastnameIgnoreCase", vec![Argument::value("ross")], |p: &Person| p.lastname == "Ross"),
    ];

    for (name, args, check) in cases {
        let method = QueryMethod::new(name).positional_params(args.len());
        let found = list(vec![method], band_members(), name, args);
        let expected: Vec<Person> = band_members().into_iter().filter(check).collect();
        assert_eq!(ids(&found), ids(&expected), "{}", name);
    }
}

#[test]
fn test_like_wildcards() {
    let people = vec![
        person(1, "Humphrey", "Bogart", 57),
        person(2, "Henry", "Fonda", 77),
        person(3, "Harold", "Lloyd", 77),
        person(4, "Hy", "Anderson", 40),
    ];
    let methods = vec![QueryMethod::new("findByFirstnameLike").param("firstname")];
    let found = list(methods.clone(), people.clone(), "findByFirstnameLike", vec![Argument::value("H%y")]);
    assert_eq!(ids(&found), vec![1, 2, 4]);

    let found = list(methods, people, "findByFirstnameLike", vec![Argument::value("H_")]);
    assert_eq!(ids(&found), vec![4]);
}

#[test]
fn test_ignore_case_equality_is_literal() {
    let methods = vec![QueryMethod::new("findByLastnameIgnoreCase").param("lastname")];
    let found = list(methods.clone(), band_members(), "findByLastnameIgnoreCase", vec![Argument::value("mATTHEWS")]);
    assert_eq!(ids(&found), vec![1]);

    let found = list(methods, band_members(), "findByLastnameIgnoreCase", vec![Argument::value("m%")]);
    assert!(found.is_empty());
}

#[test]
fn test_all_ignore_case() {
    let name = "findByFirstnameAndLastnameAllIgnoreCase";
    let found = list(
        vec![QueryMethod::new(name).param("firstname").param("lastname")],
        band_members(),
        name,
        vec![Argument::value("dave"), Argument::value("MATTHEWS")],
    );
    assert_eq!(ids(&found), vec![1]);
}

#[test]
fn test_or_groups() {
    let name = "findByAgeLessThanOrLastnameAndActiveTrue";
    let found = list(
        vec![QueryMethod::new(name).positional_params(2)],
        band_members(),
        name,
        vec![by_age(40), Argument::value("Reynolds")],
    );
    assert_eq!(ids(&found), vec![6, 8]);
}

// ============================================================================
// Round trip and idempotence
// ============================================================================

#[test]
fn test_conjunction_returns_only_exact_match() {
    let exact = person(1, "Dave", "Matthews", 47);
    let people = vec![
        exact.clone(),
        person(2, "Davey", "Matthews", 47),
        person(3, "Dave", "Mathews", 47),
        person(4, "Dave", "Matthews", 48),
    ];
    let name = "findByFirstnameAndLastnameAndAge";
    let found = list(
        vec![QueryMethod::new(name).param("firstname").param("lastname").param("age")],
        people,
        name,
        vec![Argument::value("Dave"), Argument::value("Matthews"), by_age(47)],
    );
    assert_eq!(found, vec![exact]);
}

#[test]
fn test_compiling_twice_gives_identical_results() {
    let method = QueryMethod::new("findByAgeGreaterThanOrderByAgeDesc").param("age");
    let first = CompiledQuery::compile::<Person>(&method, QueryLookupStrategy::default()).unwrap();
    let second = CompiledQuery::compile::<Person>(&method, QueryLookupStrategy::default()).unwrap();
    assert_eq!(first, second);

    let engine = QueryEngine::new(store_with(band_members()));
    let run = |compiled: &CompiledQuery| {
        let found = compiled
            .execute(&engine, vec![by_age(45)])
            .unwrap()
            .into_list()
            .unwrap();
        found.iter().map(|p| p.age).collect::<Vec<i64>>()
    };
    assert_eq!(run(&first), run(&second));
    assert_eq!(run(&first), vec![60, 52, 51, 49, 49, 47, 46]);
}

// ============================================================================
// Sorting
// ============================================================================

#[test]
fn test_multi_key_sort_matches_reference() {
    let mut people = band_members();
    people.push(person(10, "Dave", "Ross", 37));
    people.push(person(11, "Alan", "Ross", 52));

    let repository = repository_with(vec![], people.clone());
    let sort = Sort::by(vec![Order::desc("age"), Order::asc("lastname"), Order::asc("firstname")]);
    let sorted = repository.find_all_sorted(&sort).unwrap();

    let mut reference = people;
    reference.sort_by(|a, b| {
        b.age
            .cmp(&a.age)
            .then_with(|| a.lastname.cmp(&b.lastname))
            .then_with(|| a.firstname.cmp(&b.firstname))
    });
    assert_eq!(ordered_ids(&sorted), ordered_ids(&reference));
}

#[test]
fn test_missing_values_sort_low_in_both_directions() {
    let mut people = band_members();
    people.push(Person::new(10, "Ann".into(), "Z".into(), 30, 3.0, true, Some("ann@z.org".into())));

    let repository = repository_with(vec![], people);
    let ascending = repository.find_all_sorted(&Sort::by(vec![Order::asc("email")])).unwrap();
    let descending = repository.find_all_sorted(&Sort::by(vec![Order::desc("email")])).unwrap();

    assert!(ascending[..8].iter().all(|p| p.email.is_none()));
    assert!(descending[..8].iter().all(|p| p.email.is_none()));
    assert_eq!(ordered_ids(&ascending[8..]), vec![10, 9]);
    assert_eq!(ordered_ids(&descending[8..]), vec![9, 10]);
}

#[test]
fn test_static_and_dynamic_sort() {
    let methods = vec![
        QueryMethod::new("findByActiveFalseOrderByAgeDescFirstnameAsc"),
        QueryMethod::new("findByActiveFalse").sort_param(),
    ];
    let repository = repository_with(methods, band_members());

    let static_sort = repository
        .execute("findByActiveFalseOrderByAgeDescFirstnameAsc", vec![])
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(ordered_ids(&static_sort), vec![9, 3, 7, 1, 8]);

    let sort = Sort::by(vec![Order::asc("age"), Order::desc("firstname")]);
    let dynamic = repository
        .execute("findByActiveFalse", vec![Argument::Sort(sort)])
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(ordered_ids(&dynamic), vec![8, 1, 7, 3, 9]);
}

#[test]
fn test_unsupported_sort_options() {
    let repository = repository_with(vec![QueryMethod::new("findByActiveTrue").sort_param()], band_members());
    let err = repository
        .execute("findByActiveTrue", vec![Argument::Sort(Sort::by(vec![Order::asc("lastname").ignore_case()]))])
        .unwrap_err();
    assert!(err.is_unsupported_sort());
}

// ============================================================================
// Limiting, paging and slicing
// ============================================================================

#[test]
fn test_top_and_first() {
    let methods = vec![
        QueryMethod::new("findTop3ByActiveFalseOrderByAgeDesc"),
        QueryMethod::new("findFirstByOrderByAgeAsc").returns(ReturnType::Single),
    ];
    let repository = repository_with(methods, band_members());

    let top = repository
        .execute("findTop3ByActiveFalseOrderByAgeDesc", vec![])
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(ids(&top), vec![3, 7, 9]);

    let youngest = repository
        .execute("findFirstByOrderByAgeAsc", vec![])
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(youngest.map(|p| p.id), Some(8));
}

#[test]
fn test_pageable_overrides_limit() {
    let name = "findTop2ByActiveFalseOrderByAgeAscFirstnameAsc";
    let found = list(
        vec![QueryMethod::new(name).pageable_param()],
        band_members(),
        name,
        vec![Argument::Pageable(PageRequest::of(1, 3))],
    );
    assert_eq!(ordered_ids(&found), vec![7, 9]);
}

fn page_request(page: usize) -> PageRequest {
    PageRequest::of(page, 5).with_sort(Sort::by(vec![Order::asc("age")]))
}

#[test]
fn test_paging_through_23_entries() {
    let repository = repository_with(
        vec![QueryMethod::new("findByLastname")
            .param("lastname")
            .pageable_param()
            .returns(ReturnType::Page)],
        numbered(23),
    );

    let mut sizes = Vec::new();
    let mut has_next = Vec::new();
    for page in 0..5 {
        let result = repository
            .execute(
                "findByLastname",
                vec![Argument::value("Numbered"), Argument::Pageable(page_request(page))],
            )
            .unwrap()
            .into_page()
            .unwrap();
        assert_eq!(result.total_elements, 23);
        assert_eq!(result.total_pages(), 5);
        assert_eq!(result.content[0].age as usize, page * 5 + 1);
        sizes.push(result.len());
        has_next.push(result.has_next());
    }
    assert_eq!(sizes, vec![5, 5, 5, 5, 3]);
    assert_eq!(has_next, vec![true, true, true, true, false]);
}

#[test]
fn test_slices_match_pages() {
    let methods = vec![
        QueryMethod::new("findByLastname")
            .param("lastname")
            .pageable_param()
            .returns(ReturnType::Page),
        QueryMethod::new("findByLastnameOrderByAgeAsc")
            .param("lastname")
            .pageable_param()
            .returns(ReturnType::Slice),
    ];
    let repository = repository_with(methods, numbered(23));

    for page in 0..5 {
        let paged = repository
            .execute(
                "findByLastname",
                vec![Argument::value("Numbered"), Argument::Pageable(page_request(page))],
            )
            .unwrap()
            .into_page()
            .unwrap();
        let slice = repository
            .execute(
                "findByLastnameOrderByAgeAsc",
                vec![Argument::value("Numbered"), Argument::Pageable(PageRequest::of(page, 5))],
            )
            .unwrap()
            .into_slice()
            .unwrap();
        assert_eq!(slice.content, paged.content);
        assert_eq!(slice.has_next, paged.has_next());
        assert_eq!(slice.number, page);
    }
}

#[test]
fn test_page_without_pageable_is_unpaged() {
    let name = "findByActiveTrue";
    let page = repository_with(vec![QueryMethod::new(name).returns(ReturnType::Page)], band_members())
        .execute(name, vec![])
        .unwrap()
        .into_page()
        .unwrap();
    assert_eq!(page.total_elements, 4);
    assert_eq!(page.total_pages(), 1);
    assert!(!page.has_next());
}

// ============================================================================
// Parameter binding
// ============================================================================

#[test]
fn test_named_parameters_are_rearranged() {
    let name = "findByFirstnameOrLastname";
    let methods = vec![QueryMethod::new(name).param("lastname").param("firstname")];

    let found = list(
        methods.clone(),
        band_members(),
        name,
        vec![Argument::value("Beauford"), Argument::value("Dave")],
    );
    assert_eq!(ids(&found), vec![1, 2]);

    let reversed = list(
        methods,
        band_members(),
        name,
        vec![Argument::value("Dave"), Argument::value("Beauford")],
    );
    assert!(reversed.is_empty());
}

#[test]
fn test_positional_parameters_keep_order() {
    let name = "findByAgeGreaterThanAndAgeLessThan";
    let found = list(
        vec![QueryMethod::new(name).positional_params(2)],
        band_members(),
        name,
        vec![by_age(46), by_age(50)],
    );
    assert_eq!(ids(&found), vec![1, 3, 7]);
}

// ============================================================================
// Subjects and return shapes
// ============================================================================

#[test]
fn test_count_and_exists() {
    let methods = vec![
        QueryMethod::new("countByActiveTrue").returns(ReturnType::Count),
        QueryMethod::new("existsByLastname").param("lastname").returns(ReturnType::Boolean),
    ];
    let repository = repository_with(methods, band_members());

    assert_eq!(repository.execute("countByActiveTrue", vec![]).unwrap().into_count().unwrap(), 4);
    assert!(repository
        .execute("existsByLastname", vec![Argument::value("Coffin")])
        .unwrap()
        .into_exists()
        .unwrap());
    assert!(!repository
        .execute("existsByLastname", vec![Argument::value("Hendrix")])
        .unwrap()
        .into_exists()
        .unwrap());
}

#[test]
fn test_delete_returns_count_or_entities() {
    let methods = vec![
        QueryMethod::new("deleteByLastname").param("lastname").returns(ReturnType::Count),
        QueryMethod::new("removeByAgeLessThan").param("age"),
    ];
    let repository = repository_with(methods, band_members());

    let deleted = repository
        .execute("deleteByLastname", vec![Argument::value("Matthews")])
        .unwrap()
        .into_count()
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(repository.count().unwrap(), 8);

    let removed = repository
        .execute("removeByAgeLessThan", vec![by_age(46)])
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(ids(&removed), vec![4, 8]);
    assert_eq!(repository.count().unwrap(), 6);
}

#[test]
fn test_stream_results() {
    let name = "streamByActiveFalseOrderByAgeAsc";
    let repository = repository_with(
        vec![QueryMethod::new(name).returns(ReturnType::Stream)],
        band_members(),
    );

    let mut stream = repository.execute(name, vec![]).unwrap().into_stream().unwrap();
    assert!(stream.is_open());
    assert_eq!(stream.next().map(|p| p.id), Some(8));
    stream.close();
    assert!(!stream.is_open());
    assert!(stream.next().is_none());

    let drained: Vec<u64> = repository
        .execute(name, vec![])
        .unwrap()
        .into_stream()
        .unwrap()
        .map(|p| p.id)
        .collect();
    assert_eq!(drained.len(), 5);
}

#[test]
fn test_result_shape_mismatch() {
    let repository = repository_with(vec![QueryMethod::new("findByActiveTrue")], band_members());
    let err = repository
        .execute("findByActiveTrue", vec![])
        .unwrap()
        .into_count()
        .unwrap_err();
    assert_eq!(err.error_code(), "RESULT_SHAPE_MISMATCH");
}

// ============================================================================
// Declared queries
// ============================================================================

#[test]
fn test_declared_query() {
    let methods = vec![
        QueryMethod::new("findSeniorMs")
            .param("age")
            .with_query("age >= %s AND lastname LIKE 'M%%'"),
        QueryMethod::new("countNamed")
            .param("firstname")
            .returns(ReturnType::Count)
            .with_query("firstname IN (%s, 'Tim')"),
    ];
    let repository = repository_with(methods, band_members());

    let found = repository
        .execute("findSeniorMs", vec![by_age(47)])
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(ids(&found), vec![1]);

    let count = repository
        .execute("countNamed", vec![Argument::value("Jeff")])
        .unwrap()
        .into_count()
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn test_declared_query_quotes_arguments() {
    let mut people = band_members();
    people.push(person(10, "Sinéad", "O'Connor", 56));
    let name = "findByQuotedName";
    let found = list(
        vec![QueryMethod::new(name).param("lastname").with_query("lastname = %s")],
        people,
        name,
        vec![Argument::value("O'Connor")],
    );
    assert_eq!(ids(&found), vec![10]);
}

hazel_data::impl_entity!(
    Ticket,
    "ticket",
    id: u64,
    { owner: uuid::Uuid, issued: chrono::DateTime<chrono::Utc>, score: f64 }
);

#[test]
fn test_declared_query_keeps_argument_types() {
    let (alice, bob) = (uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
    let start = chrono::Utc::now();
    let tickets = [
        Ticket { id: 1, owner: alice, issued: start, score: 2.5 },
        Ticket { id: 2, owner: bob, issued: start + chrono::Duration::hours(1), score: 3e20 },
        Ticket { id: 3, owner: alice, issued: start + chrono::Duration::hours(2), score: 0.5 },
    ];
    let store: Arc<dyn KeyValueStore<Ticket>> = Arc::new(InMemoryMap::<Ticket>::new("ticket"));
    for ticket in tickets {
        store.put(ticket.id, ticket).unwrap();
    }
    let definition = RepositoryDefinition::new("ticket")
        .method(QueryMethod::new("findByOwner").param("owner").with_query("owner = %s"))
        .method(QueryMethod::new("findIssuedAfter").param("issued").with_query("issued > %s"))
        .method(QueryMethod::new("findHighScores").param("score").with_query("score >= %s"));
    let repository = RepositoryFactory::create_from_definition(&definition, store).unwrap();

    let ticket_ids = |name: &str, argument: Argument| -> Vec<u64> {
        let mut found: Vec<u64> = repository
            .execute(name, vec![argument])
            .unwrap()
            .into_list()
            .unwrap()
            .iter()
            .map(|t: &Ticket| t.id)
            .collect();
        found.sort();
        found
    };

    assert_eq!(ticket_ids("findByOwner", Argument::value(alice)), vec![1, 3]);
    assert_eq!(ticket_ids("findIssuedAfter", Argument::value(start)), vec![2, 3]);
    assert_eq!(ticket_ids("findHighScores", Argument::value(1e20)), vec![2]);
    assert!(ticket_ids("findHighScores", Argument::value(f64::INFINITY)).is_empty());
}

// ============================================================================
// Unsupported shapes fail before touching the store
// ============================================================================

/// Store wrapper counting every data access
struct CountingStore {
    inner: InMemoryMap<Person>,
    calls: AtomicUsize,
}

impl CountingStore {
    fn touch(&self) {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

impl KeyValueStore<Person> for CountingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn get(&self, key: &u64) -> Result<Option<Person>> {
        self.touch();
        self.inner.get(key)
    }

    fn put(&self, key: u64, value: Person) -> Result<Option<Person>> {
        self.touch();
        self.inner.put(key, value)
    }

    fn remove(&self, key: &u64) -> Result<Option<Person>> {
        self.touch();
        self.inner.remove(key)
    }

    fn contains_key(&self, key: &u64) -> Result<bool> {
        self.touch();
        self.inner.contains_key(key)
    }

    fn size(&self) -> Result<usize> {
        self.touch();
        self.inner.size()
    }

    fn clear(&self) -> Result<()> {
        self.touch();
        self.inner.clear()
    }

    fn values(&self) -> Result<Vec<Person>> {
        self.touch();
        self.inner.values()
    }

    fn values_matching(&self, predicate: &Predicate) -> Result<Vec<Person>> {
        self.touch();
        self.inner.values_matching(predicate)
    }

    fn keys_matching(&self, predicate: &Predicate) -> Result<Vec<u64>> {
        self.touch();
        self.inner.keys_matching(predicate)
    }

    fn count_matching(&self, predicate: &Predicate) -> Result<usize> {
        self.touch();
        self.inner.count_matching(predicate)
    }

    fn values_page(&self, paging: &PagingPredicate) -> Result<PagingResult<Person>> {
        self.touch();
        self.inner.values_page(paging)
    }
}

#[test]
fn test_distinct_fails_before_store_access() {
    let store = Arc::new(CountingStore {
        inner: InMemoryMap::new("people"),
        calls: AtomicUsize::new(0),
    });
    let definition = RepositoryDefinition::new("person")
        .method(
            QueryMethod::new("countDistinctLastnameByFirstname")
                .param("firstname")
                .returns(ReturnType::Count),
        )
        .method(QueryMethod::new("deleteByFirstname").param("firstname").returns(ReturnType::Boolean));
    let repository = RepositoryFactory::create_from_definition::<Person>(&definition, store.clone()).unwrap();

    let err = repository
        .execute("countDistinctLastnameByFirstname", vec![Argument::value("Daniel")])
        .unwrap_err();
    assert!(err.is_unsupported_return_type());

    let err = repository
        .execute("deleteByFirstname", vec![Argument::value("Daniel")])
        .unwrap_err();
    assert!(err.is_unsupported_return_type());

    assert_eq!(store.calls.load(AtomicOrdering::SeqCst), 0);
}
