//! Tests for TaxonomyStore

mod common;

use std::sync::Arc;

use common::{acme, seeded_backend, FailingBackend, KIND};
use taxonomy::application::services::TaxonomyStore;
use taxonomy::application::ApplicationError;
use taxonomy::domain::{DomainError, ListKind, NewNode, NodeUpdate, Scope};
use taxonomy::infrastructure::{MemoryBackend, TaxonomyBackend};
use taxonomy::util::testing::init_test_setup;

fn domain_err<T: std::fmt::Debug>(result: Result<T, ApplicationError>) -> DomainError {
    match result {
        Err(ApplicationError::Domain(e)) => e,
        other => panic!("expected domain error, got {other:?}"),
    }
}

#[test]
fn given_empty_scope_when_creating_without_type_then_first_is_group_and_second_needs_parent() {
    init_test_setup();
    // Arrange
    let backend = Arc::new(MemoryBackend::new());
    let store = TaxonomyStore::new(backend.clone(), KIND);
    let scope = acme();

    // Act
    let first = store.create(&scope, &NewNode::new("All Products")).unwrap();
    let second = store.create(&scope, &NewNode::new("Hardware"));

    // Assert
    assert!(first.is_group);
    assert!(matches!(domain_err(second), DomainError::MissingParent(_)));
    assert_eq!(backend.mutation_count(), 1);
}

#[test]
fn given_existing_group_when_creating_without_type_under_it_then_is_individual() {
    let backend = seeded_backend();
    let store = TaxonomyStore::new(backend, KIND);

    let created = store
        .create(&acme(), &NewNode::new("Nails").under("b"))
        .unwrap();

    assert!(!created.is_group);
    assert_eq!(created.parent_id.as_deref(), Some("b"));
}

#[test]
fn given_empty_scope_when_creating_explicit_individual_without_parent_then_missing_parent() {
    let backend = Arc::new(MemoryBackend::new());
    let store = TaxonomyStore::new(backend.clone(), KIND);

    let result = store.create(&acme(), &NewNode::new("Loose").group(false));

    assert!(matches!(result, Err(ref e) if e.is_validation()));
    assert_eq!(backend.mutation_count(), 0);
}

#[test]
fn given_parent_that_is_not_a_group_when_creating_then_invalid_parent() {
    let backend = seeded_backend();
    let store = TaxonomyStore::new(backend.clone(), KIND);

    let under_leaf = store.create(&acme(), &NewNode::new("Bolts").under("c"));
    let under_missing = store.create(&acme(), &NewNode::new("Bolts").under("zzz"));

    assert!(matches!(domain_err(under_leaf), DomainError::InvalidParent(_)));
    assert!(matches!(domain_err(under_missing), DomainError::InvalidParent(_)));
    assert_eq!(backend.mutation_count(), 0);
}

#[test]
fn given_name_differing_only_by_suffix_when_creating_then_duplicate_name() {
    let backend = seeded_backend();
    let store = TaxonomyStore::new(backend, KIND);

    let result = store.create(&acme(), &NewNode::new("Hardware").under("a"));

    assert!(matches!(domain_err(result), DomainError::DuplicateName(_)));
}

#[test]
fn given_same_name_in_other_scope_when_creating_then_succeeds() {
    let backend = seeded_backend();
    let store = TaxonomyStore::new(backend, KIND);
    let other = Scope::new("Globex", "GX");

    let created = store.create(&other, &NewNode::new("Hardware")).unwrap();

    assert!(created.is_group);
    assert_eq!(created.scope, "Globex");
}

#[test]
fn given_group_when_reparenting_under_own_descendant_then_cycle_detected() {
    let backend = seeded_backend();
    let store = TaxonomyStore::new(backend.clone(), KIND);

    let result = store.update(&acme(), "a", &NodeUpdate::reparent(Some("b".into())));

    assert!(matches!(domain_err(result), DomainError::CycleDetected(_)));
    assert_eq!(backend.mutation_count(), 0);
}

#[test]
fn given_individual_node_when_moving_to_root_then_missing_parent() {
    let backend = seeded_backend();
    let store = TaxonomyStore::new(backend, KIND);

    let leaf = store.update(&acme(), "c", &NodeUpdate::reparent(None));
    let group = store.update(&acme(), "b", &NodeUpdate::reparent(None)).unwrap();

    assert!(matches!(domain_err(leaf), DomainError::MissingParent(_)));
    assert_eq!(group.parent_id, None);
}

#[test]
fn given_rename_to_own_name_when_updating_then_is_not_a_duplicate() {
    let backend = seeded_backend();
    let store = TaxonomyStore::new(backend, KIND);

    let renamed = store
        .update(&acme(), "b", &NodeUpdate::rename("Hardware"))
        .unwrap();
    let clash = store.update(&acme(), "b", &NodeUpdate::rename("Paint"));

    assert_eq!(renamed.display_name, "Hardware");
    assert!(matches!(domain_err(clash), DomainError::DuplicateName(_)));
}

#[test]
fn given_group_with_children_when_removing_without_cascade_then_has_children() {
    let backend = seeded_backend();
    let store = TaxonomyStore::new(backend.clone(), KIND);

    let result = store.remove(&acme(), "a", false);

    assert_eq!(
        domain_err(result),
        DomainError::HasChildren {
            id: "a".into(),
            children: 2
        }
    );
    assert_eq!(backend.snapshot(KIND).len(), 5);
}

#[test]
fn given_group_with_children_when_removing_with_cascade_then_subtree_is_gone() {
    let backend = seeded_backend();
    let store = TaxonomyStore::new(backend.clone(), KIND);

    store.remove(&acme(), "a", true).unwrap();

    let left: Vec<String> = backend.snapshot(KIND).into_iter().map(|n| n.id).collect();
    assert_eq!(left, vec!["e".to_string()]);
}

#[test]
fn given_list_filters_when_listing_then_only_matching_nodes_return() {
    let backend = seeded_backend();
    let store = TaxonomyStore::new(backend, KIND);

    let parents = store.list(&acme(), ListKind::ParentsOnly).unwrap();
    let leafs = store.list(&acme(), ListKind::LeafsOnly).unwrap();

    assert!(parents.iter().all(|n| n.is_group));
    assert_eq!(parents.len(), 3);
    assert_eq!(leafs.len(), 2);
}

#[test]
fn given_cached_counts_when_dispatched_mutation_fails_then_cache_is_invalidated() {
    // Arrange
    let inner = seeded_backend();
    let backend = Arc::new(FailingBackend::new(inner, &["c"]));
    let store = TaxonomyStore::new(backend, KIND);
    let scope = acme();
    store.counts(&scope).unwrap();
    assert!(store.is_cached(&scope));

    // Act
    let result = store.update(&scope, "c", &NodeUpdate::rename("Bolts"));

    // Assert
    assert!(matches!(result, Err(ApplicationError::Transport { ref message }) if message == "server refused c"));
    assert!(!store.is_cached(&scope));
}

#[test]
fn given_offline_store_when_creating_then_transport_error_with_fallback_message() {
    let backend = Arc::new(FailingBackend::offline(Arc::new(MemoryBackend::new())));
    let store = TaxonomyStore::new(backend, KIND);

    let result = store.create(&acme(), &NewNode::new("All"));

    match result {
        Err(e @ ApplicationError::Transport { .. }) => {
            assert_eq!(e.to_string(), taxonomy::application::GENERIC_TRANSPORT_MESSAGE)
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[test]
fn given_any_sequence_of_mutations_then_every_parent_is_a_group() {
    let backend = seeded_backend();
    let store = TaxonomyStore::new(backend.clone(), KIND);
    let scope = acme();

    let _ = store.create(&scope, &NewNode::new("Bolts").under("c"));
    let _ = store.update(&scope, "d", &NodeUpdate::reparent(Some("c".into())));
    let _ = store.update(&scope, "b", &NodeUpdate::reparent(Some("e".into())));
    let _ = store.create(&scope, &NewNode::new("Nails").under("b"));

    let nodes = backend.list_nodes(KIND, &scope, ListKind::All).unwrap();
    for n in &nodes {
        if let Some(parent_id) = &n.parent_id {
            let parent = nodes.iter().find(|p| &p.id == parent_id).unwrap();
            assert!(parent.is_group, "{} sits under individual {}", n.id, parent.id);
        }
    }
    assert_eq!(nodes.len(), 6);
}
