//! Tests for member count aggregation through the store

mod common;

use std::sync::Arc;

use common::{acme, node, seeded_backend, FailingBackend, KIND};
use taxonomy::application::services::TaxonomyStore;
use taxonomy::application::ApplicationError;
use taxonomy::domain::{DomainError, LeafMember, ListKind, NewNode, TaxonomyKind, TaxonomyTree};
use taxonomy::infrastructure::MemoryBackend;

#[test]
fn given_example_tree_when_counting_then_totals_follow_the_hierarchy() {
    // Arrange
    let store = TaxonomyStore::new(seeded_backend(), KIND);

    // Act
    let counts = store.counts(&acme()).unwrap();

    // Assert
    assert_eq!(counts.total("c"), 3);
    assert_eq!(counts.total("d"), 2);
    assert_eq!(counts.total("b"), 3);
    assert_eq!(counts.total("a"), 5);
    assert_eq!(counts.total("e"), 0);
}

#[test]
fn given_example_tree_when_counting_then_every_group_obeys_the_sum_law() {
    let backend = seeded_backend();
    let store = TaxonomyStore::new(backend, KIND);
    let scope = acme();

    let counts = store.counts(&scope).unwrap();
    let tree = store.tree(&scope).unwrap();

    for group in tree.groups() {
        let below: usize = tree.children(&group.id).iter().map(|c| counts.total(&c.id)).sum();
        assert_eq!(counts.total(&group.id), counts.direct(&group.id) + below);
    }
}

#[test]
fn given_parents_only_listing_when_counting_then_full_tree_is_fetched() {
    // Arrange
    let backend = Arc::new(FailingBackend::new(seeded_backend(), &[]));
    let store = TaxonomyStore::new(backend.clone(), KIND);
    let scope = acme();
    let parents = store.list(&scope, ListKind::ParentsOnly).unwrap();
    let before = backend.list_calls();

    // Act
    let counts = store.counts_for(&scope, &parents).unwrap();

    // Assert
    assert_eq!(backend.list_calls(), before + 1);
    assert_eq!(counts.total("a"), 5);
    assert_eq!(counts.total("b"), 3);
}

#[test]
fn given_full_listing_when_counting_then_no_refetch() {
    let backend = Arc::new(FailingBackend::new(seeded_backend(), &[]));
    let store = TaxonomyStore::new(backend.clone(), KIND);
    let scope = acme();
    let nodes = store.list(&scope, ListKind::All).unwrap();
    let before = backend.list_calls();

    let counts = store.counts_for(&scope, &nodes).unwrap();

    assert_eq!(backend.list_calls(), before);
    assert_eq!(counts.total("a"), 5);
}

#[test]
fn given_cached_counts_when_node_is_created_then_next_counts_are_recomputed() {
    // Arrange
    let backend = seeded_backend();
    let store = TaxonomyStore::new(backend.clone(), KIND);
    let scope = acme();
    let first = store.counts(&scope).unwrap();
    assert_eq!(first.total("e"), 0);

    // Act
    let cleaning = store
        .create(&scope, &taxonomy::domain::NewNode::new("Cleaning").under("e"))
        .unwrap();
    backend.add_member(KIND, LeafMember::new("Cleaning - AC", "Acme"));
    let second = store.counts(&scope).unwrap();

    // Assert
    assert_eq!(second.total(&cleaning.id), 1);
    assert_eq!(second.total("e"), 1);
}

#[test]
fn given_members_of_other_scope_when_counting_then_they_are_ignored() {
    let backend = seeded_backend();
    backend.add_member(KIND, LeafMember::new("Screws - AC", "Globex"));
    let store = TaxonomyStore::new(backend, KIND);

    let counts = store.counts(&acme()).unwrap();

    assert_eq!(counts.total("c"), 3);
}

#[test]
fn given_cyclic_store_data_when_counting_then_cycle_detected() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(KIND, node("x", "X", Some("y"), true));
    backend.seed(KIND, node("y", "Y", Some("x"), true));
    let store = TaxonomyStore::new(backend, KIND);

    let result = store.counts(&acme());

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::CycleDetected(_)))
    ));
}

#[test]
fn given_kind_without_members_when_counting_then_all_zero() {
    let backend = Arc::new(MemoryBackend::new());
    let store = TaxonomyStore::new(backend, TaxonomyKind::CostCenter);
    let scope = acme();
    let root = store.create(&scope, &NewNode::new("Main")).unwrap();

    let counts = store.counts(&scope).unwrap();
    let tree: TaxonomyTree = store.tree(&scope).unwrap();

    assert_eq!(tree.len(), 1);
    assert_eq!(counts.total(&root.id), 0);
}
