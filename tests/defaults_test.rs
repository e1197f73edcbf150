//! Tests for DefaultService

mod common;

use std::sync::Arc;

use common::{acme, node, seeded_backend, MockSelector, KIND};
use taxonomy::application::services::{DefaultService, TaxonomyStore};
use taxonomy::application::ApplicationError;
use taxonomy::config::Settings;
use taxonomy::domain::DomainError;
use taxonomy::infrastructure::di::ServiceContainer;
use taxonomy::infrastructure::MemoryBackend;

fn defaults(backend: Arc<MemoryBackend>) -> DefaultService {
    DefaultService::new(Arc::new(TaxonomyStore::new(backend, KIND)))
}

fn default_ids(backend: &MemoryBackend) -> Vec<String> {
    backend
        .snapshot(KIND)
        .into_iter()
        .filter(|n| n.is_default)
        .map(|n| n.id)
        .collect()
}

#[test]
fn given_no_default_when_toggling_leaf_then_it_becomes_default() {
    let backend = seeded_backend();
    let service = defaults(backend.clone());

    let next = service.toggle_default(&acme(), "c").unwrap();

    assert_eq!(next.as_deref(), Some("c"));
    assert_eq!(default_ids(&backend), vec!["c"]);
    assert_eq!(service.current(&acme()).unwrap().map(|n| n.id).as_deref(), Some("c"));
}

#[test]
fn given_existing_default_when_toggling_other_leaf_then_only_the_new_one_is_default() {
    let backend = seeded_backend();
    let service = defaults(backend.clone());
    service.toggle_default(&acme(), "c").unwrap();

    let next = service.toggle_default(&acme(), "d").unwrap();

    assert_eq!(next.as_deref(), Some("d"));
    assert_eq!(default_ids(&backend), vec!["d"]);
}

#[test]
fn given_replaced_default_when_toggling_same_node_twice_then_previous_default_returns() {
    // Arrange
    let backend = seeded_backend();
    let service = defaults(backend.clone());
    service.toggle_default(&acme(), "c").unwrap();

    // Act
    service.toggle_default(&acme(), "d").unwrap();
    let restored = service.toggle_default(&acme(), "d").unwrap();

    // Assert
    assert_eq!(restored.as_deref(), Some("c"));
    assert_eq!(default_ids(&backend), vec!["c"]);
}

#[test]
fn given_no_prior_default_when_toggling_twice_then_scope_has_no_default() {
    let backend = seeded_backend();
    let service = defaults(backend.clone());

    service.toggle_default(&acme(), "c").unwrap();
    let next = service.toggle_default(&acme(), "c").unwrap();

    assert_eq!(next, None);
    assert!(default_ids(&backend).is_empty());
    assert!(service.current(&acme()).unwrap().is_none());
}

#[test]
fn given_two_stale_defaults_when_toggling_then_exactly_one_remains() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(KIND, node("g", "Group - AC", None, true));
    for id in ["x", "y", "z"] {
        let mut leaf = node(id, &format!("{id} - AC"), Some("g"), false);
        leaf.is_default = id != "z";
        backend.seed(KIND, leaf);
    }
    let service = defaults(backend.clone());

    let next = service.toggle_default(&acme(), "z").unwrap();

    assert_eq!(next.as_deref(), Some("z"));
    assert_eq!(default_ids(&backend), vec!["z"]);
}

#[test]
fn given_group_when_toggling_then_validation_error_and_nothing_sent() {
    let backend = seeded_backend();
    let service = defaults(backend.clone());

    let result = service.toggle_default(&acme(), "b");

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::Validation(_)))
    ));
    assert_eq!(backend.mutation_count(), 0);
}

#[test]
fn given_unknown_id_when_toggling_then_not_found() {
    let service = defaults(seeded_backend());

    let result = service.toggle_default(&acme(), "zzz");

    assert!(matches!(result, Err(ref e) if e.is_not_found()));
}

#[test]
fn given_container_when_toggling_twice_through_separate_lookups_then_previous_default_returns() {
    // Arrange
    let backend = seeded_backend();
    let container = ServiceContainer::with_deps(
        Settings::default(),
        backend.clone(),
        Arc::new(MockSelector::new(None)),
    );
    container.defaults(KIND).toggle_default(&acme(), "c").unwrap();
    container.defaults(KIND).toggle_default(&acme(), "d").unwrap();

    // Act
    let restored = container.defaults(KIND).toggle_default(&acme(), "d").unwrap();

    // Assert
    assert_eq!(restored.as_deref(), Some("c"));
    assert_eq!(default_ids(&backend), vec!["c"]);
}
