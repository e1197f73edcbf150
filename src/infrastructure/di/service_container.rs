//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::application::services::{
    DefaultService, DeletionService, RegroupService, TaxonomySession, TaxonomyStore,
};
use crate::config::Settings;
use crate::domain::{Scope, TaxonomyKind};
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::http::HttpBackend;
use crate::infrastructure::traits::{Selector, SkimSelector, TaxonomyBackend};

/// Container holding all application services.
///
/// Stores and default services are created lazily and cached per kind, so
/// count caches and default toggle memory are shared by every caller of this
/// container. Both live only as long as the process.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Remote store
    pub backend: Arc<dyn TaxonomyBackend>,

    /// Interactive selector
    pub selector: Arc<dyn Selector>,

    stores: Mutex<HashMap<TaxonomyKind, Arc<TaxonomyStore>>>,

    defaults: Mutex<HashMap<TaxonomyKind, Arc<DefaultService>>>,
}

impl ServiceContainer {
    /// Create a new service container talking to the configured remote store.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let backend = HttpBackend::new(&settings.remote)?;
        Ok(Self::with_deps(
            settings,
            Arc::new(backend),
            Arc::new(SkimSelector),
        ))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        backend: Arc<dyn TaxonomyBackend>,
        selector: Arc<dyn Selector>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            backend,
            selector,
            stores: Mutex::new(HashMap::new()),
            defaults: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self, kind: TaxonomyKind) -> Arc<TaxonomyStore> {
        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            stores
                .entry(kind)
                .or_insert_with(|| Arc::new(TaxonomyStore::new(Arc::clone(&self.backend), kind))),
        )
    }

    /// Deletion service using the configured cascade and bulk-endpoint policy.
    pub fn deletion(&self, kind: TaxonomyKind) -> DeletionService {
        DeletionService::new(self.store(kind))
            .with_cascade(self.settings.delete.cascade)
            .with_bulk_endpoint(self.settings.delete.bulk_endpoint)
    }

    pub fn regroup(&self, kind: TaxonomyKind) -> RegroupService {
        RegroupService::new(self.store(kind))
    }

    /// Default service of `kind`. The same instance is returned on every
    /// call, so toggling a node twice restores the default it replaced.
    pub fn defaults(&self, kind: TaxonomyKind) -> Arc<DefaultService> {
        let store = self.store(kind);
        let mut defaults = self.defaults.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            defaults
                .entry(kind)
                .or_insert_with(|| Arc::new(DefaultService::new(store))),
        )
    }

    pub fn session(&self, kind: TaxonomyKind, scope: Scope) -> TaxonomySession {
        TaxonomySession::new(
            self.store(kind),
            self.regroup(kind),
            self.deletion(kind),
            scope,
        )
    }
}
