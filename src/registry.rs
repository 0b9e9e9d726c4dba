//! Plugin registry.
//!
//! Plugins are looked up by the name they were registered under, never by
//! reflecting over types. Each family (deployment engines, server providers)
//! has its own table; registration order is preserved so listings are stable.
//!
//! A process-wide registry is available through [`global`]. It is populated
//! with the built-in plugins on first access, and plugin crates add their own
//! entries at startup via [`register_engine`] / [`register_provider`].

use crate::engine::{DummyEngine, Engine};
use crate::error::{DeployError, Result};
use crate::provider::{DummyProvider, Provider};
use crate::store::DeploymentRecord;
use crate::types::ProviderContext;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

/// Builds an engine bound to one deployment record.
pub type EngineConstructor =
    Arc<dyn Fn(&DeploymentRecord) -> Result<Box<dyn Engine>> + Send + Sync>;

/// Builds a provider from its config and task context.
pub type ProviderConstructor =
    Arc<dyn Fn(&ProviderContext) -> Result<Box<dyn Provider>> + Send + Sync>;

/// Which capability interface a plugin implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginFamily {
    Engine,
    Provider,
}

impl fmt::Display for PluginFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginFamily::Engine => f.write_str("deployment engine"),
            PluginFamily::Provider => f.write_str("server provider"),
        }
    }
}

/// Ordered name → constructor table for one family.
pub struct PluginRegistry<C> {
    family: PluginFamily,
    entries: Vec<(String, C)>,
}

impl<C: Clone> PluginRegistry<C> {
    pub fn new(family: PluginFamily) -> Self {
        Self {
            family,
            entries: Vec::new(),
        }
    }

    pub fn family(&self) -> PluginFamily {
        self.family
    }

    /// Add a constructor under `name`. Names are unique within a family.
    pub fn register(&mut self, name: impl Into<String>, constructor: C) -> Result<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(DeployError::DuplicatePlugin {
                family: self.family,
                name,
            });
        }
        self.entries.push((name, constructor));
        Ok(())
    }

    /// Look up the constructor registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<C> {
        self.entries
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, constructor)| constructor.clone())
            .ok_or_else(|| DeployError::UnknownPlugin {
                family: self.family,
                name: name.to_string(),
            })
    }

    /// All registered names, in registration order.
    pub fn list(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(registered, _)| registered == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C: Clone> Clone for PluginRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            family: self.family,
            entries: self.entries.clone(),
        }
    }
}

/// Both plugin families.
#[derive(Clone)]
pub struct Registry {
    engines: PluginRegistry<EngineConstructor>,
    providers: PluginRegistry<ProviderConstructor>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            engines: PluginRegistry::new(PluginFamily::Engine),
            providers: PluginRegistry::new(PluginFamily::Provider),
        }
    }

    /// A registry holding the built-in dummy engine and provider.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .engines
            .entries
            .push((DummyEngine::NAME.to_string(), DummyEngine::constructor()));
        registry
            .providers
            .entries
            .push((DummyProvider::NAME.to_string(), DummyProvider::constructor()));
        registry
    }

    pub fn register_engine<F>(&mut self, name: impl Into<String>, constructor: F) -> Result<()>
    where
        F: Fn(&DeploymentRecord) -> Result<Box<dyn Engine>> + Send + Sync + 'static,
    {
        self.engines.register(name, Arc::new(constructor))
    }

    pub fn register_provider<F>(&mut self, name: impl Into<String>, constructor: F) -> Result<()>
    where
        F: Fn(&ProviderContext) -> Result<Box<dyn Provider>> + Send + Sync + 'static,
    {
        self.providers.register(name, Arc::new(constructor))
    }

    pub fn engine(&self, name: &str) -> Result<EngineConstructor> {
        self.engines.resolve(name)
    }

    pub fn provider(&self, name: &str) -> Result<ProviderConstructor> {
        self.providers.resolve(name)
    }

    /// Registered names for `family`, in registration order.
    pub fn list(&self, family: PluginFamily) -> Vec<String> {
        match family {
            PluginFamily::Engine => self.engines.list(),
            PluginFamily::Provider => self.providers.list(),
        }
    }

    pub fn engines(&self) -> &PluginRegistry<EngineConstructor> {
        &self.engines
    }

    pub fn providers(&self) -> &PluginRegistry<ProviderConstructor> {
        &self.providers
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: LazyLock<RwLock<Registry>> =
    LazyLock::new(|| RwLock::new(Registry::with_builtins()));

/// The process-wide registry.
pub fn global() -> &'static RwLock<Registry> {
    &GLOBAL
}

/// A point-in-time copy of the process-wide registry.
pub fn snapshot() -> Registry {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Register an engine in the process-wide registry.
pub fn register_engine<F>(name: impl Into<String>, constructor: F) -> Result<()>
where
    F: Fn(&DeploymentRecord) -> Result<Box<dyn Engine>> + Send + Sync + 'static,
{
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register_engine(name, constructor)
}

/// Register a provider in the process-wide registry.
pub fn register_provider<F>(name: impl Into<String>, constructor: F) -> Result<()>
where
    F: Fn(&ProviderContext) -> Result<Box<dyn Provider>> + Send + Sync + 'static,
{
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register_provider(name, constructor)
}
