//! Transform registries.
//!
//! One table per family maps a key to a constructor. The tables are filled
//! with the built-ins on first use and stay open for runtime registration:
//! a key registered before a schema is built resolves exactly like a
//! built-in one. Registering an existing key replaces it.

use once_cell::sync::Lazy;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{ConfigError, ConfigResult};

use super::type_converters::Nullable;
use super::{
    builders, post_processors, pre_processors, type_converters, validators, Buildable, Builder,
    Family, Parameters, Transform, BUILDER,
};

/// Builds one instance from its parameters.
pub type Constructor<T> = Arc<dyn Fn(&Parameters) -> ConfigResult<Box<T>> + Send + Sync>;

// =============================================================================
// Registry
// =============================================================================

/// Key to constructor table of one family.
pub struct Registry<T: ?Sized> {
    family: &'static str,
    constructors: HashMap<String, Constructor<T>>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            constructors: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, constructor: Constructor<T>) {
        self.constructors.insert(key.into(), constructor);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.constructors.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.constructors.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lookup(&self, key: &str) -> Option<Constructor<T>> {
        self.constructors.get(key).cloned()
    }

    fn resolve<'n>(&self, name: Option<&'n str>) -> ConfigResult<(&'n str, Constructor<T>)> {
        let name = name.ok_or(ConfigError::MissingName { family: self.family })?;
        let constructor = self.lookup(name).ok_or_else(|| ConfigError::UnknownTransform {
            family: self.family,
            name: name.to_string(),
        })?;
        Ok((name, constructor))
    }

    /// Resolve `name` and build it with `parameters`.
    pub fn build(&self, name: Option<&str>, parameters: Option<&Map<String, JsonValue>>) -> ConfigResult<Box<T>> {
        let (name, constructor) = self.resolve(name)?;
        constructor(&Parameters::new(self.family, name, parameters.cloned().unwrap_or_default()))
    }
}

impl Registry<dyn Transform> {
    pub fn register<B: Transform + Buildable + 'static>(&mut self) {
        self.insert(
            B::KEY,
            Arc::new(|parameters: &Parameters| -> ConfigResult<Box<dyn Transform>> {
                Ok(Box::new(B::build(parameters)?))
            }),
        );
    }
}

impl Registry<dyn Builder> {
    pub fn register<B: Builder + Buildable + 'static>(&mut self) {
        self.insert(
            B::KEY,
            Arc::new(|parameters: &Parameters| -> ConfigResult<Box<dyn Builder>> {
                Ok(Box::new(B::build(parameters)?))
            }),
        );
    }
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("family", &self.family)
            .field("keys", &self.keys())
            .finish()
    }
}

// =============================================================================
// Global registries
// =============================================================================

fn builtin_transforms(family: Family, register: fn(&mut Registry<dyn Transform>)) -> RwLock<Registry<dyn Transform>> {
    let mut registry = Registry::new(family.label());
    register(&mut registry);
    RwLock::new(registry)
}

static PRE_PROCESSORS: Lazy<RwLock<Registry<dyn Transform>>> =
    Lazy::new(|| builtin_transforms(Family::PreProcessor, pre_processors::register_builtins));

static TYPE_CONVERTERS: Lazy<RwLock<Registry<dyn Transform>>> =
    Lazy::new(|| builtin_transforms(Family::TypeConverter, type_converters::register_builtins));

static VALIDATORS: Lazy<RwLock<Registry<dyn Transform>>> =
    Lazy::new(|| builtin_transforms(Family::Validator, validators::register_builtins));

static POST_PROCESSORS: Lazy<RwLock<Registry<dyn Transform>>> =
    Lazy::new(|| builtin_transforms(Family::PostProcessor, post_processors::register_builtins));

static BUILDERS: Lazy<RwLock<Registry<dyn Builder>>> = Lazy::new(|| {
    let mut registry = Registry::new(BUILDER);
    builders::register_builtins(&mut registry);
    RwLock::new(registry)
});

fn transforms(family: Family) -> &'static RwLock<Registry<dyn Transform>> {
    match family {
        Family::PreProcessor => &PRE_PROCESSORS,
        Family::TypeConverter => &TYPE_CONVERTERS,
        Family::Validator => &VALIDATORS,
        Family::PostProcessor => &POST_PROCESSORS,
    }
}

// Registries hold no invariants a panicking writer could break.
fn read<T: ?Sized>(lock: &RwLock<Registry<T>>) -> RwLockReadGuard<'_, Registry<T>> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T: ?Sized>(lock: &RwLock<Registry<T>>) -> RwLockWriteGuard<'_, Registry<T>> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Register a transform type in `family` under [`Buildable::KEY`].
pub fn register_transform<B: Transform + Buildable + 'static>(family: Family) {
    write(transforms(family)).register::<B>();
}

/// Register a transform constructor in `family` under `key`.
pub fn register_transform_fn<F>(family: Family, key: impl Into<String>, constructor: F)
where
    F: Fn(&Parameters) -> ConfigResult<Box<dyn Transform>> + Send + Sync + 'static,
{
    write(transforms(family)).insert(key, Arc::new(constructor));
}

/// Register a builder type under [`Buildable::KEY`].
pub fn register_builder<B: Builder + Buildable + 'static>() {
    write(&BUILDERS).register::<B>();
}

/// Register a builder constructor under `key`.
pub fn register_builder_fn<F>(key: impl Into<String>, constructor: F)
where
    F: Fn(&Parameters) -> ConfigResult<Box<dyn Builder>> + Send + Sync + 'static,
{
    write(&BUILDERS).insert(key, Arc::new(constructor));
}

/// Every registered key, grouped by family label.
pub fn registered_keys() -> Vec<(&'static str, Vec<String>)> {
    let mut keys: Vec<(&'static str, Vec<String>)> = Family::ALL
        .iter()
        .map(|family| (family.label(), read(transforms(*family)).keys()))
        .collect();
    keys.push((BUILDER, read(&BUILDERS).keys()));
    keys
}

// =============================================================================
// Building
// =============================================================================

/// Build a pre-processor, validator or post-processor.
pub(crate) fn build_transform(
    family: Family,
    name: Option<&str>,
    parameters: Option<&Map<String, JsonValue>>,
) -> ConfigResult<Box<dyn Transform>> {
    // The constructor runs after the read lock is released.
    let (name, constructor) = read(transforms(family)).resolve(name)?;
    constructor(&Parameters::new(family.label(), name, parameters.cloned().unwrap_or_default()))
}

/// Build a type converter, wrapped so nullable fields turn empty input
/// into null.
pub(crate) fn build_type_converter(
    key: &str,
    nullable: bool,
    parameters: Map<String, JsonValue>,
) -> ConfigResult<Box<dyn Transform>> {
    let constructor = read(&TYPE_CONVERTERS)
        .lookup(key)
        .ok_or_else(|| ConfigError::UnknownType(key.to_string()))?;
    let converter = constructor(&Parameters::new(Family::TypeConverter.label(), key, parameters))?;
    Ok(Box::new(Nullable::new(converter, nullable)))
}

/// Build the builder of a computed field.
pub(crate) fn build_builder(
    name: Option<&str>,
    parameters: Option<&Map<String, JsonValue>>,
) -> ConfigResult<Box<dyn Builder>> {
    let (name, constructor) = read(&BUILDERS).resolve(name)?;
    constructor(&Parameters::new(BUILDER, name, parameters.cloned().unwrap_or_default()))
}
