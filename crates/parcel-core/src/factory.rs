//! Metadata cache and instance construction
//!
//! A [`Factory`] pairs a declaration source with an ordered cast list and
//! caches one [`ClassMetadata`] per class. Construction runs in two
//! collect-then-raise phases: every input key is cast and validated before
//! the first failure is reported, then every undefined required property
//! is reported at once.

use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::cast::{builtin_casts, PropertyCast};
use crate::config::FactoryConfig;
use crate::declaration::{
    normalize_class_name, CollectionDeclaration, DeclarationRegistry, DeclarationSource,
};
use crate::dto::Dto;
use crate::error::{DtoError, DtoResult, InvalidTypeFailure, TypeErrorData};
use crate::flags::DtoFlags;
use crate::metadata::ClassMetadata;
use crate::value::{Map, Value};

/// Default factory over the shared registry, created on first use
static SHARED_FACTORY: LazyLock<Factory> =
    LazyLock::new(|| Factory::new(DeclarationRegistry::shared()));

struct FactoryInner {
    source: Arc<dyn DeclarationSource>,
    casts: Vec<Arc<dyn PropertyCast>>,
    config: FactoryConfig,
    cache: RwLock<FxHashMap<String, Arc<ClassMetadata>>>,
}

/// Builds DTO instances and caches per-class metadata
///
/// Cloning is cheap; clones share the cache.
#[derive(Clone)]
pub struct Factory {
    inner: Arc<FactoryInner>,
}

/// Builder for [`Factory`]
pub struct FactoryBuilder {
    source: Arc<dyn DeclarationSource>,
    casts: Vec<Arc<dyn PropertyCast>>,
    config: FactoryConfig,
}

impl FactoryBuilder {
    /// Register a user cast
    ///
    /// User casts are consulted in registration order, after class casts
    /// and before the built-in casts.
    pub fn cast(mut self, cast: Arc<dyn PropertyCast>) -> Self {
        self.casts.push(cast);
        self
    }

    /// Use `config` instead of the default configuration
    pub fn config(mut self, config: FactoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the factory
    pub fn build(self) -> Factory {
        let mut casts = self.casts;
        casts.extend(builtin_casts());

        Factory {
            inner: Arc::new(FactoryInner {
                source: self.source,
                casts,
                config: self.config,
                cache: RwLock::new(FxHashMap::default()),
            }),
        }
    }
}

impl Factory {
    /// Create a factory with the built-in casts and default configuration
    pub fn new(source: impl DeclarationSource + 'static) -> Self {
        Self::builder(source).build()
    }

    /// Start building a factory over `source`
    pub fn builder(source: impl DeclarationSource + 'static) -> FactoryBuilder {
        FactoryBuilder {
            source: Arc::new(source),
            casts: Vec::new(),
            config: FactoryConfig::default(),
        }
    }

    /// Process-wide factory over [`DeclarationRegistry::shared`]
    pub fn shared() -> Factory {
        SHARED_FACTORY.clone()
    }

    /// Configuration
    pub fn config(&self) -> &FactoryConfig {
        &self.inner.config
    }

    /// Factory-level casts: user casts followed by the built-ins
    pub fn casts(&self) -> &[Arc<dyn PropertyCast>] {
        &self.inner.casts
    }

    /// Declaration source
    pub fn source(&self) -> &dyn DeclarationSource {
        self.inner.source.as_ref()
    }

    /// Check if `class` is declared
    pub fn has_class(&self, class: &str) -> bool {
        self.inner.source.class(class).is_some()
    }

    /// Look up a typed collection declaration
    pub fn collection(&self, name: &str) -> Option<Arc<CollectionDeclaration>> {
        self.inner.source.collection(name)
    }

    // ========================================================================
    // Metadata cache
    // ========================================================================

    /// Get the metadata of `class`, resolving it on first use
    ///
    /// Every call for the same class returns the same `Arc` until
    /// [`Factory::clear_cache`] is called. A class is resolved at most once
    /// per cache generation; concurrent misses wait for the first resolver.
    ///
    /// Casts must not call back into `class_metadata` from
    /// [`PropertyCast::can_handle`], which runs during resolution.
    pub fn class_metadata(&self, class: &str) -> DtoResult<Arc<ClassMetadata>> {
        let class = normalize_class_name(class);

        let cached = self.inner.cache.read().get(class).cloned();
        if let Some(metadata) = cached {
            return Ok(metadata);
        }

        // Only one upgradable guard exists at a time; plain readers still proceed
        let cache = self.inner.cache.upgradable_read();
        if let Some(metadata) = cache.get(class) {
            return Ok(Arc::clone(metadata));
        }

        debug!(class, "class metadata cache miss");
        let metadata = Arc::new(ClassMetadata::resolve(class, self)?);

        let mut cache = RwLockUpgradableReadGuard::upgrade(cache);
        cache.insert(class.to_string(), Arc::clone(&metadata));
        Ok(metadata)
    }

    /// Check if metadata for `class` is cached
    pub fn is_cached(&self, class: &str) -> bool {
        self.inner
            .cache
            .read()
            .contains_key(normalize_class_name(class))
    }

    /// Drop all cached metadata
    pub fn clear_cache(&self) {
        let mut cache = self.inner.cache.write();
        debug!(classes = cache.len(), "clearing class metadata cache");
        cache.clear();
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Build an instance of `class` from `input`
    pub fn make(&self, class: &str, input: Map, flags: DtoFlags) -> DtoResult<Dto> {
        self.make_at(class, input, flags, 0)
    }

    /// Build an instance from any value; non-map input is an invalid type
    pub fn make_value(&self, class: &str, input: Value, flags: DtoFlags) -> DtoResult<Dto> {
        match input {
            Value::Map(map) => self.make(class, map, flags),
            other => {
                let class = normalize_class_name(class);
                Err(DtoError::InvalidType {
                    failures: vec![InvalidTypeFailure::new(class, "", class, &other)],
                })
            }
        }
    }

    /// Build an instance with the configured default flags
    pub fn build(&self, class: &str, input: Map) -> DtoResult<Dto> {
        self.make(class, input, self.inner.config.default_flags)
    }

    pub(crate) fn make_at(
        &self,
        class: &str,
        input: Map,
        flags: DtoFlags,
        depth: usize,
    ) -> DtoResult<Dto> {
        let max_depth = self.inner.config.max_depth;
        if depth > max_depth {
            return Err(DtoError::MaxDepthExceeded { max_depth });
        }

        let metadata = self.class_metadata(class)?;
        self.construct(metadata, input, flags.without_transient(), depth)
            .inspect_err(|e| debug!(class, depth, error = %e, "construction failed"))
    }

    fn construct(
        &self,
        metadata: Arc<ClassMetadata>,
        input: Map,
        flags: DtoFlags,
        depth: usize,
    ) -> DtoResult<Dto> {
        let class = metadata.name();

        let unknown: Vec<String> = input
            .keys()
            .filter(|key| !metadata.has_property(key))
            .cloned()
            .collect();
        if !unknown.is_empty() && !flags.intersects(DtoFlags::LENIENT_UNKNOWN) {
            return Err(DtoError::UnknownProperties {
                class: class.to_string(),
                properties: unknown,
            });
        }

        let mut errors = TypeErrorData::new(class);
        let mut values = Map::with_capacity(input.len());
        let mut tracked = Map::new();

        for (key, value) in input {
            let Some(property) = metadata.property(&key) else {
                if flags.contains(DtoFlags::TRACK_UNKNOWN_PROPERTIES) {
                    tracked.insert(key, value);
                }
                continue;
            };

            match property.cast_value_at(self, value, flags, depth) {
                Ok(value) => {
                    values.insert(key, value);
                }
                Err(e) => errors.absorb(e)?,
            }
        }

        errors.into_result()?;

        if !flags.contains(DtoFlags::PARTIAL) || flags.contains(DtoFlags::WITH_DEFAULTS) {
            let mut undefined = Vec::new();
            for (name, property) in metadata.properties() {
                if values.contains_key(name) {
                    continue;
                }
                match property.map_processed_default(flags) {
                    Some(default) => {
                        values.insert(name.clone(), default);
                    }
                    None => undefined.push(name.clone()),
                }
            }

            if !undefined.is_empty() && !flags.contains(DtoFlags::PARTIAL) {
                return Err(DtoError::UndefinedProperties {
                    class: class.to_string(),
                    properties: undefined,
                });
            }
        }

        values.sort_by(|a, _, b, _| metadata.position(a).cmp(&metadata.position(b)));

        Ok(Dto::new(self.clone(), metadata, values, tracked, flags))
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("casts", &self.inner.casts)
            .field("config", &self.inner.config)
            .field("cached", &self.inner.cache.read().len())
            .finish()
    }
}
