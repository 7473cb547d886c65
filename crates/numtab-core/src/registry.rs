//! Kernel registration tables
//!
//! Each algorithm owns one [`KernelRegistry`], populated once with a
//! constructor per (precision, method, tier) it implements. Resolution starts
//! at the dispatcher's selected tier and walks down until it finds a
//! registered constructor whose tier the host can actually execute.

use crate::dispatch::{CpuTier, Dispatcher};
use crate::error::{Error, ErrorKind, Result};
use crate::numeric::Precision;
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Builds a fresh kernel instance
pub type KernelConstructor<K> = fn() -> Result<Box<K>>;

/// Identifier of a computation method
pub trait KernelMethod: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<M: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static> KernelMethod for M {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelKey<M> {
    pub precision: Precision,
    pub method: M,
    pub tier: CpuTier,
}

/// A constructed kernel and the tier it was selected for
pub struct ResolvedKernel<K: ?Sized> {
    pub kernel: Box<K>,
    /// Tier of the registered entry that was used
    pub tier: CpuTier,
    /// Tier the dispatcher asked for
    pub requested: CpuTier,
}

impl<K: ?Sized> ResolvedKernel<K> {
    pub fn fell_back(&self) -> bool {
        self.tier != self.requested
    }
}

impl<K: ?Sized> fmt::Debug for ResolvedKernel<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedKernel")
            .field("tier", &self.tier)
            .field("requested", &self.requested)
            .finish_non_exhaustive()
    }
}

/// Static mapping from (precision, method, tier) to kernel constructors
pub struct KernelRegistry<M: KernelMethod, K: ?Sized> {
    name: &'static str,
    entries: HashMap<KernelKey<M>, KernelConstructor<K>>,
}

impl<M: KernelMethod, K: ?Sized> KernelRegistry<M, K> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register a constructor, replacing any previous entry for the key
    pub fn register(
        &mut self,
        precision: Precision,
        method: M,
        tier: CpuTier,
        constructor: KernelConstructor<K>,
    ) -> &mut Self {
        let key = KernelKey {
            precision,
            method,
            tier,
        };
        if self.entries.insert(key, constructor).is_some() {
            debug!("{}: replaced kernel for {key:?}", self.name);
        }
        self
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(
        mut self,
        precision: Precision,
        method: M,
        tier: CpuTier,
        constructor: KernelConstructor<K>,
    ) -> Self {
        self.register(precision, method, tier, constructor);
        self
    }

    pub fn contains(&self, precision: Precision, method: M, tier: CpuTier) -> bool {
        self.entries.contains_key(&KernelKey {
            precision,
            method,
            tier,
        })
    }

    /// Registered tiers for a (precision, method), ascending
    pub fn tiers_for(&self, precision: Precision, method: M) -> Vec<CpuTier> {
        CpuTier::ALL
            .into_iter()
            .filter(|&tier| self.contains(precision, method, tier))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Construct the best kernel for the dispatcher's selected tier
    pub fn resolve(
        &self,
        dispatcher: &Dispatcher,
        precision: Precision,
        method: M,
    ) -> Result<ResolvedKernel<K>> {
        let requested = dispatcher.selected_tier();
        let host = dispatcher.host_features();
        let mut candidate = Some(requested);
        while let Some(tier) = candidate {
            let key = KernelKey {
                precision,
                method,
                tier,
            };
            if let Some(constructor) = self.entries.get(&key) {
                if host.contains(tier.required_features()) {
                    if tier != requested {
                        debug!(
                            "{}: no {requested} kernel for {precision}/{method:?}, using {tier}",
                            self.name
                        );
                    }
                    let kernel = constructor()?;
                    return Ok(ResolvedKernel {
                        kernel,
                        tier,
                        requested,
                    });
                }
                warn!(
                    "{}: {tier} kernel for {precision}/{method:?} registered but host lacks {:?}",
                    self.name,
                    tier.required_features() - host
                );
            }
            candidate = tier.below();
        }
        Err(Error::with_detail(
            ErrorKind::KernelNotRegistered,
            self.name,
            format!("{precision}/{method:?}"),
        ))
    }
}

impl<M: KernelMethod, K: ?Sized> fmt::Debug for KernelRegistry<M, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort_by_key(|k| (k.precision as u8, k.tier));
        f.debug_struct("KernelRegistry")
            .field("name", &self.name)
            .field("entries", &keys)
            .finish()
    }
}
