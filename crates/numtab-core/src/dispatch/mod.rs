//! Process-wide CPU tier selection
//!
//! The dispatcher probes the host once, on first use, and caches the result.
//! A tier can be forced (by the caller or via the `NUMTAB_CPU_TIER`
//! environment variable), the override cleared, or detection rerun. Reads
//! after initialization are lock-free.
//!
//! The dispatcher computes nothing; kernel registries consult it to pick an
//! entry point (see [`crate::registry`]).

mod tier;

pub use tier::{CpuFeatures, CpuTier};

use lazy_static::lazy_static;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

/// Environment variable consulted by [`DispatcherConfig::from_env`]
pub const CPU_TIER_ENV: &str = "NUMTAB_CPU_TIER";

const UNSET: u8 = u8::MAX;

/// Settings applied when the dispatcher first detects the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Tier to select instead of the detected one
    #[serde(default)]
    pub forced_tier: Option<CpuTier>,
}

impl DispatcherConfig {
    pub fn with_forced_tier(mut self, tier: CpuTier) -> Self {
        self.forced_tier = Some(tier);
        self
    }

    /// Read `NUMTAB_CPU_TIER`; unparsable values are ignored with a warning
    pub fn from_env() -> Self {
        let forced_tier = match std::env::var(CPU_TIER_ENV) {
            Ok(value) => match value.parse::<CpuTier>() {
                Ok(tier) => Some(tier),
                Err(err) => {
                    warn!("ignoring {CPU_TIER_ENV}={value:?}: {err}");
                    None
                }
            },
            Err(_) => None,
        };
        Self { forced_tier }
    }
}

lazy_static! {
    static ref GLOBAL: Dispatcher = Dispatcher::with_config(DispatcherConfig::from_env());
}

/// CPU capability dispatcher
#[derive(Debug)]
pub struct Dispatcher {
    detected: AtomicU8,
    forced: AtomicU8,
    features: AtomicU32,
    init: Mutex<()>,
    config: DispatcherConfig,
    /// Set once the configured override has been considered
    config_applied: AtomicBool,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::with_config(DispatcherConfig::default())
    }
}

impl Dispatcher {
    /// The process-wide instance
    pub fn global() -> &'static Dispatcher {
        &GLOBAL
    }

    /// Private instance; detection still happens lazily on first query
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            detected: AtomicU8::new(UNSET),
            forced: AtomicU8::new(UNSET),
            features: AtomicU32::new(0),
            init: Mutex::new(()),
            config,
            config_applied: AtomicBool::new(false),
        }
    }

    /// Private instance that reports `tier` as detected
    ///
    /// Host features are still probed for real, so kernel resolution never
    /// picks code the machine cannot run.
    pub fn fixed(tier: CpuTier) -> Self {
        let dispatcher = Self::default();
        dispatcher
            .features
            .store(CpuFeatures::detect().bits(), Ordering::Release);
        dispatcher.detected.store(tier as u8, Ordering::Release);
        dispatcher
    }

    fn ensure_detected(&self) -> CpuTier {
        if let Some(tier) = CpuTier::from_raw(self.detected.load(Ordering::Acquire)) {
            return tier;
        }
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tier) = CpuTier::from_raw(self.detected.load(Ordering::Acquire)) {
            return tier;
        }
        self.detect_locked()
    }

    fn detect_locked(&self) -> CpuTier {
        let features = CpuFeatures::detect();
        let tier = CpuTier::from_features(features);
        self.features.store(features.bits(), Ordering::Release);
        let first = !self.config_applied.swap(true, Ordering::AcqRel);
        if let (true, Some(forced)) = (first, self.config.forced_tier) {
            let applied = self
                .forced
                .compare_exchange(UNSET, forced as u8, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
            if applied {
                info!("CPU tier forced to {forced} by configuration");
            }
        }
        self.detected.store(tier as u8, Ordering::Release);
        info!("detected CPU tier {tier} ({features:?})");
        tier
    }

    /// Tier detected on the host (or fixed at construction)
    pub fn detected_tier(&self) -> CpuTier {
        self.ensure_detected()
    }

    /// Tier kernels are selected for: the override if set, else the detected one
    pub fn selected_tier(&self) -> CpuTier {
        let detected = self.ensure_detected();
        CpuTier::from_raw(self.forced.load(Ordering::Acquire)).unwrap_or(detected)
    }

    pub fn forced_tier(&self) -> Option<CpuTier> {
        self.ensure_detected();
        CpuTier::from_raw(self.forced.load(Ordering::Acquire))
    }

    /// Instruction-set extensions the host supports
    pub fn host_features(&self) -> CpuFeatures {
        self.ensure_detected();
        CpuFeatures::from_bits_truncate(self.features.load(Ordering::Acquire))
    }

    /// Select `tier` regardless of detection
    ///
    /// Kernels for tiers the host lacks are still skipped at resolution.
    pub fn force_tier(&self, tier: CpuTier) {
        self.ensure_detected();
        self.forced.store(tier as u8, Ordering::Release);
        info!("CPU tier forced to {tier}");
    }

    pub fn clear_override(&self) {
        if self.forced.swap(UNSET, Ordering::AcqRel) != UNSET {
            info!("CPU tier override cleared");
        }
    }

    /// Probe the host again; an override stays in place and a cleared one
    /// is not brought back from the configuration
    pub fn redetect(&self) -> CpuTier {
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        self.detected.store(UNSET, Ordering::Release);
        self.detect_locked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_detection() {
        let dispatcher = Dispatcher::default();
        let tier = dispatcher.detected_tier();
        assert_eq!(tier, CpuTier::from_features(CpuFeatures::detect()));
        assert_eq!(dispatcher.selected_tier(), tier);
        assert!(dispatcher.forced_tier().is_none());
        assert!(dispatcher.host_features().contains(tier.required_features()));
    }

    #[test]
    fn test_override_lifecycle() {
        let dispatcher = Dispatcher::default();
        let detected = dispatcher.detected_tier();

        dispatcher.force_tier(CpuTier::Baseline);
        assert_eq!(dispatcher.selected_tier(), CpuTier::Baseline);
        assert_eq!(dispatcher.forced_tier(), Some(CpuTier::Baseline));
        assert_eq!(dispatcher.detected_tier(), detected);

        // redetection keeps the override
        assert_eq!(dispatcher.redetect(), detected);
        assert_eq!(dispatcher.selected_tier(), CpuTier::Baseline);

        dispatcher.clear_override();
        assert_eq!(dispatcher.selected_tier(), detected);
    }

    #[test]
    fn test_config_override() {
        let config = DispatcherConfig::default().with_forced_tier(CpuTier::Sse42);
        let dispatcher = Dispatcher::with_config(config);
        assert_eq!(dispatcher.selected_tier(), CpuTier::Sse42);

        // an explicit override made before detection wins over configuration
        let dispatcher = Dispatcher::with_config(config);
        dispatcher.forced.store(CpuTier::Avx2 as u8, Ordering::Release);
        assert_eq!(dispatcher.selected_tier(), CpuTier::Avx2);
    }

    #[test]
    fn test_redetect_after_clearing_config_override() {
        let config = DispatcherConfig::default().with_forced_tier(CpuTier::Sse42);
        let dispatcher = Dispatcher::with_config(config);
        assert_eq!(dispatcher.forced_tier(), Some(CpuTier::Sse42));

        dispatcher.clear_override();
        let detected = dispatcher.redetect();
        assert_eq!(dispatcher.forced_tier(), None);
        assert_eq!(dispatcher.selected_tier(), detected);

        // a caller override still survives redetection
        dispatcher.force_tier(CpuTier::Baseline);
        dispatcher.redetect();
        assert_eq!(dispatcher.forced_tier(), Some(CpuTier::Baseline));
    }

    #[test]
    fn test_fixed_simulates_tier() {
        let dispatcher = Dispatcher::fixed(CpuTier::Avx512);
        assert_eq!(dispatcher.detected_tier(), CpuTier::Avx512);
        assert_eq!(dispatcher.selected_tier(), CpuTier::Avx512);
        assert_eq!(dispatcher.host_features(), CpuFeatures::detect());
    }

    #[test]
    fn test_concurrent_first_use() {
        let dispatcher = Dispatcher::default();
        let tiers: Vec<CpuTier> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| dispatcher.selected_tier()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(tiers.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_config_serde() {
        let config: DispatcherConfig = serde_json::from_str(r#"{"forced_tier":"Avx2"}"#).unwrap();
        assert_eq!(config.forced_tier, Some(CpuTier::Avx2));
        let config: DispatcherConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DispatcherConfig::default());
    }
}
