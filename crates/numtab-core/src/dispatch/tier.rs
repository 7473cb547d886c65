//! CPU tiers and instruction-set probing

use crate::error::{Error, ErrorKind};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Instruction-set extensions relevant to kernel selection
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CpuFeatures: u32 {
        const SSE2 = 1;
        const SSSE3 = 1 << 1;
        const SSE41 = 1 << 2;
        const SSE42 = 1 << 3;
        const AVX = 1 << 4;
        const AVX2 = 1 << 5;
        const FMA = 1 << 6;
        const AVX512F = 1 << 7;
        const AVX512VL = 1 << 8;
        const NEON = 1 << 9;
    }
}

impl CpuFeatures {
    /// Probe the host CPU
    pub fn detect() -> Self {
        #[allow(unused_mut)]
        let mut features = Self::empty();

        #[cfg(target_arch = "x86_64")]
        {
            let probes = [
                (is_x86_feature_detected!("sse2"), Self::SSE2),
                (is_x86_feature_detected!("ssse3"), Self::SSSE3),
                (is_x86_feature_detected!("sse4.1"), Self::SSE41),
                (is_x86_feature_detected!("sse4.2"), Self::SSE42),
                (is_x86_feature_detected!("avx"), Self::AVX),
                (is_x86_feature_detected!("avx2"), Self::AVX2),
                (is_x86_feature_detected!("fma"), Self::FMA),
                (is_x86_feature_detected!("avx512f"), Self::AVX512F),
                (is_x86_feature_detected!("avx512vl"), Self::AVX512VL),
            ];
            for (present, flag) in probes {
                features.set(flag, present);
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            features |= Self::NEON;
        }

        features
    }
}

/// Ordered CPU capability tier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum CpuTier {
    /// Portable scalar code
    #[default]
    Baseline = 0,
    Sse42 = 1,
    /// AVX2 with FMA
    Avx2 = 2,
    Avx512 = 3,
}

impl CpuTier {
    pub const ALL: [CpuTier; 4] = [Self::Baseline, Self::Sse42, Self::Avx2, Self::Avx512];

    /// Best tier the given features support
    pub fn from_features(features: CpuFeatures) -> Self {
        Self::ALL
            .into_iter()
            .rev()
            .find(|tier| features.contains(tier.required_features()))
            .unwrap_or(Self::Baseline)
    }

    /// Extensions a kernel compiled for this tier may use
    pub fn required_features(self) -> CpuFeatures {
        let sse = CpuFeatures::SSE2 | CpuFeatures::SSSE3 | CpuFeatures::SSE41 | CpuFeatures::SSE42;
        let avx2 = sse | CpuFeatures::AVX | CpuFeatures::AVX2 | CpuFeatures::FMA;
        match self {
            Self::Baseline => CpuFeatures::empty(),
            Self::Sse42 => sse,
            Self::Avx2 => avx2,
            Self::Avx512 => avx2 | CpuFeatures::AVX512F,
        }
    }

    /// Next lower tier
    pub fn below(self) -> Option<Self> {
        match self {
            Self::Baseline => None,
            Self::Sse42 => Some(Self::Baseline),
            Self::Avx2 => Some(Self::Sse42),
            Self::Avx512 => Some(Self::Avx2),
        }
    }

    pub(crate) fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.get(usize::from(raw)).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Sse42 => "sse42",
            Self::Avx2 => "avx2",
            Self::Avx512 => "avx512",
        }
    }
}

impl fmt::Display for CpuTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CpuTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" | "scalar" | "generic" => Ok(Self::Baseline),
            "sse42" | "sse4.2" | "sse4_2" => Ok(Self::Sse42),
            "avx2" => Ok(Self::Avx2),
            "avx512" | "avx512f" => Ok(Self::Avx512),
            other => Err(Error::with_detail(
                ErrorKind::IncorrectParameter,
                "cpu_tier",
                format!("unknown CPU tier '{other}'"),
            )),
        }
    }
}
