// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Display-density tiers used to select device-appropriate asset variants.

use serde::{Deserialize, Serialize};

/// A discrete display-scale tier.
///
/// Buckets are totally ordered, lowest to highest. The ordering drives
/// "best available, not exceeding a ceiling" searches: when an asset has no
/// variant for the requested bucket, the resolver walks down the
/// [`fallback_chain`](DensityBucket::fallback_chain) and never substitutes a
/// variant *above* the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DensityBucket {
    /// Unscaled desktop baseline.
    Desktop,
    /// Low-density displays.
    Low,
    /// Medium-density displays.
    Medium,
    /// High-density displays.
    High,
    /// Extra-high-density displays.
    ExtraHigh,
    /// Extra-extra-high-density displays.
    ExtraExtraHigh,
    /// Extra-extra-extra-high-density displays.
    ExtraExtraExtraHigh,
}

impl DensityBucket {
    /// Every bucket, in ascending density order.
    pub const ALL: [DensityBucket; 7] = [
        DensityBucket::Desktop,
        DensityBucket::Low,
        DensityBucket::Medium,
        DensityBucket::High,
        DensityBucket::ExtraHigh,
        DensityBucket::ExtraExtraHigh,
        DensityBucket::ExtraExtraExtraHigh,
    ];

    /// The filename suffix used by the `{name}-{bucket}{ext}` variant
    /// convention (e.g. `icon-high.png`).
    pub const fn suffix(self) -> &'static str {
        match self {
            DensityBucket::Desktop => "desktop",
            DensityBucket::Low => "low",
            DensityBucket::Medium => "medium",
            DensityBucket::High => "high",
            DensityBucket::ExtraHigh => "extrahigh",
            DensityBucket::ExtraExtraHigh => "extraextrahigh",
            DensityBucket::ExtraExtraExtraHigh => "extraextraextrahigh",
        }
    }

    /// Parses a filename suffix back into a bucket.
    pub fn from_suffix(suffix: &str) -> Option<DensityBucket> {
        Self::ALL.into_iter().find(|b| b.suffix() == suffix)
    }

    /// Buckets to try for a request at `self`: the requested bucket first,
    /// then each lower bucket down to [`DensityBucket::Desktop`]. Buckets
    /// above the request are never yielded.
    pub fn fallback_chain(self) -> impl Iterator<Item = DensityBucket> {
        let ceiling = self as usize;
        (0..=ceiling).rev().map(|i| Self::ALL[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_declaration() {
        assert!(DensityBucket::Desktop < DensityBucket::Low);
        assert!(DensityBucket::High < DensityBucket::ExtraHigh);
        assert!(DensityBucket::ExtraExtraHigh < DensityBucket::ExtraExtraExtraHigh);
    }

    #[test]
    fn fallback_chain_never_exceeds_request() {
        let chain: Vec<_> = DensityBucket::High.fallback_chain().collect();
        assert_eq!(
            chain,
            vec![
                DensityBucket::High,
                DensityBucket::Medium,
                DensityBucket::Low,
                DensityBucket::Desktop,
            ]
        );
    }

    #[test]
    fn fallback_chain_at_floor_is_single() {
        let chain: Vec<_> = DensityBucket::Desktop.fallback_chain().collect();
        assert_eq!(chain, vec![DensityBucket::Desktop]);
    }

    #[test]
    fn suffix_round_trip() {
        for bucket in DensityBucket::ALL {
            assert_eq!(DensityBucket::from_suffix(bucket.suffix()), Some(bucket));
        }
        assert_eq!(DensityBucket::from_suffix("ultra"), None);
    }
}
