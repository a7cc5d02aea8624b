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

//! Tunables of the frame pipeline, loadable from RON.

use super::limits::{POINT_LIGHT_CACHE_ITEM_COUNT, SPOT_LIGHT_CACHE_ITEM_COUNT};
use super::state::BlendFunction;
use serde::{Deserialize, Serialize};

/// Settings read once when the pipeline is set up.
///
/// Fields missing from a RON document take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderPipelineSettings {
    /// Entity count above which job construction forks over the worker pool.
    pub parallel_threshold: usize,
    /// Skips the deferred partitions entirely.
    pub forward_only: bool,
    /// Builds jobs for hidden entities too.
    pub ignore_visibility: bool,
    /// Worker thread count. `None` lets the pool pick.
    pub worker_threads: Option<usize>,
    /// When set, per-job blend changes are ignored and this function stays active.
    pub override_blend_state: Option<BlendFunction>,
    /// Point light cache capacity in items.
    pub point_light_cache_capacity: usize,
    /// Spot light cache capacity in items.
    pub spot_light_cache_capacity: usize,
}

impl Default for RenderPipelineSettings {
    fn default() -> Self {
        Self {
            parallel_threshold: 1000,
            forward_only: false,
            ignore_visibility: false,
            worker_threads: None,
            override_blend_state: None,
            point_light_cache_capacity: POINT_LIGHT_CACHE_ITEM_COUNT,
            spot_light_cache_capacity: SPOT_LIGHT_CACHE_ITEM_COUNT,
        }
    }
}

impl RenderPipelineSettings {
    /// Parses settings from a RON document.
    pub fn from_ron_str(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Serializes settings to pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}
