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

//! Position statistics over a set of jobs, used to reject outliers when
//! fitting shadow volumes.

use super::RenderJob;
use lumen_core::math::Vec3;

/// Mean of the jobs' world translations and their radial standard deviation,
/// `sqrt(sum(|p - mean|^2) / n)`.
///
/// Returns zeros for an empty slice.
pub fn position_stdev(jobs: &[RenderJob]) -> (Vec3, f32) {
    if jobs.is_empty() {
        return (Vec3::ZERO, 0.0);
    }

    let count = jobs.len() as f32;
    let translation = |job: &RenderJob| job.world_transform.w_axis.truncate();

    let mean = jobs.iter().map(translation).sum::<Vec3>() / count;
    let squared = jobs
        .iter()
        .map(|job| (translation(job) - mean).length_squared())
        .sum::<f32>();

    (mean, (squared / count).sqrt())
}

/// Returns `true` when `value` lies more than `sigma` standard deviations
/// from `mean`, measured by distance.
pub fn is_outlier(value: Vec3, mean: Vec3, stdev: f32, sigma: f32) -> bool {
    (value - mean).length() / stdev > sigma
}
