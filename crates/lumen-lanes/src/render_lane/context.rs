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

//! The per-frame context threaded through every pipeline stage.

use super::LaneError;
use lumen_core::renderer::RenderPipelineSettings;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;

/// Settings and worker pool shared by the stages of one frame.
///
/// Cloning is cheap; the pool is shared.
#[derive(Debug, Clone, Default)]
pub struct FrameContext {
    /// Pipeline configuration.
    pub settings: RenderPipelineSettings,
    pool: Option<Arc<ThreadPool>>,
}

impl FrameContext {
    /// A context running parallel work on the global rayon pool.
    pub fn new(settings: RenderPipelineSettings) -> Self {
        Self {
            settings,
            pool: None,
        }
    }

    /// A context with a dedicated pool when `settings.worker_threads` is set.
    pub fn with_settings(settings: RenderPipelineSettings) -> Result<Self, LaneError> {
        let pool = match settings.worker_threads {
            Some(threads) => Some(Arc::new(
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|index| format!("lumen-worker-{index}"))
                    .build()?,
            )),
            None => None,
        };
        Ok(Self { settings, pool })
    }

    /// Overrides the entity count above which job construction goes parallel.
    ///
    /// `0` always forks; `usize::MAX` never does.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.settings.parallel_threshold = threshold;
        self
    }

    /// Returns `true` when `count` items should be processed in parallel.
    #[inline]
    pub fn should_fork(&self, count: usize) -> bool {
        count > self.settings.parallel_threshold
    }

    /// Runs `work` inside the dedicated pool, or directly when there is none.
    pub fn install<R: Send>(&self, work: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_controls_forking() {
        let ctx = FrameContext::default().with_parallel_threshold(10);
        assert!(!ctx.should_fork(10));
        assert!(ctx.should_fork(11));
        assert!(FrameContext::default().with_parallel_threshold(0).should_fork(1));
    }

    #[test]
    fn dedicated_pool_runs_work() {
        let settings = RenderPipelineSettings {
            worker_threads: Some(2),
            ..Default::default()
        };
        let ctx = FrameContext::with_settings(settings).unwrap();
        assert_eq!(ctx.install(rayon::current_num_threads), 2);
    }
}
