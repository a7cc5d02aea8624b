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

//! Per-frame counters gathered by the frame renderer.

/// Counters for one rendered frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// A sequential counter for rendered frames.
    pub frame_number: u64,
    /// Draw calls issued.
    pub draw_calls: u32,
    /// Render jobs built for the frame.
    pub render_jobs: u32,
    /// Times a light cache or the directional table was re-uploaded.
    pub light_cache_uploads: u32,
    /// Times a program received a material block it did not already hold.
    pub material_uploads: u32,
    /// Times the current program changed.
    pub program_switches: u32,
    /// Cull, blend or line-width changes applied to the device.
    pub state_changes: u32,
    /// Times the camera buffer was re-uploaded.
    pub camera_uploads: u32,
}

impl RenderStats {
    /// Clears every counter except the frame number, which is advanced.
    pub fn begin_frame(&mut self) {
        let next = self.frame_number + 1;
        *self = Self {
            frame_number: next,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_frame_resets_counters() {
        let mut stats = RenderStats {
            draw_calls: 12,
            state_changes: 3,
            ..Default::default()
        };
        stats.begin_frame();
        assert_eq!(stats.frame_number, 1);
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(stats.state_changes, 0);
    }
}
