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

//! # Lumen Data
//!
//! GPU-facing data layouts and the containers that own them: versioned cache
//! items, the LRU eviction cache that doubles as a GPU buffer layout, the
//! light and material payloads, and the generational scene arenas the frame
//! pipeline reads from.

pub mod cache;
pub mod light;
pub mod material;
pub mod scene;

pub use cache::{CacheItem, EvictionCache};
pub use light::{Light, LightKind, LightType};
pub use material::{Material, MaterialData};
pub use scene::{EntityId, EnvironmentId, LightId, MaterialId, MeshId, SceneData};
