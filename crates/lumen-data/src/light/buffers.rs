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

//! GPU buffers backing the light caches.

use super::{DirectionalLightData, Light, LightPayload, LightType, PointLightData, SpotLightData};
use crate::cache::{CacheItem, EvictionCache};
use lumen_core::renderer::limits::{
    binding, DIRECTIONAL_LIGHT_CACHE_ITEM_COUNT, MAX_CASCADE_COUNT,
};
use lumen_core::renderer::{BufferDescriptor, BufferId, GraphicsDevice, ResourceError};
use lumen_core::ObjectId;
use std::borrow::Cow;
use std::mem::size_of;

/// An eviction cache of one light kind paired with the uniform buffer it uploads to.
#[derive(Debug)]
pub struct LightCacheBuffer<T: LightPayload> {
    cache: EvictionCache<T>,
    slot: u32,
    buffer: Option<BufferId>,
}

/// Cache of point light payloads bound at [`binding::POINT_LIGHT_CACHE`].
pub type PointLightCache = LightCacheBuffer<PointLightData>;
/// Cache of spot light payloads bound at [`binding::SPOT_LIGHT_CACHE`].
pub type SpotLightCache = LightCacheBuffer<SpotLightData>;

impl PointLightCache {
    /// Creates a point light cache holding `item_capacity` lights.
    pub fn point(item_capacity: usize) -> Self {
        Self::new(binding::POINT_LIGHT_CACHE, item_capacity)
    }
}

impl SpotLightCache {
    /// Creates a spot light cache holding `item_capacity` lights.
    pub fn spot(item_capacity: usize) -> Self {
        Self::new(binding::SPOT_LIGHT_CACHE, item_capacity)
    }
}

impl<T: LightPayload> LightCacheBuffer<T> {
    /// Creates a cache whose buffer will be bound at `slot`.
    pub fn new(slot: u32, item_capacity: usize) -> Self {
        Self {
            cache: EvictionCache::with_item_capacity(item_capacity),
            slot,
            buffer: None,
        }
    }

    /// Creates the uniform buffer and binds it to the cache's slot.
    ///
    /// Calling again is a no-op and returns the existing buffer.
    pub fn init(&mut self, device: &dyn GraphicsDevice) -> Result<BufferId, ResourceError> {
        if let Some(buffer) = self.buffer {
            return Ok(buffer);
        }

        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Owned(format!("{:?} light cache", T::LIGHT_TYPE))),
            size: self.cache.capacity_bytes() as u64,
        })?;
        device.bind_buffer_base(self.slot, buffer);
        self.buffer = Some(buffer);
        Ok(buffer)
    }

    /// The uniform buffer, once created.
    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    /// Binding slot of the buffer.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Inserts or refreshes a payload. See [`EvictionCache::add_or_update`].
    pub fn add_or_update(&mut self, item: &CacheItem<T>) -> usize {
        self.cache.add_or_update(item)
    }

    /// Inserts or refreshes `light` if it is of this cache's kind.
    ///
    /// Returns the light's id when it was accepted.
    pub fn add_light(&mut self, light: &Light) -> Option<ObjectId> {
        let item = light.typed_cache_item::<T>()?;
        self.cache.add_or_update(&item);
        Some(item.id)
    }

    /// Uploads the cache if it changed. Returns whether an upload happened.
    pub fn map(&mut self, device: &dyn GraphicsDevice) -> Result<bool, ResourceError> {
        let buffer = self.buffer.ok_or_else(|| {
            ResourceError::InvalidHandle(format!("{:?} light cache used before init", T::LIGHT_TYPE))
        })?;
        self.cache
            .try_map(|bytes| device.write_buffer(buffer, 0, bytes))
    }

    /// Slots of the first `limit` resident ids. See [`EvictionCache::look_up`].
    pub fn look_up(&self, ids: &[ObjectId], limit: usize) -> Vec<u32> {
        self.cache.look_up(ids, limit)
    }

    /// Drops every resident light.
    pub fn reset(&mut self) {
        self.cache.reset();
    }

    /// The underlying eviction cache.
    pub fn cache(&self) -> &EvictionCache<T> {
        &self.cache
    }
}

const LIGHT_TABLE_BYTES: usize =
    DIRECTIONAL_LIGHT_CACHE_ITEM_COUNT * size_of::<DirectionalLightData>();
const PVM_TABLE_BYTES: usize =
    DIRECTIONAL_LIGHT_CACHE_ITEM_COUNT * MAX_CASCADE_COUNT * size_of::<[[f32; 4]; 4]>();

/// Flat table of directional lights and their cascade matrices.
///
/// Directional lights affect every object, so they are never evicted. The
/// table is rewritten whenever the set of lights or any of their versions
/// differs from the last upload.
#[derive(Debug, Default)]
pub struct DirectionalLightTable {
    light_buffer: Option<BufferId>,
    pvm_buffer: Option<BufferId>,
    uploaded: Vec<(ObjectId, u32)>,
}

impl DirectionalLightTable {
    /// Creates an empty table. Call [`init`](Self::init) before mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates both uniform buffers and binds them.
    pub fn init(&mut self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        if self.light_buffer.is_some() {
            return Ok(());
        }

        let light_buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed("directional light table")),
            size: LIGHT_TABLE_BYTES as u64,
        })?;
        let pvm_buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed("directional light pvm table")),
            size: PVM_TABLE_BYTES as u64,
        })?;
        device.bind_buffer_base(binding::DIRECTIONAL_LIGHT, light_buffer);
        device.bind_buffer_base(binding::DIRECTIONAL_LIGHT_PVM, pvm_buffer);

        self.light_buffer = Some(light_buffer);
        self.pvm_buffer = Some(pvm_buffer);
        Ok(())
    }

    /// The light data buffer, once initialized.
    pub fn light_buffer(&self) -> Option<BufferId> {
        self.light_buffer
    }

    /// The cascade projection-view buffer, once initialized.
    pub fn pvm_buffer(&self) -> Option<BufferId> {
        self.pvm_buffer
    }

    /// Number of lights in the last upload.
    pub fn count(&self) -> usize {
        self.uploaded.len()
    }

    /// Uploads the directional lights among `lights`, in order.
    ///
    /// Non-directional lights are ignored and lights past the table capacity
    /// are dropped. Returns whether the buffers were rewritten.
    pub fn map<'a>(
        &mut self,
        device: &dyn GraphicsDevice,
        lights: impl IntoIterator<Item = &'a Light>,
    ) -> Result<bool, ResourceError> {
        let (Some(light_buffer), Some(pvm_buffer)) = (self.light_buffer, self.pvm_buffer) else {
            return Err(ResourceError::InvalidHandle(
                "directional light table used before init".to_string(),
            ));
        };

        let lights: Vec<&Light> = lights
            .into_iter()
            .filter(|light| light.light_type() == LightType::Directional)
            .take(DIRECTIONAL_LIGHT_CACHE_ITEM_COUNT)
            .collect();

        let stamps: Vec<(ObjectId, u32)> = lights
            .iter()
            .map(|light| (light.id(), light.cache_item().version()))
            .collect();
        if stamps == self.uploaded {
            return Ok(false);
        }

        let mut table = [DirectionalLightData::default(); DIRECTIONAL_LIGHT_CACHE_ITEM_COUNT];
        let mut pvms = [[[0.0f32; 4]; 4]; DIRECTIONAL_LIGHT_CACHE_ITEM_COUNT * MAX_CASCADE_COUNT];

        for (index, light) in lights.iter().enumerate() {
            if let Some(item) = light.typed_cache_item::<DirectionalLightData>() {
                table[index] = item.data;
            }
            if let Some(cascades) = light.cascade_projection_views() {
                for (cascade, matrix) in cascades.iter().enumerate() {
                    pvms[index * MAX_CASCADE_COUNT + cascade] = matrix.to_cols_array_2d();
                }
            }
        }

        device.write_buffer(light_buffer, 0, bytemuck::cast_slice(&table))?;
        device.write_buffer(pvm_buffer, 0, bytemuck::cast_slice(&pvms))?;
        self.uploaded = stamps;
        Ok(true)
    }
}
