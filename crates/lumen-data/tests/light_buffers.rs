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

use lumen_core::math::{Mat4, Vec3};
use lumen_core::renderer::limits::{binding, MAX_CASCADE_COUNT};
use lumen_core::renderer::ResourceError;
use lumen_data::light::{
    DirectionalLightData, DirectionalLightTable, PointLightCache, PointLightData, SpotLightCache,
};
use lumen_data::{Light, SceneData};
use lumen_infra::{DeviceCommand, HeadlessGraphicsDevice};

fn read<T: bytemuck::Pod>(bytes: &[u8], index: usize) -> T {
    let size = std::mem::size_of::<T>();
    bytemuck::pod_read_unaligned(&bytes[index * size..(index + 1) * size])
}

fn scene_with_points(count: usize) -> (SceneData, Vec<lumen_data::LightId>) {
    let mut scene = SceneData::new();
    let ids = (0..count)
        .map(|i| scene.add_light(Light::point(Vec3::new(i as f32, 0.0, 0.0), 1.0 + i as f32)))
        .collect();
    scene.refresh_light_cache_items();
    (scene, ids)
}

#[test]
fn point_cache_binds_and_uploads_payloads_in_slot_order() {
    let device = HeadlessGraphicsDevice::new();
    let mut cache = PointLightCache::point(4);
    let buffer = cache.init(&device).unwrap();
    assert!(device
        .commands()
        .contains(&DeviceCommand::BindBufferBase {
            slot: binding::POINT_LIGHT_CACHE,
            buffer
        }));

    let (scene, ids) = scene_with_points(2);
    for id in &ids {
        cache.add_light(scene.light(*id).unwrap()).unwrap();
    }
    assert!(cache.map(&device).unwrap());
    assert!(!cache.map(&device).unwrap());

    let bytes = device.buffer_contents(buffer).unwrap();
    // Last inserted light occupies slot zero.
    assert_eq!(read::<PointLightData>(&bytes, 0).radius, 2.0);
    assert_eq!(read::<PointLightData>(&bytes, 1).radius, 1.0);

    let light_ids: Vec<_> = ids.iter().map(|id| scene.light(*id).unwrap().id()).collect();
    assert_eq!(cache.look_up(&light_ids, 24), vec![1, 0]);
}

#[test]
fn spot_cache_ignores_other_kinds() {
    let mut scene = SceneData::new();
    let point = scene.add_light(Light::point(Vec3::ZERO, 1.0));
    let spot = scene.add_light(Light::spot(Vec3::ZERO, Vec3::NEG_Z, 5.0, 0.6, 0.4));
    scene.refresh_light_cache_items();

    let mut cache = SpotLightCache::spot(2);
    assert!(cache.add_light(scene.light(point).unwrap()).is_none());
    assert!(cache.add_light(scene.light(spot).unwrap()).is_some());
    assert_eq!(cache.cache().len(), 1);
}

#[test]
fn mapping_before_init_is_an_error() {
    let device = HeadlessGraphicsDevice::new();
    let mut cache = PointLightCache::point(2);
    assert!(matches!(
        cache.map(&device),
        Err(ResourceError::InvalidHandle(_))
    ));
}

#[test]
fn directional_table_uploads_only_on_change() {
    let device = HeadlessGraphicsDevice::new();
    let mut table = DirectionalLightTable::new();
    table.init(&device).unwrap();

    let mut scene = SceneData::new();
    let sun = scene.add_light(Light::directional(Vec3::NEG_Y));
    scene.add_light(Light::point(Vec3::ZERO, 1.0));
    scene.light_mut(sun).unwrap().modify(|_, kind| {
        if let lumen_data::LightKind::Directional {
            cascade_projection_views,
            ..
        } = kind
        {
            cascade_projection_views[1] = Mat4::from_scale(Vec3::splat(2.0));
        }
    });
    scene.refresh_light_cache_items();

    let lights: Vec<&Light> = scene.light_ids().iter().filter_map(|id| scene.light(*id)).collect();
    assert!(table.map(&device, lights.iter().copied()).unwrap());
    assert_eq!(table.count(), 1);
    assert!(!table.map(&device, lights.iter().copied()).unwrap());

    let light_bytes = device.buffer_contents(table.light_buffer().unwrap()).unwrap();
    let sun_data: DirectionalLightData = read(&light_bytes, 0);
    assert_eq!(sun_data.direction, [0.0, -1.0, 0.0]);

    let pvm_bytes = device.buffer_contents(table.pvm_buffer().unwrap()).unwrap();
    assert_eq!(pvm_bytes.len() % (MAX_CASCADE_COUNT * 64), 0);
    let cascade: [[f32; 4]; 4] = read(&pvm_bytes, 1);
    assert_eq!(cascade[0][0], 2.0);

    scene.light_mut(sun).unwrap().set_intensity(5.0);
    scene.refresh_light_cache_items();
    let lights: Vec<&Light> = scene.light_ids().iter().filter_map(|id| scene.light(*id)).collect();
    assert!(table.map(&device, lights.iter().copied()).unwrap());
}
