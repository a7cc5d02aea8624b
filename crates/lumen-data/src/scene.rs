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

//! Generational arenas holding the scene objects a frame reads.
//!
//! Everything refers to everything else by key. A key whose object was
//! removed fails its generation check and resolves to `None`, so a stale
//! reference in a render job degrades to "not drawn" instead of dangling.

use crate::light::Light;
use crate::material::Material;
use lumen_core::math::{Aabb, Mat4, Quat};
use lumen_core::renderer::{GraphicsDevice, ResourceError, TextureId, VertexArrayId};
use lumen_core::ObjectId;
use slotmap::{new_key_type, Key, SlotMap};

new_key_type! {
    /// Key of an [`Entity`].
    pub struct EntityId;
    /// Key of a [`Mesh`].
    pub struct MeshId;
    /// Key of a [`Material`].
    pub struct MaterialId;
    /// Key of a [`Light`].
    pub struct LightId;
    /// Key of an [`EnvironmentProbe`].
    pub struct EnvironmentId;
}

/// The persistent GPU cache id of an arena object.
///
/// Includes the key's generation, so a reused slot gets a new id.
pub fn object_id<K: Key>(key: K) -> ObjectId {
    ObjectId(key.data().as_ffi())
}

/// One drawable range of a mesh.
#[derive(Debug, Clone, Default)]
pub struct SubMesh {
    /// Number of vertices.
    pub vertex_count: u32,
    /// Zero means the submesh is drawn without an index buffer.
    pub index_count: u32,
    /// Material used when the entity does not override it.
    pub material: Option<MaterialId>,
    vertex_array: Option<VertexArrayId>,
}

impl SubMesh {
    /// A submesh with no material of its own.
    pub fn new(vertex_count: u32, index_count: u32) -> Self {
        Self {
            vertex_count,
            index_count,
            material: None,
            vertex_array: None,
        }
    }

    /// Sets the material used when the entity has no override.
    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    /// The uploaded vertex array, once the mesh is initialized.
    pub fn vertex_array(&self) -> Option<VertexArrayId> {
        self.vertex_array
    }
}

/// Bone data of a skinned mesh.
#[derive(Debug, Clone, Copy)]
pub struct Skeleton {
    /// Number of bones.
    pub bone_count: u32,
    /// Texture holding the rest pose, sampled when no animation plays.
    pub bind_pose_texture: TextureId,
}

/// Geometry made of one or more submeshes.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Name used in logs.
    pub name: String,
    /// Drawable ranges, in draw order.
    pub submeshes: Vec<SubMesh>,
    /// Present for skinned meshes.
    pub skeleton: Option<Skeleton>,
}

impl Mesh {
    /// A static mesh made of `submeshes`.
    pub fn new(name: impl Into<String>, submeshes: Vec<SubMesh>) -> Self {
        Self {
            name: name.into(),
            submeshes,
            skeleton: None,
        }
    }

    /// Number of submeshes.
    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    /// Returns `true` when the mesh has a skeleton.
    pub fn is_skinned(&self) -> bool {
        self.skeleton.is_some()
    }

    /// Returns `true` once every submesh is on the GPU.
    pub fn is_initialized(&self) -> bool {
        self.submeshes.iter().all(|s| s.vertex_array.is_some())
    }

    /// Uploads submeshes that are not yet on the GPU.
    pub fn init(&mut self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        for submesh in self.submeshes.iter_mut().filter(|s| s.vertex_array.is_none()) {
            let vertex_array = device.upload_mesh(submesh.vertex_count, submesh.index_count)?;
            submesh.vertex_array = Some(vertex_array);
        }
        Ok(())
    }
}

/// Playback position of one animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyFrameState {
    /// Baked bone transforms of the animation.
    pub animation_texture: TextureId,
    /// Key frame interpolated from.
    pub key_frame_1: u32,
    /// Key frame interpolated toward.
    pub key_frame_2: u32,
    /// Interpolation factor between the two key frames.
    pub interpolation_time: f32,
    /// Number of key frames in the animation.
    pub key_frame_count: u32,
}

/// Animation state copied into each render job of a skinned entity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimationSnapshot {
    /// The playing animation. `None` renders the bind pose.
    pub current: Option<KeyFrameState>,
    /// The animation being blended toward.
    pub blend: Option<KeyFrameState>,
    /// Weight of `blend` against `current`.
    pub blend_factor: f32,
}

/// Attaches a mesh to an entity.
#[derive(Debug, Clone, Copy)]
pub struct MeshComponent {
    /// The attached mesh.
    pub mesh: MeshId,
    /// Whether the mesh casts shadows.
    pub cast_shadow: bool,
}

/// A placed object. Transform and bounds are already in world space.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Name used in logs.
    pub name: String,
    /// Hidden entities are skipped unless visibility is ignored.
    pub visible: bool,
    /// World transform.
    pub world_transform: Mat4,
    /// World-space bounds shared by all of the entity's submeshes.
    pub bounding_box: Aabb,
    /// Attached mesh, if any.
    pub mesh: Option<MeshComponent>,
    /// Per-submesh material overrides, by submesh index.
    pub materials: Option<Vec<MaterialId>>,
    /// Animation state of a skinned mesh.
    pub animation: Option<AnimationSnapshot>,
}

impl Entity {
    /// A visible entity at the origin with no components.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            world_transform: Mat4::IDENTITY,
            bounding_box: Aabb::INVALID,
            mesh: None,
            materials: None,
            animation: None,
        }
    }

    /// Attaches `mesh`.
    pub fn with_mesh(mut self, mesh: MeshId, cast_shadow: bool) -> Self {
        self.mesh = Some(MeshComponent { mesh, cast_shadow });
        self
    }

    /// Overrides submesh materials, by submesh index.
    pub fn with_materials(mut self, materials: Vec<MaterialId>) -> Self {
        self.materials = Some(materials);
        self
    }

    /// Places the entity and derives its world bounds from `local_bounds`.
    pub fn with_transform(mut self, world_transform: Mat4, local_bounds: Aabb) -> Self {
        self.world_transform = world_transform;
        self.bounding_box = local_bounds.transform(&world_transform);
        self
    }

    /// Sets the animation state.
    pub fn with_animation(mut self, animation: AnimationSnapshot) -> Self {
        self.animation = Some(animation);
        self
    }

    /// Returns `true` when the transform mirrors geometry, which swaps winding.
    pub fn requires_cull_flip(&self) -> bool {
        self.world_transform.determinant() < 0.0
    }
}

/// A bounded region carrying baked image-based lighting.
#[derive(Debug, Clone)]
pub struct EnvironmentProbe {
    /// World-space influence volume.
    pub bounding_box: Aabb,
    /// Only illuminating probes are assigned to jobs.
    pub illuminate: bool,
    /// Scale applied to the probe's lighting.
    pub intensity: f32,
    /// Orientation applied to lookups in the maps.
    pub rotation: Quat,
    /// Diffuse irradiance cube map.
    pub irradiance: TextureId,
    /// Pre-filtered specular cube map.
    pub specular: TextureId,
}

impl EnvironmentProbe {
    /// An illuminating probe covering `bounding_box`.
    pub fn new(bounding_box: Aabb, irradiance: TextureId, specular: TextureId) -> Self {
        Self {
            bounding_box,
            illuminate: true,
            intensity: 1.0,
            rotation: Quat::IDENTITY,
            irradiance,
            specular,
        }
    }
}

/// The scene as seen by the frame pipeline.
#[derive(Debug)]
pub struct SceneData {
    entities: SlotMap<EntityId, Entity>,
    meshes: SlotMap<MeshId, Mesh>,
    materials: SlotMap<MaterialId, Material>,
    lights: SlotMap<LightId, Light>,
    environments: SlotMap<EnvironmentId, EnvironmentProbe>,
    default_material: MaterialId,
}

impl Default for SceneData {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneData {
    /// An empty scene holding only the default material.
    pub fn new() -> Self {
        let mut materials = SlotMap::with_key();
        let default_material = materials.insert_with_key(|key| {
            let mut material = Material::new("default");
            material.set_id(object_id(key));
            material
        });

        Self {
            entities: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            materials,
            lights: SlotMap::with_key(),
            environments: SlotMap::with_key(),
            default_material,
        }
    }

    /// Material used when neither the entity nor the submesh names one.
    pub fn default_material(&self) -> MaterialId {
        self.default_material
    }

    /// Adds an entity.
    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        self.entities.insert(entity)
    }

    /// Adds a mesh. Its submeshes are uploaded lazily.
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.insert(mesh)
    }

    /// Adds a material and stamps it with its persistent id.
    pub fn add_material(&mut self, mut material: Material) -> MaterialId {
        self.materials.insert_with_key(|key| {
            material.set_id(object_id(key));
            material
        })
    }

    /// Adds a light and stamps it with its persistent id.
    pub fn add_light(&mut self, mut light: Light) -> LightId {
        self.lights.insert_with_key(|key| {
            light.set_id(object_id(key));
            light
        })
    }

    /// Adds an environment probe.
    pub fn add_environment(&mut self, probe: EnvironmentProbe) -> EnvironmentId {
        self.environments.insert(probe)
    }

    /// Removes an entity.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(id)
    }

    /// Removes a light.
    pub fn remove_light(&mut self, id: LightId) -> Option<Light> {
        self.lights.remove(id)
    }

    /// Removes a material. The default material cannot be removed.
    pub fn remove_material(&mut self, id: MaterialId) -> Option<Material> {
        if id == self.default_material {
            return None;
        }
        self.materials.remove(id)
    }

    /// Removes an environment probe.
    pub fn remove_environment(&mut self, id: EnvironmentId) -> Option<EnvironmentProbe> {
        self.environments.remove(id)
    }

    /// Looks up an entity.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Looks up an entity for editing.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Looks up a mesh.
    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id)
    }

    /// Looks up a mesh for editing.
    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id)
    }

    /// Looks up a material.
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Looks up a material for editing.
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    /// Looks up a light.
    pub fn light(&self, id: LightId) -> Option<&Light> {
        self.lights.get(id)
    }

    /// Looks up a light for editing.
    pub fn light_mut(&mut self, id: LightId) -> Option<&mut Light> {
        self.lights.get_mut(id)
    }

    /// Looks up an environment probe.
    pub fn environment(&self, id: EnvironmentId) -> Option<&EnvironmentProbe> {
        self.environments.get(id)
    }

    /// Every entity, in arena order.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().collect()
    }

    /// Every light, in arena order.
    pub fn light_ids(&self) -> Vec<LightId> {
        self.lights.keys().collect()
    }

    /// Every environment probe, in arena order.
    pub fn environment_ids(&self) -> Vec<EnvironmentId> {
        self.environments.keys().collect()
    }

    /// Re-packs every light whose parameters changed since the last frame.
    pub fn refresh_light_cache_items(&mut self) -> usize {
        self.lights
            .values_mut()
            .map(|light| light.update_cache_item())
            .filter(|updated| *updated)
            .count()
    }

    /// Re-packs every material whose parameters changed since the last frame.
    pub fn refresh_material_cache_items(&mut self) -> usize {
        self.materials
            .values_mut()
            .map(|material| material.update_cache_item())
            .filter(|updated| *updated)
            .count()
    }
}
