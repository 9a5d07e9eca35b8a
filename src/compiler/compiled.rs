// compiler/compiled.rs
//
// The compiled scene cache and the controller that keeps it in sync with the
// CPU-side scene. Each subsystem (shapes, materials, textures, lights) is
// re-derived only when its collector bundle changed; every rebuild constructs
// the new data first and swaps it in afterwards, so a failed compile leaves
// the previous cache renderable.
use crate::compiler::batch::{stage_batches, upload_batches, BatchData};
use crate::compiler::collector::{Bundle, Collector};
use crate::compiler::material::{collect_material_textures, flatten_materials, MaterialRecord};
use crate::compiler::split::split_shapes;
use crate::compiler::texture::{upload_textures, GpuTexture};
use crate::error::Result;
use crate::scene::{Camera, Light, LightId, MaterialId, Scene, ShapeId, TextureId};

/// GPU-ready translation of the scene graph, owned by the frame renderer.
#[derive(Debug)]
pub struct CompiledScene {
    pub batches: Vec<BatchData>,
    pub materials: Vec<MaterialRecord>,
    pub textures: Vec<GpuTexture>,
    pub camera: Camera,
    /// Texture index of the image-based light, -1 when the scene has none.
    pub ibl_texture_idx: i32,
    pub ibl_multiplier: f32,

    shape_bundle: Bundle<ShapeId>,
    material_bundle: Bundle<MaterialId>,
    texture_bundle: Bundle<TextureId>,
    light_bundle: Bundle<LightId>,
}

impl CompiledScene {
    pub fn material_record(&self, material_idx: i32) -> MaterialRecord {
        usize::try_from(material_idx)
            .ok()
            .and_then(|i| self.materials.get(i).copied())
            .unwrap_or_default()
    }
}

/// One compile's worth of resource registrations, rebuilt from scratch per
/// compile call in deterministic scene order.
struct SceneResources {
    shapes: Collector<ShapeId>,
    materials: Collector<MaterialId>,
    textures: Collector<TextureId>,
    lights: Collector<LightId>,
}

fn collect_resources(scene: &Scene) -> SceneResources {
    let mut shapes = Collector::new();
    let mut materials = Collector::new();
    for &shape in scene.shapes() {
        shapes.register(shape);
        if let Some(material) = scene.shape_material(shape) {
            materials.register(material);
        }
    }

    let mut textures = Collector::new();
    for material in materials.iter() {
        collect_material_textures(scene, material, &mut textures);
    }

    let mut lights = Collector::new();
    for (i, light) in scene.lights().iter().enumerate() {
        lights.register(LightId(i as u32));
        if let Light::ImageBased { texture, .. } = light {
            textures.register(*texture);
        }
    }

    SceneResources {
        shapes,
        materials,
        textures,
        lights,
    }
}

/// Translates scene changes into cache rebuilds. Owns the cache exclusively;
/// single-threaded by construction.
#[derive(Default)]
pub struct SceneCompiler {
    cache: Option<CompiledScene>,
}

impl SceneCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> Option<&CompiledScene> {
        self.cache.as_ref()
    }

    /// Reconcile every dirty subsystem and return the up-to-date cache.
    pub fn compile(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Scene,
        float32_filterable: bool,
    ) -> Result<&CompiledScene> {
        let resources = collect_resources(scene);

        let shape_bundle = resources.shapes.bundle();
        let material_bundle = resources.materials.bundle();
        let texture_bundle = resources.textures.bundle();
        let light_bundle = resources.lights.bundle();

        let (shapes_dirty, materials_dirty, textures_dirty, lights_dirty) = match &self.cache {
            None => (true, true, true, true),
            Some(cache) => (
                cache.shape_bundle != shape_bundle,
                cache.material_bundle != material_bundle,
                cache.texture_bundle != texture_bundle,
                cache.light_bundle != light_bundle,
            ),
        };

        // Build every replacement part before touching the cache.
        let new_batches = if shapes_dirty {
            log::info!("shape set changed, rebuilding batches");
            let split = split_shapes(scene);
            let staged = stage_batches(scene, &split.meshes, &resources.materials)?;
            Some(upload_batches(device, &staged)?)
        } else {
            None
        };

        let new_textures = if textures_dirty {
            log::info!("texture set changed, rebuilding texture array");
            Some(upload_textures(
                device,
                queue,
                scene,
                &resources.textures,
                float32_filterable,
            )?)
        } else {
            None
        };

        // Records embed texture indices, so a texture-set change invalidates
        // them even when the material set itself is unchanged.
        let new_materials = if materials_dirty || textures_dirty {
            Some(flatten_materials(
                scene,
                &resources.materials,
                &resources.textures,
            )?)
        } else {
            None
        };

        let new_ibl = if lights_dirty || textures_dirty {
            let mut ibl = (-1i32, 1.0f32);
            for light in scene.lights() {
                if let Light::ImageBased {
                    texture,
                    multiplier,
                } = light
                {
                    ibl = (resources.textures.lookup(*texture)? as i32, *multiplier);
                }
            }
            Some(ibl)
        } else {
            None
        };

        // Swap: move unchanged parts out of the old cache, drop the rest.
        // Every fallible step is behind us, so from here the old cache can
        // be consumed safely. On the first compile every subsystem was
        // marked dirty, so the empty fallbacks are never reached.
        let (old_batches, old_materials, old_textures, old_ibl) = match self.cache.take() {
            Some(cache) => (
                Some(cache.batches),
                Some(cache.materials),
                Some(cache.textures),
                Some((cache.ibl_texture_idx, cache.ibl_multiplier)),
            ),
            None => (None, None, None, None),
        };

        let (ibl_texture_idx, ibl_multiplier) = new_ibl.or(old_ibl).unwrap_or((-1, 1.0));

        Ok(self.cache.insert(CompiledScene {
            batches: new_batches.or(old_batches).unwrap_or_default(),
            materials: new_materials.or(old_materials).unwrap_or_default(),
            textures: new_textures.or(old_textures).unwrap_or_default(),
            camera: *scene.camera(),
            ibl_texture_idx,
            ibl_multiplier,
            shape_bundle,
            material_bundle,
            texture_bundle,
            light_bundle,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Bxdf, Material, MaterialInput, Mesh, TextureData};

    fn textured_material(scene: &mut Scene, name: &str) -> (MaterialId, TextureId) {
        let tex = scene.add_texture(TextureData::from_rgba8(1, 1, vec![0; 4]));
        let mat = scene.add_material(Material::new(
            name,
            Bxdf::Lambert {
                albedo: MaterialInput::Texture(tex),
            },
        ));
        (mat, tex)
    }

    #[test]
    fn resources_are_deduplicated_and_ordered() {
        let mut scene = Scene::new();
        let (mat, tex) = textured_material(&mut scene, "m");
        for i in 0..3 {
            let mut mesh = Mesh::new(format!("mesh{i}"));
            mesh.material = Some(mat);
            let id = scene.add_mesh(mesh);
            scene.attach_shape(ShapeId::Mesh(id));
        }

        let resources = collect_resources(&scene);
        assert_eq!(resources.shapes.len(), 3);
        assert_eq!(resources.materials.len(), 1);
        assert_eq!(resources.textures.len(), 1);
        assert_eq!(resources.textures.lookup(tex).unwrap(), 0);
    }

    #[test]
    fn ibl_texture_is_collected_from_lights() {
        let mut scene = Scene::new();
        let env = scene.add_texture(TextureData::from_rgba32f(1, 1, &[0.0; 4]));
        scene.attach_light(Light::ImageBased {
            texture: env,
            multiplier: 2.0,
        });

        let resources = collect_resources(&scene);
        assert_eq!(resources.lights.len(), 1);
        assert!(resources.textures.lookup(env).is_ok());
    }

    #[test]
    fn bundles_change_only_with_their_subsystem() {
        let mut scene = Scene::new();
        let (mat, _) = textured_material(&mut scene, "m");
        let mut mesh = Mesh::new("mesh");
        mesh.material = Some(mat);
        let id = scene.add_mesh(mesh);
        scene.attach_shape(ShapeId::Mesh(id));

        let before = collect_resources(&scene);

        scene.attach_light(Light::Directional {
            direction: glam::Vec3::NEG_Y,
            radiance: glam::Vec3::ONE,
        });
        let after = collect_resources(&scene);

        assert_eq!(before.shapes.bundle(), after.shapes.bundle());
        assert_eq!(before.materials.bundle(), after.materials.bundle());
        assert_eq!(before.textures.bundle(), after.textures.bundle());
        assert_ne!(before.lights.bundle(), after.lights.bundle());
    }

    #[test]
    fn detaching_a_shape_dirties_only_the_shape_bundle() {
        let mut scene = Scene::new();
        let (mat, _) = textured_material(&mut scene, "m");
        let mut ids = Vec::new();
        for name in ["a", "b"] {
            let mut mesh = Mesh::new(name);
            mesh.material = Some(mat);
            let id = scene.add_mesh(mesh);
            scene.attach_shape(ShapeId::Mesh(id));
            ids.push(id);
        }

        let before = collect_resources(&scene);
        scene.detach_shape(ShapeId::Mesh(ids[1]));
        let after = collect_resources(&scene);

        assert_ne!(before.shapes.bundle(), after.shapes.bundle());
        // The surviving mesh still references the material and its texture.
        assert_eq!(before.materials.bundle(), after.materials.bundle());
        assert_eq!(before.textures.bundle(), after.textures.bundle());
    }

    #[test]
    fn reassigning_a_mesh_material_dirties_the_material_bundle() {
        let mut scene = Scene::new();
        let m0 = scene.add_material(Material::default_lambert("m0"));
        let m1 = scene.add_material(Material::default_lambert("m1"));
        let mut mesh = Mesh::new("mesh");
        mesh.material = Some(m0);
        let id = scene.add_mesh(mesh);
        scene.attach_shape(ShapeId::Mesh(id));

        let before = collect_resources(&scene);
        scene.mesh_mut(id).material = Some(m1);
        let after = collect_resources(&scene);

        assert_eq!(before.shapes.bundle(), after.shapes.bundle());
        assert_ne!(before.materials.bundle(), after.materials.bundle());
    }

    #[test]
    fn material_record_lookup_defaults_for_sentinel() {
        let record = MaterialRecord {
            ior: 1.5,
            ..Default::default()
        };
        let cache = CompiledScene {
            batches: Vec::new(),
            materials: vec![record],
            textures: Vec::new(),
            camera: Camera::default(),
            ibl_texture_idx: -1,
            ibl_multiplier: 1.0,
            shape_bundle: Collector::<ShapeId>::new().bundle(),
            material_bundle: Collector::<MaterialId>::new().bundle(),
            texture_bundle: Collector::<TextureId>::new().bundle(),
            light_bundle: Collector::<LightId>::new().bundle(),
        };
        assert_eq!(cache.material_record(0).ior, 1.5);
        assert_eq!(cache.material_record(-1), MaterialRecord::default());
        assert_eq!(cache.material_record(7), MaterialRecord::default());
    }

    #[test]
    fn last_image_based_light_wins() {
        let mut scene = Scene::new();
        let t0 = scene.add_texture(TextureData::from_rgba8(1, 1, vec![0; 4]));
        let t1 = scene.add_texture(TextureData::from_rgba8(1, 1, vec![255; 4]));
        scene.attach_light(Light::ImageBased {
            texture: t0,
            multiplier: 1.0,
        });
        scene.attach_light(Light::ImageBased {
            texture: t1,
            multiplier: 3.0,
        });

        let resources = collect_resources(&scene);
        let mut ibl = (-1i32, 1.0f32);
        for light in scene.lights() {
            if let Light::ImageBased {
                texture,
                multiplier,
            } = light
            {
                ibl = (resources.textures.lookup(*texture).unwrap() as i32, *multiplier);
            }
        }
        assert_eq!(ibl, (resources.textures.lookup(t1).unwrap() as i32, 3.0));
    }
}
