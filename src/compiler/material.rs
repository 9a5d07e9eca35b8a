// compiler/material.rs
//
// Flattens the polymorphic material graph into the fixed-layout records the
// geometry pass consumes: a diffuse channel and a gloss channel, each a
// constant color or a texture index, plus roughness and ior scalars.
use crate::compiler::collector::Collector;
use crate::error::Result;
use crate::scene::{Bxdf, MaterialId, MaterialInput, MicrofacetKind, Scene, TextureId};

/// GPU-facing material record. A texture index of -1 means "no texture, use
/// the constant color"; when the index is set the color field is unspecified
/// and must be ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialRecord {
    pub diffuse_color: [f32; 4],
    pub diffuse_texture_idx: i32,
    pub gloss_color: [f32; 4],
    pub gloss_texture_idx: i32,
    pub diffuse_roughness: f32,
    pub gloss_roughness: f32,
    pub ior: f32,
}

impl Default for MaterialRecord {
    fn default() -> Self {
        Self {
            diffuse_color: [0.0; 4],
            diffuse_texture_idx: -1,
            gloss_color: [0.0; 4],
            gloss_texture_idx: -1,
            diffuse_roughness: 0.0,
            gloss_roughness: 0.0,
            ior: 0.0,
        }
    }
}

/// Resolve a constant-or-texture input into (color, texture index).
fn resolve_input(
    input: MaterialInput,
    textures: &Collector<TextureId>,
) -> Result<([f32; 4], i32)> {
    match input {
        MaterialInput::Constant(c) => Ok((c.to_array(), -1)),
        MaterialInput::Texture(id) => Ok(([0.0; 4], textures.lookup(id)? as i32)),
    }
}

/// GGX takes its roughness from the input's x component when constant; any
/// other microfacet kind gets the fixed fallback.
fn gloss_roughness_for(kind: MicrofacetKind, roughness: MaterialInput) -> f32 {
    match kind {
        MicrofacetKind::Ggx => match roughness {
            MaterialInput::Constant(c) => c.x,
            MaterialInput::Texture(_) => 0.0,
        },
        MicrofacetKind::Beckmann => 0.01,
    }
}

fn flatten_one(
    scene: &Scene,
    id: MaterialId,
    textures: &Collector<TextureId>,
) -> Result<MaterialRecord> {
    let mut record = MaterialRecord::default();

    match &scene.material(id).bxdf {
        Bxdf::Lambert { albedo } => {
            let (color, tex) = resolve_input(*albedo, textures)?;
            record.diffuse_color = color;
            record.diffuse_texture_idx = tex;
            record.ior = 0.0;
        }
        Bxdf::Microfacet {
            kind,
            albedo,
            roughness,
        } => {
            let (color, tex) = resolve_input(*albedo, textures)?;
            record.gloss_color = color;
            record.gloss_texture_idx = tex;
            record.diffuse_texture_idx = -1;
            record.gloss_roughness = gloss_roughness_for(*kind, *roughness);
            record.ior = 1.0;
        }
        Bxdf::FresnelBlend { top, base, ior } => {
            if let Some(albedo) = albedo_of(scene, *base) {
                let (color, tex) = resolve_input(albedo, textures)?;
                record.diffuse_color = color;
                record.diffuse_texture_idx = tex;
            } else {
                log::warn!(
                    "material '{}': blend base is itself a blend, diffuse channel left unset",
                    scene.material(id).name
                );
            }

            match &scene.material(*top).bxdf {
                Bxdf::Lambert { albedo } => {
                    let (color, tex) = resolve_input(*albedo, textures)?;
                    record.gloss_color = color;
                    record.gloss_texture_idx = tex;
                    record.gloss_roughness = 0.01;
                }
                Bxdf::Microfacet {
                    kind,
                    albedo,
                    roughness,
                } => {
                    let (color, tex) = resolve_input(*albedo, textures)?;
                    record.gloss_color = color;
                    record.gloss_texture_idx = tex;
                    record.gloss_roughness = gloss_roughness_for(*kind, *roughness);
                }
                Bxdf::FresnelBlend { .. } => {
                    log::warn!(
                        "material '{}': blend top is itself a blend, gloss channel left unset",
                        scene.material(id).name
                    );
                }
            }

            record.ior = match ior {
                MaterialInput::Constant(c) => c.x,
                MaterialInput::Texture(_) => {
                    log::warn!(
                        "material '{}': textured ior is not supported, using 0",
                        scene.material(id).name
                    );
                    0.0
                }
            };
            record.diffuse_roughness = 0.0;
        }
    }

    Ok(record)
}

fn albedo_of(scene: &Scene, id: MaterialId) -> Option<MaterialInput> {
    match &scene.material(id).bxdf {
        Bxdf::Lambert { albedo } | Bxdf::Microfacet { albedo, .. } => Some(*albedo),
        Bxdf::FresnelBlend { .. } => None,
    }
}

/// Emit one record per collected material, in collector iteration order, so
/// array position i equals collector index i. Batches reference materials
/// purely by this index.
pub fn flatten_materials(
    scene: &Scene,
    materials: &Collector<MaterialId>,
    textures: &Collector<TextureId>,
) -> Result<Vec<MaterialRecord>> {
    materials
        .iter()
        .map(|id| flatten_one(scene, id, textures))
        .collect()
}

/// Register every texture a material's inputs can reach, one blend level deep,
/// in a deterministic input order.
pub fn collect_material_textures(
    scene: &Scene,
    id: MaterialId,
    textures: &mut Collector<TextureId>,
) {
    match &scene.material(id).bxdf {
        Bxdf::Lambert { albedo } => {
            if let Some(tex) = albedo.texture() {
                textures.register(tex);
            }
        }
        Bxdf::Microfacet {
            albedo, roughness, ..
        } => {
            if let Some(tex) = albedo.texture() {
                textures.register(tex);
            }
            if let Some(tex) = roughness.texture() {
                textures.register(tex);
            }
        }
        Bxdf::FresnelBlend { top, base, ior } => {
            for nested in [*base, *top] {
                if !matches!(scene.material(nested).bxdf, Bxdf::FresnelBlend { .. }) {
                    collect_material_textures(scene, nested, textures);
                }
            }
            if let Some(tex) = ior.texture() {
                textures.register(tex);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, TextureData};
    use glam::Vec4;

    fn texture_collector_for(scene: &Scene, materials: &Collector<MaterialId>) -> Collector<TextureId> {
        let mut textures = Collector::new();
        for id in materials.iter() {
            collect_material_textures(scene, id, &mut textures);
        }
        textures
    }

    #[test]
    fn lambert_constant_albedo() {
        let mut scene = Scene::new();
        let id = scene.add_material(Material::new(
            "red",
            Bxdf::Lambert {
                albedo: MaterialInput::Constant(Vec4::new(1.0, 0.0, 0.0, 1.0)),
            },
        ));
        let mut materials = Collector::new();
        materials.register(id);
        let textures = texture_collector_for(&scene, &materials);

        let records = flatten_materials(&scene, &materials, &textures).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].diffuse_color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(records[0].diffuse_texture_idx, -1);
        assert_eq!(records[0].ior, 0.0);
        assert_eq!(records[0].gloss_texture_idx, -1);
    }

    #[test]
    fn microfacet_ggx_uses_roughness_x() {
        let mut scene = Scene::new();
        let id = scene.add_material(Material::new(
            "metal",
            Bxdf::Microfacet {
                kind: MicrofacetKind::Ggx,
                albedo: MaterialInput::Constant(Vec4::splat(0.9)),
                roughness: MaterialInput::Constant(Vec4::new(0.35, 0.0, 0.0, 0.0)),
            },
        ));
        let mut materials = Collector::new();
        materials.register(id);
        let textures = texture_collector_for(&scene, &materials);

        let record = flatten_materials(&scene, &materials, &textures).unwrap()[0];
        assert_eq!(record.gloss_color, [0.9; 4]);
        assert_eq!(record.gloss_roughness, 0.35);
        assert_eq!(record.diffuse_texture_idx, -1);
        assert_eq!(record.ior, 1.0);
    }

    #[test]
    fn beckmann_gets_fixed_roughness() {
        let mut scene = Scene::new();
        let id = scene.add_material(Material::new(
            "brushed",
            Bxdf::Microfacet {
                kind: MicrofacetKind::Beckmann,
                albedo: MaterialInput::Constant(Vec4::ONE),
                roughness: MaterialInput::Constant(Vec4::splat(0.5)),
            },
        ));
        let mut materials = Collector::new();
        materials.register(id);
        let textures = texture_collector_for(&scene, &materials);

        let record = flatten_materials(&scene, &materials, &textures).unwrap()[0];
        assert_eq!(record.gloss_roughness, 0.01);
        assert_eq!(record.diffuse_roughness, 0.0);
    }

    #[test]
    fn fresnel_blend_combines_channels() {
        let mut scene = Scene::new();
        let tex = scene.add_texture(TextureData::from_rgba8(1, 1, vec![255; 4]));
        let base = scene.add_material(Material::new(
            "base",
            Bxdf::Lambert {
                albedo: MaterialInput::Texture(tex),
            },
        ));
        let top = scene.add_material(Material::new(
            "top",
            Bxdf::Microfacet {
                kind: MicrofacetKind::Ggx,
                albedo: MaterialInput::Constant(Vec4::ONE),
                roughness: MaterialInput::Constant(Vec4::new(0.2, 0.0, 0.0, 0.0)),
            },
        ));
        let blend = scene.add_material(Material::new(
            "coated",
            Bxdf::FresnelBlend {
                top,
                base,
                ior: MaterialInput::Constant(Vec4::new(1.5, 0.0, 0.0, 0.0)),
            },
        ));

        let mut materials = Collector::new();
        materials.register(blend);
        let textures = texture_collector_for(&scene, &materials);

        let record = flatten_materials(&scene, &materials, &textures).unwrap()[0];
        assert_eq!(
            record.diffuse_texture_idx,
            textures.lookup(tex).unwrap() as i32
        );
        assert_eq!(record.gloss_roughness, 0.2);
        assert_eq!(record.ior, 1.5);
    }

    #[test]
    fn records_follow_collector_order() {
        let mut scene = Scene::new();
        let ids: Vec<_> = (0..4)
            .map(|i| {
                scene.add_material(Material::new(
                    format!("m{i}"),
                    Bxdf::Lambert {
                        albedo: MaterialInput::Constant(Vec4::splat(i as f32)),
                    },
                ))
            })
            .collect();

        let mut materials = Collector::new();
        // register out of creation order; records must follow registration order
        for &id in [ids[2], ids[0], ids[3], ids[1]].iter() {
            materials.register(id);
        }
        let textures = Collector::new();

        let records = flatten_materials(&scene, &materials, &textures).unwrap();
        assert_eq!(records[0].diffuse_color, [2.0; 4]);
        assert_eq!(records[1].diffuse_color, [0.0; 4]);
        assert_eq!(records[2].diffuse_color, [3.0; 4]);
        assert_eq!(records[3].diffuse_color, [1.0; 4]);
    }
}
