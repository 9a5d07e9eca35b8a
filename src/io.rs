// io.rs
//
// Binary scene file format, little-endian throughout:
//   u32 mesh count
//   per mesh: u32 index/vertex/normal/uv counts, then the raw u32 index
//   array, f32x3 vertex array, f32x3 normal array, f32x2 uv array, then a
//   u32-length-prefixed material name.
// Materials are deduplicated by name on load; every named material becomes
// the same gray Lambert placeholder.
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::scene::{Material, MaterialId, Mesh, Scene, ShapeId};

const UNNAMED_MATERIAL: &str = "default_material";

fn read_u32(reader: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f32(reader: &mut impl Read) -> Result<f32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_vec3s(reader: &mut impl Read, count: u32) -> Result<Vec<[f32; 3]>> {
    (0..count)
        .map(|_| Ok([read_f32(reader)?, read_f32(reader)?, read_f32(reader)?]))
        .collect()
}

fn read_vec2s(reader: &mut impl Read, count: u32) -> Result<Vec<[f32; 2]>> {
    (0..count)
        .map(|_| Ok([read_f32(reader)?, read_f32(reader)?]))
        .collect()
}

/// Load a scene from a binary file. The result contains only meshes and
/// their name-deduplicated placeholder materials; lights and camera are left
/// for the caller to set up.
pub fn load_scene(path: impl AsRef<Path>) -> Result<Scene> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut scene = Scene::new();
    let mut materials: HashMap<String, MaterialId> = HashMap::new();

    let num_meshes = read_u32(&mut reader)?;
    log::info!("loading {num_meshes} meshes");

    for i in 0..num_meshes {
        let num_indices = read_u32(&mut reader)?;
        let num_vertices = read_u32(&mut reader)?;
        let num_normals = read_u32(&mut reader)?;
        let num_uvs = read_u32(&mut reader)?;

        let indices = (0..num_indices)
            .map(|_| read_u32(&mut reader))
            .collect::<Result<Vec<u32>>>()?;
        let vertices = read_vec3s(&mut reader, num_vertices)?;
        let normals = read_vec3s(&mut reader, num_normals)?;
        let uvs = read_vec2s(&mut reader, num_uvs)?;

        let name_len = read_u32(&mut reader)?;
        let mut name_buf = vec![0u8; name_len as usize];
        reader.read_exact(&mut name_buf)?;
        let mut name = String::from_utf8_lossy(&name_buf).into_owned();
        if name.is_empty() {
            name = UNNAMED_MATERIAL.to_owned();
        }

        let material = match materials.get(&name) {
            Some(&id) => id,
            None => {
                let id = scene.add_material(Material::default_lambert(&name));
                materials.insert(name, id);
                id
            }
        };

        let mut mesh = Mesh::new(format!("mesh{i}"));
        mesh.indices = indices;
        mesh.vertices = vertices;
        mesh.normals = normals;
        mesh.uvs = uvs;
        mesh.material = Some(material);

        let id = scene.add_mesh(mesh);
        scene.attach_shape(ShapeId::Mesh(id));
    }

    Ok(scene)
}

fn write_u32(writer: &mut impl Write, value: u32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_f32s(writer: &mut impl Write, values: impl IntoIterator<Item = f32>) -> Result<()> {
    for value in values {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

/// Save the scene's attached meshes to a binary file. Instances have no
/// representation in the format and are rejected.
pub fn save_scene(scene: &Scene, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let mesh_ids: Vec<_> = scene
        .shapes()
        .iter()
        .map(|&shape| match shape {
            ShapeId::Mesh(id) => Ok(id),
            ShapeId::Instance(_) => Err(Error::UnsupportedVariant(
                "instances cannot be saved to the binary scene format".into(),
            )),
        })
        .collect::<Result<_>>()?;

    write_u32(&mut writer, mesh_ids.len() as u32)?;

    for id in mesh_ids {
        let mesh = scene.mesh(id);
        write_u32(&mut writer, mesh.indices.len() as u32)?;
        write_u32(&mut writer, mesh.vertices.len() as u32)?;
        write_u32(&mut writer, mesh.normals.len() as u32)?;
        write_u32(&mut writer, mesh.uvs.len() as u32)?;

        for &index in &mesh.indices {
            write_u32(&mut writer, index)?;
        }
        write_f32s(&mut writer, mesh.vertices.iter().flatten().copied())?;
        write_f32s(&mut writer, mesh.normals.iter().flatten().copied())?;
        write_f32s(&mut writer, mesh.uvs.iter().flatten().copied())?;

        let name = match mesh.material {
            Some(material) => {
                let name = scene.material(material).name.as_str();
                if name.is_empty() {
                    UNNAMED_MATERIAL
                } else {
                    name
                }
            }
            None => UNNAMED_MATERIAL,
        };
        write_u32(&mut writer, name.len() as u32)?;
        writer.write_all(name.as_bytes())?;
    }

    writer.flush()?;
    Ok(())
}
