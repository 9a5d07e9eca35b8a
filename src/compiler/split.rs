// compiler/split.rs
use std::collections::BTreeSet;

use crate::scene::{InstanceId, MeshId, Scene, ShapeId};

/// Scene shapes partitioned for compilation. All three lists are in ascending
/// creation-id order so downstream batch layout is reproducible run to run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ShapeSplit {
    /// Meshes directly attached to the scene (included even when also
    /// referenced by an instance).
    pub meshes: Vec<MeshId>,
    pub instances: Vec<InstanceId>,
    /// Meshes reachable only through an instance's mesh reference.
    pub excluded_meshes: Vec<MeshId>,
}

pub fn split_shapes(scene: &Scene) -> ShapeSplit {
    let mut meshes = BTreeSet::new();
    let mut instances = BTreeSet::new();

    for &shape in scene.shapes() {
        match shape {
            ShapeId::Mesh(id) => {
                meshes.insert(id);
            }
            ShapeId::Instance(id) => {
                instances.insert(id);
            }
        }
    }

    let mut excluded = BTreeSet::new();
    for &id in &instances {
        let referenced = scene.instance(id).mesh;
        if !meshes.contains(&referenced) {
            excluded.insert(referenced);
        }
    }

    ShapeSplit {
        meshes: meshes.into_iter().collect(),
        instances: instances.into_iter().collect(),
        excluded_meshes: excluded.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Instance, Mesh};
    use glam::Mat4;

    fn instance_of(mesh: MeshId) -> Instance {
        Instance {
            mesh,
            transform: Mat4::IDENTITY,
            material: None,
        }
    }

    #[test]
    fn classifies_meshes_instances_and_excluded() {
        let mut scene = Scene::new();
        let attached = scene.add_mesh(Mesh::new("attached"));
        let shared = scene.add_mesh(Mesh::new("shared"));
        let hidden = scene.add_mesh(Mesh::new("hidden"));

        scene.attach_shape(ShapeId::Mesh(attached));
        scene.attach_shape(ShapeId::Mesh(shared));
        let i0 = scene.add_instance(instance_of(shared));
        let i1 = scene.add_instance(instance_of(hidden));
        scene.attach_shape(ShapeId::Instance(i0));
        scene.attach_shape(ShapeId::Instance(i1));

        let split = split_shapes(&scene);
        // `shared` is attached directly, so it stays a mesh and is never excluded
        assert_eq!(split.meshes, vec![attached, shared]);
        assert_eq!(split.instances, vec![i0, i1]);
        assert_eq!(split.excluded_meshes, vec![hidden]);
    }

    #[test]
    fn order_is_by_creation_id_not_attach_order() {
        let mut scene = Scene::new();
        let a = scene.add_mesh(Mesh::new("a"));
        let b = scene.add_mesh(Mesh::new("b"));
        let c = scene.add_mesh(Mesh::new("c"));
        scene.attach_shape(ShapeId::Mesh(c));
        scene.attach_shape(ShapeId::Mesh(a));
        scene.attach_shape(ShapeId::Mesh(b));

        let split = split_shapes(&scene);
        assert_eq!(split.meshes, vec![a, b, c]);
    }
}
