// scene/scene.rs
use super::camera::Camera;
use super::light::{Light, LightId};
use super::material::{Material, MaterialId};
use super::mesh::{Instance, InstanceId, Mesh, MeshId};
use super::texture::{TextureData, TextureId};

/// A shape attached to the scene: either a mesh drawn in place or an instance
/// placing a mesh under a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeId {
    Mesh(MeshId),
    Instance(InstanceId),
}

/// Retained, mutable scene graph. Resources live in arenas and are referred
/// to by creation-order ids; the shape attachment list preserves attach
/// order. The compiler reads this model, it never mutates it.
#[derive(Debug, Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
    instances: Vec<Instance>,
    materials: Vec<Material>,
    textures: Vec<TextureData>,
    lights: Vec<Light>,
    shapes: Vec<ShapeId>,
    camera: Camera,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let id = MeshId(self.meshes.len() as u32);
        self.meshes.push(mesh);
        id
    }

    pub fn add_instance(&mut self, instance: Instance) -> InstanceId {
        let id = InstanceId(self.instances.len() as u32);
        self.instances.push(instance);
        id
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(material);
        id
    }

    pub fn add_texture(&mut self, texture: TextureData) -> TextureId {
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(texture);
        id
    }

    pub fn attach_shape(&mut self, shape: ShapeId) {
        if !self.shapes.contains(&shape) {
            self.shapes.push(shape);
        }
    }

    pub fn detach_shape(&mut self, shape: ShapeId) {
        self.shapes.retain(|s| *s != shape);
    }

    pub fn attach_light(&mut self, light: Light) -> LightId {
        let id = LightId(self.lights.len() as u32);
        self.lights.push(light);
        id
    }

    pub fn shapes(&self) -> &[ShapeId] {
        &self.shapes
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn mesh(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.index()]
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> &mut Mesh {
        &mut self.meshes[id.index()]
    }

    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id.index()]
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.index()]
    }

    pub fn texture(&self, id: TextureId) -> &TextureData {
        &self.textures[id.index()]
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Material effectively bound to a shape (instance override wins).
    pub fn shape_material(&self, shape: ShapeId) -> Option<MaterialId> {
        match shape {
            ShapeId::Mesh(id) => self.mesh(id).material,
            ShapeId::Instance(id) => {
                let instance = self.instance(id);
                instance.material.or(self.mesh(instance.mesh).material)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_is_idempotent_and_ordered() {
        let mut scene = Scene::new();
        let a = scene.add_mesh(Mesh::new("a"));
        let b = scene.add_mesh(Mesh::new("b"));
        scene.attach_shape(ShapeId::Mesh(b));
        scene.attach_shape(ShapeId::Mesh(a));
        scene.attach_shape(ShapeId::Mesh(b));
        assert_eq!(scene.shapes(), &[ShapeId::Mesh(b), ShapeId::Mesh(a)]);
    }

    #[test]
    fn instance_material_override_wins() {
        let mut scene = Scene::new();
        let m0 = scene.add_material(Material::default_lambert("m0"));
        let m1 = scene.add_material(Material::default_lambert("m1"));
        let mut mesh = Mesh::new("mesh");
        mesh.material = Some(m0);
        let mesh = scene.add_mesh(mesh);
        let inst = scene.add_instance(Instance {
            mesh,
            transform: glam::Mat4::IDENTITY,
            material: Some(m1),
        });
        assert_eq!(scene.shape_material(ShapeId::Mesh(mesh)), Some(m0));
        assert_eq!(scene.shape_material(ShapeId::Instance(inst)), Some(m1));
    }
}
