//! End-to-end frame rendering tests. These need a working GPU adapter, so
//! they are ignored by default; run with `cargo test -- --ignored`.
use glam::Vec4;
use glimpse::compiler::SceneCompiler;
use glimpse::renderer::{FrameRenderer, GpuContext, RenderTarget};
use glimpse::scene::{
    Bxdf, Light, Material, MaterialInput, Mesh, Scene, ShapeId, TextureData,
};
use glimpse::Error;

const SIZE: u32 = 64;

fn gpu() -> GpuContext {
    glimpse::init_logging();
    GpuContext::new_blocking().expect("adapter and device")
}

fn pixel(pixels: &[f32], x: u32, y: u32) -> [f32; 4] {
    let i = ((y * SIZE + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

fn red_triangle_scene() -> Scene {
    let mut scene = Scene::new();
    let material = scene.add_material(Material::new(
        "red",
        Bxdf::Lambert {
            albedo: MaterialInput::Constant(Vec4::new(1.0, 0.0, 0.0, 1.0)),
        },
    ));
    let mut mesh = Mesh::new("triangle");
    mesh.vertices = vec![[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]];
    mesh.normals = vec![[0.0, 0.0, 1.0]; 3];
    mesh.uvs = vec![[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
    mesh.indices = vec![0, 1, 2];
    mesh.material = Some(material);
    let id = scene.add_mesh(mesh);
    scene.attach_shape(ShapeId::Mesh(id));
    scene
}

#[test]
#[ignore]
fn frame_clears_and_draws_geometry() {
    let ctx = gpu();
    let scene = red_triangle_scene();
    let mut renderer = FrameRenderer::new(&ctx);
    let target = RenderTarget::new(&ctx.device, SIZE, SIZE).unwrap();

    renderer.render(&ctx, &scene, &target).unwrap();
    let pixels = target.read_back(&ctx.device, &ctx.queue).unwrap();
    assert_eq!(pixels.len(), (SIZE * SIZE * 4) as usize);

    // Top-left corner is outside the triangle: clear color.
    let corner = pixel(&pixels, 1, 1);
    for channel in &corner[..3] {
        assert!((channel - 0.1).abs() < 0.01, "corner = {corner:?}");
    }

    // Screen center is covered by the red lambert triangle.
    let center = pixel(&pixels, SIZE / 2, SIZE / 2);
    assert!(center[0] > 0.2, "center = {center:?}");
    assert!(center[1] < 0.05, "center = {center:?}");
}

#[test]
#[ignore]
fn recompiling_an_unmodified_scene_keeps_batches() {
    let ctx = gpu();
    let scene = red_triangle_scene();
    let mut renderer = FrameRenderer::new(&ctx);
    let target = RenderTarget::new(&ctx.device, SIZE, SIZE).unwrap();

    renderer.render(&ctx, &scene, &target).unwrap();
    let first: Vec<_> = renderer
        .compiled()
        .unwrap()
        .batches
        .iter()
        .map(|b| (b.material_idx, b.vertex_capacity, b.index_capacity))
        .collect();

    renderer.render(&ctx, &scene, &target).unwrap();
    let second: Vec<_> = renderer
        .compiled()
        .unwrap()
        .batches
        .iter()
        .map(|b| (b.material_idx, b.vertex_capacity, b.index_capacity))
        .collect();

    assert_eq!(first, second);
}

#[test]
#[ignore]
fn failed_rebuild_keeps_the_previous_cache() {
    let ctx = gpu();
    let mut scene = red_triangle_scene();
    let mut compiler = SceneCompiler::new();
    compiler
        .compile(&ctx.device, &ctx.queue, &scene, ctx.float32_filterable)
        .unwrap();
    let batches_before: Vec<_> = compiler
        .cache()
        .unwrap()
        .batches
        .iter()
        .map(|b| (b.material_idx, b.vertex_capacity, b.index_capacity))
        .collect();
    let materials_before = compiler.cache().unwrap().materials.clone();

    // Declared 2x2 rgba8 but only one texel of payload: the texture rebuild
    // fails before anything is swapped into the cache.
    let bad = scene.add_texture(TextureData::from_rgba8(2, 2, vec![0; 4]));
    scene.attach_light(Light::ImageBased {
        texture: bad,
        multiplier: 1.0,
    });

    let err = compiler
        .compile(&ctx.device, &ctx.queue, &scene, ctx.float32_filterable)
        .unwrap_err();
    assert!(matches!(err, Error::ResourceAllocation(_)), "err = {err}");

    // The previously good compile is still renderable, untouched.
    let cache = compiler.cache().unwrap();
    let batches_after: Vec<_> = cache
        .batches
        .iter()
        .map(|b| (b.material_idx, b.vertex_capacity, b.index_capacity))
        .collect();
    assert_eq!(batches_before, batches_after);
    assert_eq!(materials_before, cache.materials);
    assert_eq!(cache.ibl_texture_idx, -1);
}

#[test]
#[ignore]
fn background_pass_paints_the_environment() {
    let ctx = gpu();
    let mut scene = Scene::new();
    // Uniform green lat-long environment.
    let texels = [0.0f32, 1.0, 0.0, 1.0].repeat(4);
    let env = scene.add_texture(TextureData::from_rgba32f(2, 2, &texels));
    scene.attach_light(Light::ImageBased {
        texture: env,
        multiplier: 2.0,
    });

    let mut renderer = FrameRenderer::new(&ctx);
    let target = RenderTarget::new(&ctx.device, SIZE, SIZE).unwrap();
    renderer.render(&ctx, &scene, &target).unwrap();

    let pixels = target.read_back(&ctx.device, &ctx.queue).unwrap();
    let center = pixel(&pixels, SIZE / 2, SIZE / 2);
    assert!((center[1] - 2.0).abs() < 0.05, "center = {center:?}");
    assert!(center[0] < 0.01, "center = {center:?}");
}

#[test]
#[ignore]
fn empty_scene_renders_only_the_clear_color() {
    let ctx = gpu();
    let scene = Scene::new();
    let mut renderer = FrameRenderer::new(&ctx);
    let target = RenderTarget::new(&ctx.device, SIZE, SIZE).unwrap();

    renderer.render(&ctx, &scene, &target).unwrap();
    assert_eq!(renderer.compiled().unwrap().ibl_texture_idx, -1);

    let pixels = target.read_back(&ctx.device, &ctx.queue).unwrap();
    let center = pixel(&pixels, SIZE / 2, SIZE / 2);
    for channel in &center[..3] {
        assert!((channel - 0.1).abs() < 0.01, "center = {center:?}");
    }
}

#[test]
fn zero_sized_target_is_rejected() {
    // No pass can bind an empty attachment; creation fails up front.
    let ctx = match GpuContext::new_blocking() {
        Ok(ctx) => ctx,
        Err(_) => return,
    };
    assert!(RenderTarget::new(&ctx.device, 0, SIZE).is_err());
    assert!(RenderTarget::new(&ctx.device, SIZE, 0).is_err());
}
