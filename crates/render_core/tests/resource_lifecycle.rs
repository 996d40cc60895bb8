//! Resource acquisition, sharing and sweeping across the manager and the
//! scene graph

use std::rc::Rc;

use render_core::assets::{AssetError, CategorySweep, ResourceManager};
use render_core::core::AssetConfig;
use render_core::foundation::math::Vec3;
use render_core::render::{GraphicsDevice, HeadlessDevice};
use render_core::scene::{ModelNode, SceneGraph, SceneNode};
use tempfile::tempdir;

fn setup() -> (Rc<HeadlessDevice>, ResourceManager) {
    let device = Rc::new(HeadlessDevice::new());
    let shared: Rc<dyn GraphicsDevice> = device.clone();
    (device, ResourceManager::new(shared, AssetConfig::default()))
}

#[test]
fn shaders_requested_twice_are_swept_only_after_both_handles_go() {
    let (_, mut resources) = setup();

    let first = resources.get_shaders("a.vs", "b.fs");
    let second = resources.get_shaders("a.vs", "b.fs");
    assert!(first.ptr_eq(&second));
    assert_eq!(resources.program_count(), 1);

    drop(first);
    let report = resources.clear_unused();
    assert_eq!(report.programs.released, 0);
    assert_eq!(resources.program_count(), 1);

    drop(second);
    let report = resources.clear_unused();
    assert_eq!(report.programs, CategorySweep { released: 1, still_in_use: 0 });
    assert_eq!(resources.program_count(), 0);
}

#[test]
fn scene_nodes_keep_resources_resident() {
    let (device, mut resources) = setup();
    let mut scene = SceneGraph::new();
    let root = scene.root();

    let mut nodes = Vec::new();
    for x in 0..3 {
        let geometry = resources.get_model("tile").unwrap();
        let model = ModelNode::new(geometry, resources.get_default_material());
        let node = SceneNode::model(model).with_position(Vec3::new(x as f32, 0.0, 0.0));
        nodes.push(scene.add_child(root, node).unwrap());
    }

    let report = resources.clear_unused();
    assert_eq!(report.total_released(), 0);
    assert!(resources.is_tile_resident());

    for node in nodes {
        scene.destroy(node).unwrap();
    }
    let report = resources.clear_unused();
    assert_eq!(report.defaults_released, 2);
    assert_eq!(report.programs.released, 1);
    assert_eq!(report.shader_stages.released, 3);
    assert_eq!(report.total_still_in_use(), 0);
    assert_eq!(device.stats().live_programs(), 0);
}

#[test]
fn materials_share_programs_and_textures() {
    let dir = tempdir().unwrap();
    let texture = dir.path().join("stone.png");
    image::RgbaImage::from_pixel(4, 4, image::Rgba([128, 128, 128, 255]))
        .save(&texture)
        .unwrap();

    let write_material = |name: &str, diffuse: &str| {
        let path = dir.path().join(name);
        std::fs::write(
            &path,
            format!(
                "[color]\ndiffuse = {}\n\n[texture]\npath = \"{}\"\n",
                diffuse,
                texture.display()
            ),
        )
        .unwrap();
        path.to_string_lossy().into_owned()
    };
    let dark = write_material("dark.toml", "[0.1, 0.1, 0.1, 1.0]");
    let light = write_material("light.toml", "[0.9, 0.9, 0.9, 1.0]");

    let (device, mut resources) = setup();
    let a = resources.get_material(&dark).unwrap();
    let b = resources.get_material(&light).unwrap();

    assert!(!a.ptr_eq(&b));
    assert!(a.shaders().ptr_eq(b.shaders()));
    assert_eq!(resources.material_count(), 2);
    assert_eq!(resources.program_count(), 1);
    assert_eq!(resources.texture_count(), 1);
    assert_eq!(device.stats().textures_created, 1);

    drop(a);
    let report = resources.clear_unused();
    assert_eq!(report.materials, CategorySweep { released: 1, still_in_use: 1 });
    assert_eq!(report.textures.released, 0);

    drop(b);
    let report = resources.clear_unused();
    assert_eq!(report.materials.released, 1);
    assert_eq!(report.textures.released, 1);
    assert_eq!(device.stats().live_textures(), 0);
}

#[test]
fn malformed_material_is_reported_and_not_cached() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[color]\ndiffuse = \"red\"\n").unwrap();

    let (_, mut resources) = setup();
    let result = resources.get_material(&path.to_string_lossy());
    assert!(matches!(result, Err(AssetError::InvalidData(_))));
    assert_eq!(resources.material_count(), 0);
}
