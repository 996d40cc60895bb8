//! Scene viewer demo
//!
//! Builds a small scene of tiles on a headless device, orbits the camera
//! around it for a fixed number of frames and sweeps unused resources on the
//! configured schedule.
//!
//! Usage: `scene_viewer [config.toml|config.ron]`

use std::rc::Rc;

use render_core::assets::{AssetError, ResourceManager};
use render_core::core::{ApplicationConfig, Config, ConfigError};
use render_core::foundation::logging;
use render_core::foundation::math::{utils, Vec3};
use render_core::render::{GraphicsDevice, HeadlessDevice, RenderingContext};
use render_core::scene::{ModelNode, NodeId, SceneError, SceneGraph, SceneNode};

const DEFAULT_CONFIG_PATH: &str = "scene_viewer.toml";
const FRAME_COUNT: u64 = 900;
const ORBIT_RADIUS: f32 = 8.0;

#[derive(Debug, thiserror::Error)]
enum ViewerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

struct SceneViewer {
    config: ApplicationConfig,
    device: Rc<HeadlessDevice>,
    resources: ResourceManager,
    ctx: RenderingContext,
    scene: SceneGraph,
    spinner: NodeId,
    marker: NodeId,
}

impl SceneViewer {
    fn new(config: ApplicationConfig) -> Result<Self, ViewerError> {
        log::info!("Creating scene viewer...");
        let device = Rc::new(HeadlessDevice::new());
        let shared: Rc<dyn GraphicsDevice> = device.clone();

        let mut resources = ResourceManager::new(Rc::clone(&shared), config.assets.clone());
        let ctx = RenderingContext::new(shared, config.renderer.clone());
        let mut scene = SceneGraph::new();
        let root = scene.root();

        // Floor: a 5x5 grid of tiles laid flat
        let floor = scene.add_child(
            root,
            SceneNode::group()
                .with_name("floor")
                .with_rotation(Vec3::new(-90.0, 0.0, 0.0)),
        )?;
        for row in -2..=2 {
            for column in -2..=2 {
                let geometry = resources.get_model("tile")?;
                let model = ModelNode::new(geometry, resources.get_default_material())
                    .with_depth_material(resources.get_default_depth_map_material());
                let position = Vec3::new(column as f32 * 2.0, row as f32 * 2.0, 0.0);
                scene.add_child(floor, SceneNode::model(model).with_position(position))?;
            }
        }

        // Spinning pair of tiles above the floor
        let spinner = scene.add_child(
            root,
            SceneNode::group()
                .with_name("spinner")
                .with_position(Vec3::new(0.0, 2.0, 0.0)),
        )?;
        for offset in [-1.5_f32, 1.5] {
            let geometry = resources.get_model("tile")?;
            let model = ModelNode::new(geometry, resources.get_default_material());
            scene.add_child(
                spinner,
                SceneNode::model(model)
                    .with_position(Vec3::new(offset, 0.0, 0.0))
                    .with_scale(Vec3::new(0.5, 0.5, 0.5)),
            )?;
        }

        // Marker drawn over everything, tracking the spinner
        let geometry = resources.get_model("tile")?;
        let overlay = ModelNode::new(geometry, resources.get_default_material());
        let marker = scene.add_child(
            spinner,
            SceneNode::overlay(overlay)
                .with_name("marker")
                .with_position(Vec3::new(0.0, 1.5, 0.0))
                .with_scale(Vec3::new(0.2, 0.2, 0.2)),
        )?;

        log::info!(
            "Scene built: {} nodes, {} programs, {} shader objects",
            scene.len(),
            resources.program_count(),
            resources.shader_stage_count()
        );

        Ok(Self {
            config,
            device,
            resources,
            ctx,
            scene,
            spinner,
            marker,
        })
    }

    fn frame(&mut self, frame: u64) -> Result<(), ViewerError> {
        let angle = frame as f32;
        self.scene.set_rotation(self.spinner, Vec3::new(0.0, angle, 0.0))?;

        let orbit = utils::deg_to_rad(angle * 0.25);
        let eye = Vec3::new(orbit.sin() * ORBIT_RADIUS, 4.0, orbit.cos() * ORBIT_RADIUS);
        self.ctx.set_camera_target_node(eye, &self.scene, self.spinner)?;

        // The marker blinks once a second
        self.scene.set_visibility(self.marker, (frame / 60) % 2 == 0)?;

        self.scene.depth_render(&mut self.ctx);
        self.scene.render(&mut self.ctx);

        if self.config.engine.should_sweep(frame) {
            self.resources.clear_unused();
        }
        Ok(())
    }

    fn run(&mut self, frames: u64) -> Result<(), ViewerError> {
        let (width, height) = self.ctx.viewport();
        log::info!("Rendering {} frames at {}x{}", frames, width, height);

        for frame in 1..=frames {
            self.frame(frame)?;
        }

        let marker_position = self.scene.world_position(self.marker)?;
        log::info!("Marker ended at {:?}", marker_position);
        Ok(())
    }

    fn shutdown(self) {
        let Self {
            device,
            resources,
            scene,
            ..
        } = self;

        log::info!("Shutting down...");
        drop(scene);
        let report = resources.shutdown();
        log::info!("Final sweep released {} resources", report.total_released());

        let stats = device.stats();
        log::info!(
            "Device: {} draw calls, {} programs linked ({} live), {} shaders compiled ({} live)",
            stats.draw_calls,
            stats.programs_linked,
            stats.live_programs(),
            stats.shaders_compiled,
            stats.live_shaders()
        );
    }
}

fn load_config() -> Result<ApplicationConfig, ViewerError> {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = ApplicationConfig::load_or_default(&path)?;
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), ViewerError> {
    let config = load_config()?;
    logging::init_with_filter(&config.engine.log_level);

    let mut viewer = SceneViewer::new(config)?;
    viewer.run(FRAME_COUNT)?;
    viewer.shutdown();
    Ok(())
}
