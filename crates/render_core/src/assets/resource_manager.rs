//! Resource Manager - Keyed Caching of Shaders, Textures, Materials and Models
//!
//! The manager aggregates one [`ResourcePool`] per resource category plus a
//! few always-shared resources (built-in tile geometry, default material,
//! default depth-map material) that live in [`SharedSlot`]s instead of a
//! keyed pool.
//!
//! **OWNERSHIP**: the application constructs one manager next to its
//! graphics device and passes it to scene construction. Handles returned by
//! the `get_*` calls keep their resources resident; nothing is destroyed
//! until [`ResourceManager::clear_unused`] sweeps entries nobody references.
//!
//! **FAILURE MODES**:
//! - Shader compile/link failures are soft: the returned program is an
//!   unlinked placeholder and the failure is logged.
//! - Missing image or material files, malformed material descriptions and
//!   unknown model names are hard failures reported as [`AssetError`].
//!
//! The manager never substitutes a default for a resource that failed to
//! load; callers ask for the default explicitly.

use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::assets::{AssetError, Handle, MaterialDescription, ResourcePool, SharedSlot};
use crate::core::config::AssetConfig;
use crate::render::{
    Geometry, GraphicsDevice, Material, ShaderProgram, ShaderStage, ShaderStageKind, Texture,
};

/// Name of the built-in quad model
pub const TILE_MODEL: &str = "tile";

type ProgramKey = (String, String);
type StageKey = (ShaderStageKind, String);

/// Outcome of sweeping one pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategorySweep {
    /// Entries destroyed by the sweep
    pub released: usize,
    /// Entries left resident because handles still reference them
    pub still_in_use: usize,
}

/// Outcome of [`ResourceManager::clear_unused`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Always-shared resources (tile, default materials) destroyed
    pub defaults_released: usize,
    /// Material pool
    pub materials: CategorySweep,
    /// Shader program pool
    pub programs: CategorySweep,
    /// Shader stage pool
    pub shader_stages: CategorySweep,
    /// Texture pool
    pub textures: CategorySweep,
}

impl SweepReport {
    /// Total entries destroyed across every category
    pub fn total_released(&self) -> usize {
        self.defaults_released
            + self.materials.released
            + self.programs.released
            + self.shader_stages.released
            + self.textures.released
    }

    /// Total pooled entries still referenced
    pub fn total_still_in_use(&self) -> usize {
        self.materials.still_in_use
            + self.programs.still_in_use
            + self.shader_stages.still_in_use
            + self.textures.still_in_use
    }
}

/// Resource Manager - one pool per category plus the always-shared defaults
pub struct ResourceManager {
    device: Rc<dyn GraphicsDevice>,
    config: AssetConfig,

    tile: SharedSlot<Geometry>,
    default_material: SharedSlot<Material>,
    default_depth_material: SharedSlot<Material>,

    materials: ResourcePool<String, Material>,
    programs: ResourcePool<ProgramKey, ShaderProgram>,
    stages: ResourcePool<StageKey, ShaderStage>,
    textures: ResourcePool<String, Texture>,
}

impl ResourceManager {
    /// Create an empty manager creating GPU objects on `device`
    pub fn new(device: Rc<dyn GraphicsDevice>, config: AssetConfig) -> Self {
        log::info!("Creating ResourceManager with config: {:?}", config);
        Self {
            device,
            config,
            tile: SharedSlot::new(),
            default_material: SharedSlot::new(),
            default_depth_material: SharedSlot::new(),
            materials: ResourcePool::new(),
            programs: ResourcePool::new(),
            stages: ResourcePool::new(),
            textures: ResourcePool::new(),
        }
    }

    /// Shader paths in use
    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    /// Device resources are created on
    pub fn device(&self) -> &Rc<dyn GraphicsDevice> {
        &self.device
    }

    /// Program linked from `vertex`, the shared fragment stage and
    /// `fragment`, built on first request
    ///
    /// Never fails; a program whose stages do not compile is returned as an
    /// unlinked placeholder.
    pub fn get_shaders(&mut self, vertex: &str, fragment: &str) -> Handle<ShaderProgram> {
        let Self {
            ref mut programs,
            ref mut stages,
            ref device,
            ref config,
            ..
        } = *self;
        Self::program_from(programs, stages, device, config, vertex, fragment)
    }

    /// Program built from the configured default stages
    pub fn get_default_shaders(&mut self) -> Handle<ShaderProgram> {
        let Self {
            ref mut programs,
            ref mut stages,
            ref device,
            ref config,
            ..
        } = *self;
        Self::program_from(
            programs,
            stages,
            device,
            config,
            &config.default_vertex_shader,
            &config.default_fragment_shader,
        )
    }

    /// Texture decoded from the image at `path`
    pub fn get_texture(&mut self, path: &str) -> Result<Handle<Texture>, AssetError> {
        Self::texture_from(&mut self.textures, &self.device, path)
    }

    /// Material described by the file at `path`
    ///
    /// Its program and texture are acquired through their own pools, so
    /// materials sharing shaders share one program.
    pub fn get_material(&mut self, path: &str) -> Result<Handle<Material>, AssetError> {
        let Self {
            ref mut materials,
            ref mut programs,
            ref mut stages,
            ref mut textures,
            ref device,
            ref config,
            ..
        } = *self;

        materials.get_or_try_create(path.to_string(), || {
            let description = MaterialDescription::load(path)?;
            let vertex = description
                .shaders
                .vertex
                .as_deref()
                .unwrap_or(&config.default_vertex_shader);
            let fragment = description
                .shaders
                .fragment
                .as_deref()
                .unwrap_or(&config.default_fragment_shader);

            let shaders = Self::program_from(programs, stages, device, config, vertex, fragment);
            let mut material = Material::new(shaders)
                .with_colors(description.ambient(), description.diffuse());
            if let Some(texture) = &description.texture {
                let texture = Self::texture_from(textures, device, &texture.path)?;
                material = material.with_texture(texture);
            }

            log::info!("Loaded material {}", path);
            Ok(material)
        })
    }

    /// Shared material using the default program and default colors
    pub fn get_default_material(&mut self) -> Handle<Material> {
        let Self {
            ref mut default_material,
            ref mut programs,
            ref mut stages,
            ref device,
            ref config,
            ..
        } = *self;

        default_material.get_or_init(|| {
            log::debug!("Creating default material");
            Material::new(Self::program_from(
                programs,
                stages,
                device,
                config,
                &config.default_vertex_shader,
                &config.default_fragment_shader,
            ))
        })
    }

    /// Shared material for depth-map passes
    pub fn get_default_depth_map_material(&mut self) -> Handle<Material> {
        let Self {
            ref mut default_depth_material,
            ref mut programs,
            ref mut stages,
            ref device,
            ref config,
            ..
        } = *self;

        default_depth_material.get_or_init(|| {
            log::debug!("Creating default depth-map material");
            Material::new(Self::program_from(
                programs,
                stages,
                device,
                config,
                &config.default_vertex_shader,
                &config.depth_fragment_shader,
            ))
        })
    }

    /// Built-in model by name; only [`TILE_MODEL`] is known
    pub fn get_model(&mut self, name: &str) -> Result<Handle<Geometry>, AssetError> {
        match name {
            TILE_MODEL => Ok(self.tile.get_or_init(Geometry::tile)),
            other => Err(AssetError::UnknownModel(other.to_string())),
        }
    }

    /// Destroy every resource no handle references
    ///
    /// The shared defaults go first, then materials, programs, shader stages
    /// and textures. Releasing a material drops its program and texture
    /// handles, so one sweep also frees what only that material used.
    pub fn clear_unused(&mut self) -> SweepReport {
        let mut defaults_released = 0;
        if self.tile.release_if_unused() {
            log::debug!("Released tile geometry");
            defaults_released += 1;
        }
        if self.default_material.release_if_unused() {
            log::debug!("Released default material");
            defaults_released += 1;
        }
        if self.default_depth_material.release_if_unused() {
            log::debug!("Released default depth-map material");
            defaults_released += 1;
        }

        let report = SweepReport {
            defaults_released,
            materials: Self::sweep(&mut self.materials, "materials"),
            programs: Self::sweep(&mut self.programs, "shader programs"),
            shader_stages: Self::sweep(&mut self.stages, "shader objects"),
            textures: Self::sweep(&mut self.textures, "textures"),
        };
        log::info!(
            "Resource sweep released {} entries, {} still in use",
            report.total_released(),
            report.total_still_in_use()
        );
        report
    }

    /// Tear the manager down
    ///
    /// Sweeps everything unused and reports what callers still hold. Held
    /// resources stay valid until their last handle is dropped.
    pub fn shutdown(mut self) -> SweepReport {
        let report = self.clear_unused();

        let defaults_held = [
            self.tile.is_resident(),
            self.default_material.is_resident(),
            self.default_depth_material.is_resident(),
        ]
        .into_iter()
        .filter(|&resident| resident)
        .count();

        let held = report.total_still_in_use() + defaults_held;
        if held > 0 {
            log::warn!("ResourceManager shut down with {} resources still referenced", held);
        } else {
            log::info!("ResourceManager shut down cleanly");
        }
        report
    }

    /// Resident materials
    pub fn material_count(&self) -> usize {
        self.materials.size()
    }

    /// Resident shader programs
    pub fn program_count(&self) -> usize {
        self.programs.size()
    }

    /// Resident shader stages
    pub fn shader_stage_count(&self) -> usize {
        self.stages.size()
    }

    /// Resident textures
    pub fn texture_count(&self) -> usize {
        self.textures.size()
    }

    /// Outstanding handles on the program for (`vertex`, `fragment`), if resident
    pub fn program_handles(&self, vertex: &str, fragment: &str) -> Option<usize> {
        self.programs.outstanding(&(vertex.to_string(), fragment.to_string()))
    }

    /// Whether the built-in tile geometry is resident
    pub fn is_tile_resident(&self) -> bool {
        self.tile.is_resident()
    }

    fn program_from(
        programs: &mut ResourcePool<ProgramKey, ShaderProgram>,
        stages: &mut ResourcePool<StageKey, ShaderStage>,
        device: &Rc<dyn GraphicsDevice>,
        config: &AssetConfig,
        vertex: &str,
        fragment: &str,
    ) -> Handle<ShaderProgram> {
        programs.get_or_create((vertex.to_string(), fragment.to_string()), || {
            let linked = vec![
                Self::stage_from(stages, device, ShaderStageKind::Vertex, vertex),
                Self::stage_from(
                    stages,
                    device,
                    ShaderStageKind::Fragment,
                    &config.shared_fragment_shader,
                ),
                Self::stage_from(stages, device, ShaderStageKind::Fragment, fragment),
            ];
            ShaderProgram::link(device, format!("({}, {})", vertex, fragment), linked)
        })
    }

    fn stage_from(
        stages: &mut ResourcePool<StageKey, ShaderStage>,
        device: &Rc<dyn GraphicsDevice>,
        kind: ShaderStageKind,
        path: &str,
    ) -> Handle<ShaderStage> {
        stages.get_or_create((kind, path.to_string()), || ShaderStage::compile(device, kind, path))
    }

    fn texture_from(
        textures: &mut ResourcePool<String, Texture>,
        device: &Rc<dyn GraphicsDevice>,
        path: &str,
    ) -> Result<Handle<Texture>, AssetError> {
        textures.get_or_try_create(path.to_string(), || {
            let texture = Texture::from_file(device, path)?;
            log::info!("Loaded texture {} ({}x{})", path, texture.width(), texture.height());
            Ok(texture)
        })
    }

    fn sweep<K, R>(pool: &mut ResourcePool<K, R>, category: &str) -> CategorySweep
    where
        K: Eq + Hash + fmt::Debug,
    {
        let released =
            pool.release_all_unused(|key, _| log::debug!("In use ({}): {:?}", category, key));
        let still_in_use = pool.size();
        log::info!("Released {} {}, {} still in use", released, category, still_in_use);
        CategorySweep { released, still_in_use }
    }
}
