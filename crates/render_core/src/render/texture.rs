//! GPU textures

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::assets::{AssetError, ImageData};
use crate::render::device::{GpuId, GraphicsDevice};

/// 2D texture resident on the device, released on drop
pub struct Texture {
    id: GpuId,
    width: u32,
    height: u32,
    source: String,
    device: Rc<dyn GraphicsDevice>,
}

impl Texture {
    /// Decode an image file and upload it with mipmaps
    pub fn from_file(
        device: &Rc<dyn GraphicsDevice>,
        path: impl AsRef<Path>,
    ) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let image = ImageData::from_file(path)?;
        Ok(Self::from_image(device, &image, path.display().to_string()))
    }

    /// Upload already-decoded pixels
    pub fn from_image(
        device: &Rc<dyn GraphicsDevice>,
        image: &ImageData,
        source: impl Into<String>,
    ) -> Self {
        let id = device.create_texture(image, true);
        Self {
            id,
            width: image.width,
            height: image.height,
            source: source.into(),
            device: Rc::clone(device),
        }
    }

    /// Bind to a sampler unit
    pub fn bind(&self, unit: u32) {
        self.device.bind_texture(self.id, unit);
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Path or label the pixels came from
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        log::debug!("Deleting texture {}", self.source);
        self.device.delete_texture(self.id);
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("size", &(self.width, self.height))
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::HeadlessDevice;
    use tempfile::tempdir;

    #[test]
    fn test_from_file_uploads_and_drop_releases() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checker.png");
        image::RgbaImage::from_pixel(8, 4, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let headless = Rc::new(HeadlessDevice::new());
        let device: Rc<dyn GraphicsDevice> = headless.clone();
        let texture = Texture::from_file(&device, &path).unwrap();
        assert_eq!((texture.width(), texture.height()), (8, 4));

        texture.bind(0);
        assert_eq!(headless.stats().texture_binds, 1);

        drop(texture);
        assert_eq!(headless.stats().live_textures(), 0);
    }

    #[test]
    fn test_missing_file_uploads_nothing() {
        let headless = Rc::new(HeadlessDevice::new());
        let device: Rc<dyn GraphicsDevice> = headless.clone();

        let result = Texture::from_file(&device, "no/such/texture.png");
        assert!(matches!(result, Err(AssetError::NotFound(_))));
        assert_eq!(headless.stats().textures_created, 0);
    }
}
