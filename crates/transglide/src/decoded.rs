use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::LoaderError;

/// A decoded image together with the file it was read from
#[derive(Debug, Clone)]
pub struct DecodedImage {
    path: PathBuf,
    image: DynamicImage,
}

impl DecodedImage {
    /// Decode `data`, sniffing the format from its contents
    pub fn decode(path: impl Into<PathBuf>, data: &[u8]) -> Result<Self, LoaderError> {
        let path = path.into();
        match image::load_from_memory(data) {
            Ok(image) => Ok(Self { path, image }),
            Err(source) => Err(LoaderError::Decode { path, source }),
        }
    }

    /// Read and decode the file at `path`. Blocking.
    pub fn open(path: &Path) -> Result<Self, LoaderError> {
        let data = std::fs::read(path)?;
        Self::decode(path, &data)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
