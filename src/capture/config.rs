//! Capture configuration

use std::path::PathBuf;

/// Capture device configuration options
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Device node to open
    pub path: PathBuf,

    /// Requested capture width in pixels
    pub width: u32,

    /// Requested capture height in pixels
    pub height: u32,

    /// Number of ring buffer slots to request
    pub buffers: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/video0"),
            width: 640,
            height: 480,
            buffers: 4,
        }
    }
}

impl CameraConfig {
    /// Create a config for a specific device node
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the device node
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the requested capture dimensions
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the number of ring buffer slots
    pub fn buffers(mut self, count: u32) -> Self {
        self.buffers = count.max(1);
        self
    }

    /// Expected byte length of one packed YUYV frame at these dimensions
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * crate::media::YUYV_BYTES_PER_PIXEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CameraConfig::default();

        assert_eq!(config.path, PathBuf::from("/dev/video0"));
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 480);
        assert_eq!(config.buffers, 4);
        assert_eq!(config.frame_len(), 640 * 480 * 2);
    }

    #[test]
    fn test_with_path() {
        let config = CameraConfig::with_path("/dev/video7");

        assert_eq!(config.path, PathBuf::from("/dev/video7"));
        assert_eq!(config.width, 640);
    }

    #[test]
    fn test_builder_chaining() {
        let config = CameraConfig::default()
            .path("/dev/video2")
            .dimensions(320, 240)
            .buffers(6);

        assert_eq!(config.path, PathBuf::from("/dev/video2"));
        assert_eq!(config.width, 320);
        assert_eq!(config.height, 240);
        assert_eq!(config.buffers, 6);
    }

    #[test]
    fn test_builder_buffers_floor() {
        let config = CameraConfig::default().buffers(0);

        assert_eq!(config.buffers, 1);
    }
}
