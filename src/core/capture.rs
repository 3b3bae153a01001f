use log::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureSource {
    Camera,
    Gallery,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    CameraPermission,
    GalleryPermission,
    CameraSetup {
        deadline_ms: u64,
    },
    Capturing {
        source: CaptureSource,
        error: Option<String>,
    },
    Uploading {
        source: CaptureSource,
    },
    PreparingAnalysis {
        deadline_ms: u64,
    },
    Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureTick {
    CameraReady,
    AnalysisReady,
}

/// Image capture screen: permission prompt, timed loading screens and the
/// upload round trip.
#[derive(Clone, Debug)]
pub struct CaptureFlow {
    state: CaptureState,
    loading_delay_ms: u64,
}

impl CaptureFlow {
    pub fn new(loading_delay_ms: u64) -> Self {
        Self {
            state: CaptureState::Idle,
            loading_delay_ms,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            CaptureState::Capturing { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    pub fn can_capture(&self) -> bool {
        match &self.state {
            CaptureState::Capturing { error, .. } => !is_device_error(error.as_deref()),
            _ => false,
        }
    }

    pub fn request(&mut self, source: CaptureSource) -> bool {
        if self.state != CaptureState::Idle {
            return false;
        }
        self.state = match source {
            CaptureSource::Camera => CaptureState::CameraPermission,
            CaptureSource::Gallery => CaptureState::GalleryPermission,
        };
        true
    }

    pub fn allow(&mut self, now_ms: u64) -> bool {
        let next = match self.state {
            CaptureState::CameraPermission => CaptureState::CameraSetup {
                deadline_ms: now_ms.saturating_add(self.loading_delay_ms),
            },
            CaptureState::GalleryPermission => CaptureState::Capturing {
                source: CaptureSource::Gallery,
                error: None,
            },
            _ => return false,
        };
        self.state = next;
        true
    }

    pub fn deny(&mut self) -> bool {
        match self.state {
            CaptureState::CameraPermission | CaptureState::GalleryPermission => {
                self.state = CaptureState::Idle;
                true
            }
            _ => false,
        }
    }

    /// The device refused camera access. The capture screen stays open with
    /// the message and capture disabled.
    pub fn camera_unavailable(&mut self, message: &str) {
        warn!("{}: {}", DEVICE_ERROR_PREFIX, message);
        self.state = CaptureState::Capturing {
            source: CaptureSource::Camera,
            error: Some(format!("{}: {}", DEVICE_ERROR_PREFIX, message)),
        };
    }

    pub fn close(&mut self) -> bool {
        match self.state {
            CaptureState::Capturing { .. } => {
                self.state = CaptureState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn begin_upload(&mut self) -> bool {
        if !self.can_capture() {
            return false;
        }
        if let CaptureState::Capturing { source, .. } = self.state {
            self.state = CaptureState::Uploading { source };
            return true;
        }
        false
    }

    pub fn upload_succeeded(&mut self, now_ms: u64) -> bool {
        if !matches!(self.state, CaptureState::Uploading { .. }) {
            return false;
        }
        self.state = CaptureState::PreparingAnalysis {
            deadline_ms: now_ms.saturating_add(self.loading_delay_ms),
        };
        true
    }

    /// Back to the capture screen so the user can retake.
    pub fn upload_failed(&mut self, message: &str) -> bool {
        let CaptureState::Uploading { source } = self.state else {
            return false;
        };
        self.state = CaptureState::Capturing {
            source,
            error: Some(message.to_string()),
        };
        true
    }

    /// Clears a previous upload error before a retake.
    pub fn retake(&mut self) {
        if let CaptureState::Capturing { error, .. } = &mut self.state {
            if !is_device_error(error.as_deref()) {
                *error = None;
            }
        }
    }

    pub fn tick(&mut self, now_ms: u64) -> Option<CaptureTick> {
        match self.state {
            CaptureState::CameraSetup { deadline_ms } if now_ms >= deadline_ms => {
                debug!("Camera setup finished");
                self.state = CaptureState::Capturing {
                    source: CaptureSource::Camera,
                    error: None,
                };
                Some(CaptureTick::CameraReady)
            }
            CaptureState::PreparingAnalysis { deadline_ms } if now_ms >= deadline_ms => {
                debug!("Analysis ready");
                self.state = CaptureState::Complete;
                Some(CaptureTick::AnalysisReady)
            }
            _ => None,
        }
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        match self.state {
            CaptureState::CameraSetup { deadline_ms }
            | CaptureState::PreparingAnalysis { deadline_ms } => Some(deadline_ms),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = CaptureState::Idle;
    }
}

const DEVICE_ERROR_PREFIX: &str = "Camera unavailable";

fn is_device_error(error: Option<&str>) -> bool {
    error.is_some_and(|e| e.starts_with(DEVICE_ERROR_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_path() {
        let mut flow = CaptureFlow::new(5000);
        assert!(flow.request(CaptureSource::Camera));
        assert!(!flow.request(CaptureSource::Gallery));
        assert!(flow.allow(100));
        assert_eq!(flow.tick(5_099), None);
        assert_eq!(flow.tick(5_100), Some(CaptureTick::CameraReady));
        assert!(flow.can_capture());

        assert!(flow.begin_upload());
        assert!(!flow.begin_upload());
        assert!(flow.upload_succeeded(6_000));
        assert_eq!(flow.deadline_ms(), Some(11_000));
        assert_eq!(flow.tick(10_999), None);
        assert_eq!(flow.tick(11_000), Some(CaptureTick::AnalysisReady));
        assert_eq!(flow.state(), &CaptureState::Complete);
        assert_eq!(flow.tick(20_000), None);
    }

    #[test]
    fn test_gallery_skips_setup() {
        let mut flow = CaptureFlow::new(5000);
        flow.request(CaptureSource::Gallery);
        flow.allow(0);
        assert_eq!(
            flow.state(),
            &CaptureState::Capturing {
                source: CaptureSource::Gallery,
                error: None
            }
        );
    }

    #[test]
    fn test_deny_returns_to_idle() {
        let mut flow = CaptureFlow::new(5000);
        flow.request(CaptureSource::Camera);
        assert!(flow.deny());
        assert_eq!(flow.state(), &CaptureState::Idle);
        assert!(!flow.deny());
    }

    #[test]
    fn test_failed_upload_allows_retake() {
        let mut flow = CaptureFlow::new(5000);
        flow.request(CaptureSource::Gallery);
        flow.allow(0);
        flow.begin_upload();
        assert!(flow.upload_failed("Upload failed: Bad Request"));
        assert_eq!(flow.error(), Some("Upload failed: Bad Request"));
        assert!(flow.can_capture());

        flow.retake();
        assert_eq!(flow.error(), None);
        assert!(flow.begin_upload());
    }

    #[test]
    fn test_camera_denial_disables_capture() {
        let mut flow = CaptureFlow::new(5000);
        flow.request(CaptureSource::Camera);
        flow.allow(0);
        flow.tick(5000);
        flow.camera_unavailable("permission denied");
        assert_eq!(flow.error(), Some("Camera unavailable: permission denied"));
        assert!(!flow.can_capture());
        assert!(!flow.begin_upload());

        flow.retake();
        assert!(flow.error().is_some());
        assert!(flow.close());
        assert_eq!(flow.state(), &CaptureState::Idle);
    }
}
