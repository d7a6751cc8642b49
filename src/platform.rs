//! Platform classification
//!
//! The desktop/mobile decision selects where tunnel files live and whether
//! the store talks to a local proxy process at all. Both answers are
//! computed at most once per [`Platform`] value.

use log::debug;
use once_cell::sync::{Lazy, OnceCell};

use crate::vfs::BaseDir;

const MOBILE_OS: &[&str] = &["android", "ios"];

static CURRENT: Lazy<Platform> = Lazy::new(|| Platform::new(std::env::consts::OS));

#[derive(Debug, Clone)]
pub struct Platform {
    os: String,
    desktop: OnceCell<bool>,
    base_dir: OnceCell<BaseDir>,
}

impl Platform {
    pub fn new(os: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            desktop: OnceCell::new(),
            base_dir: OnceCell::new(),
        }
    }

    /// The process-wide platform of the running binary
    pub fn current() -> &'static Platform {
        &CURRENT
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn is_desktop(&self) -> bool {
        *self.desktop.get_or_init(|| {
            let desktop = !MOBILE_OS.contains(&self.os.as_str());
            debug!("Platform {} classified as desktop={}", self.os, desktop);
            desktop
        })
    }

    /// Home directory on desktop, app-private storage on mobile
    pub fn base_dir(&self) -> BaseDir {
        *self.base_dir.get_or_init(|| {
            if self.is_desktop() {
                BaseDir::Home
            } else {
                BaseDir::AppData
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        for os in ["linux", "windows", "macos", "freebsd"] {
            let platform = Platform::new(os);
            assert!(platform.is_desktop(), "{}", os);
            assert_eq!(platform.base_dir(), BaseDir::Home);
        }
        for os in ["android", "ios"] {
            let platform = Platform::new(os);
            assert!(!platform.is_desktop(), "{}", os);
            assert_eq!(platform.base_dir(), BaseDir::AppData);
        }
    }

    #[test]
    fn test_answers_are_cached() {
        let platform = Platform::new("android");
        assert!(!platform.is_desktop());
        assert_eq!(platform.desktop.get(), Some(&false));
        assert_eq!(platform.base_dir.get(), None);
        platform.base_dir();
        assert_eq!(platform.base_dir.get(), Some(&BaseDir::AppData));
    }

    #[test]
    fn test_current_is_shared() {
        assert!(std::ptr::eq(Platform::current(), Platform::current()));
        assert_eq!(Platform::current().os(), std::env::consts::OS);
    }
}
