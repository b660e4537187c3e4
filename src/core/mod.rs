pub mod backend;
pub mod power;

#[cfg(windows)]
pub mod input;
#[cfg(windows)]
pub mod screen_capture;
#[cfg(windows)]
pub mod uia;
#[cfg(windows)]
pub mod window;

#[cfg(windows)]
pub type PlatformBackend = uia::UiaBackend;

#[cfg(not(windows))]
pub type PlatformBackend = backend::UnsupportedBackend;

/// Create the UI automation backend for the current platform
#[cfg(windows)]
pub fn platform_backend() -> crate::error::Result<PlatformBackend> {
    uia::UiaBackend::new()
}

#[cfg(not(windows))]
pub fn platform_backend() -> crate::error::Result<PlatformBackend> {
    Ok(backend::UnsupportedBackend)
}
