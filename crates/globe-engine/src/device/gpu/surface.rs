use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::device::{BackendError, PresentMode, SurfaceErrorAction};
use crate::graph::RenderArea;

/// Swapchain of one window.
///
/// Field order matters: the surface must drop before the window it was
/// created from.
pub(super) struct WindowSurface {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    window: Arc<Window>,
}

impl WindowSurface {
    pub(super) fn new(
        window: Arc<Window>,
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        device: &wgpu::Device,
        present_mode: PresentMode,
        prefer_srgb: bool,
        desired_maximum_frame_latency: u32,
    ) -> Result<Self, BackendError> {
        let size = window.inner_size();
        let caps = surface.get_capabilities(adapter);
        let format = choose_surface_format(&caps, prefer_srgb)
            .ok_or_else(|| BackendError::WindowCreation("no supported surface formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: choose_present_mode(&caps, present_mode),
            alpha_mode: choose_alpha_mode(&caps, None),
            view_formats: vec![],
            desired_maximum_frame_latency,
        };
        surface.configure(device, &config);

        log::debug!(
            "surface configured: {}x{} {:?} {:?}",
            config.width,
            config.height,
            config.format,
            config.present_mode
        );

        Ok(Self {
            surface,
            config,
            size,
            window,
        })
    }

    #[inline]
    pub(super) fn window(&self) -> &Window {
        &self.window
    }

    #[inline]
    pub(super) fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// wgpu rejects 0x0 configurations; a zero size is stored and the
    /// reconfiguration deferred until the window is visible again.
    pub(super) fn resize(&mut self, device: &wgpu::Device, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(device, &self.config);
    }

    /// Next swapchain image, or `None` when this frame must be skipped for
    /// this window.
    pub(super) fn acquire(
        &mut self,
        device: &wgpu::Device,
    ) -> Result<Option<wgpu::SurfaceTexture>, BackendError> {
        if self.size.width == 0 || self.size.height == 0 {
            return Ok(None);
        }

        match self.surface.get_current_texture() {
            Ok(texture) => Ok(Some(texture)),
            Err(err) => match self.handle_surface_error(device, err) {
                SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(None),
                SurfaceErrorAction::Fatal => Err(BackendError::OutOfMemory),
            },
        }
    }

    fn handle_surface_error(&mut self, device: &wgpu::Device, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                log::debug!("surface {err:?}; reconfiguring");
                self.surface.configure(device, &self.config);
                SurfaceErrorAction::Reconfigured
            }
            wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
            wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
            wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
        }
    }
}

pub(super) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for f in preferred {
            if caps.formats.contains(&f) {
                return Some(f);
            }
        }
    }

    Some(caps.formats[0])
}

pub(super) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Falls back to FIFO, which every surface supports.
pub(super) fn choose_present_mode(caps: &wgpu::SurfaceCapabilities, mode: PresentMode) -> wgpu::PresentMode {
    let wanted = match mode {
        PresentMode::Fifo => wgpu::PresentMode::Fifo,
        PresentMode::Mailbox => wgpu::PresentMode::Mailbox,
        PresentMode::Immediate => wgpu::PresentMode::Immediate,
    };
    if caps.present_modes.contains(&wanted) {
        wanted
    } else {
        log::warn!("present mode {wanted:?} unsupported; using Fifo");
        wgpu::PresentMode::Fifo
    }
}

/// Intersects a render area with the surface, as `(x, y, width, height)`.
/// `None` when nothing of the area is on screen.
pub(super) fn clamp_render_area(area: RenderArea, size: PhysicalSize<u32>) -> Option<(u32, u32, u32, u32)> {
    let x0 = area.x.max(0) as u32;
    let y0 = area.y.max(0) as u32;
    let x1 = (area.x as i64 + area.width as i64).clamp(0, size.width as i64) as u32;
    let y1 = (area.y as i64 + area.height as i64).clamp(0, size.height as i64) as u32;
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0, y0, x1 - x0, y1 - y0))
}
