//! winit + wgpu backend.
//!
//! One instance and one shared device per process; each window gets its own
//! surface. Every render graph becomes one render pass on its window's
//! swapchain image, limited to the render graph's render area.

mod context;
mod platform;
mod surface;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::graph::{ClearColor, CommandGraph, RenderGraph};
use crate::input::{Event, InputEvent};
use crate::view::ViewId;

use super::{
    compile_scope, Backend, BackendError, CompileResult, CompileScope, DebugCallback, DeviceId,
    ResourceHints, WindowId, WindowTraits,
};
use context::SharedGpu;
use platform::Platform;
use surface::{clamp_render_area, WindowSurface};

/// Initialization parameters for the wgpu backend.
#[derive(Debug, Clone)]
pub struct WgpuConfig {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for every surface. A hint; support
    /// depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for WgpuConfig {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

pub struct WgpuBackend {
    config: WgpuConfig,
    // Drop order: swapchain images, then surfaces, then the device, then the
    // windows owned by the platform.
    frames: Vec<(WindowId, wgpu::SurfaceTexture)>,
    surfaces: BTreeMap<WindowId, WindowSurface>,
    gpu: Option<SharedGpu>,
    instance: Option<wgpu::Instance>,
    platform: Platform,
    compiled_views: HashSet<ViewId>,
    api_dump_warned: bool,
}

impl WgpuBackend {
    /// Must be called on the main thread; winit allows one event loop per
    /// process.
    pub fn new(config: WgpuConfig) -> anyhow::Result<Self> {
        let platform = Platform::new()?;
        Ok(Self {
            config,
            frames: Vec::new(),
            surfaces: BTreeMap::new(),
            gpu: None,
            instance: None,
            platform,
            compiled_views: HashSet::new(),
            api_dump_warned: false,
        })
    }

    fn instance(&mut self, traits: &WindowTraits) -> &wgpu::Instance {
        let backends = self.config.backends;
        self.instance.get_or_insert_with(|| {
            let flags = if traits.debug_layer {
                wgpu::InstanceFlags::debugging()
            } else {
                wgpu::InstanceFlags::default()
            };
            log::debug!(
                "creating wgpu instance: {backends:?} {flags:?} extensions {:?}",
                traits.instance_extensions
            );
            wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends,
                flags,
                ..Default::default()
            })
        })
    }
}

impl Backend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn create_window(&mut self, id: WindowId, traits: &WindowTraits) -> Result<DeviceId, BackendError> {
        if traits.api_dump_layer && !self.api_dump_warned {
            log::warn!("API dump layer is not available on the wgpu backend");
            self.api_dump_warned = true;
        }

        let window = self.platform.open_window(id, traits)?;
        let surface = self
            .instance(traits)
            .create_surface(Arc::clone(&window))
            .map_err(|e| BackendError::WindowCreation(e.to_string()))?;

        if self.gpu.is_none() {
            let Some(instance) = self.instance.as_ref() else {
                return Err(BackendError::NoAdapter("no wgpu instance".into()));
            };
            let gpu = pollster::block_on(SharedGpu::request(
                instance,
                &surface,
                &self.config,
                &traits.device_features,
            ))?;
            self.gpu = Some(gpu);
        }
        let Some(gpu) = self.gpu.as_ref() else {
            return Err(BackendError::DeviceRequest("device unavailable".into()));
        };
        if traits.device.is_some_and(|d| d != gpu.id) {
            log::warn!("requested device {:?} unknown; using the shared device", traits.device);
        }
        gpu.check_features(&traits.device_features);

        let window_surface = WindowSurface::new(
            window,
            surface,
            &gpu.adapter,
            &gpu.device,
            traits.present_mode,
            self.config.prefer_srgb,
            self.config.desired_maximum_frame_latency,
        )?;
        self.surfaces.insert(id, window_surface);

        log::info!("window {} created ({}x{})", id.raw(), traits.width, traits.height);
        Ok(gpu.id)
    }

    fn destroy_window(&mut self, id: WindowId) {
        self.frames.retain(|(w, _)| *w != id);
        self.surfaces.remove(&id);
        self.platform.close_window(id);
    }

    fn release_view(&mut self, view: ViewId) {
        self.compiled_views.remove(&view);
    }

    fn install_debug_messenger(&mut self, window: WindowId, callback: DebugCallback) {
        match self.gpu.as_mut() {
            Some(gpu) => gpu.add_messenger(callback),
            None => log::warn!("debug messenger for window {} ignored: no device", window.raw()),
        }
    }

    fn device_wait_idle(&mut self) {
        if let Some(gpu) = &self.gpu {
            gpu.wait_idle();
        }
    }

    fn poll_events(&mut self, events: &mut Vec<Event>) {
        let start = events.len();
        self.platform.pump(events);

        let Some(gpu) = &self.gpu else {
            return;
        };
        for event in &events[start..] {
            if let InputEvent::Resized { width, height } = event.input {
                if let Some(surface) = self.surfaces.get_mut(&event.window) {
                    surface.resize(&gpu.device, winit::dpi::PhysicalSize::new(width, height));
                }
            }
        }
    }

    fn compile(
        &mut self,
        scope: CompileScope<'_>,
        hints: Option<&ResourceHints>,
    ) -> Result<CompileResult, BackendError> {
        if let Some(hints) = hints {
            log::debug!(
                "compile hints: {} descriptor sets, {} pool sizes",
                hints.num_descriptor_sets,
                hints.descriptor_pool_sizes.len()
            );
        }
        Ok(compile_scope(&scope, &mut self.compiled_views))
    }

    fn rebuild_pipelines(&mut self, render_graph: &RenderGraph) -> Result<(), BackendError> {
        // Clear passes bake no pipeline state beyond the render area.
        log::debug!(
            "render graph {:?} at pipeline revision {}",
            render_graph.id(),
            render_graph.pipeline_revision()
        );
        Ok(())
    }

    fn record_and_submit(&mut self, graphs: &[&CommandGraph]) -> Result<(), BackendError> {
        let Some(gpu) = &self.gpu else {
            return Ok(());
        };

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("globe frame encoder"),
            });

        for graph in graphs {
            let window = graph.window();
            let surface = self
                .surfaces
                .get_mut(&window)
                .ok_or(BackendError::UnknownWindow(window))?;
            let Some(frame) = surface.acquire(&gpu.device)? else {
                continue;
            };
            let target = frame
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());

            for (i, rg) in graph.children().iter().enumerate() {
                // The first pass owns the attachment clear; later passes draw over it.
                let load = if i == 0 {
                    wgpu::LoadOp::Clear(to_wgpu_color(rg.clear_color()))
                } else {
                    wgpu::LoadOp::Load
                };

                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("globe render graph"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &target,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });

                if let Some((x, y, w, h)) = clamp_render_area(rg.render_area(), surface.size()) {
                    pass.set_viewport(x as f32, y as f32, w as f32, h as f32, 0.0, 1.0);
                    pass.set_scissor_rect(x, y, w, h);
                }
            }

            self.frames.push((window, frame));
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn present(&mut self) -> Result<(), BackendError> {
        for (window, frame) in self.frames.drain(..) {
            if let Some(surface) = self.surfaces.get(&window) {
                surface.window().pre_present_notify();
            }
            frame.present();
        }
        Ok(())
    }
}

fn to_wgpu_color(c: ClearColor) -> wgpu::Color {
    wgpu::Color {
        r: c.r as f64,
        g: c.g as f64,
        b: c.b as f64,
        a: c.a as f64,
    }
}
