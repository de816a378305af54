use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::device::{BackendError, DebugCallback, DebugSeverity, DeviceFeature, DeviceId};
use crate::util::sync::lock;

use super::WgpuConfig;

const IDLE_TIMEOUT: Duration = Duration::from_secs(2);

/// The one logical device every window renders with.
pub(super) struct SharedGpu {
    pub(super) id: DeviceId,
    pub(super) adapter: wgpu::Adapter,
    pub(super) device: wgpu::Device,
    pub(super) queue: wgpu::Queue,
    pub(super) features: wgpu::Features,
    messengers: Arc<Mutex<Vec<DebugCallback>>>,
    messenger_installed: bool,
}

impl SharedGpu {
    /// Adapter and device acquisition is asynchronous under wgpu; callers
    /// block on it with `pollster`.
    pub(super) async fn request(
        instance: &wgpu::Instance,
        compatible_surface: &wgpu::Surface<'_>,
        config: &WgpuConfig,
        wanted: &[DeviceFeature],
    ) -> Result<Self, BackendError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: Some(compatible_surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| BackendError::NoAdapter(e.to_string()))?;

        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let requested = map_features(wanted);
        let available = adapter.features();
        let missing = requested - available;
        if !missing.is_empty() {
            log::warn!("adapter lacks requested features: {missing:?}");
        }
        let features = requested & available;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("globe device"),
                required_features: features,
                required_limits: config.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| BackendError::DeviceRequest(e.to_string()))?;

        Ok(Self {
            id: DeviceId::new(0),
            adapter,
            device,
            queue,
            features,
            messengers: Arc::new(Mutex::new(Vec::new())),
            messenger_installed: false,
        })
    }

    /// Warns about features a later window needs but the device was created
    /// without.
    pub(super) fn check_features(&self, wanted: &[DeviceFeature]) {
        let missing = map_features(wanted) - self.features;
        if !missing.is_empty() {
            log::warn!("shared device lacks features: {missing:?}");
        }
    }

    /// Validation errors fan out to every registered callback.
    pub(super) fn add_messenger(&mut self, callback: DebugCallback) {
        lock(&self.messengers).push(callback);
        if self.messenger_installed {
            return;
        }

        let messengers = Arc::clone(&self.messengers);
        let handler: Box<dyn wgpu::UncapturedErrorHandler> = Box::new(move |err: wgpu::Error| {
            let message = err.to_string();
            for cb in lock(&messengers).iter() {
                cb(DebugSeverity::Error, &message);
            }
        });
        self.device.on_uncaptured_error(handler.into());
        self.messenger_installed = true;
    }

    /// Blocks until the queue has drained, capped at [`IDLE_TIMEOUT`].
    pub(super) fn wait_idle(&self) {
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        self.queue
            .on_submitted_work_done(move || flag.store(true, Ordering::Release));

        let start = Instant::now();
        while !done.load(Ordering::Acquire) {
            if let Err(e) = self.device.poll(wgpu::PollType::Poll) {
                log::warn!("device poll failed: {e}");
                return;
            }
            if start.elapsed() > IDLE_TIMEOUT {
                log::warn!("device did not go idle within {IDLE_TIMEOUT:?}");
                return;
            }
            std::thread::yield_now();
        }
    }
}

pub(super) fn map_features(wanted: &[DeviceFeature]) -> wgpu::Features {
    wanted.iter().fold(wgpu::Features::empty(), |acc, f| {
        acc | match f {
            DeviceFeature::DepthClipControl => wgpu::Features::DEPTH_CLIP_CONTROL,
            DeviceFeature::PolygonModeLine => wgpu::Features::POLYGON_MODE_LINE,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_map_to_wgpu_flags() {
        let f = map_features(&[DeviceFeature::DepthClipControl, DeviceFeature::PolygonModeLine]);
        assert!(f.contains(wgpu::Features::DEPTH_CLIP_CONTROL));
        assert!(f.contains(wgpu::Features::POLYGON_MODE_LINE));
        assert!(map_features(&[]).is_empty());
    }
}
