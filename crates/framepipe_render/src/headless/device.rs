//! # Headless GPU Device
//!
//! An in-memory [`GpuDevice`]. Commands run on the software rasterizer when
//! their submission completes, and completion is either driven by hand or
//! by a worker thread.
//!
//! ## Manual Completion
//!
//! ```text
//! commit ─► pending (age 0) ─► advance_frame ─► age 1 ─► … ─► age == latency ─► execute + handlers
//! ```
//!
//! With a latency of zero a submission completes inside `commit`.
//!
//! ## Threaded Completion
//!
//! A worker thread receives submissions over a channel, sleeps for the
//! configured latency, executes them and runs their handlers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Sender};
use framepipe_core::SharedPixelBuffer;
use framepipe_shared::{IntPoint, IntRect, IntSize};
use parking_lot::Mutex;

use super::raster;
use crate::error::{PipelineError, PipelineResult};
use crate::gpu::{
    CommandBuffer, CompletedHandler, Drawable, GpuCommand, GpuDevice, GraphicsApi, Texture,
    TextureDescriptor, TextureFormat, TextureStorage, TextureUsage,
};

/// How submissions complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// Completes after `latency_frames` calls to [`HeadlessDevice::advance_frame`].
    Manual {
        /// Frame intervals between commit and completion.
        latency_frames: u32,
    },
    /// Completes on a worker thread after `latency`.
    Threaded {
        /// Simulated GPU time per submission.
        latency: Duration,
    },
}

/// Headless device settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessConfig {
    /// Reported device name.
    pub name: String,
    /// Shared buffers can be viewed by both APIs.
    pub zero_copy: bool,
    /// Number of swapchain images.
    pub swapchain_images: usize,
    /// Completion behavior.
    pub completion: CompletionMode,
    /// Initial drawable size.
    pub drawable_size: IntSize,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            name: "headless".into(),
            zero_copy: true,
            swapchain_images: 3,
            completion: CompletionMode::Manual { latency_frames: 0 },
            drawable_size: IntSize::new(640, 480),
        }
    }
}

/// Work done by the device so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessCounters {
    /// Private textures created.
    pub textures_created: u64,
    /// Shared buffers allocated.
    pub shared_buffers_created: u64,
    /// CPU uploads into textures.
    pub uploads: u64,
    /// Command buffers committed.
    pub committed: u64,
    /// Command buffers completed.
    pub completed: u64,
    /// Drawables handed out.
    pub drawables_acquired: u64,
    /// `next_drawable` calls that found no free image.
    pub drawable_starvations: u64,
    /// Drawables shown.
    pub presents: u64,
}

/// The last image shown by the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedFrame {
    /// Present sequence number, starting at 1.
    pub sequence: u64,
    /// Swapchain image id.
    pub drawable_id: u64,
    /// Image size.
    pub size: IntSize,
    /// BGRA pixels, top row first.
    pub pixels: Vec<u8>,
    /// Requested minimum display duration.
    pub min_duration: Option<Duration>,
}

struct SwapImage {
    id: u64,
    texture: Texture,
    busy: Arc<AtomicBool>,
}

struct Swapchain {
    size: IntSize,
    images: Vec<SwapImage>,
    next: usize,
    next_id: u64,
}

impl Swapchain {
    fn new(size: IntSize, count: usize) -> Self {
        let mut swapchain = Self {
            size,
            images: Vec::new(),
            next: 0,
            next_id: 1,
        };
        swapchain.rebuild(size, count);
        swapchain
    }

    fn rebuild(&mut self, size: IntSize, count: usize) {
        let size = if size.is_empty() { IntSize::new(1, 1) } else { size };
        let descriptor = TextureDescriptor::new(
            "drawable",
            size,
            TextureFormat::Bgra8Unorm,
            TextureUsage::RENDER_TARGET,
        );
        self.size = size;
        self.images = (0..count.max(1))
            .map(|_| {
                let id = self.next_id;
                self.next_id += 1;
                SwapImage {
                    id,
                    texture: Texture::new_private(GraphicsApi::Modern, descriptor),
                    busy: Arc::new(AtomicBool::new(false)),
                }
            })
            .collect();
        self.next = 0;
    }
}

struct Submission {
    commands: Vec<GpuCommand>,
    handlers: Vec<CompletedHandler>,
    age: u32,
}

enum WorkItem {
    Submit(Submission),
    Barrier(Sender<()>),
}

/// State shared with the completion worker.
struct DeviceShared {
    counters: Mutex<HeadlessCounters>,
    last_presented: Mutex<Option<PresentedFrame>>,
}

impl DeviceShared {
    fn complete(&self, submission: Submission) {
        for command in submission.commands {
            self.execute(command);
        }
        self.counters.lock().completed += 1;
        for handler in submission.handlers {
            handler();
        }
    }

    fn execute(&self, command: GpuCommand) {
        match command {
            GpuCommand::Copy {
                source,
                source_rect,
                target,
                target_origin,
            } => {
                raster::copy(&source, source_rect, &target, target_origin);
            }
            GpuCommand::Clear { target, color } => raster::clear(&target, color),
            GpuCommand::Draw(pass) => raster::draw(&pass),
            GpuCommand::Present {
                drawable,
                min_duration,
            } => {
                let texture = drawable.texture();
                let size = texture.size();
                let pixels = texture
                    .read_pixels(IntRect::from_size(size))
                    .unwrap_or_default();
                let mut counters = self.counters.lock();
                counters.presents += 1;
                *self.last_presented.lock() = Some(PresentedFrame {
                    sequence: counters.presents,
                    drawable_id: drawable.id(),
                    size,
                    pixels,
                    min_duration,
                });
            }
        }
    }
}

/// Software GPU device for tests, benches and CI.
pub struct HeadlessDevice {
    config: HeadlessConfig,
    shared: Arc<DeviceShared>,
    swapchain: Mutex<Swapchain>,
    pending: Mutex<VecDeque<Submission>>,
    worker: Option<Sender<WorkItem>>,
    worker_handle: Option<JoinHandle<()>>,
    fail_textures: AtomicBool,
    fail_command_buffers: AtomicBool,
    starve_drawables: AtomicBool,
}

impl HeadlessDevice {
    /// Creates a device. Threaded completion starts its worker here.
    #[must_use]
    pub fn new(config: HeadlessConfig) -> Self {
        let shared = Arc::new(DeviceShared {
            counters: Mutex::new(HeadlessCounters::default()),
            last_presented: Mutex::new(None),
        });

        let (worker, worker_handle) = match config.completion {
            CompletionMode::Manual { .. } => (None, None),
            CompletionMode::Threaded { latency } => {
                let (sender, receiver) = unbounded::<WorkItem>();
                let worker_shared = Arc::clone(&shared);
                let handle = thread::spawn(move || {
                    Self::completion_loop(&receiver, &worker_shared, latency);
                });
                (Some(sender), Some(handle))
            }
        };

        Self {
            swapchain: Mutex::new(Swapchain::new(config.drawable_size, config.swapchain_images)),
            config,
            shared,
            pending: Mutex::new(VecDeque::new()),
            worker,
            worker_handle,
            fail_textures: AtomicBool::new(false),
            fail_command_buffers: AtomicBool::new(false),
            starve_drawables: AtomicBool::new(false),
        }
    }

    fn completion_loop(
        receiver: &crossbeam_channel::Receiver<WorkItem>,
        shared: &DeviceShared,
        latency: Duration,
    ) {
        while let Ok(item) = receiver.recv() {
            match item {
                WorkItem::Submit(submission) => {
                    if !latency.is_zero() {
                        thread::sleep(latency);
                    }
                    shared.complete(submission);
                }
                WorkItem::Barrier(ack) => {
                    let _ = ack.send(());
                }
            }
        }
    }

    /// Ages manual submissions by one frame interval and completes those
    /// that reached the configured latency. Returns how many completed.
    pub fn advance_frame(&self) -> usize {
        let CompletionMode::Manual { latency_frames } = self.config.completion else {
            return 0;
        };

        let ready: Vec<Submission> = {
            let mut pending = self.pending.lock();
            for submission in pending.iter_mut() {
                submission.age += 1;
            }
            let count = pending
                .iter()
                .take_while(|s| s.age >= latency_frames)
                .count();
            pending.drain(..count).collect()
        };

        let completed = ready.len();
        for submission in ready {
            self.shared.complete(submission);
        }
        completed
    }

    /// Submissions committed but not completed (manual mode).
    #[must_use]
    pub fn pending_submissions(&self) -> usize {
        self.pending.lock().len()
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn counters(&self) -> HeadlessCounters {
        *self.shared.counters.lock()
    }

    /// The last presented image.
    #[must_use]
    pub fn last_presented(&self) -> Option<PresentedFrame> {
        self.shared.last_presented.lock().clone()
    }

    /// Swapchain images currently lent out.
    #[must_use]
    pub fn drawables_in_use(&self) -> usize {
        self.swapchain
            .lock()
            .images
            .iter()
            .filter(|image| image.busy.load(Ordering::Acquire))
            .count()
    }

    /// Makes texture and buffer creation fail.
    pub fn set_fail_texture_creation(&self, fail: bool) {
        self.fail_textures.store(fail, Ordering::SeqCst);
    }

    /// Makes command buffer creation fail.
    pub fn set_fail_command_buffers(&self, fail: bool) {
        self.fail_command_buffers.store(fail, Ordering::SeqCst);
    }

    /// Makes `next_drawable` return `None`.
    pub fn set_starve_drawables(&self, starve: bool) {
        self.starve_drawables.store(starve, Ordering::SeqCst);
    }

    fn check_allocation(&self, resource: &'static str) -> PipelineResult<()> {
        if self.fail_textures.load(Ordering::SeqCst) {
            Err(PipelineError::resource(resource, "injected allocation failure"))
        } else {
            Ok(())
        }
    }
}

impl GpuDevice for HeadlessDevice {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn supports_zero_copy(&self) -> bool {
        self.config.zero_copy
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> PipelineResult<Texture> {
        self.check_allocation("texture")?;
        if descriptor.size.is_empty() {
            return Err(PipelineError::resource("texture", "zero-sized texture"));
        }
        let texture = Texture::try_new_private(GraphicsApi::Modern, *descriptor).ok_or_else(|| {
            PipelineError::resource("texture", format!("unsupported size {}", descriptor.size))
        })?;
        self.shared.counters.lock().textures_created += 1;
        Ok(texture)
    }

    fn create_shared_buffer(
        &self,
        size: IntSize,
        format: TextureFormat,
    ) -> PipelineResult<SharedPixelBuffer> {
        self.check_allocation("shared buffer")?;
        if size.is_empty() {
            return Err(PipelineError::resource("shared buffer", "zero-sized buffer"));
        }
        let buffer = SharedPixelBuffer::try_new(size, format.bytes_per_pixel()).ok_or_else(|| {
            PipelineError::resource("shared buffer", format!("unsupported size {size}"))
        })?;
        self.shared.counters.lock().shared_buffers_created += 1;
        Ok(buffer)
    }

    fn wrap_shared_buffer(
        &self,
        buffer: &SharedPixelBuffer,
        descriptor: &TextureDescriptor,
    ) -> PipelineResult<Texture> {
        self.check_allocation("texture cache")?;
        if buffer.size() != descriptor.size
            || buffer.bytes_per_pixel() != descriptor.format.bytes_per_pixel()
        {
            return Err(PipelineError::resource(
                "texture cache",
                format!(
                    "buffer {} does not match descriptor {}",
                    buffer.size(),
                    descriptor.size
                ),
            ));
        }
        Ok(Texture::new(
            GraphicsApi::Modern,
            *descriptor,
            TextureStorage::Shared(buffer.clone()),
        ))
    }

    fn write_texture(
        &self,
        texture: &Texture,
        origin: IntPoint,
        size: IntSize,
        bytes: &[u8],
        bytes_per_row: usize,
    ) -> PipelineResult<()> {
        if !texture.storage().write_rect(origin, size, bytes, bytes_per_row) {
            return Err(PipelineError::UnreadableFrame(format!(
                "upload of {size} at pitch {bytes_per_row} does not fit texture {}",
                texture.size()
            )));
        }
        self.shared.counters.lock().uploads += 1;
        Ok(())
    }

    fn make_command_buffer(&self, label: &'static str) -> PipelineResult<CommandBuffer> {
        if self.fail_command_buffers.load(Ordering::SeqCst) {
            return Err(PipelineError::resource(
                "command buffer",
                "injected queue exhaustion",
            ));
        }
        Ok(CommandBuffer::new(label))
    }

    fn commit(&self, buffer: CommandBuffer) {
        let (commands, handlers) = buffer.into_parts();
        let submission = Submission {
            commands,
            handlers,
            age: 0,
        };
        self.shared.counters.lock().committed += 1;

        match self.config.completion {
            CompletionMode::Threaded { .. } => {
                if let Some(worker) = &self.worker {
                    // A closed channel means the device is being torn down.
                    let _ = worker.send(WorkItem::Submit(submission));
                }
            }
            CompletionMode::Manual { latency_frames: 0 } => self.shared.complete(submission),
            CompletionMode::Manual { .. } => self.pending.lock().push_back(submission),
        }
    }

    fn set_drawable_size(&self, size: IntSize) {
        let mut swapchain = self.swapchain.lock();
        if swapchain.size != size {
            swapchain.rebuild(size, self.config.swapchain_images);
        }
    }

    fn drawable_size(&self) -> IntSize {
        self.swapchain.lock().size
    }

    fn next_drawable(&self) -> Option<Drawable> {
        let starved = self.starve_drawables.load(Ordering::SeqCst);
        let mut swapchain = self.swapchain.lock();
        let count = swapchain.images.len();
        let start = swapchain.next;

        let free = (!starved)
            .then(|| {
                (0..count)
                    .map(|offset| (start + offset) % count)
                    .find(|&i| !swapchain.images[i].busy.swap(true, Ordering::AcqRel))
            })
            .flatten();

        let Some(index) = free else {
            drop(swapchain);
            self.shared.counters.lock().drawable_starvations += 1;
            return None;
        };

        swapchain.next = (index + 1) % count;
        let image = &swapchain.images[index];
        let busy = Arc::clone(&image.busy);
        let drawable = Drawable::new(
            image.id,
            image.texture.clone(),
            Box::new(move || busy.store(false, Ordering::Release)),
        );
        drop(swapchain);

        self.shared.counters.lock().drawables_acquired += 1;
        Some(drawable)
    }

    fn wait_idle(&self) {
        match self.config.completion {
            CompletionMode::Manual { .. } => {
                let drained: Vec<Submission> = self.pending.lock().drain(..).collect();
                for submission in drained {
                    self.shared.complete(submission);
                }
            }
            CompletionMode::Threaded { .. } => {
                if let Some(worker) = &self.worker {
                    let (ack, done) = crossbeam_channel::bounded(1);
                    if worker.send(WorkItem::Barrier(ack)).is_ok() {
                        let _ = done.recv();
                    }
                }
            }
        }
    }
}

impl Drop for HeadlessDevice {
    fn drop(&mut self) {
        // Closing the channel ends the worker once queued work is done.
        self.worker = None;
        if let Some(handle) = self.worker_handle.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn manual(latency_frames: u32) -> HeadlessDevice {
        HeadlessDevice::new(HeadlessConfig {
            completion: CompletionMode::Manual { latency_frames },
            ..HeadlessConfig::default()
        })
    }

    fn counting_buffer(device: &HeadlessDevice, fired: &Arc<AtomicUsize>) -> CommandBuffer {
        let mut cb = device.make_command_buffer("test").unwrap();
        let fired = Arc::clone(fired);
        cb.add_completed_handler(move || {
            fired.fetch_add(1, Ordering::SeqCst);
        });
        cb
    }

    #[test]
    fn test_manual_latency() {
        let device = manual(2);
        let fired = Arc::new(AtomicUsize::new(0));
        device.commit(counting_buffer(&device, &fired));

        assert_eq!(device.advance_frame(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(device.advance_frame(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(device.pending_submissions(), 0);
    }

    #[test]
    fn test_zero_latency_completes_at_commit() {
        let device = manual(0);
        let fired = Arc::new(AtomicUsize::new(0));
        device.commit(counting_buffer(&device, &fired));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_threaded_completion_and_barrier() {
        let device = HeadlessDevice::new(HeadlessConfig {
            completion: CompletionMode::Threaded {
                latency: Duration::from_millis(1),
            },
            ..HeadlessConfig::default()
        });
        let fired = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            device.commit(counting_buffer(&device, &fired));
        }
        device.wait_idle();
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert_eq!(device.counters().completed, 3);
    }

    #[test]
    fn test_swapchain_exhaustion_and_release() {
        let device = HeadlessDevice::new(HeadlessConfig {
            swapchain_images: 2,
            ..HeadlessConfig::default()
        });
        let a = device.next_drawable().unwrap();
        let b = device.next_drawable().unwrap();
        assert_ne!(a.id(), b.id());
        assert!(device.next_drawable().is_none());
        assert_eq!(device.drawables_in_use(), 2);

        drop(a);
        assert!(device.next_drawable().is_some());
        assert_eq!(device.counters().drawable_starvations, 1);
    }

    #[test]
    fn test_present_records_frame() {
        let device = manual(0);
        device.set_drawable_size(IntSize::new(4, 4));
        let drawable = device.next_drawable().unwrap();
        let mut cb = device.make_command_buffer("frame").unwrap();
        let encoder = cb.render_encoder(drawable.texture(), [0.0, 0.0, 1.0, 1.0]);
        encoder.end_encoding();
        cb.present_after_minimum_duration(drawable, Duration::from_millis(16));
        device.commit(cb);

        let frame = device.last_presented().unwrap();
        assert_eq!(frame.size, IntSize::new(4, 4));
        assert_eq!(&frame.pixels[..4], &[0xFF, 0, 0, 0xFF]);
        assert_eq!(frame.min_duration, Some(Duration::from_millis(16)));
        assert_eq!(device.drawables_in_use(), 0);
    }

    #[test]
    fn test_impossible_sizes_are_resource_errors() {
        let device = manual(0);
        let huge = IntSize::new(u32::MAX, u32::MAX);
        let desc = TextureDescriptor::new("t", huge, TextureFormat::Bgra8Unorm, TextureUsage::SAMPLED);

        assert!(device.create_texture(&desc).unwrap_err().is_fatal());
        let err = device
            .create_shared_buffer(huge, TextureFormat::Bgra8Unorm)
            .unwrap_err();
        assert!(matches!(err, PipelineError::ResourceCreation { resource: "shared buffer", .. }));
        assert_eq!(device.counters().textures_created, 0);
        assert_eq!(device.counters().shared_buffers_created, 0);
    }

    #[test]
    fn test_fault_injection() {
        let device = manual(0);
        device.set_fail_texture_creation(true);
        let desc = TextureDescriptor::new(
            "t",
            IntSize::new(4, 4),
            TextureFormat::Bgra8Unorm,
            TextureUsage::SAMPLED,
        );
        assert!(device.create_texture(&desc).unwrap_err().is_fatal());
        device.set_fail_command_buffers(true);
        assert!(device.make_command_buffer("x").unwrap_err().is_fatal());
        device.set_starve_drawables(true);
        assert!(device.next_drawable().is_none());
    }
}
