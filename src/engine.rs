use crate::config::PetalSonicWorldDesc;
use crate::error::{PetalSonicError, Result};
use crate::renderer::SpatialRenderer;
use crate::spatial::Panner;
use crossbeam_channel::{SendError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

type RenderParts = (SpatialRenderer, Box<dyn Panner + Send>);
type RenderBody = Box<dyn FnOnce() -> Option<RenderParts> + Send>;

/// Clears the running flag when the render thread exits, including by panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Render loop that drives a [`SpatialRenderer`] on a dedicated thread.
///
/// The thread renders one block per block period of the world configuration.
/// Stopping the engine joins the thread and hands the renderer and panner back
/// to the engine, so it can be started again.
pub struct PetalSonicEngine {
    desc: PetalSonicWorldDesc,
    parts: Option<RenderParts>,
    thread: Option<JoinHandle<Option<RenderParts>>>,
    is_running: Arc<AtomicBool>,
    blocks_rendered: Arc<AtomicU64>,
    overruns: Arc<AtomicU64>,
}

impl PetalSonicEngine {
    /// Create a new engine around a renderer and the panner it feeds
    pub fn new<P>(desc: PetalSonicWorldDesc, renderer: SpatialRenderer, panner: P) -> Result<Self>
    where
        P: Panner + Send + 'static,
    {
        desc.validate()?;
        Ok(Self {
            desc,
            parts: Some((renderer, Box::new(panner))),
            thread: None,
            is_running: Arc::new(AtomicBool::new(false)),
            blocks_rendered: Arc::new(AtomicU64::new(0)),
            overruns: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Start the render thread
    pub fn start(&mut self) -> Result<()> {
        self.start_with(|body| {
            std::thread::Builder::new()
                .name("petalsonic-render".into())
                .spawn(body)
        })
    }

    fn start_with<S>(&mut self, spawn: S) -> Result<()>
    where
        S: FnOnce(RenderBody) -> std::io::Result<JoinHandle<Option<RenderParts>>>,
    {
        if let Some(thread) = &self.thread {
            if self.is_running.load(Ordering::Acquire) && !thread.is_finished() {
                return Ok(());
            }
            // The thread is exiting without stop(), so it panicked. Surface that.
            self.stop()?;
        }

        let parts = self
            .parts
            .take()
            .ok_or_else(|| PetalSonicError::Engine("Renderer is not available".into()))?;

        let period = self.desc.block_period();
        let is_running = self.is_running.clone();
        let blocks_rendered = self.blocks_rendered.clone();
        let overruns = self.overruns.clone();

        log::info!(
            "Starting render thread (block_size: {}, period: {:?})",
            self.desc.block_size,
            period
        );

        // The parts travel over a channel so they are still ours if spawning fails.
        let (parts_tx, parts_rx) = bounded::<RenderParts>(1);
        self.is_running.store(true, Ordering::Release);
        let body: RenderBody = Box::new(move || {
            let _running = RunningGuard(is_running.clone());
            let (mut renderer, mut panner) = parts_rx.recv().ok()?;
            let mut deadline = Instant::now();
            while is_running.load(Ordering::Acquire) {
                let started = Instant::now();
                renderer.render_block(panner.as_mut());
                blocks_rendered.fetch_add(1, Ordering::Relaxed);
                if started.elapsed() > period {
                    overruns.fetch_add(1, Ordering::Relaxed);
                }

                let now = Instant::now();
                match deadline.checked_add(period) {
                    Some(next) if next > now => {
                        deadline = next;
                        std::thread::sleep(next - now);
                    }
                    // Fell behind; don't try to catch up with a burst of blocks.
                    _ => deadline = now,
                }
            }
            Some((renderer, panner))
        });

        let thread = match spawn(body) {
            Ok(thread) => thread,
            Err(e) => {
                self.is_running.store(false, Ordering::Release);
                self.parts = Some(parts);
                return Err(PetalSonicError::Engine(format!(
                    "Failed to spawn render thread: {}",
                    e
                )));
            }
        };

        if let Err(SendError(parts)) = parts_tx.send(parts) {
            // The thread is gone before it took the parts.
            self.is_running.store(false, Ordering::Release);
            self.parts = Some(parts);
            let _ = thread.join();
            return Err(PetalSonicError::Engine("Render thread exited on startup".into()));
        }

        self.thread = Some(thread);
        Ok(())
    }

    /// Stop the render thread and wait for the in-flight block to finish
    pub fn stop(&mut self) -> Result<()> {
        self.is_running.store(false, Ordering::Release);
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        match thread.join() {
            Ok(parts) => self.parts = parts,
            Err(_) => {
                log::error!("Render thread panicked");
                return Err(PetalSonicError::Engine("Render thread panicked".into()));
            }
        }

        let overruns = self.overruns.load(Ordering::Relaxed);
        if overruns > 0 {
            log::warn!("{} blocks exceeded the block period", overruns);
        }
        log::info!(
            "Render thread stopped after {} blocks",
            self.blocks_rendered.load(Ordering::Relaxed)
        );
        Ok(())
    }

    /// Check if the render thread is currently running
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Blocks rendered since the engine was created
    pub fn blocks_rendered(&self) -> u64 {
        self.blocks_rendered.load(Ordering::Relaxed)
    }

    /// Blocks whose processing took longer than one block period
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Access the renderer while the engine is stopped
    pub fn renderer(&self) -> Option<&SpatialRenderer> {
        self.parts.as_ref().map(|(renderer, _)| renderer)
    }

    /// Get the engine configuration
    pub fn config(&self) -> &PetalSonicWorldDesc {
        &self.desc
    }
}

impl Drop for PetalSonicEngine {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Unattenuated;
    use crate::math::Vec3;
    use crate::registry::ObjectHandle;
    use crate::spatial::PannerInput;
    use crate::world::PetalSonicWorld;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn fast_desc() -> PetalSonicWorldDesc {
        // 1 ms blocks
        PetalSonicWorldDesc::default()
            .block_size(48)
            .max_objects(8)
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..500 {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_engine_renders_and_restarts() {
        let _ = env_logger::builder().is_test(true).try_init();

        let world = PetalSonicWorld::new(fast_desc()).unwrap();
        let renderer = world.create_renderer(Arc::new(Unattenuated)).unwrap();
        let (_, source) = world.create_source3d().unwrap();
        source.set_position(Vec3::new(0.0, 0.0, 3.0)).unwrap();

        let panned = Arc::new(AtomicUsize::new(0));
        let counter = panned.clone();
        let panner = move |_: ObjectHandle, _: &PannerInput| {
            counter.fetch_add(1, Ordering::Relaxed);
        };

        let mut engine = PetalSonicEngine::new(fast_desc(), renderer, panner).unwrap();
        engine.start().unwrap();
        assert!(engine.is_running());
        assert!(engine.renderer().is_none());
        assert!(wait_until(|| panned.load(Ordering::Relaxed) >= 5));
        engine.stop().unwrap();
        assert!(!engine.is_running());

        let output = source.last_output();
        assert!((output.elevation - 90.0).abs() < 1e-9);
        assert!((output.distance - 3.0).abs() < 1e-9);

        let blocks = engine.blocks_rendered();
        assert!(blocks >= 5);
        assert_eq!(engine.renderer().map(|r| r.blocks_rendered()), Some(blocks));

        engine.start().unwrap();
        assert!(wait_until(|| engine.blocks_rendered() > blocks));
        engine.stop().unwrap();
    }

    #[test]
    fn test_destroyed_object_reclaimed_while_running() {
        let world = PetalSonicWorld::new(fast_desc().max_objects(1)).unwrap();
        let renderer = world.create_renderer(Arc::new(Unattenuated)).unwrap();
        let mut engine =
            PetalSonicEngine::new(fast_desc(), renderer, |_: ObjectHandle, _: &PannerInput| {})
                .unwrap();
        engine.start().unwrap();

        let (handle, _) = world.create_source3d().unwrap();
        world.destroy(handle).unwrap();
        assert!(wait_until(|| {
            world.reclaim();
            world.object_count() == 0
        }));
        assert_eq!(world.create_source3d().unwrap().0, handle);

        engine.stop().unwrap();
    }

    struct FailingPanner;

    impl Panner for FailingPanner {
        fn pan(&mut self, handle: ObjectHandle, _input: &PannerInput) {
            panic!("cannot pan {}", handle);
        }
    }

    #[test]
    fn test_panicking_panner_stops_engine() {
        let world = PetalSonicWorld::new(fast_desc()).unwrap();
        let renderer = world.create_renderer(Arc::new(Unattenuated)).unwrap();
        world.create_source3d().unwrap();

        let mut engine = PetalSonicEngine::new(fast_desc(), renderer, FailingPanner).unwrap();
        engine.start().unwrap();
        assert!(wait_until(|| !engine.is_running()));

        assert!(matches!(engine.start(), Err(PetalSonicError::Engine(_))));
        assert!(!engine.is_running());
        assert!(engine.start().is_err());
        assert!(engine.stop().is_ok());
    }

    #[test]
    fn test_failed_spawn_keeps_renderer() {
        let world = PetalSonicWorld::new(fast_desc()).unwrap();
        let renderer = world.create_renderer(Arc::new(Unattenuated)).unwrap();
        let mut engine =
            PetalSonicEngine::new(fast_desc(), renderer, |_: ObjectHandle, _: &PannerInput| {})
                .unwrap();

        let result = engine.start_with(|_| Err(std::io::Error::other("no threads left")));
        assert!(matches!(result, Err(PetalSonicError::Engine(_))));
        assert!(!engine.is_running());
        assert!(engine.renderer().is_some());

        engine.start().unwrap();
        assert!(wait_until(|| engine.blocks_rendered() > 0));
        engine.stop().unwrap();
    }

    #[test]
    fn test_stop_without_start() {
        let world = PetalSonicWorld::new(fast_desc()).unwrap();
        let renderer = world.create_renderer(Arc::new(Unattenuated)).unwrap();
        let mut engine =
            PetalSonicEngine::new(fast_desc(), renderer, |_: ObjectHandle, _: &PannerInput| {})
                .unwrap();
        assert!(engine.stop().is_ok());
        assert_eq!(engine.blocks_rendered(), 0);
    }
}
