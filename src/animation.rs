//! Frame-stepped colour animations
//!
//! An animation is a precomputed list of frames played at a fixed interval.
//! Playback is cooperative: the caller's thread draws a frame, checks the
//! stop signal, then sleeps through an injectable [`Sleeper`]. Stopping
//! leaves the plane as of the last completed frame.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::color::{gradient, ColorChannel};
use crate::compositor::{Compositor, PlaneContent};
use crate::error::Result;

/// Cancellation flag shared between a running animation and its owner
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag so the signal can be reused
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Waits between frames
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Blocks the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// How playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationOutcome {
    Completed { frames: usize },
    Stopped { frames: usize },
}

impl AnimationOutcome {
    pub fn frames(self) -> usize {
        match self {
            AnimationOutcome::Completed { frames } | AnimationOutcome::Stopped { frames } => frames,
        }
    }
}

/// A sequence of colours shown one after another
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    frames: Vec<ColorChannel>,
    interval: Duration,
}

impl Animation {
    pub fn new(frames: Vec<ColorChannel>, interval: Duration) -> Self {
        Self { frames, interval }
    }

    /// `color` with its alpha moving from `from_alpha` to `to_alpha`
    ///
    /// Alpha is only honoured by transparent planes; an opaque plane draws
    /// every frame at full strength, so a fade there shows no change.
    pub fn fade(
        color: ColorChannel,
        from_alpha: u8,
        to_alpha: u8,
        steps: usize,
        interval: Duration,
    ) -> Self {
        Self::new(
            gradient(color.with_alpha(from_alpha), color.with_alpha(to_alpha), steps),
            interval,
        )
    }

    /// Sweep from `start` to `end`
    pub fn gradient(
        start: ColorChannel,
        end: ColorChannel,
        steps: usize,
        interval: Duration,
    ) -> Self {
        Self::new(gradient(start, end, steps), interval)
    }

    pub fn frames(&self) -> &[ColorChannel] {
        &self.frames
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Play every frame through `step`
    ///
    /// The stop signal is checked before each frame and again before each
    /// sleep. An error from `step` ends playback and is returned.
    pub fn run<F>(
        &self,
        sleeper: &mut dyn Sleeper,
        stop: &StopSignal,
        mut step: F,
    ) -> Result<AnimationOutcome>
    where
        F: FnMut(usize, ColorChannel) -> Result<()>,
    {
        let last = self.frames.len().saturating_sub(1);
        for (n, &color) in self.frames.iter().enumerate() {
            if stop.is_stopped() {
                debug!(frames = n, "animation stopped");
                return Ok(AnimationOutcome::Stopped { frames: n });
            }
            step(n, color)?;
            if n == last {
                break;
            }
            if stop.is_stopped() {
                debug!(frames = n + 1, "animation stopped");
                return Ok(AnimationOutcome::Stopped { frames: n + 1 });
            }
            sleeper.sleep(self.interval);
        }
        Ok(AnimationOutcome::Completed {
            frames: self.frames.len(),
        })
    }
}

impl Compositor {
    /// Play `animation` as the fill colour of plane `id`, rendering each frame
    ///
    /// Fades need the plane to be created with `transparent(true)`.
    pub fn animate_fill<W: Write>(
        &mut self,
        id: &str,
        animation: &Animation,
        out: &mut W,
        sleeper: &mut dyn Sleeper,
        stop: &StopSignal,
    ) -> Result<AnimationOutcome> {
        animation.run(sleeper, stop, |_, color| {
            self.set_content(id, PlaneContent::Fill(color))?;
            self.render_all(out)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::{StaticCapabilities, TerminalCapabilities};
    use crate::compositor::PlaneSpec;
    use crate::config::GraphicsConfig;
    use crate::error::GraphicsError;

    /// Records requested sleeps and optionally fires a stop signal
    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Vec<Duration>,
        stop_after: Option<(usize, StopSignal)>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.sleeps.push(duration);
            if let Some((n, signal)) = &self.stop_after {
                if self.sleeps.len() == *n {
                    signal.stop();
                }
            }
        }
    }

    const MS: Duration = Duration::from_millis(16);

    #[test]
    fn test_fade_frames() {
        let anim = Animation::fade(ColorChannel::rgb(10, 20, 30), 0, 255, 5, MS);
        assert_eq!(anim.len(), 5);
        assert_eq!(anim.frames()[0].a, 0);
        assert_eq!(anim.frames()[4], ColorChannel::rgb(10, 20, 30));
    }

    #[test]
    fn test_run_completes_without_trailing_sleep() {
        let anim = Animation::gradient(ColorChannel::BLACK, ColorChannel::WHITE, 3, MS);
        let mut sleeper = RecordingSleeper::default();
        let mut seen = Vec::new();
        let outcome = anim
            .run(&mut sleeper, &StopSignal::new(), |n, c| {
                seen.push((n, c));
                Ok(())
            })
            .unwrap();
        assert_eq!(outcome, AnimationOutcome::Completed { frames: 3 });
        assert_eq!(seen.len(), 3);
        assert_eq!(sleeper.sleeps, vec![MS, MS]);
    }

    #[test]
    fn test_stop_before_next_sleep() {
        let anim = Animation::gradient(ColorChannel::BLACK, ColorChannel::WHITE, 10, MS);
        let stop = StopSignal::new();
        let mut sleeper = RecordingSleeper {
            sleeps: Vec::new(),
            stop_after: Some((2, stop.clone())),
        };
        let outcome = anim.run(&mut sleeper, &stop, |_, _| Ok(())).unwrap();
        assert_eq!(outcome, AnimationOutcome::Stopped { frames: 2 });
        assert_eq!(sleeper.sleeps.len(), 2);
    }

    #[test]
    fn test_pre_stopped_runs_nothing() {
        let anim = Animation::gradient(ColorChannel::BLACK, ColorChannel::WHITE, 4, MS);
        let stop = StopSignal::new();
        stop.stop();
        let outcome = anim.run(&mut ThreadSleeper, &stop, |_, _| Ok(())).unwrap();
        assert_eq!(outcome.frames(), 0);
        stop.reset();
        assert!(!stop.is_stopped());
    }

    #[test]
    fn test_animate_fill_keeps_last_frame() {
        let mut caps = TerminalCapabilities::conservative();
        caps.color_bits = 24;
        let mut comp = Compositor::new(
            Box::new(StaticCapabilities(caps)),
            GraphicsConfig::default(),
        );
        comp.create_plane(PlaneSpec::new("p", 0, 0, 1, 1)).unwrap();

        let anim = Animation::gradient(ColorChannel::BLACK, ColorChannel::WHITE, 5, MS);
        let stop = StopSignal::new();
        let mut sleeper = RecordingSleeper {
            sleeps: Vec::new(),
            stop_after: Some((3, stop.clone())),
        };
        let mut out = Vec::new();
        let outcome = comp
            .animate_fill("p", &anim, &mut out, &mut sleeper, &stop)
            .unwrap();
        assert_eq!(outcome, AnimationOutcome::Stopped { frames: 3 });
        assert_eq!(
            comp.get("p").unwrap().content(),
            &PlaneContent::Fill(anim.frames()[2])
        );
    }

    #[test]
    fn test_fade_needs_transparent_plane() {
        let mut caps = TerminalCapabilities::conservative();
        caps.color_bits = 24;
        let mut comp = Compositor::new(
            Box::new(StaticCapabilities(caps)),
            GraphicsConfig::default(),
        );
        comp.create_plane(PlaneSpec::new("base", 0, 0, 1, 1)).unwrap();
        comp.set_content("base", PlaneContent::Fill(ColorChannel::BLACK))
            .unwrap();
        comp.create_plane(PlaneSpec::new("veil", 0, 0, 1, 1).z_index(1))
            .unwrap();
        let fade = Animation::fade(ColorChannel::WHITE, 0, 128, 2, MS);
        let (mut sleeper, stop) = (RecordingSleeper::default(), StopSignal::new());

        let mut opaque = Vec::new();
        comp.animate_fill("veil", &fade, &mut opaque, &mut sleeper, &stop)
            .unwrap();
        let opaque = String::from_utf8_lossy(&opaque);
        assert!(!opaque.contains("48;2;128;128;128"));
        assert_eq!(opaque.matches("48;2;255;255;255").count(), 2);

        comp.destroy_plane("veil");
        comp.create_plane(PlaneSpec::new("veil", 0, 0, 1, 1).z_index(1).transparent(true))
            .unwrap();
        let mut blended = Vec::new();
        comp.animate_fill("veil", &fade, &mut blended, &mut sleeper, &stop)
            .unwrap();
        let blended = String::from_utf8_lossy(&blended);
        assert!(blended.contains("48;2;128;128;128"));
        assert!(!blended.contains("48;2;255;255;255"));
    }

    #[test]
    fn test_animate_missing_plane() {
        let mut comp = Compositor::new(
            Box::new(StaticCapabilities::default()),
            GraphicsConfig::default(),
        );
        let anim = Animation::gradient(ColorChannel::BLACK, ColorChannel::WHITE, 2, MS);
        let mut out = Vec::new();
        let err = comp
            .animate_fill("ghost", &anim, &mut out, &mut ThreadSleeper, &StopSignal::new())
            .unwrap_err();
        assert!(matches!(err, GraphicsError::PlaneNotFound(_)));
    }
}
