//! Shared test infrastructure for led-animator integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use image::Rgba;
use led_animator::{AnimationConfig, AnimationUnit, Effect, TimeSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

// ============================================================================
// Mock Time Source
// ============================================================================

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct MockTimeSource {
    micros: Arc<AtomicU64>,
}

impl MockTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.micros.fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    pub fn set(&self, at: Duration) {
        self.micros.store(at.as_micros() as u64, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

// ============================================================================
// Unit helpers
// ============================================================================

pub fn unit_with(name: &str, fps: u32, duration: f64, effect: Box<dyn Effect>) -> AnimationUnit {
    let config = AnimationConfig::builder()
        .name(name)
        .fps(fps)
        .duration(duration)
        .build()
        .unwrap();
    AnimationUnit::new(config, effect).unwrap()
}

// ============================================================================
// Assertions
// ============================================================================

/// Channel-wise comparison with a tolerance for rounding.
pub fn pixels_close(a: Rgba<u8>, b: Rgba<u8>, tolerance: u8) -> bool {
    a.0.iter().zip(b.0.iter()).all(|(x, y)| x.abs_diff(*y) <= tolerance)
}

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
