#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`Scheduler`**: Fixed-rate frame loop that owns the bindings and submits frames
//! - **`Binding`**: A shared `AnimSequence` paired with an optional shared `PixelChain`
//! - **`AnimSequence`**: Non-empty list of `AnimationUnit`s played round-robin by duration
//! - **`AnimationUnit`**: Lifecycle state machine (pauses, looping, duration) around one `Effect`
//! - **`Effect`**: Trait to implement for custom visuals; built-ins live in [`effects`]
//! - **`PixelChain`**: Ordered pixels mapped to display coordinates, optionally anti-aliased
//! - **`Palette`**: Immutable color list read in order or at random
//! - **`DisplaySink`**: Trait to implement for your panel, strip or simulator
//! - **`TimeSource`**: Clock the animation timelines run against
//!
//! Frames are straight-alpha RGBA8 grids ([`image::RgbaImage`]). Each unit draws
//! into its own transparent layer, which is alpha-merged onto the shared frame
//! in binding registration order.

pub mod animation;
pub mod antialias;
pub mod assets;
pub mod binding;
pub mod chain;
pub mod colors;
pub mod command;
pub mod composite;
pub mod config;
pub mod effects;
pub mod error;
pub mod frame;
pub mod frame_queue;
pub mod glyphs;
pub mod palettes;
pub mod scheduler;
pub mod scroller;
pub mod sequence;
pub mod sink;
pub mod time;

pub use animation::{AnimationUnit, Effect, FrameOutcome, MIN_TICK_RATE, StepContext, UnitState};
pub use antialias::{AntiAliasMethod, WeightedPixel};
pub use assets::{ImageAsset, ScaleMode};
pub use binding::{Binding, SharedChain, SharedSequence, shared_chain, shared_sequence};
pub use chain::{LitPixel, PixelChain, PixelSlot};
pub use colors::Color;
pub use command::SchedulerCommand;
pub use config::{AnimationConfig, AnimationConfigBuilder, ImageSpec, SchedulerConfig, UnitSpec};
pub use effects::EffectSpec;
pub use error::{Error, Result, SequenceError};
pub use frame::{FrameBuffer, LayerBuffer};
pub use frame_queue::{FramePublisher, FrameReceiver, QueueSink, SinkPump, latest_frame_channel};
pub use glyphs::{BuiltinFont, FontKind, GlyphSource, open_font};
pub use palettes::{Palette, PaletteCursor, PaletteSpec};
pub use scheduler::{Scheduler, SchedulerControl, SchedulerHandle};
pub use scroller::{ScrollPath, Scroller};
pub use sequence::{AnimSequence, SequenceBuilder};
pub use sink::{DisplaySink, InMemorySink, SinkConfig};
pub use time::{SystemClock, TimeSource};
