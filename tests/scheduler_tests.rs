//! Integration tests for the scheduler driving bindings against a mock clock

mod common;

use common::{MockTimeSource, init_tracing, pixels_close, unit_with};
use image::Rgba;
use led_animator::effects::{On, Wait};
use led_animator::frame_queue::{QueueSink, SinkPump, latest_frame_channel};
use led_animator::{
    AnimSequence, AnimationConfig, AnimationUnit, Binding, Effect, Error, InMemorySink, Palette,
    PixelChain, Result, Scheduler, SchedulerConfig, SinkConfig, StepContext, TimeSource, UnitState,
    colors, shared_chain, shared_sequence,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Effect that counts its steps and records the largest tick seen.
struct CountingEffect {
    steps: Arc<AtomicU32>,
    max_tick: Arc<AtomicU32>,
}

impl Effect for CountingEffect {
    fn kind(&self) -> &'static str {
        "counting"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        self.steps.fetch_add(1, Ordering::SeqCst);
        self.max_tick.fetch_max(ctx.tick(), Ordering::SeqCst);
        Ok(())
    }
}

fn scheduler(
    fps: u32,
    width: u32,
    height: u32,
) -> (Scheduler<InMemorySink, MockTimeSource>, InMemorySink, MockTimeSource) {
    let sink = InMemorySink::new();
    let clock = MockTimeSource::new();
    let scheduler =
        Scheduler::new(SchedulerConfig::new(fps, width, height), sink.clone(), clock.clone())
            .unwrap();
    (scheduler, sink, clock)
}

fn solid_unit(name: &str, color: colors::Color) -> AnimationUnit {
    let config = AnimationConfig::builder().name(name).fps(50).duration(60.0).build().unwrap();
    AnimationUnit::new(config, Box::new(On))
        .unwrap()
        .with_palette(Arc::new(Palette::new(vec![color]).unwrap()))
}

#[test]
fn start_pause_then_steps_until_duration_expires() {
    init_tracing();
    let steps = Arc::new(AtomicU32::new(0));
    let max_tick = Arc::new(AtomicU32::new(0));
    let config = AnimationConfig::builder()
        .fps(50)
        .duration(5.0)
        .start_pause(1.0)
        .build()
        .unwrap();
    let unit = AnimationUnit::new(
        config,
        Box::new(CountingEffect {
            steps: steps.clone(),
            max_tick: max_tick.clone(),
        }),
    )
    .unwrap();
    let sequence = shared_sequence(AnimSequence::new(vec![unit]).unwrap());

    let (mut scheduler, _sink, clock) = scheduler(50, 4, 4);
    scheduler.add_binding(Binding::new(sequence.clone()));

    for _ in 0..50 {
        scheduler.render_frame().unwrap();
        clock.advance_ms(19);
    }
    assert!(clock.now() < Duration::from_secs(1));
    assert_eq!(steps.load(Ordering::SeqCst), 0);

    clock.set(Duration::from_secs(1));
    for _ in 0..200 {
        scheduler.render_frame().unwrap();
        clock.advance_ms(20);
    }
    assert_eq!(steps.load(Ordering::SeqCst), 200);
    assert!(max_tick.load(Ordering::SeqCst) < 50);

    // the single unit is restarted and sits in its start pause again
    clock.set(Duration::from_secs(5));
    scheduler.render_frame().unwrap();
    clock.set(Duration::from_millis(5500));
    scheduler.render_frame().unwrap();
    assert_eq!(steps.load(Ordering::SeqCst), 200);
    let guard = sequence.lock().unwrap();
    assert_eq!(guard.units()[0].state(), UnitState::StartPaused);
}

#[test]
fn three_unit_sequence_rotates_indefinitely() {
    let sequence = shared_sequence(
        AnimSequence::builder()
            .unit(unit_with("a", 20, 2.0, Box::new(Wait)))
            .unit(unit_with("b", 20, 2.0, Box::new(Wait)))
            .unit(unit_with("c", 20, 2.0, Box::new(Wait)))
            .build()
            .unwrap(),
    );
    let (mut scheduler, _sink, clock) = scheduler(20, 2, 2);
    let binding = scheduler.add_binding(Binding::new(sequence));

    let mut order = Vec::new();
    for second in 0..13u64 {
        clock.set(Duration::from_secs(second));
        scheduler.render_frame().unwrap();
        if second % 2 == 0 {
            order.push(scheduler.bindings()[binding].current_index().unwrap());
        }
    }
    assert_eq!(order, [0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn later_bindings_draw_on_top() {
    let (mut scheduler, sink, _clock) = scheduler(50, 3, 1);

    let under = shared_chain(PixelChain::new(&[(0.0, 0.0), (1.0, 0.0)], None).unwrap());
    let over = shared_chain(PixelChain::new(&[(1.0, 0.0)], None).unwrap());
    scheduler.add_binding(Binding::with_chain(
        shared_sequence(AnimSequence::new(vec![solid_unit("under", colors::RED)]).unwrap()),
        under,
    ));
    scheduler.add_binding(Binding::with_chain(
        shared_sequence(AnimSequence::new(vec![solid_unit("over", colors::BLUE)]).unwrap()),
        over,
    ));

    scheduler.render_frame().unwrap();
    let frame = sink.last_frame().unwrap();
    assert_eq!(*frame.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    assert_eq!(*frame.get_pixel(1, 0), Rgba([0, 0, 255, 255]));
    assert_eq!(*frame.get_pixel(2, 0), Rgba([0, 0, 0, 255]));
}

#[test]
fn half_transparent_chain_blends_over_lower_layer() {
    let (mut scheduler, sink, _clock) = scheduler(50, 1, 1);
    let top = shared_chain(PixelChain::new(&[(0.0, 0.0)], None).unwrap());

    scheduler.add_binding(Binding::with_chain(
        shared_sequence(AnimSequence::new(vec![solid_unit("base", colors::RED)]).unwrap()),
        shared_chain(PixelChain::new(&[(0.0, 0.0)], None).unwrap()),
    ));
    scheduler.add_binding(Binding::with_chain(
        shared_sequence(AnimSequence::new(vec![solid_unit("tint", colors::BLUE)]).unwrap()),
        top.clone(),
    ));

    scheduler.render_frame().unwrap();
    top.lock().unwrap().set_chain_alpha(0.5f32.sqrt());
    scheduler.render_frame().unwrap();

    let pixel = *sink.last_frame().unwrap().get_pixel(0, 0);
    assert!(pixels_close(pixel, Rgba([128, 0, 128, 255]), 1), "{pixel:?}");
}

#[test]
fn control_reset_restarts_every_binding() {
    let sequence = shared_sequence(
        AnimSequence::new(vec![
            unit_with("first", 20, 1.0, Box::new(Wait)),
            unit_with("second", 20, 1.0, Box::new(Wait)),
        ])
        .unwrap(),
    );
    let (mut scheduler, _sink, clock) = scheduler(20, 2, 2);
    scheduler.add_binding(Binding::new(sequence));

    scheduler.render_frame().unwrap();
    clock.set(Duration::from_millis(1500));
    scheduler.render_frame().unwrap();
    assert_eq!(scheduler.bindings()[0].current_index(), Some(1));

    assert!(scheduler.control().request_reset());
    scheduler.render_frames(1).unwrap();
    assert_eq!(scheduler.bindings()[0].current_index(), Some(0));
}

#[test]
fn missing_palette_stops_the_scheduler() {
    let config = AnimationConfig::builder().fps(50).build().unwrap();
    let unit = AnimationUnit::new(config, Box::new(On)).unwrap();
    let (mut scheduler, _sink, _clock) = scheduler(50, 2, 2);
    scheduler.add_binding(Binding::with_chain(
        shared_sequence(AnimSequence::new(vec![unit]).unwrap()),
        shared_chain(PixelChain::new(&[(0.0, 0.0)], None).unwrap()),
    ));
    assert!(matches!(scheduler.render_frame(), Err(Error::Configuration(_))));
}

#[test]
fn scheduler_feeds_display_through_frame_queue() {
    init_tracing();
    let display = InMemorySink::new().keep_last(8);
    let (publisher, receiver) = latest_frame_channel();
    let pump = SinkPump::spawn(
        display.clone(),
        receiver,
        SinkConfig {
            width: 2,
            height: 1,
            fps: 100,
        },
    )
    .unwrap();

    let config = SchedulerConfig::new(100, 2, 1).with_background(colors::GREEN);
    let scheduler =
        Scheduler::new(config, QueueSink::new(publisher), MockTimeSource::new()).unwrap();
    let handle = scheduler.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while display.frame_count() < 2 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    handle.stop().unwrap();
    pump.stop().unwrap();

    assert!(display.frame_count() >= 2);
    let last = display.last_frame().unwrap();
    assert_eq!(*last.get_pixel(1, 0), colors::GREEN.opaque());
}
