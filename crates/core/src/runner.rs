use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::logger;
use crate::platform::{pixel_color, CaptureProvider};
use crate::session::Session;
use crate::sleep::StopSignal;
use crate::types::*;

/// Pause between two color samples.
pub const DEFAULT_COLOR_POLL: Duration = Duration::from_millis(100);

/// What a runner thread gets to see: the provider and the shared session
/// (read-only from here).
#[derive(Clone)]
pub struct RunnerContext {
    pub provider: Arc<dyn CaptureProvider>,
    pub session: Arc<Session>,
    pub color_poll: Duration,
}

impl RunnerContext {
    pub fn new(provider: Arc<dyn CaptureProvider>, session: Arc<Session>) -> Self {
        Self { provider, session, color_poll: DEFAULT_COLOR_POLL }
    }

    pub fn with_color_poll(mut self, poll: Duration) -> Self {
        self.color_poll = poll;
        self
    }
}

struct Active {
    signal: StopSignal,
    handle: JoinHandle<()>,
}

/// Background executor for one macro. `Stopped -> start -> Running -> stop -> Stopped`.
pub struct Runner {
    ctx: RunnerContext,
    active: Option<Active>,
}

impl Runner {
    pub fn new(ctx: RunnerContext) -> Self {
        Self { ctx, active: None }
    }

    pub fn state(&self) -> MacroState {
        match &self.active {
            Some(a) if !a.handle.is_finished() => MacroState::Running,
            _ => MacroState::Stopped,
        }
    }

    /// Launch the loop for `spec`. Returns `false` if it was already running
    /// or the thread could not be spawned.
    pub fn start(&mut self, spec: &MacroSpec) -> bool {
        if self.state() == MacroState::Running {
            logger::info_p(&spec.name, "already running");
            return false;
        }
        // Reap a loop that ended on its own.
        self.stop();

        let color = match spec.condition {
            Condition::Time { .. } => logger::COLOR_GREEN,
            Condition::Color { .. } => logger::COLOR_BLUE,
        };
        logger::register_prefix(&spec.name, color);
        let signal = StopSignal::new();
        let spawned = thread::Builder::new().name(format!("macro-{}", spec.name)).spawn({
            let spec = spec.clone();
            let ctx = self.ctx.clone();
            let signal = signal.clone();
            move || supervise(spec, ctx, signal)
        });

        match spawned {
            Ok(handle) => {
                self.active = Some(Active { signal, handle });
                true
            }
            Err(e) => {
                logger::error_p(&spec.name, &format!("failed to start: {}", e));
                false
            }
        }
    }

    /// Signal the loop and wait for it to finish. Once this returns the macro
    /// fires no more actions. Returns `false` if it was not running.
    pub fn stop(&mut self) -> bool {
        let Some(Active { signal, handle }) = self.active.take() else {
            return false;
        };
        signal.stop();
        if handle.join().is_err() {
            logger::error("macro thread panicked");
        }
        true
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Thread body. A loop that panics or returns without being stopped leaves
/// the macro `Stopped`; say so in the log instead of going quiet.
fn supervise(spec: MacroSpec, ctx: RunnerContext, signal: StopSignal) {
    let name = spec.name.clone();
    let ended = panic::catch_unwind(AssertUnwindSafe(|| run_loop(spec, ctx, signal.clone())));
    match ended {
        Err(cause) => {
            let why = cause
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| cause.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            logger::error_p(&name, &format!("crashed, macro stopped: {}", why));
        }
        Ok(()) if !signal.is_stopped() => logger::error_p(&name, "loop ended without a stop request"),
        Ok(()) => {}
    }
}

fn run_loop(spec: MacroSpec, ctx: RunnerContext, signal: StopSignal) {
    let tag = spec.name.as_str();
    logger::info_p(tag, &format!("started: {}, {}", spec.condition, spec.action));

    match spec.condition {
        Condition::Time { interval_seconds } => {
            while signal.wait_secs(interval_seconds) {
                perform(&spec.action, &ctx, &signal, tag);
            }
        }
        Condition::Color { rgb, sample_point } => {
            while !signal.is_stopped() {
                if sample(&ctx, sample_point) == Some(rgb) {
                    logger::info_p(tag, &format!("{} matched at {}", rgb, sample_point));
                    perform(&spec.action, &ctx, &signal, tag);
                }
                if !signal.wait(ctx.color_poll) {
                    break;
                }
            }
        }
    }

    logger::info_p(tag, "stopped");
}

/// Read the live color at absolute `at`, sampling inside the session's
/// frame when there is one.
fn sample(ctx: &RunnerContext, at: Point) -> Option<Rgb> {
    let frame = match ctx.session.sampling_frame(ctx.provider.as_ref()) {
        Some(frame) if frame.contains(at) => frame,
        Some(_) => return None,
        None => Region::new(at.x, at.y, 1, 1),
    };
    let image = ctx.provider.capture_region(frame).ok()?;
    pixel_color(&image, (at.x - frame.x) as u32, (at.y - frame.y) as u32)
}

/// Focus the target window, run the action and put the pointer back.
fn perform(action: &Action, ctx: &RunnerContext, signal: &StopSignal, tag: &str) {
    let Some(target) = ctx.session.window() else {
        logger::warn_p(tag, "no window selected, action skipped");
        return;
    };
    let provider = ctx.provider.as_ref();

    if let Err(e) = provider.activate(target.id) {
        logger::warn_p(tag, &format!("cannot activate \"{}\": {}, action skipped", target.title, e));
        return;
    }

    let original = provider
        .cursor_position()
        .map_err(|e| logger::warn_p(tag, &format!("cannot read pointer: {}", e)))
        .ok();

    if let Err(e) = execute(action, provider, signal) {
        logger::warn_p(tag, &format!("action failed: {}", e));
    }

    if let Some(p) = original {
        if let Err(e) = provider.move_cursor_to(p) {
            logger::warn_p(tag, &format!("cannot restore pointer: {}", e));
        }
    }
}

/// Number of clicks a burst of `frequency_hz` lasting `duration_seconds` makes.
pub fn burst_clicks(frequency_hz: f64, duration_seconds: f64) -> u32 {
    let n = (frequency_hz * duration_seconds - 1e-9).ceil();
    n.clamp(1.0, u32::MAX as f64) as u32
}

fn execute(action: &Action, provider: &dyn CaptureProvider, signal: &StopSignal) -> Result<()> {
    match action {
        Action::SingleClick { point } => {
            if !signal.is_stopped() {
                provider.click(*point)?;
            }
        }
        Action::RepeatedClicks { point, frequency_hz, duration_seconds } => {
            let interval = Duration::try_from_secs_f64(1.0 / frequency_hz).unwrap_or(Duration::MAX);
            let start = Instant::now();
            let after = |offset: Option<Duration>| offset.and_then(|d| start.checked_add(d));
            for i in 0..burst_clicks(*frequency_hz, *duration_seconds) {
                if i > 0 && !signal.wait_deadline(after(interval.checked_mul(i))) {
                    return Ok(());
                }
                if signal.is_stopped() {
                    return Ok(());
                }
                provider.click(*point)?;
            }
            signal.wait_deadline(after(Duration::try_from_secs_f64(*duration_seconds).ok()));
        }
        Action::Sequence { points, delay_seconds } => {
            for (i, point) in points.iter().enumerate() {
                if i > 0 && !signal.wait_secs(*delay_seconds) {
                    return Ok(());
                }
                if signal.is_stopped() {
                    return Ok(());
                }
                provider.click(*point)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::stub::{StubEvent, StubPlatform};
    use crate::sleep::sleep_ms;

    const TARGET: WindowId = 10001;

    fn setup() -> (Arc<StubPlatform>, Arc<Session>, RunnerContext) {
        let stub = Arc::new(StubPlatform::new());
        let session = Arc::new(Session::new());
        session.select_window(TARGET, "Chico Target");
        let provider: Arc<dyn CaptureProvider> = stub.clone();
        let ctx = RunnerContext::new(provider, Arc::clone(&session));
        (stub, session, ctx)
    }

    fn timed(interval_seconds: f64, action: Action) -> MacroSpec {
        MacroSpec { name: "test".into(), condition: Condition::Time { interval_seconds }, action }
    }

    fn wait_for(timeout_ms: u64, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            sleep_ms(5);
        }
        cond()
    }

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn burst_click_counts() {
        assert_eq!(burst_clicks(2.0, 1.0), 2);
        assert_eq!(burst_clicks(10.0, 0.3), 3);
        assert_eq!(burst_clicks(3.0, 0.5), 2);
        assert_eq!(burst_clicks(1.0, 0.1), 1);
    }

    #[test]
    fn time_condition_clicks_and_restores_pointer() {
        let (stub, _session, ctx) = setup();
        stub.move_cursor_to(p(640, 480)).unwrap();
        stub.clear_events();

        let mut runner = Runner::new(ctx);
        assert!(runner.start(&timed(0.05, Action::SingleClick { point: p(150, 150) })));
        assert_eq!(runner.state(), MacroState::Running);
        assert!(wait_for(2000, || stub.clicks().len() >= 2));
        assert!(runner.stop());
        assert_eq!(runner.state(), MacroState::Stopped);

        let events: Vec<StubEvent> = stub.events().into_iter().map(|r| r.event).collect();
        assert_eq!(
            &events[..3],
            &[StubEvent::Activate(TARGET), StubEvent::Click(p(150, 150)), StubEvent::MoveTo(p(640, 480))]
        );
        assert_eq!(stub.cursor_position().unwrap(), p(640, 480));
    }

    #[test]
    fn second_start_is_a_no_op() {
        let (stub, _session, ctx) = setup();
        let spec = timed(0.2, Action::SingleClick { point: p(1, 1) });
        let mut runner = Runner::new(ctx);
        assert!(runner.start(&spec));
        assert!(!runner.start(&spec));
        sleep_ms(500);
        runner.stop();
        // One loop clicks at ~0.2s and ~0.4s; two loops would double that.
        let n = stub.clicks().len();
        assert!((1..=3).contains(&n), "got {} clicks", n);
    }

    #[test]
    fn stop_when_stopped_is_a_no_op() {
        let (_stub, _session, ctx) = setup();
        let mut runner = Runner::new(ctx);
        assert!(!runner.stop());
        assert_eq!(runner.state(), MacroState::Stopped);
    }

    #[test]
    fn nothing_fires_after_stop_returns() {
        let (stub, _session, ctx) = setup();
        let mut runner = Runner::new(ctx);
        runner.start(&timed(0.01, Action::SingleClick { point: p(3, 3) }));
        assert!(wait_for(2000, || stub.clicks().len() >= 3));
        runner.stop();
        let after_stop = stub.events().len();
        sleep_ms(150);
        assert_eq!(stub.events().len(), after_stop);
    }

    #[test]
    fn stop_interrupts_a_long_interval() {
        let (_stub, _session, ctx) = setup();
        let mut runner = Runner::new(ctx);
        runner.start(&timed(30.0, Action::SingleClick { point: p(3, 3) }));
        sleep_ms(20);
        let t = Instant::now();
        runner.stop();
        assert!(t.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn repeated_clicks_follow_frequency() {
        let (stub, _session, ctx) = setup();
        let mut runner = Runner::new(ctx);
        runner.start(&timed(
            0.05,
            Action::RepeatedClicks { point: p(9, 9), frequency_hz: 2.0, duration_seconds: 1.0 },
        ));
        assert!(wait_for(3000, || stub.clicks().len() >= 2));
        // Still inside the first burst's one-second window.
        sleep_ms(200);
        runner.stop();

        let log = stub.click_log();
        assert_eq!(log.len(), 2);
        let gap = log[1].0 - log[0].0;
        assert!(gap >= Duration::from_millis(450) && gap <= Duration::from_millis(700), "gap {:?}", gap);
    }

    #[test]
    fn stop_cuts_a_burst_short() {
        let (stub, _session, ctx) = setup();
        let mut runner = Runner::new(ctx);
        runner.start(&timed(
            0.01,
            Action::RepeatedClicks { point: p(9, 9), frequency_hz: 1.0, duration_seconds: 10.0 },
        ));
        assert!(wait_for(2000, || stub.clicks().len() == 1));
        let t = Instant::now();
        runner.stop();
        assert!(t.elapsed() < Duration::from_secs(2));
        assert_eq!(stub.clicks().len(), 1);
        assert_eq!(stub.cursor_position().unwrap(), p(0, 0));
    }

    #[test]
    fn sequence_clicks_in_order() {
        let (stub, _session, ctx) = setup();
        let mut runner = Runner::new(ctx);
        let points = vec![p(1, 1), p(2, 2), p(3, 3)];
        runner.start(&timed(0.05, Action::Sequence { points: points.clone(), delay_seconds: 0.1 }));
        assert!(wait_for(3000, || stub.clicks().len() >= 3));
        runner.stop();
        assert_eq!(&stub.clicks()[..3], &points[..]);
    }

    #[test]
    fn stop_mid_sequence_drops_remaining_points() {
        let (stub, _session, ctx) = setup();
        let mut runner = Runner::new(ctx);
        runner.start(&timed(
            0.05,
            Action::Sequence { points: vec![p(1, 1), p(2, 2), p(3, 3)], delay_seconds: 0.5 },
        ));
        assert!(wait_for(2000, || !stub.clicks().is_empty()));
        runner.stop();
        assert_eq!(stub.clicks(), vec![p(1, 1)]);
    }

    fn colored(rgb: Rgb, at: Point) -> MacroSpec {
        MacroSpec {
            name: "color".into(),
            condition: Condition::Color { rgb, sample_point: at },
            action: Action::SingleClick { point: p(500, 500) },
        }
    }

    #[test]
    fn color_match_fires() {
        let (stub, session, ctx) = setup();
        session.set_region(Some(Region::new(10, 10, 20, 20)));
        stub.set_pixel(p(15, 15), Rgb(255, 0, 0));

        let mut runner = Runner::new(ctx.with_color_poll(Duration::from_millis(20)));
        runner.start(&colored(Rgb(255, 0, 0), p(15, 15)));
        assert!(wait_for(2000, || !stub.clicks().is_empty()));
        runner.stop();
        assert_eq!(stub.clicks()[0], p(500, 500));
    }

    #[test]
    fn color_mismatch_does_nothing() {
        let (stub, session, ctx) = setup();
        session.set_region(Some(Region::new(10, 10, 20, 20)));
        stub.set_pixel(p(15, 15), Rgb(255, 0, 1));

        let mut runner = Runner::new(ctx.with_color_poll(Duration::from_millis(20)));
        runner.start(&colored(Rgb(255, 0, 0), p(15, 15)));
        sleep_ms(250);
        runner.stop();
        assert!(stub.events().is_empty());
    }

    #[test]
    fn sample_outside_region_never_matches() {
        let (stub, session, ctx) = setup();
        session.set_region(Some(Region::new(10, 10, 20, 20)));
        stub.set_pixel(p(50, 50), Rgb(0, 255, 0));

        let mut runner = Runner::new(ctx.with_color_poll(Duration::from_millis(20)));
        runner.start(&colored(Rgb(0, 255, 0), p(50, 50)));
        sleep_ms(200);
        runner.stop();
        assert!(stub.clicks().is_empty());
    }

    #[test]
    fn missing_window_skips_action() {
        let (stub, session, ctx) = setup();
        session.clear_window();
        let mut runner = Runner::new(ctx);
        runner.start(&timed(0.02, Action::SingleClick { point: p(1, 1) }));
        sleep_ms(150);
        assert_eq!(runner.state(), MacroState::Running);
        runner.stop();
        assert!(stub.events().is_empty());
    }

    #[test]
    fn oversized_interval_keeps_running_until_stopped() {
        let (stub, _session, ctx) = setup();
        let mut runner = Runner::new(ctx);
        runner.start(&timed(1e20, Action::SingleClick { point: p(1, 1) }));
        sleep_ms(100);
        assert_eq!(runner.state(), MacroState::Running);
        let t = Instant::now();
        assert!(runner.stop());
        assert!(t.elapsed() < Duration::from_secs(2));
        assert!(stub.events().is_empty());
    }

    #[test]
    fn oversized_burst_clicks_once_then_waits_for_stop() {
        let (stub, _session, ctx) = setup();
        let mut runner = Runner::new(ctx);
        runner.start(&timed(
            0.01,
            Action::RepeatedClicks { point: p(4, 4), frequency_hz: 1e-300, duration_seconds: 1e300 },
        ));
        assert!(wait_for(2000, || stub.clicks().len() == 1));
        sleep_ms(50);
        assert_eq!(runner.state(), MacroState::Running);
        runner.stop();
        assert_eq!(stub.clicks(), vec![p(4, 4)]);
    }

    /// Provider whose clicks blow up, to crash the macro thread.
    struct Exploding;

    impl CaptureProvider for Exploding {
        fn list_windows(&self) -> Vec<(WindowId, String)> {
            vec![(TARGET, "Chico Target".into())]
        }
        fn activate(&self, _id: WindowId) -> Result<()> {
            Ok(())
        }
        fn bounds_of(&self, _id: WindowId) -> Option<Region> {
            None
        }
        fn capture_region(&self, _region: Region) -> Result<image::RgbaImage> {
            anyhow::bail!("no screen")
        }
        fn click(&self, _at: Point) -> Result<()> {
            panic!("click exploded")
        }
        fn move_cursor_to(&self, _at: Point) -> Result<()> {
            Ok(())
        }
        fn cursor_position(&self) -> Result<Point> {
            Ok(p(0, 0))
        }
    }

    #[test]
    fn crashed_loop_is_logged_and_shows_stopped() {
        let dir = tempfile::tempdir().unwrap();
        logger::init(dir.path()).unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        logger::set_tui_sender(tx);

        let session = Arc::new(Session::new());
        session.select_window(TARGET, "Chico Target");
        let mut runner = Runner::new(RunnerContext::new(Arc::new(Exploding), session));
        let spec = MacroSpec {
            name: "crashy".into(),
            condition: Condition::Time { interval_seconds: 0.01 },
            action: Action::SingleClick { point: p(1, 1) },
        };
        assert!(runner.start(&spec));
        assert!(wait_for(2000, || runner.state() == MacroState::Stopped));

        let errors: Vec<String> = rx
            .try_iter()
            .filter(|line| line.starts_with("ERROR\x1fcrashy\x1f"))
            .collect();
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].ends_with("crashed, macro stopped: click exploded"));

        // A crashed macro can be started again.
        assert!(runner.start(&spec));
        runner.stop();
    }

    #[test]
    fn drop_stops_the_loop() {
        let (stub, _session, ctx) = setup();
        {
            let mut runner = Runner::new(ctx);
            runner.start(&timed(0.01, Action::SingleClick { point: p(1, 1) }));
            assert!(wait_for(2000, || !stub.clicks().is_empty()));
        }
        let n = stub.events().len();
        sleep_ms(100);
        assert_eq!(stub.events().len(), n);
    }
}
