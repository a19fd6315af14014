use statig::{blocking::IntoStateMachineExt as _, prelude::*};

use super::types::{
    AbortReason, ActionBuffer, GestureAction, GesturePhase, GestureTrace, StartProbe, TouchEvent,
};
use crate::config::{AutomaticModePolicy, GestureConfig};
use crate::curve::perceived_progress;
use crate::output::OutputMode;
use crate::ports::HapticKind;
use crate::sample_buffer::TouchSample;
use crate::speed::SpeedEstimator;
use crate::timers::Deferred;

#[derive(Clone, Copy, Debug)]
pub(crate) enum HsmEvent {
    Down {
        touch: TouchEvent,
        surface_width: f32,
    },
    /// `probe` is only sampled while the session waits for its hold timeout.
    Move {
        touch: TouchEvent,
        probe: Option<StartProbe>,
    },
    Up {
        touch: TouchEvent,
    },
    CheckStart {
        now_ms: u64,
        probe: StartProbe,
    },
    Adjust {
        now_ms: u64,
        delta: f32,
    },
    ToggleMode {
        now_ms: u64,
        current: Option<OutputMode>,
    },
}

#[derive(Default)]
struct DispatchContext {
    actions: ActionBuffer,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EngineOutput {
    pub actions: ActionBuffer,
    pub trace: GestureTrace,
}

/// Pure gesture engine: touch and timer events in, actions and a trace out.
pub struct GestureEngine {
    machine: statig::blocking::StateMachine<GestureHsm>,
    trace: GestureTrace,
}

impl GestureEngine {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            machine: GestureHsm::new(config).state_machine(),
            trace: GestureTrace::default(),
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.machine.inner().config
    }

    pub fn phase(&self) -> GesturePhase {
        self.machine.inner().phase
    }

    pub fn trace(&self) -> GestureTrace {
        self.trace
    }

    pub(crate) fn handle(&mut self, event: HsmEvent) -> EngineOutput {
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&event, &mut context);
        self.finish(context, event_time(&event))
    }

    fn finish(&mut self, context: DispatchContext, now_ms: u64) -> EngineOutput {
        let inner = self.machine.inner();
        self.trace = GestureTrace {
            now_ms,
            phase: inner.phase,
            ..inner.last_trace
        };
        EngineOutput {
            actions: context.actions,
            trace: self.trace,
        }
    }
}

fn event_time(event: &HsmEvent) -> u64 {
    match event {
        HsmEvent::Down { touch, .. } | HsmEvent::Move { touch, .. } | HsmEvent::Up { touch } => {
            touch.t_ms
        }
        HsmEvent::CheckStart { now_ms, .. }
        | HsmEvent::Adjust { now_ms, .. }
        | HsmEvent::ToggleMode { now_ms, .. } => *now_ms,
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Point {
    x: f32,
    y: f32,
}

impl Point {
    fn of(touch: &TouchEvent) -> Self {
        Self {
            x: touch.x,
            y: touch.y,
        }
    }
}

struct GestureHsm {
    config: GestureConfig,
    speed: SpeedEstimator,
    down_ms: u64,
    start: Point,
    last: Point,
    surface_width: f32,
    mode: OutputMode,
    /// Tracked value, normalized against the output range.
    tracked: f32,
    written: i32,
    progress_visible: bool,
    phase: GesturePhase,
    last_trace: GestureTrace,
}

impl GestureHsm {
    fn new(config: GestureConfig) -> Self {
        Self {
            speed: SpeedEstimator::from_config(&config.speed),
            config,
            down_ms: 0,
            start: Point::default(),
            last: Point::default(),
            surface_width: 1.0,
            mode: OutputMode::Manual,
            tracked: 0.0,
            written: 0,
            progress_visible: false,
            phase: GesturePhase::Idle,
            last_trace: GestureTrace::default(),
        }
    }

    fn begin_session(&mut self, context: &mut DispatchContext, touch: &TouchEvent, width: f32) {
        self.close_session(context);
        self.down_ms = touch.t_ms;
        self.start = Point::of(touch);
        self.last = self.start;
        self.surface_width = if width.is_finite() { width.max(1.0) } else { 1.0 };
        self.last_trace = GestureTrace::default();
        context.actions.push(GestureAction::Post {
            task: Deferred::CheckStart,
            delay_ms: self.config.active_timeout_ms,
        });
        log::debug!(
            "gesture: down at ({:.1}, {:.1}) width={:.0}",
            touch.x,
            touch.y,
            self.surface_width
        );
    }

    fn close_session(&mut self, context: &mut DispatchContext) {
        context.actions.push(GestureAction::CancelPending);
        if self.progress_visible {
            self.progress_visible = false;
            context.actions.push(GestureAction::ShowProgress(false));
        }
        self.speed.reset();
    }

    fn enter(&mut self, phase: GesturePhase) -> Outcome<State> {
        self.phase = phase;
        Transition(match phase {
            GesturePhase::Idle => State::idle(),
            GesturePhase::ArmedWaiting => State::armed_waiting(),
            GesturePhase::Aborted => State::aborted(),
            GesturePhase::DetectingAxis => State::detecting_axis(),
            GesturePhase::TrackingHorizontal => State::tracking_horizontal(),
            GesturePhase::TrackingVertical => State::tracking_vertical(),
        })
    }

    fn displacement(&self, touch: &TouchEvent) -> (f32, f32) {
        ((touch.x - self.start.x).abs(), (touch.y - self.start.y).abs())
    }

    fn abort(&mut self, reason: AbortReason) -> Outcome<State> {
        self.last_trace.abort_reason = reason;
        log::debug!("gesture: aborted ({reason:?})");
        self.enter(GesturePhase::Aborted)
    }

    /// Decides whether the held touch may start tracking.
    fn evaluate_start(
        &mut self,
        context: &mut DispatchContext,
        now_ms: u64,
        probe: &StartProbe,
    ) -> Result<(), AbortReason> {
        if now_ms.saturating_sub(self.down_ms) < self.config.active_timeout_ms {
            return Err(AbortReason::TooEarly);
        }
        if probe.host_consuming {
            return Err(AbortReason::HostConsuming);
        }
        let Some(mode) = probe.mode else {
            return Err(AbortReason::ModeUnavailable);
        };
        let range = self.config.output;
        let Some(value) = probe.value.filter(|value| range.contains(*value)) else {
            return Err(AbortReason::ValueUnavailable);
        };
        if mode == OutputMode::Automatic
            && self.config.automatic_mode == AutomaticModePolicy::Abort
        {
            return Err(AbortReason::AutomaticMode);
        }

        self.mode = mode;
        self.tracked = range.normalize(value);
        self.written = value;
        self.last_trace.value = value;
        context.actions.push(GestureAction::Haptic(HapticKind::Start));
        log::debug!("gesture: start baseline={value} mode={}", mode.label());
        Ok(())
    }

    fn adjusts_value(&self) -> bool {
        !(self.mode == OutputMode::Automatic
            && self.config.automatic_mode == AutomaticModePolicy::TrackWithoutAdjust)
    }

    fn track_horizontal(&mut self, context: &mut DispatchContext, touch: &TouchEvent) {
        self.speed.add(TouchSample::new(touch.x, touch.y, touch.t_ms));
        let scale = self
            .config
            .speed
            .clamp_horizontal(self.speed.normalized_speed(touch.t_ms).x);
        let raw = (touch.x - self.last.x) / self.surface_width * scale;
        self.last_trace.speed_scale = scale;
        self.last_trace.adjust_raw = raw;
        context.actions.push(GestureAction::Post {
            task: Deferred::Adjust {
                delta: raw.clamp(-1.0, 1.0),
            },
            delay_ms: 0,
        });
        self.last = Point::of(touch);
    }

    fn apply_adjustment(&mut self, context: &mut DispatchContext, delta: f32) {
        if !self.adjusts_value() {
            return;
        }
        let range = self.config.output;
        let gain = self.config.sensitivity.gain(self.tracked, range);
        let step = (delta * gain).clamp(-1.0, 1.0);
        self.tracked = (self.tracked + step).clamp(0.0, 1.0);

        let value = range.to_store(self.tracked);
        if value == self.written {
            return;
        }
        self.written = value;
        self.last_trace.value = value;
        if self.mode == OutputMode::Automatic
            && self.config.automatic_mode == AutomaticModePolicy::TemporaryOverride
        {
            context.actions.push(GestureAction::WriteTemporaryValue(value));
        } else {
            context.actions.push(GestureAction::WriteValue(value));
        }
        context.actions.push(GestureAction::Progress(perceived_progress(
            range.units(self.tracked),
            range,
        )));
    }

    fn plan_toggle(&mut self, context: &mut DispatchContext, current: Option<OutputMode>) {
        let Some(current) = current else {
            log::warn!("gesture: mode unavailable, toggle dropped");
            return;
        };
        let next = current.toggled();
        context.actions.push(GestureAction::WriteMode(next));
        let interval = self.config.haptics.confirm_interval_ms;
        for pulse in 0..u64::from(next.confirm_pulses()) {
            context.actions.push(GestureAction::Post {
                task: Deferred::HapticPulse(HapticKind::End),
                delay_ms: interval * (pulse + 1),
            });
        }
        log::debug!("gesture: mode {} -> {}", current.label(), next.label());
    }
}

#[state_machine(initial = "State::idle()")]
impl GestureHsm {
    #[state(superstate = "session")]
    fn idle(&mut self, context: &mut DispatchContext, event: &HsmEvent) -> Outcome<State> {
        let _ = context;
        match event {
            HsmEvent::Down { .. } | HsmEvent::ToggleMode { .. } => Super,
            _ => Handled,
        }
    }

    #[state(superstate = "session")]
    fn armed_waiting(
        &mut self,
        context: &mut DispatchContext,
        event: &HsmEvent,
    ) -> Outcome<State> {
        match event {
            HsmEvent::Move { touch, probe } => {
                let (dx, dy) = self.displacement(touch);
                let slop = self.config.touch_slop_px;
                if dy >= slop {
                    return self.abort(AbortReason::VerticalScroll);
                }
                if dx >= slop {
                    let Some(probe) = probe else {
                        self.last = Point::of(touch);
                        return Handled;
                    };
                    return match self.evaluate_start(context, touch.t_ms, probe) {
                        Ok(()) => {
                            context.actions.push(GestureAction::Replay);
                            self.enter(GesturePhase::DetectingAxis)
                        }
                        Err(reason) => self.abort(reason),
                    };
                }
                self.last = Point::of(touch);
                Handled
            }
            HsmEvent::CheckStart { now_ms, probe } => {
                match self.evaluate_start(context, *now_ms, probe) {
                    Ok(()) => self.enter(GesturePhase::DetectingAxis),
                    Err(reason) => self.abort(reason),
                }
            }
            _ => Super,
        }
    }

    #[state(superstate = "session")]
    fn aborted(&mut self, context: &mut DispatchContext, event: &HsmEvent) -> Outcome<State> {
        let _ = context;
        match event {
            HsmEvent::Move { .. } | HsmEvent::CheckStart { .. } | HsmEvent::Adjust { .. } => {
                Handled
            }
            _ => Super,
        }
    }

    #[state(superstate = "session")]
    fn detecting_axis(
        &mut self,
        context: &mut DispatchContext,
        event: &HsmEvent,
    ) -> Outcome<State> {
        match event {
            HsmEvent::Move { touch, .. } => {
                let (dx, dy) = self.displacement(touch);
                let slop = self.config.touch_slop_px;
                if dx >= slop {
                    self.progress_visible = true;
                    context.actions.push(GestureAction::ShowProgress(true));
                    context.actions.push(GestureAction::Progress(perceived_progress(
                        self.config.output.units(self.tracked),
                        self.config.output,
                    )));
                    context.actions.push(GestureAction::Replay);
                    log::debug!("gesture: tracking horizontal");
                    return self.enter(GesturePhase::TrackingHorizontal);
                }
                if dy >= slop {
                    context.actions.push(GestureAction::Replay);
                    log::debug!("gesture: tracking vertical");
                    return self.enter(GesturePhase::TrackingVertical);
                }
                self.last = Point::of(touch);
                Handled
            }
            HsmEvent::CheckStart { .. } | HsmEvent::Adjust { .. } => Handled,
            _ => Super,
        }
    }

    #[state(superstate = "session")]
    fn tracking_horizontal(
        &mut self,
        context: &mut DispatchContext,
        event: &HsmEvent,
    ) -> Outcome<State> {
        match event {
            HsmEvent::Move { touch, .. } => {
                self.track_horizontal(context, touch);
                Handled
            }
            HsmEvent::Adjust { delta, .. } => {
                self.apply_adjustment(context, *delta);
                Handled
            }
            HsmEvent::CheckStart { .. } => Handled,
            _ => Super,
        }
    }

    #[state(superstate = "session")]
    fn tracking_vertical(
        &mut self,
        context: &mut DispatchContext,
        event: &HsmEvent,
    ) -> Outcome<State> {
        match event {
            HsmEvent::Move { touch, .. } => {
                self.speed.add(TouchSample::new(touch.x, touch.y, touch.t_ms));
                self.last = Point::of(touch);
                Handled
            }
            HsmEvent::Up { touch } => {
                if touch.has_finite_position() {
                    self.speed.add(TouchSample::new(touch.x, touch.y, touch.t_ms));
                }
                let scale = self
                    .config
                    .speed
                    .clamp_vertical(self.speed.normalized_speed(touch.t_ms).y);
                self.last_trace.speed_scale = scale;
                self.close_session(context);
                if scale >= self.config.flick_threshold {
                    log::debug!("gesture: flick scale={scale:.2}");
                    context.actions.push(GestureAction::Post {
                        task: Deferred::ToggleMode,
                        delay_ms: 0,
                    });
                }
                self.enter(GesturePhase::Idle)
            }
            HsmEvent::CheckStart { .. } | HsmEvent::Adjust { .. } => Handled,
            _ => Super,
        }
    }

    #[superstate]
    fn session(&mut self, context: &mut DispatchContext, event: &HsmEvent) -> Outcome<State> {
        match event {
            HsmEvent::Down {
                touch,
                surface_width,
            } => {
                self.begin_session(context, touch, *surface_width);
                self.enter(GesturePhase::ArmedWaiting)
            }
            HsmEvent::Up { .. } => {
                self.close_session(context);
                self.enter(GesturePhase::Idle)
            }
            HsmEvent::ToggleMode { current, .. } => {
                self.plan_toggle(context, *current);
                Handled
            }
            HsmEvent::Move { .. } | HsmEvent::CheckStart { .. } | HsmEvent::Adjust { .. } => {
                Handled
            }
        }
    }
}
