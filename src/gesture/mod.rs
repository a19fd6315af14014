//! Long-press-then-drag gesture that adjusts the output value.
//!
//! [`GestureEngine`] is pure: it turns touch and timer events into an
//! [`ActionBuffer`]. [`GestureController`] owns the engine and the deferred
//! queue, feeds host reads into the engine and applies its actions to a
//! [`GestureHost`].

mod hsm;
mod types;


pub use hsm::{EngineOutput, GestureEngine};
pub use types::{
    AbortReason, ActionBuffer, GestureAction, GesturePhase, GestureTrace, StartProbe, TouchEvent,
    TouchPhase,
};

use hsm::HsmEvent;

use crate::config::GestureConfig;
use crate::ports::GestureHost;
use crate::timers::{Deferred, DeferredKind, DeferredQueue};

/// Same-event replays allowed per dispatch (armed -> detecting -> tracking).
const MAX_REPLAYS: usize = 2;

pub struct GestureController {
    engine: GestureEngine,
    timers: DeferredQueue,
}

impl GestureController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            engine: GestureEngine::new(config),
            timers: DeferredQueue::new(),
        }
    }

    pub fn config(&self) -> &GestureConfig {
        self.engine.config()
    }

    pub fn phase(&self) -> GesturePhase {
        self.engine.phase()
    }

    pub fn trace(&self) -> GestureTrace {
        self.engine.trace()
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    pub fn is_pending(&self, kind: DeferredKind) -> bool {
        self.timers.contains(kind)
    }

    /// Earliest time the host should call [`Self::advance`] again.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_due_ms()
    }

    /// Handles one touch event. Never consumes it: the host surface keeps
    /// its own behavior, so this always returns `false`.
    pub fn on_touch<H: GestureHost + ?Sized>(&mut self, touch: TouchEvent, host: &mut H) -> bool {
        self.advance(touch.t_ms, host);

        // A release still ends the session; its position is ignored downstream.
        if touch.phase != TouchPhase::Up && !touch.has_finite_position() {
            log::warn!(
                "gesture: dropped {:?} with non-finite position ({}, {})",
                touch.phase,
                touch.x,
                touch.y
            );
            return false;
        }

        let event = match touch.phase {
            TouchPhase::Down => HsmEvent::Down {
                touch,
                surface_width: host.width(),
            },
            TouchPhase::Move => HsmEvent::Move {
                touch,
                probe: (self.phase() == GesturePhase::ArmedWaiting)
                    .then(|| StartProbe::read(&*host)),
            },
            TouchPhase::Up => HsmEvent::Up { touch },
        };
        self.dispatch(event, touch.t_ms, host);

        self.advance(touch.t_ms, host);
        false
    }

    /// Fires every deferred task due at or before `now_ms`.
    pub fn advance<H: GestureHost + ?Sized>(&mut self, now_ms: u64, host: &mut H) {
        while let Some((due_ms, task)) = self.timers.pop_due(now_ms) {
            match task {
                Deferred::CheckStart => {
                    let probe = StartProbe::read(&*host);
                    self.dispatch(
                        HsmEvent::CheckStart {
                            now_ms: due_ms,
                            probe,
                        },
                        due_ms,
                        host,
                    );
                }
                Deferred::Adjust { delta } => {
                    self.dispatch(
                        HsmEvent::Adjust {
                            now_ms: due_ms,
                            delta,
                        },
                        due_ms,
                        host,
                    );
                }
                Deferred::ToggleMode => {
                    let current = host.mode();
                    self.dispatch(
                        HsmEvent::ToggleMode {
                            now_ms: due_ms,
                            current,
                        },
                        due_ms,
                        host,
                    );
                }
                Deferred::HapticPulse(kind) => host.pulse(kind),
            }
        }
    }

    fn dispatch<H: GestureHost + ?Sized>(&mut self, event: HsmEvent, now_ms: u64, host: &mut H) {
        let mut replays = 0;
        loop {
            let before = self.engine.phase();
            let output = self.engine.handle(event);
            if output.trace.phase != before {
                log::debug!(
                    "gesture: {} -> {} at {}ms",
                    before.label(),
                    output.trace.phase.label(),
                    now_ms
                );
            }
            self.apply(&output.actions, now_ms, host);

            if !output.actions.wants_replay() || replays >= MAX_REPLAYS {
                break;
            }
            replays += 1;
        }
    }

    fn apply<H: GestureHost + ?Sized>(&mut self, actions: &ActionBuffer, now_ms: u64, host: &mut H) {
        for action in actions.iter() {
            match *action {
                GestureAction::Post {
                    task: task @ Deferred::CheckStart,
                    delay_ms,
                } => {
                    self.timers.post_debounced(task, now_ms, delay_ms);
                }
                GestureAction::Post { task, delay_ms } => {
                    self.timers.post(task, now_ms, delay_ms);
                }
                GestureAction::CancelPending => {
                    let cancelled = self.timers.clear();
                    if cancelled > 0 {
                        log::debug!("gesture: cancelled {cancelled} pending tasks");
                    }
                }
                GestureAction::WriteValue(value) => host.put_value(value),
                GestureAction::WriteTemporaryValue(value) => host.put_temporary_value(value),
                GestureAction::WriteMode(mode) => host.put_mode(mode),
                GestureAction::Haptic(kind) => host.pulse(kind),
                GestureAction::ShowProgress(visible) => host.show_progress(visible),
                GestureAction::Progress(progress) => host.update_progress(progress),
                GestureAction::Replay => {}
            }
        }
    }
}
