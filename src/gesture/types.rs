use crate::output::OutputMode;
use crate::ports::{GestureHost, HapticKind};
use crate::timers::Deferred;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TouchPhase {
    Down,
    Move,
    Up,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub x: f32,
    pub y: f32,
    pub t_ms: u64,
}

impl TouchEvent {
    pub const fn new(phase: TouchPhase, x: f32, y: f32, t_ms: u64) -> Self {
        Self { phase, x, y, t_ms }
    }

    pub const fn down(x: f32, y: f32, t_ms: u64) -> Self {
        Self::new(TouchPhase::Down, x, y, t_ms)
    }

    pub const fn moved(x: f32, y: f32, t_ms: u64) -> Self {
        Self::new(TouchPhase::Move, x, y, t_ms)
    }

    pub const fn up(x: f32, y: f32, t_ms: u64) -> Self {
        Self::new(TouchPhase::Up, x, y, t_ms)
    }

    pub fn has_finite_position(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum GesturePhase {
    #[default]
    Idle,
    ArmedWaiting,
    Aborted,
    DetectingAxis,
    TrackingHorizontal,
    TrackingVertical,
}

impl GesturePhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ArmedWaiting => "armed_waiting",
            Self::Aborted => "aborted",
            Self::DetectingAxis => "detecting_axis",
            Self::TrackingHorizontal => "tracking_horizontal",
            Self::TrackingVertical => "tracking_vertical",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [
            Self::Idle,
            Self::ArmedWaiting,
            Self::Aborted,
            Self::DetectingAxis,
            Self::TrackingHorizontal,
            Self::TrackingVertical,
        ]
        .into_iter()
        .find(|phase| phase.label() == label)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AbortReason {
    #[default]
    None,
    TooEarly,
    VerticalScroll,
    HostConsuming,
    ModeUnavailable,
    ValueUnavailable,
    AutomaticMode,
}

/// Host state sampled when a session asks to start tracking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StartProbe {
    pub host_consuming: bool,
    pub mode: Option<OutputMode>,
    pub value: Option<i32>,
}

impl StartProbe {
    pub fn read<H: GestureHost + ?Sized>(host: &H) -> Self {
        Self {
            host_consuming: host.is_host_consuming(),
            mode: host.mode(),
            value: host.value(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureAction {
    Post { task: Deferred, delay_ms: u64 },
    /// Drop every deferred task of the previous session.
    CancelPending,
    WriteValue(i32),
    WriteTemporaryValue(i32),
    WriteMode(OutputMode),
    Haptic(HapticKind),
    ShowProgress(bool),
    Progress(f32),
    /// Feed the current touch event to the state just entered.
    Replay,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActionBuffer {
    len: usize,
    slots: [Option<GestureAction>; Self::MAX],
}

impl ActionBuffer {
    pub const MAX: usize = 8;

    pub const fn new() -> Self {
        Self {
            len: 0,
            slots: [None; Self::MAX],
        }
    }

    pub fn push(&mut self, action: GestureAction) {
        if self.len >= Self::MAX {
            log::warn!("gesture: action buffer full, dropped {action:?}");
            return;
        }
        self.slots[self.len] = Some(action);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &GestureAction> {
        self.slots[..self.len].iter().filter_map(Option::as_ref)
    }

    pub fn wants_replay(&self) -> bool {
        self.iter()
            .any(|action| matches!(action, GestureAction::Replay))
    }

    pub fn written_value(&self) -> Option<i32> {
        self.iter().find_map(|action| match action {
            GestureAction::WriteValue(value) | GestureAction::WriteTemporaryValue(value) => {
                Some(*value)
            }
            _ => None,
        })
    }
}

impl Default for ActionBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the engine after a dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GestureTrace {
    pub now_ms: u64,
    pub phase: GesturePhase,
    pub abort_reason: AbortReason,
    /// Last clamped speed scale, horizontal or vertical depending on axis.
    pub speed_scale: f32,
    /// Last horizontal delta before clamping to `[-1, 1]`.
    pub adjust_raw: f32,
    /// Last value written through, in store units.
    pub value: i32,
}
