//! Boundary traits the integration layer implements, plus an in-memory host
//! for tests and trace replay.

use crate::output::OutputMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HapticKind {
    Start,
    End,
}

/// The touch surface the gesture rides on.
pub trait Surface {
    /// Width used to normalize horizontal travel. Read once per session.
    fn width(&self) -> f32;

    /// True while the surface's own gesture handling owns the current touch.
    fn is_host_consuming(&self) -> bool;
}

pub trait ValueStore {
    /// `None` when the value is unset or the store is unavailable.
    fn value(&self) -> Option<i32>;

    fn put_value(&mut self, value: i32);

    fn put_temporary_value(&mut self, value: i32) {
        self.put_value(value);
    }
}

pub trait ModeStore {
    fn mode(&self) -> Option<OutputMode>;

    fn put_mode(&mut self, mode: OutputMode);
}

pub trait HapticSink {
    fn pulse(&mut self, kind: HapticKind);
}

pub trait ProgressSink {
    fn show_progress(&mut self, _visible: bool) {}

    fn update_progress(&mut self, _progress: f32) {}
}

pub trait GestureHost: Surface + ValueStore + ModeStore + HapticSink + ProgressSink {}

impl<T> GestureHost for T where T: Surface + ValueStore + ModeStore + HapticSink + ProgressSink {}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HostRecord {
    Value(i32),
    TemporaryValue(i32),
    Mode(OutputMode),
    Pulse(HapticKind),
    ShowProgress(bool),
    Progress(f32),
}

/// Host backed by plain fields; every write is appended to `records`.
#[derive(Clone, Debug)]
pub struct MemoryHost {
    pub width: f32,
    pub host_consuming: bool,
    pub value: Option<i32>,
    pub temporary_value: Option<i32>,
    pub mode: Option<OutputMode>,
    pub records: Vec<HostRecord>,
}

impl MemoryHost {
    pub fn new(width: f32, value: i32, mode: OutputMode) -> Self {
        Self {
            width,
            host_consuming: false,
            value: Some(value),
            temporary_value: None,
            mode: Some(mode),
            records: Vec::new(),
        }
    }

    pub fn values_written(&self) -> Vec<i32> {
        self.records
            .iter()
            .filter_map(|record| match record {
                HostRecord::Value(value) | HostRecord::TemporaryValue(value) => Some(*value),
                _ => None,
            })
            .collect()
    }

    pub fn pulses(&self) -> Vec<HapticKind> {
        self.records
            .iter()
            .filter_map(|record| match record {
                HostRecord::Pulse(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    pub fn take_records(&mut self) -> Vec<HostRecord> {
        std::mem::take(&mut self.records)
    }
}

impl Surface for MemoryHost {
    fn width(&self) -> f32 {
        self.width
    }

    fn is_host_consuming(&self) -> bool {
        self.host_consuming
    }
}

impl ValueStore for MemoryHost {
    fn value(&self) -> Option<i32> {
        self.value
    }

    fn put_value(&mut self, value: i32) {
        self.value = Some(value);
        self.records.push(HostRecord::Value(value));
    }

    fn put_temporary_value(&mut self, value: i32) {
        self.temporary_value = Some(value);
        self.records.push(HostRecord::TemporaryValue(value));
    }
}

impl ModeStore for MemoryHost {
    fn mode(&self) -> Option<OutputMode> {
        self.mode
    }

    fn put_mode(&mut self, mode: OutputMode) {
        self.mode = Some(mode);
        self.records.push(HostRecord::Mode(mode));
    }
}

impl HapticSink for MemoryHost {
    fn pulse(&mut self, kind: HapticKind) {
        self.records.push(HostRecord::Pulse(kind));
    }
}

impl ProgressSink for MemoryHost {
    fn show_progress(&mut self, visible: bool) {
        self.records.push(HostRecord::ShowProgress(visible));
    }

    fn update_progress(&mut self, progress: f32) {
        self.records.push(HostRecord::Progress(progress));
    }
}
