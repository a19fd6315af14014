use std::{fmt, fs, path::Path};

use anyhow::{bail, Context, Result};
use navbright::{
    ports::{HapticKind, HostRecord},
    GestureConfig, GestureController, GesturePhase, MemoryHost, TouchEvent, TouchPhase,
};

/// Time added after the last sample so pending timers can fire.
pub const TAIL_MS: u64 = 1_000;

const TRACE_HEADER: &str = "touch,ms,phase,x,y";

#[derive(Clone, Debug, PartialEq)]
pub enum ReplayLine {
    Phase(u64, GesturePhase),
    Host(u64, HostRecord),
}

impl ReplayLine {
    pub fn phase(&self) -> Option<GesturePhase> {
        match self {
            Self::Phase(_, phase) => Some(*phase),
            Self::Host(..) => None,
        }
    }
}

impl fmt::Display for ReplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phase(ms, phase) => write!(f, "phase,{ms},{}", phase.label()),
            Self::Host(ms, record) => match record {
                HostRecord::Value(value) => write!(f, "value,{ms},{value}"),
                HostRecord::TemporaryValue(value) => write!(f, "temp_value,{ms},{value}"),
                HostRecord::Mode(mode) => write!(f, "mode,{ms},{}", mode.label()),
                HostRecord::Pulse(HapticKind::Start) => write!(f, "pulse,{ms},start"),
                HostRecord::Pulse(HapticKind::End) => write!(f, "pulse,{ms},end"),
                HostRecord::ShowProgress(visible) => write!(f, "show_progress,{ms},{visible}"),
                HostRecord::Progress(progress) => write!(f, "progress,{ms},{progress:.4}"),
            },
        }
    }
}

pub fn parse_trace(path: &Path) -> Result<Vec<TouchEvent>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_trace_str(&raw).with_context(|| format!("invalid trace {}", path.display()))
}

pub fn parse_trace_str(raw: &str) -> Result<Vec<TouchEvent>> {
    let mut out = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        let line_no = line_no + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed == TRACE_HEADER {
            continue;
        }

        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if parts.len() != 5 {
            bail!("line {line_no}: expected 5 columns, got {}", parts.len());
        }
        if parts[0] != "touch" {
            continue;
        }

        let t_ms: u64 = parts[1]
            .parse()
            .with_context(|| format!("line {line_no}: invalid ms '{}'", parts[1]))?;
        let phase = match parts[2].to_ascii_lowercase().as_str() {
            "down" => TouchPhase::Down,
            "move" => TouchPhase::Move,
            "up" => TouchPhase::Up,
            other => bail!("line {line_no}: invalid touch phase '{other}'"),
        };
        let x: f32 = parts[3]
            .parse()
            .with_context(|| format!("line {line_no}: invalid x '{}'", parts[3]))?;
        let y: f32 = parts[4]
            .parse()
            .with_context(|| format!("line {line_no}: invalid y '{}'", parts[4]))?;

        if let Some(prev) = out.last().map(|event: &TouchEvent| event.t_ms) {
            if t_ms < prev {
                bail!("line {line_no}: timestamp {t_ms} goes backwards from {prev}");
            }
        }
        out.push(TouchEvent::new(phase, x, y, t_ms));
    }
    Ok(out)
}

pub fn parse_expected_phases(raw: &str) -> Result<Vec<GesturePhase>> {
    let mut phases = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        let token = line.trim();
        if token.is_empty() || token.starts_with('#') {
            continue;
        }
        let Some(phase) = GesturePhase::from_label(&token.to_ascii_lowercase()) else {
            bail!("line {}: invalid phase '{token}'", line_no + 1);
        };
        phases.push(phase);
    }
    Ok(phases)
}

/// Runs the trace through a controller and records every phase change and
/// host write, timestamped with the time they happened.
pub fn replay(
    config: GestureConfig,
    host: &mut MemoryHost,
    events: &[TouchEvent],
) -> Vec<ReplayLine> {
    let mut controller = GestureController::new(config);
    let mut lines = Vec::new();
    let mut phase = controller.phase();

    let mut step = |controller: &GestureController, host: &mut MemoryHost, now_ms: u64| {
        if controller.phase() != phase {
            phase = controller.phase();
            lines.push(ReplayLine::Phase(now_ms, phase));
        }
        lines.extend(
            host.take_records()
                .into_iter()
                .map(|record| ReplayLine::Host(now_ms, record)),
        );
    };

    for event in events {
        while let Some(due_ms) = controller.next_deadline().filter(|due| *due <= event.t_ms) {
            controller.advance(due_ms, host);
            step(&controller, host, due_ms);
        }
        controller.on_touch(*event, host);
        step(&controller, host, event.t_ms);
    }

    let end_ms = events
        .last()
        .map_or(0, |event| event.t_ms)
        .saturating_add(TAIL_MS);
    while let Some(due_ms) = controller.next_deadline().filter(|due| *due <= end_ms) {
        controller.advance(due_ms, host);
        step(&controller, host, due_ms);
    }
    lines
}

pub fn phases_entered(lines: &[ReplayLine]) -> Vec<GesturePhase> {
    lines.iter().filter_map(ReplayLine::phase).collect()
}
