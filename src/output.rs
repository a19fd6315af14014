use serde::Deserialize;

/// Platform range of the controlled value as seen by the value store.
///
/// Internal math runs on a normalized `[0, 1]` float; this type does the
/// conversion at the store boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputRange {
    pub min: i32,
    pub max: i32,
}

impl OutputRange {
    pub const DEFAULT_MIN: i32 = 1;
    pub const DEFAULT_MAX: i32 = 4095;

    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub const fn contains(&self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn span(&self) -> f32 {
        (self.max - self.min) as f32
    }

    /// Maps a store value into `[0, 1]`; out-of-range input is clamped.
    pub fn normalize(&self, value: i32) -> f32 {
        let span = self.span();
        if span <= 0.0 {
            return 0.0;
        }
        ((value - self.min) as f32 / span).clamp(0.0, 1.0)
    }

    /// Maps a normalized value back into platform units without rounding.
    pub fn units(&self, normalized: f32) -> f32 {
        self.min as f32 + self.span() * normalized.clamp(0.0, 1.0)
    }

    /// Rounded platform value, always inside `[min, max]`.
    pub fn to_store(&self, normalized: f32) -> i32 {
        (self.units(normalized).round() as i32).clamp(self.min, self.max)
    }
}

impl Default for OutputRange {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN, Self::DEFAULT_MAX)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputMode {
    #[default]
    Manual,
    Automatic,
}

impl OutputMode {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Manual => Self::Automatic,
            Self::Automatic => Self::Manual,
        }
    }

    /// Number of confirmation pulses played after switching into this mode.
    pub const fn confirm_pulses(self) -> u8 {
        match self {
            Self::Manual => 1,
            Self::Automatic => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}
