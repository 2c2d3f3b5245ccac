use std::fmt::Display;

/// IF bandwidth settings of the tuner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bandwidth {
    Khz200,
    Khz300,
    Khz600,
    #[default]
    Khz1536,
    Mhz5,
    Mhz6,
    Mhz7,
    Mhz8,
}

impl Bandwidth {
    pub const ALL: [Bandwidth; 8] = [
        Bandwidth::Khz200,
        Bandwidth::Khz300,
        Bandwidth::Khz600,
        Bandwidth::Khz1536,
        Bandwidth::Mhz5,
        Bandwidth::Mhz6,
        Bandwidth::Mhz7,
        Bandwidth::Mhz8,
    ];

    /// Picks the smallest bandwidth that is at least `hertz` wide. Requests
    /// wider than 8 MHz get 8 MHz.
    pub fn from_hz(hertz: f64) -> Self {
        Self::ALL
            .into_iter()
            .find(|bandwidth| hertz <= bandwidth.hz())
            .unwrap_or(Self::Mhz8)
    }

    pub fn hz(&self) -> f64 {
        self.khz() as f64 * 1e3
    }

    /// The value the driver expects for this setting.
    pub fn khz(&self) -> i32 {
        match self {
            Self::Khz200 => 200,
            Self::Khz300 => 300,
            Self::Khz600 => 600,
            Self::Khz1536 => 1536,
            Self::Mhz5 => 5000,
            Self::Mhz6 => 6000,
            Self::Mhz7 => 7000,
            Self::Mhz8 => 8000,
        }
    }
}

impl Display for Bandwidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} kHz", self.khz())
    }
}

/// IF mode. Only zero-IF is used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IfMode {
    #[default]
    Zero,
}

impl IfMode {
    pub fn khz(&self) -> i32 {
        match self {
            Self::Zero => 0,
        }
    }
}
