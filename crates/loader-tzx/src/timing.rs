//! Pulse timing for 47loader blocks.
//!
//! The loader samples the EAR bit in a loop of 34 T-states; its speed is
//! expressed as a number of extra trips around that loop. A zero bit is a
//! pair of 543 T-state pulses at standard speed, and a one bit is a pair
//! of pulses twice that length. The sync pulses reuse the zero and one
//! lengths.
//!
//! The ROM preset instead uses the Spectrum ROM loader's literal timings,
//! so a 47loader tape can also be loaded by `LOAD ""` tooling.

use format_tzx::{ClickPilot, TurboBlockHeader, Word};

use crate::error::TimingError;

/// A pulse duration in T-states.
pub type PulseLength = Word;

/// CPU T-states per millisecond on a 3.5 MHz Spectrum.
pub const T_STATES_PER_MS: u32 = 3500;

/// Zero pulse length at standard speed.
pub const STANDARD_ZERO_PULSE: u16 = 543;

/// T-states added to a zero pulse per extra sampling cycle.
pub const T_STATES_PER_CYCLE: i32 = 34;

/// Pilot pulse length for every non-ROM preset.
pub const PILOT_PULSE: PulseLength = Word::new(rom::ONE);

pub const DEFAULT_PILOT_MS: u16 = 1000;
pub const DEFAULT_PAUSE_MS: u16 = 250;

/// Pilot pulses in a "short" pilot.
pub const SHORT_PILOT_COUNT: u16 = 600;

/// Pilot pulses needed to resynchronise between glued blocks.
pub const RESUME_PILOT_COUNT: u16 = 2;

/// Length of each click in a clicking pilot.
pub const CLICK_PULSE: u16 = 300;

pub const DEFAULT_CLICKS: u16 = 8;

/// Pulse lengths used by the Spectrum ROM loader.
pub mod rom {
    pub const PILOT: u16 = 2168;
    pub const SYNC0: u16 = 667;
    pub const SYNC1: u16 = 735;
    pub const ZERO: u16 = 855;
    pub const ONE: u16 = 1710;
}

/// Length of a zero pulse (and of the first sync pulse).
///
/// # Errors
///
/// Returns [`TimingError::PulseOutOfRange`] when the extra cycles push the
/// length to zero or below.
pub fn zero_pulse_length(extra_cycles: i8) -> Result<PulseLength, TimingError> {
    let length = i32::from(STANDARD_ZERO_PULSE) + i32::from(extra_cycles) * T_STATES_PER_CYCLE;
    match u16::try_from(length) {
        Ok(len) if len > 0 => Ok(Word::new(len)),
        _ => Err(TimingError::PulseOutOfRange { extra_cycles }),
    }
}

/// Length of a one pulse (and of the second sync pulse): exactly twice the
/// zero pulse.
pub fn one_pulse_length(extra_cycles: i8) -> Result<PulseLength, TimingError> {
    Ok(Pulses::loader(zero_pulse_length(extra_cycles)?).one)
}

// ---------------------------------------------------------------------------
// Speed presets
// ---------------------------------------------------------------------------

/// Named loader speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Speed {
    /// 475/950T, ~185% of ROM loader speed.
    Fast,
    /// 509/1018T, ~170% of ROM loader speed.
    Eager,
    /// 543/1086T, ~160% of ROM loader speed.
    #[default]
    Standard,
    /// 611/1222T, ~145% of ROM loader speed.
    Cautious,
    /// 679/1358T, ~130% of ROM loader speed.
    Conservative,
    /// 713/1426T, ~125% of ROM loader speed.
    Speedlock7,
    /// ROM loader timings, 855/1710T.
    Rom,
}

impl Speed {
    /// Extra sampling cycles, or `None` for the fixed ROM timings.
    #[must_use]
    pub fn extra_cycles(self) -> Option<i8> {
        match self {
            Self::Fast => Some(-2),
            Self::Eager => Some(-1),
            Self::Standard => Some(0),
            Self::Cautious => Some(2),
            Self::Conservative => Some(4),
            Self::Speedlock7 => Some(5),
            Self::Rom => None,
        }
    }

    /// The five pulse lengths of a block header at this speed.
    pub fn pulses(self) -> Result<Pulses, TimingError> {
        let Some(extra) = self.extra_cycles() else {
            return Ok(Pulses {
                pilot: Word::new(rom::PILOT),
                sync0: Word::new(rom::SYNC0),
                sync1: Word::new(rom::SYNC1),
                zero: Word::new(rom::ZERO),
                one: Word::new(rom::ONE),
            });
        };
        Ok(Pulses::loader(zero_pulse_length(extra)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulses {
    pub pilot: PulseLength,
    pub sync0: PulseLength,
    pub sync1: PulseLength,
    pub zero: PulseLength,
    pub one: PulseLength,
}

impl Pulses {
    /// Loader pulses built around a zero pulse of `zero` T-states.
    ///
    /// `zero` is at most 4861T for any `i8` of extra cycles, so doubling it
    /// stays in range.
    const fn loader(zero: PulseLength) -> Self {
        let one = Word::new(zero.get() * 2);
        Self {
            pilot: PILOT_PULSE,
            sync0: zero,
            sync1: one,
            zero,
            one,
        }
    }
}

/// Pulses of the standard preset.
const STANDARD_PULSES: Pulses = Pulses::loader(Word::new(STANDARD_ZERO_PULSE));

// ---------------------------------------------------------------------------
// Pilot tone
// ---------------------------------------------------------------------------

/// How the pilot tone before a block is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PilotTone {
    /// A pilot lasting roughly this many milliseconds.
    Duration { ms: u16 },
    /// A fixed 600-pulse pilot.
    Short,
    /// The minimal two-pulse pilot used to restart mid-stream.
    Resume,
    /// A normal-length pilot preceded by a burst of short clicks.
    Clicking { clicks: u16 },
}

impl Default for PilotTone {
    fn default() -> Self {
        Self::Duration {
            ms: DEFAULT_PILOT_MS,
        }
    }
}

impl PilotTone {
    /// Number of pilot pulses for a given pilot pulse length.
    pub fn pulse_count(self, pilot_pulse: PulseLength) -> Result<Word, TimingError> {
        match self {
            Self::Duration { ms } => pilot_pulse_count(ms, pilot_pulse),
            Self::Short => Ok(Word::new(SHORT_PILOT_COUNT)),
            Self::Resume => Ok(Word::new(RESUME_PILOT_COUNT)),
            Self::Clicking { .. } => pilot_pulse_count(DEFAULT_PILOT_MS, pilot_pulse),
        }
    }

    #[must_use]
    pub fn click(self) -> Option<ClickPilot> {
        match self {
            Self::Clicking { clicks } => Some(ClickPilot {
                pulse: Word::new(CLICK_PULSE),
                count: Word::new(clicks),
            }),
            _ => None,
        }
    }
}

/// Pilot pulses that fill `ms` milliseconds, rounded up to an even count.
///
/// # Errors
///
/// Returns [`TimingError::PilotTooLong`] if the count exceeds 16 bits.
pub fn pilot_pulse_count(ms: u16, pilot_pulse: PulseLength) -> Result<Word, TimingError> {
    let count = even_pulse_count(ms, pilot_pulse.get());
    Word::try_from(count).map_err(|_| TimingError::PilotTooLong { ms })
}

const fn even_pulse_count(ms: u16, pilot_pulse: u16) -> u32 {
    let pulse = if pilot_pulse == 0 { 1 } else { pilot_pulse as u32 };
    let count = ms as u32 * T_STATES_PER_MS / pulse;
    count + count % 2
}

/// Pulses in the default pilot at the non-ROM pilot pulse length.
const DEFAULT_PILOT_COUNT: Word = {
    let count = even_pulse_count(DEFAULT_PILOT_MS, PILOT_PULSE.get());
    assert!(count <= u16::MAX as u32);
    Word::new(count as u16)
};

// ---------------------------------------------------------------------------
// Timing configuration
// ---------------------------------------------------------------------------

/// Validated timing options, producing the header template for every block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    speed: Speed,
    pilot: PilotTone,
    header: TurboBlockHeader,
}

impl Timing {
    /// Validate the options and build the block header template.
    ///
    /// # Errors
    ///
    /// Fails on out-of-range pulse or pilot lengths and on a clicking
    /// pilot combined with ROM timings.
    pub fn new(speed: Speed, pilot: PilotTone, pause_ms: u16) -> Result<Self, TimingError> {
        if let PilotTone::Clicking { clicks } = pilot {
            if speed == Speed::Rom {
                return Err(TimingError::ClickingWithRomTiming);
            }
            if clicks == 0 {
                return Err(TimingError::NoClicks);
            }
        }

        let pulses = speed.pulses()?;
        let count = pilot.pulse_count(pulses.pilot)?;
        Ok(Self::from_parts(speed, pilot, pulses, count, pause_ms))
    }

    fn from_parts(
        speed: Speed,
        pilot: PilotTone,
        pulses: Pulses,
        pilot_pulse_count: Word,
        pause_ms: u16,
    ) -> Self {
        let header = TurboBlockHeader {
            pilot_pulse: pulses.pilot,
            sync0_pulse: pulses.sync0,
            sync1_pulse: pulses.sync1,
            zero_pulse: pulses.zero,
            one_pulse: pulses.one,
            pilot_pulse_count,
            pause_ms: Word::new(pause_ms),
            click: pilot.click(),
        };
        Self {
            speed,
            pilot,
            header,
        }
    }

    #[must_use]
    pub fn speed(&self) -> Speed {
        self.speed
    }

    #[must_use]
    pub fn pilot(&self) -> PilotTone {
        self.pilot
    }

    /// A fresh copy of the header template.
    #[must_use]
    pub fn block_header(&self) -> TurboBlockHeader {
        self.header.clone()
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from_parts(
            Speed::Standard,
            PilotTone::default(),
            STANDARD_PULSES,
            DEFAULT_PILOT_COUNT,
            DEFAULT_PAUSE_MS,
        )
    }
}
