//! Relay command vocabulary and output control
//!
//! Commands arrive as plain text on the relay command topic. Matching is
//! ASCII case-insensitive after trimming surrounding whitespace:
//!
//! | Payload                  | Effect          |
//! |--------------------------|-----------------|
//! | `on`, `1`, `true`        | relay on        |
//! | `off`, `0`, `false`      | relay off       |
//! | `toggle`                 | invert state    |
//!
//! Anything else is rejected without touching the output.

use core::str::FromStr;

use embedded_hal::digital::OutputPin;

use crate::config::RelayPolarity;

const ON_WORDS: [&str; 3] = ["on", "1", "true"];
const OFF_WORDS: [&str; 3] = ["off", "0", "false"];
const TOGGLE_WORD: &str = "toggle";

/// Retained status payload for a relay state
pub const fn status_str(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

/// A decoded relay command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayCommand {
    On,
    Off,
    Toggle,
}

/// Command decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Payload is not in the vocabulary
    Unknown,
}

impl core::fmt::Display for CommandError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown relay command"),
        }
    }
}

impl core::error::Error for CommandError {}

impl RelayCommand {
    /// Decode a raw command payload
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        let word = raw.trim();
        if ON_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w)) {
            Ok(Self::On)
        } else if OFF_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w)) {
            Ok(Self::Off)
        } else if word.eq_ignore_ascii_case(TOGGLE_WORD) {
            Ok(Self::Toggle)
        } else {
            Err(CommandError::Unknown)
        }
    }

    /// Target state given the current one
    pub fn resolve(self, current: bool) -> bool {
        match self {
            Self::On => true,
            Self::Off => false,
            Self::Toggle => !current,
        }
    }
}

impl FromStr for RelayCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Relay output with its mirrored in-memory state
///
/// The state only changes after the pin write succeeds, so `is_on()`
/// always describes what the output is actually driving.
pub struct Relay<P> {
    pin: P,
    polarity: RelayPolarity,
    on: bool,
}

impl<P: OutputPin> Relay<P> {
    /// Take ownership of the pin and drive the relay off
    pub fn new(pin: P, polarity: RelayPolarity) -> Result<Self, P::Error> {
        let mut relay = Self {
            pin,
            polarity,
            on: false,
        };
        relay.drive(false)?;
        Ok(relay)
    }

    /// Drive the relay to `on`
    pub fn set(&mut self, on: bool) -> Result<(), P::Error> {
        self.drive(on)?;
        self.on = on;
        Ok(())
    }

    /// Apply a command, returning the resulting state
    pub fn apply(&mut self, command: RelayCommand) -> Result<bool, P::Error> {
        let target = command.resolve(self.on);
        self.set(target)?;
        Ok(target)
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// `"ON"` or `"OFF"`
    pub fn status(&self) -> &'static str {
        status_str(self.on)
    }

    fn drive(&mut self, on: bool) -> Result<(), P::Error> {
        let level_high = match self.polarity {
            RelayPolarity::ActiveHigh => on,
            RelayPolarity::ActiveLow => !on,
        };
        if level_high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPin;

    #[test]
    fn test_vocabulary() {
        for raw in ["on", "1", "true", "ON", "True", "  on\n", "\t1 "] {
            assert_eq!(RelayCommand::parse(raw), Ok(RelayCommand::On), "{raw:?}");
        }
        for raw in ["off", "0", "false", "OFF", "FaLsE", " off "] {
            assert_eq!(RelayCommand::parse(raw), Ok(RelayCommand::Off), "{raw:?}");
        }
        for raw in ["toggle", "TOGGLE ", " Toggle"] {
            assert_eq!(
                RelayCommand::parse(raw),
                Ok(RelayCommand::Toggle),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn test_unknown_commands() {
        for raw in ["", "   ", "onn", "yes", "2", "tog gle", "on off", "ÖN"] {
            assert_eq!(
                RelayCommand::parse(raw),
                Err(CommandError::Unknown),
                "{raw:?}"
            );
        }
        assert_eq!("switch".parse::<RelayCommand>(), Err(CommandError::Unknown));
    }

    #[test]
    fn test_resolve() {
        assert!(RelayCommand::On.resolve(false));
        assert!(RelayCommand::On.resolve(true));
        assert!(!RelayCommand::Off.resolve(true));
        assert!(RelayCommand::Toggle.resolve(false));
        assert!(!RelayCommand::Toggle.resolve(true));
    }

    #[test]
    fn test_new_relay_starts_off() {
        let pin = RecordingPin::new();
        let relay = Relay::new(pin.clone(), RelayPolarity::ActiveHigh).unwrap();
        assert!(!relay.is_on());
        assert_eq!(relay.status(), "OFF");
        assert_eq!(pin.levels(), vec![false]);
    }

    #[test]
    fn test_apply_drives_output() {
        let pin = RecordingPin::new();
        let mut relay = Relay::new(pin.clone(), RelayPolarity::ActiveHigh).unwrap();

        assert_eq!(relay.apply(RelayCommand::Toggle), Ok(true));
        assert!(pin.is_high());
        assert_eq!(relay.status(), "ON");

        assert_eq!(relay.apply(RelayCommand::Off), Ok(false));
        assert!(!pin.is_high());
    }

    #[test]
    fn test_active_low_inverts_level() {
        let pin = RecordingPin::new();
        let mut relay = Relay::new(pin.clone(), RelayPolarity::ActiveLow).unwrap();
        assert!(pin.is_high());

        relay.set(true).unwrap();
        assert!(!pin.is_high());
        assert!(relay.is_on());
    }

    #[test]
    fn test_failed_write_keeps_state() {
        let pin = RecordingPin::new();
        let mut relay = Relay::new(pin.clone(), RelayPolarity::ActiveHigh).unwrap();

        pin.fail_writes(true);
        assert!(relay.set(true).is_err());
        assert!(!relay.is_on());
        assert!(!pin.is_high());
    }
}
