//! Runtime configuration for the wallbox controller
//!
//! Everything except the page sets themselves: zones, volume steps,
//! display geometry and timing, and the timing of each input device.

use std::path::PathBuf;
use std::time::Duration;

use input_devices::{PressConfig, RfidConfig};
use pulse_decoder::{DecoderConfig, DecoderConfigError};
use thiserror::Error;

/// Errors raised by [`ControllerConfig::validate`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("At least one zone must be configured")]
    NoZones,

    #[error("Default zone '{0}' is not in the zone list")]
    DefaultZoneNotInRing(String),

    #[error("Volume steps must be greater than zero")]
    ZeroVolumeStep,

    #[error("Display width {0} is too small, need at least 4 columns")]
    DisplayWidth(usize),

    #[error("Display line count {0} is out of range, expected 2 to 4")]
    DisplayLines(usize),

    #[error("Idle screen refresh must be at least 10 seconds, got {0:?}")]
    IdleRefreshTooFast(Duration),

    #[error("Invalid decoder timing: {0}")]
    Decoder(#[from] DecoderConfigError),
}

/// Configuration for the controller process
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Page-set configuration document
    /// Default: "page_sets.json"
    pub page_sets_path: PathBuf,

    /// Tag of the page set active at startup; the first configured tag if unset
    /// Default: None
    pub default_tag: Option<String>,

    /// Zones the unit-select button cycles through, in order
    /// Default: ["Living Room"]
    pub zones: Vec<String>,

    /// Zone controlled at startup
    /// Default: "Living Room"
    pub default_zone: String,

    /// Volume change per clockwise encoder step
    /// Default: 4
    pub volume_step_up: u8,

    /// Volume change per counter-clockwise encoder step
    /// Default: 5
    pub volume_step_down: u8,

    /// Display columns
    /// Default: 20
    pub display_width: usize,

    /// Display lines
    /// Default: 4
    pub display_lines: usize,

    /// Inactivity before the idle screen takes over
    /// Default: 30 seconds
    pub display_timeout: Duration,

    /// How long transient messages (volume, errors) stay up
    /// Default: 3 seconds
    pub message_ttl: Duration,

    /// How often the active zone is asked what is playing
    /// Default: 2 seconds
    pub track_poll_interval: Duration,

    /// How often the idle screen is redrawn while idle
    /// Default: 60 seconds
    pub idle_refresh_interval: Duration,

    /// Ceiling for a single zone-player call
    /// Default: 5 seconds
    pub operation_timeout: Duration,

    /// Pulse decoder timing
    pub decoder: DecoderConfig,

    /// Pushbutton timing
    pub buttons: PressConfig,

    /// RFID reader settings
    pub rfid: RfidConfig,

    /// Dispatcher event queue capacity
    /// Default: 64
    pub event_buffer_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            page_sets_path: PathBuf::from("page_sets.json"),
            default_tag: None,
            zones: vec!["Living Room".to_string()],
            default_zone: "Living Room".to_string(),
            volume_step_up: 4,
            volume_step_down: 5,
            display_width: 20,
            display_lines: 4,
            display_timeout: Duration::from_secs(30),
            message_ttl: Duration::from_secs(3),
            track_poll_interval: Duration::from_secs(2),
            idle_refresh_interval: Duration::from_secs(60),
            operation_timeout: Duration::from_secs(5),
            decoder: DecoderConfig::default(),
            buttons: PressConfig::default(),
            rfid: RfidConfig::default(),
            event_buffer_size: 64,
        }
    }
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two-line 16-column character display, as fitted inside the wallbox cabinet
    pub fn two_line_display() -> Self {
        Self {
            display_width: 16,
            display_lines: 2,
            ..Default::default()
        }
    }

    /// Short display timeouts for driving the controller from a bench script
    pub fn bench() -> Self {
        Self {
            display_timeout: Duration::from_secs(10),
            message_ttl: Duration::from_secs(1),
            idle_refresh_interval: Duration::from_secs(10),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zones.is_empty() {
            return Err(ConfigError::NoZones);
        }
        if !self.zones.contains(&self.default_zone) {
            return Err(ConfigError::DefaultZoneNotInRing(self.default_zone.clone()));
        }
        if self.volume_step_up == 0 || self.volume_step_down == 0 {
            return Err(ConfigError::ZeroVolumeStep);
        }
        if self.display_width < 4 {
            return Err(ConfigError::DisplayWidth(self.display_width));
        }
        if !(2..=4).contains(&self.display_lines) {
            return Err(ConfigError::DisplayLines(self.display_lines));
        }

        for (name, value) in [
            ("display_timeout", self.display_timeout),
            ("message_ttl", self.message_ttl),
            ("track_poll_interval", self.track_poll_interval),
            ("operation_timeout", self.operation_timeout),
            ("long_press", self.buttons.long_press),
            ("rfid hold_off", self.rfid.hold_off),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        if self.event_buffer_size == 0 {
            return Err(ConfigError::ZeroDuration("event_buffer_size"));
        }
        if self.idle_refresh_interval < Duration::from_secs(10) {
            return Err(ConfigError::IdleRefreshTooFast(self.idle_refresh_interval));
        }

        self.decoder.validate()?;
        Ok(())
    }

    pub fn with_page_sets_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.page_sets_path = path.into();
        self
    }

    pub fn with_default_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_tag = Some(tag.into());
        self
    }

    /// Set the zone ring; the first zone becomes the default
    pub fn with_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zones = zones.into_iter().map(Into::into).collect();
        if let Some(first) = self.zones.first() {
            self.default_zone = first.clone();
        }
        self
    }

    pub fn with_default_zone(mut self, zone: impl Into<String>) -> Self {
        self.default_zone = zone.into();
        self
    }

    pub fn with_volume_steps(mut self, up: u8, down: u8) -> Self {
        self.volume_step_up = up;
        self.volume_step_down = down;
        self
    }

    pub fn with_display(mut self, width: usize, lines: usize) -> Self {
        self.display_width = width;
        self.display_lines = lines;
        self
    }

    pub fn with_display_timeout(mut self, timeout: Duration) -> Self {
        self.display_timeout = timeout;
        self
    }

    pub fn with_message_ttl(mut self, ttl: Duration) -> Self {
        self.message_ttl = ttl;
        self
    }

    pub fn with_track_poll_interval(mut self, interval: Duration) -> Self {
        self.track_poll_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.volume_step_up, 4);
        assert_eq!(config.volume_step_down, 5);
        assert_eq!(config.track_poll_interval, Duration::from_secs(2));
        assert_eq!(config.operation_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        assert!(ControllerConfig::two_line_display().validate().is_ok());
        assert!(ControllerConfig::bench().validate().is_ok());
    }

    #[test]
    fn test_with_zones_sets_default() {
        let config = ControllerConfig::new().with_zones(["Kitchen", "Den"]);
        assert_eq!(config.default_zone, "Kitchen");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = ControllerConfig::new().with_zones(Vec::<String>::new());
        assert_eq!(config.validate(), Err(ConfigError::NoZones));

        let config = ControllerConfig::new().with_default_zone("Attic");
        assert_eq!(
            config.validate(),
            Err(ConfigError::DefaultZoneNotInRing("Attic".to_string()))
        );

        let config = ControllerConfig::new().with_volume_steps(0, 5);
        assert_eq!(config.validate(), Err(ConfigError::ZeroVolumeStep));

        let config = ControllerConfig::new().with_display(3, 2);
        assert_eq!(config.validate(), Err(ConfigError::DisplayWidth(3)));

        let config = ControllerConfig::new().with_display(20, 5);
        assert_eq!(config.validate(), Err(ConfigError::DisplayLines(5)));

        let config = ControllerConfig::new().with_message_ttl(Duration::ZERO);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration("message_ttl"))
        );

        let mut config = ControllerConfig::new();
        config.idle_refresh_interval = Duration::from_secs(5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IdleRefreshTooFast(_))
        ));
    }

    #[test]
    fn test_decoder_errors_propagate() {
        let mut config = ControllerConfig::new();
        config.decoder = DecoderConfig::default().with_end_quiet(Duration::from_millis(100));
        assert!(matches!(config.validate(), Err(ConfigError::Decoder(_))));
    }
}
