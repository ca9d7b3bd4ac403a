//! Closed registry of control types

use crate::capability::Capability;
use crate::error::ControlError;

use super::{climate, covers, lights, media, sensors, ModeMemory, Wiring};

/// Control types the bridge knows how to wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Light,
    Socket,
    Dimmer,
    Ct,
    Hue,
    RgbSingle,
    Blind,
    Lock,
    Temperature,
    Thermostat,
    AirCondition,
    Door,
    Window,
    Motion,
    Volume,
    VolumeGroup,
    Gate,
}

/// Capabilities selected for one control
#[derive(Debug, Default)]
pub(crate) struct Wired {
    pub supported: Vec<Capability>,
    pub enforced: Vec<Capability>,
    pub mode_memory: Option<ModeMemory>,
}

impl ControlKind {
    pub const ALL: [ControlKind; 17] = [
        ControlKind::Light,
        ControlKind::Socket,
        ControlKind::Dimmer,
        ControlKind::Ct,
        ControlKind::Hue,
        ControlKind::RgbSingle,
        ControlKind::Blind,
        ControlKind::Lock,
        ControlKind::Temperature,
        ControlKind::Thermostat,
        ControlKind::AirCondition,
        ControlKind::Door,
        ControlKind::Window,
        ControlKind::Motion,
        ControlKind::Volume,
        ControlKind::VolumeGroup,
        ControlKind::Gate,
    ];

    /// Look up a backend type tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Backend type tag
    pub fn tag(&self) -> &'static str {
        match self {
            ControlKind::Light => "light",
            ControlKind::Socket => "socket",
            ControlKind::Dimmer => "dimmer",
            ControlKind::Ct => "ct",
            ControlKind::Hue => "hue",
            ControlKind::RgbSingle => "rgbSingle",
            ControlKind::Blind => "blind",
            ControlKind::Lock => "lock",
            ControlKind::Temperature => "temperature",
            ControlKind::Thermostat => "thermostat",
            ControlKind::AirCondition => "airCondition",
            ControlKind::Door => "door",
            ControlKind::Window => "window",
            ControlKind::Motion => "motion",
            ControlKind::Volume => "volume",
            ControlKind::VolumeGroup => "volumeGroup",
            ControlKind::Gate => "gate",
        }
    }

    /// Display category announced in discovery
    pub fn display_category(&self) -> &'static str {
        match self {
            ControlKind::Light
            | ControlKind::Dimmer
            | ControlKind::Ct
            | ControlKind::Hue
            | ControlKind::RgbSingle => "LIGHT",
            ControlKind::Socket => "SMARTPLUG",
            ControlKind::Blind => "INTERIOR_BLIND",
            ControlKind::Lock => "SMARTLOCK",
            ControlKind::Temperature => "TEMPERATURE_SENSOR",
            ControlKind::Thermostat => "THERMOSTAT",
            ControlKind::AirCondition => "AIR_CONDITIONER",
            ControlKind::Door | ControlKind::Window => "CONTACT_SENSOR",
            ControlKind::Motion => "MOTION_SENSOR",
            ControlKind::Volume | ControlKind::VolumeGroup => "SPEAKER",
            ControlKind::Gate => "GARAGE_DOOR",
        }
    }

    pub(crate) fn wire(&self, w: &Wiring<'_>) -> Result<Wired, ControlError> {
        match self {
            ControlKind::Light | ControlKind::Socket => lights::switch(w),
            ControlKind::Dimmer => lights::dimmer(w),
            ControlKind::Ct => lights::color_temperature(w),
            ControlKind::Hue => lights::hue(w),
            ControlKind::RgbSingle => lights::rgb_single(w),
            ControlKind::Blind => covers::blind(w),
            ControlKind::Gate => covers::gate(w),
            ControlKind::Lock => covers::lock(w),
            ControlKind::Temperature => climate::temperature(w),
            ControlKind::Thermostat => climate::thermostat(w, false),
            ControlKind::AirCondition => climate::thermostat(w, true),
            ControlKind::Door | ControlKind::Window => sensors::contact(w),
            ControlKind::Motion => sensors::motion(w),
            ControlKind::Volume | ControlKind::VolumeGroup => media::speaker(w),
        }
    }
}

impl std::fmt::Display for ControlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
