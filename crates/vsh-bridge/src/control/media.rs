//! Audio: volume, volumeGroup

use vsh_conv::Conversion;
use vsh_core::Role;

use super::kind::Wired;
use super::Wiring;
use crate::capability::{Capability, CapabilityKind};
use crate::error::ControlError;
use crate::property::{Adjust, Property, PropertyKind};

/// volume, volumeGroup: volume on SET/ACTUAL, mute on MUTE
pub(super) fn speaker(w: &Wiring<'_>) -> Result<Wired, ControlError> {
    let set = w.require(Role::Set)?;
    let (min, max) = set.range().unwrap_or((0.0, 100.0));

    let mut properties = vec![Property::new(
        PropertyKind::Volume,
        &set.id,
        Conversion::Percent { min, max },
    )
    .with_get_id(w.actual_id())
    .with_adjust(Adjust::Percent)];
    if let Some(mute) = w.point(Role::Mute) {
        properties.push(Property::new(PropertyKind::Muted, &mute.id, Conversion::Flag));
    }

    Ok(Wired {
        supported: vec![Capability::new(CapabilityKind::Speaker, properties)],
        ..Default::default()
    })
}
