//! Grouping of backend controls into protocol endpoints
//!
//! - controls tagged with a smart group become one device per group
//!   (a control id is taken once per group)
//! - otherwise controls sharing room and function become one device
//! - anything else becomes a device of its own
//!
//! Unknown control types are skipped; descriptors that fail to wire are
//! skipped with a warning.

use std::collections::HashMap;

use tracing::{debug, warn};
use vsh_core::ControlDescriptor;

use crate::config::ControlDefaults;
use crate::control::{Control, ControlKind};
use crate::device::Device;
use crate::endpoint::EndpointIds;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Smart(String),
    RoomFunction(String, String),
    Single(String),
}

impl GroupKey {
    fn name(&self, first: &ControlDescriptor) -> String {
        match self {
            GroupKey::Smart(group) => group.clone(),
            GroupKey::RoomFunction(room, function) => format!("{room} {function}"),
            GroupKey::Single(_) => first.display_name().to_string(),
        }
    }

    fn raw_id(&self) -> String {
        match self {
            GroupKey::Smart(group) => group.clone(),
            GroupKey::RoomFunction(room, function) => format!("{room} {function}"),
            GroupKey::Single(id) => id.clone(),
        }
    }
}

/// Build the devices for one collection pass, in order of first appearance
pub fn build_devices(descriptors: &[ControlDescriptor], defaults: &ControlDefaults) -> Vec<Device> {
    let mut order: Vec<GroupKey> = Vec::new();
    let mut members: HashMap<GroupKey, Vec<&ControlDescriptor>> = HashMap::new();

    for desc in descriptors {
        if ControlKind::from_tag(&desc.control_type).is_none() {
            debug!(
                control_id = %desc.id,
                control_type = %desc.control_type,
                "Skipping control of unknown type"
            );
            continue;
        }

        let keys: Vec<GroupKey> = if !desc.groups.is_empty() {
            desc.groups.iter().cloned().map(GroupKey::Smart).collect()
        } else if let (Some(room), Some(function)) = (&desc.room, &desc.function) {
            vec![GroupKey::RoomFunction(room.clone(), function.clone())]
        } else {
            vec![GroupKey::Single(desc.id.clone())]
        };

        for key in keys {
            let bucket = members.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Vec::new()
            });
            if bucket.iter().any(|d| d.id == desc.id) {
                debug!(control_id = %desc.id, "Control already grouped, ignoring duplicate");
                continue;
            }
            bucket.push(desc);
        }
    }

    let mut ids = EndpointIds::new();
    let mut devices = Vec::with_capacity(order.len());
    for key in order {
        let Some(bucket) = members.remove(&key) else {
            continue;
        };
        let Some(first) = bucket.first() else {
            continue;
        };
        let name = key.name(first);

        let controls: Vec<Control> = bucket
            .iter()
            .filter_map(|desc| match Control::from_descriptor(desc, defaults) {
                Ok(control) => Some(control),
                Err(e) => {
                    warn!(control_id = %desc.id, error = %e, "Skipping control");
                    None
                }
            })
            .collect();
        if controls.is_empty() {
            continue;
        }

        let toggle = bucket.iter().any(|d| d.toggle);
        let auto_detected = matches!(key, GroupKey::RoomFunction(..));
        devices.push(
            Device::new(ids.assign(&key.raw_id()), name, controls)
                .auto_detected(auto_detected)
                .with_toggle(toggle),
        );
    }
    devices
}
