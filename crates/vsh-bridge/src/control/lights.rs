//! Lights and switches: light, socket, dimmer, ct, hue, rgbSingle

use serde_json::json;
use vsh_conv::{denormalize, Conversion};
use vsh_core::{DataPoint, Role};

use super::kind::Wired;
use super::Wiring;
use crate::capability::{Capability, CapabilityKind};
use crate::error::ControlError;
use crate::property::{Adjust, Property, PropertyKind};

const KELVIN_RANGE: (f64, f64) = (2200.0, 7000.0);
const MIRED_RANGE: (f64, f64) = (153.0, 500.0);

fn switch_conversion() -> Conversion {
    Conversion::Power {
        on: json!(true),
        off: json!(false),
    }
}

fn percent_range(point: &DataPoint) -> (f64, f64) {
    point.range().unwrap_or((0.0, 100.0))
}

/// Brightness over a level point
fn brightness(point: &DataPoint, get_id: Option<&str>) -> Capability {
    let (min, max) = percent_range(point);
    Capability::single(
        CapabilityKind::BrightnessController,
        Property::new(
            PropertyKind::Brightness,
            &point.id,
            Conversion::Percent { min, max },
        )
        .with_get_id(get_id)
        .with_adjust(Adjust::Percent),
    )
}

/// Power from a dedicated switch point, else derived from the level point,
/// read from `level_get_id` when the level is read elsewhere
fn power(
    w: &Wiring<'_>,
    level: Option<&DataPoint>,
    level_get_id: Option<&str>,
) -> Option<Capability> {
    let property = if let Some(on_set) = w.point(Role::OnSet) {
        Property::new(PropertyKind::PowerState, &on_set.id, switch_conversion())
            .with_get_id(w.point(Role::OnActual).map(|p| p.id.as_str()))
    } else if let Some((_, on)) = w.first(&[Role::On, Role::Power]) {
        Property::new(PropertyKind::PowerState, &on.id, switch_conversion())
    } else {
        let level = level?;
        let (min, max) = percent_range(level);
        let on_level = denormalize(w.defaults.dimmer_on_level.min(100.0), min, max).unwrap_or(max);
        Property::new(
            PropertyKind::PowerState,
            &level.id,
            Conversion::LevelPower {
                on_level,
                off_level: min,
            },
        )
        .with_get_id(level_get_id)
    };
    Some(Capability::single(CapabilityKind::PowerController, property))
}

/// Optional brightness on DIMMER/BRIGHTNESS plus power, shared by colour lights
fn brightness_and_power(w: &Wiring<'_>, supported: &mut Vec<Capability>) {
    let level = w.first(&[Role::Dimmer, Role::Brightness]).map(|(_, p)| p);
    if let Some(level) = level {
        supported.push(brightness(level, None));
    }
    if let Some(power) = power(w, level, None) {
        supported.push(power);
    }
}

/// Colour temperature in kelvin, or mireds when the declared maximum is small
fn color_temperature_capability(point: &DataPoint) -> Capability {
    let mired = point.max.is_some_and(|max| max <= 1000.0);
    let (min, max) = point
        .range()
        .unwrap_or(if mired { MIRED_RANGE } else { KELVIN_RANGE });
    Capability::single(
        CapabilityKind::ColorTemperatureController,
        Property::new(
            PropertyKind::ColorTemperature,
            &point.id,
            Conversion::Kelvin { mired, min, max },
        )
        .with_adjust(Adjust::ColorTemperatureSteps),
    )
}

/// light, socket: switch on SET/ACTUAL; brightness absorbed as on/off
pub(super) fn switch(w: &Wiring<'_>) -> Result<Wired, ControlError> {
    let set = w.require(Role::Set)?;
    let power = Property::new(PropertyKind::PowerState, &set.id, switch_conversion())
        .with_get_id(w.actual_id());
    let enforced_brightness = Property::new(PropertyKind::Brightness, &set.id, Conversion::PercentSwitch)
        .with_get_id(w.actual_id());

    Ok(Wired {
        supported: vec![Capability::single(CapabilityKind::PowerController, power)],
        enforced: vec![Capability::single(
            CapabilityKind::BrightnessController,
            enforced_brightness,
        )],
        mode_memory: None,
    })
}

/// dimmer: brightness on SET/DIMMER/BRIGHTNESS, power on ON_SET or derived
pub(super) fn dimmer(w: &Wiring<'_>) -> Result<Wired, ControlError> {
    let (role, level) = w.require_any(&[Role::Set, Role::Dimmer, Role::Brightness])?;
    let get_id = if role == Role::Set { w.actual_id() } else { None };

    let mut supported = vec![brightness(level, get_id)];
    supported.extend(power(w, Some(level), get_id));
    Ok(Wired {
        supported,
        ..Default::default()
    })
}

/// ct: colour temperature on TEMPERATURE, optional brightness and power
pub(super) fn color_temperature(w: &Wiring<'_>) -> Result<Wired, ControlError> {
    let temperature = w.require(Role::Temperature)?;
    let mut supported = vec![color_temperature_capability(temperature)];
    brightness_and_power(w, &mut supported);
    Ok(Wired {
        supported,
        ..Default::default()
    })
}

/// hue: colour on HUE with SATURATION and the level as further parts,
/// optional brightness, colour temperature and power
pub(super) fn hue(w: &Wiring<'_>) -> Result<Wired, ControlError> {
    let hue = w.require(Role::Hue)?;
    let saturation = w.point(Role::Saturation);
    let level = w.first(&[Role::Dimmer, Role::Brightness]).map(|(_, p)| p);

    let mut parts = vec![("hue", hue.id.clone())];
    parts.extend(saturation.map(|p| ("saturation", p.id.clone())));
    parts.extend(level.map(|p| ("brightness", p.id.clone())));
    let conversion = Conversion::HsbParts {
        hue: hue.range().unwrap_or((0.0, 360.0)),
        saturation: saturation.map(percent_range),
        brightness: level.map(percent_range),
    };
    let mut supported = vec![Capability::single(
        CapabilityKind::ColorController,
        Property::new(PropertyKind::Color, &hue.id, conversion).with_parts(parts),
    )];
    if let Some(temperature) = w.point(Role::Temperature) {
        supported.push(color_temperature_capability(temperature));
    }
    brightness_and_power(w, &mut supported);
    Ok(Wired {
        supported,
        ..Default::default()
    })
}

/// rgbSingle: colour as `#rrggbb` on SET
pub(super) fn rgb_single(w: &Wiring<'_>) -> Result<Wired, ControlError> {
    let set = w.require(Role::Set)?;
    let mut supported = vec![Capability::single(
        CapabilityKind::ColorController,
        Property::new(PropertyKind::Color, &set.id, Conversion::HexColor).with_get_id(w.actual_id()),
    )];
    brightness_and_power(w, &mut supported);
    Ok(Wired {
        supported,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use crate::config::ControlDefaults;
    use crate::control::tests::TestBackend;
    use crate::control::Control;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vsh_core::{ControlDescriptor, DataPoint, Directive, Role};

    fn interfaces(control: &Control) -> Vec<&'static str> {
        control.supported().iter().map(|c| c.interface()).collect()
    }

    #[tokio::test]
    async fn test_dimmer_turn_on_writes_default_level() {
        let desc = ControlDescriptor::new("dim", "dimmer").with_state(
            Role::Brightness,
            DataPoint::number("dim.level").with_range(0.0, 100.0),
        );
        let dim = Control::from_descriptor(&desc, &ControlDefaults::default()).unwrap();
        assert_eq!(
            interfaces(&dim),
            vec!["Alexa.BrightnessController", "Alexa.PowerController"]
        );

        let backend = TestBackend::default();
        let on = Directive::new("Alexa.PowerController", "TurnOn");
        let reported = dim.handle(&backend, &on, None).await.unwrap();
        assert_eq!(reported.value, json!("ON"));
        assert_eq!(
            backend.writes.lock().clone(),
            vec![("dim.level".to_string(), json!(100))]
        );

        let off = Directive::new("Alexa.PowerController", "TurnOff");
        assert_eq!(dim.handle(&backend, &off, None).await.unwrap().value, json!("OFF"));
        assert_eq!(backend.writes.lock()[1].1, json!(0));
    }

    #[tokio::test]
    async fn test_dimmer_on_level_scales_into_range() {
        let desc = ControlDescriptor::new("dim", "dimmer").with_state(
            Role::Dimmer,
            DataPoint::number("dim.level").with_range(0.0, 254.0),
        );
        let defaults = ControlDefaults {
            dimmer_on_level: 50.0,
            ..Default::default()
        };
        let dim = Control::from_descriptor(&desc, &defaults).unwrap();
        let backend = TestBackend::default();
        let on = Directive::new("Alexa.PowerController", "TurnOn");
        dim.handle(&backend, &on, None).await.unwrap();
        assert_eq!(backend.writes.lock()[0].1, json!(127));
    }

    #[tokio::test]
    async fn test_dimmer_with_switch_point() {
        let desc = ControlDescriptor::new("dim", "dimmer")
            .with_state(Role::Set, DataPoint::number("dim.level"))
            .with_state(Role::OnSet, DataPoint::boolean("dim.on"))
            .with_state(Role::OnActual, DataPoint::boolean("dim.on_actual"));
        let dim = Control::from_descriptor(&desc, &ControlDefaults::default()).unwrap();
        let backend = TestBackend::with(&[("dim.on_actual", json!(false))]);
        let on = Directive::new("Alexa.PowerController", "TurnOn");
        dim.handle(&backend, &on, None).await.unwrap();
        assert_eq!(backend.writes.lock()[0], ("dim.on".to_string(), json!(true)));
        assert!(dim.backend_ids().contains(&"dim.on_actual".to_string()));
    }

    #[tokio::test]
    async fn test_ct_mired_and_steps() {
        let desc = ControlDescriptor::new("ct", "ct")
            .with_state(
                Role::Temperature,
                DataPoint::number("ct.mired").with_range(153.0, 500.0),
            )
            .with_state(Role::Dimmer, DataPoint::number("ct.level"));
        let ct = Control::from_descriptor(&desc, &ControlDefaults::default()).unwrap();
        assert_eq!(
            interfaces(&ct),
            vec![
                "Alexa.ColorTemperatureController",
                "Alexa.BrightnessController",
                "Alexa.PowerController"
            ]
        );

        // 370 mired ≈ 2700 K
        let backend = TestBackend::with(&[("ct.mired", json!(370))]);
        let warmer = Directive::new("Alexa.ColorTemperatureController", "IncreaseColorTemperature");
        let reported = ct.handle(&backend, &warmer, None).await.unwrap();
        assert_eq!(reported.value, json!(4000));
        assert_eq!(backend.writes.lock()[0], ("ct.mired".to_string(), json!(250)));
    }

    #[tokio::test]
    async fn test_hue_color() {
        let desc = ControlDescriptor::new("bulb", "hue").with_state(
            Role::Hue,
            DataPoint::number("bulb.hue").with_range(0.0, 360.0),
        );
        let bulb = Control::from_descriptor(&desc, &ControlDefaults::default()).unwrap();
        assert_eq!(interfaces(&bulb), vec!["Alexa.ColorController"]);

        let backend = TestBackend::default();
        let set = Directive::new("Alexa.ColorController", "SetColor")
            .with_payload(json!({"color": {"hue": 120, "saturation": 1, "brightness": 1}}));
        bulb.handle(&backend, &set, None).await.unwrap();
        assert_eq!(backend.writes.lock()[0].1, json!(120));
    }

    #[tokio::test]
    async fn test_dimmer_power_reads_actual_level() {
        let desc = ControlDescriptor::new("dim", "dimmer")
            .with_state(Role::Set, DataPoint::number("dim.level").with_range(0.0, 100.0))
            .with_state(Role::Actual, DataPoint::number("dim.actual").with_range(0.0, 100.0));
        let dim = Control::from_descriptor(&desc, &ControlDefaults::default()).unwrap();
        let backend = TestBackend::with(&[("dim.level", json!(0)), ("dim.actual", json!(80))]);

        let reported = dim.report_state(&backend).await;
        let values: Vec<(&str, serde_json::Value)> = reported
            .iter()
            .map(|p| (p.name.as_str(), p.value.clone()))
            .collect();
        assert_eq!(
            values,
            vec![("brightness", json!(80)), ("powerState", json!("ON"))]
        );
        assert_eq!(dim.backend_ids(), vec!["dim.actual".to_string()]);
    }

    fn full_color_bulb() -> Control {
        let desc = ControlDescriptor::new("bulb", "hue")
            .with_state(Role::Hue, DataPoint::number("bulb.hue").with_range(0.0, 360.0))
            .with_state(
                Role::Saturation,
                DataPoint::number("bulb.sat").with_range(0.0, 100.0),
            )
            .with_state(Role::Dimmer, DataPoint::number("bulb.dim").with_range(0.0, 100.0));
        Control::from_descriptor(&desc, &ControlDefaults::default()).unwrap()
    }

    #[tokio::test]
    async fn test_hue_set_color_writes_every_part() {
        let bulb = full_color_bulb();
        let backend = TestBackend::default();
        let set = Directive::new("Alexa.ColorController", "SetColor").with_payload(
            json!({"color": {"hue": 120, "saturation": 0.5, "brightness": 0.5}}),
        );
        let reported = bulb.handle(&backend, &set, None).await.unwrap();

        assert_eq!(
            backend.writes.lock().clone(),
            vec![
                ("bulb.hue".to_string(), json!(120)),
                ("bulb.sat".to_string(), json!(50)),
                ("bulb.dim".to_string(), json!(50)),
            ]
        );
        assert_eq!(
            reported.value,
            json!({"hue": 120.0, "saturation": 0.5, "brightness": 0.5})
        );
    }

    #[tokio::test]
    async fn test_hue_reports_color_from_backend_points() {
        let bulb = full_color_bulb();
        let backend = TestBackend::with(&[
            ("bulb.hue", json!(120)),
            ("bulb.sat", json!(10)),
            ("bulb.dim", json!(20)),
        ]);
        let reported = bulb.report_state(&backend).await;
        let color = reported.iter().find(|p| p.name == "color").unwrap();
        assert_eq!(
            color.value,
            json!({"hue": 120.0, "saturation": 0.1, "brightness": 0.2})
        );
        let brightness = reported.iter().find(|p| p.name == "brightness").unwrap();
        assert_eq!(brightness.value, json!(20));

        // a saturation change reaches the cached colour
        assert!(bulb.observe("bulb.sat", &json!(40)));
        assert!(!bulb.observe("bulb.sat", &json!(40)));
        let reported = bulb.report_state(&backend).await;
        let color = reported.iter().find(|p| p.name == "color").unwrap();
        assert_eq!(color.value["saturation"], json!(0.4));
        assert!(bulb.backend_ids().contains(&"bulb.sat".to_string()));
    }

    #[tokio::test]
    async fn test_rgb_single_hex() {
        let desc = ControlDescriptor::new("strip", "rgbSingle")
            .with_state(Role::Set, DataPoint::new("strip.rgb", Default::default()))
            .with_state(Role::On, DataPoint::boolean("strip.on"));
        let strip = Control::from_descriptor(&desc, &ControlDefaults::default()).unwrap();
        let backend = TestBackend::default();
        let set = Directive::new("Alexa.ColorController", "SetColor")
            .with_payload(json!({"color": {"hue": 0, "saturation": 1, "brightness": 1}}));
        let reported = strip.handle(&backend, &set, None).await.unwrap();
        assert_eq!(backend.writes.lock()[0].1, json!("#ff0000"));
        assert_eq!(reported.value["hue"], json!(0.0));
        assert_eq!(
            interfaces(&strip),
            vec!["Alexa.ColorController", "Alexa.PowerController"]
        );
    }
}
