//! Fan definitions - loaded once at startup
//!
//! The on-disk format (YAML, or JSON by extension) is parsed into raw serde
//! structs and then validated into immutable definitions. Validation fails
//! on the first problem found so a partially described fan never reaches
//! the monitor.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{FanMonError, Result};
use crate::types::DEFAULT_TARGET_INTERFACE;

/// Default allowed deviation from the expected speed, in percent
pub const DEFAULT_DEVIATION: u8 = 15;

/// How a tach sensor decides a reading is a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultMethod {
    /// Out of range continuously for the nonfunctional timeout
    Timebased,
    /// `threshold` consecutive out of range readings
    Count { threshold: usize },
}

/// Presence rule of a tach presence method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TachRule {
    /// Every listed sensor spins
    #[default]
    All,
    /// At least one listed sensor spins
    Any,
}

/// One way of detecting that a fan is installed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PresenceMethod {
    Tach {
        sensors: Vec<String>,
        rule: TachRule,
    },
    Gpio {
        physpath: String,
        devpath: String,
        key: u32,
    },
}

/// Redundancy policy combining a fan's presence methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    AnyOf,
    Fallback,
}

/// sysfs attributes backing a tach sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HwmonBinding {
    pub input: PathBuf,
    pub target: Option<PathBuf>,
}

/// Validated tach sensor definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TachSensorDefinition {
    pub name: String,
    pub has_target: bool,
    pub target_interface: String,
    pub factor: f64,
    pub offset: i64,
    pub method: FaultMethod,
    /// Allowed deviation in percent
    pub deviation: u8,
    /// In-range time required before returning to functional
    pub func_delay: Duration,
    /// Out-of-range time required before going nonfunctional (timebased)
    pub timeout: Duration,
    /// Nonfunctional time before an error record; `None` never escalates
    pub error_delay: Option<Duration>,
    pub binding: Option<HwmonBinding>,
}

/// Validated presence configuration of one fan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceDefinition {
    /// Methods in configured order
    pub methods: Vec<PresenceMethod>,
    pub policy: PolicyKind,
}

/// Validated fan definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FanDefinition {
    pub name: String,
    pub inventory: String,
    pub num_sensor_fails_for_nonfunc: usize,
    pub sensors: Vec<TachSensorDefinition>,
    pub presence: PresenceDefinition,
}

/// All fans known to the monitor
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FanConfig {
    pub fans: Vec<FanDefinition>,
}

impl FanConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: RawFanConfig = serde_yaml::from_str(content)
            .map_err(|e| FanMonError::Config(format!("Failed to parse fan config: {}", e)))?;
        Self::from_raw(raw)
    }

    /// Parse and validate a JSON document
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: RawFanConfig = serde_json::from_str(content)
            .map_err(|e| FanMonError::Config(format!("Failed to parse fan config: {}", e)))?;
        Self::from_raw(raw)
    }

    /// Parse using the format implied by `path`'s extension (YAML unless `.json`)
    pub fn parse_for_path(path: &Path, content: &str) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(content),
            _ => Self::from_yaml(content),
        }
    }

    /// Validate raw definitions
    pub fn from_raw(raw: RawFanConfig) -> Result<Self> {
        let mut fan_names = HashSet::new();
        let mut sensor_names = HashSet::new();
        let mut fans = Vec::with_capacity(raw.fans.len());

        for raw_fan in raw.fans {
            if !fan_names.insert(raw_fan.name.clone()) {
                return Err(FanMonError::Config(format!(
                    "Duplicate fan name: {}",
                    raw_fan.name
                )));
            }

            let fan = FanDefinition::from_raw(raw_fan)?;
            for sensor in &fan.sensors {
                if !sensor_names.insert(sensor.name.clone()) {
                    return Err(FanMonError::Config(format!(
                        "Duplicate tach sensor name: {} (fan {})",
                        sensor.name, fan.name
                    )));
                }
            }
            fans.push(fan);
        }

        // Tach presence reads rotor values only a monitored sensor publishes
        for fan in &fans {
            for method in &fan.presence.methods {
                if let PresenceMethod::Tach { sensors, .. } = method {
                    if let Some(unknown) = sensors.iter().find(|s| !sensor_names.contains(*s)) {
                        return Err(FanMonError::Config(format!(
                            "Tach presence for fan {} references unknown sensor {}",
                            fan.name, unknown
                        )));
                    }
                }
            }
        }

        Ok(Self { fans })
    }

    pub fn fan(&self, name: &str) -> Option<&FanDefinition> {
        self.fans.iter().find(|f| f.name == name)
    }
}

impl FanDefinition {
    fn from_raw(raw: RawFan) -> Result<Self> {
        if raw.sensors.is_empty() {
            return Err(FanMonError::Config(format!(
                "Fan {} has no tach sensors",
                raw.name
            )));
        }
        if raw.num_sensor_fails_for_nonfunc == 0 {
            return Err(FanMonError::Config(format!(
                "Fan {}: num_sensor_fails_for_nonfunc must be at least 1",
                raw.name
            )));
        }

        let fan_deviation = raw.deviation.unwrap_or(DEFAULT_DEVIATION);
        let sensors = raw
            .sensors
            .into_iter()
            .map(|s| TachSensorDefinition::from_raw(&raw.name, fan_deviation, s))
            .collect::<Result<Vec<_>>>()?;

        let Some(presence) = raw.presence else {
            return Err(FanMonError::Config(format!(
                "Missing required fan presence properties for fan {} (methods, rpolicy)",
                raw.name
            )));
        };
        let presence = PresenceDefinition::from_raw(&raw.name, presence)?;

        Ok(Self {
            name: raw.name,
            inventory: raw.inventory,
            num_sensor_fails_for_nonfunc: raw.num_sensor_fails_for_nonfunc,
            sensors,
            presence,
        })
    }
}

impl TachSensorDefinition {
    fn from_raw(fan: &str, fan_deviation: u8, raw: RawTachSensor) -> Result<Self> {
        let deviation = raw.deviation.unwrap_or(fan_deviation);
        if deviation > 100 {
            return Err(FanMonError::Config(format!(
                "Fan {} sensor {}: deviation {} exceeds 100%",
                fan, raw.name, deviation
            )));
        }

        let method = match raw.method.to_lowercase().as_str() {
            "timebased" => FaultMethod::Timebased,
            "count" => {
                if raw.threshold == 0 {
                    return Err(FanMonError::Config(format!(
                        "Fan {} sensor {}: count method requires threshold >= 1",
                        fan, raw.name
                    )));
                }
                FaultMethod::Count {
                    threshold: raw.threshold,
                }
            }
            other => {
                return Err(FanMonError::Config(format!(
                    "Fan {} sensor {}: invalid fault method '{}'",
                    fan, raw.name, other
                )))
            }
        };

        let binding = raw.input.map(|input| HwmonBinding {
            input,
            target: raw.target,
        });

        Ok(Self {
            name: raw.name,
            has_target: raw.has_target,
            target_interface: raw.target_interface,
            factor: raw.factor,
            offset: raw.offset,
            method,
            deviation,
            func_delay: Duration::from_secs(raw.func_delay),
            timeout: Duration::from_secs(raw.timeout),
            error_delay: raw.error_delay.map(Duration::from_secs),
            binding,
        })
    }
}

impl PresenceDefinition {
    fn from_raw(fan: &str, raw: RawPresence) -> Result<Self> {
        let (Some(raw_methods), Some(rpolicy)) = (raw.methods, raw.rpolicy) else {
            return Err(FanMonError::Config(format!(
                "Missing required fan presence properties for fan {} (methods, rpolicy)",
                fan
            )));
        };

        let methods = raw_methods
            .into_iter()
            .map(|m| PresenceMethod::from_raw(fan, m))
            .collect::<Result<Vec<_>>>()?;
        if methods.is_empty() {
            return Err(FanMonError::Config(format!(
                "Fan {} has no presence methods",
                fan
            )));
        }

        let Some(policy_type) = rpolicy.kind else {
            return Err(FanMonError::Config(format!(
                "Missing required fan presence policy type for fan {}",
                fan
            )));
        };
        let policy = match policy_type.to_lowercase().as_str() {
            "anyof" => PolicyKind::AnyOf,
            "fallback" => PolicyKind::Fallback,
            other => {
                return Err(FanMonError::Config(format!(
                    "Invalid fan presence policy type '{}' for fan {}",
                    other, fan
                )))
            }
        };

        Ok(Self { methods, policy })
    }
}

impl PresenceMethod {
    fn from_raw(fan: &str, raw: RawMethod) -> Result<Self> {
        let Some(kind) = raw.kind else {
            return Err(FanMonError::Config(format!(
                "Missing required fan presence method type for fan {}",
                fan
            )));
        };

        match kind.to_lowercase().as_str() {
            "tach" => {
                let sensors = raw.sensors.unwrap_or_default();
                if sensors.is_empty() {
                    return Err(FanMonError::Config(format!(
                        "Missing required tach method properties for fan {} (sensors)",
                        fan
                    )));
                }
                let rule = match raw.rule.as_deref().map(str::to_lowercase).as_deref() {
                    None | Some("all") => TachRule::All,
                    Some("any") => TachRule::Any,
                    Some(other) => {
                        return Err(FanMonError::Config(format!(
                            "Invalid tach presence rule '{}' for fan {}",
                            other, fan
                        )))
                    }
                };
                Ok(PresenceMethod::Tach { sensors, rule })
            }
            "gpio" => match (raw.physpath, raw.devpath, raw.key) {
                (Some(physpath), Some(devpath), Some(key)) => Ok(PresenceMethod::Gpio {
                    physpath,
                    devpath,
                    key,
                }),
                _ => Err(FanMonError::Config(format!(
                    "Missing required gpio method properties for fan {} (physpath, devpath, key)",
                    fan
                ))),
            },
            other => Err(FanMonError::Config(format!(
                "Invalid fan presence method type '{}' for fan {}",
                other, fan
            ))),
        }
    }
}

/// On-disk fan config document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFanConfig {
    #[serde(default)]
    pub fans: Vec<RawFan>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFan {
    pub name: String,
    pub inventory: String,
    #[serde(default)]
    pub deviation: Option<u8>,
    #[serde(default = "default_num_sensor_fails")]
    pub num_sensor_fails_for_nonfunc: usize,
    #[serde(default)]
    pub sensors: Vec<RawTachSensor>,
    #[serde(default)]
    pub presence: Option<RawPresence>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTachSensor {
    pub name: String,
    #[serde(default)]
    pub has_target: bool,
    #[serde(default = "default_target_interface")]
    pub target_interface: String,
    #[serde(default = "default_factor")]
    pub factor: f64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_threshold")]
    pub threshold: usize,
    #[serde(default)]
    pub deviation: Option<u8>,
    #[serde(default)]
    pub func_delay: u64,
    #[serde(default)]
    pub timeout: u64,
    #[serde(default)]
    pub error_delay: Option<u64>,
    #[serde(default)]
    pub input: Option<PathBuf>,
    #[serde(default)]
    pub target: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPresence {
    #[serde(default)]
    pub methods: Option<Vec<RawMethod>>,
    #[serde(default)]
    pub rpolicy: Option<RawPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMethod {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub sensors: Option<Vec<String>>,
    #[serde(default)]
    pub rule: Option<String>,
    #[serde(default)]
    pub physpath: Option<String>,
    #[serde(default)]
    pub devpath: Option<String>,
    #[serde(default)]
    pub key: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPolicy {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

fn default_num_sensor_fails() -> usize {
    1
}

fn default_target_interface() -> String {
    DEFAULT_TARGET_INTERFACE.to_string()
}

fn default_factor() -> f64 {
    1.0
}

fn default_method() -> String {
    "timebased".to_string()
}

fn default_threshold() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
fans:
  - name: fan0
    inventory: /system/chassis/motherboard/fan0
    deviation: 20
    sensors:
      - name: fan0_0
        has_target: true
        factor: 1.5
        offset: -100
        method: Count
        threshold: 3
        func_delay: 5
        error_delay: 30
        input: /sys/class/hwmon/hwmon3/fan1_input
        target: /sys/class/hwmon/hwmon3/fan1_target
      - name: fan0_1
        timeout: 10
        deviation: 10
    presence:
      methods:
        - type: TACH
          sensors: [fan0_0, fan0_1]
        - type: gpio
          physpath: /sys/devices/platform/gpio-keys
          devpath: /dev/input/by-path/platform-gpio-keys-event
          key: 123
      rpolicy:
        type: fallback
"#;

    fn minimal(presence: &str) -> String {
        format!(
            r#"
fans:
  - name: fan0
    inventory: /fan0
    sensors:
      - name: fan0_0
{}
"#,
            presence
        )
    }

    #[test]
    fn test_parse_sample() {
        let config = FanConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.fans.len(), 1);

        let fan = config.fan("fan0").unwrap();
        assert_eq!(fan.num_sensor_fails_for_nonfunc, 1);
        assert_eq!(fan.sensors.len(), 2);

        let s0 = &fan.sensors[0];
        assert!(s0.has_target);
        assert_eq!(s0.method, FaultMethod::Count { threshold: 3 });
        assert_eq!(s0.deviation, 20);
        assert_eq!(s0.offset, -100);
        assert_eq!(s0.func_delay, Duration::from_secs(5));
        assert_eq!(s0.error_delay, Some(Duration::from_secs(30)));
        assert_eq!(s0.target_interface, DEFAULT_TARGET_INTERFACE);
        assert!(s0.binding.as_ref().unwrap().target.is_some());

        let s1 = &fan.sensors[1];
        assert_eq!(s1.method, FaultMethod::Timebased);
        assert_eq!(s1.deviation, 10);
        assert_eq!(s1.timeout, Duration::from_secs(10));
        assert!(s1.error_delay.is_none());
        assert!(s1.binding.is_none());

        assert_eq!(fan.presence.policy, PolicyKind::Fallback);
        assert_eq!(fan.presence.methods.len(), 2);
        assert!(matches!(
            &fan.presence.methods[0],
            PresenceMethod::Tach { rule: TachRule::All, sensors } if sensors.len() == 2
        ));
        assert!(matches!(
            &fan.presence.methods[1],
            PresenceMethod::Gpio { key: 123, .. }
        ));
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"fans": [{"name": "fan1", "inventory": "/fan1",
            "sensors": [{"name": "fan1_0"}],
            "presence": {"methods": [{"type": "tach", "sensors": ["fan1_0"], "rule": "any"}],
                         "rpolicy": {"type": "AnyOf"}}}]}"#;
        let config = FanConfig::parse_for_path(Path::new("fans.json"), json).unwrap();
        let fan = config.fan("fan1").unwrap();
        assert_eq!(fan.presence.policy, PolicyKind::AnyOf);
        assert!(matches!(
            &fan.presence.methods[0],
            PresenceMethod::Tach { rule: TachRule::Any, .. }
        ));
    }

    #[test]
    fn test_missing_presence_is_error() {
        let yaml = minimal("");
        let err = FanConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("Missing required fan presence properties"));
    }

    #[test]
    fn test_unknown_method_type_is_error() {
        let yaml = minimal(
            "    presence:\n      methods:\n        - type: laser\n      rpolicy:\n        type: anyof",
        );
        let err = FanConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("Invalid fan presence method type 'laser'"));
    }

    #[test]
    fn test_missing_method_type_is_error() {
        let yaml = minimal(
            "    presence:\n      methods:\n        - sensors: [fan0_0]\n      rpolicy:\n        type: anyof",
        );
        let err = FanConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("Missing required fan presence method type"));
    }

    #[test]
    fn test_empty_tach_sensor_list_is_error() {
        let yaml = minimal(
            "    presence:\n      methods:\n        - type: tach\n          sensors: []\n      rpolicy:\n        type: anyof",
        );
        let err = FanConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("Missing required tach method properties"));
    }

    #[test]
    fn test_incomplete_gpio_is_error() {
        let yaml = minimal(
            "    presence:\n      methods:\n        - type: gpio\n          devpath: /dev/x\n      rpolicy:\n        type: anyof",
        );
        let err = FanConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("Missing required gpio method properties"));
    }

    #[test]
    fn test_unknown_policy_is_error() {
        let yaml = minimal(
            "    presence:\n      methods:\n        - type: tach\n          sensors: [fan0_0]\n      rpolicy:\n        type: majority",
        );
        let err = FanConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("Invalid fan presence policy type 'majority'"));
    }

    #[test]
    fn test_missing_policy_type_is_error() {
        let yaml = minimal(
            "    presence:\n      methods:\n        - type: tach\n          sensors: [fan0_0]\n      rpolicy: {}",
        );
        let err = FanConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("Missing required fan presence policy type"));
    }

    #[test]
    fn test_fan_without_sensors_is_error() {
        let yaml = r#"
fans:
  - name: fan0
    inventory: /fan0
    presence:
      methods:
        - type: tach
          sensors: [fan0_0]
      rpolicy:
        type: anyof
"#;
        let err = FanConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("has no tach sensors"));
    }

    #[test]
    fn test_count_with_zero_threshold_is_error() {
        let yaml = r#"
fans:
  - name: fan0
    inventory: /fan0
    sensors:
      - name: fan0_0
        method: count
        threshold: 0
    presence:
      methods:
        - type: tach
          sensors: [fan0_0]
      rpolicy:
        type: anyof
"#;
        let err = FanConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("threshold >= 1"));
    }

    #[test]
    fn test_duplicate_names_are_errors() {
        let fan = |name: &str, sensor: &str| {
            format!(
                "  - name: {}\n    inventory: /{}\n    sensors:\n      - name: {}\n    presence:\n      methods:\n        - type: tach\n          sensors: [{}]\n      rpolicy:\n        type: anyof\n",
                name, name, sensor, sensor
            )
        };

        let dup_fan = format!("fans:\n{}{}", fan("fan0", "a"), fan("fan0", "b"));
        let err = FanConfig::from_yaml(&dup_fan).unwrap_err();
        assert!(err.to_string().contains("Duplicate fan name"));

        let dup_sensor = format!("fans:\n{}{}", fan("fan0", "a"), fan("fan1", "a"));
        let err = FanConfig::from_yaml(&dup_sensor).unwrap_err();
        assert!(err.to_string().contains("Duplicate tach sensor name"));
    }

    #[test]
    fn test_unknown_tach_presence_sensor_is_error() {
        let yaml = minimal(
            "    presence:\n      methods:\n        - type: tach\n          sensors: [fan9_0]\n      rpolicy:\n        type: anyof",
        );
        let err = FanConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("references unknown sensor fan9_0"));
    }

    #[test]
    fn test_deviation_over_100_is_error() {
        let yaml = r#"
fans:
  - name: fan0
    inventory: /fan0
    deviation: 150
    sensors:
      - name: fan0_0
    presence:
      methods:
        - type: tach
          sensors: [fan0_0]
      rpolicy:
        type: anyof
"#;
        let err = FanConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("exceeds 100%"));
    }
}
