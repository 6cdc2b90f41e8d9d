//! OEM configuration and udev rule generation for hardware assignment
//!
//! An OEM package assigns devices to packages. Each assignment compiles to
//! a udev rule file tagging the matching devices with the owning part id.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Tag attached to every assigned device
pub const ASSIGN_TAG: &str = "snappy-assign";

/// The `oem` block of an OEM package manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Oem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<OemStore>,

    #[serde(default)]
    pub software: OemSoftware,

    #[serde(default)]
    pub hardware: OemHardware,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OemStore {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OemSoftware {
    /// Packages that can never be removed
    #[serde(default, rename = "built-in")]
    pub built_in: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OemHardware {
    #[serde(default)]
    pub assign: Vec<HardwareAssign>,
}

/// Devices matched by `rules` belong to `part_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HardwareAssign {
    pub part_id: String,

    #[serde(default)]
    pub rules: Vec<HardwareRule>,
}

/// One device match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HardwareRule {
    pub kernel: Option<String>,
    pub subsystem: Option<String>,
    pub with_subsystems: Option<String>,
    pub with_driver: Option<String>,
    /// `key=value` pairs matched against device attributes
    pub with_attrs: Vec<String>,
    /// `key=value` pairs matched against device properties
    pub with_props: Vec<String>,
}

impl Oem {
    pub fn store_id(&self) -> Option<&str> {
        self.store.as_ref().map(|s| s.id.as_str()).filter(|id| !id.is_empty())
    }

    /// Rule file name and content for every hardware assignment
    pub fn udev_rule_files(&self, qualified_name: &str) -> Result<Vec<(String, String)>> {
        self.hardware
            .assign
            .iter()
            .map(|assign| Ok((assign.rule_file_name(qualified_name), assign.udev_rules()?)))
            .collect()
    }
}

impl HardwareAssign {
    pub fn rule_file_name(&self, qualified_name: &str) -> String {
        format!("80-snappy_{}_{}.rules", qualified_name, self.part_id)
    }

    /// Render all rules, each block followed by a blank line
    pub fn udev_rules(&self) -> Result<String> {
        let mut out = String::new();
        for rule in &self.rules {
            out.push_str(&self.render_rule(rule)?);
            out.push_str("\n\n");
        }
        Ok(out)
    }

    fn render_rule(&self, rule: &HardwareRule) -> Result<String> {
        let mut clauses = Vec::new();

        if let Some(kernel) = non_empty(&rule.kernel) {
            clauses.push(format!("KERNEL==\"{}\"", kernel));
        } else if let Some(subsystem) = non_empty(&rule.subsystem) {
            clauses.push(format!("SUBSYSTEM==\"{}\"", subsystem));
            if let Some(subsystems) = non_empty(&rule.with_subsystems) {
                clauses.push(format!("SUBSYSTEMS==\"{}\"", subsystems));
            }
            if let Some(driver) = non_empty(&rule.with_driver) {
                clauses.push(format!("DRIVER==\"{}\"", driver));
            }
            for attr in &rule.with_attrs {
                let (key, value) = self.split_pair(attr)?;
                clauses.push(format!("ATTRS{{{}}}==\"{}\"", key, value));
            }
            for prop in &rule.with_props {
                let (key, value) = self.split_pair(prop)?;
                clauses.push(format!("ENV{{{}}}==\"{}\"", key, value));
            }
        } else {
            return Err(CoreError::InvalidHardwareRule {
                part_id: self.part_id.clone(),
                message: "rule needs either 'kernel' or 'subsystem'".to_string(),
            });
        }

        clauses.push(format!("TAG:=\"{}\"", ASSIGN_TAG));
        clauses.push(format!("ENV{{SNAPPY_APP}}:=\"{}\"", self.part_id));
        Ok(clauses.join(", "))
    }

    fn split_pair<'a>(&self, pair: &'a str) -> Result<(&'a str, &'a str)> {
        pair.split_once('=')
            .ok_or_else(|| CoreError::InvalidHardwareRule {
                part_id: self.part_id.clone(),
                message: format!("'{}' is not a key=value pair", pair),
            })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HARDWARE_YAML: &str = r#"
assign:
  - part-id: device-hive-iot-hal
    rules:
      - kernel: ttyUSB0
      - subsystem: tty
        with-subsystems: usb-serial
        with-driver: pl2303
        with-attrs:
          - idVendor=0xf00f00
          - idProduct=0xb00
        with-props:
          - BAUD=9600
          - META1=foo*
          - META2=foo?
          - META3=foo[a-z]
          - META4=a|b
"#;

    const EXPECTED_RULES: &str = "KERNEL==\"ttyUSB0\", TAG:=\"snappy-assign\", ENV{SNAPPY_APP}:=\"device-hive-iot-hal\"\n\nSUBSYSTEM==\"tty\", SUBSYSTEMS==\"usb-serial\", DRIVER==\"pl2303\", ATTRS{idVendor}==\"0xf00f00\", ATTRS{idProduct}==\"0xb00\", ENV{BAUD}==\"9600\", ENV{META1}==\"foo*\", ENV{META2}==\"foo?\", ENV{META3}==\"foo[a-z]\", ENV{META4}==\"a|b\", TAG:=\"snappy-assign\", ENV{SNAPPY_APP}:=\"device-hive-iot-hal\"\n\n";

    #[test]
    fn test_generate_udev_rules() {
        let hardware: OemHardware = serde_yaml::from_str(HARDWARE_YAML).unwrap();
        assert_eq!(hardware.assign.len(), 1);

        let rules = hardware.assign[0].udev_rules().unwrap();
        assert_eq!(rules, EXPECTED_RULES);
    }

    #[test]
    fn test_rule_file_names() {
        let oem = Oem {
            hardware: serde_yaml::from_str(HARDWARE_YAML).unwrap(),
            ..Default::default()
        };
        let files = oem.udev_rule_files("oem-foo").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "80-snappy_oem-foo_device-hive-iot-hal.rules");
        assert_eq!(files[0].1, EXPECTED_RULES);
    }

    #[test]
    fn test_attr_without_value_is_rejected() {
        let assign = HardwareAssign {
            part_id: "hal".to_string(),
            rules: vec![HardwareRule {
                subsystem: Some("tty".to_string()),
                with_attrs: vec!["idVendor".to_string()],
                ..Default::default()
            }],
        };
        assert!(matches!(
            assign.udev_rules(),
            Err(CoreError::InvalidHardwareRule { .. })
        ));
    }

    #[test]
    fn test_empty_rule_is_rejected() {
        let assign = HardwareAssign {
            part_id: "hal".to_string(),
            rules: vec![HardwareRule::default()],
        };
        assert!(assign.udev_rules().is_err());
    }

    #[test]
    fn test_store_id() {
        let oem: Oem = serde_yaml::from_str("store:\n  id: my-store\n").unwrap();
        assert_eq!(oem.store_id(), Some("my-store"));
        assert_eq!(Oem::default().store_id(), None);
    }

    #[test]
    fn test_built_in() {
        let oem: Oem = serde_yaml::from_str("software:\n  built-in:\n    - hello-app\n").unwrap();
        assert_eq!(oem.software.built_in, vec!["hello-app"]);
    }
}
