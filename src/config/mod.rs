use std::collections::{BTreeMap, btree_map};

use thiserror::Error;
use toml::{Table, Value};

pub mod devices;

pub use devices::{BarometerConfig, GpsConfig, ImuConfig};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Error deserializing configuration")]
    Deserialize(#[from] toml::de::Error),

    #[error("Configuration does not have the right structure (error in '{0}')")]
    BadStructure(String),

    #[error("Section '{0}' not found")]
    MissingSection(String),

    #[error("Option '{path}' not found")]
    NotFound { path: String },

    #[error("Cannot cast option '{path}' to {dtype}")]
    BadCast { path: String, dtype: String },

    #[error("Option '{path}' has unrecognized value '{value}'")]
    UnknownSymbol { path: String, value: String },

    #[error("Option '{path}' is out of range: {reason}")]
    OutOfRange { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOption {
    path: String,
    value: ConfigValue,
}

impl ConfigOption {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value(&self) -> &ConfigValue {
        &self.value
    }

    /// Accepts TOML booleans as well as the INI spellings
    /// `true/false`, `yes/no`, `on/off` and `1/0`.
    pub fn value_bool(&self) -> Result<bool, ConfigError> {
        match &self.value {
            ConfigValue::Bool(val) => Ok(*val),
            ConfigValue::Int(0) => Ok(false),
            ConfigValue::Int(1) => Ok(true),
            ConfigValue::Str(val) => match val.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                _ => Err(self.bad_cast("bool")),
            },
            _ => Err(self.bad_cast("bool")),
        }
    }

    pub fn value_int(&self) -> Result<i64, ConfigError> {
        match &self.value {
            ConfigValue::Int(val) => Ok(*val),
            ConfigValue::Str(val) => val.trim().parse().map_err(|_| self.bad_cast("int")),
            _ => Err(self.bad_cast("int")),
        }
    }

    pub fn value_float(&self) -> Result<f64, ConfigError> {
        match &self.value {
            ConfigValue::Float(val) => Ok(*val),
            ConfigValue::Int(val) => Ok(*val as f64),
            ConfigValue::Str(val) => val.trim().parse().map_err(|_| self.bad_cast("float")),
            _ => Err(self.bad_cast("float")),
        }
    }

    pub fn value_string(&self) -> Result<String, ConfigError> {
        if let ConfigValue::Str(val) = &self.value {
            Ok(val.clone())
        } else {
            Err(self.bad_cast("str"))
        }
    }

    /// Textual form of a scalar, used for options that may be written either
    /// as a string or as a number (e.g. `REFRESH_RATE = "5"` or `= 5`).
    pub fn value_text(&self) -> String {
        match &self.value {
            ConfigValue::Bool(val) => val.to_string(),
            ConfigValue::Int(val) => val.to_string(),
            ConfigValue::Float(val) => val.to_string(),
            ConfigValue::Str(val) => val.trim().to_string(),
        }
    }

    fn bad_cast(&self, dtype: &str) -> ConfigError {
        ConfigError::BadCast {
            path: self.path.clone(),
            dtype: dtype.to_string(),
        }
    }
}

/// Options of one sensor, keyed by option name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigSection {
    name: String,
    options: BTreeMap<String, ConfigOption>,
}

impl ConfigSection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Result<&ConfigOption, ConfigError> {
        self.options.get(key).ok_or(ConfigError::NotFound {
            path: append_path(&self.name, key),
        })
    }

    pub fn get_opt(&self, key: &str) -> Option<&ConfigOption> {
        self.options.get(key)
    }

    pub fn path_of(&self, key: &str) -> String {
        append_path(&self.name, key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ConfigOption> {
        self.options.iter()
    }
}

/// Already-parsed configuration, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Configuration {
    sections: BTreeMap<String, ConfigSection>,
}

impl Configuration {
    pub fn contains_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn section(&self, name: &str) -> Result<&ConfigSection, ConfigError> {
        self.sections
            .get(name)
            .ok_or(ConfigError::MissingSection(name.to_string()))
    }

    pub fn section_opt(&self, name: &str) -> Option<&ConfigSection> {
        self.sections.get(name)
    }

    pub fn sections(&self) -> btree_map::Values<'_, String, ConfigSection> {
        self.sections.values()
    }
}

pub fn parse_str(toml_str: &str) -> Result<Configuration, ConfigError> {
    let table = toml::from_str::<Table>(toml_str)?;

    parse_table(table)
}

pub fn parse_table(table: Table) -> Result<Configuration, ConfigError> {
    let mut sections = BTreeMap::new();

    for (name, value) in table {
        let Value::Table(options) = value else {
            return Err(ConfigError::BadStructure(name));
        };

        let section = parse_section(&name, options)?;
        sections.insert(name, section);
    }

    Ok(Configuration { sections })
}

fn parse_section(name: &str, table: Table) -> Result<ConfigSection, ConfigError> {
    let mut options = BTreeMap::new();

    for (key, value) in table {
        let path = append_path(name, &key);
        let value = match value {
            Value::Boolean(val) => ConfigValue::Bool(val),
            Value::Integer(val) => ConfigValue::Int(val),
            Value::Float(val) => ConfigValue::Float(val),
            Value::String(val) => ConfigValue::Str(val),
            _ => return Err(ConfigError::BadStructure(path)),
        };

        options.insert(key, ConfigOption { path, value });
    }

    Ok(ConfigSection {
        name: name.to_string(),
        options,
    })
}

fn append_path(path: &str, key: &str) -> String {
    format!("{path}.{key}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(parse_str(""), Ok(Configuration::default()));
    }

    #[test]
    fn test_sections() {
        let cfg = parse_str(
            r#"
            [BMP280]
            SEALEVEL_PA = 101325.0

            [NEO6M]
            PORT = "/dev/serial0"
            BAUDRATE = 9600
            DISABLE_GGA = true
            "#,
        )
        .unwrap();

        assert!(cfg.contains_section("BMP280"));
        assert!(!cfg.contains_section("MPU9250"));

        let gps = cfg.section("NEO6M").unwrap();
        assert_eq!(gps.get("PORT").unwrap().value_string(), Ok("/dev/serial0".to_string()));
        assert_eq!(gps.get("BAUDRATE").unwrap().value_int(), Ok(9600));
        assert_eq!(gps.get("DISABLE_GGA").unwrap().value_bool(), Ok(true));
        assert_eq!(gps.get("DISABLE_GGA").unwrap().path(), "NEO6M.DISABLE_GGA");

        assert_eq!(
            cfg.section("MPU9250"),
            Err(ConfigError::MissingSection("MPU9250".to_string()))
        );
        assert_eq!(
            gps.get("REFRESH_RATE"),
            Err(ConfigError::NotFound {
                path: "NEO6M.REFRESH_RATE".to_string()
            })
        );
    }

    #[test]
    fn test_top_level_scalar() {
        assert_eq!(
            parse_str("rate = 100"),
            Err(ConfigError::BadStructure("rate".to_string()))
        );
    }

    #[test]
    fn test_nested_table() {
        assert_eq!(
            parse_str("[NEO6M.ports]\nmain = \"/dev/ttyS0\""),
            Err(ConfigError::BadStructure("NEO6M.ports".to_string()))
        );
    }

    #[test]
    fn test_bool_spellings() {
        let cfg = parse_str(
            r#"
            [S]
            a = "yes"
            b = "Off"
            c = 1
            d = "maybe"
            e = 2.0
            "#,
        )
        .unwrap();
        let s = cfg.section("S").unwrap();

        assert_eq!(s.get("a").unwrap().value_bool(), Ok(true));
        assert_eq!(s.get("b").unwrap().value_bool(), Ok(false));
        assert_eq!(s.get("c").unwrap().value_bool(), Ok(true));
        assert_eq!(
            s.get("d").unwrap().value_bool(),
            Err(ConfigError::BadCast {
                path: "S.d".to_string(),
                dtype: "bool".to_string()
            })
        );
        assert!(s.get("e").unwrap().value_bool().is_err());
    }

    #[test]
    fn test_numbers() {
        let cfg = parse_str(
            r#"
            [S]
            i = 5
            f = 2.5
            si = "10"
            sf = " 101325.5 "
            t = true
            "#,
        )
        .unwrap();
        let s = cfg.section("S").unwrap();

        assert_eq!(s.get("i").unwrap().value_float(), Ok(5.0));
        assert_eq!(s.get("f").unwrap().value_float(), Ok(2.5));
        assert!(s.get("f").unwrap().value_int().is_err());
        assert_eq!(s.get("si").unwrap().value_int(), Ok(10));
        assert_eq!(s.get("sf").unwrap().value_float(), Ok(101325.5));
        assert!(s.get("t").unwrap().value_float().is_err());
        assert_eq!(s.get("i").unwrap().value_text(), "5");
        assert_eq!(s.get("si").unwrap().value_text(), "10");
    }
}
