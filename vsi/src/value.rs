/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Field holding the active setting in a kernel config option record.
const CURRENT_VALUE: &str = "Current value";

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[serde(untagged)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    String(String),
    Record(Record),
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Record {
    pub name: String,
    pub fields: BTreeMap<String, Value>,
}

impl Value {
    /// Interpret a raw scalar as printed by the kernel.
    pub fn parse_scalar(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(hex) =
            raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))
        {
            if let Ok(n) = u64::from_str_radix(hex, 16) {
                return Self::Unsigned(n);
            }
        }
        if let Ok(n) = raw.parse::<u64>() {
            Self::Unsigned(n)
        } else if let Ok(n) = raw.parse::<i64>() {
            Self::Signed(n)
        } else {
            Self::String(raw.to_string())
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Unsigned(n) => Some(*n),
            Self::Signed(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_record().and_then(|r| r.fields.get(name))
    }

    /// Look up a record field; `path` is only used for error reporting.
    pub fn try_field(&self, path: &str, name: &str) -> Result<&Value> {
        self.field(name).ok_or_else(|| {
            Error::MissingField(path.to_string(), name.to_string())
        })
    }

    /// Like [`Value::as_u64`], with a typed error naming the node.
    pub fn try_u64(&self, path: &str) -> Result<u64> {
        self.as_u64().ok_or_else(|| {
            Error::Type(path.to_string(), "an unsigned integer", self.kind())
        })
    }

    /// The setting of a config option node: the record's
    /// `Current value` field, or the scalar itself.
    pub fn option_value(&self, path: &str) -> Result<u64> {
        match self {
            Self::Record(_) => self.try_field(path, CURRENT_VALUE)?.try_u64(path),
            _ => self.try_u64(path),
        }
    }

    /// Update in place the way a `set` on this node would: option
    /// records get their current value replaced, scalars are replaced
    /// entirely.
    pub(crate) fn assign(&mut self, raw: &str) {
        match self {
            Self::Record(record) if record.fields.contains_key(CURRENT_VALUE) => {
                record
                    .fields
                    .insert(CURRENT_VALUE.to_string(), Self::parse_scalar(raw));
            }
            _ => *self = Self::parse_scalar(raw),
        }
    }

    fn kind(&self) -> String {
        match self {
            Self::Unsigned(n) => format!("unsigned {}", n),
            Self::Signed(n) => format!("signed {}", n),
            Self::String(s) => format!("string \"{}\"", s),
            Self::Record(r) => format!("record \"{}\"", r.name),
        }
    }
}

impl Record {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// A config option record as the kernel prints it.
    pub fn option(current: u64) -> Self {
        Self::new("Vmkernel Config Option")
            .with("Default value", Value::Unsigned(current))
            .with(CURRENT_VALUE, Value::Unsigned(current))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Unsigned(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Self::Record(r)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(n) => write!(f, "{}", n),
            Self::Signed(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{}", s),
            Self::Record(r) => write!(f, "{}", r),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.name)?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", k, v)?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::{Record, Value};

    #[test]
    fn scalars() {
        assert_eq!(Value::parse_scalar("42"), Value::Unsigned(42));
        assert_eq!(Value::parse_scalar(" -3 "), Value::Signed(-3));
        assert_eq!(Value::parse_scalar("0x10"), Value::Unsigned(16));
        assert_eq!(
            Value::parse_scalar("18446744073709551615"),
            Value::Unsigned(u64::MAX)
        );
        assert_eq!(
            Value::parse_scalar("naa.5000c5"),
            Value::String("naa.5000c5".to_string())
        );
    }

    #[test]
    fn option_value() {
        let option = Value::Record(Record::option(7));
        assert_eq!(option.option_value("/config/x").unwrap(), 7);
        assert_eq!(Value::Unsigned(3).option_value("/x").unwrap(), 3);
        assert!(Value::from("on").option_value("/x").is_err());
        assert!(Value::Record(Record::new("info"))
            .option_value("/x")
            .is_err());
    }

    #[test]
    fn assign_updates_current_value_only() {
        let mut option = Value::Record(Record::option(1));
        option.assign("0");
        assert_eq!(option.field("Current value"), Some(&Value::Unsigned(0)));
        assert_eq!(option.field("Default value"), Some(&Value::Unsigned(1)));

        let mut scalar = Value::Unsigned(5);
        scalar.assign("9");
        assert_eq!(scalar, Value::Unsigned(9));
    }
}
