//! Configuration store for pre-initialization options.
//!
//! Options are written as strings and validated against a small typed
//! table. Once the engine initializes, the store is snapshotted into the
//! playback state and direct writes stop; later writes are routed through
//! the property layer on the engine thread.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Outcome of a store write, mapped onto the public error codes by
/// [`OptionStatus::into_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OptionStatus {
    Ok,
    /// The option requires a value and none was given.
    MissingParam,
    /// The value did not parse for the option's type.
    Invalid,
    /// The value parsed but lies outside the permitted range.
    OutOfRange,
    /// No option of that name exists.
    Unknown,
}

impl OptionStatus {
    pub(crate) fn into_result(self) -> Result<()> {
        match self {
            OptionStatus::Ok => Ok(()),
            OptionStatus::Unknown => Err(Error::NotFound),
            OptionStatus::MissingParam | OptionStatus::Invalid | OptionStatus::OutOfRange => {
                Err(Error::InvalidParameter)
            }
        }
    }
}

enum OptionType {
    Flag,
    Float { min: f64, max: f64 },
}

struct OptionDef {
    name: &'static str,
    kind: OptionType,
    default: &'static str,
}

/// The options the engine understands. Values are stored normalized
/// ("yes"/"no" for flags, decimal text for floats).
static OPTIONS: &[OptionDef] = &[
    OptionDef {
        name: "idle",
        kind: OptionType::Flag,
        default: "no",
    },
    OptionDef {
        name: "terminal",
        kind: OptionType::Flag,
        default: "yes",
    },
    OptionDef {
        name: "osc",
        kind: OptionType::Flag,
        default: "yes",
    },
    OptionDef {
        name: "pause",
        kind: OptionType::Flag,
        default: "no",
    },
    OptionDef {
        name: "video",
        kind: OptionType::Flag,
        default: "yes",
    },
    OptionDef {
        name: "audio",
        kind: OptionType::Flag,
        default: "yes",
    },
    OptionDef {
        name: "volume",
        kind: OptionType::Float { min: 0.0, max: 1000.0 },
        default: "100",
    },
    OptionDef {
        name: "speed",
        kind: OptionType::Float { min: 0.01, max: 100.0 },
        default: "1",
    },
];

/// Parses a flag value the way the option and property layers both do.
pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "yes" | "true" => Some(true),
        "no" | "false" => Some(false),
        _ => None,
    }
}

/// String-keyed option storage with typed validation.
pub(crate) struct OptionStore {
    values: HashMap<&'static str, String>,
}

impl OptionStore {
    pub(crate) fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Validates and stores one option in string format.
    pub(crate) fn set(&mut self, name: &str, value: &str) -> OptionStatus {
        let Some(def) = OPTIONS.iter().find(|d| d.name == name) else {
            return OptionStatus::Unknown;
        };
        if value.is_empty() {
            return OptionStatus::MissingParam;
        }

        match def.kind {
            OptionType::Flag => match parse_flag(value) {
                Some(flag) => {
                    self.values.insert(def.name, if flag { "yes" } else { "no" }.into());
                    OptionStatus::Ok
                }
                None => OptionStatus::Invalid,
            },
            OptionType::Float { min, max } => match value.parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => {
                    if parsed < min || parsed > max {
                        OptionStatus::OutOfRange
                    } else {
                        self.values.insert(def.name, value.to_string());
                        OptionStatus::Ok
                    }
                }
                _ => OptionStatus::Invalid,
            },
        }
    }

    fn get(&self, name: &str) -> &str {
        self.values
            .get(name)
            .map(String::as_str)
            .or_else(|| OPTIONS.iter().find(|d| d.name == name).map(|d| d.default))
            .unwrap_or("")
    }

    /// Reads a flag option; unknown names read as false.
    pub(crate) fn flag(&self, name: &str) -> bool {
        parse_flag(self.get(name)).unwrap_or(false)
    }

    /// Reads a numeric option; unknown names read as zero.
    pub(crate) fn float(&self, name: &str) -> f64 {
        self.get(name).parse().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let store = OptionStore::new();
        assert!(!store.flag("idle"));
        assert!(store.flag("terminal"));
        assert_eq!(store.float("volume"), 100.0);
        assert_eq!(store.float("speed"), 1.0);
    }

    #[test]
    fn test_flag_values() {
        let mut store = OptionStore::new();
        assert_eq!(store.set("idle", "yes"), OptionStatus::Ok);
        assert!(store.flag("idle"));
        assert_eq!(store.set("idle", "false"), OptionStatus::Ok);
        assert!(!store.flag("idle"));
        assert_eq!(store.set("idle", "maybe"), OptionStatus::Invalid);
    }

    #[test]
    fn test_float_validation() {
        let mut store = OptionStore::new();
        assert_eq!(store.set("volume", "85.5"), OptionStatus::Ok);
        assert_eq!(store.float("volume"), 85.5);
        assert_eq!(store.set("volume", "loud"), OptionStatus::Invalid);
        assert_eq!(store.set("volume", "inf"), OptionStatus::Invalid);
        assert_eq!(store.set("volume", "-1"), OptionStatus::OutOfRange);
        assert_eq!(store.set("volume", "1001"), OptionStatus::OutOfRange);
        assert_eq!(store.set("speed", "0"), OptionStatus::OutOfRange);
    }

    #[test]
    fn test_unknown_and_missing() {
        let mut store = OptionStore::new();
        assert_eq!(store.set("contrast", "5"), OptionStatus::Unknown);
        assert_eq!(store.set("idle", ""), OptionStatus::MissingParam);
    }

    #[test]
    fn test_status_error_mapping() {
        assert_eq!(OptionStatus::Ok.into_result(), Ok(()));
        assert_eq!(OptionStatus::Unknown.into_result(), Err(Error::NotFound));
        assert_eq!(
            OptionStatus::Invalid.into_result(),
            Err(Error::InvalidParameter)
        );
        assert_eq!(
            OptionStatus::OutOfRange.into_result(),
            Err(Error::InvalidParameter)
        );
        assert_eq!(
            OptionStatus::MissingParam.into_result(),
            Err(Error::InvalidParameter)
        );
    }
}
