use std::fmt;

use serde::{Deserialize, Serialize};

/// One setting a bank source needs before it can fetch, such as a username.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigField {
    /// Hidden fields (passwords) are never displayed.
    pub hidden: bool,
    pub label: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl ConfigField {
    /// A field still waiting for its value.
    pub fn empty<S: Into<String>>(hidden: bool, label: S) -> Self {
        ConfigField {
            hidden,
            label: label.into(),
            value: None,
        }
    }

    pub fn with_value<S: Into<String>>(self, value: S) -> Self {
        ConfigField {
            value: Some(value.into()),
            ..self
        }
    }

    pub fn is_filled(&self) -> bool {
        self.value.is_some()
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, self.hidden) {
            (None, _) => write!(f, "{}: <unset>", self.label),
            (Some(_), true) => write!(f, "{}: ********", self.label),
            (Some(value), false) => write!(f, "{}: {}", self.label, value),
        }
    }
}

/// The filled-in configuration of one bank source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub bank: String,
    pub fields: Vec<ConfigField>,
}

impl SourceConfig {
    pub fn new<S: Into<String>>(bank: S, fields: Vec<ConfigField>) -> Self {
        SourceConfig {
            bank: bank.into(),
            fields,
        }
    }

    /// The value of the field labelled `label`, if it is set.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.label == label)
            .and_then(|field| field.value.as_deref())
    }

    /// Labels of the fields that still have no value.
    pub fn missing(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|field| !field.is_filled())
            .map(|field| field.label.as_str())
    }

    pub fn is_complete(&self) -> bool {
        self.missing().next().is_none()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
