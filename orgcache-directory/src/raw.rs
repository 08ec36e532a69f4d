//! Raw directory attribute records.
//!
//! Directory servers return attributes either as a single value or as a list
//! of values, and the same attribute can arrive in either shape depending on
//! the entry. [`RawValue`] keeps that ambiguity explicit; it is resolved by
//! the normalizer and never leaks into [`orgcache_core::PersonRecord`].

use orgcache_core::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute names requested from the directory.
pub mod attrs {
    pub const DISTINGUISHED_NAME: &str = "distinguishedName";
    pub const GIVEN_NAME: &str = "givenName";
    pub const SURNAME: &str = "sn";
    pub const DISPLAY_NAME: &str = "displayName";
    pub const MAIL: &str = "mail";
    pub const TITLE: &str = "title";
    pub const DEPARTMENT: &str = "department";
    pub const TELEPHONE: &str = "telephoneNumber";
    pub const COMPANY: &str = "company";
    pub const MANAGER: &str = "manager";
    pub const USER_ACCOUNT_CONTROL: &str = "userAccountControl";
    pub const LAST_LOGON: &str = "lastLogonTimestamp";
    pub const OBJECT_CLASS: &str = "objectClass";

    /// Everything needed to build a full person record.
    pub const PERSON: &[&str] = &[
        DISTINGUISHED_NAME,
        GIVEN_NAME,
        SURNAME,
        DISPLAY_NAME,
        MAIL,
        TITLE,
        DEPARTMENT,
        TELEPHONE,
        COMPANY,
        MANAGER,
        USER_ACCOUNT_CONTROL,
        LAST_LOGON,
    ];

    /// What org-wide hierarchy scans need.
    pub const HIERARCHY: &[&str] = &[
        DISTINGUISHED_NAME,
        GIVEN_NAME,
        SURNAME,
        MAIL,
        TITLE,
        DEPARTMENT,
        MANAGER,
        USER_ACCOUNT_CONTROL,
    ];

    /// What department counting needs.
    pub const DEPARTMENT_SCAN: &[&str] =
        &[DISTINGUISHED_NAME, DEPARTMENT, TITLE, USER_ACCOUNT_CONTROL];
}

/// A single attribute value as the directory returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Integer(i64),
    Time(Timestamp),
    List(Vec<RawValue>),
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<Timestamp> for RawValue {
    fn from(value: Timestamp) -> Self {
        RawValue::Time(value)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(values: Vec<T>) -> Self {
        RawValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl RawValue {
    /// Every scalar carried by this value, rendered as text, in order.
    pub fn texts(&self) -> Vec<String> {
        match self {
            RawValue::Text(s) => vec![s.clone()],
            RawValue::Integer(i) => vec![i.to_string()],
            RawValue::Time(t) => vec![t.to_rfc3339()],
            RawValue::List(values) => values.iter().flat_map(RawValue::texts).collect(),
        }
    }
}

/// One directory entry: attribute name to raw value.
///
/// Attribute names are matched case-insensitively, as directory servers do.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    attributes: BTreeMap<String, RawValue>,
}

impl RawEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<RawValue>) {
        self.attributes.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.attributes.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Keep only the requested attributes. An empty request keeps everything.
    pub fn project(&self, requested: &[&str]) -> RawEntry {
        if requested.is_empty() {
            return self.clone();
        }
        let attributes = requested
            .iter()
            .filter_map(|name| {
                let key = name.to_ascii_lowercase();
                self.attributes.get(&key).map(|v| (key, v.clone()))
            })
            .collect();
        RawEntry { attributes }
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
