//! Normalized person records.

use crate::Timestamp;
use serde::{Deserialize, Serialize};

/// A person as read from the directory, after attribute normalization.
///
/// Snapshot of a single query. Optional fields are `None` when the directory
/// returned nothing usable for the attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    /// Stable identity, the target of `manager_reference`.
    pub distinguished_name: String,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub department_name: Option<String>,
    pub telephone: Option<String>,
    pub company: Option<String>,
    /// Distinguished name of the reported supervisor.
    pub manager_reference: Option<String>,
    pub account_enabled: bool,
    pub last_logon: Option<Timestamp>,
}

impl PersonRecord {
    /// A bare enabled record. Mostly useful for fixtures.
    pub fn new(distinguished_name: impl Into<String>) -> Self {
        Self {
            distinguished_name: distinguished_name.into(),
            given_name: None,
            surname: None,
            display_name: None,
            email: None,
            title: None,
            department_name: None,
            telephone: None,
            company: None,
            manager_reference: None,
            account_enabled: true,
            last_logon: None,
        }
    }

    pub fn with_name(mut self, given: impl Into<String>, surname: impl Into<String>) -> Self {
        self.given_name = Some(given.into());
        self.surname = Some(surname.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department_name = Some(department.into());
        self
    }

    pub fn with_manager(mut self, manager_dn: impl Into<String>) -> Self {
        self.manager_reference = Some(manager_dn.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.account_enabled = false;
        self
    }

    /// "Given Surname", or the display name, or the DN as a last resort.
    pub fn full_name(&self) -> String {
        let joined = [self.given_name.as_deref(), self.surname.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if !joined.is_empty() {
            return joined;
        }
        self.display_name
            .clone()
            .unwrap_or_else(|| self.distinguished_name.clone())
    }

    pub fn has_manager(&self) -> bool {
        self.manager_reference.is_some()
    }

    /// Enough data to take part in org-wide hierarchy computations.
    pub fn is_complete_for_hierarchy(&self) -> bool {
        self.account_enabled
            && !self.distinguished_name.is_empty()
            && self.department_name.is_some()
            && self.given_name.is_some()
            && self.surname.is_some()
    }

    pub fn summary(&self) -> PersonSummary {
        PersonSummary {
            distinguished_name: self.distinguished_name.clone(),
            name: self.full_name(),
            email: self.email.clone(),
            title: self.title.clone(),
            department_name: self.department_name.clone(),
        }
    }
}

/// Reduced person view used in lists (supervisees, search hits).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonSummary {
    pub distinguished_name: String,
    pub name: String,
    pub email: Option<String>,
    pub title: Option<String>,
    pub department_name: Option<String>,
}
