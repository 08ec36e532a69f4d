//! Typed directory search filters.
//!
//! A [`SearchFilter`] can be rendered to RFC 4515 text for a real directory
//! server, or evaluated directly against a [`RawEntry`] by in-memory
//! directories. Values are always escaped on rendering, so user input such as
//! a distinguished name containing parentheses cannot change filter structure.

use crate::raw::{attrs, RawEntry};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directory search filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFilter {
    /// Attribute equals value (case-insensitive).
    Equals { attribute: String, value: String },
    /// Attribute contains value as a substring (case-insensitive).
    Contains { attribute: String, value: String },
    /// Attribute is present.
    Present { attribute: String },
    /// Every sub-filter matches.
    And(Vec<SearchFilter>),
    /// At least one sub-filter matches.
    Or(Vec<SearchFilter>),
}

impl SearchFilter {
    pub fn equals(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        SearchFilter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn contains(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        SearchFilter::Contains {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        SearchFilter::Present {
            attribute: attribute.into(),
        }
    }

    /// Person entries, optionally restricted to one company.
    pub fn people(company: Option<&str>) -> Self {
        let mut clauses = vec![SearchFilter::equals(attrs::OBJECT_CLASS, "person")];
        if let Some(company) = company {
            clauses.push(SearchFilter::equals(attrs::COMPANY, company));
        }
        SearchFilter::And(clauses)
    }

    /// Add a clause to this filter, flattening into an existing `And`.
    pub fn and(self, clause: SearchFilter) -> Self {
        match self {
            SearchFilter::And(mut clauses) => {
                clauses.push(clause);
                SearchFilter::And(clauses)
            }
            other => SearchFilter::And(vec![other, clause]),
        }
    }

    /// Render as RFC 4515 filter text.
    pub fn to_ldap(&self) -> String {
        match self {
            SearchFilter::Equals { attribute, value } => {
                format!("({}={})", attribute, escape_value(value))
            }
            SearchFilter::Contains { attribute, value } => {
                format!("({}=*{}*)", attribute, escape_value(value))
            }
            SearchFilter::Present { attribute } => format!("({}=*)", attribute),
            SearchFilter::And(clauses) => {
                let inner: String = clauses.iter().map(SearchFilter::to_ldap).collect();
                format!("(&{})", inner)
            }
            SearchFilter::Or(clauses) => {
                let inner: String = clauses.iter().map(SearchFilter::to_ldap).collect();
                format!("(|{})", inner)
            }
        }
    }

    /// Evaluate against an entry the way a directory server would.
    ///
    /// An absent attribute never satisfies an equality, `objectClass`
    /// included.
    pub fn matches(&self, entry: &RawEntry) -> bool {
        match self {
            SearchFilter::Equals { attribute, value } => match entry.get(attribute) {
                Some(raw) => raw.texts().iter().any(|t| t.eq_ignore_ascii_case(value)),
                None => false,
            },
            SearchFilter::Contains { attribute, value } => {
                let needle = value.to_lowercase();
                entry
                    .get(attribute)
                    .map(|raw| raw.texts().iter().any(|t| t.to_lowercase().contains(&needle)))
                    .unwrap_or(false)
            }
            SearchFilter::Present { attribute } => entry.contains(attribute),
            SearchFilter::And(clauses) => clauses.iter().all(|c| c.matches(entry)),
            SearchFilter::Or(clauses) => clauses.iter().any(|c| c.matches(entry)),
        }
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ldap())
    }
}

/// Escape an assertion value per RFC 4515 section 3.
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\5c"),
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\0' => out.push_str("\\00"),
            other => out.push(other),
        }
    }
    out
}
