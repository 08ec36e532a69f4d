//! Organisation-wide and per-department counters.

use std::collections::BTreeSet;

use orgcache_core::PersonRecord;
use serde::{Deserialize, Serialize};

use crate::index::department_of;
use crate::naming::normalize_department_name;
use crate::title::TitleCategory;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgSummary {
    pub total_departments: usize,
    pub active_departments: usize,
    pub total_people: usize,
    pub active_people: usize,
    pub hierarchical_titles: usize,
    /// Active people per active department, two decimals.
    pub average_per_department: f64,
}

impl OrgSummary {
    /// Only records with a department count. Departments are compared by
    /// their normalised name.
    pub fn from_records(records: &[PersonRecord]) -> Self {
        let mut all_departments = BTreeSet::new();
        let mut active_departments = BTreeSet::new();
        let mut total_people = 0;
        let mut active_people = 0;
        let mut hierarchical_titles = 0;

        for record in records {
            let Some(department) = department_of(record) else {
                continue;
            };
            let normalized = normalize_department_name(department);
            total_people += 1;
            if record.account_enabled {
                active_people += 1;
                if TitleCategory::of(record.title.as_deref()).is_hierarchical() {
                    hierarchical_titles += 1;
                }
                active_departments.insert(normalized.clone());
            }
            all_departments.insert(normalized);
        }

        let average_per_department = if active_departments.is_empty() {
            0.0
        } else {
            round2(active_people as f64 / active_departments.len() as f64)
        };

        Self {
            total_departments: all_departments.len(),
            active_departments: active_departments.len(),
            total_people,
            active_people,
            hierarchical_titles,
            average_per_department,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStats {
    pub total: usize,
    pub with_title: usize,
    pub with_phone: usize,
    pub with_email: usize,
    pub hierarchical_titles: usize,
    pub without_manager: usize,
}

impl MemberStats {
    pub fn from_members<'a>(members: impl IntoIterator<Item = &'a PersonRecord>) -> Self {
        let filled = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        members.into_iter().fold(Self::default(), |mut stats, member| {
            stats.total += 1;
            stats.with_title += usize::from(filled(&member.title));
            stats.with_phone += usize::from(filled(&member.telephone));
            stats.with_email += usize::from(filled(&member.email));
            stats.hierarchical_titles +=
                usize::from(TitleCategory::of(member.title.as_deref()).is_hierarchical());
            stats.without_manager += usize::from(member.manager_reference.is_none());
            stats
        })
    }
}

/// Sorted, deduplicated, normalised department names of enabled people.
pub fn department_names(records: &[PersonRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.account_enabled)
        .filter_map(department_of)
        .map(normalize_department_name)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
