//! Department head election.
//!
//! Five strategies are tried in [`HeadStrategy::ORDER`]; the first one that
//! yields a candidate wins. Every strategy is independently callable through
//! [`HeadStrategy::apply`].

use std::collections::HashSet;

use orgcache_core::PersonRecord;
use serde::{Deserialize, Serialize};

use crate::index::{DepartmentGroup, PersonIndex};
use crate::title::TitleCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadStrategy {
    /// Best hierarchical title among the department's own members.
    ByMemberTitle,
    /// Best hierarchical title among the members' resolved managers.
    ByManagerTitle,
    /// Any resolved manager, best title first.
    ByAnyManager,
    /// First member without a manager reference.
    ByNoManager,
    /// First member in input order.
    ByFirstMember,
}

impl HeadStrategy {
    pub const ORDER: [HeadStrategy; 5] = [
        HeadStrategy::ByMemberTitle,
        HeadStrategy::ByManagerTitle,
        HeadStrategy::ByAnyManager,
        HeadStrategy::ByNoManager,
        HeadStrategy::ByFirstMember,
    ];

    /// The last two tiers only guess.
    pub fn is_fallback(self) -> bool {
        matches!(self, HeadStrategy::ByNoManager | HeadStrategy::ByFirstMember)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HeadStrategy::ByMemberTitle => "by_member_title",
            HeadStrategy::ByManagerTitle => "by_manager_title",
            HeadStrategy::ByAnyManager => "by_any_manager",
            HeadStrategy::ByNoManager => "by_no_manager",
            HeadStrategy::ByFirstMember => "by_first_member",
        }
    }

    pub fn apply<'a>(
        self,
        department: &DepartmentGroup<'a>,
        index: &PersonIndex<'a>,
    ) -> Option<&'a PersonRecord> {
        match self {
            HeadStrategy::ByMemberTitle => best_titled(department.members.iter().copied()),
            HeadStrategy::ByManagerTitle => {
                best_titled(resolved_managers(department, index).into_iter())
            }
            HeadStrategy::ByAnyManager => {
                best_by_priority(resolved_managers(department, index).into_iter())
            }
            HeadStrategy::ByNoManager => department
                .members
                .iter()
                .copied()
                .find(|member| member.manager_reference.is_none()),
            HeadStrategy::ByFirstMember => department.members.first().copied(),
        }
    }
}

/// Outcome of a successful election.
#[derive(Debug, Clone, Copy)]
pub struct Election<'a> {
    pub head: &'a PersonRecord,
    pub strategy: HeadStrategy,
    pub category: TitleCategory,
}

/// Run the strategies in order. `None` only for an empty department.
pub fn elect_head<'a>(
    department: &DepartmentGroup<'a>,
    index: &PersonIndex<'a>,
) -> Option<Election<'a>> {
    HeadStrategy::ORDER.iter().find_map(|&strategy| {
        strategy.apply(department, index).map(|head| Election {
            head,
            strategy,
            category: TitleCategory::of(head.title.as_deref()),
        })
    })
}

/// Distinct resolved managers of the members, in first-seen order.
fn resolved_managers<'a>(
    department: &DepartmentGroup<'a>,
    index: &PersonIndex<'a>,
) -> Vec<&'a PersonRecord> {
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut managers = Vec::new();
    for member in &department.members {
        if let Some(manager) = index.manager_of(member) {
            if seen.insert(manager.distinguished_name.as_str()) {
                managers.push(manager);
            }
        }
    }
    managers
}

fn best_titled<'a>(candidates: impl Iterator<Item = &'a PersonRecord>) -> Option<&'a PersonRecord> {
    best_by_priority(candidates.filter(|p| TitleCategory::of(p.title.as_deref()).is_hierarchical()))
}

// min_by_key keeps the first of equal elements, so ties follow input order.
fn best_by_priority<'a>(
    candidates: impl Iterator<Item = &'a PersonRecord>,
) -> Option<&'a PersonRecord> {
    candidates.min_by_key(|p| TitleCategory::of(p.title.as_deref()).priority())
}
