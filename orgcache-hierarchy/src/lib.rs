//! orgcache hierarchy - department heads and the organisation forest
//!
//! Pure functions over [`PersonRecord`](orgcache_core::PersonRecord)
//! snapshots. Nothing here caches or talks to the directory; callers wrap
//! [`resolve_hierarchy`] in a coordinated lookup.

mod election;
mod forest;
mod index;
mod naming;
mod summary;
mod title;

pub use election::{elect_head, Election, HeadStrategy};
pub use forest::{
    elect_department_head, resolve_hierarchy, DepartmentNode, DepartmentStats, ElectedHead,
    Forest, NodeKind,
};
pub use index::{department_of, DepartmentGroup, PersonIndex};
pub use naming::normalize_department_name;
pub use summary::{department_names, MemberStats, OrgSummary};
pub use title::{is_hierarchical_title, title_priority, TitleCategory};

// ============================================================================
// PROPERTY TESTS
// ============================================================================
