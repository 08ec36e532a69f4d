//! Department forest assembly.
//!
//! Each department's elected head points, through its manager reference, at
//! the parent department. Recursion carries its own copy of the departments
//! already on the path, so corrupt manager chains cannot loop.

use std::collections::{HashMap, HashSet};

use orgcache_core::{PersonRecord, PersonSummary};
use serde::{Deserialize, Serialize};

use crate::election::{elect_head, Election, HeadStrategy};
use crate::index::{department_of, DepartmentGroup, PersonIndex};
use crate::title::TitleCategory;

/// The person chosen to head a department and how they were chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectedHead {
    pub person: PersonSummary,
    pub strategy: HeadStrategy,
    /// Whether the head is a member of the department itself.
    pub internal: bool,
    pub category: TitleCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Management,
    Department,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentStats {
    pub total: usize,
    pub with_title: usize,
    pub without_manager: usize,
    pub head_internal: bool,
    pub head_has_hierarchical_title: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentNode {
    pub name: String,
    pub head: Option<ElectedHead>,
    pub kind: NodeKind,
    /// Depth in the forest, roots are 1.
    pub level: u32,
    pub members: Vec<PersonSummary>,
    pub stats: DepartmentStats,
    pub warning: Option<String>,
    pub children: Vec<DepartmentNode>,
}

impl DepartmentNode {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// This node and all its descendants, pre-order.
    pub fn walk(&self) -> Vec<&DepartmentNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

/// Result of [`resolve_hierarchy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forest {
    pub roots: Vec<DepartmentNode>,
    /// No cross-department structure could be inferred; `roots` is the flat list.
    pub degraded: bool,
}

impl Forest {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Every node, pre-order across roots.
    pub fn nodes(&self) -> Vec<&DepartmentNode> {
        self.roots.iter().flat_map(DepartmentNode::walk).collect()
    }

    pub fn department_count(&self) -> usize {
        self.nodes().len()
    }

    pub fn find(&self, name: &str) -> Option<&DepartmentNode> {
        self.nodes().into_iter().find(|node| node.name == name)
    }

    pub fn max_depth(&self) -> u32 {
        self.nodes().iter().map(|n| n.level).max().unwrap_or(0)
    }
}

/// Elect heads and assemble the department forest.
///
/// Pure: no caching, no I/O. Disabled accounts and records without a
/// department are ignored.
pub fn resolve_hierarchy(records: &[PersonRecord]) -> Forest {
    let index = PersonIndex::build(records);
    let assembler = Assembler::new(&index);
    assembler.assemble()
}

/// Elect the head of one department against the whole organisation.
pub fn elect_department_head(records: &[PersonRecord], department: &str) -> Option<ElectedHead> {
    let index = PersonIndex::build(records);
    let group = index.department(department.trim())?;
    elect_head(group, &index).map(|election| elected_head(group, election))
}

struct Assembler<'i, 'a> {
    index: &'i PersonIndex<'a>,
    elections: HashMap<&'a str, Election<'a>>,
    children: HashMap<&'a str, Vec<&'a str>>,
    has_parent: HashSet<&'a str>,
}

impl<'i, 'a> Assembler<'i, 'a> {
    fn new(index: &'i PersonIndex<'a>) -> Self {
        let mut elections = HashMap::new();
        for group in index.departments() {
            if let Some(election) = elect_head(group, index) {
                if election.strategy.is_fallback() {
                    tracing::warn!(
                        department = %group.name,
                        strategy = election.strategy.as_str(),
                        "no clear head identified"
                    );
                }
                elections.insert(group.name, election);
            }
        }

        let mut children: HashMap<&'a str, Vec<&'a str>> = HashMap::new();
        let mut has_parent = HashSet::new();
        for group in index.departments() {
            let Some(election) = elections.get(group.name) else {
                continue;
            };
            let parent = index
                .manager_of(election.head)
                .and_then(department_of)
                .filter(|parent| *parent != group.name && index.contains_department(parent));
            if let Some(parent) = parent {
                let siblings = children.entry(parent).or_default();
                if !siblings.contains(&group.name) {
                    siblings.push(group.name);
                }
                has_parent.insert(group.name);
            }
        }

        Self {
            index,
            elections,
            children,
            has_parent,
        }
    }

    fn assemble(&self) -> Forest {
        let departments = self.index.departments();
        let roots: Vec<&'a str> = departments
            .iter()
            .map(|g| g.name)
            .filter(|name| !self.has_parent.contains(name))
            .collect();

        if roots.is_empty() || self.children.is_empty() {
            tracing::debug!(
                departments = departments.len(),
                "no department edges, returning flat list"
            );
            return Forest {
                roots: departments.iter().map(|g| self.node(g, 1, Vec::new())).collect(),
                degraded: true,
            };
        }

        let mut placed = HashSet::new();
        let mut forest: Vec<DepartmentNode> = roots
            .iter()
            .map(|root| self.subtree(*root, 1, &HashSet::new(), &mut placed))
            .collect();

        // Departments caught in a cycle below no root.
        for group in departments {
            if !placed.contains(group.name) {
                let seed = placed.clone();
                forest.push(self.subtree(group.name, 1, &seed, &mut placed));
            }
        }

        tracing::debug!(
            departments = departments.len(),
            roots = forest.len(),
            "department forest assembled"
        );
        Forest {
            roots: forest,
            degraded: false,
        }
    }

    fn subtree(
        &self,
        name: &'a str,
        level: u32,
        visited: &HashSet<&'a str>,
        placed: &mut HashSet<&'a str>,
    ) -> DepartmentNode {
        let mut path = visited.clone();
        path.insert(name);
        placed.insert(name);

        let mut children = Vec::new();
        if let Some(names) = self.children.get(name) {
            for child in names {
                if !path.contains(child) {
                    children.push(self.subtree(*child, level + 1, &path, placed));
                }
            }
        }

        match self.index.department(name) {
            Some(group) => self.node(group, level, children),
            None => DepartmentNode {
                name: name.to_string(),
                head: None,
                kind: NodeKind::Department,
                level,
                members: Vec::new(),
                stats: DepartmentStats::default(),
                warning: None,
                children,
            },
        }
    }

    fn node(
        &self,
        group: &DepartmentGroup<'a>,
        level: u32,
        children: Vec<DepartmentNode>,
    ) -> DepartmentNode {
        let head = self
            .elections
            .get(group.name)
            .map(|&election| elected_head(group, election));

        let kind = match &head {
            Some(head) if head.category.is_manager_tier() => NodeKind::Management,
            _ => NodeKind::Department,
        };

        DepartmentNode {
            name: group.name.to_string(),
            warning: head.as_ref().and_then(warning_for),
            stats: stats_for(group, head.as_ref()),
            members: group.members.iter().map(|m| m.summary()).collect(),
            head,
            kind,
            level,
            children,
        }
    }
}

fn elected_head(group: &DepartmentGroup<'_>, election: Election<'_>) -> ElectedHead {
    ElectedHead {
        person: election.head.summary(),
        strategy: election.strategy,
        internal: department_of(election.head) == Some(group.name),
        category: election.category,
    }
}

fn stats_for(group: &DepartmentGroup<'_>, head: Option<&ElectedHead>) -> DepartmentStats {
    DepartmentStats {
        total: group.members.len(),
        with_title: group
            .members
            .iter()
            .filter(|m| m.title.as_deref().is_some_and(|t| !t.trim().is_empty()))
            .count(),
        without_manager: group
            .members
            .iter()
            .filter(|m| m.manager_reference.is_none())
            .count(),
        head_internal: head.is_some_and(|h| h.internal),
        head_has_hierarchical_title: head.is_some_and(|h| h.category.is_hierarchical()),
    }
}

fn warning_for(head: &ElectedHead) -> Option<String> {
    if head.strategy.is_fallback() {
        return Some("No clear head identified".to_string());
    }
    if head.internal {
        return None;
    }
    let origin = head
        .person
        .department_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("outside any department");
    if head.category.is_hierarchical() {
        Some(format!("Head assigned from {origin}"))
    } else {
        Some(format!("Supervisor assigned from {origin}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(dn: &str, department: &str, title: &str) -> PersonRecord {
        PersonRecord::new(dn)
            .with_name(dn.trim_start_matches("CN="), "Test")
            .with_department(department)
            .with_title(title)
    }

    fn names(nodes: &[DepartmentNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    fn assert_acyclic(forest: &Forest) {
        fn check<'n>(node: &'n DepartmentNode, path: &mut Vec<&'n str>) {
            assert!(
                !path.contains(&node.name.as_str()),
                "{} is its own descendant",
                node.name
            );
            path.push(&node.name);
            for child in &node.children {
                check(child, path);
            }
            path.pop();
        }
        for root in &forest.roots {
            check(root, &mut Vec::new());
        }
    }

    #[test]
    fn test_builds_tree_from_head_managers() {
        let records = vec![
            person("CN=ceo", "Board", "Gerente General"),
            person("CN=fin", "Finance", "Finance Manager").with_manager("CN=ceo"),
            person("CN=acc", "Accounting", "Chief Accountant").with_manager("CN=fin"),
            person("CN=clerk", "Accounting", "Clerk").with_manager("CN=acc"),
            person("CN=ops", "Ops", "Ops Manager").with_manager("CN=ceo"),
        ];
        let forest = resolve_hierarchy(&records);

        assert!(!forest.degraded);
        assert_eq!(names(&forest.roots), vec!["Board"]);
        let board = &forest.roots[0];
        assert_eq!(board.level, 1);
        assert_eq!(board.kind, NodeKind::Management);
        assert_eq!(names(&board.children), vec!["Finance", "Ops"]);

        let accounting = forest.find("Accounting").expect("accounting placed");
        assert_eq!(accounting.level, 3);
        assert_eq!(accounting.kind, NodeKind::Department);
        assert_eq!(accounting.member_count(), 2);
        assert_eq!(accounting.stats.without_manager, 0);
        assert!(accounting.stats.head_internal);
        assert_eq!(forest.max_depth(), 3);
        assert_eq!(forest.department_count(), 4);
    }

    #[test]
    fn test_three_department_cycle_terminates() {
        let records = vec![
            person("CN=a", "A", "Manager").with_manager("CN=c"),
            person("CN=b", "B", "Manager").with_manager("CN=a"),
            person("CN=c", "C", "Manager").with_manager("CN=b"),
        ];
        let forest = resolve_hierarchy(&records);

        assert_acyclic(&forest);
        assert!(forest.degraded);
        assert_eq!(names(&forest.roots), vec!["A", "B", "C"]);
        assert!(forest.roots.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn test_cycle_below_no_root_is_still_emitted() {
        let records = vec![
            person("CN=root", "Root", "Gerente General"),
            person("CN=x", "X", "Manager").with_manager("CN=root"),
            person("CN=b", "B", "Manager").with_manager("CN=c"),
            person("CN=c", "C", "Manager").with_manager("CN=b"),
        ];
        let forest = resolve_hierarchy(&records);

        assert_acyclic(&forest);
        assert!(!forest.degraded);
        assert_eq!(names(&forest.roots), vec!["Root", "B"]);
        let b = forest.find("B").expect("B placed");
        assert_eq!(names(&b.children), vec!["C"]);
        assert_eq!(forest.department_count(), 4);
    }

    #[test]
    fn test_long_chain_levels() {
        let records = vec![
            person("CN=d", "D", "Gerente General"),
            person("CN=a", "A", "Manager").with_manager("CN=d"),
            person("CN=b", "B", "Manager").with_manager("CN=a"),
            person("CN=c", "C", "Manager").with_manager("CN=b"),
        ];
        let forest = resolve_hierarchy(&records);
        assert_acyclic(&forest);
        assert_eq!(forest.find("C").map(|n| n.level), Some(4));
    }

    #[test]
    fn test_flat_when_no_cross_department_edges() {
        let records = vec![
            person("CN=a", "A", "Manager"),
            person("CN=a2", "A", "Analyst").with_manager("CN=a"),
            person("CN=b", "B", "Head"),
        ];
        let forest = resolve_hierarchy(&records);

        assert!(forest.degraded);
        assert_eq!(names(&forest.roots), vec!["A", "B"]);
        assert!(forest.roots.iter().all(|n| n.level == 1 && n.children.is_empty()));
    }

    #[test]
    fn test_empty_input() {
        let forest = resolve_hierarchy(&[]);
        assert!(forest.is_empty());
        assert_eq!(forest.max_depth(), 0);
    }

    #[test]
    fn test_external_head_warning() {
        let records = vec![
            person("CN=boss", "Board", "Gerente General"),
            person("CN=w1", "Warehouse", "Operator").with_manager("CN=boss"),
        ];
        let forest = resolve_hierarchy(&records);
        let warehouse = forest.find("Warehouse").expect("warehouse");
        let head = warehouse.head.as_ref().expect("head");

        assert_eq!(head.person.distinguished_name, "CN=boss");
        assert!(!head.internal);
        assert_eq!(warehouse.warning.as_deref(), Some("Head assigned from Board"));
        // The external head lives in its own department, so no edge is drawn.
        assert!(forest.degraded);
    }

    #[test]
    fn test_departmentless_executive_heads_department() {
        let records = vec![
            PersonRecord::new("CN=ceo")
                .with_name("Chief", "Executive")
                .with_title("Gerente General"),
            person("CN=a", "Ops", "Analyst").with_manager("CN=ceo"),
            person("CN=b", "Ops", "Analyst").with_manager("CN=ceo"),
        ];

        let head = elect_department_head(&records, "Ops").expect("head");
        assert_eq!(head.person.distinguished_name, "CN=ceo");
        assert_eq!(head.strategy, HeadStrategy::ByManagerTitle);
        assert_eq!(head.category, TitleCategory::GeneralManager);
        assert!(!head.internal);

        // The executive heads Ops but is never grouped as a department.
        let forest = resolve_hierarchy(&records);
        assert_eq!(names(&forest.roots), vec!["Ops"]);
        let ops = forest.find("Ops").expect("ops");
        assert_eq!(ops.kind, NodeKind::Management);
        assert_eq!(
            ops.warning.as_deref(),
            Some("Head assigned from outside any department")
        );
    }

    #[test]
    fn test_fallback_warning() {
        let records = vec![person("CN=a", "Ops", "Analyst")];
        let forest = resolve_hierarchy(&records);
        let ops = forest.find("Ops").expect("ops");
        assert_eq!(ops.warning.as_deref(), Some("No clear head identified"));
        assert!(!ops.stats.head_has_hierarchical_title);
    }

    #[test]
    fn test_disabled_accounts_never_head() {
        let records = vec![
            person("CN=gone", "Ops", "Gerente General").disabled(),
            person("CN=lead", "Ops", "Team Lead"),
        ];
        let head = elect_department_head(&records, "Ops").expect("head");
        assert_eq!(head.person.distinguished_name, "CN=lead");
        assert_eq!(head.category, TitleCategory::Coordinator);
        assert!(elect_department_head(&records, "Nowhere").is_none());
    }
}
