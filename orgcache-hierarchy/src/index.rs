//! Lookup structures shared by head election and forest assembly.

use std::collections::HashMap;

use orgcache_core::PersonRecord;

/// A department and its members, in input order.
#[derive(Debug, Clone)]
pub struct DepartmentGroup<'a> {
    pub name: &'a str,
    pub members: Vec<&'a PersonRecord>,
}

/// Borrowed view over the eligible person records of one resolution.
///
/// Every enabled record can be resolved as a manager; only those with a
/// non-blank department are grouped. Departments are kept in order of first
/// appearance so every later step is deterministic.
#[derive(Debug)]
pub struct PersonIndex<'a> {
    by_dn: HashMap<&'a str, &'a PersonRecord>,
    departments: Vec<DepartmentGroup<'a>>,
    position: HashMap<&'a str, usize>,
}

impl<'a> PersonIndex<'a> {
    pub fn build(records: &'a [PersonRecord]) -> Self {
        let mut by_dn = HashMap::new();
        let mut departments: Vec<DepartmentGroup<'a>> = Vec::new();
        let mut position = HashMap::new();

        for record in records.iter().filter(|r| r.account_enabled) {
            // First occurrence of a DN wins.
            by_dn.entry(record.distinguished_name.as_str()).or_insert(record);

            let Some(department) = department_of(record) else {
                continue;
            };

            let slot = *position.entry(department).or_insert_with(|| {
                departments.push(DepartmentGroup {
                    name: department,
                    members: Vec::new(),
                });
                departments.len() - 1
            });
            departments[slot].members.push(record);
        }

        Self {
            by_dn,
            departments,
            position,
        }
    }

    /// Resolve a manager reference against every enabled record.
    pub fn resolve(&self, distinguished_name: &str) -> Option<&'a PersonRecord> {
        self.by_dn.get(distinguished_name).copied()
    }

    pub fn manager_of(&self, person: &PersonRecord) -> Option<&'a PersonRecord> {
        person
            .manager_reference
            .as_deref()
            .and_then(|dn| self.resolve(dn))
    }

    pub fn departments(&self) -> &[DepartmentGroup<'a>] {
        &self.departments
    }

    pub fn department(&self, name: &str) -> Option<&DepartmentGroup<'a>> {
        self.position.get(name).map(|&i| &self.departments[i])
    }

    pub fn contains_department(&self, name: &str) -> bool {
        self.position.contains_key(name)
    }

    pub fn department_count(&self) -> usize {
        self.departments.len()
    }

    pub fn person_count(&self) -> usize {
        self.departments.iter().map(|d| d.members.len()).sum()
    }
}

/// Trimmed department name, `None` when blank.
pub fn department_of(record: &PersonRecord) -> Option<&str> {
    record
        .department_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
}
