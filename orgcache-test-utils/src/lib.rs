//! orgcache Test Utilities
//!
//! Centralized test infrastructure for the orgcache workspace:
//! - An instrumented directory double with latency and failure injection
//! - Proptest generators for person records and configurations
//! - Test fixtures: a realistic org chart, a cyclic one and a flat one
//! - Custom assertions for cache, coalescing and hierarchy invariants

// Re-export core types for convenience
pub use orgcache_core::{
    CacheError, CoalesceError, DirectoryError, ManualClock, OrgCacheConfig, OrgCacheError,
    OrgCacheResult, PersonRecord, SharedClock, Timestamp, ValidationError,
};
pub use orgcache_directory::{attrs, DirectoryClient, InMemoryDirectory, RawEntry, SearchFilter};

use std::time::Duration;

// ============================================================================
// MOCK DIRECTORY
// ============================================================================

pub mod mocks {
    //! Instrumented directory double.

    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory directory that counts searches and can be slowed down or broken.
    ///
    /// Every `search` call is counted before latency or failures apply, so a
    /// test can assert how many times the upstream was actually asked.
    #[derive(Debug, Default)]
    pub struct CountingDirectory {
        inner: InMemoryDirectory,
        searches: AtomicUsize,
        latency: Duration,
        failures_remaining: AtomicUsize,
        failing: AtomicBool,
    }

    impl CountingDirectory {
        pub fn new(entries: Vec<RawEntry>) -> Self {
            Self {
                inner: InMemoryDirectory::new(entries),
                ..Self::default()
            }
        }

        /// Delay every search by `latency`.
        pub fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        /// Fail the next `count` searches with `DirectoryError::Unavailable`.
        pub fn fail_next(&self, count: usize) {
            self.failures_remaining.store(count, Ordering::SeqCst);
        }

        /// Fail every search until switched back.
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn search_count(&self) -> usize {
            self.searches.load(Ordering::SeqCst)
        }

        pub fn reset_count(&self) {
            self.searches.store(0, Ordering::SeqCst);
        }

        /// The wrapped directory, for editing entries mid-test.
        pub fn directory(&self) -> &InMemoryDirectory {
            &self.inner
        }

        fn should_fail(&self) -> bool {
            if self.failing.load(Ordering::SeqCst) {
                return true;
            }
            self.failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    #[async_trait]
    impl DirectoryClient for CountingDirectory {
        async fn search(
            &self,
            filter: &SearchFilter,
            attributes: &[&str],
        ) -> OrgCacheResult<Vec<RawEntry>> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.should_fail() {
                return Err(DirectoryError::Unavailable {
                    reason: "injected failure".to_string(),
                }
                .into());
            }
            self.inner.search(filter, attributes).await
        }

        async fn ping(&self) -> OrgCacheResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(DirectoryError::Unavailable {
                    reason: "injected failure".to_string(),
                }
                .into());
            }
            self.inner.ping().await
        }
    }
}

pub use mocks::CountingDirectory;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for orgcache types.

    use super::*;
    use proptest::prelude::*;

    pub const TITLES: &[&str] = &[
        "Gerente General",
        "General Manager",
        "Gerente de Finanzas",
        "Plant Manager",
        "Subgerente Comercial",
        "Assistant Manager",
        "Department Head",
        "Jefe de Bodega",
        "Coordinator",
        "Team Lead",
        "Analyst",
        "Operario",
        "",
    ];

    pub const DEPARTMENTS: &[&str] = &["Board", "Finance", "Ops", "Sales", "TI", "Warehouse"];

    pub fn arb_title() -> impl Strategy<Value = Option<String>> {
        prop::option::weighted(0.9, prop::sample::select(TITLES).prop_map(str::to_string))
    }

    pub fn arb_department() -> impl Strategy<Value = Option<String>> {
        prop::option::weighted(0.95, prop::sample::select(DEPARTMENTS).prop_map(str::to_string))
    }

    /// A single record with DN `CN=p{index}`; managers point at `CN=p0..CN=p{span}`.
    pub fn arb_person_record(index: usize, span: usize) -> impl Strategy<Value = PersonRecord> {
        (
            arb_department(),
            arb_title(),
            prop::option::of(0..span.max(1)),
            prop::bool::weighted(0.9),
        )
            .prop_map(move |(department, title, manager, enabled)| PersonRecord {
                given_name: Some(format!("Given{index}")),
                surname: Some(format!("Surname{index}")),
                email: Some(format!("p{index}@example.com")),
                department_name: department,
                title,
                manager_reference: manager.map(|m| format!("CN=p{m}")),
                account_enabled: enabled,
                ..PersonRecord::new(format!("CN=p{index}"))
            })
    }

    /// An organisation of up to `max_people` records whose manager
    /// references may dangle, self-reference or form cycles.
    pub fn arb_org(max_people: usize) -> impl Strategy<Value = Vec<PersonRecord>> {
        (0..=max_people).prop_flat_map(move |n| {
            let span = n + 2;
            (0..n)
                .map(|i| arb_person_record(i, span))
                .collect::<Vec<_>>()
        })
    }

    /// A mail address in mixed case with surrounding whitespace.
    pub fn arb_messy_mail() -> impl Strategy<Value = String> {
        ("[a-zA-Z]{1,8}", "[a-zA-Z]{1,8}", " {0,2}")
            .prop_map(|(user, domain, pad)| format!("{pad}{user}@{domain}.COM{pad}"))
    }

    /// A configuration that passes validation.
    pub fn arb_valid_config() -> impl Strategy<Value = OrgCacheConfig> {
        (
            1u64..7200,
            1u64..600,
            1u64..3600,
            1u64..60,
            1usize..2048,
        )
            .prop_map(|(person, not_found, extra, lock, in_flight)| OrgCacheConfig {
                person_ttl: Duration::from_secs(person),
                not_found_ttl: Duration::from_secs(not_found),
                disabled_ttl: Duration::from_secs(not_found + extra),
                lock_timeout: Duration::from_secs(lock),
                max_in_flight: in_flight,
                ..OrgCacheConfig::default()
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built org charts and configurations for common test scenarios.

    use super::*;
    use orgcache_directory::people_from_entries;

    /// `userAccountControl` of a normal enabled account.
    pub const UAC_ENABLED: i64 = 512;
    /// `userAccountControl` with the disable bit set.
    pub const UAC_DISABLED: i64 = 514;

    pub fn dn(name: &str) -> String {
        format!("CN={name},OU=People,DC=example,DC=com")
    }

    /// Mail derived from the given name and surname.
    pub fn mail(given: &str, surname: &str) -> String {
        format!("{}.{}@example.com", given.to_lowercase(), surname.to_lowercase())
    }

    /// A directory entry for an enabled person.
    pub fn person_entry(
        given: &str,
        surname: &str,
        department: &str,
        title: &str,
        manager: Option<&str>,
    ) -> RawEntry {
        let mut entry = RawEntry::new()
            .with(attrs::OBJECT_CLASS, vec!["top", "person"])
            .with(attrs::DISTINGUISHED_NAME, dn(&format!("{given} {surname}")))
            .with(attrs::GIVEN_NAME, given)
            .with(attrs::SURNAME, surname)
            .with(attrs::MAIL, mail(given, surname))
            .with(attrs::DEPARTMENT, department)
            .with(attrs::TITLE, title)
            .with(attrs::USER_ACCOUNT_CONTROL, UAC_ENABLED);
        if let Some(manager) = manager {
            entry.insert(attrs::MANAGER, dn(manager));
        }
        entry
    }

    /// An enabled executive with no `department` attribute.
    pub fn executive_entry(given: &str, surname: &str, title: &str) -> RawEntry {
        RawEntry::new()
            .with(attrs::OBJECT_CLASS, vec!["top", "person"])
            .with(attrs::DISTINGUISHED_NAME, dn(&format!("{given} {surname}")))
            .with(attrs::GIVEN_NAME, given)
            .with(attrs::SURNAME, surname)
            .with(attrs::MAIL, mail(given, surname))
            .with(attrs::TITLE, title)
            .with(attrs::USER_ACCOUNT_CONTROL, UAC_ENABLED)
    }

    /// A directory entry for a disabled account.
    pub fn disabled_entry(given: &str, surname: &str, department: &str, title: &str) -> RawEntry {
        person_entry(given, surname, department, title, None)
            .with(attrs::USER_ACCOUNT_CONTROL, UAC_DISABLED)
    }

    /// A small company:
    ///
    /// ```text
    /// Gerencia General (Laura Soto)
    /// +-- Finanzas (Pedro Diaz)
    /// |   +-- TI (Tomas Ruiz)
    /// +-- Operaciones (Marta Vidal)
    ///     +-- Bodega (Luis Mora)
    /// ```
    ///
    /// Carlos Vega in Finanzas is disabled.
    pub fn sample_org_entries() -> Vec<RawEntry> {
        vec![
            person_entry("Laura", "Soto", "Gerencia General", "Gerente General", None),
            person_entry("Pedro", "Diaz", "Finanzas", "Gerente de Finanzas", Some("Laura Soto")),
            person_entry("Ana", "Rojas", "Finanzas", "Contadora", Some("Pedro Diaz")),
            disabled_entry("Carlos", "Vega", "Finanzas", "Analista"),
            person_entry("Marta", "Vidal", "Operaciones", "Gerente de Operaciones", Some("Laura Soto")),
            person_entry("Jose", "Paz", "Bodega", "Operario", Some("Luis Mora")),
            person_entry("Luis", "Mora", "Bodega", "Jefe de Bodega", Some("Marta Vidal")),
            person_entry("Rosa", "Leal", "Bodega", "Coordinadora de Bodega", Some("Luis Mora")),
            person_entry("Tomas", "Ruiz", "TI", "Team Lead", Some("Pedro Diaz")),
            person_entry("Sofia", "Pinto", "TI", "Developer", Some("Tomas Ruiz")),
        ]
    }

    pub fn sample_org() -> Vec<PersonRecord> {
        people_from_entries(&sample_org_entries())
    }

    /// Three departments whose heads report around a ring: A -> B -> C -> A.
    pub fn cyclic_org_entries() -> Vec<RawEntry> {
        vec![
            person_entry("Alice", "A", "Dept A", "Manager", Some("Carol C")),
            person_entry("Bob", "B", "Dept B", "Manager", Some("Alice A")),
            person_entry("Carol", "C", "Dept C", "Manager", Some("Bob B")),
        ]
    }

    pub fn cyclic_org() -> Vec<PersonRecord> {
        people_from_entries(&cyclic_org_entries())
    }

    /// Departments with no manager links across them.
    pub fn flat_org_entries() -> Vec<RawEntry> {
        vec![
            person_entry("Hugo", "Lagos", "Ventas", "Jefe de Ventas", None),
            person_entry("Ines", "Mella", "Ventas", "Vendedora", Some("Hugo Lagos")),
            person_entry("Raul", "Nuñez", "Legal", "Abogado", None),
            person_entry("Vera", "Ortiz", "Calidad", "QA Lead", None),
        ]
    }

    pub fn flat_org() -> Vec<PersonRecord> {
        people_from_entries(&flat_org_entries())
    }

    pub fn sample_directory() -> CountingDirectory {
        CountingDirectory::new(sample_org_entries())
    }

    /// Defaults with a short peer wait so contention tests finish quickly.
    pub fn test_config() -> OrgCacheConfig {
        OrgCacheConfig {
            max_wait: Duration::from_millis(500),
            max_in_flight: 64,
            cache_max_entries: 1_000,
            ..OrgCacheConfig::default()
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for orgcache-specific validation.

    use super::*;
    use orgcache_hierarchy::{DepartmentNode, Forest};
    use orgcache_storage::CacheStatus;
    use std::collections::HashSet;

    /// Assert that an OrgCacheResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &OrgCacheResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that an OrgCacheResult failed on input validation.
    #[track_caller]
    pub fn assert_malformed_input<T: std::fmt::Debug>(result: &OrgCacheResult<T>) {
        match result {
            Err(OrgCacheError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that an OrgCacheResult is a retryable upstream failure.
    #[track_caller]
    pub fn assert_upstream_unavailable<T: std::fmt::Debug>(result: &OrgCacheResult<T>) {
        match result {
            Err(e @ OrgCacheError::Directory(_)) => {
                assert!(e.is_retryable(), "Directory error should be retryable: {:?}", e)
            }
            other => panic!("Expected Directory error, got: {:?}", other),
        }
    }

    /// Assert that an OrgCacheResult is the explicit overload error.
    #[track_caller]
    pub fn assert_overloaded<T: std::fmt::Debug>(result: &OrgCacheResult<T>) {
        match result {
            Err(OrgCacheError::Coalesce(CoalesceError::Overloaded { .. })) => {}
            other => panic!("Expected Overloaded error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_hit(status: CacheStatus) {
        assert_eq!(status, CacheStatus::Hit, "Expected a cache hit");
    }

    #[track_caller]
    pub fn assert_miss(status: CacheStatus) {
        assert_eq!(status, CacheStatus::Miss, "Expected a cache miss");
    }

    /// Assert that no department is its own descendant.
    #[track_caller]
    pub fn assert_acyclic(forest: &Forest) {
        fn walk<'n>(node: &'n DepartmentNode, path: &mut Vec<&'n str>) {
            assert!(
                !path.contains(&node.name.as_str()),
                "Department {} appears below itself (path {:?})",
                node.name,
                path
            );
            path.push(&node.name);
            for child in &node.children {
                walk(child, path);
            }
            path.pop();
        }
        for root in &forest.roots {
            walk(root, &mut Vec::new());
        }
    }

    /// Assert that each department appears exactly once in the forest.
    #[track_caller]
    pub fn assert_departments_once(forest: &Forest) {
        let mut seen = HashSet::new();
        for node in forest.nodes() {
            assert!(seen.insert(node.name.as_str()), "Department {} placed twice", node.name);
        }
    }

    /// Assert that a department exists with the given head DN.
    #[track_caller]
    pub fn assert_head(forest: &Forest, department: &str, head_dn: &str) {
        let node = forest
            .find(department)
            .unwrap_or_else(|| panic!("Department {department} missing from forest"));
        let head = node
            .head
            .as_ref()
            .unwrap_or_else(|| panic!("Department {department} has no head"));
        assert_eq!(head.person.distinguished_name, head_dn, "Wrong head for {department}");
    }
}

// ============================================================================
// TESTS
// ============================================================================
