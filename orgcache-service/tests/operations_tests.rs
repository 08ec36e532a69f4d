//! Operation Tests for the Directory Service
//!
//! Checks what each named operation returns over the sample organisation,
//! plus purge, health and metrics exposition.

use std::sync::Arc;
use std::time::Duration;

use orgcache_core::{HealthStatus, OrgCacheConfig, SharedClock};
use orgcache_hierarchy::{HeadStrategy, NodeKind, TitleCategory};
use orgcache_service::{ops, DirectoryService};
use orgcache_storage::{CacheStatus, CacheStore, MemoryCacheStore, Outcome};
use orgcache_test_utils::{assertions, fixtures, CountingDirectory, ManualClock, RawEntry};

type Service = DirectoryService<Arc<CountingDirectory>>;

fn service_over(entries: Vec<RawEntry>) -> (Service, Arc<CountingDirectory>) {
    service_with(entries, fixtures::test_config())
}

fn service_with(entries: Vec<RawEntry>, config: OrgCacheConfig) -> (Service, Arc<CountingDirectory>) {
    let directory = Arc::new(CountingDirectory::new(entries));
    let clock: SharedClock = Arc::new(ManualClock::starting_now());
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(1_000, clock.clone()));
    let service =
        DirectoryService::new(directory.clone(), store, config, clock).expect("valid config");
    (service, directory)
}

// ============================================================================
// PERSON AND DEPARTMENT DETAIL
// ============================================================================

#[tokio::test]
async fn test_person_detail_lists_enabled_supervisees() {
    let (service, _) = service_over(fixtures::sample_org_entries());

    let detail = service
        .person_detail("pedro.diaz@example.com")
        .await
        .expect("lookup")
        .into_value()
        .expect("found");

    assert_eq!(detail.person.title.as_deref(), Some("Gerente de Finanzas"));
    let names: Vec<&str> = detail.supervisees.iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&"Ana Rojas"));
    assert!(names.contains(&"Tomas Ruiz"));
    // Carlos Vega has no manager link and is disabled anyway.
    assert_eq!(detail.supervisees.len(), 2);
}

#[tokio::test]
async fn test_department_detail_elects_head() {
    let (service, _) = service_over(fixtures::sample_org_entries());

    let response = service.department_detail(" bodega ").await.expect("lookup");
    assert_eq!(response.cache_key.as_deref(), Some("department_detail::name=bodega"));
    let detail = response.into_value().expect("found");

    assert_eq!(detail.name, "Bodega");
    assert_eq!(detail.members.len(), 3);
    assert_eq!(detail.stats.total, 3);
    assert_eq!(detail.stats.hierarchical_titles, 2);

    let head = detail.head.expect("head");
    assert_eq!(head.person.distinguished_name, fixtures::dn("Luis Mora"));
    assert_eq!(head.category, TitleCategory::Head);
    assert_eq!(head.strategy, HeadStrategy::ByMemberTitle);
    assert!(head.internal);
}

#[tokio::test]
async fn test_department_detail_excludes_disabled_members() {
    let (service, _) = service_over(fixtures::sample_org_entries());

    let detail = service
        .department_detail("Finanzas")
        .await
        .expect("lookup")
        .into_value()
        .expect("found");
    assert_eq!(detail.members.len(), 2);
    assert!(detail.members.iter().all(|m| m.account_enabled));
}

#[tokio::test]
async fn test_department_detail_head_without_department() {
    let entries = vec![
        fixtures::executive_entry("Elena", "Cruz", "Gerente General"),
        fixtures::person_entry("Ivan", "Soto", "Ops", "Analista", Some("Elena Cruz")),
        fixtures::person_entry("Olga", "Paz", "Ops", "Analista", Some("Elena Cruz")),
    ];
    let (service, _) = service_over(entries);

    let detail = service
        .department_detail("Ops")
        .await
        .expect("lookup")
        .into_value()
        .expect("found");
    assert_eq!(detail.members.len(), 2);

    let head = detail.head.expect("head");
    assert_eq!(head.person.distinguished_name, fixtures::dn("Elena Cruz"));
    assert_eq!(head.strategy, HeadStrategy::ByManagerTitle);
    assert_eq!(head.category, TitleCategory::GeneralManager);
    assert!(!head.internal);
}

#[tokio::test]
async fn test_unknown_department_is_not_found() {
    let (service, _) = service_over(fixtures::sample_org_entries());

    let response = service.department_detail("Marketing").await.expect("lookup");
    assert_eq!(response.outcome(), Outcome::NotFound);
    assert_eq!(response.ttl, Some(service.config().not_found_ttl));
}

// ============================================================================
// ORGANISATION TREE
// ============================================================================

#[tokio::test]
async fn test_org_tree_builds_nested_departments() {
    let (service, _) = service_over(fixtures::sample_org_entries());

    let forest = service.org_tree().await.expect("lookup").into_value().expect("tree");
    assertions::assert_acyclic(&forest);
    assertions::assert_departments_once(&forest);
    assert!(!forest.degraded);
    assert_eq!(forest.roots.len(), 1);

    let root = &forest.roots[0];
    assert_eq!(root.name, "Gerencia General");
    assert_eq!(root.kind, NodeKind::Management);
    assert_eq!(root.level, 1);
    assert_eq!(forest.max_depth(), 3);
    assertions::assert_head(&forest, "TI", &fixtures::dn("Tomas Ruiz"));
}

#[tokio::test]
async fn test_org_tree_survives_manager_cycle() {
    let (service, _) = service_over(fixtures::cyclic_org_entries());

    let forest = service.org_tree().await.expect("lookup").into_value().expect("tree");
    assertions::assert_acyclic(&forest);
    assertions::assert_departments_once(&forest);
    assert_eq!(forest.department_count(), 3);
    assert!(forest.degraded);
}

#[tokio::test]
async fn test_org_tree_degrades_to_flat_list() {
    let (service, _) = service_over(fixtures::flat_org_entries());

    let forest = service.org_tree().await.expect("lookup").into_value().expect("tree");
    assert!(forest.degraded);
    assert_eq!(forest.roots.len(), 3);
    assert!(forest.roots.iter().all(|n| n.children.is_empty() && n.level == 1));
}

// ============================================================================
// LISTS, SUMMARY AND SEARCH
// ============================================================================

#[tokio::test]
async fn test_department_list_is_sorted_and_normalized() {
    let mut entries = fixtures::sample_org_entries();
    entries.push(fixtures::person_entry("Olga", "Rey", "  ti ", "Developer", None));
    let (service, _) = service_over(entries);

    let names = service
        .department_list()
        .await
        .expect("lookup")
        .into_value()
        .expect("list");
    assert_eq!(
        names,
        vec!["Bodega", "Finanzas", "Gerencia General", "Operaciones", "TI"]
    );
}

#[tokio::test]
async fn test_org_summary_counts_active_people() {
    let (service, _) = service_over(fixtures::sample_org_entries());

    let summary = service
        .org_summary()
        .await
        .expect("lookup")
        .into_value()
        .expect("summary");
    assert_eq!(summary.total_people, 10);
    assert_eq!(summary.active_people, 9);
    assert_eq!(summary.total_departments, 5);
}

#[tokio::test]
async fn test_search_matches_every_term() {
    let (service, _) = service_over(fixtures::sample_org_entries());

    let response = service.search("  Ana   ROJAS ").await.expect("search");
    assert_eq!(response.cache_key.as_deref(), Some("search::q=ana rojas"));
    let results = response.into_value().expect("results");
    assert_eq!(results.people.len(), 1);
    assert_eq!(results.people[0].email.as_deref(), Some("ana.rojas@example.com"));
    assert!(!results.truncated);

    let disabled = service.search("carlos").await.expect("search").into_value().expect("results");
    assert!(disabled.people.is_empty());
}

#[tokio::test]
async fn test_search_truncates_to_size_limit() {
    let config = OrgCacheConfig {
        search_size_limit: 2,
        ..fixtures::test_config()
    };
    let (service, _) = service_with(fixtures::sample_org_entries(), config);

    let results = service
        .search("example")
        .await
        .expect("search")
        .into_value()
        .expect("results");
    assert_eq!(results.people.len(), 2);
    assert!(results.truncated);
}

#[tokio::test]
async fn test_short_search_skips_cache_and_directory() {
    let (service, directory) = service_over(fixtures::sample_org_entries());

    let response = service.search(" a ").await.expect("search");
    assert_eq!(response.cache_key, None);
    assert_eq!(response.cache_status, CacheStatus::Miss);
    assert!(response.value().is_some_and(|r| r.people.is_empty()));
    assert_eq!(directory.search_count(), 0);
    assert_eq!(service.cache_stats().await.expect("stats").entry_count, 0);
}

// ============================================================================
// ADMINISTRATION
// ============================================================================

#[tokio::test]
async fn test_purge_cache_forces_recompute() {
    let (service, directory) = service_over(fixtures::sample_org_entries());

    service.org_tree().await.expect("tree");
    service.department_list().await.expect("list");
    service.person_detail("nobody@example.com").await.expect("person");
    assert_eq!(directory.search_count(), 3);

    assert_eq!(service.purge_cache().await.expect("purge"), 3);

    let again = service.org_tree().await.expect("tree");
    assert!(!again.is_hit());
    assert_eq!(directory.search_count(), 4);
}

#[tokio::test]
async fn test_health_check_reports_directory_outage() {
    let (service, directory) = service_over(fixtures::sample_org_entries());

    let report = service.health_check().await;
    assert!(report.is_healthy());
    assert_eq!(
        report.check("cache").map(|c| c.status),
        Some(HealthStatus::Healthy)
    );

    directory.set_failing(true);
    let report = service.health_check().await;
    assert!(!report.is_healthy());
    assert_eq!(
        report.check("directory").map(|c| c.status),
        Some(HealthStatus::Unhealthy)
    );
}

#[tokio::test]
async fn test_metrics_text_records_lookups() {
    let (service, directory) = service_over(fixtures::sample_org_entries());

    service.org_tree().await.expect("miss");
    service.org_tree().await.expect("hit");
    directory.fail_next(1);
    let _ = service.department_list().await;

    let text = service.metrics_text().expect("encode");
    assert!(text.contains("orgcache_lookups_total"));
    assert!(text.contains("cache_status=\"HIT\""));
    assert!(text.contains(&format!("operation=\"{}\"", ops::ORG_TREE)));
    assert!(text.contains("kind=\"upstream_unavailable\""));
}

#[tokio::test]
async fn test_service_rejects_invalid_config() {
    let config = OrgCacheConfig {
        not_found_ttl: Duration::from_secs(600),
        disabled_ttl: Duration::from_secs(60),
        ..OrgCacheConfig::default()
    };
    let directory = Arc::new(CountingDirectory::new(Vec::new()));
    assert!(DirectoryService::open(directory, config).is_err());
}

#[tokio::test]
async fn test_open_with_persistent_store() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let config = OrgCacheConfig {
        cache_path: Some(dir.path().to_path_buf()),
        ..fixtures::test_config()
    };
    let directory = Arc::new(CountingDirectory::new(fixtures::sample_org_entries()));
    let service = DirectoryService::open(directory.clone(), config).expect("open");

    service.org_tree().await.expect("miss");
    let hit = service.org_tree().await.expect("hit");
    assert!(hit.is_hit());
    assert_eq!(directory.search_count(), 1);
}
