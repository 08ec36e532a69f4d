//! Directory operations behind the coordinated read-through cache.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use orgcache_core::{
    system_clock, HealthCheck, HealthReport, OrgCacheConfig, OrgCacheResult, PersonRecord,
    PersonSummary, SharedClock,
};
use orgcache_directory::{attrs, people_from_entries, DirectoryClient, SearchFilter};
use orgcache_hierarchy::{
    department_names, department_of, elect_department_head, resolve_hierarchy, MemberStats,
    OrgSummary,
};
use orgcache_storage::{
    open_configured, CacheKey, CacheStats, CacheStore, CachedPayload, CoordinatedLookup,
    LookupPolicy, LookupRequest, LookupStatsSnapshot, RequestCoalescer, Resolution,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::queries::{self, ops};
use crate::responses::{DepartmentDetail, OrgTree, PersonDetail, SearchResults, ServiceResponse};
use crate::telemetry::{OrgCacheMetrics, TelemetryError};
use crate::ServiceError;

const HEALTH_PROBE_TTL: Duration = Duration::from_secs(10);

/// Cached, coalesced access to directory data.
///
/// One instance per process. The coalescer and the cache store are created
/// with it and shared by every request it serves.
pub struct DirectoryService<D: DirectoryClient> {
    directory: D,
    lookup: CoordinatedLookup<dyn CacheStore>,
    config: OrgCacheConfig,
    clock: SharedClock,
    metrics: OrgCacheMetrics,
}

impl<D: DirectoryClient> DirectoryService<D> {
    /// Build a service over an existing store.
    ///
    /// # Errors
    ///
    /// Invalid configuration, or metrics that fail to register.
    pub fn new(
        directory: D,
        store: Arc<dyn CacheStore>,
        config: OrgCacheConfig,
        clock: SharedClock,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        let coalescer = Arc::new(
            RequestCoalescer::new(clock.clone()).with_max_in_flight(config.max_in_flight),
        );
        let lookup = CoordinatedLookup::new(store, coalescer, LookupPolicy::from_config(&config));

        tracing::info!(
            company = ?config.company,
            max_in_flight = config.max_in_flight,
            persistent_cache = config.cache_path.is_some(),
            "directory service ready"
        );

        Ok(Self {
            directory,
            lookup,
            config,
            clock,
            metrics: OrgCacheMetrics::new()?,
        })
    }

    /// Build a service with the store selected by `config` and the system clock.
    pub fn open(directory: D, config: OrgCacheConfig) -> Result<Self, ServiceError> {
        let clock = system_clock();
        let store = open_configured(&config, clock.clone())?;
        Self::new(directory, store, config, clock)
    }

    pub fn config(&self) -> &OrgCacheConfig {
        &self.config
    }

    pub fn coalescer(&self) -> &Arc<RequestCoalescer> {
        self.lookup.coalescer()
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        self.lookup.store()
    }

    pub fn metrics(&self) -> &OrgCacheMetrics {
        &self.metrics
    }

    /// Generic coordinated lookup for operations defined by the caller.
    ///
    /// `compute` runs at most once per miss, under the key's lock.
    pub async fn lookup<T, F, Fut>(
        &self,
        request: LookupRequest,
        compute: F,
    ) -> OrgCacheResult<ServiceResponse<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = OrgCacheResult<Resolution<T>>>,
    {
        let started = Instant::now();
        let result = self.lookup.lookup(&request, compute).await;
        self.metrics.set_in_flight(self.coalescer().in_flight());

        match result {
            Ok(response) => {
                self.metrics.record_lookup(
                    request.operation(),
                    response.status.as_str(),
                    response.outcome().as_str(),
                    started.elapsed().as_secs_f64(),
                );
                Ok(ServiceResponse::from_lookup(request.operation(), response))
            }
            Err(e) => {
                self.metrics.record_error(request.operation(), e.kind());
                tracing::warn!(
                    operation = request.operation(),
                    error = %e,
                    retryable = e.is_retryable(),
                    "lookup failed"
                );
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// A person by mail address, with the people who report to them.
    ///
    /// No entry is `NotFound`; a disabled account is `Disabled`. Both are
    /// cached with their own TTLs.
    pub async fn person_detail(&self, mail: &str) -> OrgCacheResult<ServiceResponse<PersonDetail>> {
        let mail = queries::normalize_mail(mail)?;
        let request = LookupRequest::new(ops::PERSON_DETAIL)
            .param("mail", mail.as_str())
            .with_success_ttl(self.config.person_ttl);
        let mail = mail.as_str();
        self.lookup(request, move || self.compute_person_detail(mail))
            .await
    }

    /// Members of a department, its head and member statistics.
    ///
    /// The head is elected against the whole organisation, so it may come
    /// from another department.
    pub async fn department_detail(
        &self,
        name: &str,
    ) -> OrgCacheResult<ServiceResponse<DepartmentDetail>> {
        let name = queries::normalize_department(name)?;
        let request = LookupRequest::new(ops::DEPARTMENT_DETAIL)
            .param("name", name.as_str())
            .with_success_ttl(self.config.directory_ttl);
        let name = name.as_str();
        self.lookup(request, move || self.compute_department_detail(name))
            .await
    }

    /// The department forest of the whole organisation.
    pub async fn org_tree(&self) -> OrgCacheResult<ServiceResponse<OrgTree>> {
        let request =
            LookupRequest::new(ops::ORG_TREE).with_success_ttl(self.config.directory_ttl);
        self.lookup(request, move || async move {
            let people = self
                .fetch_people(ops::ORG_TREE, &queries::all_people(self.company()), attrs::HIERARCHY)
                .await?;
            let forest = resolve_hierarchy(&people);
            tracing::info!(
                people = people.len(),
                departments = forest.department_count(),
                roots = forest.roots.len(),
                degraded = forest.degraded,
                "organisation tree resolved"
            );
            Ok(Resolution::Found(forest))
        })
        .await
    }

    /// Normalised, deduplicated, sorted department names.
    pub async fn department_list(&self) -> OrgCacheResult<ServiceResponse<Vec<String>>> {
        let request =
            LookupRequest::new(ops::DEPARTMENT_LIST).with_success_ttl(self.config.directory_ttl);
        self.lookup(request, move || async move {
            let people = self
                .fetch_people(
                    ops::DEPARTMENT_LIST,
                    &queries::all_people(self.company()),
                    attrs::DEPARTMENT_SCAN,
                )
                .await?;
            Ok(Resolution::Found(department_names(&people)))
        })
        .await
    }

    /// Organisation-wide counters.
    pub async fn org_summary(&self) -> OrgCacheResult<ServiceResponse<OrgSummary>> {
        let request =
            LookupRequest::new(ops::ORG_SUMMARY).with_success_ttl(self.config.directory_ttl);
        self.lookup(request, move || async move {
            let people = self
                .fetch_people(
                    ops::ORG_SUMMARY,
                    &queries::all_people(self.company()),
                    attrs::DEPARTMENT_SCAN,
                )
                .await?;
            Ok(Resolution::Found(OrgSummary::from_records(&people)))
        })
        .await
    }

    /// People whose given name, surname or mail contain every query term.
    ///
    /// A query shorter than `search_min_chars` answers an empty result
    /// without touching the cache or the lock table.
    pub async fn search(&self, query: &str) -> OrgCacheResult<ServiceResponse<SearchResults>> {
        let Some(terms) = queries::search_terms(query, self.config.search_min_chars) else {
            tracing::debug!(query, "search query too short");
            return Ok(ServiceResponse::uncached(ops::SEARCH, SearchResults::empty(query.trim())));
        };

        let normalized = terms.join(" ").to_lowercase();
        let request = LookupRequest::new(ops::SEARCH)
            .param("q", normalized.as_str())
            .with_success_ttl(self.config.directory_ttl);
        let terms = terms.as_slice();
        let normalized = normalized.as_str();
        self.lookup(request, move || async move {
            let filter = queries::people_matching(self.company(), terms);
            let people = self.fetch_people(ops::SEARCH, &filter, attrs::PERSON).await?;
            let mut enabled: Vec<PersonSummary> = people
                .iter()
                .filter(|p| p.account_enabled)
                .map(PersonRecord::summary)
                .collect();
            let truncated = enabled.len() > self.config.search_size_limit;
            enabled.truncate(self.config.search_size_limit);
            tracing::info!(query = normalized, results = enabled.len(), truncated, "search completed");
            Ok(Resolution::Found(SearchResults {
                query: normalized.to_string(),
                people: enabled,
                truncated,
            }))
        })
        .await
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Delete every cached entry of the named operations.
    pub async fn purge_cache(&self) -> OrgCacheResult<u64> {
        let mut purged = 0;
        for operation in ops::ALL {
            purged += self
                .store()
                .purge_prefix(&CacheKey::operation_prefix(operation))
                .await?;
        }
        tracing::info!(purged, "cache purged");
        Ok(purged)
    }

    pub async fn cache_stats(&self) -> OrgCacheResult<CacheStats> {
        self.store().stats().await
    }

    pub fn lookup_stats(&self) -> LookupStatsSnapshot {
        self.lookup.stats()
    }

    /// Probe the directory and the cache.
    pub async fn health_check(&self) -> HealthReport {
        let checks = vec![self.check_directory().await, self.check_cache().await];
        let report = HealthReport::from_checks(checks, self.clock.now());
        if !report.is_healthy() {
            tracing::warn!(status = ?report.status, "health check failed");
        }
        report
    }

    /// Prometheus text exposition of this service's metrics.
    pub fn metrics_text(&self) -> Result<String, TelemetryError> {
        self.metrics.encode_text()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn company(&self) -> Option<&str> {
        self.config.company.as_deref()
    }

    async fn fetch_people(
        &self,
        operation: &'static str,
        filter: &SearchFilter,
        attributes: &[&str],
    ) -> OrgCacheResult<Vec<PersonRecord>> {
        self.metrics.record_directory_query(operation);
        tracing::debug!(operation, filter = %filter, "querying directory");
        let entries = self.directory.search(filter, attributes).await?;
        Ok(people_from_entries(&entries))
    }

    async fn compute_person_detail(&self, mail: &str) -> OrgCacheResult<Resolution<PersonDetail>> {
        let filter = queries::person_by_mail(self.company(), mail);
        let people = self
            .fetch_people(ops::PERSON_DETAIL, &filter, attrs::PERSON)
            .await?;

        let Some(person) = people.into_iter().next() else {
            tracing::info!(mail, "person not found");
            return Ok(Resolution::NotFound);
        };
        if !person.account_enabled {
            tracing::info!(mail, "person account disabled");
            return Ok(Resolution::Disabled);
        }

        let supervisees = self.supervisees(&person).await?;
        Ok(Resolution::Found(PersonDetail {
            person,
            supervisees,
        }))
    }

    /// Enabled people reporting to `person` that have a given name and surname.
    async fn supervisees(&self, person: &PersonRecord) -> OrgCacheResult<Vec<PersonSummary>> {
        let filter = queries::people_managed_by(self.company(), &person.distinguished_name);
        let reports = self
            .fetch_people(ops::SUPERVISEES, &filter, attrs::PERSON)
            .await?;
        Ok(reports
            .iter()
            .filter(|r| r.account_enabled && r.given_name.is_some() && r.surname.is_some())
            .map(PersonRecord::summary)
            .collect())
    }

    async fn compute_department_detail(
        &self,
        name: &str,
    ) -> OrgCacheResult<Resolution<DepartmentDetail>> {
        let filter = queries::department_members(self.company(), name);
        let members: Vec<PersonRecord> = self
            .fetch_people(ops::DEPARTMENT_DETAIL, &filter, attrs::PERSON)
            .await?
            .into_iter()
            .filter(|p| p.account_enabled)
            .collect();

        // The directory matches department names case-insensitively; elect
        // against the spelling the records carry.
        let Some(stored_name) = members.iter().find_map(department_of).map(str::to_string) else {
            tracing::info!(department = name, "department has no enabled members");
            return Ok(Resolution::NotFound);
        };

        let everyone = self
            .fetch_people(
                ops::DEPARTMENT_DETAIL,
                &queries::all_people(self.company()),
                attrs::HIERARCHY,
            )
            .await?;
        let head = elect_department_head(&everyone, &stored_name);
        if head.is_none() {
            tracing::warn!(department = %stored_name, "no head elected");
        }

        Ok(Resolution::Found(DepartmentDetail {
            name: stored_name,
            head,
            stats: MemberStats::from_members(&members),
            members,
        }))
    }

    async fn check_directory(&self) -> HealthCheck {
        let started = Instant::now();
        let result = self.directory.ping().await;
        let elapsed = started.elapsed().as_millis() as i64;
        let check = match result {
            Ok(()) => HealthCheck::healthy("directory"),
            Err(e) => HealthCheck::unhealthy("directory", e.to_string()),
        };
        check.with_response_time(elapsed)
    }

    async fn check_cache(&self) -> HealthCheck {
        let probe = match CacheKey::from_pairs("health_check", [("probe", "ok")]) {
            Ok(key) => key,
            Err(e) => return HealthCheck::unhealthy("cache", e.to_string()),
        };
        let expected = serde_json::Value::from("ok");

        let written = self
            .store()
            .set(&probe, CachedPayload::Found(expected.clone()), HEALTH_PROBE_TTL)
            .await;
        let read = match written {
            Ok(()) => self.store().get(&probe).await,
            Err(e) => Err(e),
        };

        match read {
            Ok(Some(entry)) if entry.payload == CachedPayload::Found(expected) => {
                HealthCheck::healthy("cache")
            }
            Ok(_) => HealthCheck::degraded("cache", "probe entry not readable after write"),
            Err(e) => HealthCheck::unhealthy("cache", e.to_string()),
        }
    }
}
