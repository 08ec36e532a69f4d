//! Operation names, parameter validation and directory filters.

use orgcache_core::ValidationError;
use orgcache_directory::{attrs, SearchFilter};

/// Named operations. Cache keys start with these, so purge works by prefix.
pub mod ops {
    pub const PERSON_DETAIL: &str = "person_detail";
    pub const DEPARTMENT_DETAIL: &str = "department_detail";
    pub const ORG_TREE: &str = "org_tree";
    pub const DEPARTMENT_LIST: &str = "department_list";
    pub const ORG_SUMMARY: &str = "org_summary";
    pub const SEARCH: &str = "search";
    /// Internal: supervisee lookups issued by `person_detail`.
    pub const SUPERVISEES: &str = "supervisees";

    pub const ALL: &[&str] = &[
        PERSON_DETAIL,
        DEPARTMENT_DETAIL,
        ORG_TREE,
        DEPARTMENT_LIST,
        ORG_SUMMARY,
        SEARCH,
    ];
}

/// Trimmed, lowercased mail address.
pub fn normalize_mail(mail: &str) -> Result<String, ValidationError> {
    let mail = mail.trim().to_lowercase();
    if mail.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "mail".to_string(),
        });
    }
    if mail.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidValue {
            field: "mail".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }
    Ok(mail)
}

/// Trimmed department name.
pub fn normalize_department(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        });
    }
    Ok(name.to_string())
}

/// Search terms, or `None` when the query is too short to run.
pub fn search_terms(query: &str, min_chars: usize) -> Option<Vec<String>> {
    let query = query.trim();
    if query.chars().count() < min_chars {
        return None;
    }
    Some(query.split_whitespace().map(str::to_string).collect())
}

pub fn person_by_mail(company: Option<&str>, mail: &str) -> SearchFilter {
    SearchFilter::people(company).and(SearchFilter::equals(attrs::MAIL, mail))
}

pub fn people_managed_by(company: Option<&str>, manager_dn: &str) -> SearchFilter {
    SearchFilter::people(company).and(SearchFilter::equals(attrs::MANAGER, manager_dn))
}

pub fn department_members(company: Option<&str>, department: &str) -> SearchFilter {
    SearchFilter::people(company).and(SearchFilter::equals(attrs::DEPARTMENT, department))
}

pub fn all_people(company: Option<&str>) -> SearchFilter {
    SearchFilter::people(company)
}

/// Every term must match given name, surname or mail.
pub fn people_matching(company: Option<&str>, terms: &[String]) -> SearchFilter {
    terms.iter().fold(SearchFilter::people(company), |filter, term| {
        filter.and(SearchFilter::Or(vec![
            SearchFilter::contains(attrs::GIVEN_NAME, term.as_str()),
            SearchFilter::contains(attrs::SURNAME, term.as_str()),
            SearchFilter::contains(attrs::MAIL, term.as_str()),
        ]))
    })
}
