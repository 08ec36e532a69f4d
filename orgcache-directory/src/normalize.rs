//! Attribute normalization.
//!
//! Pure functions that collapse raw, possibly multi-valued directory
//! attributes into the optional scalars of [`PersonRecord`].
//!
//! Rules:
//! - a list contributes its first element only; an empty first element is absent
//! - text is trimmed, and empty text is absent
//! - `userAccountControl` bit 2 marks a disabled account; absent or unparsable
//!   values count as enabled
//! - `lastLogonTimestamp` is either a timestamp or a Windows FILETIME
//!   (100 ns ticks since 1601-01-01 UTC)

use crate::raw::{attrs, RawEntry, RawValue};
use chrono::DateTime;
use orgcache_core::{PersonRecord, Timestamp, ValidationError};

/// `userAccountControl` flag for a disabled account.
pub const ACCOUNTDISABLE: i64 = 0x2;

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;
const FILETIME_TICKS_PER_SEC: i64 = 10_000_000;

/// Collapse a raw value into one trimmed scalar.
pub fn scalar(value: Option<&RawValue>) -> Option<String> {
    match value? {
        RawValue::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        RawValue::Integer(i) => Some(i.to_string()),
        RawValue::Time(t) => Some(t.to_rfc3339()),
        RawValue::List(values) => scalar(values.first()),
    }
}

/// Account-enabled flag from `userAccountControl`.
pub fn account_enabled(value: Option<&RawValue>) -> bool {
    let flags = match value {
        Some(RawValue::Integer(i)) => Some(*i),
        Some(RawValue::List(values)) => return account_enabled(values.first()),
        other => scalar(other).and_then(|s| s.parse::<i64>().ok()),
    };
    match flags {
        Some(flags) => flags & ACCOUNTDISABLE == 0,
        None => true,
    }
}

/// Convert a Windows FILETIME into a UTC timestamp.
///
/// Zero and `i64::MAX` mean "never" in the directory and map to `None`.
pub fn filetime_to_timestamp(ticks: i64) -> Option<Timestamp> {
    if ticks <= 0 || ticks == i64::MAX {
        return None;
    }
    let secs = ticks / FILETIME_TICKS_PER_SEC - FILETIME_UNIX_OFFSET_SECS;
    let nanos = (ticks % FILETIME_TICKS_PER_SEC) * 100;
    DateTime::from_timestamp(secs, nanos as u32)
}

/// Last logon time from either representation.
pub fn last_logon(value: Option<&RawValue>) -> Option<Timestamp> {
    match value? {
        RawValue::Time(t) => Some(*t),
        RawValue::Integer(ticks) => filetime_to_timestamp(*ticks),
        RawValue::Text(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse::<i64>().ok().and_then(filetime_to_timestamp)
            } else {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|t| t.with_timezone(&chrono::Utc))
            }
        }
        RawValue::List(values) => last_logon(values.first()),
    }
}

/// Build a [`PersonRecord`] from a raw entry.
///
/// Fails only when the entry has no distinguished name, since that is the
/// identity every manager reference points at.
pub fn person_from_entry(entry: &RawEntry) -> Result<PersonRecord, ValidationError> {
    let text = |name: &str| scalar(entry.get(name));

    let distinguished_name =
        text(attrs::DISTINGUISHED_NAME).ok_or_else(|| ValidationError::RequiredFieldMissing {
            field: attrs::DISTINGUISHED_NAME.to_string(),
        })?;

    let given_name = text(attrs::GIVEN_NAME);
    let surname = text(attrs::SURNAME);
    let display_name = text(attrs::DISPLAY_NAME).or_else(|| {
        let joined = [given_name.as_deref(), surname.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    });

    Ok(PersonRecord {
        distinguished_name,
        given_name,
        surname,
        display_name,
        email: text(attrs::MAIL),
        title: text(attrs::TITLE),
        department_name: text(attrs::DEPARTMENT),
        telephone: text(attrs::TELEPHONE),
        company: text(attrs::COMPANY),
        manager_reference: text(attrs::MANAGER),
        account_enabled: account_enabled(entry.get(attrs::USER_ACCOUNT_CONTROL)),
        last_logon: last_logon(entry.get(attrs::LAST_LOGON)),
    })
}

/// Normalize a batch, skipping entries without identity.
pub fn people_from_entries(entries: &[RawEntry]) -> Vec<PersonRecord> {
    entries
        .iter()
        .filter_map(|entry| match person_from_entry(entry) {
            Ok(person) => Some(person),
            Err(e) => {
                tracing::debug!(error = %e, "skipping directory entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike, Utc};

    #[test]
    fn test_scalar_takes_first_list_element() {
        let value = RawValue::from(vec!["  Finance ", "Ops"]);
        assert_eq!(scalar(Some(&value)), Some("Finance".to_string()));

        let empty_first = RawValue::from(vec!["", "Ops"]);
        assert_eq!(scalar(Some(&empty_first)), None);

        assert_eq!(scalar(Some(&RawValue::List(vec![]))), None);
        assert_eq!(scalar(Some(&RawValue::from("   "))), None);
        assert_eq!(scalar(None), None);
    }

    #[test]
    fn test_account_enabled_bit() {
        assert!(account_enabled(Some(&RawValue::from(512i64))));
        assert!(!account_enabled(Some(&RawValue::from(514i64))));
        assert!(!account_enabled(Some(&RawValue::from("66050"))));
        assert!(account_enabled(Some(&RawValue::from("66048"))));
        assert!(account_enabled(Some(&RawValue::from(vec!["512"]))));
    }

    #[test]
    fn test_account_enabled_defaults() {
        assert!(account_enabled(None));
        assert!(account_enabled(Some(&RawValue::from(""))));
        assert!(account_enabled(Some(&RawValue::from("not-a-number"))));
        assert!(account_enabled(Some(&RawValue::from(0i64))));
    }

    #[test]
    fn test_filetime_conversion() {
        // 2021-01-01T00:00:00Z
        let ticks = (1_609_459_200 + FILETIME_UNIX_OFFSET_SECS) * FILETIME_TICKS_PER_SEC;
        let ts = filetime_to_timestamp(ticks).expect("valid filetime");
        assert_eq!(ts, Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());

        let with_fraction = filetime_to_timestamp(ticks + 5).expect("valid filetime");
        assert_eq!(with_fraction.nanosecond(), 500);

        assert_eq!(filetime_to_timestamp(0), None);
        assert_eq!(filetime_to_timestamp(i64::MAX), None);
    }

    #[test]
    fn test_last_logon_variants() {
        let ticks = (1_609_459_200 + FILETIME_UNIX_OFFSET_SECS) * FILETIME_TICKS_PER_SEC;
        let from_text = last_logon(Some(&RawValue::from(ticks.to_string())));
        assert_eq!(from_text.map(|t| t.year()), Some(2021));

        let now = Utc::now();
        assert_eq!(last_logon(Some(&RawValue::from(now))), Some(now));
        assert_eq!(last_logon(Some(&RawValue::from("garbage"))), None);
        assert_eq!(last_logon(Some(&RawValue::from("0"))), None);
    }

    #[test]
    fn test_person_from_entry() {
        let entry = RawEntry::new()
            .with(attrs::DISTINGUISHED_NAME, "CN=Ana Rojas,OU=People,DC=acme")
            .with(attrs::GIVEN_NAME, vec!["Ana"])
            .with(attrs::SURNAME, "Rojas")
            .with(attrs::MAIL, "ana@acme.test")
            .with(attrs::TITLE, "Jefa de Finanzas")
            .with(attrs::DEPARTMENT, "Finanzas")
            .with(attrs::MANAGER, "CN=Boss,OU=People,DC=acme")
            .with(attrs::USER_ACCOUNT_CONTROL, 512i64);

        let person = person_from_entry(&entry).expect("normalizes");
        assert_eq!(person.distinguished_name, "CN=Ana Rojas,OU=People,DC=acme");
        assert_eq!(person.given_name.as_deref(), Some("Ana"));
        assert_eq!(person.display_name.as_deref(), Some("Ana Rojas"));
        assert_eq!(person.department_name.as_deref(), Some("Finanzas"));
        assert_eq!(
            person.manager_reference.as_deref(),
            Some("CN=Boss,OU=People,DC=acme")
        );
        assert!(person.account_enabled);
        assert!(person.last_logon.is_none());
    }

    #[test]
    fn test_person_requires_dn() {
        let entry = RawEntry::new().with(attrs::MAIL, "nobody@acme.test");
        let err = person_from_entry(&entry).expect_err("no dn");
        assert_eq!(
            err,
            ValidationError::RequiredFieldMissing {
                field: "distinguishedName".to_string()
            }
        );
        assert!(people_from_entries(&[entry]).is_empty());
    }
}
