//! Title classification.
//!
//! One canonical table, matched on whole words, case-insensitive, with
//! English and Spanish keywords. Lower priority wins.
//!
//! | priority | category       | keywords |
//! |----------|----------------|----------|
//! | 1        | general manager| "general manager", "gerente general" |
//! | 2        | manager        | manager, gerente (not deputy/assistant forms) |
//! | 3        | deputy manager | deputy, subgerente, assistant/asistente/adjunto + manager/gerente |
//! | 4        | head           | head, chief, jefe, jefa |
//! | 5        | coordinator    | coordinator, lead, coordinador(a), encargado(a) |
//! | 999      | none           | anything else |

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleCategory {
    GeneralManager,
    Manager,
    DeputyManager,
    Head,
    Coordinator,
    None,
}

const MANAGER_WORDS: &[&str] = &["manager", "gerente"];
const DEPUTY_WORDS: &[&str] = &["deputy", "subgerente"];
const ASSISTANT_WORDS: &[&str] = &["assistant", "asistente", "adjunto", "adjunta"];
const HEAD_WORDS: &[&str] = &["head", "chief", "jefe", "jefa"];
const COORDINATOR_WORDS: &[&str] = &[
    "coordinator",
    "lead",
    "coordinador",
    "coordinadora",
    "encargado",
    "encargada",
];

impl TitleCategory {
    /// All categories from best to worst.
    pub const ALL: [TitleCategory; 6] = [
        TitleCategory::GeneralManager,
        TitleCategory::Manager,
        TitleCategory::DeputyManager,
        TitleCategory::Head,
        TitleCategory::Coordinator,
        TitleCategory::None,
    ];

    pub fn classify(title: &str) -> Self {
        let words: Vec<String> = title
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        let has = |set: &[&str]| words.iter().any(|w| set.contains(&w.as_str()));
        let adjacent = |first: &str, second: &str| {
            words.windows(2).any(|pair| pair[0] == first && pair[1] == second)
        };

        if adjacent("general", "manager") || adjacent("gerente", "general") {
            TitleCategory::GeneralManager
        } else if has(DEPUTY_WORDS) || (has(ASSISTANT_WORDS) && has(MANAGER_WORDS)) {
            TitleCategory::DeputyManager
        } else if has(MANAGER_WORDS) {
            TitleCategory::Manager
        } else if has(HEAD_WORDS) {
            TitleCategory::Head
        } else if has(COORDINATOR_WORDS) {
            TitleCategory::Coordinator
        } else {
            TitleCategory::None
        }
    }

    /// Classify an optional title; a missing title is `None`.
    pub fn of(title: Option<&str>) -> Self {
        title.map(Self::classify).unwrap_or(TitleCategory::None)
    }

    pub fn priority(self) -> u16 {
        match self {
            TitleCategory::GeneralManager => 1,
            TitleCategory::Manager => 2,
            TitleCategory::DeputyManager => 3,
            TitleCategory::Head => 4,
            TitleCategory::Coordinator => 5,
            TitleCategory::None => 999,
        }
    }

    pub fn is_hierarchical(self) -> bool {
        self != TitleCategory::None
    }

    /// General, plain and deputy managers.
    pub fn is_manager_tier(self) -> bool {
        matches!(
            self,
            TitleCategory::GeneralManager | TitleCategory::Manager | TitleCategory::DeputyManager
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TitleCategory::GeneralManager => "general_manager",
            TitleCategory::Manager => "manager",
            TitleCategory::DeputyManager => "deputy_manager",
            TitleCategory::Head => "head",
            TitleCategory::Coordinator => "coordinator",
            TitleCategory::None => "none",
        }
    }
}

/// Priority of an optional title (999 when absent or unmatched).
pub fn title_priority(title: Option<&str>) -> u16 {
    TitleCategory::of(title).priority()
}

/// Whether an optional title names a hierarchical position.
pub fn is_hierarchical_title(title: Option<&str>) -> bool {
    TitleCategory::of(title).is_hierarchical()
}
