//! Department display names.

const ACRONYMS: &[&str] = &["TI", "IT", "RH", "RRHH", "QA", "QC", "R&D", "CEO", "CTO", "CMF"];

/// Trim, collapse whitespace and capitalise words, keeping known acronyms
/// upper case. Returns an empty string for blank input.
pub fn normalize_department_name(name: &str) -> String {
    name.split_whitespace()
        .map(normalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_word(word: &str) -> String {
    let upper = word.to_uppercase();
    if ACRONYMS.contains(&upper.as_str()) {
        return upper;
    }
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_department_name("  recursos   humanos "), "Recursos Humanos");
        assert_eq!(normalize_department_name("GERENCIA DE ti"), "Gerencia De TI");
        assert_eq!(normalize_department_name("r&d lab"), "R&D Lab");
        assert_eq!(normalize_department_name("área rrhh"), "Área RRHH");
        assert_eq!(normalize_department_name("   "), "");
    }
}
