// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command name grammar: lowercase kebab-case, `domain-action` shaped.

const MAX_LEN: usize = 64;

/// Validate a command name against `^[a-z][a-z0-9]*-[a-z][a-z0-9-]*$`,
/// max 64 chars. Dotted legacy names (`todo.create`) are rejected — see
/// the design notes on naming history.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if name.len() > MAX_LEN {
        return Err(format!("name exceeds {MAX_LEN} characters"));
    }
    if name.contains('.') {
        return Err("dotted names are legacy and rejected; use kebab-case".to_string());
    }

    let Some(dash) = name.find('-') else {
        return Err("name must contain at least one '-' separating domain and action".to_string());
    };

    let (domain, rest) = name.split_at(dash);
    let action = &rest[1..];

    if !is_valid_segment_start_alpha(domain) {
        return Err("domain segment must start with a lowercase letter and contain only lowercase alphanumerics".to_string());
    }
    if action.is_empty() {
        return Err("action segment must not be empty".to_string());
    }
    if !action.chars().next().is_some_and(|c| c.is_ascii_lowercase()) {
        return Err("action segment must start with a lowercase letter".to_string());
    }
    if !action
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("action segment may only contain lowercase alphanumerics and '-'".to_string());
    }

    Ok(())
}

fn is_valid_segment_start_alpha(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_kebab_name() {
        assert!(validate_name("todo-create").is_ok());
    }

    #[test]
    fn accepts_multi_segment_action() {
        assert!(validate_name("todo-mark-done").is_ok());
    }

    #[test]
    fn accepts_alphanumeric_domain() {
        assert!(validate_name("afd2-help").is_ok());
    }

    #[test]
    fn rejects_dotted_legacy_name() {
        assert!(validate_name("todo.create").is_err());
    }

    #[test]
    fn rejects_missing_dash() {
        assert!(validate_name("todocreate").is_err());
    }

    #[test]
    fn rejects_uppercase() {
        assert!(validate_name("Todo-Create").is_err());
    }

    #[test]
    fn rejects_leading_digit() {
        assert!(validate_name("1todo-create").is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(validate_name("").is_err());
    }

    #[test]
    fn rejects_over_max_length() {
        let long = format!("a-{}", "b".repeat(70));
        assert!(validate_name(&long).is_err());
    }

    #[test]
    fn accepts_exactly_64_chars() {
        let name = format!("a-{}", "b".repeat(61));
        assert_eq!(name.len(), 64);
        assert!(validate_name(&name).is_ok());
    }

    #[test]
    fn rejects_trailing_dash_action_empty() {
        assert!(validate_name("todo-").is_err());
    }
}
