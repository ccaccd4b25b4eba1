// SPDX-License-Identifier: MIT OR Apache-2.0
//! Static cross-command surface analyzer (§4.6): a normalized
//! [`SurfaceCommand`] set in, a [`ValidationReport`] out. Never touches the
//! registry or the network — pure data in, pure data out, so it can run over
//! a registered surface or a hypothetical one the CLI is linting before
//! registration.

use afd_registry::{validate_name, CommandDefinition};
use afd_schema::Shape;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// One command, stripped of its handler, as the analyzer sees it.
#[derive(Debug, Clone)]
pub struct SurfaceCommand {
    /// See [`CommandDefinition::name`].
    pub name: String,
    /// See [`CommandDefinition::description`].
    pub description: String,
    /// See [`CommandDefinition::category`].
    pub category: Option<String>,
    /// See [`CommandDefinition::tags`].
    pub tags: Vec<String>,
    /// The command's JSON Schema input document.
    pub input_schema: Value,
    /// See [`CommandDefinition::requires`].
    pub requires: Vec<String>,
}

impl From<&CommandDefinition> for SurfaceCommand {
    fn from(def: &CommandDefinition) -> Self {
        Self {
            name: def.name.clone(),
            description: def.description.clone(),
            category: def.category.clone(),
            tags: def.tags.iter().cloned().collect(),
            input_schema: def.input_schema.json_schema().clone(),
            requires: def.requires.clone(),
        }
    }
}

/// Severity of a [`Finding`]. Distinct from [`afd_result::Severity`] — this
/// taxonomy includes `error`, which never appears in a result envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Does not affect validity unless strict mode is on.
    Info,
    /// Counts toward `valid: false` only in strict mode.
    Warning,
    /// Always counts toward `valid: false`.
    Error,
}

/// One rule violation.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// Rule identifier, e.g. `"naming-collision"`.
    pub rule: &'static str,
    /// Severity of this specific finding.
    pub severity: Severity,
    /// Human-readable explanation.
    pub message: String,
    /// Commands implicated by this finding.
    pub commands: Vec<String>,
    /// `true` if a caller-supplied suppression matched this finding.
    /// Suppressed findings are still reported, just excluded from `valid`.
    pub suppressed: bool,
}

/// Aggregate counts for a [`ValidationReport`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationSummary {
    /// Commands considered.
    pub total_commands: usize,
    /// Non-suppressed `error` findings.
    pub error_count: usize,
    /// Non-suppressed `warning` findings.
    pub warning_count: usize,
    /// Non-suppressed `info` findings.
    pub info_count: usize,
}

/// The result of [`validate`].
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// `false` if any non-suppressed `error` finding exists, or (in strict
    /// mode) any non-suppressed `warning`.
    pub valid: bool,
    /// Every finding, including suppressed ones.
    pub findings: Vec<Finding>,
    /// Aggregate counts.
    pub summary: ValidationSummary,
}

/// Tunables for [`validate`]; defaults match §4.6.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Warnings count toward `valid: false` when `true`.
    pub strict: bool,
    /// Suppression strings: `rule`, `rule:name`, or `rule:a:b`.
    pub suppressions: Vec<String>,
    /// `similar-descriptions` cosine threshold. Default `0.7`.
    pub description_similarity_threshold: f64,
    /// `schema-overlap` field-overlap threshold. Default `0.8`.
    pub schema_overlap_threshold: f64,
    /// `description-quality` minimum description length. Default `20`.
    pub description_min_len: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            strict: false,
            suppressions: Vec::new(),
            description_similarity_threshold: 0.7,
            schema_overlap_threshold: 0.8,
            description_min_len: 20,
        }
    }
}

/// Run all eleven rules over `commands`.
#[must_use]
pub fn validate(commands: &[SurfaceCommand], options: &ValidationOptions) -> ValidationReport {
    let mut findings = Vec::new();

    findings.extend(similar_descriptions(commands, options.description_similarity_threshold));
    findings.extend(schema_overlap(commands, options.schema_overlap_threshold));
    findings.extend(naming_convention(commands));
    findings.extend(naming_collision(commands));
    findings.extend(missing_category(commands));
    findings.extend(description_injection(commands));
    findings.extend(description_quality(commands, options.description_min_len));
    findings.extend(orphaned_category(commands));
    findings.extend(schema_complexity(commands));
    findings.extend(unresolved_prerequisite(commands));
    findings.extend(circular_prerequisite(commands));

    for finding in &mut findings {
        finding.suppressed = options.suppressions.iter().any(|s| matches_suppression(finding, s));
    }

    let mut summary = ValidationSummary {
        total_commands: commands.len(),
        ..Default::default()
    };
    let mut has_error = false;
    let mut has_warning = false;
    for f in &findings {
        if f.suppressed {
            continue;
        }
        match f.severity {
            Severity::Error => {
                summary.error_count += 1;
                has_error = true;
            }
            Severity::Warning => {
                summary.warning_count += 1;
                has_warning = true;
            }
            Severity::Info => summary.info_count += 1,
        }
    }

    let valid = !has_error && !(options.strict && has_warning);

    ValidationReport { valid, findings, summary }
}

fn matches_suppression(finding: &Finding, suppression: &str) -> bool {
    let parts: Vec<&str> = suppression.split(':').collect();
    if parts.is_empty() || parts[0] != finding.rule {
        return false;
    }
    match parts.len() {
        1 => true,
        2 => finding.commands.iter().any(|c| c == parts[1]),
        _ => {
            let names: HashSet<&str> = parts[1..].iter().copied().collect();
            let finding_set: HashSet<&str> = finding.commands.iter().map(String::as_str).collect();
            names == finding_set
        }
    }
}

// ---------------------------------------------------------------------------
// 1. similar-descriptions
// ---------------------------------------------------------------------------

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "to", "in", "on", "for", "with", "is", "are", "this", "that", "it", "by", "as", "at", "from",
];

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn term_frequencies(tokens: &[String]) -> HashMap<&str, f64> {
    let mut tf = HashMap::new();
    for t in tokens {
        *tf.entry(t.as_str()).or_insert(0.0) += 1.0;
    }
    tf
}

fn cosine_similarity(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let fa = term_frequencies(&ta);
    let fb = term_frequencies(&tb);

    let mut dot = 0.0;
    for (term, va) in &fa {
        if let Some(vb) = fb.get(term) {
            dot += va * vb;
        }
    }
    let norm_a: f64 = fa.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b: f64 = fb.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn similar_descriptions(commands: &[SurfaceCommand], threshold: f64) -> Vec<Finding> {
    let mut findings = Vec::new();
    for i in 0..commands.len() {
        for j in (i + 1)..commands.len() {
            let sim = cosine_similarity(&commands[i].description, &commands[j].description);
            if sim >= threshold {
                findings.push(Finding {
                    rule: "similar-descriptions",
                    severity: Severity::Warning,
                    message: format!(
                        "'{}' and '{}' have near-identical descriptions (cosine similarity {sim:.2})",
                        commands[i].name, commands[j].name
                    ),
                    commands: vec![commands[i].name.clone(), commands[j].name.clone()],
                    suppressed: false,
                });
            }
        }
    }
    findings
}

// ---------------------------------------------------------------------------
// 2. schema-overlap
// ---------------------------------------------------------------------------

fn top_level_fields(schema: &Value) -> HashSet<String> {
    Shape::new(schema).properties().into_iter().map(|(name, _)| name).collect()
}

fn schema_overlap(commands: &[SurfaceCommand], threshold: f64) -> Vec<Finding> {
    let mut findings = Vec::new();
    let field_sets: Vec<HashSet<String>> = commands.iter().map(|c| top_level_fields(&c.input_schema)).collect();

    for i in 0..commands.len() {
        for j in (i + 1)..commands.len() {
            let a = &field_sets[i];
            let b = &field_sets[j];
            if a.is_empty() && b.is_empty() {
                continue;
            }
            let intersection = a.intersection(b).count();
            let union = a.union(b).count();
            let ratio = if union == 0 { 0.0 } else { intersection as f64 / union as f64 };
            if ratio >= threshold {
                findings.push(Finding {
                    rule: "schema-overlap",
                    severity: Severity::Warning,
                    message: format!(
                        "'{}' and '{}' share {:.0}% of their top-level input fields",
                        commands[i].name,
                        commands[j].name,
                        ratio * 100.0
                    ),
                    commands: vec![commands[i].name.clone(), commands[j].name.clone()],
                    suppressed: false,
                });
            }
        }
    }
    findings
}

// ---------------------------------------------------------------------------
// 3. naming-convention
// ---------------------------------------------------------------------------

fn naming_convention(commands: &[SurfaceCommand]) -> Vec<Finding> {
    commands
        .iter()
        .filter_map(|c| {
            validate_name(&c.name).err().map(|reason| Finding {
                rule: "naming-convention",
                severity: Severity::Error,
                message: format!("'{}' violates the naming convention: {reason}", c.name),
                commands: vec![c.name.clone()],
                suppressed: false,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 4. naming-collision
// ---------------------------------------------------------------------------

fn normalize_name(name: &str) -> String {
    name.to_lowercase().chars().filter(char::is_ascii_alphanumeric).collect()
}

fn naming_collision(commands: &[SurfaceCommand]) -> Vec<Finding> {
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    for c in commands {
        groups.entry(normalize_name(&c.name)).or_default().push(c.name.clone());
    }
    groups
        .into_values()
        .filter(|names| names.len() > 1)
        .map(|mut names| {
            names.sort();
            Finding {
                rule: "naming-collision",
                severity: Severity::Error,
                message: format!("names collapse to the same identifier after normalization: {}", names.join(", ")),
                commands: names,
                suppressed: false,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 5. missing-category
// ---------------------------------------------------------------------------

fn missing_category(commands: &[SurfaceCommand]) -> Vec<Finding> {
    commands
        .iter()
        .filter(|c| c.category.is_none())
        .map(|c| Finding {
            rule: "missing-category",
            severity: Severity::Info,
            message: format!("'{}' has no category", c.name),
            commands: vec![c.name.clone()],
            suppressed: false,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 6. description-injection
// ---------------------------------------------------------------------------

const INJECTION_PATTERNS: &[&str] = &[
    "ignore previous instructions",
    "ignore all previous",
    "disregard the above",
    "you are now",
    "act as",
    "system prompt",
    "system:",
    "assistant:",
    "new instructions:",
    "do not tell the user",
];

fn description_injection(commands: &[SurfaceCommand]) -> Vec<Finding> {
    commands
        .iter()
        .filter_map(|c| {
            let lower = c.description.to_lowercase();
            INJECTION_PATTERNS.iter().find(|p| lower.contains(**p)).map(|pattern| Finding {
                rule: "description-injection",
                severity: Severity::Error,
                message: format!("'{}' description matches a suspected prompt-injection pattern ({pattern:?})", c.name),
                commands: vec![c.name.clone()],
                suppressed: false,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 7. description-quality
// ---------------------------------------------------------------------------

const ACTION_VERBS: &[&str] = &[
    "create", "list", "delete", "update", "get", "set", "add", "remove", "archive", "restore", "send", "fetch", "search", "validate",
    "schedule", "cancel", "approve", "reject", "start", "stop", "run", "build", "generate", "export", "import", "sync", "check",
    "read", "write", "mark", "complete", "assign", "render", "compute", "render",
];

fn description_quality(commands: &[SurfaceCommand], min_len: usize) -> Vec<Finding> {
    commands
        .iter()
        .filter_map(|c| {
            let too_short = c.description.len() < min_len;
            let lower = c.description.to_lowercase();
            let has_verb = ACTION_VERBS.iter().any(|v| lower.split_whitespace().any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == *v));
            if too_short || !has_verb {
                let reason = match (too_short, has_verb) {
                    (true, false) => "is too short and lacks a recognized action verb".to_string(),
                    (true, true) => format!("is shorter than {min_len} characters"),
                    (false, false) => "lacks a recognized action verb".to_string(),
                    (false, true) => unreachable!(),
                };
                Some(Finding {
                    rule: "description-quality",
                    severity: Severity::Warning,
                    message: format!("'{}' description {reason}", c.name),
                    commands: vec![c.name.clone()],
                    suppressed: false,
                })
            } else {
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 8. orphaned-category
// ---------------------------------------------------------------------------

fn orphaned_category(commands: &[SurfaceCommand]) -> Vec<Finding> {
    let mut counts: HashMap<&str, Vec<&str>> = HashMap::new();
    for c in commands {
        if let Some(cat) = &c.category {
            counts.entry(cat.as_str()).or_default().push(c.name.as_str());
        }
    }
    counts
        .into_iter()
        .filter(|(_, members)| members.len() == 1)
        .map(|(cat, members)| Finding {
            rule: "orphaned-category",
            severity: Severity::Info,
            message: format!("category '{cat}' has exactly one command"),
            commands: members.iter().map(|s| (*s).to_string()).collect(),
            suppressed: false,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 9. schema-complexity
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ComplexityStats {
    max_depth: u32,
    unions: u32,
    intersections: u32,
    enums: u32,
    patterns_or_formats: u32,
    numeric_bounds: u32,
    field_required_anywhere: HashMap<String, bool>,
}

fn walk_complexity(shape: Shape<'_>, depth: u32, stats: &mut ComplexityStats) {
    stats.max_depth = stats.max_depth.max(depth);

    let one_of = shape.one_of();
    let any_of = shape.any_of();
    for group in [&one_of, &any_of] {
        if group.is_empty() {
            continue;
        }
        let non_null: Vec<&Shape<'_>> = group.iter().filter(|v| !v.is_null_type()).collect();
        if non_null.len() >= 2 {
            stats.unions += 1;
        }
        for variant in group {
            walk_object(*variant, depth, stats);
        }
    }

    let all_of = shape.all_of();
    if !all_of.is_empty() {
        stats.intersections += 1;
        for member in &all_of {
            walk_object(*member, depth, stats);
        }
    }

    walk_object(shape, depth, stats);
}

fn walk_object(shape: Shape<'_>, depth: u32, stats: &mut ComplexityStats) {
    let required = shape.required();
    for (name, field) in shape.properties() {
        let is_required = required.contains(&name);
        let entry = stats.field_required_anywhere.entry(name).or_insert(false);
        *entry = *entry || is_required;

        if field.enum_values().is_some() {
            stats.enums += 1;
        }
        if field.format().is_some() {
            stats.patterns_or_formats += 1;
        }
        if field.pattern().is_some() {
            stats.patterns_or_formats += 1;
        }
        if field.minimum().is_some() {
            stats.numeric_bounds += 1;
        }
        if field.maximum().is_some() {
            stats.numeric_bounds += 1;
        }

        if field.schema_type() == Some("object") || !field.properties().is_empty() {
            walk_complexity(field, depth + 1, stats);
        } else if let Some(items) = field.items() {
            if items.schema_type() == Some("object") || !items.properties().is_empty() {
                walk_complexity(items, depth + 1, stats);
            } else {
                if items.enum_values().is_some() {
                    stats.enums += 1;
                }
                if items.format().is_some() || items.pattern().is_some() {
                    stats.patterns_or_formats += 1;
                }
            }
        } else if !field.one_of().is_empty() || !field.any_of().is_empty() || !field.all_of().is_empty() {
            walk_complexity(field, depth, stats);
        }
    }
}

/// A complexity tier, per §4.6's thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityTier {
    /// Score 0-5. No finding emitted.
    None,
    /// Score 6-12.
    Info,
    /// Score 13+.
    High,
}

/// Compute the §4.6 weighted complexity score for one input schema.
#[must_use]
pub fn complexity_score(schema: &Value) -> u32 {
    let mut stats = ComplexityStats::default();
    walk_complexity(Shape::new(schema), 0, &mut stats);

    let fields = stats.field_required_anywhere.len() as u32;
    let optional = stats.field_required_anywhere.values().filter(|req| !**req).count() as u32;
    let optional_ratio = if fields == 0 { 0.0 } else { f64::from(optional) / f64::from(fields) };

    fields * 1
        + stats.max_depth * 3
        + stats.unions * 5
        + stats.intersections * 2
        + stats.enums * 1
        + stats.patterns_or_formats * 2
        + stats.numeric_bounds
        + (optional_ratio * 4.0).floor() as u32
}

/// Map a score to its tier.
#[must_use]
pub fn complexity_tier(score: u32) -> ComplexityTier {
    match score {
        0..=5 => ComplexityTier::None,
        6..=12 => ComplexityTier::Info,
        _ => ComplexityTier::High,
    }
}

fn schema_complexity(commands: &[SurfaceCommand]) -> Vec<Finding> {
    commands
        .iter()
        .filter_map(|c| {
            let score = complexity_score(&c.input_schema);
            match complexity_tier(score) {
                ComplexityTier::None => None,
                ComplexityTier::Info => Some(Finding {
                    rule: "schema-complexity",
                    severity: Severity::Info,
                    message: format!("'{}' input schema complexity score is {score} (informational tier)", c.name),
                    commands: vec![c.name.clone()],
                    suppressed: false,
                }),
                ComplexityTier::High => Some(Finding {
                    rule: "schema-complexity",
                    severity: Severity::Warning,
                    message: format!("'{}' input schema complexity score is {score} (high tier)", c.name),
                    commands: vec![c.name.clone()],
                    suppressed: false,
                }),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 10 & 11. prerequisite graph
// ---------------------------------------------------------------------------

fn unresolved_prerequisite(commands: &[SurfaceCommand]) -> Vec<Finding> {
    let known: HashSet<&str> = commands.iter().map(|c| c.name.as_str()).collect();
    commands
        .iter()
        .flat_map(|c| {
            c.requires.iter().filter(move |r| !known.contains(r.as_str())).map(move |r| Finding {
                rule: "unresolved-prerequisite",
                severity: Severity::Error,
                message: format!("'{}' requires unregistered command '{r}'", c.name),
                commands: vec![c.name.clone()],
                suppressed: false,
            })
        })
        .collect()
}

fn circular_prerequisite(commands: &[SurfaceCommand]) -> Vec<Finding> {
    let by_name: HashMap<&str, &SurfaceCommand> = commands.iter().map(|c| (c.name.as_str(), c)).collect();
    let mut color: HashMap<&str, u8> = commands.iter().map(|c| (c.name.as_str(), 0u8)).collect();
    let mut findings = Vec::new();
    let mut reported: HashSet<Vec<String>> = HashSet::new();

    for start in by_name.keys() {
        if color[start] != 0 {
            continue;
        }
        let mut path: Vec<&str> = Vec::new();
        if let Some(cycle) = dfs(start, &by_name, &mut color, &mut path) {
            let mut key = cycle.clone();
            key.sort();
            if reported.insert(key) {
                findings.push(Finding {
                    rule: "circular-prerequisite",
                    severity: Severity::Error,
                    message: format!("prerequisite cycle: {}", cycle.join(" -> ")),
                    commands: cycle,
                    suppressed: false,
                });
            }
        }
    }
    findings
}

fn dfs<'a>(
    node: &'a str,
    by_name: &HashMap<&'a str, &'a SurfaceCommand>,
    color: &mut HashMap<&'a str, u8>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    color.insert(node, 1);
    path.push(node);

    if let Some(def) = by_name.get(node) {
        for req in &def.requires {
            let req = req.as_str();
            let Some(&req_color) = color.get(req) else { continue };
            match req_color {
                1 => {
                    let start = path.iter().position(|&n| n == req).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].iter().map(|s| (*s).to_string()).collect();
                    cycle.push(req.to_string());
                    return Some(cycle);
                }
                0 => {
                    if let Some(cycle) = dfs(req, by_name, color, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }
    }

    path.pop();
    color.insert(node, 2);
    None
}
