// SPDX-License-Identifier: MIT OR Apache-2.0
//! Prerequisite graph acyclicity check, shared by the registry invariants
//! and the surface validator's `circular-prerequisite` rule.

use crate::registry::CommandRegistry;
use std::collections::HashSet;

/// Walk colors for iterative-deepening DFS cycle detection.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Find one cycle in the `requires` graph induced by `registry`, if any.
///
/// Returns the command names forming the cycle, in traversal order, or
/// `None` if the graph is a DAG. References to unregistered commands are
/// ignored here — that is the `unresolved-prerequisite` rule's job.
#[must_use]
pub fn find_cycle(registry: &CommandRegistry) -> Option<Vec<String>> {
    let names: Vec<&str> = registry.list(None).iter().map(|d| d.name.as_str()).collect();
    let mut color: std::collections::HashMap<&str, Color> =
        names.iter().map(|&n| (n, Color::White)).collect();

    for &start in &names {
        if color[start] == Color::White {
            let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
            let mut path: Vec<&str> = vec![start];
            color.insert(start, Color::Gray);

            while let Some((node, next_idx)) = stack.last().copied() {
                let Some(def) = registry.get(node) else {
                    stack.pop();
                    path.pop();
                    continue;
                };
                if next_idx >= def.requires.len() {
                    color.insert(node, Color::Black);
                    stack.pop();
                    path.pop();
                    continue;
                }
                stack.last_mut().unwrap().1 += 1;
                let next = def.requires[next_idx].as_str();
                match color.get(next).copied() {
                    Some(Color::Gray) => {
                        let cycle_start = path.iter().position(|&n| n == next).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[cycle_start..].iter().map(|s| s.to_string()).collect();
                        cycle.push(next.to_string());
                        return Some(cycle);
                    }
                    Some(Color::White) => {
                        color.insert(next, Color::Gray);
                        stack.push((next, 0));
                        path.push(next);
                    }
                    _ => {}
                }
            }
        }
    }
    None
}

/// Names referenced by `requires` edges across `registry` that are not
/// themselves registered. Order matches registration order of the
/// referencing command.
#[must_use]
pub fn unresolved_prerequisites(registry: &CommandRegistry) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let known: HashSet<&str> = registry.list(None).iter().map(|d| d.name.as_str()).collect();
    for def in registry.list(None) {
        for req in &def.requires {
            if !known.contains(req.as_str()) {
                out.push((def.name.clone(), req.clone()));
            }
        }
    }
    out
}
