//! Constraint closure.
//!
//! A restriction on a descendant node (say, a fixed user-agent) implies
//! restrictions on every ancestor whose values can still reach one of the
//! allowed descendant values. The closure walks each constrained node's
//! undeepered CPT, collects the parent-value paths that end in an allowed
//! value, and intersects the induced per-node restrictions across all
//! constraints.

use crate::bayes::{FlatTree, Network};
use crate::models::{MimesisError, Result};
use std::collections::HashMap;

/// Propagate `possible_values` through the network structure.
///
/// Returns the induced restriction for every node touched by a constraint.
/// An empty result map means no constrained value was found anywhere in the
/// tree; callers treat that as "no closure information" and sample
/// unconstrained. An empty constraint list, or an intersection that comes
/// up empty, is over-constrained.
pub fn constraint_closure(
    network: &Network,
    possible_values: &HashMap<String, Vec<String>>,
) -> Result<HashMap<String, Vec<String>>> {
    let mut induced_sets: Vec<HashMap<String, Vec<String>>> = Vec::new();
    let mut found_matching_values = false;

    for (key, values) in possible_values {
        if values.is_empty() {
            return Err(MimesisError::OverConstrained);
        }
        let Some(node) = network.node(key) else {
            continue;
        };

        let tree = node.conditional_probabilities.undeeper();
        let positions = compatible_parent_values(&tree, values);
        if !positions.is_empty() {
            found_matching_values = true;
        }

        let mut set: HashMap<String, Vec<String>> = HashMap::new();
        for (index, parent_values) in positions.into_iter().enumerate() {
            if let Some(parent_name) = node.parent_names.get(index) {
                set.insert(parent_name.clone(), parent_values);
            }
        }
        set.insert(key.clone(), values.clone());
        induced_sets.push(set);
    }

    if !found_matching_values {
        return Ok(HashMap::new());
    }

    let mut closure: HashMap<String, Vec<String>> = HashMap::new();
    for set in induced_sets {
        for (key, values) in set {
            match closure.entry(key) {
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    let intersected: Vec<String> = entry
                        .get()
                        .iter()
                        .filter(|value| values.contains(value))
                        .cloned()
                        .collect();
                    if intersected.is_empty() {
                        return Err(MimesisError::OverConstrained);
                    }
                    *entry.get_mut() = intersected;
                }
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(values);
                }
            }
        }
    }

    Ok(closure)
}

/// DFS over an undeepered tree: every root-to-leaf path whose leaf carries
/// one of `values` contributes its parent values, unioned per position.
fn compatible_parent_values(tree: &[(String, FlatTree)], values: &[String]) -> Vec<Vec<String>> {
    let mut positions: Vec<Vec<String>> = Vec::new();
    let mut path: Vec<&str> = Vec::new();
    walk(tree, values, &mut path, &mut positions);
    positions
}

fn walk<'a>(
    entries: &'a [(String, FlatTree)],
    values: &[String],
    path: &mut Vec<&'a str>,
    positions: &mut Vec<Vec<String>>,
) {
    for (key, subtree) in entries {
        match subtree {
            FlatTree::Tree(children) => {
                path.push(key);
                walk(children, values, path, positions);
                path.pop();
            }
            FlatTree::Value => {
                if !values.contains(key) {
                    continue;
                }
                if positions.is_empty() {
                    *positions = path.iter().map(|value| vec![value.to_string()]).collect();
                } else {
                    for (position, value) in positions.iter_mut().zip(path.iter()) {
                        if !position.iter().any(|existing| existing == value) {
                            position.push(value.to_string());
                        }
                    }
                }
            }
        }
    }
}
