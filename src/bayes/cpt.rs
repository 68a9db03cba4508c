//! Conditional probability trees.
//!
//! The serialized format encodes a sparse CPT as nested objects: a `deeper`
//! child branches on the next parent's value, a `skip` child stands for
//! "same distribution regardless of this parent", and a plain object of
//! numbers is a leaf distribution over the node's own values. Here that
//! shape becomes a tagged tree, validated while loading.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// One level of a conditional probability tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalTree {
    /// Distribution over the node's own values, in document order.
    Leaf(Vec<(String, f64)>),
    /// Branch on the next parent's value, with an optional fallback subtree
    /// used when the parent's value has no `deeper` entry.
    Branch {
        deeper: BTreeMap<String, ConditionalTree>,
        skip: Option<Box<ConditionalTree>>,
    },
}

impl ConditionalTree {
    /// Resolve the leaf distribution for the given parent assignment.
    ///
    /// Walks one level per parent: `deeper[value]` when present, else the
    /// `skip` subtree, else the walk dead-ends and the distribution is
    /// empty. A residual branch after all parents are consumed is likewise
    /// empty.
    pub fn distribution<'a>(
        &'a self,
        parent_names: &[String],
        assigned: &HashMap<String, String>,
    ) -> &'a [(String, f64)] {
        let mut cursor = self;
        for parent in parent_names {
            match cursor {
                ConditionalTree::Leaf(_) => break,
                ConditionalTree::Branch { deeper, skip } => {
                    let parent_value = assigned.get(parent).map(String::as_str).unwrap_or("");
                    if let Some(next) = deeper.get(parent_value) {
                        cursor = next;
                    } else if let Some(next) = skip.as_deref() {
                        cursor = next;
                    } else {
                        return &[];
                    }
                }
            }
        }
        match cursor {
            ConditionalTree::Leaf(entries) => entries,
            ConditionalTree::Branch { .. } => &[],
        }
    }

    /// Flatten the tree for constraint propagation: `skip` subtrees are
    /// dropped and `deeper` children are hoisted one level up, so every
    /// internal edge carries a concrete parent value and every terminal
    /// entry is one of the node's own values.
    pub fn undeeper(&self) -> Vec<(String, FlatTree)> {
        match self {
            ConditionalTree::Leaf(entries) => entries
                .iter()
                .map(|(value, _)| (value.clone(), FlatTree::Value))
                .collect(),
            ConditionalTree::Branch { deeper, .. } => deeper
                .iter()
                .map(|(parent_value, subtree)| {
                    (parent_value.clone(), FlatTree::Tree(subtree.undeeper()))
                })
                .collect(),
        }
    }
}

/// Node of an undeepered tree. Terminal entries carry their meaning in the
/// key, so the value degenerates to a marker.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatTree {
    Tree(Vec<(String, FlatTree)>),
    Value,
}

impl<'de> Deserialize<'de> for ConditionalTree {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TreeVisitor;

        impl<'de> Visitor<'de> for TreeVisitor {
            type Value = ConditionalTree;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a conditional probability tree object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut deeper: Option<BTreeMap<String, ConditionalTree>> = None;
                let mut skip: Option<Box<ConditionalTree>> = None;
                let mut leaf: Vec<(String, f64)> = Vec::new();

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "deeper" => deeper = Some(map.next_value()?),
                        "skip" => skip = Some(Box::new(map.next_value()?)),
                        _ => {
                            // Non-numeric leaf values are dropped.
                            let value: serde_json::Value = map.next_value()?;
                            if let Some(weight) = value.as_f64() {
                                leaf.push((key, weight));
                            }
                        }
                    }
                }

                if deeper.is_some() || skip.is_some() {
                    Ok(ConditionalTree::Branch {
                        deeper: deeper.unwrap_or_default(),
                        skip,
                    })
                } else {
                    Ok(ConditionalTree::Leaf(leaf))
                }
            }
        }

        deserializer.deserialize_map(TreeVisitor)
    }
}
