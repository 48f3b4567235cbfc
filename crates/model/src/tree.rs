//! Classification tree structures
//!
//! Provides integer-only tree nodes and traversal. Thresholds are fixed-point
//! values at `FEATURE_SCALE` precision and leaves hold class codes.

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes:
/// - `feature_idx >= 0`: index into the fixed-point feature vector
/// - `left` and `right` point to child node indices
/// - `leaf` is `None`
///
/// For leaf nodes:
/// - `feature_idx == -1`
/// - `leaf` contains the predicted class code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    /// Node ID (position in the tree's node list)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    pub feature_idx: i32,

    /// Split threshold; values `<= threshold` go left
    pub threshold: i64,

    /// Class code for leaf nodes
    pub leaf: Option<u32>,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: i64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, class: u32) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0,
            leaf: Some(class),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single classification tree (node 0 is the root)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Walk the tree and return the class code of the reached leaf.
    ///
    /// Returns `None` for malformed trees (dangling child index, feature index
    /// past the input) instead of panicking.
    pub fn evaluate(&self, features: &[i64]) -> Option<u32> {
        let mut idx = 0usize;

        // A well-formed tree reaches a leaf in at most `nodes.len()` steps
        for _ in 0..=self.nodes.len() {
            let node = self.nodes.get(idx)?;

            if node.is_leaf() {
                return node.leaf;
            }

            let value = *features.get(usize::try_from(node.feature_idx).ok()?)?;
            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            idx = usize::try_from(next).ok()?;
        }

        None
    }

    /// Number of edges on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize, remaining: usize) -> usize {
            match nodes.get(idx) {
                Some(node) if !node.is_leaf() && remaining > 0 => {
                    let left = walk(nodes, node.left as usize, remaining - 1);
                    let right = walk(nodes, node.right as usize, remaining - 1);
                    1 + left.max(right)
                }
                _ => 0,
            }
        }

        walk(&self.nodes, 0, self.nodes.len())
    }

    /// Number of leaf nodes
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Validate tree structure against the model's feature and class counts
    pub fn validate(&self, feature_count: usize, class_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                match node.leaf {
                    None => return Err(format!("Leaf node {i} has no class")),
                    Some(class) if class as usize >= class_count => {
                        return Err(format!(
                            "Leaf node {i} has class {class} but model has {class_count} classes"
                        ));
                    }
                    Some(_) => {}
                }
                continue;
            }

            // Children must come after their parent, which also rules out cycles
            if node.left <= i as i32 || node.left as usize >= self.nodes.len() {
                return Err(format!("Node {} has invalid left child: {}", i, node.left));
            }
            if node.right <= i as i32 || node.right as usize >= self.nodes.len() {
                return Err(format!("Node {} has invalid right child: {}", i, node.right));
            }
            if node.feature_idx < 0 || node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "Internal node {} has invalid feature index: {}",
                    i, node.feature_idx
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> Tree {
        // if feature[0] <= 50 then class 0 else class 1
        Tree::new(vec![
            Node::internal(0, 0, 50, 1, 2),
            Node::leaf(1, 0),
            Node::leaf(2, 1),
        ])
    }

    #[test]
    fn test_node_creation() {
        let internal = Node::internal(0, 3, 12345, 1, 2);
        assert_eq!(internal.feature_idx, 3);
        assert_eq!(internal.threshold, 12345);
        assert!(!internal.is_leaf());

        let leaf = Node::leaf(1, 4);
        assert_eq!(leaf.feature_idx, -1);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.leaf, Some(4));
    }

    #[test]
    fn test_tree_evaluation() {
        let tree = stump();
        assert_eq!(tree.evaluate(&[30]), Some(0));
        assert_eq!(tree.evaluate(&[50]), Some(0)); // equal goes left
        assert_eq!(tree.evaluate(&[60]), Some(1));
    }

    #[test]
    fn test_malformed_tree_evaluates_to_none() {
        let dangling = Tree::new(vec![Node::internal(0, 0, 50, 7, 2), Node::leaf(1, 0)]);
        assert_eq!(dangling.evaluate(&[10]), None);

        // feature index past the input
        let wide = Tree::new(vec![
            Node::internal(0, 4, 50, 1, 2),
            Node::leaf(1, 0),
            Node::leaf(2, 1),
        ]);
        assert_eq!(wide.evaluate(&[10]), None);

        // self-loop must terminate
        let looped = Tree::new(vec![Node::internal(0, 0, 50, 0, 0)]);
        assert_eq!(looped.evaluate(&[10]), None);

        assert_eq!(Tree::new(vec![]).evaluate(&[10]), None);
    }

    #[test]
    fn test_tree_validation() {
        assert!(stump().validate(1, 2).is_ok());

        // class code past the class list
        assert!(stump().validate(1, 1).is_err());

        // feature index past the feature count
        assert!(stump().validate(0, 2).is_err());

        let invalid = Tree::new(vec![
            Node::internal(0, 0, 50, 5, 2),
            Node::leaf(1, 0),
            Node::leaf(2, 1),
        ]);
        assert!(invalid.validate(1, 2).is_err());

        let backwards = Tree::new(vec![Node::internal(0, 0, 50, 0, 1), Node::leaf(1, 0)]);
        assert!(backwards.validate(1, 2).is_err());
    }

    #[test]
    fn test_depth_and_leaves() {
        assert_eq!(stump().depth(), 1);
        assert_eq!(stump().leaf_count(), 2);
        assert_eq!(Tree::new(vec![Node::leaf(0, 0)]).depth(), 0);
    }
}
