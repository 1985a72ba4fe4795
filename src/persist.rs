//! Persistence
//!
//! JSON documents for trees and cross-validation results. A tree is written as one
//! nested object per node, children under `insideChildRule` and `outsideChildRule`.
use crate::cross_validation::FoldResult;
use crate::errors::ClassifierError;
use crate::metric::ConfusionMatrix;
use crate::node::TreeNode;
use crate::rule::Rule;
use crate::tree::tree::{Tree, ROOT};
use hashbrown::HashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Save and load a value as json.
pub trait JsonIO: Serialize + DeserializeOwned + Sized {
    /// Save as a json object to a file.
    ///
    /// * `path` - Path to save to.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ClassifierError> {
        fs::write(path, self.json_dump()?).map_err(|e| ClassifierError::UnableToWrite(e.to_string()))
    }

    fn json_dump(&self) -> Result<String, ClassifierError> {
        serde_json::to_string(self).map_err(|e| ClassifierError::UnableToWrite(e.to_string()))
    }

    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, ClassifierError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| ClassifierError::UnableToRead(e.to_string()))
    }

    /// * `path` - Path to load from.
    fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let json_str = fs::read_to_string(path).map_err(|e| ClassifierError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

/// One node and, nested inside it, its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inside_child_rule: Option<Box<NodeDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outside_child_rule: Option<Box<NodeDocument>>,
    #[serde(default)]
    pub class_val: Option<i64>,
    #[serde(default)]
    pub creation_time: String,
    #[serde(default)]
    pub rule_generated: bool,
    #[serde(default)]
    pub rules: Option<Rule>,
}

impl JsonIO for NodeDocument {}

impl NodeDocument {
    pub fn from_tree(tree: &Tree) -> Self {
        Self::from_node(tree, ROOT)
    }

    fn from_node(tree: &Tree, num: usize) -> Self {
        let fallback;
        let node = match tree.nodes.get(&num) {
            Some(n) => n,
            None => {
                fallback = TreeNode::new(num, None);
                &fallback
            }
        };
        let child = |c: Option<usize>| {
            c.filter(|n| tree.nodes.contains_key(n))
                .map(|n| Box::new(Self::from_node(tree, n)))
        };
        NodeDocument {
            inside_child_rule: child(node.inside),
            outside_child_rule: child(node.outside),
            class_val: node.class_val,
            creation_time: node.creation_time.clone(),
            rule_generated: node.rule_generated,
            rules: node.rule.clone(),
        }
    }

    /// Rebuild the node arena, numbering nodes in depth first order from the root.
    pub fn into_tree(self) -> Tree {
        let mut nodes = HashMap::new();
        let mut stack: Vec<(NodeDocument, Option<usize>, usize)> = vec![(self, None, ROOT)];
        let mut next = ROOT + 1;
        while let Some((doc, parent, num)) = stack.pop() {
            let mut node = TreeNode::new(num, parent);
            node.class_val = doc.class_val;
            node.creation_time = doc.creation_time;
            node.rule_generated = doc.rule_generated;
            node.rule = doc.rules;
            if let (Some(inside), Some(outside)) = (doc.inside_child_rule, doc.outside_child_rule) {
                node.inside = Some(next);
                node.outside = Some(next + 1);
                stack.push((*outside, Some(num), next + 1));
                stack.push((*inside, Some(num), next));
                next += 2;
            }
            nodes.insert(num, node);
        }
        Tree::from_nodes(nodes)
    }
}

/// Write a tree as a nested json document.
pub fn save_tree<P: AsRef<Path>>(tree: &Tree, path: P) -> Result<(), ClassifierError> {
    NodeDocument::from_tree(tree).save(path)
}

pub fn load_tree<P: AsRef<Path>>(path: P) -> Result<Tree, ClassifierError> {
    Ok(NodeDocument::load(path)?.into_tree())
}

/// A fold result with its confusion matrix flattened `[predicted][actual]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldDocument {
    pub confusion_matrix: Vec<usize>,
    pub tree: NodeDocument,
}

impl JsonIO for FoldDocument {}

impl From<&FoldResult> for FoldDocument {
    fn from(result: &FoldResult) -> Self {
        FoldDocument {
            confusion_matrix: result.confusion.values.clone(),
            tree: NodeDocument::from_tree(&result.tree),
        }
    }
}

impl TryFrom<FoldDocument> for FoldResult {
    type Error = ClassifierError;

    fn try_from(doc: FoldDocument) -> Result<Self, Self::Error> {
        let n = doc.confusion_matrix.len();
        let confusion = ConfusionMatrix::from_values(doc.confusion_matrix)
            .ok_or_else(|| ClassifierError::UnableToRead(format!("confusion matrix of {} values is not square", n)))?;
        Ok(FoldResult {
            confusion,
            tree: doc.tree.into_tree(),
        })
    }
}

/// Write fold results as a json array of fold documents.
pub fn save_fold_results<P: AsRef<Path>>(results: &[FoldResult], path: P) -> Result<(), ClassifierError> {
    let docs: Vec<FoldDocument> = results.iter().map(FoldDocument::from).collect();
    docs.save(path)
}

pub fn load_fold_results<P: AsRef<Path>>(path: P) -> Result<Vec<FoldResult>, ClassifierError> {
    Vec::<FoldDocument>::load(path)?
        .into_iter()
        .map(FoldResult::try_from)
        .collect()
}

impl<T: Serialize + DeserializeOwned> JsonIO for Vec<T> {}
