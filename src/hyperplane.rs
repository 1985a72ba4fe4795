//! Hyperplane Trees
//!
//! Boundary to external oblique tree inducers (OC1 style). The engine receives a dense
//! matrix with no missing values and returns a binary tree of hyperplane tests, which
//! is converted into a [`Tree`] with [`Rule::Hyperplane`] rules.
use crate::data::DataSet;
use crate::errors::ClassifierError;
use crate::node::TreeNode;
use crate::rule::{HyperplaneRule, Rule};
use crate::tree::tree::{Tree, ROOT};
use hashbrown::HashMap;
use log::info;

/// Dense training data for an external engine.
///
/// Each row is `[category, x0, x1, ...]`. Categories are class indices counted from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    pub rows: Vec<Vec<f64>>,
    pub categories: Vec<usize>,
}

/// Build the dense matrix of `data`, failing on the first missing value.
pub fn dense_matrix(data: &DataSet) -> Result<DenseMatrix, ClassifierError> {
    let mut rows = Vec::with_capacity(data.len());
    let mut categories = Vec::with_capacity(data.len());
    for (i, p) in data.instances.iter().enumerate() {
        let category = p.class_index + 1;
        let mut row = Vec::with_capacity(p.values.len() + 1);
        row.push(category as f64);
        for (a, v) in p.values.iter().enumerate() {
            row.push(v.ok_or(ClassifierError::MissingValue(i, a))?);
        }
        rows.push(row);
        categories.push(category);
    }
    Ok(DenseMatrix { rows, categories })
}

/// Tree returned by an external engine. Instances with `coefficients . x + bias < 0`
/// go left.
#[derive(Debug, Clone, PartialEq)]
pub enum HyperplaneNode {
    Leaf {
        category: usize,
    },
    Split {
        coefficients: Vec<f64>,
        bias: f64,
        left: Box<HyperplaneNode>,
        right: Box<HyperplaneNode>,
    },
}

/// Convert an engine tree. Left children become inside children, leaf categories are
/// mapped back to the class values of `data`.
pub fn tree_from_hyperplanes(root: &HyperplaneNode, data: &DataSet) -> Result<Tree, ClassifierError> {
    let mut nodes = HashMap::new();
    let mut stack: Vec<(&HyperplaneNode, Option<usize>, usize)> = vec![(root, None, ROOT)];
    let mut next = ROOT + 1;
    while let Some((h, parent, num)) = stack.pop() {
        let mut node = TreeNode::new(num, parent);
        match h {
            HyperplaneNode::Leaf { category } => {
                let class = category
                    .checked_sub(1)
                    .and_then(|c| data.classes.get(c))
                    .ok_or_else(|| {
                        ClassifierError::InvalidParameter(
                            "category".to_string(),
                            format!("a value from 1 to {}", data.num_classes()),
                            category.to_string(),
                        )
                    })?;
                node.class_val = Some(class.value);
            }
            HyperplaneNode::Split {
                coefficients,
                bias,
                left,
                right,
            } => {
                if coefficients.len() != data.num_attributes() {
                    return Err(ClassifierError::DimensionMismatch(
                        coefficients.len(),
                        data.num_attributes(),
                    ));
                }
                node.rule = Some(Rule::Hyperplane(HyperplaneRule {
                    coefficients: coefficients.clone(),
                    bias: *bias,
                }));
                node.rule_generated = true;
                node.inside = Some(next);
                node.outside = Some(next + 1);
                stack.push((right.as_ref(), Some(num), next + 1));
                stack.push((left.as_ref(), Some(num), next));
                next += 2;
            }
        }
        nodes.insert(num, node);
    }
    Ok(Tree::from_nodes(nodes))
}

/// An external inducer of hyperplane trees.
pub trait HyperplaneEngine {
    fn induce(&self, matrix: &DenseMatrix, num_attributes: usize) -> Result<HyperplaneNode, ClassifierError>;

    /// Grow a tree on `data`, which must not contain missing values.
    fn grow(&self, data: &DataSet) -> Result<Tree, ClassifierError> {
        if data.is_empty() {
            return Err(ClassifierError::EmptyDataSet);
        }
        let matrix = dense_matrix(data)?;
        let root = self.induce(&matrix, data.num_attributes())?;
        let tree = tree_from_hyperplanes(&root, data)?;
        info!("Converted hyperplane tree with {} nodes.", tree.size());
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Point;

    /// Splits on `x0 < mean(x0)` and labels each side with its majority category.
    struct MeanStump;

    impl HyperplaneEngine for MeanStump {
        fn induce(&self, matrix: &DenseMatrix, num_attributes: usize) -> Result<HyperplaneNode, ClassifierError> {
            let mean = matrix.rows.iter().map(|r| r[1]).sum::<f64>() / matrix.rows.len() as f64;
            let majority = |left: bool| {
                let mut counts: HashMap<usize, usize> = HashMap::new();
                for r in matrix.rows.iter().filter(|r| (r[1] < mean) == left) {
                    *counts.entry(r[0] as usize).or_insert(0) += 1;
                }
                counts.into_iter().max_by_key(|(c, n)| (*n, usize::MAX - c)).map_or(1, |(c, _)| c)
            };
            let mut coefficients = vec![0.0; num_attributes];
            coefficients[0] = 1.0;
            Ok(HyperplaneNode::Split {
                coefficients,
                bias: -mean,
                left: Box::new(HyperplaneNode::Leaf { category: majority(true) }),
                right: Box::new(HyperplaneNode::Leaf { category: majority(false) }),
            })
        }
    }

    fn data() -> DataSet {
        let mut data = DataSet::with_attributes(&["x", "y"]);
        for (x, y, c) in [(0.1, 0.5, 7), (0.2, 0.1, 7), (0.8, 0.3, 3), (0.9, 0.9, 3)] {
            data.add_point(Point::from_values(&[x, y], c), None).unwrap();
        }
        data
    }

    #[test]
    fn test_dense_matrix() {
        let m = dense_matrix(&data()).unwrap();
        assert_eq!(m.rows[0], vec![1.0, 0.1, 0.5]);
        assert_eq!(m.rows[2], vec![2.0, 0.8, 0.3]);
        assert_eq!(m.categories, vec![1, 1, 2, 2]);
    }

    #[test]
    fn test_dense_matrix_rejects_missing() {
        let mut d = data();
        d.add_point(Point::new(vec![Some(0.5), None], 3), None).unwrap();
        assert!(matches!(dense_matrix(&d), Err(ClassifierError::MissingValue(4, 1))));
    }

    #[test]
    fn test_engine_tree_predicts() {
        let d = data();
        let tree = MeanStump.grow(&d).unwrap();
        assert_eq!(tree.size(), 3);
        assert!(tree.is_well_formed());
        let inside = &tree.nodes[&tree.root().unwrap().inside.unwrap()];
        assert_eq!(inside.class_val, Some(7));
        for p in d.instances.iter() {
            assert_eq!(tree.predict_point(p, &d), Some(p.class_val));
        }
    }

    #[test]
    fn test_conversion_errors() {
        let d = data();
        let bad_category = HyperplaneNode::Leaf { category: 0 };
        assert!(tree_from_hyperplanes(&bad_category, &d).is_err());
        let bad_width = HyperplaneNode::Split {
            coefficients: vec![1.0],
            bias: 0.0,
            left: Box::new(HyperplaneNode::Leaf { category: 1 }),
            right: Box::new(HyperplaneNode::Leaf { category: 2 }),
        };
        assert!(matches!(
            tree_from_hyperplanes(&bad_width, &d),
            Err(ClassifierError::DimensionMismatch(1, 2))
        ));
    }
}
