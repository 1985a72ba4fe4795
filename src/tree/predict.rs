use super::tree::{Tree, ROOT};
use crate::data::{DataSet, Point};
use crate::rule::{inside_rule, inside_rules, path_weight, PathToNode};
use rayon::prelude::*;

impl Tree {
    /// Class probabilities of `point`, indexed like `training.classes`.
    ///
    /// When the point is missing a value a rule needs, both branches are followed and
    /// combined by the share of training weight each one receives.
    ///
    /// * `point` - Instance to classify.
    /// * `training` - Data the tree was grown on, used for branch weights and
    ///   unfinished leaves.
    pub fn predict_proba(&self, point: &Point, training: &DataSet) -> Vec<f64> {
        let mut path = Vec::new();
        self.node_proba(ROOT, point, training, &mut path)
    }

    fn node_proba<'a>(
        &'a self,
        num: usize,
        point: &Point,
        training: &DataSet,
        path: &mut PathToNode<'a>,
    ) -> Vec<f64> {
        let mut probabilities = vec![0.0; training.num_classes()];
        let node = match self.nodes.get(&num) {
            Some(n) => n,
            None => return probabilities,
        };
        let (rule, inside, outside) = match (&node.rule, node.inside, node.outside) {
            (Some(r), Some(i), Some(o)) => (r, i, o),
            _ => {
                let class_val = match node.class_val {
                    Some(c) => Some(c),
                    None => inside_rules(training, path).most_frequent().map(|(c, _)| c),
                };
                if let Some(ci) = class_val.and_then(|c| training.class_index(c)) {
                    probabilities[ci] = 1.0;
                }
                return probabilities;
            }
        };

        match inside_rule(point, rule) {
            Some(is_inside) => {
                let child = if is_inside { inside } else { outside };
                path.push((rule, !is_inside));
                let p = self.node_proba(child, point, training, path);
                path.pop();
                p
            }
            None => {
                path.push((rule, false));
                let p1 = self.node_proba(inside, point, training, path);
                let inside_weight = path_weight(training, path);
                path.pop();
                path.push((rule, true));
                let p2 = self.node_proba(outside, point, training, path);
                let outside_weight = path_weight(training, path);
                path.pop();

                let total = inside_weight + outside_weight;
                let (s1, s2) = if total > 0.0 {
                    (inside_weight / total, outside_weight / total)
                } else {
                    (0.5, 0.5)
                };
                for (c, p) in probabilities.iter_mut().enumerate() {
                    *p = p1[c] * s1 + p2[c] * s2;
                }
                probabilities
            }
        }
    }

    /// The most probable class, ties go to the class seen first in the training data.
    /// `None` when no class has any probability.
    pub fn predict_point(&self, point: &Point, training: &DataSet) -> Option<i64> {
        let probabilities = self.predict_proba(point, training);
        let mut best: Option<(usize, f64)> = None;
        for (c, p) in probabilities.iter().enumerate() {
            if *p > best.map_or(0.0, |(_, bp)| bp) {
                best = Some((c, *p));
            }
        }
        best.map(|(c, _)| training.classes[c].value)
    }

    /// Predict every instance of `data` in parallel.
    pub fn predict(&self, data: &DataSet, training: &DataSet) -> Vec<Option<i64>> {
        data.instances
            .par_iter()
            .map(|p| self.predict_point(p, training))
            .collect()
    }
}
