//! Data
//!
//! The weighted instance model shared by every split strategy: attributes with running
//! ranges or nominal dictionaries, points with optional (missing) values, and the
//! `DataSet` that owns points together with their optional weights.
use crate::errors::ClassifierError;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display};

/// A single input column.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    /// Smallest non-missing value seen in the owning dataset.
    pub min: Option<f64>,
    /// Largest non-missing value seen in the owning dataset.
    pub max: Option<f64>,
    /// Codes assigned to nominal tokens, `None` for numeric attributes.
    pub nominal_values: Option<HashMap<String, usize>>,
}

impl Attribute {
    pub fn new(name: &str) -> Self {
        Attribute {
            name: name.to_string(),
            min: None,
            max: None,
            nominal_values: None,
        }
    }

    /// Get the code of a nominal token, assigning the next free code on first sight.
    pub fn value_from_nominal(&mut self, nominal: &str) -> usize {
        let dict = self.nominal_values.get_or_insert_with(HashMap::new);
        if let Some(v) = dict.get(nominal) {
            return *v;
        }
        let v = dict.len();
        dict.insert(nominal.to_string(), v);
        v
    }

    pub fn is_nominal(&self) -> bool {
        self.nominal_values.is_some()
    }

    /// The `(min, max)` range, if the attribute has seen at least one value.
    pub fn range(&self) -> Option<(f64, f64)> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }

    /// The range, only if it is not degenerate, so it can be used for normalization.
    pub fn spread(&self) -> Option<(f64, f64)> {
        self.range().filter(|(min, max)| max > min)
    }

    fn update_range(&mut self, v: f64) {
        if self.min.map_or(true, |m| m > v) {
            self.min = Some(v);
        }
        if self.max.map_or(true, |m| m < v) {
            self.max = Some(v);
        }
    }
}

/// A single instance. `None` values are missing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub values: Vec<Option<f64>>,
    /// Raw class label.
    pub class_val: i64,
    /// Position of `class_val` in the owning dataset's class list.
    pub class_index: usize,
}

impl Point {
    pub fn new(values: Vec<Option<f64>>, class_val: i64) -> Self {
        Point {
            values,
            class_val,
            class_index: 0,
        }
    }

    /// Convenience constructor for fully observed points.
    pub fn from_values(values: &[f64], class_val: i64) -> Self {
        Point::new(values.iter().map(|v| Some(*v)).collect(), class_val)
    }

    #[inline]
    pub fn value(&self, attribute: usize) -> Option<f64> {
        self.values[attribute]
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let values: Vec<String> = self
            .values
            .iter()
            .map(|v| v.map_or_else(|| "?".to_string(), |x| x.to_string()))
            .collect();
        write!(f, "[{}]-{}", values.join(", "), self.class_val)
    }
}

/// A class discovered in the data, in first-seen order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabel {
    pub value: i64,
    pub name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DataSet {
    pub instances: Vec<Point>,
    /// One entry per instance, `None` means a weight of 1.0.
    pub weights: Vec<Option<f64>>,
    pub classes: Vec<ClassLabel>,
    pub class_name: String,
    pub attributes: Vec<Attribute>,
    pub file: String,
}

impl DataSet {
    pub fn new() -> Self {
        DataSet::default()
    }

    /// Create an empty dataset with the given attribute names.
    pub fn with_attributes(names: &[&str]) -> Self {
        let mut data = DataSet::new();
        for name in names {
            data.add_attribute(name);
        }
        data
    }

    /// A dataset sharing this schema and class list, but holding no instances.
    /// Attribute ranges start empty and follow the points added to the view.
    pub fn view(&self) -> Self {
        DataSet {
            instances: Vec::new(),
            weights: Vec::new(),
            classes: self.classes.clone(),
            class_name: self.class_name.clone(),
            attributes: self
                .attributes
                .iter()
                .map(|a| Attribute {
                    name: a.name.clone(),
                    min: None,
                    max: None,
                    nominal_values: a.nominal_values.clone(),
                })
                .collect(),
            file: self.file.clone(),
        }
    }

    pub fn add_attribute(&mut self, name: &str) {
        self.attributes.push(Attribute::new(name));
    }

    #[inline]
    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    #[inline]
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Weight of the ith instance.
    #[inline]
    pub fn weight(&self, i: usize) -> f64 {
        self.weights[i].unwrap_or(1.0)
    }

    pub fn sum_of_weights(&self) -> f64 {
        self.weights.iter().map(|w| w.unwrap_or(1.0)).sum()
    }

    /// Add a point, updating the attribute ranges and resolving its class index.
    ///
    /// * `point` - Point with exactly one value per attribute.
    /// * `weight` - Optional instance weight, `None` counts as 1.0.
    pub fn add_point(&mut self, point: Point, weight: Option<f64>) -> Result<(), ClassifierError> {
        if point.values.len() != self.num_attributes() {
            return Err(ClassifierError::DimensionMismatch(
                point.values.len(),
                self.num_attributes(),
            ));
        }
        self.push_point(point, weight);
        Ok(())
    }

    /// Add a point already known to match this schema.
    pub(crate) fn push_point(&mut self, mut point: Point, weight: Option<f64>) {
        for (attribute, value) in self.attributes.iter_mut().zip(point.values.iter()) {
            if let Some(v) = value {
                attribute.update_range(*v);
            }
        }
        point.class_index = match self.class_index(point.class_val) {
            Some(ci) => ci,
            None => {
                self.classes.push(ClassLabel {
                    value: point.class_val,
                    name: point.class_val.to_string(),
                });
                self.classes.len() - 1
            }
        };
        self.instances.push(point);
        self.weights.push(weight);
    }

    /// Resolve a class name to its class value, registering new classes.
    /// Integer names keep their value, other names get the next unused code.
    pub fn class_value_for(&mut self, name: &str) -> i64 {
        if let Some(c) = self.classes.iter().find(|c| c.name == name) {
            return c.value;
        }
        let value = match name.trim().parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                let mut v = self.classes.len() as i64;
                while self.class_index(v).is_some() {
                    v += 1;
                }
                v
            }
        };
        self.classes.push(ClassLabel {
            value,
            name: name.to_string(),
        });
        value
    }

    pub fn class_index(&self, value: i64) -> Option<usize> {
        self.classes.iter().position(|c| c.value == value)
    }

    /// Stable sort on an attribute, missing values last.
    /// Weights are kept aligned with their instances.
    ///
    /// Returns the number of instances with a missing value for the attribute.
    pub fn sort_on_attribute(&mut self, attribute: usize) -> usize {
        let instances = std::mem::take(&mut self.instances);
        let weights = std::mem::take(&mut self.weights);
        let mut paired: Vec<(Point, Option<f64>)> = instances.into_iter().zip(weights).collect();
        paired.sort_by(|(p1, _), (p2, _)| match (p1.values[attribute], p2.values[attribute]) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.total_cmp(&b),
        });
        let (instances, weights) = paired.into_iter().unzip();
        self.instances = instances;
        self.weights = weights;
        self.instances
            .iter()
            .rev()
            .take_while(|p| p.values[attribute].is_none())
            .count()
    }

    /// Total weight per class, indexed like `classes`.
    pub fn distribution(&self) -> Vec<f64> {
        let mut dist = vec![0.0; self.num_classes()];
        for (i, p) in self.instances.iter().enumerate() {
            dist[p.class_index] += self.weight(i);
        }
        dist
    }

    /// The class with the largest total weight, along with the per-class weights.
    /// Ties go to the class seen first, and `None` is returned when nothing has weight.
    pub fn most_frequent(&self) -> Option<(i64, Vec<f64>)> {
        let dist = self.distribution();
        let mut best: Option<(usize, f64)> = None;
        for (c, w) in dist.iter().enumerate() {
            if *w > best.map_or(0.0, |(_, bw)| bw) {
                best = Some((c, *w));
            }
        }
        best.map(|(c, _)| (self.classes[c].value, dist))
    }

    pub fn clear_attribute_ranges(&mut self) {
        for a in self.attributes.iter_mut() {
            a.min = None;
            a.max = None;
        }
    }

    /// Replace missing values by the weighted attribute mean, or by the most
    /// frequent code for nominal attributes. Attributes without any value are left as is.
    pub fn impute_means(&mut self) {
        for a in 0..self.num_attributes() {
            let fill = if self.attributes[a].is_nominal() {
                let mut counts: HashMap<i64, f64> = HashMap::new();
                for (i, p) in self.instances.iter().enumerate() {
                    if let Some(v) = p.values[a] {
                        *counts.entry(v as i64).or_insert(0.0) += self.weight(i);
                    }
                }
                counts
                    .into_iter()
                    .max_by(|x, y| x.1.total_cmp(&y.1).then(y.0.cmp(&x.0)))
                    .map(|(code, _)| code as f64)
            } else {
                let (sum, total) = self
                    .instances
                    .iter()
                    .enumerate()
                    .filter_map(|(i, p)| p.values[a].map(|v| (v * self.weight(i), self.weight(i))))
                    .fold((0.0, 0.0), |acc, x| (acc.0 + x.0, acc.1 + x.1));
                if total > 0.0 {
                    Some(sum / total)
                } else {
                    None
                }
            };
            if let Some(v) = fill {
                for p in self.instances.iter_mut() {
                    if p.values[a].is_none() {
                        p.values[a] = Some(v);
                    }
                }
                self.attributes[a].update_range(v);
            }
        }
    }

    /// Render as comma separated rows with two decimals, `?` for missing values
    /// and the class value last.
    pub fn to_csv_string(&self) -> String {
        let mut s = String::new();
        for p in self.instances.iter() {
            for v in p.values.iter() {
                match v {
                    Some(x) => s.push_str(&format!("{:.2},", x)),
                    None => s.push_str("?,"),
                }
            }
            s.push_str(&format!("{}\n", p.class_val));
        }
        s
    }
}
