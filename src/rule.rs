//! Rules
//!
//! The tests stored at internal tree nodes and the tri-state membership check
//! used by growth, pruning and classification. A membership result of `None`
//! means the instance is missing a value the rule needs.
use crate::constants::CIRCLE_STRETCH;
use crate::data::{DataSet, Point};
use crate::utils::fmt_vec_output;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A closed interval on one attribute, `None` bounds are open.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisRange {
    pub range_min: Option<f64>,
    pub range_max: Option<f64>,
    pub axis_index: usize,
}

impl AxisRange {
    pub fn new(range_min: Option<f64>, range_max: Option<f64>, axis_index: usize) -> Self {
        AxisRange {
            range_min,
            range_max,
            axis_index,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rectangle(Rectangle),
    Circle(Circle),
}

/// A shape over the raw values of two attributes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionRule {
    pub attributes: [usize; 2],
    pub region: Shape,
}

/// A shape in parallel coordinates: each instance becomes the line joining its
/// normalized values on two vertical axes, and is inside if that line meets the shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PcRegionRule {
    pub attributes: [usize; 2],
    pub region: Shape,
    pub axis_separation: f64,
    pub axis_min: [f64; 2],
    pub axis_max: [f64; 2],
    pub attribute_flipped: [bool; 2],
}

/// `Σ coefficients[i] * x[i] + bias`, negative values are inside.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HyperplaneRule {
    pub coefficients: Vec<f64>,
    pub bias: f64,
}

impl HyperplaneRule {
    /// Signed distance like value of a point, `None` if a weighted value is missing.
    pub fn evaluate(&self, point: &Point) -> Option<f64> {
        let mut total = self.bias;
        for (c, v) in self.coefficients.iter().zip(point.values.iter()) {
            if *c != 0.0 {
                total += c * (*v)?;
            }
        }
        Some(total)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Rule {
    /// Conjunction of ranges.
    Axis(Vec<AxisRange>),
    /// Conjunction of regions.
    Region(Vec<RegionRule>),
    /// Conjunction of parallel coordinate regions.
    PcRegion(Vec<PcRegionRule>),
    Hyperplane(HyperplaneRule),
}

/// Rules from the root to a node, paired with whether the node lies outside each rule.
pub type PathToNode<'a> = Vec<(&'a Rule, bool)>;

/// Test a point against a rule.
pub fn inside_rule(point: &Point, rule: &Rule) -> Option<bool> {
    match rule {
        Rule::Axis(ranges) => {
            for a in ranges {
                let v = point.values[a.axis_index]?;
                if a.range_min.map_or(false, |m| v < m) {
                    return Some(false);
                }
                if a.range_max.map_or(false, |m| v > m) {
                    return Some(false);
                }
            }
        }
        Rule::Region(regions) => {
            for r in regions {
                if !inside_region_rule(point, r)? {
                    return Some(false);
                }
            }
        }
        Rule::PcRegion(regions) => {
            for r in regions {
                if !inside_pc_region_rule(point, r)? {
                    return Some(false);
                }
            }
        }
        Rule::Hyperplane(h) => return h.evaluate(point).map(|v| v < 0.0),
    }
    Some(true)
}

pub fn inside_region_rule(point: &Point, rule: &RegionRule) -> Option<bool> {
    let v1 = point.values[rule.attributes[0]]?;
    let v2 = point.values[rule.attributes[1]]?;
    let inside = match &rule.region {
        Shape::Rectangle(rec) => v1 >= rec.left && v1 <= rec.right && v2 >= rec.bottom && v2 <= rec.top,
        Shape::Circle(cir) => ((v1 - cir.center_x).powi(2) + (v2 - cir.center_y).powi(2)).sqrt() < cir.radius,
    };
    Some(inside)
}

#[inline]
fn normalize(v: f64, min: f64, max: f64) -> f64 {
    if max > min {
        (v - min) / (max - min)
    } else {
        0.0
    }
}

pub fn inside_pc_region_rule(point: &Point, rule: &PcRegionRule) -> Option<bool> {
    let v1 = point.values[rule.attributes[0]]?;
    let v2 = point.values[rule.attributes[1]]?;
    let mut start = (0.0, normalize(v1, rule.axis_min[0], rule.axis_max[0]));
    let mut end = (1.0, normalize(v2, rule.axis_min[1], rule.axis_max[1]));
    if rule.attribute_flipped[0] {
        start.1 = 1.0 - start.1;
    }
    if rule.attribute_flipped[1] {
        end.1 = 1.0 - end.1;
    }
    let inside = match &rule.region {
        Shape::Rectangle(rec) => line_rectangle_intersection((start.0, start.1, end.0, end.1), rec),
        Shape::Circle(cir) => {
            start.1 *= CIRCLE_STRETCH;
            end.0 = 0.5;
            end.1 *= CIRCLE_STRETCH;
            line_circle_intersection((start.0, start.1, end.0, end.1), cir)
        }
    };
    Some(inside)
}

/// Liang-Barsky clipping of the segment `(x0, y0) -> (x1, y1)` against a rectangle.
pub fn line_rectangle_intersection(line: (f64, f64, f64, f64), rectangle: &Rectangle) -> bool {
    let (x0, y0, x1, y1) = line;
    let vx = x1 - x0;
    let vy = y1 - y0;
    let p = [-vx, vx, -vy, vy];
    let q = [
        x0 - rectangle.left,
        rectangle.right - x0,
        y0 - rectangle.bottom,
        rectangle.top - y0,
    ];
    let mut u1: Option<f64> = None;
    let mut u2: Option<f64> = None;

    for i in 0..4 {
        if p[i] == 0.0 {
            if q[i] < 0.0 {
                return false;
            }
        } else {
            let t = q[i] / p[i];
            if u1.is_none() || (p[i] < 0.0 && u1.map_or(false, |u| u < t)) {
                u1 = Some(t);
            } else if u2.is_none() || (p[i] > 0.0 && u2.map_or(false, |u| u > t)) {
                u2 = Some(t);
            }
        }
    }

    match (u1, u2) {
        (Some(u1), Some(u2)) => !(u1 > u2 || u1 > 1.0 || u1 < 0.0),
        _ => false,
    }
}

pub fn line_circle_intersection(line: (f64, f64, f64, f64), circle: &Circle) -> bool {
    let (x0, y0, x1, y1) = line;
    let dx = x1 - x0;
    let dy = y1 - y0;
    let a = dx * dx + dy * dy;
    let b = 2.0 * (dx * (x0 - circle.center_x) + dy * (y0 - circle.center_y));
    let c = (x0 - circle.center_x).powi(2) + (y0 - circle.center_y).powi(2) - circle.radius * circle.radius;
    let det = b * b - 4.0 * a * c;
    a > 0.00000001 && det > 0.0
}

/// Apply a path as a filter. Returns which instances are kept and their weights.
///
/// An instance is dropped once a rule resolves to the opposite of the path's polarity.
/// Instances the rule cannot resolve are kept with their weight scaled by the share of
/// resolved weight that was kept at that rule, so the scaling compounds along the path.
pub fn path_filter(data: &DataSet, path: &[(&Rule, bool)]) -> (Vec<bool>, Vec<Option<f64>>) {
    let n = data.len();
    let mut add = vec![true; n];
    let mut weights = data.weights.clone();
    for (rule, invert) in path {
        let mut num_included = 0.0;
        let mut num_excluded = 0.0;
        let mut with_missing_value: Vec<usize> = Vec::new();
        for i in 0..n {
            if !add[i] {
                continue;
            }
            let w = weights[i].unwrap_or(1.0);
            match inside_rule(&data.instances[i], rule) {
                Some(v) if v == *invert => {
                    add[i] = false;
                    num_excluded += w;
                }
                Some(_) => num_included += w,
                None => with_missing_value.push(i),
            }
        }
        let resolved = num_included + num_excluded;
        if resolved > 0.0 {
            let share = num_included / resolved;
            for i in with_missing_value {
                weights[i] = Some(weights[i].unwrap_or(1.0) * share);
            }
        }
    }
    (add, weights)
}

/// The instances reaching the end of `path`, with fractional weights for the ones
/// routed through unresolved rules.
pub fn inside_rules(data: &DataSet, path: &[(&Rule, bool)]) -> DataSet {
    let (add, weights) = path_filter(data, path);
    let mut result = data.view();
    for (i, w) in weights.into_iter().enumerate() {
        if add[i] {
            result.push_point(data.instances[i].clone(), w);
        }
    }
    result
}

/// Total weight reaching the end of `path`, without building the subset.
pub fn path_weight(data: &DataSet, path: &[(&Rule, bool)]) -> f64 {
    let (add, weights) = path_filter(data, path);
    weights
        .iter()
        .zip(add.iter())
        .filter(|(_, a)| **a)
        .map(|(w, _)| w.unwrap_or(1.0))
        .sum()
}

impl Display for AxisRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(min) = self.range_min {
            write!(f, "{} <= ", min)?;
        }
        write!(f, "x{}", self.axis_index)?;
        if let Some(max) = self.range_max {
            write!(f, " <= {}", max)?;
        }
        Ok(())
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Shape::Rectangle(r) => write!(f, "rect[{}, {}, {}, {}]", r.left, r.top, r.right, r.bottom),
            Shape::Circle(c) => write!(f, "circle[({}, {}), {}]", c.center_x, c.center_y, c.radius),
        }
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rule::Axis(ranges) => {
                let terms: Vec<String> = ranges.iter().map(|r| r.to_string()).collect();
                write!(f, "{}", terms.join(" && "))
            }
            Rule::Region(regions) => {
                let terms: Vec<String> = regions
                    .iter()
                    .map(|r| format!("(x{}, x{}) in {}", r.attributes[0], r.attributes[1], r.region))
                    .collect();
                write!(f, "{}", terms.join(" && "))
            }
            Rule::PcRegion(regions) => {
                let terms: Vec<String> = regions
                    .iter()
                    .map(|r| {
                        format!(
                            "pc(x{}{}, x{}{}) meets {}",
                            r.attributes[0],
                            if r.attribute_flipped[0] { "'" } else { "" },
                            r.attributes[1],
                            if r.attribute_flipped[1] { "'" } else { "" },
                            r.region
                        )
                    })
                    .collect();
                write!(f, "{}", terms.join(" && "))
            }
            Rule::Hyperplane(h) => write!(f, "[{}] . x + {} < 0", fmt_vec_output(&h.coefficients), h.bias),
        }
    }
}
