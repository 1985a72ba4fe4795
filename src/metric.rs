use crate::errors::ClassifierError;
use crate::utils::items_to_strings;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::AddAssign;
use std::str::FromStr;

/// Square matrix of prediction counts, stored row-major as `[predicted][actual]`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConfusionMatrix {
    pub size: usize,
    pub values: Vec<usize>,
}

impl ConfusionMatrix {
    pub fn new(size: usize) -> Self {
        ConfusionMatrix {
            size,
            values: vec![0; size * size],
        }
    }

    /// Build from a flattened `[predicted][actual]` vector. Returns `None` if it is not square.
    pub fn from_values(values: Vec<usize>) -> Option<Self> {
        let size = (values.len() as f64).sqrt().round() as usize;
        if size * size != values.len() {
            return None;
        }
        Some(ConfusionMatrix { size, values })
    }

    #[inline]
    pub fn get(&self, predicted: usize, actual: usize) -> usize {
        self.values[predicted * self.size + actual]
    }

    pub fn add(&mut self, predicted: usize, actual: usize) {
        self.values[predicted * self.size + actual] += 1;
    }

    pub fn num_test_cases(&self) -> usize {
        self.values.iter().sum()
    }

    fn correct(&self, class: usize) -> usize {
        self.get(class, class)
    }

    fn predicted_total(&self, class: usize) -> usize {
        (0..self.size).map(|actual| self.get(class, actual)).sum()
    }

    fn actual_total(&self, class: usize) -> usize {
        (0..self.size).map(|predicted| self.get(predicted, class)).sum()
    }

    fn precision(&self, class: usize) -> f64 {
        match self.predicted_total(class) {
            0 => 1.0,
            total => self.correct(class) as f64 / total as f64,
        }
    }

    fn recall(&self, class: usize) -> f64 {
        match self.actual_total(class) {
            0 => 1.0,
            total => self.correct(class) as f64 / total as f64,
        }
    }

    pub fn accuracy(&self) -> f64 {
        let n = self.num_test_cases();
        if n == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.size).map(|c| self.correct(c)).sum();
        correct as f64 / n as f64
    }

    /// Mean per-class precision. Classes never predicted count as 1.0.
    pub fn macro_precision(&self) -> f64 {
        if self.size == 0 {
            return 1.0;
        }
        (0..self.size).map(|c| self.precision(c)).sum::<f64>() / self.size as f64
    }

    /// Mean per-class recall. Classes never present count as 1.0.
    pub fn macro_recall(&self) -> f64 {
        if self.size == 0 {
            return 1.0;
        }
        (0..self.size).map(|c| self.recall(c)).sum::<f64>() / self.size as f64
    }

    /// Harmonic mean of macro precision and macro recall.
    pub fn macro_f_measure(&self) -> f64 {
        f_measure(self.macro_precision(), self.macro_recall())
    }

    /// Mean of the per-class F-measures.
    pub fn macro_f_measure_v2(&self) -> f64 {
        if self.size == 0 {
            return 1.0;
        }
        (0..self.size)
            .map(|c| f_measure(self.precision(c), self.recall(c)))
            .sum::<f64>()
            / self.size as f64
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Accuracy => self.accuracy(),
            Metric::MacroPrecision => self.macro_precision(),
            Metric::MacroRecall => self.macro_recall(),
            Metric::MacroFMeasure => self.macro_f_measure(),
            Metric::MacroFMeasureV2 => self.macro_f_measure_v2(),
        }
    }
}

impl AddAssign<&ConfusionMatrix> for ConfusionMatrix {
    fn add_assign(&mut self, other: &ConfusionMatrix) {
        if self.size < other.size {
            let mut grown = ConfusionMatrix::new(other.size);
            for p in 0..self.size {
                for a in 0..self.size {
                    grown.values[p * other.size + a] = self.get(p, a);
                }
            }
            *self = grown;
        }
        for p in 0..other.size {
            for a in 0..other.size {
                self.values[p * self.size + a] += other.get(p, a);
            }
        }
    }
}

impl Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in 0..self.size {
            let row: Vec<String> = (0..self.size).map(|a| self.get(p, a).to_string()).collect();
            writeln!(f, "{}", row.join("\t"))?;
        }
        Ok(())
    }
}

fn f_measure(p: f64, r: f64) -> f64 {
    if p + r <= 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Accuracy,
    MacroPrecision,
    MacroRecall,
    MacroFMeasure,
    MacroFMeasureV2,
}

impl FromStr for Metric {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Accuracy" => Ok(Metric::Accuracy),
            "MacroPrecision" => Ok(Metric::MacroPrecision),
            "MacroRecall" => Ok(Metric::MacroRecall),
            "MacroFMeasure" => Ok(Metric::MacroFMeasure),
            "MacroFMeasureV2" => Ok(Metric::MacroFMeasureV2),

            _ => Err(ClassifierError::ParseString(
                s.to_string(),
                "Metric".to_string(),
                items_to_strings(vec![
                    "Accuracy",
                    "MacroPrecision",
                    "MacroRecall",
                    "MacroFMeasure",
                    "MacroFMeasureV2",
                ]),
            )),
        }
    }
}
