//! Reader
//!
//! Loads a `DataSet` from delimited text. Numeric tokens are kept as values, empty
//! tokens and `?` are missing, and anything else is coded through the attribute's
//! nominal dictionary.
use crate::data::{DataSet, Point};
use crate::errors::ClassifierError;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Builder reading a delimited file or string into a [`DataSet`].
///
/// ```no_run
/// use classifier_builder::reader::DataSetReader;
///
/// let data = DataSetReader::new()
///     .file("/path/to/iris.csv")
///     .has_header(true)
///     .class_column("species")
///     .read()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DataSetReader {
    file: Option<PathBuf>,
    content: Option<String>,
    has_header: bool,
    class_column: Option<String>,
    separator: u8,
}

impl Default for DataSetReader {
    fn default() -> Self {
        DataSetReader::new()
    }
}

impl DataSetReader {
    pub fn new() -> Self {
        DataSetReader {
            file: None,
            content: None,
            has_header: true,
            class_column: None,
            separator: b',',
        }
    }

    /// Read from a file. Files ending in `.csv` are always comma separated.
    pub fn file<P: AsRef<Path>>(mut self, file: P) -> Self {
        self.file = Some(file.as_ref().to_path_buf());
        self
    }

    /// Read from an in-memory string instead of a file.
    pub fn content(mut self, content: &str) -> Self {
        self.content = Some(content.to_string());
        self
    }

    /// Whether the first row holds the column names. Default is `true`.
    pub fn has_header(mut self, flag: bool) -> Self {
        self.has_header = flag;
        self
    }

    /// Name of the class column. Default is the last column.
    pub fn class_column(mut self, column: &str) -> Self {
        self.class_column = Some(column.to_string());
        self
    }

    /// Separator used when the first line contains neither a comma nor a tab.
    pub fn separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    fn infer_separator(&self, first_line: &str) -> u8 {
        let is_csv = self
            .file
            .as_ref()
            .and_then(|f| f.extension())
            .is_some_and(|ext| ext == "csv");
        if is_csv || first_line.contains(',') {
            b','
        } else if first_line.contains('\t') {
            b'\t'
        } else {
            self.separator
        }
    }

    /// Parse the input. Rows with a different number of columns than the first are
    /// skipped with a warning.
    pub fn read(self) -> Result<DataSet, ClassifierError> {
        let (content, file_name) = match (&self.content, &self.file) {
            (Some(c), _) => (c.clone(), String::new()),
            (None, Some(f)) => (
                fs::read_to_string(f).map_err(|e| ClassifierError::UnableToRead(format!("{}: {}", f.display(), e)))?,
                f.display().to_string(),
            ),
            (None, None) => return Err(ClassifierError::UnableToRead("no file or content set".to_string())),
        };
        let first_line = content.lines().next().unwrap_or("");
        let separator = self.infer_separator(first_line);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(separator)
            .from_reader(content.as_bytes());
        let mut records = reader.records();

        let first = match records.next() {
            Some(r) => r.map_err(|e| ClassifierError::UnableToRead(e.to_string()))?,
            None => return Err(ClassifierError::EmptyDataSet),
        };
        let num_columns = first.len();
        if num_columns < 2 {
            return Err(ClassifierError::InvalidParameter(
                "columns".to_string(),
                "at least one attribute and a class column".to_string(),
                num_columns.to_string(),
            ));
        }

        let class_position = match &self.class_column {
            Some(name) if self.has_header => first.iter().position(|h| h == name.as_str()).ok_or_else(|| {
                ClassifierError::InvalidParameter(
                    "class_column".to_string(),
                    "a column of the header".to_string(),
                    name.clone(),
                )
            })?,
            Some(name) => name.parse::<usize>().map_err(|_| {
                ClassifierError::InvalidParameter(
                    "class_column".to_string(),
                    "a column index when there is no header".to_string(),
                    name.clone(),
                )
            })?,
            None => num_columns - 1,
        };
        if class_position >= num_columns {
            return Err(ClassifierError::InvalidParameter(
                "class_column".to_string(),
                format!("index below {}", num_columns),
                class_position.to_string(),
            ));
        }

        let mut data = DataSet::new();
        data.file = file_name;
        for (i, name) in first.iter().enumerate() {
            if i == class_position {
                if self.has_header {
                    data.class_name = name.to_string();
                }
            } else if self.has_header {
                data.add_attribute(name);
            } else {
                data.add_attribute("");
            }
        }

        let mut pending = Vec::new();
        if !self.has_header {
            pending.push(first);
        }
        let mut skipped = 0;
        for record in pending.into_iter().map(Ok).chain(records) {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    warn!("Skipping unreadable row: {}", e);
                    skipped += 1;
                    continue;
                }
            };
            if record.len() != num_columns {
                if !(record.len() == 1 && record[0].is_empty()) {
                    warn!(
                        "Skipping row with {} columns, expected {}.",
                        record.len(),
                        num_columns
                    );
                    skipped += 1;
                }
                continue;
            }
            let mut values = Vec::with_capacity(num_columns - 1);
            for (i, token) in record.iter().enumerate() {
                if i == class_position {
                    continue;
                }
                let a = values.len();
                values.push(parse_token(&mut data, a, token));
            }
            let class_val = data.class_value_for(&record[class_position]);
            data.add_point(Point::new(values, class_val), None)?;
        }

        if data.is_empty() {
            return Err(ClassifierError::EmptyDataSet);
        }
        info!(
            "Read {} instances with {} attributes and {} classes, skipped {} rows.",
            data.len(),
            data.num_attributes(),
            data.num_classes(),
            skipped
        );
        Ok(data)
    }
}

fn parse_token(data: &mut DataSet, attribute: usize, token: &str) -> Option<f64> {
    let attr = &mut data.attributes[attribute];
    if !attr.is_nominal() {
        if let Ok(v) = token.parse::<f64>() {
            return Some(v);
        }
    }
    if token.is_empty() || token == "?" {
        return None;
    }
    Some(attr.value_from_nominal(token) as f64)
}
