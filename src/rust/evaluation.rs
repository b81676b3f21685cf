//! Held-out evaluation: overall accuracy and per-category reports.

use std::fmt;
use std::io::{self, Write};

use ndarray::{ArrayView1, ArrayView2};

use crate::error::{Result, TrainError};
use crate::pipeline::FittedGridSearch;

const REPORT_DIGITS: usize = 2;
const LONGEST_AVERAGE_HEADING: &str = "weighted avg";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelMetrics {
    pub label: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Precision, recall, F1 and support for each label present in either the
/// truth or the predictions of one category.
///
/// A ratio with a zero denominator is reported as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub labels: Vec<LabelMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

impl ClassificationReport {
    pub fn compute(truth: ArrayView1<'_, u8>, predicted: ArrayView1<'_, u8>) -> Result<Self> {
        if truth.len() != predicted.len() {
            return Err(TrainError::InvalidArgument(format!(
                "{} true labels but {} predictions",
                truth.len(),
                predicted.len()
            )));
        }

        let mut present: Vec<u8> = truth.iter().chain(predicted.iter()).copied().collect();
        present.sort_unstable();
        present.dedup();

        let labels: Vec<LabelMetrics> = present
            .into_iter()
            .map(|label| {
                let mut true_positive = 0;
                let mut predicted_count = 0;
                let mut support = 0;
                for (&t, &p) in truth.iter().zip(predicted.iter()) {
                    if p == label {
                        predicted_count += 1;
                        if t == label {
                            true_positive += 1;
                        }
                    }
                    if t == label {
                        support += 1;
                    }
                }
                let precision = ratio(true_positive, predicted_count);
                let recall = ratio(true_positive, support);
                LabelMetrics {
                    label,
                    precision,
                    recall,
                    f1_score: f1(precision, recall),
                    support,
                }
            })
            .collect();

        let total = truth.len();
        let correct = truth.iter().zip(predicted.iter()).filter(|(t, p)| t == p).count();
        let n_labels = labels.len().max(1) as f64;
        let macro_avg = AverageMetrics {
            precision: labels.iter().map(|m| m.precision).sum::<f64>() / n_labels,
            recall: labels.iter().map(|m| m.recall).sum::<f64>() / n_labels,
            f1_score: labels.iter().map(|m| m.f1_score).sum::<f64>() / n_labels,
            support: total,
        };
        let weight = |m: &LabelMetrics| ratio(m.support, total);
        let weighted_avg = AverageMetrics {
            precision: labels.iter().map(|m| m.precision * weight(m)).sum(),
            recall: labels.iter().map(|m| m.recall * weight(m)).sum(),
            f1_score: labels.iter().map(|m| m.f1_score * weight(m)).sum(),
            support: total,
        };

        Ok(Self {
            labels,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = REPORT_DIGITS;
        let width = LONGEST_AVERAGE_HEADING.len().max(d);

        writeln!(
            f,
            "{:>w$}  {:>9} {:>9} {:>9} {:>9}",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            w = width
        )?;
        writeln!(f)?;
        for m in &self.labels {
            writeln!(
                f,
                "{:>w$}  {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                m.label,
                m.precision,
                m.recall,
                m.f1_score,
                m.support,
                w = width,
                d = d
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>w$}  {:>9} {:>9} {:>9.d$} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.macro_avg.support,
            w = width,
            d = d
        )?;
        for (heading, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>w$}  {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                heading,
                avg.precision,
                avg.recall,
                avg.f1_score,
                avg.support,
                w = width,
                d = d
            )?;
        }
        Ok(())
    }
}

/// Accuracy over every cell plus one report per category
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub accuracy: f64,
    pub reports: Vec<(String, ClassificationReport)>,
}

impl Evaluation {
    pub fn compute(
        truth: ArrayView2<'_, u8>,
        predicted: ArrayView2<'_, u8>,
        category_names: &[String],
    ) -> Result<Self> {
        if truth.dim() != predicted.dim() {
            return Err(TrainError::InvalidArgument(format!(
                "targets have shape {:?} but predictions have shape {:?}",
                truth.dim(),
                predicted.dim()
            )));
        }
        if truth.ncols() != category_names.len() {
            return Err(TrainError::InvalidArgument(format!(
                "{} target columns but {} category names",
                truth.ncols(),
                category_names.len()
            )));
        }

        let cells = truth.len();
        let matching = truth.iter().zip(predicted.iter()).filter(|(t, p)| t == p).count();
        let accuracy = ratio(matching, cells);

        let mut reports = Vec::with_capacity(category_names.len());
        for (j, name) in category_names.iter().enumerate() {
            let report = ClassificationReport::compute(truth.column(j), predicted.column(j))?;
            reports.push((name.clone(), report));
        }

        Ok(Self { accuracy, reports })
    }

    /// Predicts `x_test` with the fitted search and scores it against `y_test`
    pub fn from_model(
        model: &FittedGridSearch,
        x_test: &[String],
        y_test: ArrayView2<'_, u8>,
        category_names: &[String],
    ) -> Result<Self> {
        if x_test.len() != y_test.nrows() {
            return Err(TrainError::InvalidArgument(format!(
                "{} test messages but {} target rows",
                x_test.len(),
                y_test.nrows()
            )));
        }
        let predicted = model.predict(x_test)?;
        Self::compute(y_test, predicted.view(), category_names)
    }

    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "accuracy = {}", self.accuracy)?;
        for (name, report) in &self.reports {
            writeln!(out, "Class:  {}", name)?;
            writeln!(out, "{}", report)?;
        }
        Ok(())
    }
}

/// Predicts `x_test` with the fitted search and writes the evaluation to `out`
pub fn write_evaluation(
    out: &mut impl Write,
    model: &FittedGridSearch,
    x_test: &[String],
    y_test: ArrayView2<'_, u8>,
    category_names: &[String],
) -> Result<Evaluation> {
    let evaluation = Evaluation::from_model(model, x_test, y_test, category_names)?;
    evaluation.write_to(out)?;
    Ok(evaluation)
}

/// Same as [`write_evaluation`], printing to standard output
pub fn evaluate_model(
    model: &FittedGridSearch,
    x_test: &[String],
    y_test: ArrayView2<'_, u8>,
    category_names: &[String],
) -> Result<Evaluation> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_evaluation(&mut out, model, x_test, y_test, category_names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_binary_report() {
        let truth = array![1u8, 1, 0, 0, 0];
        let pred = array![1u8, 0, 0, 0, 1];
        let report = ClassificationReport::compute(truth.view(), pred.view()).unwrap();

        assert_eq!(report.labels.len(), 2);
        let zero = report.labels[0];
        assert_eq!(zero.support, 3);
        assert!((zero.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((zero.recall - 2.0 / 3.0).abs() < 1e-12);
        let one = report.labels[1];
        assert!((one.precision - 0.5).abs() < 1e-12);
        assert!((report.accuracy - 0.6).abs() < 1e-12);
        assert!((report.weighted_avg.recall - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_is_zero() {
        let truth = array![1u8, 0];
        let pred = array![0u8, 0];
        let report = ClassificationReport::compute(truth.view(), pred.view()).unwrap();
        let one = report.labels[1];
        assert_eq!(one.label, 1);
        assert_eq!(one.precision, 0.0);
        assert_eq!(one.f1_score, 0.0);
    }

    #[test]
    fn test_only_present_labels_reported() {
        let truth = array![0u8, 0, 0];
        let report = ClassificationReport::compute(truth.view(), truth.view()).unwrap();
        assert_eq!(report.labels.len(), 1);
        assert_eq!(report.accuracy, 1.0);
    }

    #[test]
    fn test_report_layout() {
        let truth = array![1u8, 0];
        let report = ClassificationReport::compute(truth.view(), truth.view()).unwrap();
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "              precision    recall  f1-score   support");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "           0       1.00      1.00      1.00         1");
        assert_eq!(lines[5], "    accuracy                           1.00         2");
        assert_eq!(lines[7], "weighted avg       1.00      1.00      1.00         2");
    }

    #[test]
    fn test_evaluation_output() {
        let truth = array![[1u8, 0], [0, 0]];
        let pred = array![[1u8, 1], [0, 0]];
        let names = vec!["related".to_string(), "request".to_string()];
        let evaluation = Evaluation::compute(truth.view(), pred.view(), &names).unwrap();
        assert!((evaluation.accuracy - 0.75).abs() < 1e-12);

        let mut buf = Vec::new();
        evaluation.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("accuracy = 0.75\n"));
        assert_eq!(text.matches("Class:  related\n").count(), 1);
        assert_eq!(text.matches("Class:  request\n").count(), 1);
    }

    #[test]
    fn test_shape_mismatch() {
        let truth = array![[1u8, 0]];
        let names = vec!["related".to_string()];
        assert!(matches!(
            Evaluation::compute(truth.view(), truth.view(), &names),
            Err(TrainError::InvalidArgument(_))
        ));
        let pred = array![[1u8, 0], [0, 0]];
        assert!(Evaluation::compute(truth.view(), pred.view(), &names).is_err());
    }
}
