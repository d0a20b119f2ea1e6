//! # Métricas de Avaliação (Precision, Recall, F1)
//!
//! Comparação em nível de entidade com **correspondência exata**: um span da
//! hipótese só conta como acerto se existir na referência com o mesmo início,
//! o mesmo fim e o mesmo tipo. Fronteira certa com tipo errado vale um falso
//! positivo e um falso negativo.
//!
//! ## Fórmulas
//!
//! - Precision = TP / (TP + FP)
//! - Recall    = TP / (TP + FN)
//! - F1        = 2 · P · R / (P + R)
//!
//! Qualquer denominador zero produz 0.0. Os contadores só crescem e a soma é
//! comutativa e associativa, então a ordem das amostras não altera as métricas
//! e acumuladores parciais podem ser combinados com [`FMeasure::merge`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// Resultado da comparação de uma amostra.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanComparison {
    /// Spans presentes nos dois lados.
    pub matched: Vec<Span>,
    /// Spans só da hipótese.
    pub false_positives: Vec<Span>,
    /// Spans só da referência.
    pub false_negatives: Vec<Span>,
}

impl SpanComparison {
    pub fn counts(&self) -> FMeasure {
        FMeasure {
            true_positive: self.matched.len() as u64,
            false_positive: self.false_positives.len() as u64,
            false_negative: self.false_negatives.len() as u64,
        }
    }

    /// Sem erros nesta amostra.
    pub fn is_exact(&self) -> bool {
        self.false_positives.is_empty() && self.false_negatives.is_empty()
    }
}

/// Compara os spans de referência e hipótese de uma amostra.
///
/// Cada span da referência casa no máximo um span idêntico da hipótese, de modo
/// que `TP + FP = |H|` e `TP + FN = |R|` sempre valem.
pub fn score_spans(reference: &[Span], hypothesis: &[Span]) -> SpanComparison {
    let mut pending: HashMap<&Span, usize> = HashMap::new();
    for span in reference {
        *pending.entry(span).or_insert(0) += 1;
    }

    let mut comparison = SpanComparison::default();
    for span in hypothesis {
        match pending.get_mut(span) {
            Some(count) if *count > 0 => {
                *count -= 1;
                comparison.matched.push(span.clone());
            }
            _ => comparison.false_positives.push(span.clone()),
        }
    }

    // A referência sobra na ordem original
    for span in reference {
        if let Some(count) = pending.get_mut(span) {
            if *count > 0 {
                *count -= 1;
                comparison.false_negatives.push(span.clone());
            }
        }
    }
    comparison
}

/// Acumulador de (TP, FP, FN).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FMeasure {
    pub true_positive: u64,
    pub false_positive: u64,
    pub false_negative: u64,
}

impl FMeasure {
    /// Pontua uma amostra e soma o resultado.
    pub fn update(&mut self, reference: &[Span], hypothesis: &[Span]) -> SpanComparison {
        let comparison = score_spans(reference, hypothesis);
        self.merge(&comparison.counts());
        comparison
    }

    /// Soma outro acumulador a este.
    pub fn merge(&mut self, other: &FMeasure) {
        self.true_positive += other.true_positive;
        self.false_positive += other.false_positive;
        self.false_negative += other.false_negative;
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Linha agregada: `precision=<p> recall=<r> f1=<f>`, quatro casas decimais.
impl fmt::Display for FMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "precision={:.4} recall={:.4} f1={:.4}",
            self.precision(),
            self.recall(),
            self.f1()
        )
    }
}

/// Acumuladores por tipo de entidade, em ordem alfabética.
///
/// Um tipo ganha linha quando aparece em qualquer um dos lados.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedFMeasure {
    pub by_type: BTreeMap<String, FMeasure>,
}

impl TypedFMeasure {
    pub fn record(&mut self, comparison: &SpanComparison) {
        for span in &comparison.matched {
            self.entry(&span.label).true_positive += 1;
        }
        for span in &comparison.false_positives {
            self.entry(&span.label).false_positive += 1;
        }
        for span in &comparison.false_negatives {
            self.entry(&span.label).false_negative += 1;
        }
    }

    pub fn merge(&mut self, other: &TypedFMeasure) {
        for (label, counts) in &other.by_type {
            self.entry(label).merge(counts);
        }
    }

    pub fn get(&self, label: &str) -> Option<&FMeasure> {
        self.by_type.get(label)
    }

    fn entry(&mut self, label: &str) -> &mut FMeasure {
        self.by_type.entry(label.to_string()).or_default()
    }
}
