//! # Avaliação de um Modelo Treinado
//!
//! O [`Evaluator`] percorre um corpus de referência em passo único: lê uma
//! amostra, pede ao modelo as entidades dos mesmos tokens, aplica o filtro de
//! tipos aos dois lados (se configurado) e pontua o par. Termina quando a
//! referência se esgota.
//!
//! ## Modos de Relatório
//!
//! | Modo       | Conteúdo                                                          |
//! |------------|-------------------------------------------------------------------|
//! | `brief`    | apenas a linha agregada                                           |
//! | `detailed` | linha agregada + uma linha por tipo visto em qualquer dos lados   |
//! | `error`    | falsos positivos e negativos de cada amostra com contexto + agregado |
//!
//! Além do texto escrito no destino, toda avaliação devolve um
//! [`EvaluationReport`] serializável.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::corpus::CorpusSample;
use crate::error::{Error, Result};
use crate::filter::AllowedTypes;
use crate::fmeasure::{score_spans, FMeasure, SpanComparison, TypedFMeasure};
use crate::span::Span;
use crate::tagger::NameFinder;

/// Tokens exibidos de cada lado de um span na listagem de erros.
const CONTEXT_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    Brief,
    #[default]
    Detailed,
    Error,
}

impl FromStr for ReportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "brief" => Ok(ReportMode::Brief),
            "detailed" => Ok(ReportMode::Detailed),
            "error" => Ok(ReportMode::Error),
            other => Err(Error::configuration(format!(
                "modo de relatório desconhecido '{other}' (use brief, detailed ou error)"
            ))),
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportMode::Brief => "brief",
            ReportMode::Detailed => "detailed",
            ReportMode::Error => "error",
        })
    }
}

/// Um span sem correspondência, com os tokens ao redor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanError {
    pub span: Span,
    /// Contexto com o span entre colchetes, ex: `lives in [Paris] .`
    pub context: String,
}

impl SpanError {
    fn new(span: &Span, tokens: &[String]) -> Self {
        Self {
            span: span.clone(),
            context: token_context(tokens, span),
        }
    }
}

/// Erros de uma amostra no modo `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleErrors {
    /// Posição da amostra no corpus (a partir de 0).
    pub index: usize,
    pub false_positives: Vec<SpanError>,
    pub false_negatives: Vec<SpanError>,
}

/// Resultado de uma avaliação.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub mode: ReportMode,
    pub samples: usize,
    pub aggregate: FMeasure,
    pub per_type: TypedFMeasure,
    /// Só preenchido no modo `error`.
    pub errors: Vec<SampleErrors>,
}

impl EvaluationReport {
    pub fn new(mode: ReportMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Soma uma amostra já comparada.
    pub fn record(&mut self, index: usize, tokens: &[String], comparison: &SpanComparison) {
        self.samples += 1;
        self.aggregate.merge(&comparison.counts());
        self.per_type.record(comparison);
        if self.mode == ReportMode::Error && !comparison.is_exact() {
            self.errors.push(SampleErrors {
                index,
                false_positives: comparison.false_positives.iter().map(|s| SpanError::new(s, tokens)).collect(),
                false_negatives: comparison.false_negatives.iter().map(|s| SpanError::new(s, tokens)).collect(),
            });
        }
    }

    pub fn f1(&self) -> f64 {
        self.aggregate.f1()
    }

    /// Escreve o relatório textual conforme o modo.
    pub fn write_to<W: Write + ?Sized>(&self, sink: &mut W) -> Result<()> {
        if self.mode == ReportMode::Error {
            for sample in &self.errors {
                writeln!(sink, "# amostra {}", sample.index)?;
                for error in &sample.false_positives {
                    writeln!(sink, "FP\t{}\t{}", error.span, error.context)?;
                }
                for error in &sample.false_negatives {
                    writeln!(sink, "FN\t{}\t{}", error.span, error.context)?;
                }
            }
        }
        writeln!(sink, "{}", self.aggregate)?;
        if self.mode == ReportMode::Detailed {
            for (label, counts) in &self.per_type.by_type {
                writeln!(sink, "{label}\t{counts}")?;
            }
        }
        Ok(())
    }
}

/// Tokens ao redor do span, com o span entre colchetes.
pub fn token_context(tokens: &[String], span: &Span) -> String {
    let end = span.end.min(tokens.len());
    let start = span.start.min(end);
    let left = start.saturating_sub(CONTEXT_WINDOW);
    let right = (end + CONTEXT_WINDOW).min(tokens.len());

    let mut pieces: Vec<String> = tokens[left..start].to_vec();
    pieces.push(format!("[{}]", tokens[start..end].join(" ")));
    pieces.extend_from_slice(&tokens[end..right]);
    pieces.join(" ")
}

/// Avalia um modelo contra um corpus de referência.
pub struct Evaluator<'m, M: ?Sized> {
    model: &'m M,
    allowed: Option<AllowedTypes>,
    mode: ReportMode,
}

impl<'m, M: NameFinder + ?Sized> Evaluator<'m, M> {
    pub fn new(model: &'m M, mode: ReportMode) -> Self {
        Self {
            model,
            allowed: None,
            mode,
        }
    }

    pub fn with_allowed_types(mut self, allowed: Option<AllowedTypes>) -> Self {
        self.allowed = allowed;
        self
    }

    /// Consome a referência inteira; o primeiro erro de leitura ou do modelo aborta.
    pub fn evaluate<I>(&self, reference: I) -> Result<EvaluationReport>
    where
        I: IntoIterator<Item = Result<CorpusSample>>,
    {
        let mut report = EvaluationReport::new(self.mode);
        for (index, sample) in reference.into_iter().enumerate() {
            let sample = sample?;
            let hypothesis = self.model.tag(&sample.tokens)?;
            let comparison = match &self.allowed {
                Some(allowed) => score_spans(
                    &allowed.filter_spans(&sample.spans),
                    &allowed.filter_spans(&hypothesis),
                ),
                None => score_spans(&sample.spans, &hypothesis),
            };
            report.record(index, &sample.tokens, &comparison);
        }
        tracing::debug!(samples = report.samples, mode = %self.mode, "avaliação concluída");
        Ok(report)
    }

    /// Avalia e escreve o relatório no destino.
    pub fn evaluate_to<I, W>(&self, reference: I, sink: &mut W) -> Result<EvaluationReport>
    where
        I: IntoIterator<Item = Result<CorpusSample>>,
        W: Write + ?Sized,
    {
        let report = self.evaluate(reference)?;
        report.write_to(sink)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Modelo fixo: devolve sempre os mesmos spans, truncados à sentença.
    struct FixedModel(Vec<Span>);

    impl NameFinder for FixedModel {
        fn tag(&self, tokens: &[String]) -> Result<Vec<Span>> {
            Ok(self.0.iter().filter(|s| s.end <= tokens.len()).cloned().collect())
        }
    }

    struct FailingModel;

    impl NameFinder for FailingModel {
        fn tag(&self, _tokens: &[String]) -> Result<Vec<Span>> {
            Err(Error::training("modelo indisponível"))
        }
    }

    fn reference() -> Vec<Result<CorpusSample>> {
        let tokens = ["John", "lives", "in", "Paris"].iter().map(|s| s.to_string()).collect();
        vec![Ok(CorpusSample::new(tokens, vec![Span::new(0, 1, "PER"), Span::new(3, 4, "LOC")]).unwrap())]
    }

    #[test]
    fn test_report_mode_parsing() {
        assert_eq!("Brief".parse::<ReportMode>().unwrap(), ReportMode::Brief);
        assert_eq!(ReportMode::default(), ReportMode::Detailed);
        assert!("verbose".parse::<ReportMode>().unwrap_err().is_configuration());
    }

    #[test]
    fn test_brief_report() {
        let model = FixedModel(vec![Span::new(0, 1, "PER")]);
        let mut out = Vec::new();
        let report = Evaluator::new(&model, ReportMode::Brief)
            .evaluate_to(reference(), &mut out)
            .unwrap();
        assert_eq!(report.aggregate.true_positive, 1);
        assert_eq!(report.aggregate.false_negative, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "precision=1.0000 recall=0.5000 f1=0.6667\n");
    }

    #[test]
    fn test_detailed_report_rows() {
        let model = FixedModel(vec![Span::new(0, 1, "PER"), Span::new(2, 3, "MISC")]);
        let mut out = Vec::new();
        Evaluator::new(&model, ReportMode::Detailed)
            .evaluate_to(reference(), &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("LOC\tprecision=0.0000"));
        assert!(lines[2].starts_with("MISC\t"));
        assert_eq!(lines[3], "PER\tprecision=1.0000 recall=1.0000 f1=1.0000");
    }

    #[test]
    fn test_error_listing_with_context() {
        let model = FixedModel(vec![Span::new(0, 1, "PER")]);
        let mut out = Vec::new();
        let report = Evaluator::new(&model, ReportMode::Error)
            .evaluate_to(reference(), &mut out)
            .unwrap();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].false_negatives[0].context, "John lives in [Paris]");
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("FN\t(3, 4, LOC)\tJohn lives in [Paris]"));
        assert!(text.ends_with("precision=1.0000 recall=0.5000 f1=0.6667\n"));
    }

    #[test]
    fn test_filter_applies_to_both_sides() {
        let model = FixedModel(vec![Span::new(0, 1, "PER"), Span::new(1, 2, "ORG")]);
        let allowed = AllowedTypes::new(["PER"]).unwrap();
        let report = Evaluator::new(&model, ReportMode::Brief)
            .with_allowed_types(Some(allowed))
            .evaluate(reference())
            .unwrap();
        assert_eq!(report.aggregate, FMeasure { true_positive: 1, false_positive: 0, false_negative: 0 });
    }

    #[test]
    fn test_model_failure_aborts() {
        assert!(Evaluator::new(&FailingModel, ReportMode::Brief).evaluate(reference()).is_err());
    }

    #[test]
    fn test_token_context_window() {
        let tokens: Vec<String> = "a b c d e f g h".split(' ').map(str::to_string).collect();
        assert_eq!(token_context(&tokens, &Span::new(4, 5, "X")), "b c d [e] f g h");
        assert_eq!(token_context(&tokens, &Span::new(0, 2, "X")), "[a b] c d e");
    }
}
