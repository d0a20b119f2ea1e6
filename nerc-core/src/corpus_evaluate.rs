//! # Comparação de Corpora já Etiquetados
//!
//! Avalia uma predição salva contra a referência sem envolver modelo: os dois
//! fluxos são lidos por completo, precisam ter o mesmo número de amostras, e a
//! amostra `i` da predição é pontuada contra a amostra `i` da referência.
//!
//! Os pares são pontuados em paralelo com `rayon`; como a soma dos contadores é
//! comutativa e associativa, o resultado é idêntico ao da soma sequencial.

use std::io::Write;
use std::path::Path;

use rayon::prelude::*;

use crate::config::{ConfigSettings, TEST_SET};
use crate::corpus::{self, CorpusSample};
use crate::error::{Error, Result};
use crate::evaluate::{EvaluationReport, ReportMode};
use crate::filter::{maybe_filter, AllowedTypes};
use crate::fmeasure::{score_spans, FMeasure, TypedFMeasure};

/// Compara referência e predição amostra a amostra.
#[derive(Debug, Clone, Default)]
pub struct CorpusEvaluate {
    allowed: Option<AllowedTypes>,
}

#[derive(Default)]
struct Totals {
    aggregate: FMeasure,
    per_type: TypedFMeasure,
}

impl Totals {
    fn merge(mut self, other: Totals) -> Totals {
        self.aggregate.merge(&other.aggregate);
        self.per_type.merge(&other.per_type);
        self
    }
}

impl CorpusEvaluate {
    pub fn new(allowed: Option<AllowedTypes>) -> Self {
        Self { allowed }
    }

    /// Usa o filtro `Types` da configuração, se houver.
    pub fn from_settings(settings: &ConfigSettings) -> Result<Self> {
        let allowed = settings.allowed_types().map(AllowedTypes::new).transpose()?;
        Ok(Self::new(allowed))
    }

    pub fn evaluate<R, P>(&self, reference: R, prediction: P) -> Result<EvaluationReport>
    where
        R: IntoIterator<Item = Result<CorpusSample>>,
        P: IntoIterator<Item = Result<CorpusSample>>,
    {
        let reference = corpus::read_all(maybe_filter(reference.into_iter(), self.allowed.as_ref()))?;
        let prediction = corpus::read_all(maybe_filter(prediction.into_iter(), self.allowed.as_ref()))?;

        if reference.len() != prediction.len() {
            return Err(Error::LengthMismatch {
                reference: reference.len(),
                prediction: prediction.len(),
            });
        }

        let misaligned = reference
            .iter()
            .zip(&prediction)
            .filter(|(r, p)| r.tokens != p.tokens)
            .count();
        if misaligned > 0 {
            tracing::warn!(misaligned, "amostras com tokens diferentes entre referência e predição");
        }

        let totals = reference
            .par_iter()
            .zip(prediction.par_iter())
            .map(|(r, p)| {
                let comparison = score_spans(&r.spans, &p.spans);
                let mut totals = Totals {
                    aggregate: comparison.counts(),
                    ..Totals::default()
                };
                totals.per_type.record(&comparison);
                totals
            })
            .reduce(Totals::default, Totals::merge);

        Ok(EvaluationReport {
            mode: ReportMode::Brief,
            samples: reference.len(),
            aggregate: totals.aggregate,
            per_type: totals.per_type,
            errors: Vec::new(),
        })
    }

    /// Avalia e escreve a linha agregada no destino.
    pub fn evaluate_to<R, P, W>(&self, reference: R, prediction: P, sink: &mut W) -> Result<EvaluationReport>
    where
        R: IntoIterator<Item = Result<CorpusSample>>,
        P: IntoIterator<Item = Result<CorpusSample>>,
        W: Write + ?Sized,
    {
        let report = self.evaluate(reference, prediction)?;
        report.write_to(sink)?;
        Ok(report)
    }
}

/// Compara um arquivo de predição com o `TestSet` configurado, no mesmo
/// idioma e formato de corpus.
pub fn evaluate_prediction_file<W: Write + ?Sized>(
    settings: &ConfigSettings,
    prediction_path: &Path,
    sink: &mut W,
) -> Result<EvaluationReport> {
    let evaluator = CorpusEvaluate::from_settings(settings)?;
    let reference_path = settings.data_set(TEST_SET)?;
    let language = settings.language()?;
    let format = settings.corpus_format()?;

    let reference = corpus::open(&reference_path, language, format)?;
    let prediction = corpus::open(prediction_path, language, format)?;
    let report = evaluator.evaluate_to(reference, prediction, sink)?;
    tracing::info!(
        reference = %reference_path.display(),
        prediction = %prediction_path.display(),
        samples = report.samples,
        f1 = report.f1(),
        "predição avaliada"
    );
    Ok(report)
}
