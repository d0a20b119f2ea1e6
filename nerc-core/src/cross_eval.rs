//! # Treino com Validação Cruzada
//!
//! O [`CrossValidationTrainer`] decide entre duas rotas a partir da configuração:
//!
//! - **Execução única** (sem `CrossEval`): treina sobre todo o `TrainSet` e, se
//!   houver `TestSet`, avalia uma vez no modo `brief`.
//! - **Fold** (`CrossEval=<início>:<fim>` mais `DevSet`): o intervalo
//!   `[início, fim)` do corpus de desenvolvimento é o subconjunto de avaliação e o
//!   modelo é treinado com o `TrainSet` sem esses índices.
//!
//! ## Máquina de Estados
//!
//! ```text
//! Idle ──► SingleRun ─────────┐
//!   │                         ├──► Aggregating ──► Done
//!   ├────► PerFold(0) ────────┘
//!   └────► Rejected (configuração inválida, nada é treinado)
//!
//! SingleRun | PerFold(0) ──► Failed (erro de leitura, treino ou avaliação)
//! ```
//!
//! A validação da configuração, incluindo os parâmetros do algoritmo, acontece
//! antes de abrir qualquer corpus. A única exceção é o intervalo do fold, que só
//! pode ser conferido contra o tamanho do `DevSet`; fora dele, a execução também
//! termina em `Rejected`. Uma falha de treino ou de avaliação termina em `Failed`
//! sem devolver modelo. `Done`, `Rejected` e `Failed` são terminais.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigSettings, FoldPartition, DEV_SET, TEST_SET, TRAIN_SET};
use crate::corpus::{self, CorpusFormat, CorpusSample};
use crate::error::{Error, Result};
use crate::evaluate::{EvaluationReport, Evaluator, ReportMode};
use crate::filter::{maybe_filter, AllowedTypes};
use crate::tagger::SequenceTagger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainerState {
    Idle,
    SingleRun,
    PerFold(usize),
    Aggregating,
    Done,
    Rejected,
    Failed,
}

impl fmt::Display for TrainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainerState::Idle => f.write_str("idle"),
            TrainerState::SingleRun => f.write_str("single-run"),
            TrainerState::PerFold(i) => write!(f, "fold-{i}"),
            TrainerState::Aggregating => f.write_str("aggregating"),
            TrainerState::Done => f.write_str("done"),
            TrainerState::Rejected => f.write_str("rejected"),
            TrainerState::Failed => f.write_str("failed"),
        }
    }
}

/// Resultado de um fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub index: usize,
    pub partition: FoldPartition,
    pub train_samples: usize,
    pub report: EvaluationReport,
}

impl FoldResult {
    pub fn f1(&self) -> f64 {
        self.report.f1()
    }
}

/// O modelo escolhido e as métricas que o justificam.
#[derive(Debug)]
pub struct TrainingOutcome<M> {
    pub model: M,
    /// Relatório final: o do fold, ou o do `TestSet` na execução única (se houver).
    pub report: Option<EvaluationReport>,
    pub folds: Vec<FoldResult>,
}

/// Rota decidida na validação, antes de qualquer leitura.
#[derive(Debug, Clone, PartialEq)]
enum RunPlan {
    Single { test_set: Option<PathBuf> },
    Fold { partition: FoldPartition, dev_set: PathBuf },
}

/// Configuração já validada.
#[derive(Debug, Clone)]
struct Validated {
    language: String,
    format: CorpusFormat,
    train_set: PathBuf,
    allowed: Option<AllowedTypes>,
    plan: RunPlan,
}

pub struct CrossValidationTrainer<'c, T> {
    tagger: T,
    settings: &'c ConfigSettings,
    state: TrainerState,
}

impl<'c, T: SequenceTagger> CrossValidationTrainer<'c, T> {
    pub fn new(tagger: T, settings: &'c ConfigSettings) -> Self {
        Self {
            tagger,
            settings,
            state: TrainerState::Idle,
        }
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    fn transition(&mut self, next: TrainerState) {
        tracing::debug!(from = %self.state, to = %next, "transição do treinador");
        self.state = next;
    }

    fn validate(&self) -> Result<Validated> {
        let settings = self.settings;
        self.tagger.validate(settings)?;
        let plan = match settings.cross_eval() {
            Some(partition) => {
                let partition = partition?;
                let dev_set = settings.optional(DEV_SET).map(PathBuf::from).ok_or_else(|| {
                    Error::configuration(format!("validação cruzada exige o parâmetro {DEV_SET}"))
                })?;
                RunPlan::Fold { partition, dev_set }
            }
            None => RunPlan::Single {
                test_set: settings.optional(TEST_SET).map(PathBuf::from),
            },
        };

        Ok(Validated {
            language: settings.language()?.to_string(),
            format: settings.corpus_format()?,
            train_set: settings.data_set(TRAIN_SET)?,
            allowed: settings.allowed_types().map(AllowedTypes::new).transpose()?,
            plan,
        })
    }

    /// Executa a rota configurada e devolve o modelo treinado.
    pub fn run(&mut self) -> Result<TrainingOutcome<T::Model>> {
        if self.state != TrainerState::Idle {
            return Err(Error::configuration(format!(
                "o treinador já foi executado (estado {})",
                self.state
            )));
        }
        let validated = match self.validate() {
            Ok(v) => v,
            Err(e) => {
                self.transition(TrainerState::Rejected);
                return Err(e);
            }
        };

        let result = match validated.plan.clone() {
            RunPlan::Single { test_set } => self.single_run(&validated, test_set),
            RunPlan::Fold { partition, dev_set } => self.fold_run(&validated, partition, dev_set),
        };
        match result {
            Ok(outcome) => {
                self.transition(TrainerState::Done);
                Ok(outcome)
            }
            Err(e) => {
                if self.state != TrainerState::Rejected {
                    self.transition(TrainerState::Failed);
                }
                Err(e)
            }
        }
    }

    fn read(&self, validated: &Validated, path: &Path) -> Result<Vec<CorpusSample>> {
        let reader = corpus::open(path, &validated.language, validated.format)?;
        corpus::read_all(maybe_filter(reader, validated.allowed.as_ref()))
    }

    fn single_run(&mut self, validated: &Validated, test_set: Option<PathBuf>) -> Result<TrainingOutcome<T::Model>> {
        self.transition(TrainerState::SingleRun);
        let train = self.read(validated, &validated.train_set)?;
        tracing::info!(samples = train.len(), train_set = %validated.train_set.display(), "treinando modelo");
        let model = self.tagger.train(&train, self.settings)?;

        let report = match test_set {
            Some(path) => {
                let reader = corpus::open(&path, &validated.language, validated.format)?;
                let report = Evaluator::new(&model, ReportMode::Brief)
                    .with_allowed_types(validated.allowed.clone())
                    .evaluate(reader)?;
                tracing::info!(test_set = %path.display(), f1 = report.f1(), "avaliação no TestSet");
                Some(report)
            }
            None => None,
        };

        self.transition(TrainerState::Aggregating);
        Ok(TrainingOutcome {
            model,
            report,
            folds: Vec::new(),
        })
    }

    fn fold_run(
        &mut self,
        validated: &Validated,
        partition: FoldPartition,
        dev_set: PathBuf,
    ) -> Result<TrainingOutcome<T::Model>> {
        self.transition(TrainerState::PerFold(0));
        let train = self.read(validated, &validated.train_set)?;
        let dev = self.read(validated, &dev_set)?;

        // Intervalo além do fim do DevSet é truncado; vazio depois disso é inválido
        let end = partition.end.min(dev.len());
        if partition.start >= end {
            self.transition(TrainerState::Rejected);
            return Err(Error::configuration(format!(
                "CrossEval {partition} não cobre nenhuma amostra do DevSet ({} amostras)",
                dev.len()
            )));
        }
        let held_out = &dev[partition.start..end];
        let fold_train: Vec<CorpusSample> = train
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !partition.contains(*i))
            .map(|(_, sample)| sample)
            .collect();

        tracing::info!(
            fold = 0,
            partition = %partition,
            train_samples = fold_train.len(),
            held_out = held_out.len(),
            "iniciando fold"
        );
        let model = self.tagger.train(&fold_train, self.settings)?;
        let report = Evaluator::new(&model, ReportMode::Brief)
            .with_allowed_types(validated.allowed.clone())
            .evaluate(held_out.iter().cloned().map(Ok))?;
        tracing::info!(fold = 0, f1 = report.f1(), "fold concluído");

        let fold = FoldResult {
            index: 0,
            partition,
            train_samples: fold_train.len(),
            report,
        };

        // Um único fold: suas métricas são o relatório final
        self.transition(TrainerState::Aggregating);
        Ok(TrainingOutcome {
            model,
            report: Some(fold.report.clone()),
            folds: vec![fold],
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::perceptron::PerceptronTrainer;
    use crate::span::Span;
    use crate::tagger::NameFinder;

    /// Modelo que repete o que viu: marca `PER` em tokens capitalizados.
    #[derive(Debug)]
    struct CapitalModel;

    impl NameFinder for CapitalModel {
        fn tag(&self, tokens: &[String]) -> Result<Vec<Span>> {
            Ok(tokens
                .iter()
                .enumerate()
                .filter(|(_, t)| t.chars().next().is_some_and(char::is_uppercase))
                .map(|(i, _)| Span::new(i, i + 1, "PER"))
                .collect())
        }
    }

    /// Conta chamadas de treino para provar que a validação vem antes.
    #[derive(Default)]
    struct CountingTagger {
        calls: Cell<usize>,
    }

    impl SequenceTagger for &CountingTagger {
        type Model = CapitalModel;

        fn train(&self, _samples: &[CorpusSample], _settings: &ConfigSettings) -> Result<CapitalModel> {
            self.calls.set(self.calls.get() + 1);
            Ok(CapitalModel)
        }
    }

    #[test]
    fn test_cross_eval_single_integer_rejected() {
        let tagger = CountingTagger::default();
        let settings = ConfigSettings::from_pairs([
            ("Language", "en"),
            ("TrainSet", "/nao/existe/train.txt"),
            ("CorpusFormat", "native"),
            ("DevSet", "/nao/existe/dev.txt"),
            ("CrossEval", "1"),
        ]);
        let mut trainer = CrossValidationTrainer::new(&tagger, &settings);
        let err = trainer.run().unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(trainer.state(), TrainerState::Rejected);
        assert_eq!(tagger.calls.get(), 0);
    }

    #[test]
    fn test_cross_eval_without_dev_set_rejected() {
        let tagger = CountingTagger::default();
        let settings = ConfigSettings::from_pairs([
            ("Language", "en"),
            ("TrainSet", "/nao/existe/train.txt"),
            ("CorpusFormat", "native"),
            ("CrossEval", "2:5"),
        ]);
        let mut trainer = CrossValidationTrainer::new(&tagger, &settings);
        let err = trainer.run().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("DevSet"));
        assert_eq!(trainer.state(), TrainerState::Rejected);
        assert_eq!(tagger.calls.get(), 0);
    }

    #[test]
    fn test_unreadable_train_set_is_corpus_error() {
        let tagger = CountingTagger::default();
        let settings = ConfigSettings::from_pairs([
            ("Language", "en"),
            ("TrainSet", "/nao/existe/train.txt"),
            ("CorpusFormat", "native"),
        ]);
        let mut trainer = CrossValidationTrainer::new(&tagger, &settings);
        assert!(matches!(trainer.run().unwrap_err(), Error::CorpusRead { .. }));
        assert_eq!(trainer.state(), TrainerState::Failed);
        assert_eq!(tagger.calls.get(), 0);

        // Estado terminal: uma segunda execução é recusada sem sair de Failed
        let err = trainer.run().unwrap_err();
        assert!(err.to_string().contains("failed"));
        assert_eq!(trainer.state(), TrainerState::Failed);
    }

    #[test]
    fn test_invalid_iterations_rejected_before_io() {
        let settings = ConfigSettings::from_pairs([
            ("Language", "en"),
            ("TrainSet", "/nao/existe/train.txt"),
            ("CorpusFormat", "native"),
            ("Iterations", "zero"),
        ]);
        let mut trainer = CrossValidationTrainer::new(PerceptronTrainer::default(), &settings);
        let err = trainer.run().unwrap_err();
        assert!(err.is_configuration(), "{err}");
        assert_eq!(trainer.state(), TrainerState::Rejected);
    }

    #[test]
    fn test_fold_outside_dev_set_rejected_without_training() {
        let dir = tempfile::tempdir().unwrap();
        let train = dir.path().join("train.txt");
        let dev = dir.path().join("dev.txt");
        std::fs::write(&train, "<START:PER> John <END> lives here .\n").unwrap();
        std::fs::write(&dev, "<START:PER> Mary <END> left .\n").unwrap();

        let tagger = CountingTagger::default();
        let settings = ConfigSettings::from_pairs([
            ("Language", "en".to_string()),
            ("CorpusFormat", "native".to_string()),
            ("TrainSet", train.display().to_string()),
            ("DevSet", dev.display().to_string()),
            ("CrossEval", "10:20".to_string()),
        ]);
        let mut trainer = CrossValidationTrainer::new(&tagger, &settings);
        let err = trainer.run().unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(trainer.state(), TrainerState::Rejected);
        assert_eq!(tagger.calls.get(), 0);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(TrainerState::PerFold(2).to_string(), "fold-2");
        assert_eq!(TrainerState::Rejected.to_string(), "rejected");
        assert_eq!(TrainerState::Failed.to_string(), "failed");
    }
}
