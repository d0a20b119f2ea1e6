//! # nerc-core: Treino, Validação Cruzada e Avaliação de Etiquetadores NER
//!
//! Este crate implementa o motor que treina, valida e pontua etiquetadores de
//! entidades nomeadas sobre corpora anotados. A pontuação é feita em nível de
//! entidade, com correspondência exata de fronteiras e tipo.
//!
//! ## Arquitetura do Sistema
//!
//! O dado flui da configuração até as métricas:
//!
//! 1.  **Configuração** ([`config`]): arquivo de parâmetros imutável, com acessores tipados.
//! 2.  **Corpora** ([`corpus`]): leitura preguiçosa em passada única (native, CoNLL-02, CoNLL-03).
//! 3.  **Filtro de Tipos** ([`filter`]): restringe os spans a um conjunto de tipos permitidos.
//! 4.  **Métricas** ([`fmeasure`]): TP/FP/FN por amostra, precision, recall e F1.
//! 5.  **Avaliação**:
//!     *   **Modelo** ([`evaluate`]): etiqueta o corpus de referência e pontua.
//!     *   **Predição salva** ([`corpus_evaluate`]): compara dois corpora alinhados.
//! 6.  **Treino** ([`cross_eval`]): execução única ou fold de validação cruzada.
//!
//! O aprendizado estatístico fica atrás de [`SequenceTagger`] e [`NameFinder`]; o
//! crate traz um perceptron médio ([`perceptron`]) como implementação padrão.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use nerc_core::{CorpusSample, Evaluator, NameFinder, ReportMode, Result, Span};
//!
//! // Modelo de brinquedo: "Paris" é sempre LOC
//! struct Gazetteer;
//!
//! impl NameFinder for Gazetteer {
//!     fn tag(&self, tokens: &[String]) -> Result<Vec<Span>> {
//!         Ok(tokens
//!             .iter()
//!             .enumerate()
//!             .filter(|(_, t)| *t == "Paris")
//!             .map(|(i, _)| Span::new(i, i + 1, "LOC"))
//!             .collect())
//!     }
//! }
//!
//! let tokens = ["John", "lives", "in", "Paris"].map(String::from).to_vec();
//! let sample = CorpusSample::new(tokens, vec![Span::new(0, 1, "PER"), Span::new(3, 4, "LOC")]).unwrap();
//!
//! let report = Evaluator::new(&Gazetteer, ReportMode::Brief)
//!     .evaluate(vec![Ok(sample)])
//!     .unwrap();
//! assert_eq!(report.aggregate.to_string(), "precision=1.0000 recall=0.5000 f1=0.6667");
//! ```

pub mod config;
pub mod corpus;
pub mod corpus_evaluate;
pub mod cross_eval;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod filter;
pub mod fmeasure;
pub mod model;
pub mod perceptron;
pub mod pipeline;
pub mod span;
pub mod tagger;

pub use config::{ConfigSettings, FoldPartition};
pub use corpus::{CorpusFormat, CorpusReader, CorpusSample, CorpusSampleStream};
pub use corpus_evaluate::{evaluate_prediction_file, CorpusEvaluate};
pub use cross_eval::{CrossValidationTrainer, FoldResult, TrainerState, TrainingOutcome};
pub use error::{Error, Result};
pub use evaluate::{EvaluationReport, Evaluator, ReportMode};
pub use filter::{AllowedTypes, EntityTypeFilter};
pub use fmeasure::{score_spans, FMeasure, SpanComparison, TypedFMeasure};
pub use model::{load_model, save_model};
pub use perceptron::{PerceptronModel, PerceptronTrainer};
pub use pipeline::{tag_corpus, tag_input};
pub use span::Span;
pub use tagger::{NameFinder, SequenceTagger, Tag};
