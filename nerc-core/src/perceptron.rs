//! # Averaged Perceptron para NER
//!
//! Etiquetador sequencial embutido: um perceptron multiclasse sobre as features
//! esparsas de [`crate::features`], decodificado de forma gulosa da esquerda para
//! a direita com a tag prevista anterior como feature de transição. As tags BIO
//! previstas voltam a spans por [`bio_to_spans`].
//!
//! Utiliza "Lazy Averaging" para evitar custo O(N*T) na atualização dos pesos médios.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigSettings;
use crate::corpus::CorpusSample;
use crate::error::{Error, Result};
use crate::features::{previous_tag_feature, sentence_features};
use crate::span::{bio_to_spans, Span};
use crate::tagger::{NameFinder, SequenceTagger, Tag};

/// Pesos esparsos: feature -> (tag -> peso).
///
/// Mapa aninhado para que o modelo serialize direto em JSON.
pub type Weights = HashMap<String, HashMap<String, f64>>;

/// Modelo Perceptron Médio (Averaged Perceptron) já treinado.
///
/// O Perceptron é um algoritmo de aprendizado **online** e **mistake-driven**:
/// processa um token por vez e só atualiza os pesos quando erra a predição.
///
/// # Averaged Perceptron
/// O modelo final guarda a **média** dos pesos de todos os passos de treino, o que
/// reduz a oscilação do perceptron simples e estabiliza o resultado.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerceptronModel {
    weights: Weights,
    /// Tags conhecidas; `O` sempre na primeira posição para desempatar a favor dela.
    tags: Vec<String>,
}

impl PerceptronModel {
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn feature_count(&self) -> usize {
        self.weights.len()
    }

    /// Tags BIO previstas para cada token.
    pub fn predict(&self, tokens: &[String]) -> Vec<Tag> {
        greedy_decode(&self.weights, &self.tags, tokens)
            .into_iter()
            .map(|label| Tag::from_label(label).unwrap_or(Tag::Outside))
            .collect()
    }
}

impl NameFinder for PerceptronModel {
    fn tag(&self, tokens: &[String]) -> Result<Vec<Span>> {
        Ok(bio_to_spans(&self.predict(tokens)))
    }
}

/// Algoritmo de treino do perceptron.
///
/// `iterations` sobrescreve o parâmetro `Iterations` da configuração.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptronTrainer {
    pub iterations: Option<usize>,
}

impl PerceptronTrainer {
    pub fn with_iterations(iterations: usize) -> Self {
        Self {
            iterations: Some(iterations),
        }
    }

    fn epochs(&self, settings: &ConfigSettings) -> Result<usize> {
        match self.iterations {
            Some(n) if n > 0 => Ok(n),
            Some(_) => Err(Error::training("o número de épocas deve ser positivo")),
            None => settings.iterations(),
        }
    }
}

impl SequenceTagger for PerceptronTrainer {
    type Model = PerceptronModel;

    fn validate(&self, settings: &ConfigSettings) -> Result<()> {
        self.epochs(settings).map(|_| ())
    }

    /// O algoritmo itera pelo corpus `iterations` vezes. Para cada token:
    /// 1. Faz uma predição com os pesos atuais (tag anterior = a prevista).
    /// 2. Se errar, promove a tag correta e penaliza a prevista.
    ///
    /// Ao final, calcula a média dos pesos para obter o modelo.
    fn train(&self, samples: &[CorpusSample], settings: &ConfigSettings) -> Result<PerceptronModel> {
        let iterations = self.epochs(settings)?;
        if samples.iter().all(|s| s.tokens.is_empty()) {
            return Err(Error::training("corpus de treino sem tokens"));
        }

        let encoded: Vec<(Vec<Vec<String>>, Vec<String>)> = samples
            .iter()
            .filter(|s| !s.tokens.is_empty())
            .map(|s| (sentence_features(&s.tokens), s.tags().iter().map(Tag::label).collect()))
            .collect();

        let mut tags: Vec<String> = encoded
            .iter()
            .flat_map(|(_, gold)| gold.iter().cloned())
            .filter(|t| t != "O")
            .collect();
        tags.sort();
        tags.dedup();
        tags.insert(0, "O".to_string());

        let mut state = TrainingState::default();
        for epoch in 0..iterations {
            let mut mistakes = 0usize;
            for (features, gold) in &encoded {
                let mut previous: Option<String> = None;
                for (token_features, gold_tag) in features.iter().zip(gold) {
                    let active = with_transition(token_features, previous.as_deref());
                    let predicted = best_tag(&state.weights, &tags, &active).to_string();
                    if predicted != *gold_tag {
                        mistakes += 1;
                        for feature in &active {
                            state.update(feature, gold_tag, 1.0);
                            state.update(feature, &predicted, -1.0);
                        }
                    }
                    state.step += 1;
                    previous = Some(predicted);
                }
            }
            tracing::debug!(epoch = epoch + 1, mistakes, "época do perceptron concluída");
        }

        let model = PerceptronModel {
            weights: state.average(),
            tags,
        };
        tracing::debug!(features = model.feature_count(), tags = model.tags.len(), "perceptron treinado");
        Ok(model)
    }
}

/// Estado exclusivo do treino: pesos correntes mais os acumuladores do Lazy Averaging.
#[derive(Default)]
struct TrainingState {
    weights: Weights,
    /// Soma acumulada de cada peso até o passo registrado em `stamps`.
    totals: HashMap<(String, String), f64>,
    stamps: HashMap<(String, String), usize>,
    step: usize,
}

impl TrainingState {
    /// Acumula o peso antigo pelos passos em que ficou constante, depois aplica o delta.
    fn update(&mut self, feature: &str, tag: &str, delta: f64) {
        let key = (feature.to_string(), tag.to_string());
        let row = self.weights.entry(feature.to_string()).or_default();
        let weight = row.entry(tag.to_string()).or_insert(0.0);
        let last = self.stamps.get(&key).copied().unwrap_or(0);
        *self.totals.entry(key.clone()).or_insert(0.0) += (self.step - last) as f64 * *weight;
        self.stamps.insert(key, self.step);
        *weight += delta;
    }

    /// Fecha os acumuladores no passo final e devolve os pesos médios.
    fn average(mut self) -> Weights {
        let steps = self.step.max(1) as f64;
        let mut averaged = Weights::new();
        for (feature, row) in &self.weights {
            for (tag, weight) in row {
                let key = (feature.clone(), tag.clone());
                let last = self.stamps.get(&key).copied().unwrap_or(0);
                let total = self.totals.remove(&key).unwrap_or(0.0) + (self.step - last) as f64 * weight;
                let mean = total / steps;
                if mean != 0.0 {
                    averaged.entry(feature.clone()).or_default().insert(tag.clone(), mean);
                }
            }
        }
        averaged
    }
}

fn with_transition(features: &[String], previous: Option<&str>) -> Vec<String> {
    let mut active = Vec::with_capacity(features.len() + 1);
    active.extend_from_slice(features);
    active.push(previous_tag_feature(previous));
    active
}

/// Tag de maior pontuação; empates ficam com a primeira tag da lista.
fn best_tag<'a>(weights: &Weights, tags: &'a [String], features: &[String]) -> &'a str {
    let mut scores = vec![0.0; tags.len()];
    for row in features.iter().filter_map(|f| weights.get(f)) {
        for (i, tag) in tags.iter().enumerate() {
            if let Some(w) = row.get(tag) {
                scores[i] += w;
            }
        }
    }
    let mut best = 0;
    for (i, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = i;
        }
    }
    tags.get(best).map(String::as_str).unwrap_or("O")
}

fn greedy_decode<'a>(weights: &Weights, tags: &'a [String], tokens: &[String]) -> Vec<&'a str> {
    let mut previous: Option<&str> = None;
    sentence_features(tokens)
        .iter()
        .map(|features| {
            let tag = best_tag(weights, tags, &with_transition(features, previous));
            previous = Some(tag);
            tag
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(text: &str, spans: Vec<Span>) -> CorpusSample {
        let tokens = text.split_whitespace().map(str::to_string).collect();
        CorpusSample::new(tokens, spans).unwrap()
    }

    fn corpus() -> Vec<CorpusSample> {
        vec![
            sample("John lives in Paris", vec![Span::new(0, 1, "PER"), Span::new(3, 4, "LOC")]),
            sample("Mary visited London yesterday", vec![Span::new(0, 1, "PER"), Span::new(2, 3, "LOC")]),
            sample("the meeting was long", vec![]),
            sample("John Smith works at Acme Corp", vec![Span::new(0, 2, "PER"), Span::new(4, 6, "ORG")]),
        ]
    }

    #[test]
    fn test_perceptron_fits_training_data() {
        let model = PerceptronTrainer::with_iterations(10)
            .train(&corpus(), &ConfigSettings::default())
            .unwrap();
        for sample in corpus() {
            assert_eq!(model.tag(&sample.tokens).unwrap(), sample.spans, "{:?}", sample.tokens);
        }
    }

    #[test]
    fn test_outside_is_first_tag() {
        let model = PerceptronTrainer::with_iterations(1)
            .train(&corpus(), &ConfigSettings::default())
            .unwrap();
        assert_eq!(model.tags()[0], "O");
        assert!(model.tags().contains(&"I-ORG".to_string()));
    }

    #[test]
    fn test_untrained_model_tags_nothing() {
        let model = PerceptronModel::default();
        let tokens: Vec<String> = vec!["John".into(), "Paris".into()];
        assert!(model.tag(&tokens).unwrap().is_empty());
    }

    #[test]
    fn test_empty_corpus_is_training_failure() {
        let err = PerceptronTrainer::default()
            .train(&[], &ConfigSettings::default())
            .unwrap_err();
        assert!(matches!(err, Error::Training(_)));
    }

    #[test]
    fn test_iterations_from_settings() {
        let settings = ConfigSettings::from_pairs([("Iterations", "zero")]);
        let err = PerceptronTrainer::default().train(&corpus(), &settings).unwrap_err();
        assert!(err.is_configuration());
        assert!(PerceptronTrainer::default().validate(&settings).unwrap_err().is_configuration());
        // Épocas explícitas dispensam o parâmetro
        assert!(PerceptronTrainer::with_iterations(2).validate(&settings).is_ok());
    }
}
