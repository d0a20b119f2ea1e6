//! # Spans de Entidades
//!
//! Um span é um intervalo contíguo de tokens rotulado com um tipo de entidade.
//! Os índices são offsets de token em intervalo semiaberto: `start` inclusivo e
//! `end` exclusivo.
//!
//! Este módulo também converte entre spans e a codificação BIO token a token,
//! usada pelos leitores CoNLL e pelo etiquetador perceptron.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tagger::Tag;

/// Representa um span (intervalo) de tokens com um tipo associado.
///
/// # Exemplo
/// Em "John lives in Paris", a entidade "Paris":
/// `Span { start: 3, end: 4, label: "LOC" }`
///
/// A ordem derivada (`start`, `end`, `label`) é a ordem de leitura na sentença.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Índice do token inicial (inclusivo)
    pub start: usize,
    /// Índice do token final (exclusivo)
    pub end: usize,
    /// Tipo da entidade (ex: "PER", "ORG")
    pub label: String,
}

impl Span {
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.start, self.end, self.label)
    }
}

/// Converte uma sequência de tags BIO em spans.
///
/// Máquina de estados do esquema BIO:
/// - `B-X` fecha o span aberto e abre um novo do tipo X.
/// - `I-X` continua o span aberto se for do mesmo tipo; caso contrário abre um novo
///   (cobre o IOB1 do CoNLL-2003, onde entidades podem começar com `I-`).
/// - `O` fecha o span aberto.
///
/// # Exemplo
/// `[O, B-PER, I-PER, O, B-LOC]` -> `[(1, 3, PER), (4, 5, LOC)]`
pub fn bio_to_spans(tags: &[Tag]) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut open: Option<(usize, &str)> = None;

    for (i, tag) in tags.iter().enumerate() {
        match tag {
            Tag::Begin(label) => {
                if let Some((start, current)) = open.take() {
                    spans.push(Span::new(start, i, current));
                }
                open = Some((i, label.as_str()));
            }
            Tag::Inside(label) => match open {
                Some((_, current)) if current == label.as_str() => {}
                _ => {
                    if let Some((start, current)) = open.take() {
                        spans.push(Span::new(start, i, current));
                    }
                    open = Some((i, label.as_str()));
                }
            },
            Tag::Outside => {
                if let Some((start, current)) = open.take() {
                    spans.push(Span::new(start, i, current));
                }
            }
        }
    }

    // Fecha último span se aberto
    if let Some((start, current)) = open {
        spans.push(Span::new(start, tags.len(), current));
    }

    spans
}

/// Converte spans em tags BIO (IOB2) para uma sentença de `len` tokens.
///
/// Spans fora dos limites da sentença são truncados.
pub fn spans_to_bio(len: usize, spans: &[Span]) -> Vec<Tag> {
    let mut tags = vec![Tag::Outside; len];
    for span in spans {
        let end = span.end.min(len);
        if span.start >= end {
            continue;
        }
        tags[span.start] = Tag::Begin(span.label.clone());
        for tag in tags.iter_mut().take(end).skip(span.start + 1) {
            *tag = Tag::Inside(span.label.clone());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(labels: &[&str]) -> Vec<Tag> {
        labels.iter().map(|l| Tag::from_label(l).unwrap()).collect()
    }

    #[test]
    fn test_bio_to_spans() {
        let spans = bio_to_spans(&tags(&["O", "B-PER", "I-PER", "O", "B-LOC"]));
        assert_eq!(spans, vec![Span::new(1, 3, "PER"), Span::new(4, 5, "LOC")]);
    }

    #[test]
    fn test_adjacent_begin_splits_entities() {
        let spans = bio_to_spans(&tags(&["B-PER", "B-PER", "I-PER"]));
        assert_eq!(spans, vec![Span::new(0, 1, "PER"), Span::new(1, 3, "PER")]);
    }

    #[test]
    fn test_iob1_inside_opens_entity() {
        let spans = bio_to_spans(&tags(&["I-ORG", "I-ORG", "O", "I-LOC", "I-PER"]));
        assert_eq!(
            spans,
            vec![
                Span::new(0, 2, "ORG"),
                Span::new(3, 4, "LOC"),
                Span::new(4, 5, "PER"),
            ]
        );
    }

    #[test]
    fn test_spans_to_bio() {
        let bio = spans_to_bio(4, &[Span::new(0, 1, "PER"), Span::new(2, 4, "LOC")]);
        let labels: Vec<String> = bio.iter().map(Tag::label).collect();
        assert_eq!(labels, vec!["B-PER", "O", "B-LOC", "I-LOC"]);
        assert_eq!(bio_to_spans(&bio), vec![Span::new(0, 1, "PER"), Span::new(2, 4, "LOC")]);
    }
}
