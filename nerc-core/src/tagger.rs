//! # Esquema de Tags BIO e Capacidades de Etiquetagem
//!
//! Define o esquema de anotação **BIO** (Beginning-Inside-Outside) e as duas
//! interfaces estreitas pelas quais o motor de avaliação enxerga o aprendizado
//! estatístico:
//!
//! - [`NameFinder`]: um modelo treinado que devolve spans para uma sequência de tokens.
//! - [`SequenceTagger`]: o algoritmo que ajusta um [`NameFinder`] a partir de amostras anotadas.
//!
//! ## Esquema BIO
//!
//! - `B-TAG`: Begin: primeiro token de uma entidade
//! - `I-TAG`: Inside: tokens subsequentes da mesma entidade
//! - `O`: Outside: não é parte de nenhuma entidade
//!
//! Os tipos de entidade são abertos (qualquer rótulo do corpus), ao contrário de
//! um conjunto fixo de categorias.

use serde::{Deserialize, Serialize};

use crate::config::ConfigSettings;
use crate::corpus::CorpusSample;
use crate::error::Result;
use crate::span::Span;

/// Tag BIO aplicada a um token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// **Begin**: Marca o INÍCIO de uma entidade. Ex: **New** (B-LOC) York.
    Begin(String),
    /// **Inside**: Marca a CONTINUAÇÃO de uma entidade. Ex: New **York** (I-LOC).
    Inside(String),
    /// **Outside**: O token não faz parte de nenhuma entidade.
    Outside,
}

impl Tag {
    /// Representação textual da tag (ex: "B-PER", "I-ORG", "O")
    pub fn label(&self) -> String {
        match self {
            Tag::Begin(t) => format!("B-{t}"),
            Tag::Inside(t) => format!("I-{t}"),
            Tag::Outside => "O".to_string(),
        }
    }

    /// Parseia uma tag a partir de string (ex: "B-PER" → Begin("PER")).
    ///
    /// Retorna `None` para rótulos sem prefixo BIO ou com tipo vazio.
    pub fn from_label(s: &str) -> Option<Self> {
        if s == "O" {
            return Some(Tag::Outside);
        }
        let (prefix, entity_type) = s.split_once('-')?;
        if entity_type.is_empty() {
            return None;
        }
        match prefix {
            "B" => Some(Tag::Begin(entity_type.to_string())),
            "I" => Some(Tag::Inside(entity_type.to_string())),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Um modelo treinado: dada uma sentença tokenizada, devolve as entidades
/// encontradas em ordem, sem sobreposição.
pub trait NameFinder {
    fn tag(&self, tokens: &[String]) -> Result<Vec<Span>>;
}

/// O algoritmo de aprendizado, opaco para o motor de avaliação.
///
/// Trocar de algoritmo não exige mexer no cálculo de métricas nem na validação cruzada.
pub trait SequenceTagger {
    type Model: NameFinder;

    /// Confere os parâmetros próprios do algoritmo. Chamado antes de qualquer leitura de corpus.
    fn validate(&self, _settings: &ConfigSettings) -> Result<()> {
        Ok(())
    }

    /// Ajusta um modelo às amostras. Uma falha aqui aborta a execução inteira.
    fn train(&self, samples: &[CorpusSample], settings: &ConfigSettings) -> Result<Self::Model>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_labels() {
        assert_eq!(Tag::Outside.label(), "O");
        assert_eq!(Tag::Begin("PER".into()).label(), "B-PER");
        assert_eq!(Tag::Inside("LOC".into()).label(), "I-LOC");
    }

    #[test]
    fn test_tag_from_label() {
        assert_eq!(Tag::from_label("O"), Some(Tag::Outside));
        assert_eq!(Tag::from_label("B-PER"), Some(Tag::Begin("PER".into())));
        assert_eq!(Tag::from_label("I-MISC"), Some(Tag::Inside("MISC".into())));
        // Tipos com hífen mantêm o restante do rótulo
        assert_eq!(Tag::from_label("B-GPE-LOC"), Some(Tag::Begin("GPE-LOC".into())));
    }

    #[test]
    fn test_invalid_labels() {
        assert_eq!(Tag::from_label("PER"), None);
        assert_eq!(Tag::from_label("B-"), None);
        assert_eq!(Tag::from_label("X-PER"), None);
    }
}
