//! # Filtro de Tipos de Entidade
//!
//! Restringe as entidades de cada amostra a um conjunto de tipos permitidos.
//! Tokens e ordem das amostras são preservados; spans de outros tipos são
//! descartados, nunca renomeados. O mesmo filtro é aplicado, de forma
//! independente, à referência e à hipótese.

use std::collections::BTreeSet;

use crate::corpus::{CorpusSample, CorpusSampleStream};
use crate::error::{Error, Result};
use crate::span::Span;

/// Conjunto não vazio de tipos de entidade permitidos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedTypes {
    types: BTreeSet<String>,
}

impl AllowedTypes {
    /// Um conjunto vazio é erro de configuração.
    pub fn new<I, S>(types: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types: BTreeSet<String> = types.into_iter().map(Into::into).collect();
        if types.is_empty() {
            return Err(Error::configuration("o conjunto de tipos permitidos (Types) está vazio"));
        }
        Ok(Self { types })
    }

    pub fn contains(&self, label: &str) -> bool {
        self.types.contains(label)
    }

    /// Mantém apenas os spans de tipos permitidos.
    pub fn filter_spans(&self, spans: &[Span]) -> Vec<Span> {
        spans.iter().filter(|s| self.contains(&s.label)).cloned().collect()
    }

    pub fn filter_sample(&self, sample: CorpusSample) -> CorpusSample {
        let CorpusSample { tokens, spans } = sample;
        CorpusSample {
            tokens,
            spans: spans.into_iter().filter(|s| self.contains(&s.label)).collect(),
        }
    }
}

/// Adaptador preguiçoso: uma amostra filtrada por amostra lida, na mesma ordem.
///
/// Erros do fluxo de origem passam adiante sem alteração.
pub struct EntityTypeFilter<I> {
    upstream: I,
    allowed: AllowedTypes,
}

impl<I> EntityTypeFilter<I>
where
    I: Iterator<Item = Result<CorpusSample>>,
{
    pub fn new(upstream: I, allowed: AllowedTypes) -> Self {
        Self { upstream, allowed }
    }
}

impl<I> Iterator for EntityTypeFilter<I>
where
    I: Iterator<Item = Result<CorpusSample>>,
{
    type Item = Result<CorpusSample>;

    fn next(&mut self) -> Option<Self::Item> {
        self.upstream
            .next()
            .map(|sample| sample.map(|s| self.allowed.filter_sample(s)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.upstream.size_hint()
    }
}

/// Aplica o filtro apenas quando configurado.
pub fn maybe_filter<'a, I>(samples: I, allowed: Option<&AllowedTypes>) -> CorpusSampleStream<'a>
where
    I: Iterator<Item = Result<CorpusSample>> + 'a,
{
    match allowed {
        Some(allowed) => Box::new(EntityTypeFilter::new(samples, allowed.clone())),
        None => Box::new(samples),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(spans: Vec<Span>) -> CorpusSample {
        let tokens = (0..6).map(|i| format!("t{i}")).collect();
        CorpusSample::new(tokens, spans).unwrap()
    }

    #[test]
    fn test_empty_allowed_set_rejected() {
        let err = AllowedTypes::new(Vec::<String>::new()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_filter_drops_other_types() {
        let allowed = AllowedTypes::new(["PER"]).unwrap();
        let input = sample(vec![Span::new(0, 1, "PER"), Span::new(2, 4, "LOC")]);
        let output = allowed.filter_sample(input.clone());
        assert_eq!(output.tokens, input.tokens);
        assert_eq!(output.spans, vec![Span::new(0, 1, "PER")]);
    }

    #[test]
    fn test_stream_preserves_order_and_errors() {
        let allowed = AllowedTypes::new(["LOC"]).unwrap();
        let upstream = vec![
            Ok(sample(vec![Span::new(0, 1, "PER")])),
            Err(Error::corpus_read("x", 3, "ruim")),
            Ok(sample(vec![Span::new(1, 2, "LOC")])),
        ];
        let out: Vec<_> = EntityTypeFilter::new(upstream.into_iter(), allowed).collect();
        assert_eq!(out.len(), 3);
        assert!(out[0].as_ref().unwrap().spans.is_empty());
        assert!(out[1].is_err());
        assert_eq!(out[2].as_ref().unwrap().spans, vec![Span::new(1, 2, "LOC")]);
    }

    fn arb_spans() -> impl Strategy<Value = Vec<Span>> {
        prop::collection::vec(prop::sample::select(vec!["PER", "LOC", "ORG", "MISC"]), 0..6).prop_map(|labels| {
            labels
                .into_iter()
                .enumerate()
                .map(|(i, label)| Span::new(i, i + 1, label))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn test_filter_is_idempotent(spans in arb_spans(), keep in prop::sample::subsequence(vec!["PER", "LOC", "ORG"], 1..=3)) {
            let allowed = AllowedTypes::new(keep).unwrap();
            let once = allowed.filter_sample(sample(spans));
            let twice = allowed.filter_sample(once.clone());
            prop_assert_eq!(once, twice);
        }
    }
}
