//! # Pipeline de Etiquetagem
//!
//! Aplica um modelo treinado a um corpus tokenizado e reescreve cada amostra com
//! as entidades previstas:
//!
//! 1. **Entrada**: amostras lidas no `CorpusFormat` configurado (arquivo ou stdin).
//! 2. **Etiquetagem**: o [`NameFinder`] devolve os spans de cada sentença; as
//!    anotações de entrada, se existirem, são descartadas.
//! 3. **Filtro**: com `Types` configurado, só os tipos permitidos são mantidos.
//! 4. **Saída**: cada amostra é escrita no `OutputFormat` configurado.

use std::io::{BufRead, Write};

use crate::config::ConfigSettings;
use crate::corpus::{format_sample, CorpusFormat, CorpusReader, CorpusSample};
use crate::error::Result;
use crate::filter::AllowedTypes;
use crate::tagger::NameFinder;

/// Etiqueta cada amostra e escreve o resultado. Devolve o número de amostras.
pub fn tag_corpus<M, I, W>(
    model: &M,
    samples: I,
    allowed: Option<&AllowedTypes>,
    output_format: CorpusFormat,
    sink: &mut W,
) -> Result<usize>
where
    M: NameFinder + ?Sized,
    I: IntoIterator<Item = Result<CorpusSample>>,
    W: Write + ?Sized,
{
    let mut count = 0;
    for sample in samples {
        let sample = sample?;
        let mut spans = model.tag(&sample.tokens)?;
        if let Some(allowed) = allowed {
            spans = allowed.filter_spans(&spans);
        }
        let tagged = sample.with_spans(spans);
        sink.write_all(format_sample(&tagged, output_format).as_bytes())?;
        count += 1;
    }
    sink.flush()?;
    Ok(count)
}

/// Etiqueta uma entrada usando `Language`, `CorpusFormat`, `OutputFormat` e `Types`.
pub fn tag_input<M, R, W>(
    model: &M,
    settings: &ConfigSettings,
    source_name: &str,
    input: R,
    sink: &mut W,
) -> Result<usize>
where
    M: NameFinder + ?Sized,
    R: BufRead,
    W: Write + ?Sized,
{
    let language = settings.language()?;
    let input_format = settings.corpus_format()?;
    let output_format = settings.output_format()?;
    let allowed = settings.allowed_types().map(AllowedTypes::new).transpose()?;

    let reader = CorpusReader::new(input, source_name, language, input_format);
    let count = tag_corpus(model, reader, allowed.as_ref(), output_format, sink)?;
    tracing::info!(samples = count, input = %input_format, output = %output_format, "corpus etiquetado");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    /// Marca como `LOC` todo token "Paris" e como `PER` todo token "John".
    struct LookupModel;

    impl NameFinder for LookupModel {
        fn tag(&self, tokens: &[String]) -> Result<Vec<Span>> {
            Ok(tokens
                .iter()
                .enumerate()
                .filter_map(|(i, t)| match t.as_str() {
                    "John" => Some(Span::new(i, i + 1, "PER")),
                    "Paris" => Some(Span::new(i, i + 1, "LOC")),
                    _ => None,
                })
                .collect())
        }
    }

    #[test]
    fn test_tag_native_to_conll02() {
        let settings = ConfigSettings::from_pairs([
            ("Language", "en"),
            ("CorpusFormat", "native"),
            ("OutputFormat", "conll02"),
        ]);
        let mut out = Vec::new();
        let count = tag_input(&LookupModel, &settings, "stdin", "John lives in Paris\n".as_bytes(), &mut out).unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "John\tB-PER\nlives\tO\nin\tO\nParis\tB-LOC\n\n"
        );
    }

    #[test]
    fn test_input_annotations_replaced_and_filtered() {
        let settings = ConfigSettings::from_pairs([("Language", "en"), ("CorpusFormat", "native"), ("Types", "LOC")]);
        let mut out = Vec::new();
        tag_input(
            &LookupModel,
            &settings,
            "stdin",
            "<START:ORG> John <END> lives in Paris\n".as_bytes(),
            &mut out,
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "John lives in <START:LOC> Paris <END>\n");
    }

    #[test]
    fn test_unknown_output_format_rejected() {
        let settings = ConfigSettings::from_pairs([("Language", "en"), ("CorpusFormat", "native"), ("OutputFormat", "naf")]);
        let err = tag_input(&LookupModel, &settings, "stdin", "x\n".as_bytes(), &mut Vec::<u8>::new()).unwrap_err();
        assert!(err.is_configuration());
    }
}
