//! # Corpora Anotados
//!
//! Uma [`CorpusSample`] é uma sentença tokenizada com suas entidades. Os corpora
//! são lidos de forma preguiçosa e em passada única por [`CorpusReader`], que
//! implementa `Iterator<Item = Result<CorpusSample>>`. Um fluxo esgotado não
//! volta ao início: para iterar de novo, reabra a fonte com [`open`].
//!
//! ## Formatos Suportados
//!
//! | Formato   | Layout                                                           |
//! |-----------|------------------------------------------------------------------|
//! | `native`  | uma sentença por linha: `<START:PER> John <END> lives in ...`    |
//! | `conll02` | `token tag` por linha, linha em branco separa sentenças (BIO)    |
//! | `conll03` | `token pos chunk tag` por linha; aceita IOB1 e IOB2              |
//!
//! Nos formatos CoNLL a tag é sempre a última coluna e linhas `-DOCSTART-` são ignoradas.
//! No formato `native` linhas em branco separam documentos e não geram amostras.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::span::{bio_to_spans, spans_to_bio, Span};
use crate::tagger::Tag;

/// Fluxo preguiçoso de amostras, consumido uma única vez.
pub type CorpusSampleStream<'a> = Box<dyn Iterator<Item = Result<CorpusSample>> + 'a>;

/// Uma sentença anotada: tokens e entidades.
///
/// Invariantes: cada span tem `start < end <= tokens.len()`, os spans não se
/// sobrepõem e estão ordenados por `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSample {
    pub tokens: Vec<String>,
    pub spans: Vec<Span>,
}

impl CorpusSample {
    /// Cria uma amostra validando as invariantes dos spans (que são ordenados).
    pub fn new(tokens: Vec<String>, mut spans: Vec<Span>) -> Result<Self> {
        spans.sort();
        let mut previous_end = 0;
        for span in &spans {
            if span.start >= span.end {
                return Err(Error::invalid_sample(format!("span vazio ou invertido {span}")));
            }
            if span.end > tokens.len() {
                return Err(Error::invalid_sample(format!(
                    "span {span} ultrapassa os {} tokens da sentença",
                    tokens.len()
                )));
            }
            if span.start < previous_end {
                return Err(Error::invalid_sample(format!("span {span} sobrepõe a entidade anterior")));
            }
            previous_end = span.end;
        }
        Ok(Self { tokens, spans })
    }

    /// Reconstrói a amostra a partir de tags BIO alinhadas aos tokens.
    pub fn from_tags(tokens: Vec<String>, tags: &[Tag]) -> Self {
        let spans = bio_to_spans(tags);
        Self { tokens, spans }
    }

    /// Mesma sentença com outro conjunto de entidades.
    pub fn with_spans(&self, spans: Vec<Span>) -> Self {
        Self {
            tokens: self.tokens.clone(),
            spans,
        }
    }

    /// Codificação BIO (IOB2) das entidades, um rótulo por token.
    pub fn tags(&self) -> Vec<Tag> {
        spans_to_bio(self.tokens.len(), &self.spans)
    }
}

/// Formato de arquivo do corpus.
///
/// Cada variante seleciona uma estratégia de leitura atrás da mesma interface [`open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusFormat {
    /// Formato do name finder do OpenNLP, com marcadores `<START:tipo>` e `<END>`.
    Native,
    /// CoNLL-2002: duas colunas, tags BIO.
    Conll02,
    /// CoNLL-2003: quatro colunas (token, POS, chunk, tag).
    Conll03,
}

impl CorpusFormat {
    pub fn name(&self) -> &'static str {
        match self {
            CorpusFormat::Native => "native",
            CorpusFormat::Conll02 => "conll02",
            CorpusFormat::Conll03 => "conll03",
        }
    }
}

impl FromStr for CorpusFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "native" => Ok(CorpusFormat::Native),
            "conll02" => Ok(CorpusFormat::Conll02),
            "conll03" => Ok(CorpusFormat::Conll03),
            other => Err(Error::configuration(format!(
                "formato de corpus desconhecido '{other}' (use native, conll02 ou conll03)"
            ))),
        }
    }
}

impl fmt::Display for CorpusFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Abre um corpus em disco.
pub fn open(path: impl AsRef<Path>, language: &str, format: CorpusFormat) -> Result<CorpusReader<BufReader<File>>> {
    let path = path.as_ref();
    let source_name = path.display().to_string();
    let file = File::open(path).map_err(|e| Error::corpus_read(&source_name, 0, e.to_string()))?;
    tracing::debug!(source = %source_name, language, format = %format, "abrindo corpus");
    Ok(CorpusReader::new(BufReader::new(file), source_name, language, format))
}

/// Leitor preguiçoso de amostras sobre qualquer `BufRead`.
pub struct CorpusReader<R> {
    lines: Lines<R>,
    source_name: String,
    language: String,
    format: CorpusFormat,
    line_no: usize,
    samples_read: usize,
    finished: bool,
}

impl<R: BufRead> CorpusReader<R> {
    pub fn new(reader: R, source_name: impl Into<String>, language: &str, format: CorpusFormat) -> Self {
        Self {
            lines: reader.lines(),
            source_name: source_name.into(),
            language: language.to_string(),
            format,
            line_no: 0,
            samples_read: 0,
            finished: false,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.next() {
            Some(Ok(line)) => {
                self.line_no += 1;
                Ok(Some(line))
            }
            Some(Err(e)) => Err(self.error(e.to_string())),
            None => Ok(None),
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::corpus_read(&self.source_name, self.line_no, message)
    }

    fn read_native(&mut self) -> Result<Option<CorpusSample>> {
        loop {
            let Some(line) = self.next_line()? else {
                return Ok(None);
            };
            let line = line.trim();
            // Linha em branco: fronteira de documento
            if line.is_empty() {
                continue;
            }
            return self.parse_native(line).map(Some);
        }
    }

    fn parse_native(&self, line: &str) -> Result<CorpusSample> {
        let mut tokens = Vec::new();
        let mut spans = Vec::new();
        let mut open: Option<(usize, String)> = None;

        for piece in line.split_whitespace() {
            if let Some(marker) = piece.strip_prefix("<START") {
                if open.is_some() {
                    return Err(self.error("entidades aninhadas não são suportadas"));
                }
                let entity_type = match marker.strip_suffix('>') {
                    Some("") => "default".to_string(),
                    Some(rest) => match rest.strip_prefix(':') {
                        Some(t) if !t.is_empty() => t.to_string(),
                        _ => return Err(self.error(format!("marcador inválido '{piece}'"))),
                    },
                    None => return Err(self.error(format!("marcador inválido '{piece}'"))),
                };
                open = Some((tokens.len(), entity_type));
            } else if piece == "<END>" {
                let Some((start, entity_type)) = open.take() else {
                    return Err(self.error("<END> sem <START> correspondente"));
                };
                if start == tokens.len() {
                    return Err(self.error("entidade sem tokens"));
                }
                spans.push(Span::new(start, tokens.len(), entity_type));
            } else {
                tokens.push(piece.to_string());
            }
        }

        if open.is_some() {
            return Err(self.error("entidade não fechada no fim da linha"));
        }
        // Erros de invariante ganham a posição no arquivo
        CorpusSample::new(tokens, spans).map_err(|e| match e {
            Error::InvalidSample(message) => self.error(message),
            other => other,
        })
    }

    fn read_conll(&mut self) -> Result<Option<CorpusSample>> {
        let mut tokens = Vec::new();
        let mut tags = Vec::new();

        loop {
            let Some(line) = self.next_line()? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                if tokens.is_empty() {
                    continue;
                }
                break;
            }
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns[0] == "-DOCSTART-" {
                continue;
            }
            if columns.len() < 2 {
                return Err(self.error(format!("linha sem coluna de tag: '{line}'")));
            }
            let label = columns[columns.len() - 1];
            let tag = Tag::from_label(label).ok_or_else(|| self.error(format!("tag inválida '{label}'")))?;
            tokens.push(columns[0].to_string());
            tags.push(tag);
        }

        if tokens.is_empty() {
            return Ok(None);
        }
        Ok(Some(CorpusSample::from_tags(tokens, &tags)))
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = Result<CorpusSample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = match self.format {
            CorpusFormat::Native => self.read_native(),
            CorpusFormat::Conll02 | CorpusFormat::Conll03 => self.read_conll(),
        };
        match result {
            Ok(Some(sample)) => {
                self.samples_read += 1;
                Some(Ok(sample))
            }
            Ok(None) => {
                self.finished = true;
                tracing::debug!(
                    source = %self.source_name,
                    language = %self.language,
                    samples = self.samples_read,
                    "corpus esgotado"
                );
                None
            }
            Err(e) => {
                // Erro de leitura é fatal: o fluxo termina aqui
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Lê um fluxo inteiro para a memória, parando no primeiro erro.
pub fn read_all<I>(samples: I) -> Result<Vec<CorpusSample>>
where
    I: IntoIterator<Item = Result<CorpusSample>>,
{
    samples.into_iter().collect()
}

/// Renderiza uma amostra no formato pedido (com a quebra de linha final).
pub fn format_sample(sample: &CorpusSample, format: CorpusFormat) -> String {
    match format {
        CorpusFormat::Native => {
            let mut pieces = Vec::with_capacity(sample.tokens.len() + 2 * sample.spans.len());
            let mut spans = sample.spans.iter().peekable();
            let mut open_end = None;
            for (i, token) in sample.tokens.iter().enumerate() {
                if open_end == Some(i) {
                    pieces.push("<END>".to_string());
                    open_end = None;
                }
                if let Some(span) = spans.next_if(|s| s.start == i) {
                    pieces.push(format!("<START:{}>", span.label));
                    open_end = Some(span.end);
                }
                pieces.push(token.clone());
            }
            if open_end.is_some() {
                pieces.push("<END>".to_string());
            }
            let mut line = pieces.join(" ");
            line.push('\n');
            line
        }
        CorpusFormat::Conll02 | CorpusFormat::Conll03 => {
            let mut out = String::new();
            for (token, tag) in sample.tokens.iter().zip(sample.tags()) {
                if format == CorpusFormat::Conll03 {
                    out.push_str(&format!("{token}\t_\t_\t{tag}\n"));
                } else {
                    out.push_str(&format!("{token}\t{tag}\n"));
                }
            }
            out.push('\n');
            out
        }
    }
}

/// Escreve as amostras no formato pedido.
pub fn write_samples<'a, W: Write>(
    out: &mut W,
    samples: impl IntoIterator<Item = &'a CorpusSample>,
    format: CorpusFormat,
) -> Result<()> {
    for sample in samples {
        out.write_all(format_sample(sample, format).as_bytes())?;
    }
    Ok(())
}
