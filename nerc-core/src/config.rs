//! # Configuração da Execução
//!
//! [`ConfigSettings`] é um mapa ordenado de chaves para valores textuais, carregado
//! uma única vez de um arquivo de parâmetros no estilo *Java properties*:
//!
//! ```text
//! # comentário
//! Language=en
//! TrainSet=data/train.conll
//! CorpusFormat=conll03
//! CrossEval=0:100
//! Types=PER,LOC
//! ```
//!
//! Depois de construído, o valor é imutável e passado por referência a todos os
//! componentes; não existe configuração global.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::corpus::CorpusFormat;
use crate::error::{Error, Result};

pub const LANGUAGE: &str = "Language";
pub const TRAIN_SET: &str = "TrainSet";
pub const TEST_SET: &str = "TestSet";
pub const DEV_SET: &str = "DevSet";
pub const CROSS_EVAL: &str = "CrossEval";
pub const TYPES: &str = "Types";
pub const CORPUS_FORMAT: &str = "CorpusFormat";
pub const OUTPUT_FORMAT: &str = "OutputFormat";
pub const OUTPUT_MODEL: &str = "OutputModel";
pub const ITERATIONS: &str = "Iterations";

/// Épocas de treino do perceptron quando `Iterations` não é informado.
pub const DEFAULT_ITERATIONS: usize = 5;

/// Parâmetros da execução, na ordem em que aparecem no arquivo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSettings {
    entries: Vec<(String, String)>,
}

impl ConfigSettings {
    /// Constrói a partir de pares chave/valor; chaves repetidas ficam com o último valor.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut settings = Self::default();
        for (key, value) in pairs {
            settings.insert(key.into(), value.into());
        }
        settings
    }

    /// Lê um arquivo de parâmetros do disco.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!(
                "não foi possível ler o arquivo de parâmetros {}: {e}",
                path.display()
            ))
        })?;
        let settings = Self::from_properties(&text);
        tracing::debug!(path = %path.display(), keys = settings.len(), "parâmetros carregados");
        Ok(settings)
    }

    /// Interpreta o conteúdo de um arquivo *properties*.
    ///
    /// - Linhas vazias e linhas iniciadas por `#` ou `!` são ignoradas.
    /// - A chave termina no primeiro `=`, `:` ou espaço; o valor é o restante, aparado.
    pub fn from_properties(text: &str) -> Self {
        let mut settings = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let split_at = line
                .find(|c: char| c == '=' || c == ':' || c.is_whitespace())
                .unwrap_or(line.len());
            let (key, rest) = line.split_at(split_at);
            let rest = rest.trim_start();
            let value = rest
                .strip_prefix('=')
                .or_else(|| rest.strip_prefix(':'))
                .unwrap_or(rest)
                .trim();
            settings.insert(key.to_string(), value.to_string());
        }
        settings
    }

    fn insert(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Valor presente e não vazio.
    pub fn optional(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Valor obrigatório; a ausência é um erro de configuração.
    pub fn required(&self, key: &str) -> Result<&str> {
        self.optional(key)
            .ok_or_else(|| Error::configuration(format!("o parâmetro {key} é obrigatório")))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn language(&self) -> Result<&str> {
        self.required(LANGUAGE)
    }

    /// Caminho de um conjunto de dados (`TrainSet`, `TestSet`, `DevSet`).
    pub fn data_set(&self, key: &str) -> Result<PathBuf> {
        self.required(key).map(PathBuf::from)
    }

    pub fn corpus_format(&self) -> Result<CorpusFormat> {
        self.required(CORPUS_FORMAT)?.parse()
    }

    /// Formato de saída do comando `tag`; `native` quando não configurado.
    pub fn output_format(&self) -> Result<CorpusFormat> {
        match self.optional(OUTPUT_FORMAT) {
            Some(value) => value.parse(),
            None => Ok(CorpusFormat::Native),
        }
    }

    /// Tipos de entidade permitidos (`Types`), separados por vírgula.
    ///
    /// `None` quando a chave não existe. Uma lista vazia é devolvida como está
    /// e rejeitada pelo filtro de tipos.
    pub fn allowed_types(&self) -> Option<Vec<String>> {
        self.get(TYPES).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    /// Partição de validação cruzada (`CrossEval`), se configurada.
    pub fn cross_eval(&self) -> Option<Result<FoldPartition>> {
        self.get(CROSS_EVAL).map(FoldPartition::from_str)
    }

    /// Caminho do modelo de saída; sem `OutputModel`, usa o nome do arquivo de
    /// parâmetros com extensão `.bin`.
    pub fn output_model(&self, params_path: &Path) -> PathBuf {
        match self.optional(OUTPUT_MODEL) {
            Some(path) => PathBuf::from(path),
            None => {
                let stem = params_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "model".to_string());
                PathBuf::from(format!("{stem}.bin"))
            }
        }
    }

    /// Número de épocas de treino (`Iterations`).
    pub fn iterations(&self) -> Result<usize> {
        match self.optional(ITERATIONS) {
            Some(value) => value
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    Error::configuration(format!("{ITERATIONS} deve ser um inteiro positivo, recebido '{value}'"))
                }),
            None => Ok(DEFAULT_ITERATIONS),
        }
    }
}

/// Intervalo `[start, end)` de índices reservado como subconjunto de avaliação de um fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldPartition {
    pub start: usize,
    pub end: usize,
}

impl FoldPartition {
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start >= end {
            return Err(Error::configuration(format!(
                "{CROSS_EVAL}: o início ({start}) deve ser menor que o fim ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end).contains(&index)
    }
}

fn range_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[ :-]").expect("regex válida"))
}

/// Aceita `"<início>:<fim>"`, `"<início>-<fim>"` ou `"<início> <fim>"`.
impl FromStr for FoldPartition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = range_separator().split(s.trim()).collect();
        let [start, end] = parts.as_slice() else {
            return Err(Error::configuration(format!(
                "{CROSS_EVAL} deve ter exatamente dois inteiros, recebido '{s}'"
            )));
        };
        let parse = |part: &str| {
            part.parse::<usize>().map_err(|_| {
                Error::configuration(format!("{CROSS_EVAL}: '{part}' não é um inteiro não negativo"))
            })
        };
        Self::new(parse(*start)?, parse(*end)?)
    }
}

impl fmt::Display for FoldPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}
