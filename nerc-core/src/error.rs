//! # Erros do Motor de Avaliação
//!
//! Todos os erros são fatais: nenhum é recuperado silenciosamente. Eles sobem até
//! a camada de linha de comando, que os reporta e encerra com código diferente de zero.

use thiserror::Error;

/// Tipo de resultado usado em todo o crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Erros possíveis durante leitura de corpora, treino e avaliação.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Configuração inválida: detectada antes de qualquer leitura de corpus ou treino.
    #[error("Erro de configuração: {0}")]
    Configuration(String),

    /// Fonte do corpus ilegível ou mal formada. Uma única amostra ruim aborta a execução.
    #[error("Erro de leitura do corpus {source_name} (linha {line}): {message}")]
    CorpusRead {
        source_name: String,
        line: usize,
        message: String,
    },

    /// Spans de uma amostra violam as invariantes (vazio, fora da sentença ou sobreposto).
    #[error("Amostra inválida: {0}")]
    InvalidSample(String),

    /// Os dois corpora comparados têm número diferente de amostras.
    #[error("Corpora de tamanhos diferentes: referência com {reference} amostras, predição com {prediction}")]
    LengthMismatch { reference: usize, prediction: usize },

    /// O treinador externo falhou.
    #[error("Falha no treinamento: {0}")]
    Training(String),

    #[error("Erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    /// Falha ao (de)serializar um modelo.
    #[error("Erro no modelo serializado: {0}")]
    Model(#[from] serde_json::Error),
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn invalid_sample(msg: impl Into<String>) -> Self {
        Error::InvalidSample(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Error::Training(msg.into())
    }

    pub fn corpus_read(source_name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Error::CorpusRead {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }

    /// Indica se o erro é de configuração (útil para a CLI e para testes).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}
