//! # Persistência de Modelos
//!
//! Modelos treinados são gravados como JSON com `serde_json`. Qualquer modelo
//! serializável serve; o CLI usa [`crate::perceptron::PerceptronModel`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Grava o modelo em `path`, criando os diretórios que faltarem.
pub fn save_model<M: Serialize>(model: &M, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, model)?;
    writer.flush()?;
    tracing::debug!(path = %path.display(), "modelo gravado");
    Ok(())
}

/// Lê um modelo gravado por [`save_model`].
pub fn load_model<M: DeserializeOwned>(path: impl AsRef<Path>) -> Result<M> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let model = serde_json::from_reader(reader)?;
    tracing::debug!(path = %path.display(), "modelo carregado");
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSettings;
    use crate::corpus::CorpusSample;
    use crate::error::Error;
    use crate::perceptron::{PerceptronModel, PerceptronTrainer};
    use crate::span::Span;
    use crate::tagger::{NameFinder, SequenceTagger};

    #[test]
    fn test_saved_model_tags_identically() {
        let tokens: Vec<String> = ["John", "lives", "in", "Paris"].iter().map(|s| s.to_string()).collect();
        let sample = CorpusSample::new(tokens.clone(), vec![Span::new(0, 1, "PER"), Span::new(3, 4, "LOC")]).unwrap();
        let model = PerceptronTrainer::with_iterations(3)
            .train(&[sample], &ConfigSettings::default())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modelos").join("en.bin");
        save_model(&model, &path).unwrap();
        let loaded: PerceptronModel = load_model(&path).unwrap();
        assert_eq!(loaded.tags(), model.tags());
        assert_eq!(loaded.feature_count(), model.feature_count());
        assert_eq!(loaded.tag(&tokens).unwrap(), model.tag(&tokens).unwrap());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_model::<PerceptronModel>(dir.path().join("nada.bin")).unwrap_err();
        assert!(matches!(missing, Error::Io(_)));

        let garbage = dir.path().join("lixo.bin");
        std::fs::write(&garbage, "não é json").unwrap();
        assert!(matches!(load_model::<PerceptronModel>(&garbage).unwrap_err(), Error::Model(_)));
    }
}
