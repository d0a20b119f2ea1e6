//! Subcomandos e argumentos da linha de comando.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use nerc_core::ReportMode;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Treina um modelo (execução única ou fold de validação cruzada)
    Train(TrainArgs),

    /// Avalia um modelo treinado ou uma predição salva contra o TestSet
    Eval(EvalArgs),

    /// Etiqueta um corpus tokenizado com um modelo treinado
    Tag(TagArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Arquivo de parâmetros (Language, TrainSet, CorpusFormat, ...)
    #[arg(short, long)]
    pub params: PathBuf,
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    #[arg(short, long)]
    pub params: PathBuf,

    /// Corpus já etiquetado a comparar com o TestSet, sem usar modelo
    #[arg(long)]
    pub prediction: Option<PathBuf>,

    /// brief, detailed ou error
    #[arg(long, default_value = "detailed")]
    pub eval_report: ReportMode,

    /// Imprime o relatório como JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TagArgs {
    #[arg(short, long)]
    pub params: PathBuf,

    /// Corpus de entrada; stdin quando omitido
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}
