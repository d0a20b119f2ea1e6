//! `nerc`: treino, validação cruzada, avaliação e etiquetagem de modelos NER

mod commands;

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use nerc_core::{
    evaluate_prediction_file, load_model, save_model, tag_input, AllowedTypes, ConfigSettings,
    CrossValidationTrainer, EvaluationReport, Evaluator, PerceptronModel, PerceptronTrainer,
};
use nerc_core::config::TEST_SET;
use tracing::info;
use tracing_subscriber::EnvFilter;

use commands::{Commands, EvalArgs, TagArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(name = "nerc", version, about = "Treina, avalia e aplica etiquetadores de entidades nomeadas")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    // Logs vão para stderr; relatórios e corpora etiquetados para stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Train(args) => train(args),
        Commands::Eval(args) => eval(args),
        Commands::Tag(args) => tag(args),
    }
}

fn load_settings(path: &Path) -> Result<ConfigSettings> {
    ConfigSettings::load(path).with_context(|| format!("parâmetros inválidos em {}", path.display()))
}

fn train(args: TrainArgs) -> Result<()> {
    let settings = load_settings(&args.params)?;
    let output_model = settings.output_model(&args.params);

    let mut trainer = CrossValidationTrainer::new(PerceptronTrainer::default(), &settings);
    let outcome = trainer.run().context("treinamento abortado")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Some(report) = &outcome.report {
        report.write_to(&mut out)?;
    }

    save_model(&outcome.model, &output_model)
        .with_context(|| format!("não foi possível gravar o modelo em {}", output_model.display()))?;
    info!(path = %output_model.display(), "modelo gravado");
    writeln!(out, "Wrote trained NERC model to {}", output_model.display())?;
    Ok(())
}

fn eval(args: EvalArgs) -> Result<()> {
    let settings = load_settings(&args.params)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let report = match &args.prediction {
        Some(prediction) => {
            let mut text = Vec::new();
            let report = evaluate_prediction_file(&settings, prediction, &mut text)
                .with_context(|| format!("falha ao comparar {}", prediction.display()))?;
            if !args.json {
                out.write_all(&text)?;
            }
            report
        }
        None => evaluate_model(&settings, &args, &mut out)?,
    };

    if args.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    }
    Ok(())
}

fn evaluate_model(settings: &ConfigSettings, args: &EvalArgs, out: &mut dyn Write) -> Result<EvaluationReport> {
    let model_path = settings.output_model(&args.params);
    let allowed = settings.allowed_types().map(AllowedTypes::new).transpose()?;
    let test_set = settings.data_set(TEST_SET)?;
    let reference = nerc_core::corpus::open(&test_set, settings.language()?, settings.corpus_format()?)?;

    let model: PerceptronModel = load_model(&model_path)
        .with_context(|| format!("não foi possível carregar o modelo {}", model_path.display()))?;
    info!(model = %model_path.display(), test_set = %test_set.display(), mode = %args.eval_report, "avaliando modelo");

    let evaluator = Evaluator::new(&model, args.eval_report).with_allowed_types(allowed);
    let report = evaluator.evaluate(reference)?;
    if !args.json {
        report.write_to(out)?;
    }
    Ok(report)
}

fn tag(args: TagArgs) -> Result<()> {
    let settings = load_settings(&args.params)?;
    let model_path = settings.output_model(&args.params);
    let model: PerceptronModel = load_model(&model_path)
        .with_context(|| format!("não foi possível carregar o modelo {}", model_path.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &args.input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("não foi possível abrir {}", path.display()))?;
            tag_input(&model, &settings, &path.display().to_string(), BufReader::new(file), &mut out)?;
        }
        None => {
            let stdin = io::stdin();
            tag_input(&model, &settings, "stdin", stdin.lock(), &mut out)?;
        }
    }
    Ok(())
}
