//! semvec - word-vector similarity CLI
//!
//! Main entry point for the semvec command-line tool.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use serde::Serialize;
use std::io;
use std::process::ExitCode;

use semvec::cli::{Cli, Commands, ConfigArgs, OutputFormat, SimilarityArgs, TopArgs};
use semvec::logging::{LogConfig, init_logging};
use semvec::{Config, Engine, SemvecError, format_error, format_similarity};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_flags(cli.quiet, cli.verbose, cli.log_level));

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", render_error(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Config(args) => cmd_config(cli, args),
        Commands::Completions(args) => {
            generate(args.shell, &mut Cli::command(), "semvec", &mut io::stdout());
            Ok(())
        }
        Commands::Similarity(args) => cmd_similarity(cli, args).await,
        Commands::Top(args) => cmd_top(cli, args).await,
        Commands::Words => cmd_words(cli).await,
        Commands::Stats => cmd_stats(cli).await,
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = &cli.dictionary {
        config.dictionary.dictionary_filename = Some(path.clone());
    }
    if let Some(path) = &cli.vectors {
        config.dictionary.word_vector_filename = Some(path.clone());
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache.directory.clone_from(dir);
    }
    Ok(config)
}

async fn open_engine(cli: &Cli) -> Result<Engine> {
    let config = load_config(cli)?;
    Ok(Engine::build(&config).await?)
}

fn print_json<T: Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    let out = if format == OutputFormat::JsonPretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

#[derive(Serialize)]
struct SimilarityOutput<'a> {
    first: &'a str,
    second: &'a str,
    similarity: Option<f64>,
}

async fn cmd_similarity(cli: &Cli, args: &SimilarityArgs) -> Result<()> {
    let engine = open_engine(cli).await?;
    let score = engine.similarity(&args.first, &args.second).await?;

    match cli.format {
        OutputFormat::Text => println!("{}", format_similarity(score)),
        format => print_json(
            format,
            &SimilarityOutput {
                first: &args.first,
                second: &args.second,
                similarity: score,
            },
        )?,
    }
    Ok(())
}

async fn cmd_top(cli: &Cli, args: &TopArgs) -> Result<()> {
    let engine = open_engine(cli).await?;
    let Some(list) = engine.top_similarity(&args.word, args.count).await? else {
        match cli.format {
            OutputFormat::Text => println!("{} '{}'", "unknown word".yellow(), args.word),
            format => print_json(format, &serde_json::Value::Null)?,
        }
        return Ok(());
    };

    match cli.format {
        OutputFormat::Text => {
            let width = list.len().to_string().len();
            for (rank, entry) in list.iter().enumerate() {
                println!(
                    "{:>width$}  {:.5}  {}",
                    (rank + 1).to_string().dimmed(),
                    entry.similarity,
                    entry.word
                );
            }
            if args.milestones {
                let m = list.milestones();
                println!();
                for (label, value) in [
                    ("1st", m.nearest),
                    ("10th", m.tenth),
                    ("100th", m.hundredth),
                    ("1000th", m.thousandth),
                ] {
                    println!("{label:>6}: {}", format_similarity(value));
                }
            }
        }
        format if args.milestones => print_json(
            format,
            &serde_json::json!({ "neighbors": list, "milestones": list.milestones() }),
        )?,
        format => print_json(format, &list)?,
    }
    Ok(())
}

async fn cmd_words(cli: &Cli) -> Result<()> {
    let engine = open_engine(cli).await?;
    match cli.format {
        OutputFormat::Text => {
            use std::io::Write;
            let mut out = io::BufWriter::new(io::stdout().lock());
            for word in engine.word_list() {
                writeln!(out, "{word}")?;
            }
            out.flush()?;
        }
        format => print_json(format, &engine.word_list().collect::<Vec<_>>())?,
    }
    Ok(())
}

async fn cmd_stats(cli: &Cli) -> Result<()> {
    let engine = open_engine(cli).await?;
    let stats = engine.stats();
    match cli.format {
        OutputFormat::Text => {
            println!("{}", "Word vector index".bold().cyan());
            println!("  Indexed words:    {}", stats.indexed_words);
            println!("  Records scanned:  {}", stats.records_scanned);
            println!("  Declared records: {}", stats.declared_records);
            println!("  Dimension:        {}", stats.dimension);
            println!("  File size:        {} bytes", stats.file_len);
            println!("  Max neighbours:   {}", stats.max_neighbors);
            println!(
                "  Cache directory:  {}",
                engine.neighbors().cache_store().root().display()
            );
        }
        format => print_json(format, &stats)?,
    }
    Ok(())
}

fn cmd_config(cli: &Cli, args: &ConfigArgs) -> Result<()> {
    if args.init {
        print!("{}", Config::default_config_content());
        return Ok(());
    }
    let config = load_config(cli)?;
    match cli.format {
        OutputFormat::Text => print!("{}", toml::to_string_pretty(&config)?),
        format => print_json(format, &config)?,
    }
    Ok(())
}

fn render_error(error: &anyhow::Error) -> String {
    match error.downcast_ref::<SemvecError>() {
        Some(e) => {
            let suggestions: Vec<&str> = e.suggestion().into_iter().collect();
            let title = if e.is_startup_fatal() {
                "Failed to build word vector index"
            } else {
                "Lookup failed"
            };
            format_error(title, &e.to_string(), &suggestions)
        }
        None => format_error("Error", &format!("{error:#}"), &[]),
    }
}
