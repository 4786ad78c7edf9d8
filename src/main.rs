//! CLI entry point for `mboxgrams`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mboxgrams::config::{self, Config};
use mboxgrams::export::{write_tables, TableNames};
use mboxgrams::stats::{NgramCounter, RunStats};
use mboxgrams::walker::{walk_mailboxes, WalkOptions};

#[derive(Parser)]
#[command(
    name = "mboxgrams",
    version,
    about = "Count word unigrams and bigrams over the plaintext bodies of mbox archives",
    subcommand_negates_reqs = true,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// MBOX files to read (`.eml` files are read as single messages)
    #[arg(value_name = "MBOX_FILE", required = true)]
    files: Vec<PathBuf>,

    /// Log the byte offsets of every message (implies -v)
    #[arg(long)]
    offsets: bool,

    /// Directory for unigrams.tsv and bigrams.tsv
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 if cli.offsets => "info",
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match &cli.command {
        Some(Commands::Completions { shell }) => cmd_completions(*shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => cmd_count(&cli, &config),
    }
}

fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_path = config::log_file_path(config);
    let log_target = log_path.parent().zip(log_path.file_name());
    match log_target {
        Some((log_dir, log_name)) if std::fs::create_dir_all(log_dir).is_ok() => {
            let file_appender = tracing_appender::rolling::never(log_dir, log_name);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
        }
        _ => {
            // Fall back to stderr only
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
        }
    }
}

fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxgrams", &mut std::io::stdout());
    Ok(())
}

fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

fn cmd_count(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let options = WalkOptions::from_config(config, cli.offsets);
    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output.dir.clone());

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} Counting [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let mut counter = NgramCounter::new();

    let result = walk_mailboxes(
        &cli.files,
        &options,
        &mut counter,
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    );
    pb.finish_and_clear();
    let stats = result?;

    let (unigram_path, bigram_path) =
        write_tables(&output_dir, TableNames::from(&config.output), &counter)?;
    let elapsed = start.elapsed();

    let summary = Summary {
        files: &cli.files,
        stats: &stats,
        counter: &counter,
        unigram_path: &unigram_path,
        bigram_path: &bigram_path,
        elapsed,
    };
    if cli.json {
        print_summary_json(&summary)?;
    } else {
        print_summary_table(&summary);
    }
    Ok(())
}

struct Summary<'a> {
    files: &'a [PathBuf],
    stats: &'a RunStats,
    counter: &'a NgramCounter,
    unigram_path: &'a Path,
    bigram_path: &'a Path,
    elapsed: Duration,
}

fn print_summary_table(summary: &Summary<'_>) {
    use humansize::{format_size, BINARY};

    let stats = summary.stats;
    println!();
    for file in summary.files {
        println!("  {:<22} {}", "File", file.display());
    }
    println!(
        "  {:<22} {}",
        "Bytes scanned",
        format_size(stats.bytes_scanned, BINARY)
    );
    println!("  {:<22} {}", "Messages", stats.messages);
    println!(
        "  {:<22} {} ({:.1}%)",
        "Bodies counted",
        stats.bodies_decoded,
        if stats.messages == 0 {
            0.0
        } else {
            stats.bodies_decoded as f64 / stats.messages as f64 * 100.0
        }
    );
    println!("  {:<22} {}", "Without plaintext", stats.bodies_absent);
    if stats.unparseable > 0 {
        println!("  {:<22} {}", "Unparseable", stats.unparseable);
    }
    println!("  {:<22} {}", "Fallback charset", stats.fallback_decodes);
    println!(
        "  {:<22} {} ({} bodies skipped)",
        "Charset failures", stats.charset_failures, stats.decode_exhausted
    );
    println!("  {:<22} {}", "Sentences", stats.sentences);
    println!("  {:<22} {}", "Tokens", stats.tokens);
    println!(
        "  {:<22} {} distinct unigrams, {} distinct bigrams",
        "Tables",
        summary.counter.unigrams().len(),
        summary.counter.distinct_bigrams()
    );
    println!("  {:<22} {}", "Unigrams", summary.unigram_path.display());
    println!("  {:<22} {}", "Bigrams", summary.bigram_path.display());
    println!("  {:<22} {:.2?}", "Time", summary.elapsed);
    println!();
}

fn print_summary_json(summary: &Summary<'_>) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "files": summary.files.iter().map(|f| f.to_string_lossy()).collect::<Vec<_>>(),
        "stats": summary.stats,
        "distinct_unigrams": summary.counter.unigrams().len(),
        "distinct_bigrams": summary.counter.distinct_bigrams(),
        "unigrams_file": summary.unigram_path.to_string_lossy(),
        "bigrams_file": summary.bigram_path.to_string_lossy(),
        "elapsed_ms": summary.elapsed.as_millis(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
