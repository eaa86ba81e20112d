//! CLI entry point for `grouparc`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use grouparc::corpus::builder::CorpusBuilder;
use grouparc::corpus::reader as corpus_reader;

#[derive(Parser)]
#[command(
    name = "grouparc",
    version,
    about = "Convert web-archive captures of discussion groups into a browsable, searchable static corpus"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the canonical message corpus from a WARC capture
    Extract {
        /// WARC file (.warc or .warc.gz)
        warc: PathBuf,
        /// Corpus output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Render per-message pages and browse listings from the corpus
    Render {
        /// Corpus directory (from `extract`)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Site output directory
        #[arg(short, long)]
        site: Option<PathBuf>,
    },
    /// Emit search documents for an external index builder
    Index {
        /// Corpus directory (from `extract`)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Site output directory
        #[arg(short, long)]
        site: Option<PathBuf>,
    },
    /// Scan for attachment candidates (file-like URLs, non-text payloads)
    Scan {
        /// Corpus directory (from `extract`)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Also scan a WARC for non-text response payloads
        #[arg(long)]
        warc: Option<PathBuf>,
        /// Write candidates here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show corpus statistics
    Stats {
        /// Corpus directory (from `extract`)
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
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

    let config = grouparc::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let out_dir = |flag: Option<PathBuf>| flag.unwrap_or_else(|| config.output.out_dir.clone());
    let site_dir = |flag: Option<PathBuf>| flag.unwrap_or_else(|| config.output.site_dir.clone());

    match cli.command {
        Commands::Extract { warc, out } => cmd_extract(&warc, &out_dir(out)),
        Commands::Render { out, site } => cmd_render(&out_dir(out), &site_dir(site)),
        Commands::Index { out, site } => cmd_index(&out_dir(out), &site_dir(site)),
        Commands::Scan { out, warc, output } => {
            cmd_scan(&out_dir(out), warc.as_deref(), output.as_deref())
        }
        Commands::Stats { out, json } => cmd_stats(&out_dir(out), json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &grouparc::config::Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = grouparc::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "grouparc.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "grouparc", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}

/// Build the corpus from a WARC capture.
fn cmd_extract(warc: &Path, out: &Path) -> anyhow::Result<()> {
    if !warc.exists() {
        anyhow::bail!("WARC file not found: {}", warc.display());
    }

    let file_size = std::fs::metadata(warc)?.len();
    let pb = ProgressBar::new(file_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} Extracting [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let outcome = CorpusBuilder::new(out).run(
        warc,
        Some(&|current, total| {
            if total > 0 {
                pb.set_length(total);
            }
            pb.set_position(current);
        }),
    )?;
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    let stats = &outcome.stats;
    println!();
    println!("  {:<22} {}", "WARC records", stats.records_scanned);
    println!("  {:<22} {}", "JSON payloads", stats.payloads_parsed);
    println!("  {:<22} {}", "Messages written", stats.messages_written);
    println!("  {:<22} {}", "Duplicates skipped", stats.duplicates_skipped);
    println!("  {:<22} {}", "Rejected records", stats.rejected);
    println!("  {:<22} {}", "Year partitions", stats.partition_files);
    println!("  {:<22} {:.2?}", "Extraction time", elapsed);
    println!(
        "  {:<22} {}",
        "Corpus",
        corpus_reader::corpus_path(out).display()
    );
    println!();

    Ok(())
}

/// Render the static site from a built corpus.
fn cmd_render(out: &Path, site: &Path) -> anyhow::Result<()> {
    let messages = corpus_reader::load_corpus(out)?;
    let threads = grouparc::threading::group_threads(&messages);
    let links = grouparc::nav::compute_links(&messages, &threads);

    let pb = ProgressBar::new_spinner();
    pb.set_message("Rendering pages");
    let stats = grouparc::site::render::write_site(&messages, &links, site)?;
    pb.finish_and_clear();

    println!();
    println!("  {:<22} {}", "Message pages", stats.message_pages);
    println!("  {:<22} {}", "Year pages", stats.year_pages);
    println!("  {:<22} {}", "Author pages", stats.author_pages);
    println!("  {:<22} {}", "Threads", threads.len());
    println!("  {:<22} {}", "Site", site.display());
    println!();

    Ok(())
}

/// Emit search documents from a built corpus.
fn cmd_index(out: &Path, site: &Path) -> anyhow::Result<()> {
    let messages = corpus_reader::load_corpus(out)?;
    grouparc::site::search::write_search_documents(&messages, site)?;
    println!(
        "  Wrote {} search documents to {}",
        messages.len(),
        site.join("search_docs.json").display()
    );
    Ok(())
}

/// Scan for attachment candidates.
fn cmd_scan(out: &Path, warc: Option<&Path>, output: Option<&Path>) -> anyhow::Result<()> {
    let messages = corpus_reader::load_corpus(out)?;

    let mut sink: Box<dyn Write> = match output {
        Some(path) => Box::new(std::io::BufWriter::new(std::fs::File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };

    let mut count = grouparc::site::files::scan_corpus(&messages, &mut sink)?;
    if let Some(warc_path) = warc {
        count += grouparc::site::files::scan_warc(warc_path, &mut sink)?;
    }
    sink.flush()?;
    eprintln!("  {count} candidate(s) found");
    Ok(())
}

/// Show statistics for a built corpus.
fn cmd_stats(out: &Path, json: bool) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let messages = corpus_reader::load_corpus(out)?;
    let corpus_size = std::fs::metadata(corpus_reader::corpus_path(out))
        .map(|m| m.len())
        .unwrap_or(0);
    let date_range = corpus_reader::date_range(&messages);
    let threads = corpus_reader::thread_count(&messages);
    let top = corpus_reader::top_authors(&messages, 10);

    if json {
        let top_json: Vec<serde_json::Value> = top
            .iter()
            .map(|(author, count)| serde_json::json!({"author": author, "count": count}))
            .collect();
        let stats = serde_json::json!({
            "corpus": corpus_reader::corpus_path(out).to_string_lossy(),
            "corpus_size": corpus_size,
            "message_count": messages.len(),
            "thread_count": threads,
            "date_range": date_range.map(|(oldest, newest)| serde_json::json!({
                "oldest": oldest,
                "newest": newest,
            })),
            "top_authors": top_json,
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!(
        "  {:<22} {}",
        "Corpus",
        corpus_reader::corpus_path(out).display()
    );
    println!(
        "  {:<22} {}",
        "Corpus size",
        format_size(corpus_size, BINARY)
    );
    println!("  {:<22} {}", "Messages", messages.len());
    println!("  {:<22} {}", "Threads", threads);
    if let Some((oldest, newest)) = date_range {
        println!("  {:<22} {oldest} — {newest}", "Date range");
    }
    if !top.is_empty() {
        println!();
        println!("  Top authors:");
        for (author, count) in &top {
            println!("    {count:>6}  {author}");
        }
    }
    println!();

    Ok(())
}
