use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use grambit::codecs::{CodecKind, DEFAULT_FIBONACCI_MAX_VALUE};
use grambit::ingest::{self, parse_record, trim_newline, NgramFile};
use grambit::mphf::MphfConfig;
use grambit::{NgramStore, StoreConfig};

#[derive(Parser)]
#[command(name = "grambit", about = "Succinct n-gram count store", version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a store from a `key<TAB>count` file sorted by ascending count
    Build {
        /// Input file, plain or gzip
        input: PathBuf,

        /// Output base path; writes <BASE>.hash and <BASE>.fp_values
        base: PathBuf,

        /// Bits per key fingerprint
        #[arg(short = 'f', long, default_value_t = 12)]
        fingerprint_bits: usize,

        /// Bits per slot of the temporary rank array
        #[arg(short = 'b', long, default_value_t = 20)]
        rank_bits: usize,

        /// Code of the rank sequence
        #[arg(long, value_enum, default_value_t = Codec::Gamma)]
        codec: Codec,

        /// Bound on ranks under the Fibonacci code
        #[arg(long, default_value_t = DEFAULT_FIBONACCI_MAX_VALUE)]
        fib_max: u64,

        /// Perfect hash bins per key
        #[arg(long, default_value_t = 2.0)]
        gamma: f64,

        /// Perfect hash seed
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Store the value file uncompressed
        #[arg(long)]
        no_gzip: bool,
    },

    /// Look up keys from a file or stdin
    ///
    /// A `key<TAB>count` line is checked against the store. A bare key
    /// prints `<value> <key>`, with 0 for a miss.
    Query {
        /// Base path of the store
        base: PathBuf,

        /// Key file, plain or gzip; stdin if absent
        keys: Option<PathBuf>,
    },

    /// Print the space used by each part of a store
    Stats {
        /// Base path of the store
        base: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Codec {
    Gamma,
    Fibonacci,
}

impl From<Codec> for CodecKind {
    fn from(codec: Codec) -> Self {
        match codec {
            Codec::Gamma => CodecKind::Gamma,
            Codec::Fibonacci => CodecKind::Fibonacci,
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    correct: usize,
    incorrect: usize,
    notfound: usize,
    printed: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Build {
            input,
            base,
            fingerprint_bits,
            rank_bits,
            codec,
            fib_max,
            gamma,
            seed,
            no_gzip,
        } => {
            let config = StoreConfig {
                fingerprint_bits,
                rank_bits,
                codec: codec.into(),
                fibonacci_max_value: fib_max,
                mphf: MphfConfig {
                    gamma,
                    seed,
                    ..Default::default()
                },
                gzip: !no_gzip,
                ..Default::default()
            };
            let mut source = NgramFile::new(&input);
            let store = NgramStore::build(&mut source, &config)
                .with_context(|| format!("failed to build a store from {}", input.display()))?;
            store
                .save(&base, config.gzip)
                .with_context(|| format!("failed to save the store to {}", base.display()))?;
        }
        Commands::Query { base, keys } => {
            let store = load(&base)?;
            let tally = match keys {
                Some(path) => {
                    let reader = ingest::open_text(&path)
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    run_queries(&store, reader)?
                }
                None => run_queries(&store, io::stdin().lock())?,
            };
            tracing::info!(
                correct = tally.correct,
                incorrect = tally.incorrect,
                notfound = tally.notfound,
                printed = tally.printed,
                "queries done"
            );
        }
        Commands::Stats { base } => {
            let store = load(&base)?;
            println!("{}", store.stats());
        }
    }
    Ok(())
}

fn load(base: &Path) -> Result<NgramStore> {
    NgramStore::load(base).with_context(|| format!("failed to load the store at {}", base.display()))
}

fn run_queries<R: BufRead>(store: &NgramStore, mut reader: R) -> Result<Tally> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut tally = Tally::default();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let text = trim_newline(&line);
        if text.is_empty() {
            continue;
        }
        match parse_record(text) {
            Ok((key, expected)) => match store.query(key) {
                Some(v) if v == expected => tally.correct += 1,
                Some(v) => {
                    tally.incorrect += 1;
                    tracing::debug!(key = %String::from_utf8_lossy(key), expected, got = v, "wrong count");
                }
                None => tally.notfound += 1,
            },
            Err(_) => {
                writeln!(out, "{} {}", store.query_or_zero(text), String::from_utf8_lossy(text))?;
                tally.printed += 1;
            }
        }
    }
    out.flush()?;
    Ok(tally)
}
