use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use zstd::Encoder;

use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use numbers::game::TARGET_RANGE;
use numbers::games::{legal_games, legal_selections, random_game};
use numbers::{solve_instance, GameRecord, Precision, Rules, SolverConfig};

const CHUNK_SIZE: usize = 250;
const CHANNEL_BUFFER: usize = 200;
const COMPRESSION_LEVEL: i32 = 3;

//
// Command-line definitions
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Solve the instance given as arguments, or one instance per stdin line.
    Solve,
    /// Solve randomly drawn standard games into a compressed JSONL file.
    Random,
    /// Solve every legal standard game into a compressed JSONL file.
    Exhaustive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Solve the numbers round: reach the target from the source numbers.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Source numbers followed by the target. When omitted, instances are
    /// read from stdin, one per line.
    numbers: Vec<String>,

    /// What to do.
    #[arg(long, value_enum, default_value_t = Mode::Solve)]
    mode: Mode,

    /// Accept any two or more positive numbers and any positive target.
    #[arg(short, long)]
    unrestricted: bool,

    /// Search only the full depth; faster, but may miss shorter answers.
    #[arg(short, long)]
    quick: bool,

    /// Only report exact answers.
    #[arg(short = 'x', long)]
    exact: bool,

    /// Report every exact answer of the shortest length.
    #[arg(short, long)]
    all: bool,

    /// Maximum number of steps in an answer.
    #[arg(short, long)]
    max_length: Option<usize>,

    /// Use arbitrary precision arithmetic.
    #[arg(short, long)]
    bignum: bool,

    /// Output file name (random and exhaustive modes).
    #[arg(short, long, default_value = "numbers_dataset.jsonl.zst")]
    outfile: String,

    /// Number of games to draw (random mode).
    #[arg(long, default_value = "1000")]
    num_instances: usize,

    /// Seed for the random draw (random mode).
    #[arg(long)]
    seed: Option<u64>,

    /// Log level.
    #[arg(short, long, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

impl Args {
    fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            rules: if self.unrestricted {
                Rules::Unrestricted
            } else {
                Rules::Standard
            },
            quick: self.quick,
            exact_only: self.exact,
            find_all: self.all,
            max_length: self.max_length,
            precision: if self.bignum {
                Precision::Arbitrary
            } else {
                Precision::Bounded
            },
        }
    }
}

fn init_logging(level: LogLevel) {
    env_logger::Builder::from_default_env()
        .filter_level(level.to_level_filter())
        .init();
}

//
// Solve mode
//

fn run_solve_mode(numbers: &[String], config: &SolverConfig) -> Result<()> {
    if !numbers.is_empty() {
        let answer = solve_instance(&numbers.join(" "), config).context("Invalid instance")?;
        println!("{}", answer);
        return Ok(());
    }

    let mut rejected = 0usize;
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match solve_instance(line, config) {
            Ok(answer) => println!("{}", answer),
            Err(err) => {
                rejected += 1;
                warn!("Rejected instance '{}'", line);
                eprintln!("{}: {}", line, err);
            }
        }
    }
    if rejected > 0 {
        info!("{} instances rejected", rejected);
    }
    Ok(())
}

//
// Batch modes
//

/// Message type for communicating chunks to the writer thread.
enum ChunkMessage {
    Data(Vec<GameRecord>),
    Terminate,
}

/// Spawns a writer thread that listens on a channel for solved chunks and
/// writes them to the given file as Zstd-compressed JSON lines.
fn spawn_writer_thread(
    file: File,
    progress_bar: ProgressBar,
    rx: mpsc::Receiver<ChunkMessage>,
) -> thread::JoinHandle<io::Result<u64>> {
    thread::spawn(move || {
        let mut encoder = Encoder::new(BufWriter::new(file), COMPRESSION_LEVEL)?;
        let mut total_written = 0;
        while let Ok(message) = rx.recv() {
            match message {
                ChunkMessage::Data(records) => {
                    let mut buffer = String::with_capacity(records.len() * 100);
                    for record in records {
                        buffer.push_str(&serde_json::to_string(&record)?);
                        buffer.push('\n');
                        total_written += 1;
                    }
                    encoder.write_all(buffer.as_bytes())?;
                    progress_bar.set_position(total_written);
                }
                ChunkMessage::Terminate => break,
            }
        }
        encoder.finish()?;
        Ok(total_written)
    })
}

fn progress_bar(len: u64, colours: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
    let template = format!(
        "[{{elapsed_precise}}] {{bar:40.{}}} {{pos:>7}}/{{len:7}} {{wide_msg}}",
        colours
    );
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&template)?
            .progress_chars("##-"),
    );
    Ok(pb)
}

/// Solves a chunk of games in parallel, keeping their order.
fn solve_chunk(games: Vec<(Vec<u64>, u64)>, config: &SolverConfig) -> Result<Vec<GameRecord>> {
    let records = games
        .into_par_iter()
        .map(|(starting, target)| GameRecord::solve(starting, target, config))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Streams chunks produced by `next_chunk` to the writer until it returns `None`.
fn write_chunks<F>(
    file: File,
    total: u64,
    colours: &str,
    config: &SolverConfig,
    mut next_chunk: F,
) -> Result<u64>
where
    F: FnMut() -> Option<Vec<(Vec<u64>, u64)>>,
{
    let pb = progress_bar(total, colours)?;
    let (tx, rx) = mpsc::sync_channel(CHANNEL_BUFFER);
    let writer_handle = spawn_writer_thread(file, pb.clone(), rx);

    while let Some(games) = next_chunk() {
        let records = solve_chunk(games, config)?;
        tx.send(ChunkMessage::Data(records))
            .map_err(|_| anyhow!("Writer thread stopped early"))?;
    }

    tx.send(ChunkMessage::Terminate)
        .map_err(|_| anyhow!("Writer thread stopped early"))?;
    let written = writer_handle
        .join()
        .map_err(|_| anyhow!("Writer thread panicked"))?
        .context("Failed to write output")?;
    pb.finish_with_message("Completed");
    Ok(written)
}

/// Generated games always follow the standard rules in machine integers.
fn generator_config(config: &SolverConfig) -> SolverConfig {
    if config.rules != Rules::Standard || config.precision != Precision::Bounded {
        warn!("Generated games use the standard rules; ignoring --unrestricted and --bignum");
    }
    SolverConfig {
        rules: Rules::Standard,
        precision: Precision::Bounded,
        ..config.clone()
    }
}

fn run_random_mode(
    num_instances: usize,
    seed: Option<u64>,
    config: &SolverConfig,
    file: File,
) -> Result<u64> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut remaining = num_instances;
    write_chunks(file, num_instances as u64, "magenta/black", config, || {
        if remaining == 0 {
            return None;
        }
        let size = remaining.min(CHUNK_SIZE);
        remaining -= size;
        Some((0..size).map(|_| random_game(&mut rng)).collect())
    })
}

fn run_exhaustive_mode(config: &SolverConfig, file: File) -> Result<u64> {
    let total = legal_selections().len() as u64 * TARGET_RANGE.count() as u64;
    println!(
        "Solving all {} legal games (targets {}..={})...",
        total,
        TARGET_RANGE.start(),
        TARGET_RANGE.end()
    );
    let games = legal_games().chunks(CHUNK_SIZE);
    let mut chunks = games.into_iter();
    write_chunks(file, total, "cyan/blue", config, || {
        chunks.next().map(|chunk| chunk.collect())
    })
}

//
// Main
//

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level);
    let config = args.solver_config();

    match args.mode {
        Mode::Solve => run_solve_mode(&args.numbers, &config)?,
        Mode::Random | Mode::Exhaustive => {
            let config = generator_config(&config);
            let start_time = Instant::now();
            let file = File::create(&args.outfile)
                .with_context(|| format!("Failed to create {}", args.outfile))?;
            let written = if args.mode == Mode::Random {
                run_random_mode(args.num_instances, args.seed, &config, file)?
            } else {
                run_exhaustive_mode(&config, file)?
            };

            println!("\nFinal Statistics:");
            println!("Games written: {}", written);
            println!("Total time: {:?}", start_time.elapsed());
            println!("Output written to: {}", args.outfile);
        }
    }
    Ok(())
}
