use clap::{Parser, Subcommand};
use osr::batch::decode_files;
use osr::{CodecId, DecodeOptions, Replay, ReplayDecoder};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "osr", about = "Inspect .osr replay files", version)]
struct Cli {
    /// Frame stream container: auto (default), lzma, xz
    #[arg(long, global = true, default_value = "auto")]
    codec: String,
    /// Cap on the LZMA dictionary buffer, in bytes (xz streams are refused when set)
    #[arg(long, global = true)]
    memlimit: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show replay metadata
    Info {
        input: PathBuf,
        /// Print the whole decoded replay as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the input frames
    Frames {
        input: PathBuf,
        /// Print at most this many frames
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Print the lifebar graph
    Lifebar {
        input: PathBuf,
    },
    /// Decode many replays and print one summary line each
    Scan {
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("osr=info")),
        )
        .init();

    let cli = Cli::parse();
    let decoder = ReplayDecoder::new(DecodeOptions {
        codec:    parse_codec(&cli.codec),
        memlimit: cli.memlimit,
    });

    match cli.command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, json } => {
            let replay = decoder.decode_file(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&replay)?);
            } else {
                print_info(&input, &replay);
            }
        }

        // ── Frames ───────────────────────────────────────────────────────────
        Commands::Frames { input, limit } => {
            let replay = decoder.decode_file(&input)?;
            let shown  = limit.unwrap_or(replay.frames.len());
            println!("{:>8} {:>8} {:>10} {:>10}  Keys", "Time", "Delta", "X", "Y");
            for f in replay.frames.iter().take(shown) {
                println!("{:>8} {:>8} {:>10.2} {:>10.2}  {:?}",
                    f.time, f.delta, f.position.x, f.position.y, f.keys);
            }
            if shown < replay.frames.len() {
                println!("… {} more", replay.frames.len() - shown);
            }
        }

        // ── Lifebar ──────────────────────────────────────────────────────────
        Commands::Lifebar { input } => {
            let replay = decoder.decode_file(&input)?;
            println!("{:>8}  Health", "Time");
            for s in &replay.lifebar {
                println!("{:>8}  {:>5.1}%", s.time, s.percent * 100.0);
            }
        }

        // ── Scan ─────────────────────────────────────────────────────────────
        Commands::Scan { input } => {
            let entries = decode_files(&decoder, &input);
            let failed  = entries.iter().filter(|e| !e.is_ok()).count();
            for entry in &entries {
                match &entry.result {
                    Ok(r) => println!("  ok    {}  {} {} {:>10}  {}",
                        entry.path.display(), r.mode.name(), r.player_name, r.score,
                        mods_label(r)),
                    Err(e) => println!("  FAIL  {}  {}", entry.path.display(), e),
                }
            }
            println!("Decoded {}/{} replay(s)", entries.len() - failed, entries.len());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn print_info(path: &Path, r: &Replay) {
    println!("── .osr Replay ──────────────────────────────────────────");
    println!("  Path           {}", path.display());
    println!("  Mode           {}", r.mode.name());
    println!("  Version        {}", r.version);
    println!("  Player         {}", r.player_name);
    println!("  Beatmap hash   {}", r.beatmap_hash);
    println!("  Replay hash    {}", r.replay_hash);
    match r.played_at() {
        Some(at) => println!("  Played         {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None     => println!("  Played         ? (ticks {})", r.timestamp),
    }
    println!("  Score          {}", r.score);
    println!("  Max combo      {}{}", r.max_combo, if r.perfect { " (perfect)" } else { "" });
    println!("  Mods           {}", mods_label(r));
    println!("  300/100/50     {}/{}/{}", r.count_300, r.count_100, r.count_50);
    println!("  Geki/Katu      {}/{}", r.count_geki, r.count_katu);
    println!("  Misses         {}", r.count_miss);
    println!("  Frames         {} ({} ms)", r.frames.len(), r.duration_ms());
    println!("  Lifebar        {} sample(s)", r.lifebar.len());
    if let Some(seed) = r.rng_seed {
        println!("  RNG seed       {}", seed);
    }
    if let Some(id) = r.online_score_id {
        println!("  Online id      {}", id);
    }
    if let Some(acc) = r.target_practice_accuracy {
        println!("  Target acc     {:.4}", acc);
    }
}

fn mods_label(r: &Replay) -> String {
    let names = r.mods.acronyms();
    if names.is_empty() { "NM".into() } else { names.join("") }
}

fn parse_codec(s: &str) -> CodecId {
    CodecId::from_name(s).unwrap_or_else(|| {
        eprintln!("Unknown codec '{}', defaulting to auto", s);
        CodecId::Auto
    })
}
