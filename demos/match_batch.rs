//! Example: Rank chroma files in parallel
//!
//! Usage:
//!   cargo run --release --example match_batch -- [--jobs N] [--json] [--dtw] \
//!       --query <q1.vector> [--query <q2.vector> ...] <c1.vector> <c2.vector> ...
//!
//! Each file holds a pitch-major JSON matrix (12 rows, one column per frame),
//! as written by `match_synthetic --dump`. Candidate ids are file names with
//! the extension stripped.
//!
//! Notes:
//! - Parallelism is across candidates, both for model training and scoring.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.

use chroma_match::store::candidate_id;
use chroma_match::{ChromaSequence, MatchConfig, Matcher, ScorerKind};
use std::env;
use std::path::Path;
use std::time::Instant;

fn load(path: &str) -> Result<(String, ChromaSequence), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let rows: Vec<Vec<f32>> = serde_json::from_str(&text)?;
    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or("Path has no file name")?;
    Ok((candidate_id(file_name).to_string(), ChromaSequence::from_pitch_major(&rows)?))
}

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut kind = ScorerKind::Likelihood;
    let mut jobs: Option<usize> = None;
    let mut query_paths: Vec<String> = Vec::new();
    let mut candidate_paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--dtw" => kind = ScorerKind::Alignment,
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--query" => {
                let v = args.first().cloned().ok_or("--query requires a path")?;
                args.remove(0);
                query_paths.push(v);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: match_batch [--jobs N] [--json] [--dtw] \
                     --query <file> ... <candidate> ...\n\
                     \n\
                     --jobs N   Parallel workers (default: CPU-1)\n\
                     --json     Emit one JSON ranking per line (JSONL)\n\
                     --dtw      Rank by DTW distance instead of HMM likelihood\n"
                );
                return Ok(());
            }
            _ => candidate_paths.push(a),
        }
    }

    if query_paths.is_empty() || candidate_paths.is_empty() {
        eprintln!(
            "ERROR: Provide at least one --query and one candidate file. Use --help for usage."
        );
        std::process::exit(2);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!(
        "Batch: {} queries x {} candidates, jobs={}",
        query_paths.len(),
        candidate_paths.len(),
        jobs
    );

    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let config = MatchConfig {
        debug: false,
        parallel: true,
        ..MatchConfig::default()
    };
    let mut matcher = Matcher::new(config);

    for path in &query_paths {
        match load(path) {
            Ok((id, sequence)) => {
                matcher.insert_query(id, sequence)?;
            }
            Err(e) => eprintln!("{}: ERROR: {}", path, e),
        }
    }
    for path in &candidate_paths {
        match load(path) {
            Ok((id, sequence)) => {
                matcher.insert_candidate(id, sequence)?;
            }
            Err(e) => eprintln!("{}: ERROR: {}", path, e),
        }
    }

    let t0 = Instant::now();
    let rankings = pool.install(|| {
        if kind == ScorerKind::Likelihood {
            let report = matcher.build_models(false);
            for (id, err) in &report.failed {
                eprintln!("{}: model training failed: {}", id, err);
            }
            eprintln!(
                "Models: built={} skipped={} failed={}",
                report.built.len(),
                report.skipped.len(),
                report.failed.len()
            );
        }
        matcher.rank_all_queries(kind)
    })?;

    for ranking in &rankings {
        if json {
            println!("{}", serde_json::to_string(ranking)?);
        } else {
            println!("{}:", ranking.query_id);
            for (idx, entry) in ranking.iter().enumerate() {
                println!("  [{}/{}] {} score={:.3}", idx + 1, ranking.len(), entry.id, entry.score);
            }
            for warning in &ranking.warnings {
                println!("  WARNING: {}", warning.message);
            }
        }
    }

    eprintln!(
        "Done: {} rankings wall={:.0}ms",
        rankings.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}
