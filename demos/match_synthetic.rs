//! Example: Match synthetic transcriptions against synthetic recordings
//!
//! Usage:
//!   cargo run --release --example match_synthetic -- [--dump DIR]
//!
//! Builds a small library of chord-progression "recordings", trains one HMM
//! per recording, then ranks every transcription under both scorers.
//! `--dump DIR` also writes each sequence as a pitch-major JSON matrix
//! (`<id>.vector`) that `match_batch` can read back.

use chroma_match::store::artifact_name;
use chroma_match::{ArtifactKind, ChromaSequence, MatchConfig, Matcher, ScorerKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

const SONGS: &[(&str, &[[usize; 3]])] = &[
    ("axis", &[[0, 4, 7], [7, 11, 2], [9, 0, 4], [5, 9, 0]]),
    ("doo-wop", &[[0, 4, 7], [9, 0, 4], [5, 9, 0], [7, 11, 2]]),
    ("twelve-bar", &[[2, 6, 9], [7, 11, 2], [9, 1, 4]]),
    ("andalusian", &[[9, 0, 4], [7, 11, 2], [5, 9, 0], [4, 8, 11]]),
];

fn render(
    chords: &[[usize; 3]],
    hold: usize,
    repeats: usize,
    noise: f32,
    rng: &mut StdRng,
) -> Vec<Vec<f32>> {
    (0..chords.len() * hold * repeats)
        .map(|t| {
            let mut frame: Vec<f32> = (0..12).map(|_| rng.gen_range(0.0..noise)).collect();
            for &pc in &chords[(t / hold) % chords.len()] {
                frame[pc] += 0.7 + rng.gen_range(0.0..0.3);
            }
            frame
        })
        .collect()
}

fn dump(dir: &Path, id: &str, sequence: &ChromaSequence) -> Result<(), Box<dyn std::error::Error>> {
    let path = dir.join(artifact_name(id, ArtifactKind::Sequence));
    std::fs::write(&path, serde_json::to_string(&sequence.to_pitch_major())?)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let mut dump_dir: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump" => dump_dir = Some(args.next().ok_or("--dump requires a directory")?.into()),
            other => return Err(format!("Unknown argument: {}", other).into()),
        }
    }
    if let Some(dir) = &dump_dir {
        std::fs::create_dir_all(dir)?;
    }

    let config = MatchConfig {
        debug: false,
        ..MatchConfig::default()
    };
    let hop_length = config.hop_length;
    let mut matcher = Matcher::new(config);
    let mut rng = StdRng::seed_from_u64(7);

    for (name, chords) in SONGS {
        // Transcriptions are tighter in time and cleaner than the recordings
        let query = ChromaSequence::from_frames(render(chords, 6, 4, 0.02, &mut rng))?
            .with_hop_length(hop_length);
        let recording = ChromaSequence::from_frames(render(chords, 8, 4, 0.15, &mut rng))?
            .with_hop_length(hop_length);

        if let Some(dir) = &dump_dir {
            dump(dir, &format!("{}.mid", name), &query)?;
            dump(dir, &format!("{}.wav", name), &recording)?;
        }
        matcher.insert_query(format!("{}.mid", name), query)?;
        matcher.insert_candidate(format!("{}.wav", name), recording)?;
    }

    let t0 = Instant::now();
    let report = matcher.build_models(false);
    println!(
        "Trained {} models in {:.0}ms ({} failed)",
        report.built.len(),
        t0.elapsed().as_secs_f64() * 1000.0,
        report.failed.len()
    );
    for (id, err) in &report.failed {
        println!("  {}: {}", id, err);
    }

    for kind in [ScorerKind::Likelihood, ScorerKind::Alignment] {
        println!("\n{:?} scoring:", kind);
        let mut correct = 0;
        let rankings = matcher.rank_all_queries(kind)?;
        for ranking in &rankings {
            let expected = ranking.query_id.replace(".mid", ".wav");
            let best = ranking.best().map(|b| b.id.as_str()).unwrap_or("-");
            if best == expected {
                correct += 1;
            }
            let listing: Vec<String> = ranking
                .iter()
                .map(|e| format!("{} ({:.1})", e.id, e.score))
                .collect();
            println!("  {} -> {}", ranking.query_id, listing.join(", "));
        }
        println!("  top-1: {}/{}", correct, rankings.len());
    }

    Ok(())
}
