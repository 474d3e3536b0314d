//! Command-line front end: plays a line of SAN moves against the analysis
//! service and prints the synchronized coaching views after each one.
//!
//! ```text
//! COACH_API_BASE=http://localhost:8000 chesscoach e4 e5 Nf3
//! ```

use std::sync::Arc;

use anyhow::Result;

use chesscoach::backend::HttpAnalysisBackend;
use chesscoach::config::CoachConfig;
use chesscoach::session::CoachSession;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let moves: Vec<String> = std::env::args().skip(1).collect();
    if moves.is_empty() {
        anyhow::bail!("usage: chesscoach <san move> [<san move> ...]");
    }

    let config = CoachConfig::from_env();
    let backend = Arc::new(HttpAnalysisBackend::from_config(&config));
    let mut session = CoachSession::new(backend, config);

    for san in &moves {
        session.play_san(san)?;
        session.settle_pending().await;
        print_views(&session);
    }

    Ok(())
}

fn print_views(session: &CoachSession) {
    println!("position: {}", session.fen());

    match session.evaluation() {
        Some(result) => {
            if let Some(mate) = result.mate_in {
                println!("evaluation: mate in {}", mate.abs());
            } else if let Some(cp) = result.score_cp {
                println!("evaluation: {:+.2}", f64::from(cp) / 100.0);
            }
            if let Some(pv) = &result.principal_variation {
                println!("line: {pv}");
            }
        }
        None => println!("evaluation: unavailable"),
    }

    if let Some(percent) = session.eval_bar_percent() {
        println!("eval bar: {percent:.0}%");
    }

    if let Some(badge) = session.grade_badge() {
        println!("last move: {} {}", badge.symbol, badge.label);
    }

    match session.recommendation() {
        Some(recommendation) => {
            if let Some(mv) = &recommendation.mv {
                println!("suggestion: {mv}");
            }
            if !recommendation.analysis.is_empty() {
                println!("coach: {}", recommendation.analysis);
            }
        }
        None => println!("suggestion: unavailable"),
    }

    if let Some(highlight) = session.best_move_highlight() {
        println!("highlight: {} -> {}", highlight.from, highlight.to);
    }

    println!();
}
