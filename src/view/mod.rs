//! Derived presentation state: pure, synchronous functions over settled
//! analysis results. Nothing here performs I/O or mutates session state.

use shakmaty::san::SanPlus;
use shakmaty::{Chess, Move, Square};

use crate::analysis::{EvaluationResult, Grade};
use crate::position::castle_king_target;

/// Eval-bar fill percentage: 0 = Black winning, 100 = White winning.
///
/// A forced mate saturates the bar; otherwise the score is clamped to
/// ±1000 cp and mapped linearly with 0 cp at 50%. The bar cannot usefully
/// show differences beyond ten pawns, so that resolution is thrown away.
pub fn eval_bar_percent(result: &EvaluationResult) -> f64 {
    if let Some(mate) = result.mate_in {
        return if mate > 0 { 100.0 } else { 0.0 };
    }
    let capped = f64::from(result.score_cp.unwrap_or(0).clamp(-1000, 1000));
    50.0 + capped / 1000.0 * 50.0
}

/// Origin and destination squares of a suggested move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveHighlight {
    pub from: Square,
    pub to: Square,
}

/// Squares to highlight for a recommended SAN move, applied against a
/// scratch copy of the position.
///
/// Total and best-effort: a recommendation that no longer fits the position
/// (stale, unparseable, illegal) yields no highlight rather than an error.
pub fn best_move_highlight(position: &Chess, san: &str) -> Option<MoveHighlight> {
    let parsed: SanPlus = san.parse().ok()?;
    let mv = parsed.san.to_move(position).ok()?;
    let (from, to) = match &mv {
        Move::Castle { king, rook } => (*king, castle_king_target(*king, *rook)),
        _ => (mv.from()?, mv.to()),
    };
    Some(MoveHighlight { from, to })
}

/// Fixed presentation attributes for one grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeBadge {
    pub label: &'static str,
    pub symbol: &'static str,
    /// 0 is the best outcome; higher is worse. Styling only.
    pub severity: u8,
}

/// Map a grade to its badge.
///
/// Exhaustive on purpose: a new grade variant forces a decision here at
/// compile time instead of falling through a lookup table.
pub fn grade_badge(grade: Grade) -> GradeBadge {
    match grade {
        Grade::Brilliant => GradeBadge {
            label: "Brilliant",
            symbol: "!!",
            severity: 0,
        },
        Grade::Best => GradeBadge {
            label: "Best",
            symbol: "!",
            severity: 1,
        },
        Grade::Good => GradeBadge {
            label: "Good",
            symbol: "✓",
            severity: 2,
        },
        Grade::Inaccuracy => GradeBadge {
            label: "Inaccuracy",
            symbol: "?!",
            severity: 3,
        },
        Grade::Mistake => GradeBadge {
            label: "Mistake",
            symbol: "?",
            severity: 4,
        },
        Grade::Blunder => GradeBadge {
            label: "Blunder",
            symbol: "??",
            severity: 5,
        },
    }
}
