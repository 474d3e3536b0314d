//! Authoritative position state and move history.
//!
//! The current [`Chess`] position is the single source of truth every other
//! component reacts to. It is only ever replaced wholesale: by an accepted
//! move, by an explicit external position, or by a reset. All legality
//! questions are delegated to the rules engine; this module never edits a
//! board encoding by hand.

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::{
    CastlingMode, CastlingSide, Chess, Color, EnPassantMode, Move, Outcome, Position, Role, Square,
};

use crate::error::CoachError;

/// One accepted move: the SAN as played plus the encoding it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedMove {
    pub san: String,
    pub fen_after: String,
}

/// Current position plus the chronological record of accepted moves.
#[derive(Debug, Clone)]
pub struct PositionState {
    position: Chess,
    fen: String,
    moves: Vec<PlayedMove>,
}

impl Default for PositionState {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionState {
    /// The standard starting position with an empty history.
    pub fn new() -> Self {
        let position = Chess::default();
        let fen = fen_of(&position);
        Self {
            position,
            fen,
            moves: Vec::new(),
        }
    }

    /// Adopt an externally supplied position. History starts empty since the
    /// moves that led here are unknown.
    pub fn from_fen(fen_str: &str) -> Result<Self, CoachError> {
        let fen: Fen = fen_str
            .parse()
            .map_err(|_| CoachError::InvalidFen(fen_str.to_string()))?;
        let position = fen
            .into_position::<Chess>(CastlingMode::Standard)
            .map_err(|e| CoachError::InvalidFen(e.to_string()))?;
        let fen = fen_of(&position);
        Ok(Self {
            position,
            fen,
            moves: Vec::new(),
        })
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    /// Canonical encoding of the current position.
    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    pub fn moves(&self) -> &[PlayedMove] {
        &self.moves
    }

    pub fn last_move(&self) -> Option<&PlayedMove> {
        self.moves.last()
    }

    /// Game result if the position is terminal.
    pub fn outcome(&self) -> Option<Outcome> {
        self.position.outcome()
    }

    pub fn is_terminal(&self) -> bool {
        self.position.is_game_over()
    }

    /// Attempt a drag move given origin and destination squares.
    ///
    /// Promotion defaults to a queen when the destination requires one and
    /// no hint is given. An illegal attempt leaves the position untouched.
    pub fn try_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Role>,
    ) -> Result<PlayedMove, CoachError> {
        let mv = find_legal_move(&self.position, from, to, promotion)
            .ok_or_else(|| CoachError::InvalidMove(format!("{from}{to}")))?;
        Ok(self.apply(mv))
    }

    /// Apply a move written in standard algebraic notation.
    pub fn apply_san(&mut self, san: &str) -> Result<PlayedMove, CoachError> {
        let parsed: SanPlus = san
            .parse()
            .map_err(|_| CoachError::InvalidMove(san.to_string()))?;
        let mv = parsed
            .san
            .to_move(&self.position)
            .map_err(|_| CoachError::InvalidMove(san.to_string()))?;
        Ok(self.apply(mv))
    }

    /// Back to the starting position, clearing history.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn apply(&mut self, mv: Move) -> PlayedMove {
        // SAN must be rendered against the pre-move position.
        let san = SanPlus::from_move(self.position.clone(), &mv).to_string();
        let mut next = self.position.clone();
        next.play_unchecked(&mv);
        self.position = next;
        self.fen = fen_of(&self.position);
        let played = PlayedMove {
            san,
            fen_after: self.fen.clone(),
        };
        self.moves.push(played.clone());
        played
    }
}

fn fen_of(position: &Chess) -> String {
    Fen::from_position(position.clone(), EnPassantMode::Legal).to_string()
}

/// Where the king lands for a castling move.
pub(crate) fn castle_king_target(king: Square, rook: Square) -> Square {
    let side = if rook > king {
        CastlingSide::KingSide
    } else {
        CastlingSide::QueenSide
    };
    Square::from_coords(side.king_to_file(), king.rank())
}

fn find_legal_move(
    position: &Chess,
    from: Square,
    to: Square,
    promotion: Option<Role>,
) -> Option<Move> {
    let wanted = promotion.unwrap_or(Role::Queen);
    position.legal_moves().into_iter().find(|candidate| match candidate {
        // Dragging the king onto its destination square (or onto the rook)
        // both count as the castling move.
        Move::Castle { king, rook } => {
            *king == from && (*rook == to || castle_king_target(*king, *rook) == to)
        }
        _ => {
            candidate.from() == Some(from)
                && candidate.to() == to
                && candidate.promotion().map_or(true, |role| role == wanted)
        }
    })
}
