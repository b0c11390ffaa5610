use anyhow::Result;
use std::path::Path;

use crate::error::PipelineError;

/// Class labels in the order the detector was trained with. Downstream
/// inference maps output indices to this list positionally, so the order
/// never changes, and it is never derived from model metadata.
pub const PIECE_LABELS: [&str; 12] = [
    "white_pawn",
    "white_knight",
    "white_bishop",
    "white_rook",
    "white_queen",
    "white_king",
    "black_pawn",
    "black_knight",
    "black_bishop",
    "black_rook",
    "black_queen",
    "black_king",
];

pub fn manifest_contents() -> String {
    PIECE_LABELS.join("\n")
}

/// Writes the label manifest, one label per line, overwriting any
/// previous file.
pub fn write_manifest(path: &Path) -> Result<()> {
    std::fs::write(path, manifest_contents()).map_err(|e| {
        PipelineError::deployment(format!("write labels to {}: {e}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_twelve_labels() {
        assert_eq!(PIECE_LABELS.len(), 12);
        assert!(PIECE_LABELS.iter().all(|l| !l.is_empty()));
    }

    #[test]
    fn test_white_pieces_before_black() {
        assert!(PIECE_LABELS[..6].iter().all(|l| l.starts_with("white_")));
        assert!(PIECE_LABELS[6..].iter().all(|l| l.starts_with("black_")));
    }

    #[test]
    fn test_piece_order_within_color() {
        let order = ["pawn", "knight", "bishop", "rook", "queen", "king"];
        for (i, piece) in order.iter().enumerate() {
            assert_eq!(PIECE_LABELS[i], format!("white_{piece}"));
            assert_eq!(PIECE_LABELS[i + 6], format!("black_{piece}"));
        }
    }

    #[test]
    fn test_manifest_has_no_trailing_newline() {
        let contents = manifest_contents();
        assert!(!contents.ends_with('\n'));
        assert_eq!(contents.lines().count(), 12);
    }
}
