//! Mastery tier derived from review statistics.
//!
//! Levels are recomputed from the current numbers on every review, so a lapse
//! in accuracy or ease can move a card back down.

const LADDER: [(u8, u32, f64, f64); 3] = [
    // (level, min reviews, min ease, min accuracy)
    (4, 10, 2.3, 0.8),
    (3, 7, 2.2, 0.7),
    (2, 3, 2.0, 0.6),
];

pub const MIN_DEPTH_LEVEL: u8 = 1;

pub fn calculate_depth_level(review_count: u32, ease_factor: f64, accuracy: f64) -> u8 {
    LADDER
        .iter()
        .find(|&&(_, reviews, ease, acc)| {
            review_count >= reviews && ease_factor >= ease && accuracy >= acc
        })
        .map(|&(level, ..)| level)
        .unwrap_or(MIN_DEPTH_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert_eq!(calculate_depth_level(10, 2.3, 0.8), 4);
        assert_eq!(calculate_depth_level(7, 2.2, 0.7), 3);
        assert_eq!(calculate_depth_level(3, 2.0, 0.6), 2);
        assert_eq!(calculate_depth_level(2, 2.5, 1.0), 1);
    }

    #[test]
    fn test_ease_gate() {
        assert_eq!(calculate_depth_level(5, 1.9, 0.8), 1);
    }

    #[test]
    fn test_falls_through_to_lower_tier() {
        // Enough reviews for level 4 but accuracy only good for level 3.
        assert_eq!(calculate_depth_level(12, 2.5, 0.75), 3);
        // Regression after reaching the top.
        assert_eq!(calculate_depth_level(20, 1.5, 0.9), 1);
    }
}
