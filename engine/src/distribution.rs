//! Conversion between a solve list and a win distribution.
//!
//! A solve list holds one score per game: `0` for a loss, `4 + mistakes` for
//! a win. The remote only keeps the histogram, so going back from the
//! histogram to a list is lossy: game order and dates are gone, and the
//! rebuilt list is a deterministic approximation (wins in ascending mistake
//! order, then losses). Only the multiset of scores survives.

use crate::stats::{WinDistribution, PERFECT_SCORE};

/// Score recorded for a lost game.
pub const LOSS_SCORE: u32 = 0;

/// Whether a solve-list score counts as a win.
pub fn is_win_score(score: u32) -> bool {
    score >= PERFECT_SCORE
}

/// Build the histogram of mistakes from a solve list.
///
/// Losses and scores in `1..4` (never produced by the game) contribute nothing.
pub fn distribution_of(solve_list: &[u32]) -> WinDistribution {
    let mut dist = WinDistribution::new();
    for &score in solve_list.iter().filter(|s| is_win_score(**s)) {
        dist.record(score - PERFECT_SCORE);
    }
    dist
}

/// Number of wins in a solve list.
pub fn wins_in(solve_list: &[u32]) -> u32 {
    solve_list.iter().filter(|s| is_win_score(**s)).count() as u32
}

/// Rebuild a solve list from a histogram and the total number of games.
///
/// Each `(mistakes, count)` bucket expands into `count` copies of
/// `4 + mistakes`, then `games_played - total` loss entries are appended.
pub fn build_solve_list(distribution: &WinDistribution, games_played: u32) -> Vec<u32> {
    let wins = distribution.total();
    let losses = games_played.saturating_sub(wins);

    let mut list = Vec::with_capacity((wins + losses) as usize);
    for (mistakes, count) in distribution.iter() {
        let score = PERFECT_SCORE.saturating_add(mistakes);
        list.extend(std::iter::repeat(score).take(count as usize));
    }
    list.extend(std::iter::repeat(LOSS_SCORE).take(losses as usize));
    list
}
