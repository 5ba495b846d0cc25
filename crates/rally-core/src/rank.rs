use rally_types::config::TierDef;

use crate::error::ConfigError;

const FULL: char = '█';
const EMPTY: char = '░';
/// Partial glyphs indexed by the filled quarter of the boundary cell.
const RAMP: [char; 4] = ['▏', '▎', '▌', '▊'];

pub const DEFAULT_BAR_LENGTH: usize = 10;

/// Ascending tier thresholds, validated once at startup.
#[derive(Debug, Clone)]
pub struct ThresholdTable {
    tiers: Vec<TierDef>,
}

/// Where a balance sits relative to the threshold table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierProgress<'a> {
    /// Greatest threshold at or below the balance, 0 when none is reached.
    pub current_threshold: i64,
    pub next_threshold: i64,
    pub next_tier: &'a TierDef,
    pub points_needed: i64,
}

impl ThresholdTable {
    pub fn new(tiers: Vec<TierDef>) -> Result<Self, ConfigError> {
        if tiers.is_empty() {
            return Err(ConfigError::EmptyThresholds);
        }
        for tier in &tiers {
            if tier.threshold < 0 {
                return Err(ConfigError::NegativeThreshold(tier.threshold));
            }
        }
        for pair in tiers.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(ConfigError::ThresholdsNotAscending {
                    previous: pair[0].threshold,
                    next: pair[1].threshold,
                });
            }
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[TierDef] {
        &self.tiers
    }

    /// Binary-search the table for `points`.
    ///
    /// At or above the top threshold the top tier is reported as "next"
    /// with its own threshold and nothing left to earn; `next_threshold`
    /// stays at the maximum rather than following `points`.
    pub fn tier_of(&self, points: i64) -> TierProgress<'_> {
        let reached = self.tiers.partition_point(|t| t.threshold <= points);
        let current_threshold = match reached {
            0 => 0,
            n => self.tiers[n - 1].threshold,
        };

        match self.tiers.get(reached) {
            Some(next) => TierProgress {
                current_threshold,
                next_threshold: next.threshold,
                next_tier: next,
                points_needed: next.threshold.saturating_sub(points),
            },
            None => {
                let top = &self.tiers[self.tiers.len() - 1];
                TierProgress {
                    current_threshold,
                    next_threshold: top.threshold,
                    next_tier: top,
                    points_needed: 0,
                }
            }
        }
    }
}

/// Sort balances into leaderboard order: points descending, then user id
/// ascending so equal balances always rank the same way.
pub fn rank_order(balances: &mut [(String, i64)]) {
    balances.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}

/// 0-based leaderboard position of `user_id`, `None` if absent.
pub fn global_rank(user_id: &str, balances: &[(String, i64)]) -> Option<usize> {
    let mut ordered = balances.to_vec();
    rank_order(&mut ordered);
    ordered.iter().position(|(id, _)| id == user_id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressBar {
    pub bar: String,
    pub label: String,
}

/// Render `current / total` as `length` glyphs plus a percentage label.
/// `total` is clamped to 1; the label is not capped at 100%.
pub fn progress_bar(current: i64, total: i64, length: usize) -> ProgressBar {
    let total = total.max(1);
    let p = current.max(0) as f64 / total as f64;

    if p == 0.0 {
        return ProgressBar {
            bar: EMPTY.to_string().repeat(length),
            label: "0.0%".into(),
        };
    }

    let scaled = length as f64 * p;
    let filled = (scaled.floor() as usize).min(length);

    let mut bar = String::with_capacity(length * FULL.len_utf8());
    bar.extend(std::iter::repeat_n(FULL, filled));
    if filled < length {
        let quarter = ((scaled.fract() * 4.0).floor() as usize).min(RAMP.len() - 1);
        bar.push(RAMP[quarter]);
        bar.extend(std::iter::repeat_n(EMPTY, length - filled - 1));
    }

    ProgressBar {
        bar,
        label: format!("{:.1}%", p * 100.0),
    }
}
