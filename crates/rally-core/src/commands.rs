use std::sync::Arc;

use tracing::info;

use rally_types::api::{AdjustAction, AdjustPointsRequest, LeaderboardEntry, StandingResponse};

use crate::config::EconomyConfig;
use crate::error::CoreError;
use crate::ledger::Ledger;
use crate::rank::{self, DEFAULT_BAR_LENGTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustOutcome {
    pub previous: i64,
    pub balance: i64,
}

/// Ledger operations requested through the command layer.
pub struct LedgerCommands {
    ledger: Arc<Ledger>,
    config: Arc<EconomyConfig>,
}

impl LedgerCommands {
    pub fn new(ledger: Arc<Ledger>, config: Arc<EconomyConfig>) -> Self {
        Self { ledger, config }
    }

    /// Add or remove points. Negative amounts are rejected before the
    /// ledger is touched.
    pub async fn adjust(&self, req: &AdjustPointsRequest) -> Result<AdjustOutcome, CoreError> {
        if req.points < 0 {
            return Err(CoreError::InvalidAmount(req.points));
        }

        self.ledger.ensure(&req.user_id).await?;
        let previous = self.ledger.get(&req.user_id).await?;
        let balance = match req.action {
            AdjustAction::Add => previous.saturating_add(req.points),
            AdjustAction::Remove => previous.saturating_sub(req.points),
        };

        if !self.ledger.set(&req.user_id, balance).await {
            return Err(CoreError::WriteFailed(req.user_id.clone()));
        }

        info!(
            "Adjusted {} by {:?} {} ({}): {} -> {}",
            req.user_id,
            req.action,
            req.points,
            req.reason.as_deref().unwrap_or("no reason given"),
            previous,
            balance
        );
        Ok(AdjustOutcome { previous, balance })
    }

    /// Rank, tier progress and bar for one user.
    pub async fn standing(&self, user_id: &str) -> Result<StandingResponse, CoreError> {
        self.ledger.ensure(user_id).await?;
        let points = self.ledger.get(user_id).await?;
        let balances = self.ledger.all().await?;
        let position = rank::global_rank(user_id, &balances).unwrap_or(balances.len());

        let progress = self.config.thresholds.tier_of(points);
        let bar = rank::progress_bar(
            points.saturating_sub(progress.current_threshold),
            progress.next_threshold - progress.current_threshold,
            DEFAULT_BAR_LENGTH,
        );

        Ok(StandingResponse {
            user_id: user_id.to_string(),
            rank: position + 1,
            points,
            progress_bar: bar.bar,
            progress_label: bar.label,
            points_needed: progress.points_needed,
            current_threshold: progress.current_threshold,
            next_threshold: progress.next_threshold,
            next_tier_id: progress.next_tier.id.clone(),
            next_tier_name: progress.next_tier.name.clone(),
        })
    }

    pub async fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, CoreError> {
        let rows = self.ledger.top(limit).await?;
        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, (user_id, points))| LeaderboardEntry {
                rank: i + 1,
                user_id,
                points,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rally_db::Database;
    use rally_types::config::EconomyFile;

    fn commands() -> (Arc<Database>, LedgerCommands) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let config = Arc::new(EconomyConfig::from_file(EconomyFile::default()).unwrap());
        (db.clone(), LedgerCommands::new(Arc::new(Ledger::new(db)), config))
    }

    fn request(action: AdjustAction, points: i64, user_id: &str) -> AdjustPointsRequest {
        AdjustPointsRequest {
            action,
            points,
            user_id: user_id.into(),
            reason: Some("event winner".into()),
        }
    }

    #[tokio::test]
    async fn adjust_adds_and_removes() {
        let (db, commands) = commands();
        let out = commands.adjust(&request(AdjustAction::Add, 250, "u1")).await.unwrap();
        assert_eq!(out, AdjustOutcome { previous: 0, balance: 250 });

        let out = commands.adjust(&request(AdjustAction::Remove, 400, "u1")).await.unwrap();
        assert_eq!(out, AdjustOutcome { previous: 250, balance: -150 });
        assert_eq!(db.get_balance("u1").unwrap(), Some(-150));
    }

    #[tokio::test]
    async fn negative_amount_is_rejected_before_ledger() {
        let (db, commands) = commands();
        let err = commands.adjust(&request(AdjustAction::Add, -5, "u1")).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount(-5)));
        assert_eq!(db.get_balance("u1").unwrap(), None);
    }

    #[tokio::test]
    async fn standing_reports_rank_and_progress() {
        let (db, commands) = commands();
        db.set_balance("top", 9000).unwrap();
        db.set_balance("mid", 1500).unwrap();
        db.set_balance("low", 10).unwrap();

        let standing = commands.standing("mid").await.unwrap();
        assert_eq!(standing.rank, 2);
        assert_eq!(standing.current_threshold, 1000);
        assert_eq!(standing.next_threshold, 2500);
        assert_eq!(standing.next_tier_name, "Regular");
        assert_eq!(standing.points_needed, 1000);
        // 500 of 1500 -> 33.3%
        assert_eq!(standing.progress_label, "33.3%");
        assert_eq!(standing.progress_bar.chars().count(), 10);
    }

    #[tokio::test]
    async fn standing_of_new_user_creates_record() {
        let (db, commands) = commands();
        db.set_balance("someone", 5).unwrap();

        let standing = commands.standing("newcomer").await.unwrap();
        assert_eq!(standing.points, 0);
        assert_eq!(standing.rank, 2);
        assert_eq!(standing.progress_label, "0.0%");
        assert_eq!(standing.next_tier_id, "contributor");
        assert_eq!(db.get_balance("newcomer").unwrap(), Some(0));
    }

    #[tokio::test]
    async fn standing_at_top_tier_saturates() {
        let (db, commands) = commands();
        db.set_balance("legend", 30000).unwrap();

        let standing = commands.standing("legend").await.unwrap();
        assert_eq!(standing.points_needed, 0);
        assert_eq!(standing.next_threshold, 25000);
        assert_eq!(standing.next_tier_name, "Legend");
        assert_eq!(standing.progress_bar, "█".repeat(10));
    }

    #[tokio::test]
    async fn extreme_balances_saturate_and_still_report_standing() {
        let (db, commands) = commands();
        for _ in 0..2 {
            commands.adjust(&request(AdjustAction::Remove, i64::MAX, "u")).await.unwrap();
        }
        assert_eq!(db.get_balance("u").unwrap(), Some(i64::MIN));

        let standing = commands.standing("u").await.unwrap();
        assert_eq!(standing.points, i64::MIN);
        assert_eq!(standing.points_needed, i64::MAX);
        assert_eq!(standing.progress_label, "0.0%");

        for _ in 0..3 {
            commands.adjust(&request(AdjustAction::Add, i64::MAX, "u")).await.unwrap();
        }
        let standing = commands.standing("u").await.unwrap();
        assert_eq!(standing.points, i64::MAX);
        assert_eq!(standing.points_needed, 0);
    }

    #[tokio::test]
    async fn leaderboard_is_ranked() {
        let (db, commands) = commands();
        db.set_balance("b", 20).unwrap();
        db.set_balance("a", 20).unwrap();
        db.set_balance("c", 90).unwrap();

        let board = commands.leaderboard(2).await.unwrap();
        assert_eq!(
            board,
            vec![
                LeaderboardEntry { rank: 1, user_id: "c".into(), points: 90 },
                LeaderboardEntry { rank: 2, user_id: "a".into(), points: 20 },
            ]
        );
    }
}
