use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{error, info, warn};

use rally_db::Database;
use rally_db::models::CaseRow;
use rally_types::models::ChatMessage;

use crate::clock::Clock;
use crate::error::{CoreError, GatewayError};
use crate::gateway::MessageGateway;
use crate::render;
use crate::timer::TimerService;

pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);
/// Pause before retrying a thread deletion the platform rejected.
pub const CLOSE_RETRY_DELAY: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasePhase {
    Open,
    Reminded,
    Cancelled,
    Closed,
}

impl CasePhase {
    fn is_live(self) -> bool {
        matches!(self, CasePhase::Open | CasePhase::Reminded)
    }
}

#[derive(Debug, Clone)]
struct LiveCase {
    channel_id: String,
    prompt_id: Option<String>,
    phase: CasePhase,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Remind,
    Close,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub resumed: usize,
    pub expired: usize,
    pub purged: usize,
}

/// Timed "resolved?" workflow attached to threads.
///
/// A case moves Open -> Reminded after one interval and is closed (thread
/// destroyed, row deleted) after a second. Cancelling stops the timer and
/// turns the prompt into a "needs more detail" notice. Rows in
/// `resolution_cases` are the only durable state; [`Self::recover`]
/// rebuilds timers from them at startup.
pub struct ResolutionWorkflow {
    db: Arc<Database>,
    gateway: Arc<dyn MessageGateway>,
    clock: Arc<dyn Clock>,
    timers: TimerService,
    interval: Duration,
    cases: Mutex<HashMap<String, LiveCase>>,
}

impl ResolutionWorkflow {
    pub fn new(
        db: Arc<Database>,
        gateway: Arc<dyn MessageGateway>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            gateway,
            clock,
            timers: TimerService::new(),
            interval,
            cases: Mutex::new(HashMap::new()),
        })
    }

    fn interval_hours(&self) -> u64 {
        (self.interval.as_secs() / 3600).max(1)
    }

    pub fn phase(&self, case_id: &str) -> Option<CasePhase> {
        self.lock_cases().get(case_id).map(|c| c.phase)
    }

    pub fn has_pending_timer(&self, case_id: &str) -> bool {
        self.timers.is_pending(case_id)
    }

    /// Open a case for `host`. Returns false if one already exists.
    pub async fn open(self: &Arc<Self>, host: &ChatMessage) -> Result<bool, CoreError> {
        let row = CaseRow {
            case_id: host.id.clone(),
            channel_id: host.channel_id.clone(),
            created_at: self.clock.now(),
            prompt_id: None,
            reminded: false,
        };
        if !self.db.insert_case(&row)? {
            info!("Resolution case {} already open", host.id);
            return Ok(false);
        }

        let prompt = match self
            .gateway
            .reply(host, &render::resolution_prompt(&host.id, self.interval_hours()))
            .await
        {
            Ok(prompt) => prompt,
            Err(e) => {
                self.db.delete_case(&host.id)?;
                return Err(e.into());
            }
        };
        if let Err(e) = self.db.set_case_prompt(&host.id, &prompt.id) {
            if let Err(cleanup) = self.db.delete_case(&host.id) {
                error!("Failed to drop half-opened case {}: {:#}", host.id, cleanup);
            }
            return Err(e.into());
        }

        self.lock_cases().insert(
            host.id.clone(),
            LiveCase {
                channel_id: host.channel_id.clone(),
                prompt_id: Some(prompt.id),
                phase: CasePhase::Open,
            },
        );
        self.schedule(&host.id, Step::Remind, self.interval);

        info!("Resolution case {} opened in {}", host.id, host.channel_id);
        Ok(true)
    }

    /// Cancel a live case. Returns false if there is nothing to cancel.
    ///
    /// The phase flips to Cancelled before the timer is stopped, so a
    /// callback that already started sees it and backs off. The row is
    /// deleted last; a crash in between leaves it for the next recovery.
    pub async fn cancel(&self, case_id: &str) -> Result<bool, CoreError> {
        let case = {
            let mut cases = self.lock_cases();
            match cases.get_mut(case_id) {
                Some(case) if case.phase.is_live() => {
                    case.phase = CasePhase::Cancelled;
                    case.clone()
                }
                _ => return Ok(false),
            }
        };
        self.timers.cancel(case_id);

        if let Some(prompt_id) = &case.prompt_id {
            match self
                .gateway
                .edit(&case.channel_id, prompt_id, &render::resolution_cancelled())
                .await
            {
                Ok(()) | Err(GatewayError::NotFound) => {}
                Err(e) => warn!("Failed to update prompt of case {}: {}", case_id, e),
            }
        }

        self.db.delete_case(case_id)?;
        self.lock_cases().remove(case_id);
        info!("Resolution case {} cancelled", case_id);
        Ok(true)
    }

    /// Rebuild timers from persisted cases.
    ///
    /// Cases whose thread is gone are purged silently. Cases older than two
    /// intervals are dropped without replaying the close. An owed reminder
    /// is sent immediately; the remaining lifetime is then slept off.
    pub async fn recover(self: &Arc<Self>) -> Result<RecoveryReport, CoreError> {
        let mut report = RecoveryReport::default();
        let now = self.clock.now();
        let interval = self.interval.as_secs() as i64;

        for row in self.db.list_cases()? {
            let host = match self.gateway.fetch(&row.channel_id, &row.case_id).await {
                Ok(Some(host)) => host,
                Ok(None) | Err(GatewayError::NotFound) => {
                    warn!("Resolution case {} lost its thread, purging", row.case_id);
                    self.db.delete_case(&row.case_id)?;
                    report.purged += 1;
                    continue;
                }
                Err(e) => {
                    // Keep the row so a later restart can retry the lookup
                    error!("Could not verify resolution case {}: {}", row.case_id, e);
                    continue;
                }
            };

            let elapsed = (now - row.created_at).max(0);
            let remaining = 2 * interval - elapsed;
            if remaining <= 0 {
                info!("Resolution case {} expired while offline, dropping", row.case_id);
                self.db.delete_case(&row.case_id)?;
                report.expired += 1;
                continue;
            }

            self.lock_cases().insert(
                row.case_id.clone(),
                LiveCase {
                    channel_id: row.channel_id.clone(),
                    prompt_id: row.prompt_id.clone(),
                    phase: if row.reminded {
                        CasePhase::Reminded
                    } else {
                        CasePhase::Open
                    },
                },
            );

            let until_close = Duration::from_secs(remaining as u64);
            if row.reminded {
                // Only the close is still owed, even if the interval grew
                self.schedule(&row.case_id, Step::Close, until_close);
            } else if elapsed < interval {
                let delay = Duration::from_secs((interval - elapsed) as u64);
                self.schedule(&row.case_id, Step::Remind, delay);
            } else {
                self.send_reminder(&row.case_id, &host).await;
                self.schedule(&row.case_id, Step::Close, until_close);
            }

            report.resumed += 1;
        }

        info!(
            "Resolution recovery: {} resumed, {} expired, {} purged",
            report.resumed, report.expired, report.purged
        );
        Ok(report)
    }

    fn schedule(self: &Arc<Self>, case_id: &str, step: Step, delay: Duration) {
        let this = Arc::clone(self);
        let id = case_id.to_string();
        self.timers.schedule(case_id, delay, async move {
            match step {
                Step::Remind => this.on_remind(&id).await,
                Step::Close => this.on_close(&id).await,
            }
        });
    }

    async fn on_remind(self: &Arc<Self>, case_id: &str) {
        let channel_id = match self.live_phase(case_id) {
            Some((CasePhase::Open, channel_id)) => channel_id,
            _ => return,
        };

        match self.gateway.fetch(&channel_id, case_id).await {
            Ok(Some(host)) => self.send_reminder(case_id, &host).await,
            Ok(None) | Err(GatewayError::NotFound) => {
                warn!("Resolution case {} lost its thread, purging", case_id);
                self.purge(case_id);
                return;
            }
            Err(e) => error!("Could not fetch thread of case {}: {}", case_id, e),
        }

        // Cancelled while the reminder was in flight
        if self.live_phase(case_id).is_some_and(|(phase, _)| phase.is_live()) {
            self.schedule(case_id, Step::Close, self.interval);
        }
    }

    /// Destroy the thread and drop the case. A missing thread counts as
    /// destroyed; any other failure keeps the case live and retries.
    async fn on_close(self: &Arc<Self>, case_id: &str) {
        let (channel_id, previous) = {
            let mut cases = self.lock_cases();
            match cases.get_mut(case_id) {
                Some(case) if case.phase.is_live() => {
                    let previous = case.phase;
                    case.phase = CasePhase::Closed;
                    (case.channel_id.clone(), previous)
                }
                _ => return,
            }
        };

        match self.gateway.delete_channel(&channel_id).await {
            Ok(()) => info!("Resolution case {} closed, thread {} deleted", case_id, channel_id),
            Err(GatewayError::NotFound) => {
                warn!("Thread {} of case {} already gone", channel_id, case_id)
            }
            Err(e) => {
                error!(
                    "Failed to delete thread {} of case {}, retrying in {:?}: {}",
                    channel_id, case_id, CLOSE_RETRY_DELAY, e
                );
                if let Some(case) = self.lock_cases().get_mut(case_id) {
                    case.phase = previous;
                }
                self.schedule(case_id, Step::Close, CLOSE_RETRY_DELAY);
                return;
            }
        }
        self.purge(case_id);
    }

    async fn send_reminder(&self, case_id: &str, host: &ChatMessage) {
        let reminder = render::resolution_reminder(self.interval_hours());
        if let Err(e) = self.gateway.reply(host, &reminder).await {
            error!("Failed to post reminder for case {}: {}", case_id, e);
            return;
        }
        if let Err(e) = self.db.mark_case_reminded(case_id) {
            error!("Failed to record reminder for case {}: {:#}", case_id, e);
        }
        if let Some(case) = self.lock_cases().get_mut(case_id) {
            if case.phase == CasePhase::Open {
                case.phase = CasePhase::Reminded;
            }
        }
    }

    fn purge(&self, case_id: &str) {
        if let Err(e) = self.db.delete_case(case_id) {
            error!("Failed to delete resolution case {}: {:#}", case_id, e);
        }
        self.lock_cases().remove(case_id);
    }

    fn live_phase(&self, case_id: &str) -> Option<(CasePhase, String)> {
        self.lock_cases()
            .get(case_id)
            .map(|c| (c.phase, c.channel_id.clone()))
    }

    fn lock_cases(&self) -> std::sync::MutexGuard<'_, HashMap<String, LiveCase>> {
        self.cases.lock().unwrap_or_else(|e| e.into_inner())
    }
}
