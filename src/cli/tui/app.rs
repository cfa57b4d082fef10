//! TUI application state and logic.

use chrono::{DateTime, Local};

use crate::auth::ServerAddress;
use crate::client::JobSource;
use crate::core::{Job, Usage};
use crate::error::Result;

/// Data from the most recent successful query.
#[derive(Debug, Default)]
pub struct AppData {
    pub server: Option<ServerAddress>,
    pub jobs: Vec<Job>,
    pub usage: Usage,
    pub refreshed_at: Option<DateTime<Local>>,
}

/// Current view being displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Occupancy bars and the job list.
    Dashboard {
        /// Selected index in the job list
        selected: usize,
    },
    /// All attributes of one job.
    Detail {
        job_id: String,
        /// Scroll offset for long content
        scroll: u16,
    },
}

impl Default for View {
    fn default() -> Self {
        View::Dashboard { selected: 0 }
    }
}

/// Actions that can be triggered by user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    Select,
    Back,
    Refresh,
    Redraw,
}

/// Main TUI application state.
pub struct TuiApp {
    source: Box<dyn JobSource>,
    pub view: View,
    pub data: AppData,
    pub running: bool,
}

impl TuiApp {
    pub fn new(source: Box<dyn JobSource>) -> Self {
        Self {
            source,
            view: View::default(),
            data: AppData::default(),
            running: true,
        }
    }

    /// Replace the job list with a fresh query. A failed query leaves the
    /// previous data untouched and is returned to the caller.
    pub async fn refresh(&mut self) -> Result<()> {
        let report = self.source.fetch().await?;

        // Jobs arrive in no particular order.
        let mut jobs = report.jobs;
        jobs.sort_by(|a, b| a.id.cmp(&b.id));

        self.data.usage = Usage::from_jobs(&jobs);
        self.data.jobs = jobs;
        self.data.server = Some(report.server);
        self.data.refreshed_at = Some(Local::now());
        self.clamp_selection();
        Ok(())
    }

    /// Handle an action and update state accordingly.
    pub async fn handle_action(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,
            Action::Refresh => self.refresh().await?,
            Action::Back => {
                if let View::Detail { job_id, .. } = &self.view {
                    let selected = self.index_of(job_id).unwrap_or(0);
                    self.view = View::Dashboard { selected };
                }
            }
            Action::Up => self.navigate_up(),
            Action::Down => self.navigate_down(),
            Action::Select => self.select_item(),
            Action::Redraw => {}
        }
        Ok(())
    }

    /// Job shown in the detail view, if it still exists.
    pub fn detail_job(&self) -> Option<&Job> {
        match &self.view {
            View::Detail { job_id, .. } => self.data.jobs.iter().find(|j| &j.id == job_id),
            View::Dashboard { .. } => None,
        }
    }

    fn index_of(&self, job_id: &str) -> Option<usize> {
        self.data.jobs.iter().position(|j| j.id == job_id)
    }

    fn clamp_selection(&mut self) {
        if let View::Dashboard { selected } = &mut self.view {
            *selected = (*selected).min(self.data.jobs.len().saturating_sub(1));
        }
    }

    fn navigate_up(&mut self) {
        match &mut self.view {
            View::Dashboard { selected } => *selected = selected.saturating_sub(1),
            View::Detail { scroll, .. } => *scroll = scroll.saturating_sub(1),
        }
    }

    fn navigate_down(&mut self) {
        let len = self.data.jobs.len();
        match &mut self.view {
            View::Dashboard { selected } => {
                if *selected + 1 < len {
                    *selected += 1;
                }
            }
            View::Detail { scroll, .. } => *scroll = scroll.saturating_add(1),
        }
    }

    fn select_item(&mut self) {
        if let View::Dashboard { selected } = self.view {
            if let Some(job) = self.data.jobs.get(selected) {
                self.view = View::Detail {
                    job_id: job.id.clone(),
                    scroll: 0,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::StatusReport;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Hands out queued replies in order.
    struct CannedSource {
        replies: Mutex<Vec<Result<Vec<Job>>>>,
    }

    impl CannedSource {
        fn new(mut replies: Vec<Result<Vec<Job>>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl JobSource for CannedSource {
        async fn fetch(&self) -> Result<StatusReport> {
            let next = self.replies.lock().unwrap().pop().expect("no reply queued");
            next.map(|jobs| StatusReport {
                server: ServerAddress {
                    host: "10.0.0.5".to_string(),
                    port: 15001,
                },
                jobs,
            })
        }
    }

    fn jobs(ids: &[&str]) -> Vec<Job> {
        ids.iter().map(|id| Job::new(*id)).collect()
    }

    #[tokio::test]
    async fn test_refresh_sorts_jobs() {
        let source = CannedSource::new(vec![Ok(jobs(&["3.pbs", "1.pbs", "2.pbs"]))]);
        let mut app = TuiApp::new(Box::new(source));

        app.refresh().await.unwrap();

        let ids: Vec<_> = app.data.jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["1.pbs", "2.pbs", "3.pbs"]);
        assert_eq!(app.data.server.as_ref().unwrap().port, 15001);
        assert!(app.data.refreshed_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_refresh_is_returned() {
        let source = CannedSource::new(vec![
            Ok(jobs(&["1.pbs"])),
            Err(Error::Batch { code: 15001, aux: 0 }),
        ]);
        let mut app = TuiApp::new(Box::new(source));

        app.refresh().await.unwrap();
        let err = app.handle_action(Action::Refresh).await.unwrap_err();

        assert!(matches!(err, Error::Batch { code: 15001, .. }));
        assert_eq!(app.data.jobs.len(), 1);
    }

    #[tokio::test]
    async fn test_navigation_and_detail() {
        let source = CannedSource::new(vec![Ok(jobs(&["1.pbs", "2.pbs"]))]);
        let mut app = TuiApp::new(Box::new(source));
        app.refresh().await.unwrap();

        app.handle_action(Action::Down).await.unwrap();
        app.handle_action(Action::Down).await.unwrap();
        assert_eq!(app.view, View::Dashboard { selected: 1 });

        app.handle_action(Action::Select).await.unwrap();
        assert_eq!(app.detail_job().map(|j| j.id.as_str()), Some("2.pbs"));

        app.handle_action(Action::Back).await.unwrap();
        assert_eq!(app.view, View::Dashboard { selected: 1 });

        app.handle_action(Action::Quit).await.unwrap();
        assert!(!app.running);
    }

    #[tokio::test]
    async fn test_selection_clamped_when_jobs_disappear() {
        let source = CannedSource::new(vec![Ok(jobs(&["1.pbs", "2.pbs", "3.pbs"])), Ok(vec![])]);
        let mut app = TuiApp::new(Box::new(source));
        app.refresh().await.unwrap();
        app.view = View::Dashboard { selected: 2 };

        app.refresh().await.unwrap();
        assert_eq!(app.view, View::Dashboard { selected: 0 });
    }
}
