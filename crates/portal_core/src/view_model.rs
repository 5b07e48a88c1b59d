use chrono::{DateTime, TimeZone};

use crate::{daily_applications, sort_recent_first, Application, DailyPoint};
use crate::{ResumeFailure, ResumeFile, TabId};

/// Rows shown in the recent applications table.
pub const RECENT_APPLICATIONS: usize = 10;

/// Snapshot of the relay connection, replaced wholesale on every transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub connecting: bool,
    pub extension_installed: bool,
    pub connected_tab_id: Option<TabId>,
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        if self.connected {
            "Connected"
        } else if self.connecting {
            "Connecting..."
        } else {
            "Disconnected"
        }
    }

    /// Whether a connect button should be enabled.
    pub fn can_connect(&self) -> bool {
        self.extension_installed && !self.connected && !self.connecting
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadStatus {
    pub is_uploading: bool,
    /// Percentage, only meaningful while `is_uploading`.
    pub progress: u8,
    pub resumes: Vec<ResumeFile>,
    pub error: Option<ResumeFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardView {
    pub total: usize,
    pub recent: Vec<Application>,
    pub daily: Vec<DailyPoint>,
}

impl DashboardView {
    pub fn from_applications<Tz: TimeZone>(
        mut applications: Vec<Application>,
        now: &DateTime<Tz>,
    ) -> Self {
        sort_recent_first(&mut applications, &now.timezone());
        let daily = daily_applications(&applications, now);
        let total = applications.len();
        applications.truncate(RECENT_APPLICATIONS);
        Self {
            total,
            recent: applications,
            daily,
        }
    }
}
