use chrono::{DateTime, TimeZone};
use portal_core::DashboardView;

use crate::{ApiError, ApplicationSource};

/// Fetch the application log once and project it for display.
///
/// On error callers fall back to [`DashboardView::default`] (no rows, no series)
/// and report the error alongside it.
pub async fn load_dashboard<Tz: TimeZone>(
    source: &dyn ApplicationSource,
    now: &DateTime<Tz>,
) -> Result<DashboardView, ApiError> {
    let applications = source.fetch_applications().await?;
    Ok(DashboardView::from_applications(applications, now))
}
