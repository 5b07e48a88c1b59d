use std::fmt::{Display, Write};

use chrono::TimeZone;
use portal_core::{
    format_file_size, format_timestamp, ConnectionStatus, DashboardView, ResumeFile, UploadStatus,
};

const BAR_WIDTH: usize = 30;
const PLACEHOLDER: &str = "-";

pub fn render_dashboard<Tz>(view: &DashboardView, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    let _ = writeln!(out, "Total applications: {}", format_with_commas(view.total as u64));
    let _ = writeln!(out);

    let _ = writeln!(out, "Recent applications");
    if view.recent.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for application in &view.recent {
        let _ = writeln!(
            out,
            "  {:<24} {:<32} posted {:<20} applied {}",
            or_placeholder(&application.company),
            or_placeholder(&application.job_title),
            or_placeholder(&application.posted_time),
            format_timestamp(&application.application_time, tz),
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Applications per day");
    let peak = view.daily.iter().map(|point| point.applied).max().unwrap_or(0);
    for point in &view.daily {
        let _ = writeln!(
            out,
            "  {:>6} | {:<width$} {}",
            point.label,
            bar(point.applied, peak),
            point.applied,
            width = BAR_WIDTH,
        );
    }
    out
}

pub fn render_resumes<Tz>(resumes: &[ResumeFile], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if resumes.is_empty() {
        return "No resumes uploaded yet\n".to_string();
    }
    let mut out = String::new();
    for resume in resumes {
        let _ = writeln!(
            out,
            "  {:<40} {:>10}  {}",
            resume.name,
            format_file_size(resume.size),
            format_timestamp(&resume.uploaded_at, tz),
        );
    }
    out
}

/// One-line summary of an upload controller snapshot.
pub fn render_upload_status(status: &UploadStatus) -> String {
    if let Some(error) = &status.error {
        return format!("Error: {error}");
    }
    if status.is_uploading {
        return format!("Uploading {} {}%", progress_bar(status.progress), status.progress);
    }
    format!("{} resume(s) stored", status.resumes.len())
}

pub fn render_connection(status: &ConnectionStatus) -> String {
    let mut out = format!(
        "Extension: {} | Relay: {}",
        if status.extension_installed {
            "Active"
        } else {
            "Inactive"
        },
        status.label()
    );
    if let Some(tab_id) = &status.connected_tab_id {
        let _ = write!(out, " | Tab ID: {tab_id}");
    }
    if let Some(error) = &status.error {
        let _ = write!(out, " | Error: {error}");
    }
    out
}

fn progress_bar(progress: u8) -> String {
    let filled = usize::from(progress.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), " ".repeat(BAR_WIDTH - filled))
}

fn bar(value: u32, peak: u32) -> String {
    if peak == 0 {
        return String::new();
    }
    let width = (value as usize * BAR_WIDTH).div_ceil(peak as usize);
    "#".repeat(width)
}

fn or_placeholder(text: &str) -> &str {
    if text.trim().is_empty() {
        PLACEHOLDER
    } else {
        text
    }
}

fn format_with_commas(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
