//! Output formatting utilities for the CLI
//!
//! Tables for configurations and desktops, the refresh countdown bar and
//! coloured status lines.

use tabled::{settings::Style, Table, Tabled};

use dm_core::catalog::ConfigurationTree;
use dm_core::types::DesktopSnapshot;

/// Format the accessible configurations as a table
pub fn format_configurations(tree: &ConfigurationTree) -> String {
    if tree.values().all(|flavors| flavors.is_empty()) {
        return "No configurations available".to_string();
    }

    #[derive(Tabled)]
    struct ConfigurationRow {
        #[tabled(rename = "CONFIGURATION")]
        name: String,
        #[tabled(rename = "FACILITY")]
        facility: String,
        #[tabled(rename = "FLAVOR")]
        flavor: String,
        #[tabled(rename = "HOURS")]
        hours: u32,
        #[tabled(rename = "PPN")]
        ppn: u32,
        #[tabled(rename = "MEM")]
        mem: u32,
    }

    let rows: Vec<ConfigurationRow> = tree
        .values()
        .flat_map(|flavors| flavors.values())
        .map(|c| ConfigurationRow {
            name: c.name.to_string(),
            facility: c.facility.clone(),
            flavor: c.flavor.clone(),
            hours: c.defaults.hours,
            ppn: c.defaults.ppn,
            mem: c.defaults.mem,
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format a desktop snapshot as a table, in job id order
pub fn format_desktops(snapshot: &DesktopSnapshot) -> String {
    if snapshot.is_empty() {
        return "No desktops running".to_string();
    }

    #[derive(Tabled)]
    struct DesktopRow {
        #[tabled(rename = "JOB ID")]
        id: String,
        #[tabled(rename = "WALLTIME")]
        walltime: String,
        #[tabled(rename = "STATUS")]
        status: String,
    }

    let mut jobs: Vec<_> = snapshot.jobs().iter().collect();
    jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));

    let rows: Vec<DesktopRow> = jobs
        .into_iter()
        .map(|j| DesktopRow {
            id: truncate(j.job_id.as_str(), 24),
            walltime: j
                .remaining_walltime
                .clone()
                .unwrap_or_else(|| "-".to_string()),
            status: if j.running { "running" } else { "queued" }.to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Progress bar for the time left until the next refresh
pub fn format_countdown(remaining: u32, total: u32, width: usize) -> String {
    let total = total.max(1);
    let remaining = remaining.min(total);
    let filled = (remaining as usize * width) / total as usize;
    format!(
        "Next refresh [{}{}]",
        "#".repeat(filled),
        "-".repeat(width - filled)
    )
}

/// Truncate a string with ellipsis if too long
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix, to stderr
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow, to stderr
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use dm_core::types::{Configuration, JobRecord, LaunchDefaults};

    #[test]
    fn test_format_desktops_sorted_with_status() {
        let snapshot: DesktopSnapshot = vec![
            JobRecord::new("102").with_status(false),
            JobRecord::new("101").with_walltime("01:59:00").with_status(true),
        ]
        .into_iter()
        .collect();

        let table = format_desktops(&snapshot);
        assert!(table.contains("JOB ID"));
        assert!(table.contains("01:59:00"));
        assert!(table.contains("running"));
        assert!(table.contains("queued"));
        assert!(table.find("101").unwrap() < table.find("102").unwrap());
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_desktops(&DesktopSnapshot::new()), "No desktops running");
        assert_eq!(
            format_configurations(&ConfigurationTree::new()),
            "No configurations available"
        );
    }

    #[test]
    fn test_format_configurations() {
        let mut tree = ConfigurationTree::new();
        let gpu = Configuration::new(
            "siteA",
            "gpu",
            LaunchDefaults {
                hours: 4,
                ppn: 2,
                mem: 16,
            },
        );
        tree.entry("siteA".to_string())
            .or_default()
            .insert("gpu".to_string(), gpu);

        let table = format_configurations(&tree);
        assert!(table.contains("siteA|gpu"));
        assert!(table.contains("FLAVOR"));
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(100, 100, 10), "Next refresh [##########]");
        assert_eq!(format_countdown(50, 100, 10), "Next refresh [#####-----]");
        assert_eq!(format_countdown(0, 100, 4), "Next refresh [----]");
        assert_eq!(format_countdown(7, 0, 2), "Next refresh [##]");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-job-identifier", 10), "a-very-...");
    }
}
