use std::fmt::Write;

use comfy_table::{Cell, Table};
use indexmap::IndexMap;

use crate::dashboard::{DashboardSnapshot, Panel};
use crate::records::{format_branch, BuildInfo, Project, PullRequest, Release, ReleaseStage};

use super::styling::{failure, heading, muted, notice, scope};
use super::tables::{create_table, status_cell, timestamp_cell};

/// Rows shown per panel in the combined dashboard view.
const DASHBOARD_ROWS: usize = 10;

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", heading(emoji), heading(title).underlined());
}

fn add_empty_notice(output: &mut String, what: &str) {
    let _ = writeln!(output, "{}\n", notice(format!("No {what} found.")));
}

fn add_table(output: &mut String, table: &Table) {
    let _ = writeln!(output, "{table}\n");
}

fn add_truncation_notice(output: &mut String, shown: usize, total: usize) {
    if total > shown {
        let _ = writeln!(output, "  {}\n", muted(format!("… and {} more", total - shown)));
    }
}

pub fn render_projects(projects: &[Project]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "📁", "Projects");

    if projects.is_empty() {
        add_empty_notice(&mut output, "projects");
        return output;
    }

    let mut table = create_table(&["Name", "Description", "State", "Visibility"]);
    for project in projects {
        table.add_row(vec![
            Cell::new(&project.name),
            Cell::new(&project.description),
            status_cell(&project.state),
            Cell::new(&project.visibility),
        ]);
    }
    add_table(&mut output, &table);
    output
}

fn pull_request_table(pull_requests: &[PullRequest]) -> Table {
    let mut table = create_table(&["ID", "Title", "Author", "Branches", "Repository", "Created"]);
    for pr in pull_requests {
        table.add_row(vec![
            Cell::new(pr.id),
            Cell::new(&pr.title),
            Cell::new(&pr.created_by),
            Cell::new(format!("{} → {}", pr.source_branch(), pr.target_branch())),
            Cell::new(&pr.repository.name),
            timestamp_cell(pr.created_at),
        ]);
    }
    table
}

pub fn render_pull_requests(pull_requests: &[PullRequest]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🔀", "Active Pull Requests");

    if pull_requests.is_empty() {
        add_empty_notice(&mut output, "active pull requests");
        return output;
    }

    add_table(&mut output, &pull_request_table(pull_requests));
    output
}

fn build_table(builds: &[BuildInfo]) -> Table {
    let mut table = create_table(&[
        "Build",
        "Definition",
        "Status",
        "Result",
        "Branch",
        "Requested for",
        "Duration",
    ]);
    for build in builds {
        table.add_row(vec![
            Cell::new(build.display_name()),
            Cell::new(&build.definition),
            status_cell(&build.status),
            status_cell(&build.result),
            Cell::new(build.formatted_branch()),
            Cell::new(&build.requested_for),
            Cell::new(build.duration_display()),
        ]);
    }
    table
}

pub fn render_builds(builds: &[BuildInfo]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🏗️", "Builds");

    if builds.is_empty() {
        add_empty_notice(&mut output, "builds");
        return output;
    }

    add_table(&mut output, &build_table(builds));
    output
}

fn release_stage_table(stages: &[&ReleaseStage]) -> Table {
    let mut table = create_table(&["Stage", "Status", "Last deployment"]);
    for stage in stages {
        table.add_row(vec![
            Cell::new(&stage.stage_name),
            status_cell(&stage.status),
            timestamp_cell(stage.last_release_date),
        ]);
    }
    table
}

/// Stages grouped under their release, in first-seen order.
fn group_by_release(stages: &[ReleaseStage]) -> IndexMap<&str, Vec<&ReleaseStage>> {
    let mut groups: IndexMap<&str, Vec<&ReleaseStage>> = IndexMap::new();
    for stage in stages {
        groups
            .entry(stage.release_name.as_str())
            .or_default()
            .push(stage);
    }
    groups
}

fn add_release_stage_groups(output: &mut String, stages: &[ReleaseStage]) {
    for (release, stages) in group_by_release(stages) {
        let _ = writeln!(output, "  {}", scope(release));
        add_table(output, &release_stage_table(&stages));
    }
}

pub fn render_release_stages(stages: &[ReleaseStage]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🚀", "Release Stages");

    if stages.is_empty() {
        add_empty_notice(&mut output, "release stages");
        return output;
    }

    add_release_stage_groups(&mut output, stages);
    output
}

pub fn render_releases(releases: &[Release]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🚀", "Latest Releases");

    if releases.is_empty() {
        add_empty_notice(&mut output, "releases");
        return output;
    }

    for release in releases {
        let created = release
            .created_on
            .map(|ts| ts.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            output,
            "  {} {} {} {}",
            scope(&release.definition_name),
            heading(&release.name),
            muted(format_branch(&release.source_branch)),
            muted(created)
        );

        if release.stages.is_empty() {
            let _ = writeln!(output, "  {}\n", muted("No stages"));
            continue;
        }
        let stages: Vec<&ReleaseStage> = release.stages.iter().collect();
        add_table(&mut output, &release_stage_table(&stages));
    }
    output
}

fn add_failed_panel(output: &mut String, error: &str) {
    let _ = writeln!(output, "  {}\n", failure(format!("Unavailable: {error}")));
}

pub fn render_dashboard(snapshot: &DashboardSnapshot) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");
    let _ = writeln!(
        output,
        "  {} {}",
        muted("Organization:"),
        scope(&snapshot.organization)
    );
    let _ = writeln!(output, "  {} {}", muted("Project:"), scope(&snapshot.project));
    let _ = writeln!(
        output,
        "  {} {}\n",
        muted("Updated:"),
        muted(snapshot.collected_at.format("%Y-%m-%d %H:%M:%S UTC"))
    );

    match &snapshot.pull_requests {
        Panel::Loaded(pull_requests) => {
            output.push_str(&render_pull_requests(
                &pull_requests[..pull_requests.len().min(DASHBOARD_ROWS)],
            ));
            add_truncation_notice(&mut output, DASHBOARD_ROWS, pull_requests.len());
        }
        Panel::Failed(error) => {
            add_section_header(&mut output, "🔀", "Active Pull Requests");
            add_failed_panel(&mut output, error);
        }
    }

    match &snapshot.builds {
        Panel::Loaded(builds) => {
            output.push_str(&render_builds(&builds[..builds.len().min(DASHBOARD_ROWS)]));
            add_truncation_notice(&mut output, DASHBOARD_ROWS, builds.len());
        }
        Panel::Failed(error) => {
            add_section_header(&mut output, "🏗️", "Builds");
            add_failed_panel(&mut output, error);
        }
    }

    match &snapshot.release_stages {
        Panel::Loaded(stages) => output.push_str(&render_release_stages(stages)),
        Panel::Failed(error) => {
            add_section_header(&mut output, "🚀", "Release Stages");
            add_failed_panel(&mut output, error);
        }
    }

    output
}
