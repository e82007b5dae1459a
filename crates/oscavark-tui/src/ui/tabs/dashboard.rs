use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use oscavark_core::auth::Role;
use oscavark_core::models::LearningStyle;
use oscavark_core::utils::format::{format_minutes, format_optional, format_percent};
use oscavark_core::utils::{format_date, format_phone};

use crate::app::App;
use crate::ui::styles;

/// Render the dashboard for the signed-in role.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    match app.role() {
        Some(Role::Osca) | Some(Role::Basca) => render_senior_affairs(frame, app, area),
        Some(Role::Senior) => render_senior_record(frame, app, area),
        Some(Role::Teacher) => render_teacher(frame, app, area),
        Some(Role::Student) => render_student(frame, app, area),
        None => {
            let paragraph = Paragraph::new(Line::from(Span::styled(
                "Sign in to see your dashboard",
                styles::muted_style(),
            )))
            .block(panel(" Dashboard "));
            frame.render_widget(paragraph, area);
        }
    }
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false))
}

/// `Label:      value` with the label padded to a fixed column.
fn stat_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<22}", format!("{}:", label)), styles::muted_style()),
        Span::styled(value, styles::list_item_style()),
    ])
}

fn section(title: &str) -> Line<'static> {
    Line::from(Span::styled(title.to_string(), styles::highlight_style()))
}

/// A bar of `width` cells filled in proportion to `value / max`.
fn bar(value: u64, max: u64, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let filled = ((value as f64 / max as f64) * width as f64).round() as usize;
    "█".repeat(filled.min(width))
}

// ===== OSCA / BASCA =====

fn render_senior_affairs(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let stats = &app.senior_stats;
    let scope = match stats.barangay.as_deref() {
        Some(b) => format!("Barangay {}", b),
        None => "All barangays".to_string(),
    };

    let mut lines = vec![
        Line::from(Span::styled(scope, styles::title_style())),
        Line::from(""),
        section("Registry"),
        stat_line("Senior citizens", stats.total_seniors.to_string()),
        Line::from(vec![
            Span::styled(format!("{:<22}", "Active:"), styles::muted_style()),
            Span::styled(stats.active.to_string(), styles::success_style()),
        ]),
        Line::from(vec![
            Span::styled(format!("{:<22}", "Inactive:"), styles::muted_style()),
            Span::styled(stats.inactive.to_string(), styles::highlight_style()),
        ]),
        stat_line("Deceased", stats.deceased.to_string()),
        stat_line("Registered this month", stats.registered_this_month.to_string()),
        Line::from(""),
        section("Beneficiaries"),
        stat_line("Total", stats.total_beneficiaries.to_string()),
    ];
    if stats.total_seniors == 0 {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "No senior citizens registered yet",
            styles::muted_style(),
        )));
    }
    frame.render_widget(Paragraph::new(lines).block(panel(" Overview ")), chunks[0]);

    let max = stats.by_barangay.first().map(|b| b.count).unwrap_or(0);
    let bar_width = (chunks[1].width as usize).saturating_sub(30).max(5);
    let mut lines = Vec::new();
    if stats.by_barangay.is_empty() {
        lines.push(Line::from(Span::styled("No data", styles::muted_style())));
    }
    for entry in &stats.by_barangay {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<18}", truncate(&entry.barangay, 17)), styles::list_item_style()),
            Span::styled(format!("{:>5} ", entry.count), styles::muted_style()),
            Span::styled(bar(entry.count, max, bar_width), styles::title_style()),
        ]));
    }
    frame.render_widget(Paragraph::new(lines).block(panel(" By Barangay ")), chunks[1]);
}

fn truncate(s: &str, max: usize) -> String {
    oscavark_core::utils::truncate_string(s, max)
}

// ===== Senior citizen =====

fn render_senior_record(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let placeholder = "-";
    let record = &app.senior_record;

    let lines = match record.senior {
        Some(ref senior) => {
            let mut lines = vec![
                Line::from(Span::styled(senior.display_name(), styles::title_style())),
                Line::from(""),
                section("Registration"),
                stat_line("OSCA ID", format_optional(&senior.osca_id, placeholder)),
                Line::from(vec![
                    Span::styled(format!("{:<22}", "Status:"), styles::muted_style()),
                    Span::styled(senior.status.to_string(), styles::senior_status_style(senior.status)),
                ]),
                stat_line(
                    "Registered",
                    senior
                        .registration_date
                        .map(format_date)
                        .unwrap_or_else(|| placeholder.to_string()),
                ),
                Line::from(""),
                section("Personal"),
                stat_line(
                    "Birth date",
                    senior.birth_date.map(format_date).unwrap_or_else(|| placeholder.to_string()),
                ),
                stat_line(
                    "Age",
                    senior.age().map(|a| a.to_string()).unwrap_or_else(|| placeholder.to_string()),
                ),
                stat_line("Gender", senior.gender.to_string()),
                stat_line("Civil status", format_optional(&senior.civil_status, placeholder)),
                Line::from(""),
                section("Contact"),
                stat_line("Barangay", senior.barangay.clone()),
                stat_line("Address", format_optional(&senior.address, placeholder)),
                stat_line(
                    "Phone",
                    senior
                        .contact_number
                        .as_deref()
                        .map(format_phone)
                        .unwrap_or_else(|| placeholder.to_string()),
                ),
            ];
            if let Some(ref name) = senior.emergency_contact_name {
                let number = senior
                    .emergency_contact_number
                    .as_deref()
                    .map(format_phone)
                    .unwrap_or_default();
                lines.push(stat_line("Emergency contact", format!("{} {}", name, number)));
            }
            lines
        }
        None => vec![
            Line::from(Span::styled("No registry record", styles::title_style())),
            Line::from(""),
            Line::from(Span::styled(
                "Your account is not linked to a senior citizen record yet.",
                styles::muted_style(),
            )),
            Line::from(Span::styled(
                "Please visit your BASCA office.",
                styles::muted_style(),
            )),
        ],
    };
    frame.render_widget(
        Paragraph::new(lines)
            .block(panel(" My Record "))
            .wrap(Wrap { trim: false }),
        chunks[0],
    );

    let mut lines = Vec::new();
    if record.beneficiaries.is_empty() {
        lines.push(Line::from(Span::styled("No beneficiaries on file", styles::muted_style())));
    }
    for b in &record.beneficiaries {
        let mut name = vec![Span::styled(b.full_name(), styles::list_item_style())];
        if b.is_primary {
            name.push(Span::styled("  (primary)", styles::success_style()));
        }
        lines.push(Line::from(name));
        lines.push(Line::from(vec![
            Span::styled("  Relationship: ", styles::muted_style()),
            Span::raw(b.relationship.clone()),
        ]));
        if let Some(ref phone) = b.contact_number {
            lines.push(Line::from(vec![
                Span::styled("  Phone:        ", styles::muted_style()),
                Span::raw(format_phone(phone)),
            ]));
        }
        lines.push(Line::from(""));
    }
    frame.render_widget(Paragraph::new(lines).block(panel(" Beneficiaries ")), chunks[1]);
}

// ===== Teacher =====

fn render_teacher(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let stats = &app.teacher_stats;
    let name = app.auth.as_ref().map(|a| a.display_name()).unwrap_or_default();
    let lines = vec![
        Line::from(Span::styled(format!("Welcome, {}", name), styles::title_style())),
        Line::from(""),
        section("Classes"),
        stat_line("Classes", stats.total_classes.to_string()),
        stat_line("Students", stats.total_students.to_string()),
        stat_line("Pending submissions", stats.pending_submissions.to_string()),
        Line::from(""),
        section("Modules"),
        stat_line("Modules", stats.total_modules.to_string()),
        stat_line("Published", stats.published_modules.to_string()),
        stat_line("Drafts", stats.total_modules.saturating_sub(stats.published_modules).to_string()),
        Line::from(""),
        section("Results"),
        stat_line("Average student score", format_percent(stats.average_student_score)),
    ];
    frame.render_widget(Paragraph::new(lines).block(panel(" Overview ")), chunks[0]);

    let max = stats.modules_by_style.iter().map(|(_, c)| *c).max().unwrap_or(0);
    let bar_width = (chunks[1].width as usize).saturating_sub(28).max(5);
    let mut lines = vec![section("Modules by learning style"), Line::from("")];
    for style in LearningStyle::ALL {
        let count = stats
            .modules_by_style
            .iter()
            .find(|(s, _)| *s == style)
            .map(|(_, c)| *c)
            .unwrap_or(0);
        lines.push(Line::from(vec![
            Span::styled(format!("{:<16}", style.to_string()), styles::learning_style_style(Some(style))),
            Span::styled(format!("{:>4} ", count), styles::muted_style()),
            Span::styled(bar(count, max, bar_width), styles::learning_style_style(Some(style))),
        ]));
    }
    frame.render_widget(Paragraph::new(lines).block(panel(" VARK Mix ")), chunks[1]);
}

// ===== Student =====

fn render_student(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let stats = &app.student_stats;
    let name = app.auth.as_ref().map(|a| a.display_name()).unwrap_or_default();
    let style = match stats.learning_style {
        Some(s) => Span::styled(format!("{} ({})", s, s.code()), styles::learning_style_style(Some(s))),
        None => Span::styled("Not set", styles::muted_style()),
    };

    let lines = vec![
        Line::from(Span::styled(format!("Welcome, {}", name), styles::title_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("{:<22}", "Learning style:"), styles::muted_style()),
            style,
        ]),
        Line::from(""),
        section("Progress"),
        stat_line("Available modules", stats.total_modules.to_string()),
        stat_line("Completed", stats.completed_modules.to_string()),
        stat_line("In progress", stats.in_progress_modules.to_string()),
        stat_line("Completion", format_percent(stats.completion_rate())),
        stat_line("Time spent", format_minutes(stats.total_time_spent_minutes)),
        Line::from(""),
        section("Quizzes"),
        stat_line("Average score", format_percent(stats.average_score)),
    ];
    frame.render_widget(Paragraph::new(lines).block(panel(" Overview ")), chunks[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    let mut lines = Vec::new();
    if stats.recent_progress.is_empty() {
        lines.push(Line::from(Span::styled(
            "No activity yet. Open the Modules tab to start learning.",
            styles::muted_style(),
        )));
    }
    for progress in &stats.recent_progress {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<28}", truncate(&app.module_title(&progress.module_id), 27)),
                styles::list_item_style(),
            ),
            Span::styled(format!("{:>4.0}% ", progress.progress_percentage), styles::muted_style()),
            Span::styled(progress.status.to_string(), styles::highlight_style()),
        ]));
    }
    frame.render_widget(Paragraph::new(lines).block(panel(" Recent Activity ")), right[0]);

    let mut lines = Vec::new();
    if app.classes.is_empty() {
        lines.push(Line::from(Span::styled(
            "Not enrolled yet. Press [J] to join with a class code.",
            styles::muted_style(),
        )));
    }
    for class in &app.classes {
        lines.push(Line::from(vec![
            Span::styled(class.name.clone(), styles::list_item_style()),
            Span::styled(format!("  {}", class.subject), styles::muted_style()),
        ]));
    }
    frame.render_widget(Paragraph::new(lines).block(panel(" My Classes ")), right[1]);
}
