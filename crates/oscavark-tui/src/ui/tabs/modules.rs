use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use oscavark_core::auth::Role;
use oscavark_core::models::VarkModule;
use oscavark_core::utils::format::{format_minutes, format_optional};

use crate::app::{App, Focus};
use crate::ui::styles;

/// Render the modules tab. Teachers see their own modules with publish
/// state; students see published modules with their progress.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_table(frame, app, chunks[0]);
    render_detail(frame, app, app.selected_module(), chunks[1]);
}

fn is_teacher(app: &App) -> bool {
    app.role() == Some(Role::Teacher)
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let modules = app.visible_modules();
    let focused = matches!(app.focus, Focus::List);
    let teacher = is_teacher(app);

    let last_column = if teacher { "State" } else { "Progress" };
    let header = Row::new([
        Cell::from("Title"),
        Cell::from("Subject"),
        Cell::from("Style"),
        Cell::from("Level"),
        Cell::from(last_column),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = modules
        .iter()
        .enumerate()
        .map(|(i, module)| {
            let style = if i == app.module_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let style_label = module
                .learning_style
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let level = module
                .difficulty_level
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            let last = if teacher {
                if module.is_published {
                    Span::styled("Published", styles::success_style())
                } else {
                    Span::styled("Draft", styles::muted_style())
                }
            } else {
                match app.progress_for(&module.id) {
                    Some(p) => Span::styled(
                        format!("{:>3.0}%", p.progress_percentage),
                        styles::highlight_style(),
                    ),
                    None => Span::styled("  -", styles::muted_style()),
                }
            };
            Row::new(vec![
                Cell::from(module.title.clone()),
                Cell::from(module.subject.clone()),
                Cell::from(Span::styled(style_label, styles::learning_style_style(module.learning_style))),
                Cell::from(level),
                Cell::from(last),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Percentage(36),
        Constraint::Fill(2),
        Constraint::Length(16),
        Constraint::Length(13),
        Constraint::Length(9),
    ];

    let filter = app
        .module_style_filter
        .map(|s| s.to_string())
        .unwrap_or_else(|| "All styles".to_string());
    let title = format!(" Modules ({}) - [v] {} ", modules.len(), filter);

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.module_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_detail(frame: &mut Frame, app: &App, selected: Option<&VarkModule>, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);
    let placeholder = "-";
    let teacher = is_teacher(app);

    let content = match selected {
        Some(module) => {
            let field = |label: &str, value: String| {
                Line::from(vec![
                    Span::styled(format!("{:<11}", label), styles::muted_style()),
                    Span::raw(value),
                ])
            };

            let mut lines = vec![
                Line::from(Span::styled(module.title.clone(), styles::title_style())),
                Line::from(""),
                field("Subject:", module.subject.clone()),
                field("Grade:", format_optional(&module.grade_level, placeholder)),
                Line::from(vec![
                    Span::styled(format!("{:<11}", "Style:"), styles::muted_style()),
                    Span::styled(
                        module
                            .learning_style
                            .map(|s| format!("{} ({})", s, s.code()))
                            .unwrap_or_else(|| placeholder.to_string()),
                        styles::learning_style_style(module.learning_style),
                    ),
                ]),
                field(
                    "Level:",
                    module
                        .difficulty_level
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| placeholder.to_string()),
                ),
                field(
                    "Duration:",
                    module
                        .estimated_duration_minutes
                        .map(|m| format_minutes(m as i64))
                        .unwrap_or_else(|| placeholder.to_string()),
                ),
            ];

            if teacher {
                lines.push(field(
                    "State:",
                    if module.is_published { "Published" } else { "Draft" }.to_string(),
                ));
            } else if let Some(progress) = app.progress_for(&module.id) {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled("My Progress", styles::highlight_style())));
                lines.push(field("Status:", progress.status.to_string()));
                lines.push(field("Complete:", format!("{:.0}%", progress.progress_percentage)));
                lines.push(field("Time:", format_minutes(progress.time_spent_minutes)));
            }

            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Description", styles::highlight_style())));
            lines.push(Line::from(Span::raw(format_optional(
                &module.description,
                "No description",
            ))));
            lines
        }
        None => vec![Line::from(Span::styled(
            if teacher {
                "No modules yet - press [n] to create one"
            } else {
                "No published modules match"
            },
            styles::muted_style(),
        ))],
    };

    let actions = if teacher {
        " Details - [n]ew [e]dit [p]ublish [d]elete "
    } else {
        " Details - [+] record progress "
    };
    let paragraph = Paragraph::new(content)
        .block(
            Block::default()
                .title(actions)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
