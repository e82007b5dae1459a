use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState},
    Frame,
};

use oscavark_core::models::SeniorCitizen;
use oscavark_core::utils::format::format_optional;
use oscavark_core::utils::{format_date, format_phone};

use crate::app::{App, Focus};
use crate::ui::styles;

/// Render the senior citizens tab: registry table, record detail and
/// beneficiaries.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_table(frame, app, chunks[0]);

    let detail = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(12), Constraint::Length(10)])
        .split(chunks[1]);

    render_detail(frame, app.selected_senior(), detail[0]);
    render_beneficiaries(frame, app, detail[1]);
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let seniors = app.filtered_seniors();
    let focused = matches!(app.focus, Focus::List);

    let header = Row::new([
        Cell::from("Name"),
        Cell::from("OSCA ID"),
        Cell::from("Barangay"),
        Cell::from("Age"),
        Cell::from("Status"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = seniors
        .iter()
        .enumerate()
        .map(|(i, senior)| {
            let style = if i == app.senior_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let age = senior.age().map(|a| a.to_string()).unwrap_or_default();
            Row::new(vec![
                Cell::from(senior.display_name()),
                Cell::from(format_optional(&senior.osca_id, "-")),
                Cell::from(senior.barangay.clone()),
                Cell::from(format!("{:>3}", age)),
                Cell::from(Span::styled(
                    senior.status.to_string(),
                    styles::senior_status_style(senior.status),
                )),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Percentage(34),
        Constraint::Fill(2),
        Constraint::Fill(2),
        Constraint::Length(4),
        Constraint::Length(9),
    ];

    let filter = app
        .senior_status_filter
        .map(|s| s.to_string())
        .unwrap_or_else(|| "All".to_string());
    let title = format!(
        " Senior Citizens ({}) - [f]ilter: {} ",
        seniors.len(),
        filter
    );

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
    state.select(Some(app.senior_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_detail(frame: &mut Frame, selected: Option<&SeniorCitizen>, area: Rect) {
    let placeholder = "-";

    let content = match selected {
        Some(senior) => {
            let field = |label: &str, value: String| {
                Line::from(vec![
                    Span::styled(format!("{:<13}", label), styles::muted_style()),
                    Span::raw(value),
                ])
            };
            let phone = |value: &Option<String>| {
                value
                    .as_deref()
                    .map(format_phone)
                    .unwrap_or_else(|| placeholder.to_string())
            };

            vec![
                Line::from(Span::styled(senior.display_name(), styles::title_style())),
                Line::from(""),
                Line::from(Span::styled("Registration", styles::highlight_style())),
                field("OSCA ID:", format_optional(&senior.osca_id, placeholder)),
                Line::from(vec![
                    Span::styled(format!("{:<13}", "Status:"), styles::muted_style()),
                    Span::styled(senior.status.to_string(), styles::senior_status_style(senior.status)),
                ]),
                field(
                    "Registered:",
                    senior
                        .registration_date
                        .map(format_date)
                        .unwrap_or_else(|| placeholder.to_string()),
                ),
                Line::from(""),
                Line::from(Span::styled("Personal", styles::highlight_style())),
                field(
                    "Born:",
                    match (senior.birth_date, senior.age()) {
                        (Some(date), Some(age)) => format!("{} ({})", format_date(date), age),
                        _ => placeholder.to_string(),
                    },
                ),
                field("Gender:", senior.gender.to_string()),
                field("Civil status:", format_optional(&senior.civil_status, placeholder)),
                Line::from(""),
                Line::from(Span::styled("Contact", styles::highlight_style())),
                field("Barangay:", senior.barangay.clone()),
                field("Address:", format_optional(&senior.address, placeholder)),
                field("Phone:", phone(&senior.contact_number)),
                field(
                    "Emergency:",
                    format!(
                        "{} {}",
                        format_optional(&senior.emergency_contact_name, placeholder),
                        senior
                            .emergency_contact_number
                            .as_deref()
                            .map(format_phone)
                            .unwrap_or_default()
                    ),
                ),
            ]
        }
        None => vec![Line::from(Span::styled(
            "No senior citizen selected",
            styles::muted_style(),
        ))],
    };

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .title(" Record - [e]dit [s]tatus [d]elete ")
            .title_style(styles::muted_style())
            .borders(Borders::ALL)
            .border_style(styles::border_style(false)),
    );
    frame.render_widget(paragraph, area);
}

fn render_beneficiaries(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);

    let items: Vec<ListItem> = if app.beneficiaries.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No beneficiaries - [b] to add",
            styles::muted_style(),
        )))]
    } else {
        app.beneficiaries
            .iter()
            .map(|b| {
                let mut spans = vec![
                    Span::styled(format!("{:<24}", b.full_name()), styles::list_item_style()),
                    Span::styled(b.relationship.clone(), styles::muted_style()),
                ];
                if b.is_primary {
                    spans.push(Span::styled("  primary", styles::success_style()));
                }
                ListItem::new(Line::from(spans))
            })
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .title(format!(" Beneficiaries ({}) - [b] add ", app.beneficiaries.len()))
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        )
        .highlight_style(styles::selected_style());

    let mut state = ListState::default();
    if focused && !app.beneficiaries.is_empty() {
        state.select(Some(app.beneficiary_selection));
    }
    frame.render_stateful_widget(list, area, &mut state);
}
