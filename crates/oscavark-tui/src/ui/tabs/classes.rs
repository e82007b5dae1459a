use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Row, Table, TableState},
    Frame,
};

use oscavark_core::utils::format::format_optional;

use crate::app::{App, Focus};
use crate::ui::styles;

/// Render the classes tab: the teacher's classes with join codes, and the
/// roster of the selected class.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_table(frame, app, chunks[0]);
    render_roster(frame, app, chunks[1]);
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::List);

    let header = Row::new([
        Cell::from("Class"),
        Cell::from("Subject"),
        Cell::from("Grade"),
        Cell::from("Code"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = app
        .classes
        .iter()
        .enumerate()
        .map(|(i, class)| {
            let style = if i == app.class_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            Row::new(vec![
                Cell::from(class.name.clone()),
                Cell::from(class.subject.clone()),
                Cell::from(format_optional(&class.grade_level, "-")),
                Cell::from(Span::styled(
                    class.class_code.clone().unwrap_or_else(|| "-".to_string()),
                    styles::highlight_style(),
                )),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Percentage(40),
        Constraint::Fill(2),
        Constraint::Length(8),
        Constraint::Length(8),
    ];

    let title = format!(" Classes ({}) - [n]ew [d]elete ", app.classes.len());
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
    state.select(Some(app.class_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_roster(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);

    let items: Vec<ListItem> = if app.selected_class().is_none() {
        vec![ListItem::new(Line::from(Span::styled(
            "No class selected",
            styles::muted_style(),
        )))]
    } else if app.class_students.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No students yet - share the class code",
            styles::muted_style(),
        )))]
    } else {
        app.class_students
            .iter()
            .map(|student| {
                let style = student
                    .learning_style
                    .map(|s| s.code().to_string())
                    .unwrap_or_else(|| "-".to_string());
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<28}", student.full_name()), styles::list_item_style()),
                    Span::styled(style, styles::learning_style_style(student.learning_style)),
                ]))
            })
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .title(format!(" Students ({}) - [Enter] load ", app.class_students.len()))
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        )
        .highlight_style(styles::selected_style());

    let mut state = ListState::default();
    if focused && !app.class_students.is_empty() {
        state.select(Some(app.student_selection));
    }
    frame.render_stateful_widget(list, area, &mut state);
}
