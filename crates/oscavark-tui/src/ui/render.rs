use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use oscavark_core::auth::{Role, View};

use crate::app::{App, AppState, LoginFocus};
use crate::forms::FormState;

use super::styles;
use super::tabs::{classes, dashboard, modules, seniors};

const LOGO: [&str; 3] = [
    "╔═╗╔═╗╔═╗╔═╗  ╦  ╦╔═╗╦═╗╦╔═",
    "║ ║╚═╗║  ╠═╣  ╚╗╔╝╠═╣╠╦╝╠╩╗",
    "╚═╝╚═╝╚═╝╩ ╩   ╚╝ ╩ ╩╩╚═╩ ╩",
];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    if app.is_authenticated() {
        render_main_content(frame, app, chunks[2]);
    }
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame, app),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::EditingForm => {
            if let Some(ref form) = app.form {
                render_form_overlay(frame, form);
            }
        }
        AppState::ConfirmingDelete => render_delete_overlay(frame, app),
        AppState::ConfirmingLogout => render_logout_overlay(frame),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::Searching | AppState::Quitting => {}
    }
}

fn logo_lines(indent: usize) -> Vec<Line<'static>> {
    LOGO.iter()
        .map(|row| {
            Line::from(Span::styled(
                format!("{}{}", " ".repeat(indent), row),
                styles::title_style(),
            ))
        })
        .collect()
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  OSCA · VARK";
    let help_hint = "[?] Help";
    let user = match app.auth.as_ref() {
        Some(ctx) => format!("{} ({})  ", ctx.display_name(), ctx.role.display_name()),
        None => String::new(),
    };
    let used = title.chars().count() + user.chars().count() + help_hint.len() + 4;

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat((area.width as usize).saturating_sub(used))),
        Span::styled(user, styles::highlight_style()),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];

    if let Some(role) = app.role() {
        for (i, view) in app.views().iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" | ", styles::muted_style()));
            }
            let label = format!("[{}] {}", i + 1, view.title(role));
            if *view == app.current_view {
                spans.push(Span::styled(label, styles::tab_style(true)));
            } else {
                spans.push(Span::styled(label, styles::muted_style()));
            }
        }

        // Portal name on the right
        let portal = match role {
            Role::Osca | Role::Basca | Role::Senior => "Senior Citizen Affairs",
            Role::Teacher | Role::Student => "VARK Learning",
        };
        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let padding = (area.width as usize).saturating_sub(used + portal.len() + 2);
        spans.push(Span::raw(" ".repeat(padding)));
        spans.push(Span::styled(portal, styles::muted_style()));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_view {
        View::Dashboard => dashboard::render(frame, app, area),
        View::Seniors => seniors::render(frame, app, area),
        View::Modules => modules::render(frame, app, area),
        View::Classes => classes::render(frame, app, area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = if app.is_authenticated() {
        "[u]pdate | [L]ogout | [q]uit"
    } else {
        "[q]uit"
    };
    let right_text = format!(" {} ", shortcuts);

    let left = if matches!(app.state, AppState::Searching) {
        Span::styled(format!(" Search: {}▌ ", app.search_query), styles::search_style())
    } else if let Some(ref msg) = app.status_message {
        Span::styled(format!(" {} ", msg), styles::muted_style())
    } else if app.is_refreshing {
        Span::styled(" Updating... ", styles::muted_style())
    } else if !app.search_query.is_empty() {
        Span::styled(
            format!(" Filter: \"{}\" (Esc clears) ", app.search_query),
            styles::search_style(),
        )
    } else {
        Span::styled(format!(" Updated {} ", app.last_updated), styles::muted_style())
    };

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left.content.chars().count())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        left,
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn help_line(key: &str, desc: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc.to_string(), styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame, app: &App) {
    let version = env!("CARGO_PKG_VERSION");

    let mut help_text = logo_lines(11);
    help_text.push(Line::from(Span::styled(
        format!("                 version {}", version),
        styles::muted_style(),
    )));
    help_text.push(Line::from(""));
    help_text.push(Line::from(Span::styled(" Navigation", styles::highlight_style())));
    help_text.push(help_line("1-4", "Switch tabs"));
    help_text.push(help_line("←/→", "Prev/next tab"));
    help_text.push(help_line("Tab", "Switch focus (list ↔ detail)"));
    help_text.push(help_line("↑/↓ j/k", "Navigate list"));
    help_text.push(help_line("Esc", "Go back / clear search"));
    help_text.push(Line::from(""));
    help_text.push(Line::from(Span::styled(" Actions", styles::highlight_style())));
    help_text.push(help_line("/", "Search"));
    help_text.push(help_line("u", "Update data from the server"));
    help_text.push(help_line("L", "Log out"));
    help_text.push(help_line("q", "Quit"));

    match app.role() {
        Some(Role::Osca) | Some(Role::Basca) => {
            help_text.push(Line::from(""));
            help_text.push(Line::from(Span::styled(" Senior Citizens", styles::highlight_style())));
            help_text.push(help_line("n/e/d", "New / edit / delete record"));
            help_text.push(help_line("s", "Cycle record status"));
            help_text.push(help_line("f", "Filter by status"));
            help_text.push(help_line("b", "Add beneficiary"));
        }
        Some(Role::Teacher) => {
            help_text.push(Line::from(""));
            help_text.push(Line::from(Span::styled(" Modules & Classes", styles::highlight_style())));
            help_text.push(help_line("n/e/d", "New / edit / delete"));
            help_text.push(help_line("p", "Publish or unpublish module"));
            help_text.push(help_line("v", "Filter by learning style"));
            help_text.push(help_line("Enter", "Load class roster"));
        }
        Some(Role::Student) => {
            help_text.push(Line::from(""));
            help_text.push(Line::from(Span::styled(" Modules", styles::highlight_style())));
            help_text.push(help_line("+", "Record progress on module"));
            help_text.push(help_line("v", "Filter by learning style"));
            help_text.push(help_line("J", "Join a class by code"));
        }
        Some(Role::Senior) | None => {}
    }

    help_text.push(Line::from(""));
    help_text.push(Line::from(vec![
        Span::styled("        Press ", styles::muted_style()),
        Span::styled("?", styles::help_key_style()),
        Span::styled(" or ", styles::muted_style()),
        Span::styled("Esc", styles::help_key_style()),
        Span::styled(" to close", styles::muted_style()),
    ]));

    let area = centered_rect_fixed(52, help_text.len() as u16 + 2, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(help_text).block(block);
    frame.render_widget(paragraph, area);
}

fn login_field<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let cursor = if focused { "▌" } else { "" };
    Line::from(vec![
        Span::styled(format!("   {:>10}: [", label), styles::muted_style()),
        Span::styled(format!("{:<22}{}", value, cursor), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 17 } else { 15 };
    let area = centered_rect_fixed(50, height, frame.area());

    frame.render_widget(Clear, area);

    let mut lines = logo_lines(9);
    lines.push(Line::from(""));

    // Show the tail of long emails so the cursor stays visible
    let email: String = {
        let count = app.login_email.chars().count();
        app.login_email.chars().skip(count.saturating_sub(22)).collect()
    };
    lines.push(login_field("Email", email, app.login_focus == LoginFocus::Email));

    let masked = "*".repeat(app.login_password.chars().count().min(22));
    lines.push(login_field("Password", masked, app.login_focus == LoginFocus::Password));

    let role_focused = app.login_focus == LoginFocus::Role;
    lines.push(Line::from(vec![
        Span::styled(format!("   {:>10}: ", "Portal"), styles::muted_style()),
        Span::styled(
            format!("< {} >", app.login_role.display_name()),
            if role_focused {
                styles::selected_style()
            } else {
                styles::highlight_style()
            },
        ),
    ]));

    let remember_focused = app.login_focus == LoginFocus::Remember;
    lines.push(Line::from(vec![
        Span::styled(format!("   {:>10}: ", "Remember"), styles::muted_style()),
        Span::styled(
            if app.login_remember { "[x]" } else { "[ ]" },
            if remember_focused {
                styles::selected_style()
            } else {
                styles::list_item_style()
            },
        ),
    ]));

    // Login button (centered)
    let button_focused = app.login_focus == LoginFocus::Button;
    let button_style = if button_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    lines.push(Line::from(""));
    let label = if button_focused { " ▶ Login ◀ " } else { "   Login   " };
    lines.push(Line::from(vec![
        Span::raw("                 ["),
        Span::styled(label, button_style),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("   ", styles::muted_style()),
        Span::styled("[F2]", styles::help_key_style()),
        Span::styled(" create account  ", styles::muted_style()),
        Span::styled("[Esc]", styles::help_key_style()),
        Span::styled(" quit", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_form_overlay(frame: &mut Frame, form: &FormState) {
    let mut lines = Vec::new();
    let mut focus_line = 0;

    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focus;
        if focused {
            focus_line = lines.len();
        }
        let style = if focused {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        let cursor = if focused && !field.is_choice() { "▌" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!(" {:>24}: ", field.label), styles::muted_style()),
            Span::styled(format!("{}{}", field.display_value(), cursor), style),
        ]));
        if let Some(error) = form.error_for(field.key) {
            lines.push(Line::from(Span::styled(
                format!(" {:>24}  {}", "", error),
                styles::error_style(),
            )));
        }
    }

    if let Some(ref message) = form.message {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", message), styles::error_style())));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(" [Enter]", styles::help_key_style()),
        Span::styled(" save  ", styles::muted_style()),
        Span::styled("[Tab]", styles::help_key_style()),
        Span::styled(" next  ", styles::muted_style()),
        Span::styled("[←/→]", styles::help_key_style()),
        Span::styled(" choose  ", styles::muted_style()),
        Span::styled("[Esc]", styles::help_key_style()),
        Span::styled(" cancel", styles::muted_style()),
    ]));

    let area = centered_rect_fixed(72, lines.len() as u16 + 2, frame.area());
    frame.render_widget(Clear, area);

    // Keep the focused field on screen when the form is taller than the terminal
    let inner_height = area.height.saturating_sub(2) as usize;
    let scroll = focus_line.saturating_sub(inner_height.saturating_sub(3));

    let block = Block::default()
        .title(format!(" {} ", form.kind.title()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((scroll as u16, 0));
    frame.render_widget(paragraph, area);
}

fn confirm_lines(question: String, action: &'static str) -> Vec<Line<'static>> {
    let mut lines = logo_lines(7);
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(format!("   {}", question), styles::highlight_style())));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("   Press ", styles::muted_style()),
        Span::styled("[Y]", styles::help_key_style()),
        Span::styled(format!(" to {}, ", action), styles::muted_style()),
        Span::styled("[N]", styles::help_key_style()),
        Span::styled(" to cancel", styles::muted_style()),
    ]));
    lines
}

fn render_confirm(frame: &mut Frame, lines: Vec<Line<'static>>, width: u16) {
    let area = centered_rect_fixed(width, lines.len() as u16 + 2, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_delete_overlay(frame: &mut Frame, app: &App) {
    let Some(ref pending) = app.pending_delete else {
        return;
    };
    let question = format!("Delete {}?", pending.description());
    let width = (question.chars().count() as u16 + 8).clamp(46, 76);
    render_confirm(frame, confirm_lines(question, "delete"), width);
}

fn render_logout_overlay(frame: &mut Frame) {
    let lines = confirm_lines("Log out and clear saved data?".to_string(), "log out");
    render_confirm(frame, lines, 46);
}

fn render_quit_overlay(frame: &mut Frame) {
    let lines = confirm_lines("Are you sure you want to quit?".to_string(), "quit");
    render_confirm(frame, lines, 46);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fixed_fits_inside() {
        let outer = Rect::new(0, 0, 100, 40);
        let rect = centered_rect_fixed(46, 10, outer);
        assert_eq!(rect, Rect::new(27, 15, 46, 10));

        let small = Rect::new(0, 0, 30, 5);
        let clamped = centered_rect_fixed(46, 10, small);
        assert_eq!(clamped.width, 30);
        assert_eq!(clamped.height, 5);
    }

    #[test]
    fn test_confirm_lines_mention_action() {
        let lines = confirm_lines("Delete class Math 7?".to_string(), "delete");
        let text: String = lines
            .iter()
            .flat_map(|l| l.spans.iter().map(|s| s.content.to_string()))
            .collect();
        assert!(text.contains("Delete class Math 7?"));
        assert!(text.contains("to delete"));
    }
}
