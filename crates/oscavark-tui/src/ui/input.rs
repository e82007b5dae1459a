//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use oscavark_core::auth::{Role, View};

use crate::app::{
    can_add_email_char, can_add_password_char, App, AppState, Focus, LoginFocus,
    PAGE_SCROLL_SIZE,
};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::LoggingIn => return handle_login_input(app, key).await,
        AppState::EditingForm => {
            handle_form_input(app, key).await;
            return Ok(false);
        }
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ConfirmingDelete => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.confirm_delete().await;
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.pending_delete = None;
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ConfirmingLogout => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.logout().await;
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::Searching => return handle_search_input(app, key).await,
        AppState::Quitting => return Ok(true),
        AppState::Normal => {}
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
        }
        KeyCode::Char(c @ '1'..='4') => {
            if let Some(number) = c.to_digit(10) {
                app.select_view(number as usize);
            }
        }
        KeyCode::Left => app.prev_view(),
        KeyCode::Right => app.next_view(),
        KeyCode::Char('u') => {
            app.status_message = None;
            app.refresh_all_background();
        }
        KeyCode::Char('L') => {
            app.state = AppState::ConfirmingLogout;
        }
        KeyCode::Char('/') => {
            app.state = AppState::Searching;
            app.search_query.clear();
        }
        KeyCode::Tab => {
            // Toggle focus between list and detail panels
            app.focus = match app.focus {
                Focus::List => Focus::Detail,
                Focus::Detail => Focus::List,
            };
            if app.focus == Focus::Detail {
                match app.current_view {
                    View::Seniors => app.fetch_beneficiaries(),
                    View::Classes => app.fetch_class_students(),
                    _ => {}
                }
            }
        }
        KeyCode::Esc => {
            app.search_query.clear();
            app.status_message = None;
            app.focus = Focus::List;
        }
        _ => match app.current_view {
            View::Dashboard => handle_dashboard_input(app, key).await,
            View::Seniors => handle_seniors_input(app, key).await,
            View::Modules => handle_modules_input(app, key).await,
            View::Classes => handle_classes_input(app, key).await,
        },
    }

    Ok(false)
}

async fn handle_search_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Normal;
            app.search_query.clear();
        }
        KeyCode::Enter => {
            app.state = AppState::Normal;
            // Keep search query active
        }
        KeyCode::Backspace => {
            app.search_query.pop();
        }
        KeyCode::Char(c) => {
            app.search_query.push(c);
            // Reset selection when search changes
            app.senior_selection = 0;
            app.module_selection = 0;
        }
        _ => {}
    }
    Ok(false)
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    let register_key = key.code == KeyCode::F(2)
        || (key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL));
    if register_key {
        app.start_register();
        return Ok(false);
    }

    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = app.login_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = app.login_focus.prev();
        }
        KeyCode::Left if app.login_focus == LoginFocus::Role => {
            app.login_role = app.login_role.prev();
        }
        KeyCode::Right if app.login_focus == LoginFocus::Role => {
            app.login_role = app.login_role.next();
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Button => {
                // On failure login_error is set and the overlay stays up
                let _ = app.attempt_login().await;
                if app.state == AppState::Normal {
                    app.refresh_all_background();
                }
            }
            LoginFocus::Remember => {
                app.login_remember = !app.login_remember;
            }
            _ => {
                app.login_focus = app.login_focus.next();
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Role | LoginFocus::Remember | LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login_email.len(), c) {
                    app.login_email.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.len(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Role => {
                if c == ' ' {
                    app.login_role = app.login_role.next();
                }
            }
            LoginFocus::Remember => {
                if c == ' ' {
                    app.login_remember = !app.login_remember;
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

async fn handle_form_input(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.cancel_form();
        return;
    }
    if key.code == KeyCode::Enter {
        app.submit_form().await;
        return;
    }

    let Some(form) = app.form.as_mut() else {
        app.state = AppState::Normal;
        return;
    };
    match key.code {
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.prev_field(),
        KeyCode::Left => form.cycle_choice(false),
        KeyCode::Right => form.cycle_choice(true),
        KeyCode::Backspace => form.pop_char(),
        KeyCode::Char(c) => form.push_char(c),
        _ => {}
    }
}

/// Move a list selection for a navigation key. Returns `None` when the key
/// is not a navigation key.
fn navigate(selection: usize, len: usize, code: KeyCode) -> Option<usize> {
    let max_index = len.saturating_sub(1);
    let next = match code {
        KeyCode::Char('j') | KeyCode::Down => (selection + 1).min(max_index),
        KeyCode::Char('k') | KeyCode::Up => selection.saturating_sub(1),
        KeyCode::Home => 0,
        KeyCode::End => max_index,
        KeyCode::PageDown => (selection + PAGE_SCROLL_SIZE).min(max_index),
        KeyCode::PageUp => selection.saturating_sub(PAGE_SCROLL_SIZE),
        _ => return None,
    };
    Some(next)
}

fn is_senior_affairs_officer(app: &App) -> bool {
    matches!(app.role(), Some(Role::Osca) | Some(Role::Basca))
}

async fn handle_dashboard_input(app: &mut App, key: KeyEvent) {
    if app.role() == Some(Role::Student) && key.code == KeyCode::Char('J') {
        app.open_join_class();
    }
}

async fn handle_seniors_input(app: &mut App, key: KeyEvent) {
    if !is_senior_affairs_officer(app) {
        return;
    }

    match app.focus {
        Focus::List => {
            let len = app.filtered_seniors().len();
            if let Some(next) = navigate(app.senior_selection, len, key.code) {
                if next != app.senior_selection {
                    app.senior_selection = next;
                    app.beneficiaries.clear();
                    app.beneficiary_selection = 0;
                }
                return;
            }
            match key.code {
                KeyCode::Enter => {
                    app.focus = Focus::Detail;
                    app.fetch_beneficiaries();
                }
                KeyCode::Char('n') => app.open_new_senior(),
                KeyCode::Char('e') => app.open_edit_senior(),
                KeyCode::Char('s') => app.cycle_selected_status().await,
                KeyCode::Char('f') => app.cycle_status_filter(),
                KeyCode::Char('b') => app.open_new_beneficiary(),
                KeyCode::Char('d') => app.request_delete(),
                _ => {}
            }
        }
        Focus::Detail => {
            let len = app.beneficiaries.len();
            if let Some(next) = navigate(app.beneficiary_selection, len, key.code) {
                app.beneficiary_selection = next;
                return;
            }
            match key.code {
                KeyCode::Char('e') | KeyCode::Enter => app.open_edit_beneficiary(),
                KeyCode::Char('b') | KeyCode::Char('n') => app.open_new_beneficiary(),
                KeyCode::Char('d') => app.request_delete(),
                _ => {}
            }
        }
    }
}

async fn handle_modules_input(app: &mut App, key: KeyEvent) {
    let len = app.visible_modules().len();
    if let Some(next) = navigate(app.module_selection, len, key.code) {
        app.module_selection = next;
        return;
    }

    match (app.role(), key.code) {
        (_, KeyCode::Char('v')) => app.cycle_style_filter(),
        (_, KeyCode::Enter) => {
            app.focus = match app.focus {
                Focus::List => Focus::Detail,
                Focus::Detail => Focus::List,
            };
        }
        (Some(Role::Teacher), KeyCode::Char('n')) => app.open_new_module(),
        (Some(Role::Teacher), KeyCode::Char('e')) => app.open_edit_module(),
        (Some(Role::Teacher), KeyCode::Char('p')) => app.toggle_selected_published().await,
        (Some(Role::Teacher), KeyCode::Char('d')) => app.request_delete(),
        (Some(Role::Student), KeyCode::Char('+')) => app.advance_selected_progress().await,
        (Some(Role::Student), KeyCode::Char('J')) => app.open_join_class(),
        _ => {}
    }
}

async fn handle_classes_input(app: &mut App, key: KeyEvent) {
    match app.focus {
        Focus::List => {
            if let Some(next) = navigate(app.class_selection, app.classes.len(), key.code) {
                if next != app.class_selection {
                    app.class_selection = next;
                    app.class_students.clear();
                    app.student_selection = 0;
                }
                return;
            }
            match key.code {
                KeyCode::Enter => {
                    app.focus = Focus::Detail;
                    app.fetch_class_students();
                }
                KeyCode::Char('n') if app.role() == Some(Role::Teacher) => app.open_new_class(),
                KeyCode::Char('d') if app.role() == Some(Role::Teacher) => app.request_delete(),
                KeyCode::Char('J') if app.role() == Some(Role::Student) => app.open_join_class(),
                _ => {}
            }
        }
        Focus::Detail => {
            if let Some(next) = navigate(app.student_selection, app.class_students.len(), key.code) {
                app.student_selection = next;
                return;
            }
            if key.code == KeyCode::Enter {
                app.fetch_class_students();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_moves_and_clamps() {
        assert_eq!(navigate(0, 5, KeyCode::Down), Some(1));
        assert_eq!(navigate(4, 5, KeyCode::Char('j')), Some(4));
        assert_eq!(navigate(0, 5, KeyCode::Up), Some(0));
        assert_eq!(navigate(3, 5, KeyCode::Home), Some(0));
        assert_eq!(navigate(1, 5, KeyCode::End), Some(4));
        assert_eq!(navigate(2, 30, KeyCode::PageDown), Some(12));
        assert_eq!(navigate(12, 30, KeyCode::PageUp), Some(2));
    }

    #[test]
    fn test_navigate_empty_list_stays_at_zero() {
        assert_eq!(navigate(0, 0, KeyCode::Down), Some(0));
        assert_eq!(navigate(0, 0, KeyCode::End), Some(0));
    }

    #[test]
    fn test_navigate_ignores_other_keys() {
        assert_eq!(navigate(1, 5, KeyCode::Char('n')), None);
        assert_eq!(navigate(1, 5, KeyCode::Enter), None);
    }
}
