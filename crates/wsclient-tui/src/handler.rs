use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use wsclient_core::View;
use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            if app.pending || !app.ready {
                app.tick_animation();
            }
        }
        AppEvent::Session(event) => app.apply(event),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any view
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Nothing is interactive until the first verification answer
    if !app.ready {
        if key.code == KeyCode::Esc {
            app.should_quit = true;
        }
        return;
    }

    match key.code {
        KeyCode::Esc => match app.view {
            View::Chat => app.log_out(),
            View::Home => app.should_quit = true,
        },
        KeyCode::Tab | KeyCode::Down => app.focus_next(),
        KeyCode::BackTab | KeyCode::Up => app.focus_prev(),
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => app.focused_input_mut().backspace(),
        KeyCode::Delete => app.focused_input_mut().delete(),
        KeyCode::Left => app.focused_input_mut().left(),
        KeyCode::Right => app.focused_input_mut().right(),
        KeyCode::Home => app.focused_input_mut().home(),
        KeyCode::End => app.focused_input_mut().end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.focused_input_mut().insert(c)
        }
        _ => {}
    }
}
