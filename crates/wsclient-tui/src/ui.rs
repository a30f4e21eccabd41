use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use wsclient_core::state::LOGIN_MESSAGE;
use wsclient_core::View;
use crate::app::{App, Field};

const LABEL_WIDTH: u16 = 10;

/// Slice of `value` that fits in `width` columns with the cursor kept visible.
/// Returns the visible text and the cursor column inside it.
fn visible_window(value: &str, cursor: usize, width: usize) -> (String, usize) {
    if width == 0 {
        return (String::new(), 0);
    }
    let offset = cursor.saturating_sub(width - 1);
    let text: String = value.chars().skip(offset).take(width).collect();
    (text, cursor - offset)
}

pub fn render(app: &App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if !app.ready {
        render_checking(app, frame, body_area);
    } else {
        if app.view.shows_auth_forms() {
            render_home_screen(app, frame, body_area);
        }
        if app.view.shows_chat() {
            render_chat_screen(app, frame, body_area);
        }
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let welcome = if app.ready { app.view.welcome() } else { "" };

    let title = Line::from(vec![
        Span::styled(" wsclient ", Style::default().fg(Color::Cyan).bold()),
        Span::raw(" "),
        Span::styled(welcome, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.view {
        View::Home => (" HOME ", Style::default().bg(Color::Blue).fg(Color::White)),
        View::Chat => (" CHAT ", Style::default().bg(Color::Green).fg(Color::Black)),
    };

    let hints = if !app.ready {
        " Esc quit"
    } else if app.view.shows_exit() {
        " Enter send | Esc disconnect | Ctrl+C quit"
    } else {
        " Tab next field | Enter submit form | Esc quit"
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ];
    if app.pending {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        spans.push(Span::styled(
            format!("  Working{}", dots),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_checking(app: &App, frame: &mut Frame, area: Rect) {
    let dots = ".".repeat((app.animation_frame as usize) + 1);
    let [_, middle, _] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);

    let placeholder = Paragraph::new(format!("Checking session{}", dots))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(placeholder, middle);
}

fn render_field(app: &App, frame: &mut Frame, field: Field, area: Rect) {
    let focused = app.focus == field;
    let input = app.input(field);

    let label_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };

    let value_width = area.width.saturating_sub(LABEL_WIDTH) as usize;
    let shown = if field.is_secret() {
        "*".repeat(input.char_count())
    } else {
        input.value().to_string()
    };
    let (text, cursor_x) = visible_window(&shown, input.cursor(), value_width);

    let line = Line::from(vec![
        Span::styled(
            format!("{:<width$}", format!("{}:", field.label()), width = LABEL_WIDTH as usize),
            label_style,
        ),
        Span::raw(text),
    ]);
    frame.render_widget(Paragraph::new(line), area);

    if focused && value_width > 0 {
        frame.set_cursor_position((area.x + LABEL_WIDTH + cursor_x as u16, area.y));
    }
}

fn render_form(app: &App, frame: &mut Frame, title: &str, fields: &[Field], area: Rect) {
    let focused = fields.contains(&app.focus);
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title.to_string());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    for (i, field) in fields.iter().enumerate() {
        let row = inner.y + i as u16;
        if row >= inner.y + inner.height {
            break;
        }
        render_field(app, frame, *field, Rect::new(inner.x, row, inner.width, 1));
    }
}

fn render_notice(app: &App, frame: &mut Frame, error_area: Rect, info_area: Rect) {
    if let Some(ref error) = app.error {
        let error_line = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        frame.render_widget(error_line, error_area);
    }
    if let Some(ref info) = app.info {
        let info_line = Paragraph::new(info.as_str()).style(Style::default().fg(Color::Yellow));
        frame.render_widget(info_line, info_area);
    }
}

fn render_home_screen(app: &App, frame: &mut Frame, area: Rect) {
    let [message_area, login_area, register_area, error_area, info_area, _] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(4),
        Constraint::Length(5),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);

    let login_message = Paragraph::new(LOGIN_MESSAGE).style(Style::default().fg(Color::Gray));
    frame.render_widget(login_message, message_area);

    render_form(
        app,
        frame,
        " Log in ",
        &[Field::LoginUsername, Field::LoginPassword],
        login_area,
    );
    render_form(
        app,
        frame,
        " Register ",
        &[Field::RegisterLogin, Field::RegisterPassword, Field::RegisterEmail],
        register_area,
    );

    render_notice(app, frame, error_area, info_area);
}

fn render_chat_screen(app: &App, frame: &mut Frame, area: Rect) {
    let [messages_area, input_area, notice_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    let messages_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Messages ({}) ", app.messages.len()));

    // Newest at the bottom: only the tail that fits
    let visible = messages_block.inner(messages_area).height as usize;
    let entries = app.messages.entries();
    let start = entries.len().saturating_sub(visible);
    let items: Vec<ListItem> = entries[start..]
        .iter()
        .map(|text| ListItem::new(text.as_str()))
        .collect();

    let list = if items.is_empty() {
        List::new(vec![ListItem::new(Span::styled(
            "No messages yet...",
            Style::default().fg(Color::DarkGray),
        ))])
    } else {
        List::new(items)
    };
    frame.render_widget(list.block(messages_block), messages_area);

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Message ");
    let inner = input_block.inner(input_area);
    frame.render_widget(input_block, input_area);

    let (text, cursor_x) = visible_window(app.message.value(), app.message.cursor(), inner.width as usize);
    frame.render_widget(Paragraph::new(text), inner);
    if inner.width > 0 {
        frame.set_cursor_position((inner.x + cursor_x as u16, inner.y));
    }

    // Errors take the single notice row over info
    if let Some(ref error) = app.error {
        frame.render_widget(
            Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
            notice_area,
        );
    } else if let Some(ref info) = app.info {
        frame.render_widget(
            Paragraph::new(info.as_str()).style(Style::default().fg(Color::Yellow)),
            notice_area,
        );
    }
}
