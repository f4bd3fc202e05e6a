use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, ChatRole, ChatMessage, InputMode, Panel, Screen, SentimentField};

/// Shown in place of an empty conversation.
pub const EMPTY_CONVERSATION: &str =
    "Inicia la conversación con una pregunta sobre economía española.";

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);

    match app.screen {
        Screen::Chat => render_chat_screen(app, frame, body_area),
        Screen::Sentiment => render_sentiment_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.alert.is_some() {
        render_alert(app, frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            " Asistente de Economía Española ",
            Style::default().fg(Color::Cyan).bold(),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Chat => " CHAT ",
        Screen::Sentiment => " SENTIMIENTOS ",
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if app.alert.is_some() {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" cerrar aviso ", label_style),
        ]
    } else {
        match (app.screen, app.input_mode) {
            (Screen::Chat, InputMode::Normal) => vec![
                Span::styled(" i ", key_style),
                Span::styled(" escribir ", label_style),
                Span::styled(" r ", key_style),
                Span::styled(" reiniciar ", label_style),
                Span::styled(" j/k ", key_style),
                Span::styled(" desplazar ", label_style),
                Span::styled(" s ", key_style),
                Span::styled(" sentimientos ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" salir ", label_style),
            ],
            (Screen::Chat, InputMode::Editing) => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" enviar ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" terminar ", label_style),
            ],
            (Screen::Sentiment, InputMode::Normal) => vec![
                Span::styled(" Tab ", key_style),
                Span::styled(" campo ", label_style),
                Span::styled(" i ", key_style),
                Span::styled(" escribir ", label_style),
                Span::styled(" Enter ", key_style),
                Span::styled(" analizar ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" chat ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" salir ", label_style),
            ],
            (Screen::Sentiment, InputMode::Editing) => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" analizar ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" terminar ", label_style),
            ],
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

/// Build the message-list lines for a conversation. One role line, the
/// wrapped content, and a separating blank per message; exactly two visual
/// styles (user / assistant).
pub fn conversation_lines(messages: &[ChatMessage]) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();

    for msg in messages {
        let (label, color) = match msg.role {
            ChatRole::User => ("Tú:", Color::Cyan),
            ChatRole::Assistant => ("Asistente:", Color::Yellow),
        };
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        for line in msg.content.lines() {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::default());
    }

    lines
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    // Store chat pane dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversación ");

    let chat_text = if let Some(error) = &app.history_error {
        // Bootstrap failure replaces the message list, not a transient alert
        Text::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        ))
    } else if app.conversation.is_empty() && !app.send_pending() {
        Text::from(Span::styled(
            EMPTY_CONVERSATION,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines = conversation_lines(app.conversation.messages());

        if app.send_pending() {
            lines.push(Line::from(Span::styled(
                "Asistente:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Escribiendo{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    let editing = app.input_mode == InputMode::Editing;
    render_input(
        frame,
        input_area,
        " Mensaje (i para escribir) ",
        &app.chat_input,
        app.chat_cursor,
        editing,
    );
}

fn render_sentiment_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [text_input_area, text_panel_area, file_input_area, csv_panel_area, _] =
        Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .areas(area);

    let editing = app.input_mode == InputMode::Editing;
    let text_active = app.sentiment_field == SentimentField::Text;

    render_input(
        frame,
        text_input_area,
        " Texto a analizar ",
        &app.text_input,
        app.text_cursor,
        editing && text_active,
    );
    render_panel(
        app,
        frame,
        text_panel_area,
        " Resultado ",
        &app.text_panel,
        "Analizando",
        text_active,
    );

    render_input(
        frame,
        file_input_area,
        " Archivo CSV (ruta) ",
        &app.file_input,
        app.file_cursor,
        editing && !text_active,
    );
    render_panel(
        app,
        frame,
        csv_panel_area,
        " Análisis por lotes ",
        &app.csv_panel,
        "Procesando CSV",
        !text_active,
    );
}

fn render_panel(
    app: &App,
    frame: &mut Frame,
    area: Rect,
    title: &str,
    panel: &Panel,
    working_label: &str,
    active: bool,
) {
    let border_color = if active { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title.to_string());

    let text = match panel {
        Panel::Empty => Text::default(),
        Panel::Working => {
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            Text::from(Span::styled(
                format!("{}{}", working_label, dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ))
        }
        Panel::Notice(message) => Text::from(message.clone()),
        Panel::Result(result) => Text::from(vec![
            Line::from(vec![
                Span::styled("Sentimiento: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(result.sentimiento.clone()),
            ]),
            Line::from(vec![
                Span::styled("Confianza: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!("{}%", result.confianza)),
            ]),
            Line::from(vec![
                Span::styled("Explicación: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(result.explicacion.clone()),
            ]),
        ]),
    };

    let panel = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(panel, area);
}

fn render_input(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    value: &str,
    cursor: usize,
    editing: bool,
) {
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title.to_string());

    // Horizontal scroll keeps the cursor inside the inner width
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || cursor < inner_width {
        0
    } else {
        cursor - inner_width + 1
    };

    let visible_text: String = value.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_alert(app: &App, frame: &mut Frame, area: Rect) {
    let message = app.alert.as_deref().unwrap_or_default();

    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 7.min(area.height.saturating_sub(2));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Error ");

    let body = Text::from(vec![
        Line::from(message.to_string()),
        Line::default(),
        Line::from(Span::styled(
            "Enter para cerrar",
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    let popup = Paragraph::new(body).block(block).wrap(Wrap { trim: true });
    frame.render_widget(popup, popup_area);
}
