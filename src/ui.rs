use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use tui_dispatch::{EventKind, EventOutcome, RenderContext};
use tui_dispatch_components::centered_rect;

use crate::action::Action;
use crate::battle::{BattlePhase, HealthBar};
use crate::state::AppState;
use crate::view::{project, BattleView, CardStatus, CardView, DexTile};

const BG_BASE: Color = Color::Rgb(24, 36, 26);
const BG_PANEL: Color = Color::Rgb(34, 58, 38);
const BG_PANEL_ALT: Color = Color::Rgb(28, 48, 32);
const TEXT_MAIN: Color = Color::Rgb(228, 236, 214);
const TEXT_DIM: Color = Color::Rgb(172, 186, 160);
const ACCENT_GREEN: Color = Color::Rgb(104, 204, 120);
const ACCENT_GOLD: Color = Color::Rgb(222, 196, 120);
const ACCENT_RED: Color = Color::Rgb(220, 96, 96);
const HIGHLIGHT_BG: Color = ACCENT_GREEN;
const HIGHLIGHT_TEXT: Color = Color::Rgb(16, 26, 18);
const BORDER_ACCENT: Color = Color::Rgb(74, 98, 82);
const BAR_WIDTH: usize = 20;
const PAGE_STEP: i32 = 10;

pub fn render(frame: &mut Frame, area: Rect, state: &AppState, _ctx: RenderContext) {
    draw(frame, area, &project(state));
}

/// Draw a projected view. Rendering reads nothing but the view.
pub fn draw(frame: &mut Frame, area: Rect, view: &BattleView) {
    frame.render_widget(Block::default().style(Style::default().bg(BG_BASE)), area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // banner
            Constraint::Min(8),    // dex or combatants
            Constraint::Length(7), // turn log + commands
        ])
        .split(area);

    render_banner(frame, layout[0], view);
    match view.phase {
        BattlePhase::Browsing | BattlePhase::CardSelected => render_dex(frame, layout[1], view),
        BattlePhase::Battling | BattlePhase::Resolved => render_arena(frame, layout[1], view),
    }
    render_command_box(frame, layout[2], view);
    if view.show_back {
        render_result_popup(frame, area, view);
    }
}

fn render_result_popup(frame: &mut Frame, area: Rect, view: &BattleView) {
    let popup = centered_rect(40, 7, area);
    frame.render_widget(Clear, popup);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            view.banner,
            Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "b / Enter  back to Pokedex",
            Style::default().fg(TEXT_DIM),
        )),
    ];
    let paragraph = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .block(panel_block(" RESULT ", BG_PANEL_ALT));
    frame.render_widget(paragraph, popup);
}

fn render_banner(frame: &mut Frame, area: Rect, view: &BattleView) {
    let mut spans = vec![Span::styled(
        view.banner,
        Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
    )];
    if view.awaiting || view.dex_loading {
        spans.push(Span::styled("  waiting for server...", Style::default().fg(TEXT_DIM)));
    }
    let paragraph = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(panel_block("", BG_PANEL_ALT));
    frame.render_widget(paragraph, area);
}

fn render_dex(frame: &mut Frame, area: Rect, view: &BattleView) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(20)])
        .split(area);

    render_tiles(frame, layout[0], &view.tiles);

    let block = panel_block(" CARD ", BG_PANEL);
    match (&view.card_status, view.player.as_ref()) {
        (CardStatus::Ready, Some(card)) => render_card(frame, layout[1], block, card),
        (CardStatus::Loading, _) => render_hint(frame, layout[1], block, "Loading card..."),
        (CardStatus::Failed(error), _) => {
            render_hint(frame, layout[1], block, &format!("Card failed: {error}"))
        }
        _ => render_hint(frame, layout[1], block, "Pick a creature with Enter"),
    }
}

fn render_tiles(frame: &mut Frame, area: Rect, tiles: &[DexTile]) {
    let block = panel_block(" POKEDEX ", BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let visible = inner.height as usize;
    let cursor = tiles.iter().position(|tile| tile.cursor).unwrap_or(0);
    let start = cursor.saturating_sub(visible.saturating_sub(1));
    let lines: Vec<Line> = tiles
        .iter()
        .skip(start)
        .take(visible)
        .map(tile_line)
        .collect();
    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

fn tile_line(tile: &DexTile) -> Line<'static> {
    let marker = if tile.selected { "● " } else { "  " };
    let (label, mut style) = if tile.unlocked {
        (tile.id.clone(), Style::default().fg(TEXT_MAIN))
    } else {
        (format!("{} (locked)", tile.id), Style::default().fg(TEXT_DIM))
    };
    if tile.cursor {
        style = style
            .bg(HIGHLIGHT_BG)
            .fg(HIGHLIGHT_TEXT)
            .add_modifier(Modifier::BOLD);
    }
    Line::from(vec![Span::raw(marker), Span::styled(label, style)])
}

fn render_arena(frame: &mut Frame, area: Rect, view: &BattleView) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    if let Some(player) = view.player.as_ref() {
        render_card(frame, layout[0], panel_block(" YOU ", BG_PANEL), player);
    }
    if let Some(opponent) = view.opponent.as_ref() {
        render_card(frame, layout[1], panel_block(" OPPONENT ", BG_PANEL_ALT), opponent);
    }
}

fn render_card(frame: &mut Frame, area: Rect, block: Block<'_>, card: &CardView) {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            card.name.to_ascii_uppercase(),
            Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}", card.hp_text), Style::default().fg(TEXT_DIM)),
    ])];
    if let Some(health) = card.health {
        lines.push(health_line(health));
    }
    let kinds: Vec<String> = [
        card.type_label.as_ref().map(|label| format!("type {label}")),
        card.weakness_label.as_ref().map(|label| format!("weak to {label}")),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !kinds.is_empty() {
        lines.push(Line::from(Span::styled(
            kinds.join(" · "),
            Style::default().fg(TEXT_DIM),
        )));
    }
    if !card.buffs.is_empty() || !card.debuffs.is_empty() {
        lines.push(badge_line(&card.buffs, &card.debuffs));
    }
    if !card.description.is_empty() {
        lines.push(Line::from(Span::styled(
            card.description.clone(),
            Style::default().fg(TEXT_DIM).add_modifier(Modifier::ITALIC),
        )));
    }
    lines.push(Line::from(""));
    for (index, button) in card.moves.iter().enumerate() {
        let style = if button.enabled {
            Style::default().fg(TEXT_MAIN)
        } else {
            Style::default().fg(TEXT_DIM)
        };
        let key = if button.enabled {
            format!("[{}] ", index + 1)
        } else {
            "    ".to_string()
        };
        lines.push(Line::from(vec![
            Span::styled(key, Style::default().fg(ACCENT_GOLD)),
            Span::styled(button.label.clone(), style),
            Span::styled(
                format!("  {} {}", button.dp_text, button.kind),
                Style::default().fg(TEXT_DIM),
            ),
        ]));
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn health_line(bar: HealthBar) -> Line<'static> {
    let filled = ((bar.percent / 100.0 * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
    let color = if bar.critical {
        ACCENT_RED
    } else if bar.percent > 50.0 {
        ACCENT_GREEN
    } else {
        ACCENT_GOLD
    };
    Line::from(vec![
        Span::raw("HP "),
        Span::styled(
            "█".repeat(filled),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "░".repeat(BAR_WIDTH - filled),
            Style::default().fg(TEXT_DIM),
        ),
        Span::raw(format!(" {:.0}%", bar.percent)),
    ])
}

fn badge_line(buffs: &[String], debuffs: &[String]) -> Line<'static> {
    let mut spans = Vec::new();
    for buff in buffs {
        spans.push(Span::styled(
            format!("▲{buff} "),
            Style::default().fg(ACCENT_GREEN),
        ));
    }
    for debuff in debuffs {
        spans.push(Span::styled(format!("▼{debuff} "), Style::default().fg(ACCENT_RED)));
    }
    Line::from(spans)
}

fn render_hint(frame: &mut Frame, area: Rect, block: Block<'_>, text: &str) {
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(TEXT_DIM))
        .alignment(Alignment::Center)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_command_box(frame: &mut Frame, area: Rect, view: &BattleView) {
    let mut lines: Vec<Line> = view
        .turn_lines
        .iter()
        .map(|line| Line::from(Span::styled(line.clone(), Style::default().fg(TEXT_MAIN))))
        .collect();

    if let Some(error) = view.error.as_ref() {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(ACCENT_RED),
        )));
    }
    if let Some(notice) = view.notice.as_ref() {
        lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(ACCENT_GOLD),
        )));
    }

    let mut hints = Vec::new();
    match view.phase {
        BattlePhase::Browsing | BattlePhase::CardSelected => {
            hints.push("↑/↓ browse");
            hints.push("Enter pick");
            if view.show_start {
                hints.push("s start battle");
            }
            hints.push("r reload");
        }
        BattlePhase::Battling => {
            hints.push("1-4 move");
            if view.show_flee {
                hints.push("f flee");
            }
        }
        BattlePhase::Resolved => {
            if view.show_back {
                hints.push("b back to Pokedex");
            }
        }
    }
    hints.push("q quit");
    lines.push(Line::from(Span::styled(
        hints.join("  "),
        Style::default().fg(TEXT_DIM),
    )));

    let paragraph = Paragraph::new(Text::from(lines))
        .block(panel_block(" BATTLE LOG ", BG_PANEL_ALT))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn panel_block<'a>(title: &'a str, bg: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .style(Style::default().bg(bg).fg(TEXT_MAIN))
        .border_style(Style::default().fg(BORDER_ACCENT))
}

pub fn handle_event(event: &EventKind, state: &AppState) -> EventOutcome<Action> {
    match event {
        EventKind::Resize(_, _) => EventOutcome::ignored().with_render(),
        EventKind::Key(key) => handle_key(*key, state),
        _ => EventOutcome::ignored(),
    }
}

fn handle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
        return EventOutcome::action(Action::Quit);
    }
    match state.battle.phase {
        BattlePhase::Browsing | BattlePhase::CardSelected => handle_dex_key(key),
        BattlePhase::Battling => handle_battle_key(key, state),
        BattlePhase::Resolved => handle_resolved_key(key),
    }
}

fn handle_dex_key(key: KeyEvent) -> EventOutcome<Action> {
    let action = match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Action::DexCursorMove(-1)),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::DexCursorMove(1)),
        KeyCode::PageUp => Some(Action::DexCursorMove(-PAGE_STEP)),
        KeyCode::PageDown => Some(Action::DexCursorMove(PAGE_STEP)),
        KeyCode::Enter => Some(Action::DexConfirm),
        KeyCode::Char('s') => Some(Action::BattleStart),
        KeyCode::Char('r') => Some(Action::DexFetch),
        _ => None,
    };
    EventOutcome::from(action)
}

fn handle_battle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    match key.code {
        KeyCode::Char(digit @ '1'..='4') => {
            let index = digit as usize - '1' as usize;
            let name = state
                .session
                .current()
                .and_then(|session| session.player.moves.get(index))
                .map(|slot| slot.name.clone());
            EventOutcome::from(name.map(Action::MoveSubmit))
        }
        KeyCode::Char('f') => EventOutcome::action(Action::FleeSubmit),
        _ => EventOutcome::ignored(),
    }
}

fn handle_resolved_key(key: KeyEvent) -> EventOutcome<Action> {
    match key.code {
        KeyCode::Enter | KeyCode::Char('b') => EventOutcome::action(Action::BattleAcknowledge),
        _ => EventOutcome::ignored(),
    }
}
