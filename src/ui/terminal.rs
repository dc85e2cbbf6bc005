//! 터미널 UI 브리지 (crossterm + ratatui)
//!
//! 작업 엔진이 요구하는 최소한의 화면: 진행 창, 확인 창, 입력 창, 에러 창.

use crate::models::operation::ProgressSnapshot;
use crate::ui::{ConfirmAllAnswer, ConfirmAllNoneAnswer, ConfirmAnswer, UiBridge};
use crate::utils::error::Result;
use crate::utils::formatter::truncate_to_width;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::time::Duration;
use tracing::warn;

/// 다이얼로그 내부 좌우 패딩
const DIALOG_H_PADDING: u16 = 2;
const DIALOG_WIDTH: u16 = 60;

const BG: Color = Color::Rgb(45, 45, 48);
const FG: Color = Color::Rgb(212, 212, 212);
const BORDER: Color = Color::Rgb(0, 120, 212);
const BUTTON_BG: Color = Color::Rgb(60, 60, 60);
const PROGRESS_FILLED: Color = Color::Rgb(0, 120, 212);
const ERROR: Color = Color::Rgb(244, 71, 71);
const MUTED: Color = Color::Rgb(128, 128, 128);

pub struct TerminalUi {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    progress: Option<ProgressSnapshot>,
    busy: char,
    restored: bool,
}

impl TerminalUi {
    /// raw 모드 + 대체 화면 진입
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self {
            terminal,
            progress: None,
            busy: ' ',
            restored: false,
        })
    }

    /// 터미널 복구
    pub fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    fn draw_with<F>(&mut self, overlay: F)
    where
        F: FnOnce(&mut Frame, Rect),
    {
        let progress = self.progress.clone();
        let busy = self.busy;
        let result = self.terminal.draw(|f| {
            let area = f.area();
            if let Some(progress) = &progress {
                render_progress(f, area, progress, busy);
            }
            overlay(f, area);
        });
        if let Err(e) = result {
            warn!("terminal draw failed: {}", e);
        }
    }

    fn redraw(&mut self) {
        self.draw_with(|_, _| {});
    }

    /// 버튼 선택 창. 선택된 버튼 인덱스, Esc면 `cancel_index`
    fn choose(
        &mut self,
        title: &str,
        question: &str,
        buttons: &[&str],
        default_index: usize,
        cancel_index: usize,
    ) -> usize {
        let mut selected = default_index.min(buttons.len().saturating_sub(1));
        loop {
            self.draw_with(|f, area| render_choice(f, area, title, question, buttons, selected));
            let Some(key) = read_key() else {
                return cancel_index;
            };
            match key.code {
                KeyCode::Left | KeyCode::BackTab => {
                    selected = (selected + buttons.len() - 1) % buttons.len();
                }
                KeyCode::Right | KeyCode::Tab => selected = (selected + 1) % buttons.len(),
                KeyCode::Enter => return selected,
                KeyCode::Esc => return cancel_index,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return cancel_index
                }
                KeyCode::Char(c) => {
                    let hotkey = c.to_ascii_lowercase();
                    if let Some(idx) = buttons.iter().position(|b| {
                        b.chars().next().map(|f| f.to_ascii_lowercase()) == Some(hotkey)
                    }) {
                        return idx;
                    }
                }
                _ => {}
            }
        }
    }
}

impl Drop for TerminalUi {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// 키 입력 하나 대기 (Press 이벤트만)
fn read_key() -> Option<KeyEvent> {
    loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => return Some(key),
            Ok(_) => continue,
            Err(e) => {
                warn!("failed to read terminal event: {}", e);
                return None;
            }
        }
    }
}

fn dialog_area(area: Rect, height: u16) -> Rect {
    let width = DIALOG_WIDTH.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn dialog_block(title: &str, border: Color) -> Block<'static> {
    Block::default()
        .title(format!(" {} ", title))
        .title_style(Style::default().fg(border).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(BG).fg(FG))
}

fn inner_width(area: Rect) -> usize {
    area.width.saturating_sub(DIALOG_H_PADDING * 2 + 2) as usize
}

fn render_progress(f: &mut Frame, area: Rect, progress: &ProgressSnapshot, busy: char) {
    let height = if progress.percent_size.is_some() { 8 } else { 6 };
    let rect = dialog_area(area, height);
    f.render_widget(Clear, rect);
    f.render_widget(dialog_block(&progress.title, BORDER), rect);

    let x = rect.x + 1 + DIALOG_H_PADDING;
    let width = rect.width.saturating_sub(2 + DIALOG_H_PADDING * 2);
    let label = truncate_to_width(&progress.label, inner_width(rect).saturating_sub(2));
    f.render_widget(
        Paragraph::new(format!("{} {}", busy, label)),
        Rect::new(x, rect.y + 1, width, 1),
    );

    let gauge = |percent: u8| {
        Gauge::default()
            .gauge_style(Style::default().fg(PROGRESS_FILLED).bg(BUTTON_BG))
            .percent(u16::from(percent))
            .label(format!("{}%", percent))
    };
    let mut y = rect.y + 3;
    if let Some(percent) = progress.percent_size {
        f.render_widget(gauge(percent), Rect::new(x, y, width, 1));
        y += 2;
    }
    f.render_widget(gauge(progress.percent_count), Rect::new(x, y, width, 1));
    if !progress.counter.is_empty() {
        f.render_widget(
            Paragraph::new(progress.counter.clone()).style(Style::default().fg(MUTED)),
            Rect::new(x, y + 1, width, 1),
        );
    }
}

fn render_choice(
    f: &mut Frame,
    area: Rect,
    title: &str,
    question: &str,
    buttons: &[&str],
    selected: usize,
) {
    let rect = dialog_area(area, 7);
    f.render_widget(Clear, rect);
    f.render_widget(dialog_block(title, BORDER), rect);

    let x = rect.x + 1 + DIALOG_H_PADDING;
    let width = rect.width.saturating_sub(2 + DIALOG_H_PADDING * 2);
    f.render_widget(
        Paragraph::new(question.to_string()).wrap(Wrap { trim: false }),
        Rect::new(x, rect.y + 1, width, 2),
    );

    let spans: Vec<Span> = buttons
        .iter()
        .enumerate()
        .flat_map(|(i, label)| {
            let style = if i == selected {
                Style::default()
                    .bg(BORDER)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().bg(BUTTON_BG).fg(FG)
            };
            [Span::styled(format!(" {} ", label), style), Span::raw(" ")]
        })
        .collect();
    f.render_widget(
        Paragraph::new(Line::from(spans)),
        Rect::new(x, rect.y + 4, width, 1),
    );
}

fn render_input(f: &mut Frame, area: Rect, title: &str, help: &str, value: &str) {
    let rect = dialog_area(area, 6);
    f.render_widget(Clear, rect);
    f.render_widget(dialog_block(title, BORDER), rect);

    let x = rect.x + 1 + DIALOG_H_PADDING;
    let width = rect.width.saturating_sub(2 + DIALOG_H_PADDING * 2);
    f.render_widget(Paragraph::new(help.to_string()), Rect::new(x, rect.y + 1, width, 1));

    // 커서가 보이도록 끝부분 기준으로 자름
    let visible: String = {
        let reversed: String = value.chars().rev().collect();
        truncate_to_width(&reversed, inner_width(rect).saturating_sub(1))
            .chars()
            .rev()
            .collect()
    };
    f.render_widget(
        Paragraph::new(format!("{}_", visible)).style(Style::default().bg(Color::Rgb(30, 30, 30))),
        Rect::new(x, rect.y + 3, width, 1),
    );
}

fn render_error(f: &mut Frame, area: Rect, message: &str) {
    let lines = message.lines().count() as u16;
    let rect = dialog_area(area, lines + 5);
    f.render_widget(Clear, rect);
    f.render_widget(dialog_block("Error", ERROR), rect);

    let x = rect.x + 1 + DIALOG_H_PADDING;
    let width = rect.width.saturating_sub(2 + DIALOG_H_PADDING * 2);
    f.render_widget(
        Paragraph::new(message.to_string()).wrap(Wrap { trim: false }),
        Rect::new(x, rect.y + 1, width, lines.max(1)),
    );
    f.render_widget(
        Paragraph::new("Press any key").style(Style::default().fg(MUTED)),
        Rect::new(x, rect.y + rect.height.saturating_sub(2), width, 1),
    );
}

impl UiBridge for TerminalUi {
    fn prompt_confirm(&mut self, title: &str, question: &str, default_yes: bool) -> ConfirmAnswer {
        let default = if default_yes { 0 } else { 1 };
        match self.choose(title, question, &["Yes", "No", "Cancel"], default, 2) {
            0 => ConfirmAnswer::Yes,
            1 => ConfirmAnswer::No,
            _ => ConfirmAnswer::Cancel,
        }
    }

    fn prompt_confirm_all(
        &mut self,
        title: &str,
        question: &str,
        default_yes: bool,
    ) -> ConfirmAllAnswer {
        let default = if default_yes { 0 } else { 2 };
        match self.choose(title, question, &["Yes", "All", "No", "Stop"], default, 3) {
            0 => ConfirmAllAnswer::Yes,
            1 => ConfirmAllAnswer::All,
            2 => ConfirmAllAnswer::No,
            _ => ConfirmAllAnswer::Stop,
        }
    }

    fn prompt_confirm_all_none(
        &mut self,
        title: &str,
        question: &str,
        default_yes: bool,
    ) -> ConfirmAllNoneAnswer {
        let default = if default_yes { 0 } else { 2 };
        let buttons = ["Yes", "All", "No", "None", "Stop"];
        match self.choose(title, question, &buttons, default, 4) {
            0 => ConfirmAllNoneAnswer::Yes,
            1 => ConfirmAllNoneAnswer::All,
            2 => ConfirmAllNoneAnswer::No,
            3 => ConfirmAllNoneAnswer::None,
            _ => ConfirmAllNoneAnswer::Stop,
        }
    }

    fn prompt_text(&mut self, title: &str, help: &str, default: &str) -> Option<String> {
        let mut value = default.to_string();
        loop {
            let current = value.clone();
            self.draw_with(|f, area| render_input(f, area, title, help, &current));
            let key = read_key()?;
            match key.code {
                KeyCode::Enter => return Some(value),
                KeyCode::Esc => return None,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return None,
                KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    value.clear()
                }
                KeyCode::Backspace => {
                    value.pop();
                }
                KeyCode::Char(c) => value.push(c),
                _ => {}
            }
        }
    }

    fn report_error(&mut self, message: &str) {
        self.draw_with(|f, area| render_error(f, area, message));
        let _ = read_key();
        self.redraw();
    }

    fn redraw_progress(&mut self, progress: &ProgressSnapshot) {
        self.progress = Some(progress.clone());
        self.redraw();
    }

    fn poll_cancel(&mut self) -> bool {
        match event::poll(Duration::ZERO) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    key.code == KeyCode::Esc
                        || (key.code == KeyCode::Char('c')
                            && key.modifiers.contains(KeyModifiers::CONTROL))
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn tick_busy(&mut self, frame: char) {
        if self.busy != frame {
            self.busy = frame;
            self.redraw();
        }
    }

    fn finish_progress(&mut self) {
        self.progress = None;
        self.busy = ' ';
        if let Err(e) = self.terminal.clear() {
            warn!("terminal clear failed: {}", e);
        }
    }
}
