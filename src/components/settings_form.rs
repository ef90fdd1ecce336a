use std::collections::{BTreeMap, HashMap};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

use crate::action::Action;
use crate::adapter::{AIAdapter, AdapterConfig};
use crate::config::Theme;
use crate::settings::{
    default_adapter_field, guest_clear_visible, render_plan, DefaultPresets, FieldKind, FieldName,
    FieldView, FormEntries, FormField, GroupAction, GroupView, SelectOption, ThemeChoice,
    UiSettings,
};
use crate::store::{PresetOption, StoreSnapshot};

use super::Component;

const LABEL_WIDTH: usize = 22;
const INDENT: &str = "                         ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsTab {
    Ai,
    Ui,
    Presets,
}

impl SettingsTab {
    pub const ALL: &'static [SettingsTab] = &[SettingsTab::Ai, SettingsTab::Ui, SettingsTab::Presets];

    pub fn title(&self) -> &'static str {
        match self {
            SettingsTab::Ai => "AI Settings",
            SettingsTab::Ui => "UI Settings",
            SettingsTab::Presets => "Presets",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormInputMode {
    Normal,
    Editing {
        field: FormField,
        buffer: String,
        masked: bool,
        show_plain: bool,
    },
}

/// One line of the current tab; headings and notes are not selectable
#[derive(Debug, Clone, PartialEq)]
enum Row {
    Heading(&'static str),
    Note(String),
    Field(FieldView),
    Action(GroupAction),
    Preset(AIAdapter),
    Theme,
    MaskCredentials,
    Submit,
    GuestClear,
}

impl Row {
    fn selectable(&self) -> bool {
        !matches!(self, Row::Heading(_) | Row::Note(_))
    }
}

/// The three-tab settings form
///
/// Field values start from the latest snapshot; anything the user types is
/// kept as a draft until it is submitted. Secret drafts are dropped after a
/// submission so the next one leaves stored keys alone.
pub struct SettingsForm {
    tab_index: usize,
    selected_row: usize,
    input_mode: FormInputMode,
    adapters: AdapterConfig,
    default_field: FieldView,
    groups: Vec<GroupView>,
    presets: Vec<PresetOption>,
    saved_presets: DefaultPresets,
    logged_in: bool,
    drafts: HashMap<FormField, String>,
    preset_drafts: BTreeMap<AIAdapter, String>,
    ui: UiSettings,
    scroll_offset: u16,
    inner_area: Rect,
}

impl SettingsForm {
    pub fn new(snapshot: &StoreSnapshot, ui: UiSettings, worker_count: usize) -> Self {
        let mut form = Self {
            tab_index: 0,
            selected_row: 0,
            input_mode: FormInputMode::Normal,
            adapters: AdapterConfig::default(),
            default_field: default_adapter_field(&snapshot.adapters, &snapshot.user),
            groups: Vec::new(),
            presets: Vec::new(),
            saved_presets: DefaultPresets::new(),
            logged_in: false,
            drafts: HashMap::new(),
            preset_drafts: BTreeMap::new(),
            ui,
            scroll_offset: 0,
            inner_area: Rect::default(),
        };
        form.recompute_visible_groups(snapshot, worker_count);
        form
    }

    /// Rebuild the groups after the snapshot changed
    pub fn recompute_visible_groups(&mut self, snapshot: &StoreSnapshot, worker_count: usize) {
        self.adapters = snapshot.adapters.clone();
        self.default_field = default_adapter_field(&snapshot.adapters, &snapshot.user);
        self.groups = render_plan(&snapshot.adapters, snapshot, worker_count);
        self.presets = snapshot.presets.clone();
        self.saved_presets = snapshot.user.default_presets.clone();
        self.logged_in = snapshot.logged_in;

        if let FormInputMode::Editing { field, .. } = &self.input_mode {
            if !self.is_field_visible(*field) {
                self.input_mode = FormInputMode::Normal;
            }
        }
        self.clamp_selection();
    }

    pub fn set_ui_settings(&mut self, ui: UiSettings) {
        self.ui = ui;
    }

    pub fn ui_settings(&self) -> &UiSettings {
        &self.ui
    }

    pub fn current_tab(&self) -> SettingsTab {
        SettingsTab::ALL[self.tab_index]
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.input_mode, FormInputMode::Editing { .. })
    }

    pub fn next_tab(&mut self) {
        self.tab_index = (self.tab_index + 1) % SettingsTab::ALL.len();
        self.selected_row = 0;
        self.scroll_offset = 0;
    }

    pub fn prev_tab(&mut self) {
        self.tab_index = (self.tab_index + SettingsTab::ALL.len() - 1) % SettingsTab::ALL.len();
        self.selected_row = 0;
        self.scroll_offset = 0;
    }

    pub fn next_row(&mut self) {
        let count = self.selectable_count();
        if count > 0 {
            self.selected_row = (self.selected_row + 1) % count;
        }
    }

    pub fn prev_row(&mut self) {
        let count = self.selectable_count();
        if count > 0 {
            self.selected_row = (self.selected_row + count - 1) % count;
        }
    }

    pub fn scroll_up(&mut self, n: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
    }

    pub fn scroll_down(&mut self, n: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(n);
    }

    /// Entries for a submission: the default adapter, every field of the
    /// visible groups, and the preset assigned to each enabled adapter
    pub fn entries(&self) -> FormEntries {
        let mut entries = FormEntries::new();
        entries.push_field(FormField::DefaultAdapter, self.value_of(&self.default_field));
        for group in &self.groups {
            for view in &group.fields {
                entries.push_field(view.field, self.value_of(view));
            }
        }
        for adapter in self.adapters.iter() {
            if let Some(preset_id) = self.preset_value(adapter).filter(|p| !p.is_empty()) {
                entries.push(FieldName::Preset(adapter), preset_id);
            }
        }
        entries
    }

    pub fn clear_secret_drafts(&mut self) {
        self.drafts.retain(|field, _| !field.is_secret());
    }

    /// Paste text into the input being edited
    pub fn paste_text(&mut self, text: &str) {
        if let FormInputMode::Editing { buffer, .. } = &mut self.input_mode {
            let filtered: String = text.chars().filter(|c| c.is_ascii_graphic()).collect();
            buffer.push_str(&filtered);
        }
    }

    fn is_field_visible(&self, field: FormField) -> bool {
        field == FormField::DefaultAdapter
            || self
                .groups
                .iter()
                .any(|group| group.fields.iter().any(|view| view.field == field))
    }

    /// Draft if any, else the initial value; select drafts must still be an option
    fn value_of<'a>(&'a self, view: &'a FieldView) -> &'a str {
        self.drafts
            .get(&view.field)
            .map(String::as_str)
            .filter(|draft| match &view.kind {
                FieldKind::Select(options) => options.iter().any(|o| o.value == *draft),
                FieldKind::Text | FieldKind::Secret => true,
            })
            .unwrap_or(&view.value)
    }

    fn preset_value(&self, adapter: AIAdapter) -> Option<&str> {
        self.preset_drafts
            .get(&adapter)
            .map(String::as_str)
            .or_else(|| self.saved_presets.get(adapter))
    }

    fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        match self.current_tab() {
            SettingsTab::Ai => {
                rows.push(Row::Field(self.default_field.clone()));
                for group in &self.groups {
                    rows.push(Row::Heading(group.group.title()));
                    rows.extend(group.fields.iter().cloned().map(Row::Field));
                    rows.extend(group.status.iter().cloned().map(Row::Note));
                    rows.extend(group.actions.iter().copied().map(Row::Action));
                }
                rows.push(Row::Submit);
                if guest_clear_visible(self.logged_in) {
                    rows.push(Row::Heading("Guest Data"));
                    rows.push(Row::Note("This cannot be undone!".to_string()));
                    rows.push(Row::GuestClear);
                }
            }
            SettingsTab::Ui => {
                rows.push(Row::Theme);
                rows.push(Row::MaskCredentials);
            }
            SettingsTab::Presets => {
                rows.push(Row::Note(
                    "Preset used by new conversations for each service".to_string(),
                ));
                rows.extend(self.adapters.iter().map(Row::Preset));
                rows.push(Row::Submit);
            }
        }
        rows
    }

    fn selectable_count(&self) -> usize {
        self.rows().iter().filter(|r| r.selectable()).count()
    }

    fn current_row(&self) -> Option<Row> {
        self.rows()
            .into_iter()
            .filter(Row::selectable)
            .nth(self.selected_row)
    }

    fn clamp_selection(&mut self) {
        let count = self.selectable_count();
        if self.selected_row >= count {
            self.selected_row = count.saturating_sub(1);
        }
    }

    /// Start editing the selected text or secret field
    pub fn start_editing(&mut self) {
        let Some(Row::Field(view)) = self.current_row() else {
            return;
        };
        let masked = match view.kind {
            FieldKind::Text => false,
            FieldKind::Secret => true,
            FieldKind::Select(_) => return,
        };
        let buffer = self.value_of(&view).to_string();
        self.input_mode = FormInputMode::Editing {
            field: view.field,
            buffer,
            masked,
            show_plain: !self.ui.mask_credentials,
        };
    }

    pub fn cancel_editing(&mut self) {
        self.input_mode = FormInputMode::Normal;
    }

    /// Keep the edited value as a draft
    pub fn confirm_edit(&mut self) {
        if let FormInputMode::Editing { field, buffer, .. } =
            std::mem::replace(&mut self.input_mode, FormInputMode::Normal)
        {
            self.drafts.insert(field, buffer);
        }
    }

    pub fn toggle_mask_visibility(&mut self) {
        if let FormInputMode::Editing { show_plain, .. } = &mut self.input_mode {
            *show_plain = !*show_plain;
        }
    }

    pub fn clear_input(&mut self) {
        if let FormInputMode::Editing { buffer, .. } = &mut self.input_mode {
            buffer.clear();
        }
    }

    fn handle_edit_char(&mut self, c: char) {
        if let FormInputMode::Editing { buffer, .. } = &mut self.input_mode {
            buffer.push(c);
        }
    }

    fn handle_edit_backspace(&mut self) {
        if let FormInputMode::Editing { buffer, .. } = &mut self.input_mode {
            buffer.pop();
        }
    }

    /// Step the selected select-like row; returns an action when the change
    /// applies immediately
    fn cycle_selected(&mut self, forward: bool) -> Option<Action> {
        match self.current_row()? {
            Row::Field(view) => {
                if let FieldKind::Select(options) = &view.kind {
                    let next = step_option(options, self.value_of(&view), forward)?;
                    self.drafts.insert(view.field, next);
                }
                None
            }
            Row::Preset(adapter) => {
                let options = self.preset_options();
                let current = self.preset_value(adapter).unwrap_or("").to_string();
                let next = step_option(&options, &current, forward)?;
                self.preset_drafts.insert(adapter, next);
                None
            }
            Row::Theme => {
                let themes = ThemeChoice::ALL;
                let idx = themes.iter().position(|t| *t == self.ui.theme).unwrap_or(0);
                let next = if forward {
                    (idx + 1) % themes.len()
                } else {
                    (idx + themes.len() - 1) % themes.len()
                };
                self.ui.theme = themes[next];
                Some(Action::ApplyUiSettings(self.ui.clone()))
            }
            Row::MaskCredentials => {
                self.ui.mask_credentials = !self.ui.mask_credentials;
                Some(Action::ApplyUiSettings(self.ui.clone()))
            }
            _ => None,
        }
    }

    fn preset_options(&self) -> Vec<SelectOption> {
        std::iter::once(SelectOption::new("", "None"))
            .chain(
                self.presets
                    .iter()
                    .map(|p| SelectOption::new(p.id.clone(), p.name.clone())),
            )
            .collect()
    }

    /// Enter/Space on the selected row
    fn activate_selected(&mut self) -> Option<Action> {
        match self.current_row()? {
            Row::Field(view) => match view.kind {
                FieldKind::Select(_) => self.cycle_selected(true),
                FieldKind::Text | FieldKind::Secret => {
                    self.start_editing();
                    Some(Action::FormStartEdit)
                }
            },
            Row::Action(GroupAction::DeleteKey(adapter)) => Some(Action::DeleteKey(adapter)),
            Row::Action(GroupAction::ViewUsage) => Some(Action::UsageShow),
            Row::Action(GroupAction::SelectWorkers) => Some(Action::WorkersShow),
            Row::Action(GroupAction::RefreshHorde) => Some(Action::RefreshHorde),
            Row::Preset(_) | Row::Theme | Row::MaskCredentials => self.cycle_selected(true),
            Row::Submit => Some(Action::FormSubmit),
            Row::GuestClear => Some(Action::GuestClearRequest),
            Row::Heading(_) | Row::Note(_) => None,
        }
    }

    fn handle_key_normal(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Tab => {
                self.next_tab();
                Some(Action::FormNextTab)
            }
            KeyCode::BackTab => {
                self.prev_tab();
                Some(Action::FormPrevTab)
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.next_row();
                Some(Action::FormNextRow)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.prev_row();
                Some(Action::FormPrevRow)
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.activate_selected(),
            KeyCode::Left | KeyCode::Char('h') => self.cycle_selected(false),
            KeyCode::Right | KeyCode::Char('l') => self.cycle_selected(true),
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::FormSubmit)
            }
            KeyCode::Char('r') => Some(Action::RefreshHorde),
            KeyCode::Esc | KeyCode::Char('q') => Some(Action::Quit),
            _ => None,
        }
    }

    fn handle_key_editing(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => {
                self.cancel_editing();
                Some(Action::FormCancelEdit)
            }
            KeyCode::Enter => {
                self.confirm_edit();
                None
            }
            KeyCode::Backspace => {
                self.handle_edit_backspace();
                None
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.toggle_mask_visibility();
                None
            }
            KeyCode::Char('k') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear_input();
                None
            }
            KeyCode::Char('v') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::FormPaste),
            KeyCode::Char(c) => {
                self.handle_edit_char(c);
                None
            }
            _ => None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        match &self.input_mode {
            FormInputMode::Normal => self.handle_key_normal(key),
            FormInputMode::Editing { .. } => self.handle_key_editing(key),
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Option<Action> {
        if !self.inner_area.contains((mouse.column, mouse.row).into()) {
            return None;
        }

        match mouse.kind {
            MouseEventKind::ScrollUp => Some(Action::FormScrollUp(3)),
            MouseEventKind::ScrollDown => Some(Action::FormScrollDown(3)),
            _ => None,
        }
    }

    fn render_tab_bar(&self, theme: &Theme) -> Line<'static> {
        let mut spans = Vec::new();
        for (idx, tab) in SettingsTab::ALL.iter().enumerate() {
            let style = if idx == self.tab_index {
                Style::default()
                    .fg(theme.form.tab_active.to_color())
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(theme.form.tab_inactive.to_color())
            };
            spans.push(Span::raw(" "));
            spans.push(Span::styled(tab.title().to_string(), style));
            spans.push(Span::raw(" "));
        }
        Line::from(spans)
    }

    fn render_rows(&self, theme: &Theme) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        let mut selectable_idx = 0;

        for row in self.rows() {
            let is_selected = row.selectable() && selectable_idx == self.selected_row;
            if row.selectable() {
                selectable_idx += 1;
            }
            let selector = if is_selected { "▸" } else { " " };
            let selector_span = Span::styled(
                format!(" {} ", selector),
                Style::default().fg(theme.colors.accent.to_color()),
            );
            let name_style = if is_selected {
                Style::default()
                    .fg(theme.colors.accent.to_color())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.form.label_fg.to_color())
            };
            let muted = Style::default().fg(theme.colors.muted.to_color());

            match row {
                Row::Heading(title) => {
                    lines.push(Line::default());
                    lines.push(Line::from(Span::styled(
                        title.to_string(),
                        Style::default()
                            .fg(theme.colors.primary.to_color())
                            .add_modifier(Modifier::BOLD),
                    )));
                }
                Row::Note(text) => {
                    lines.push(Line::from(vec![Span::raw("   "), Span::styled(text, muted)]));
                }
                Row::Field(view) => {
                    lines.extend(self.render_field(&view, selector_span, name_style, theme));
                }
                Row::Action(action) => {
                    let color = match action {
                        GroupAction::DeleteKey(_) => theme.form.danger.to_color(),
                        _ => theme.colors.secondary.to_color(),
                    };
                    let mut style = Style::default().fg(color);
                    if is_selected {
                        style = style.add_modifier(Modifier::BOLD);
                    }
                    lines.push(Line::from(vec![
                        selector_span,
                        Span::styled(format!("[ {} ]", action.label()), style),
                    ]));
                }
                Row::Preset(adapter) => {
                    let options = self.preset_options();
                    let value = self.preset_value(adapter).unwrap_or("");
                    lines.push(Line::from(vec![
                        selector_span,
                        Span::styled(format!("{:width$} ", adapter.label(), width = LABEL_WIDTH), name_style),
                        Span::styled(
                            format!("◂ {} ▸", option_label(&options, value)),
                            Style::default().fg(theme.colors.foreground.to_color()),
                        ),
                    ]));
                }
                Row::Theme => {
                    lines.push(Line::from(vec![
                        selector_span,
                        Span::styled(format!("{:width$} ", "Theme", width = LABEL_WIDTH), name_style),
                        Span::styled(
                            format!("◂ {} ▸", self.ui.theme.as_str()),
                            Style::default().fg(theme.colors.foreground.to_color()),
                        ),
                    ]));
                }
                Row::MaskCredentials => {
                    let mark = if self.ui.mask_credentials { "[x]" } else { "[ ]" };
                    lines.push(Line::from(vec![
                        selector_span,
                        Span::styled(
                            format!("{:width$} ", "Mask credentials", width = LABEL_WIDTH),
                            name_style,
                        ),
                        Span::styled(mark, Style::default().fg(theme.colors.foreground.to_color())),
                    ]));
                }
                Row::Submit => {
                    lines.push(Line::default());
                    let mut style = Style::default().fg(theme.colors.success.to_color());
                    if is_selected {
                        style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
                    }
                    lines.push(Line::from(vec![
                        selector_span,
                        Span::styled("[ Update Settings ]", style),
                        Span::styled("  ^S", muted),
                    ]));
                }
                Row::GuestClear => {
                    let mut style = Style::default().fg(theme.form.danger.to_color());
                    if is_selected {
                        style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
                    }
                    lines.push(Line::from(vec![
                        selector_span,
                        Span::styled("[ Delete Guest State ]", style),
                    ]));
                }
            }
        }

        lines
    }

    fn render_field(
        &self,
        view: &FieldView,
        selector_span: Span<'static>,
        name_style: Style,
        theme: &Theme,
    ) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        let muted = Style::default().fg(theme.colors.muted.to_color());
        let value_style = Style::default().fg(theme.colors.foreground.to_color());
        let label_span = Span::styled(format!("{:width$} ", view.label, width = LABEL_WIDTH), name_style);

        if let FormInputMode::Editing {
            field,
            buffer,
            masked,
            show_plain,
        } = &self.input_mode
        {
            if *field == view.field {
                let display = if *masked && !*show_plain {
                    "•".repeat(buffer.chars().count())
                } else {
                    buffer.clone()
                };
                let accent = Style::default().fg(theme.colors.accent.to_color());
                let mut spans = vec![
                    selector_span,
                    label_span,
                    Span::styled("[", muted),
                    Span::styled(display, accent),
                    Span::styled("█", accent),
                    Span::styled("]", muted),
                ];
                if *masked {
                    let vis_icon = if *show_plain { "👁" } else { "🔒" };
                    spans.push(Span::styled(format!(" {} ", vis_icon), muted));
                    spans.push(Span::styled(format!(" ({} chars)", buffer.chars().count()), muted));
                }
                lines.push(Line::from(spans));

                let mut hints = vec![
                    Span::raw(INDENT),
                    Span::styled("↵ keep  ", Style::default().fg(theme.colors.success.to_color())),
                    Span::styled("Esc cancel  ", muted),
                ];
                if *masked {
                    hints.push(Span::styled(
                        "^U show/hide  ",
                        Style::default().fg(theme.colors.secondary.to_color()),
                    ));
                }
                hints.push(Span::styled("^K clear", Style::default().fg(theme.colors.warning.to_color())));
                lines.push(Line::from(hints));
                return lines;
            }
        }

        let value = self.value_of(view);
        let value_span = match &view.kind {
            FieldKind::Select(options) => {
                Span::styled(format!("◂ {} ▸", option_label(options, value)), value_style)
            }
            FieldKind::Secret if !value.is_empty() => {
                let shown = if self.ui.mask_credentials {
                    "•".repeat(value.chars().count())
                } else {
                    value.to_string()
                };
                Span::styled(shown, value_style)
            }
            FieldKind::Text if !value.is_empty() => Span::styled(value.to_string(), value_style),
            FieldKind::Text | FieldKind::Secret => Span::styled(
                view.placeholder.clone(),
                Style::default().fg(theme.form.placeholder_fg.to_color()),
            ),
        };
        lines.push(Line::from(vec![selector_span, label_span, value_span]));

        for helper in &view.helper {
            lines.push(Line::from(vec![Span::raw(INDENT), Span::styled(helper.clone(), muted)]));
        }
        lines
    }

    fn render_themed(&self, frame: &mut Frame, area: Rect, focused: bool, theme: &Theme) {
        let border_style = theme.border_style(focused);
        let title_style = theme.title_style(focused);

        let mode_indicator = match &self.input_mode {
            FormInputMode::Normal => "",
            FormInputMode::Editing { .. } => " [EDITING]",
        };
        let title = format!(
            " Settings{} [Tab=tab j/k=nav ↵=select ←/→=change ^S=save r=refresh] ",
            mode_indicator
        );

        let block = Block::default()
            .title(title)
            .title_style(title_style)
            .borders(Borders::ALL)
            .border_style(border_style);

        let inner = block.inner(area);

        let mut lines = vec![self.render_tab_bar(theme), Line::default()];
        lines.extend(self.render_rows(theme));

        let content_height = lines.len() as u16;
        let visible_height = inner.height;
        let max_scroll = content_height.saturating_sub(visible_height);
        let scroll_offset = self.scroll_offset.min(max_scroll);

        let visible_lines: Vec<Line> = lines
            .into_iter()
            .skip(scroll_offset as usize)
            .take(visible_height as usize)
            .collect();

        frame.render_widget(Paragraph::new(visible_lines).block(block), area);

        if content_height > visible_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state =
                ScrollbarState::new(max_scroll as usize).position(scroll_offset as usize);
            frame.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    horizontal: 0,
                    vertical: 1,
                }),
                &mut scrollbar_state,
            );
        }
    }

    /// Remember where the form was drawn, for mouse hit-testing
    pub fn set_inner_area(&mut self, area: Rect) {
        self.inner_area = area;
    }
}

fn option_label<'a>(options: &'a [SelectOption], value: &'a str) -> &'a str {
    options
        .iter()
        .find(|o| o.value == value)
        .map(|o| o.label.as_str())
        .unwrap_or(value)
}

fn step_option(options: &[SelectOption], current: &str, forward: bool) -> Option<String> {
    if options.is_empty() {
        return None;
    }
    let next = match options.iter().position(|o| o.value == current) {
        Some(idx) if forward => (idx + 1) % options.len(),
        Some(idx) => (idx + options.len() - 1) % options.len(),
        None => 0,
    };
    Some(options[next].value.clone())
}

impl Component for SettingsForm {
    fn handle_event(&mut self, event: &Event) -> Option<Action> {
        match event {
            Event::Key(key) => self.handle_key(*key),
            Event::Mouse(mouse) => self.handle_mouse(*mouse),
            Event::Paste(text) => {
                self.paste_text(text);
                None
            }
            _ => None,
        }
    }

    fn update(&mut self, action: &Action) {
        match action {
            Action::FormScrollUp(n) => self.scroll_up(*n),
            Action::FormScrollDown(n) => self.scroll_down(*n),
            Action::FormCancelEdit => self.cancel_editing(),
            _ => {}
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool, theme: &Theme) {
        self.render_themed(frame, area, focused, theme);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::build_update;
    use pretty_assertions::assert_eq;

    fn snapshot(adapters: &[AIAdapter]) -> StoreSnapshot {
        StoreSnapshot {
            adapters: AdapterConfig::new(adapters.iter().copied()),
            ..Default::default()
        }
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn all_text(form: &SettingsForm) -> String {
        form.render_rows(&Theme::default())
            .iter()
            .map(line_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Move the selection onto the first field row with this field
    fn select_field(form: &mut SettingsForm, field: FormField) {
        let idx = form
            .rows()
            .into_iter()
            .filter(Row::selectable)
            .position(|r| matches!(&r, Row::Field(v) if v.field == field))
            .unwrap();
        form.selected_row = idx;
    }

    fn type_text(form: &mut SettingsForm, text: &str) {
        for c in text.chars() {
            form.handle_event(&key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_tab_navigation_wraps() {
        let mut form = SettingsForm::new(&snapshot(&[AIAdapter::Horde]), UiSettings::default(), 0);
        assert_eq!(form.current_tab(), SettingsTab::Ai);

        form.handle_event(&key(KeyCode::Tab));
        assert_eq!(form.current_tab(), SettingsTab::Ui);
        form.handle_event(&key(KeyCode::Tab));
        assert_eq!(form.current_tab(), SettingsTab::Presets);
        form.handle_event(&key(KeyCode::Tab));
        assert_eq!(form.current_tab(), SettingsTab::Ai);

        form.handle_event(&key(KeyCode::BackTab));
        assert_eq!(form.current_tab(), SettingsTab::Presets);
    }

    #[test]
    fn test_row_navigation_skips_headings() {
        let mut form = SettingsForm::new(&snapshot(&[AIAdapter::Kobold]), UiSettings::default(), 0);
        // default adapter, kobold url, submit, guest clear
        assert_eq!(form.selectable_count(), 4);

        form.next_row();
        assert!(matches!(form.current_row(), Some(Row::Field(v)) if v.field == FormField::KoboldUrl));
        form.prev_row();
        form.prev_row();
        assert_eq!(form.current_row(), Some(Row::GuestClear));
    }

    #[test]
    fn test_entries_contain_only_visible_fields() {
        let mut form = SettingsForm::new(
            &snapshot(&[AIAdapter::OpenAI, AIAdapter::Novel]),
            UiSettings::default(),
            0,
        );

        select_field(&mut form, FormField::OaiKey);
        form.handle_event(&key(KeyCode::Enter));
        assert!(form.is_editing());
        type_text(&mut form, "sk-abc");
        form.handle_event(&key(KeyCode::Enter));
        assert!(!form.is_editing());

        let entries = form.entries();
        let names: Vec<String> = entries.iter().map(|(name, _)| name.to_string()).collect();
        assert_eq!(
            names,
            vec!["defaultAdapter", "oaiKey", "novelModel", "novelApiKey"]
        );
        assert_eq!(entries.get(FormField::DefaultAdapter), Some("openai"));
        assert_eq!(entries.get(FormField::OaiKey), Some("sk-abc"));
        assert_eq!(entries.get(FormField::NovelApiKey), Some(""));
        assert_eq!(entries.get(FormField::NovelModel), Some("euterpe-v2"));
        assert!(!entries.contains(FormField::HordeKey));
    }

    #[test]
    fn test_default_adapter_starts_on_an_enabled_option() {
        let form = SettingsForm::new(
            &snapshot(&[AIAdapter::OpenAI, AIAdapter::Novel]),
            UiSettings::default(),
            0,
        );

        let update = build_update(&form.entries(), None, None).unwrap();
        assert_eq!(update.default_adapter, AIAdapter::OpenAI);
        assert_eq!(update.oai_key, Some(String::new()));
        assert!(update.default_presets.is_empty());
        assert!(update.horde_workers.is_empty());
    }

    #[test]
    fn test_default_adapter_draft_dropped_when_disabled() {
        let mut form = SettingsForm::new(
            &snapshot(&[AIAdapter::OpenAI, AIAdapter::Claude]),
            UiSettings::default(),
            0,
        );
        select_field(&mut form, FormField::DefaultAdapter);
        form.handle_event(&key(KeyCode::Right));
        assert_eq!(form.entries().get(FormField::DefaultAdapter), Some("claude"));

        form.recompute_visible_groups(&snapshot(&[AIAdapter::OpenAI, AIAdapter::Kobold]), 0);
        assert_eq!(form.entries().get(FormField::DefaultAdapter), Some("openai"));
    }

    #[test]
    fn test_hidden_group_drops_from_next_submission() {
        let mut form = SettingsForm::new(
            &snapshot(&[AIAdapter::Kobold, AIAdapter::Luminai]),
            UiSettings::default(),
            0,
        );
        select_field(&mut form, FormField::KoboldUrl);
        form.start_editing();
        type_text(&mut form, "http://localhost:5000");
        form.confirm_edit();
        assert_eq!(form.entries().get(FormField::KoboldUrl), Some("http://localhost:5000"));

        form.recompute_visible_groups(&snapshot(&[AIAdapter::Luminai]), 0);
        let entries = form.entries();
        assert!(!entries.contains(FormField::KoboldUrl));
        assert!(entries.contains(FormField::LuminaiUrl));
    }

    #[test]
    fn test_recompute_cancels_edit_of_hidden_field() {
        let mut form = SettingsForm::new(&snapshot(&[AIAdapter::Claude]), UiSettings::default(), 0);
        select_field(&mut form, FormField::ClaudeApiKey);
        form.start_editing();
        assert!(form.is_editing());

        form.recompute_visible_groups(&snapshot(&[AIAdapter::Horde]), 0);
        assert!(!form.is_editing());
    }

    #[test]
    fn test_secret_input_is_masked() {
        let mut form = SettingsForm::new(&snapshot(&[AIAdapter::Claude]), UiSettings::default(), 0);
        select_field(&mut form, FormField::ClaudeApiKey);
        form.start_editing();
        type_text(&mut form, "abc");

        let text = all_text(&form);
        assert!(text.contains("•••"), "secret should be masked: {text}");
        assert!(text.contains("(3 chars)"));
        assert!(!text.contains("abc"));

        form.handle_event(&ctrl('u'));
        let text = all_text(&form);
        assert!(text.contains("abc"));
    }

    #[test]
    fn test_unmasked_preference_shows_plain_input() {
        let ui = UiSettings {
            mask_credentials: false,
            ..Default::default()
        };
        let mut form = SettingsForm::new(&snapshot(&[AIAdapter::Claude]), ui, 0);
        select_field(&mut form, FormField::ClaudeApiKey);
        form.start_editing();
        type_text(&mut form, "xyz");
        assert!(all_text(&form).contains("xyz"));
    }

    #[test]
    fn test_secret_drafts_cleared_after_submit() {
        let mut form = SettingsForm::new(
            &snapshot(&[AIAdapter::OpenAI, AIAdapter::Kobold]),
            UiSettings::default(),
            0,
        );
        select_field(&mut form, FormField::OaiKey);
        form.start_editing();
        type_text(&mut form, "sk-1");
        form.confirm_edit();
        select_field(&mut form, FormField::KoboldUrl);
        form.start_editing();
        type_text(&mut form, "http://k");
        form.confirm_edit();

        form.clear_secret_drafts();
        let entries = form.entries();
        assert_eq!(entries.get(FormField::OaiKey), Some(""));
        assert_eq!(entries.get(FormField::KoboldUrl), Some("http://k"));
    }

    #[test]
    fn test_paste_filters_whitespace() {
        let mut form = SettingsForm::new(&snapshot(&[AIAdapter::OpenAI]), UiSettings::default(), 0);
        select_field(&mut form, FormField::OaiKey);
        form.start_editing();
        form.handle_event(&Event::Paste("sk-abc\n".to_string()));
        form.confirm_edit();
        assert_eq!(form.entries().get(FormField::OaiKey), Some("sk-abc"));
    }

    #[test]
    fn test_action_rows_map_to_actions() {
        let mut snap = snapshot(&[AIAdapter::OpenAI]);
        snap.user.oai_key_set = true;
        let mut form = SettingsForm::new(&snap, UiSettings::default(), 0);

        form.selected_row = 2;
        assert_eq!(form.handle_event(&key(KeyCode::Enter)), Some(Action::UsageShow));
        form.selected_row = 3;
        assert_eq!(
            form.handle_event(&key(KeyCode::Enter)),
            Some(Action::DeleteKey(AIAdapter::OpenAI))
        );
        form.selected_row = 4;
        assert_eq!(form.handle_event(&key(KeyCode::Enter)), Some(Action::FormSubmit));
    }

    #[test]
    fn test_shortcuts() {
        let mut form = SettingsForm::new(&snapshot(&[AIAdapter::Horde]), UiSettings::default(), 0);
        assert_eq!(form.handle_event(&ctrl('s')), Some(Action::FormSubmit));
        assert_eq!(form.handle_event(&key(KeyCode::Char('r'))), Some(Action::RefreshHorde));
        assert_eq!(form.handle_event(&key(KeyCode::Char('q'))), Some(Action::Quit));
    }

    #[test]
    fn test_guest_clear_only_for_guests() {
        let mut snap = snapshot(&[AIAdapter::Horde]);
        let form = SettingsForm::new(&snap, UiSettings::default(), 0);
        assert!(all_text(&form).contains("Delete Guest State"));

        snap.logged_in = true;
        let form = SettingsForm::new(&snap, UiSettings::default(), 0);
        assert!(!all_text(&form).contains("Delete Guest State"));
        assert!(!form.rows().contains(&Row::GuestClear));
    }

    #[test]
    fn test_horde_group_render() {
        let mut snap = snapshot(&[AIAdapter::Horde]);
        snap.user.horde_name = Some("alice".to_string());
        let form = SettingsForm::new(&snap, UiSettings::default(), 2);
        let text = all_text(&form);
        assert!(text.contains("Logged in as alice."));
        assert!(text.contains("Workers selected: 2"));
        assert!(text.contains("[ Delete Horde API Key ]"));
        assert!(text.contains("◂ Any ▸"));
    }

    #[test]
    fn test_preset_tab_assigns_per_adapter() {
        let mut snap = snapshot(&[AIAdapter::Novel, AIAdapter::OpenAI]);
        snap.user.default_presets.assign(AIAdapter::Novel, "novel");
        let mut form = SettingsForm::new(&snap, UiSettings::default(), 0);
        form.next_tab();
        form.next_tab();
        assert_eq!(form.current_tab(), SettingsTab::Presets);

        let presets: Vec<Row> = form
            .rows()
            .into_iter()
            .filter(|r| matches!(r, Row::Preset(_)))
            .collect();
        assert_eq!(presets.len(), 2);

        let openai_idx = form
            .rows()
            .into_iter()
            .filter(Row::selectable)
            .position(|r| r == Row::Preset(AIAdapter::OpenAI))
            .unwrap();
        form.selected_row = openai_idx;
        form.handle_event(&key(KeyCode::Right));

        let entries = form.entries();
        let presets: Vec<(String, String)> = entries
            .iter()
            .filter(|(name, _)| matches!(name, FieldName::Preset(_)))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        assert_eq!(presets.len(), 2);
        assert!(presets.contains(&("preset.novel".to_string(), "novel".to_string())));
        assert!(presets.contains(&("preset.openai".to_string(), "basic".to_string())));
    }

    #[test]
    fn test_ui_tab_changes_apply_immediately() {
        let mut form = SettingsForm::new(&snapshot(&[AIAdapter::Horde]), UiSettings::default(), 0);
        form.next_tab();

        let action = form.handle_event(&key(KeyCode::Right));
        let expected = UiSettings {
            theme: ThemeChoice::Vibrant,
            mask_credentials: true,
        };
        assert_eq!(action, Some(Action::ApplyUiSettings(expected)));

        form.next_row();
        let action = form.handle_event(&key(KeyCode::Enter));
        assert!(matches!(action, Some(Action::ApplyUiSettings(ui)) if !ui.mask_credentials));
    }
}
