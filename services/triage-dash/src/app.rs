// services/triage-dash/src/app.rs
//
// Event-loop state: tabs, queue filter, selection, intake form, stock
// editor and notifications. Key handling maps input to Actions using the
// affordances of the current view.

use chrono::{DateTime, Local};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

use crate::derive::PatientFilter;
use crate::dispatch::{Action, CommandReport};
use crate::form::PatientForm;
use crate::notify::{refresh_notice, Notification, Notifier};
use crate::store::RefreshOutcome;
use crate::view::{DashboardView, Intent, PatientCard, ResourceCard};
use svckit::types::PatientInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Input,
    Queue,
    Resources,
    Stats,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Input, Tab::Queue, Tab::Resources, Tab::Stats];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Input => "Input",
            Tab::Queue => "Queue",
            Tab::Resources => "Resources",
            Tab::Stats => "Stats",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn next(self) -> Tab {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

/// Everything the main loop reacts to besides the redraw tick.
#[derive(Debug)]
pub enum AppEvent {
    Input(Event),
    Refreshed(RefreshOutcome),
    Command(CommandReport),
    Notify(Notification),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockEditor {
    pub resource_id: i64,
    pub label: String,
    pub buffer: String,
}

const MAX_STOCK_DIGITS: usize = 9;

pub struct App {
    pub tab: Tab,
    pub filter: PatientFilter,
    pub queue_selected: usize,
    pub resource_selected: usize,
    /// Entity ids behind the selections; rebuilds re-resolve the index from these.
    selected_patient_id: Option<i64>,
    selected_resource_id: Option<i64>,
    pub form: PatientForm,
    /// Last input sent for creation, so a confirmation only clears the form it came from.
    submitted: Option<PatientInput>,
    pub stock_editor: Option<StockEditor>,
    pub notifier: Notifier,
    pub demo: bool,
    pub backend: String,
    /// None until the first refresh cycle completes.
    pub connected: Option<bool>,
    pub last_refreshed: Option<DateTime<Local>>,
    pub pending_commands: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(backend: impl Into<String>, demo: bool, notification_ttl: Duration) -> Self {
        Self {
            tab: Tab::Queue,
            filter: PatientFilter::All,
            queue_selected: 0,
            resource_selected: 0,
            selected_patient_id: None,
            selected_resource_id: None,
            form: PatientForm::new(),
            submitted: None,
            stock_editor: None,
            notifier: Notifier::new(notification_ttl),
            demo,
            backend: backend.into(),
            connected: None,
            last_refreshed: None,
            pending_commands: 0,
            should_quit: false,
        }
    }

    pub fn set_filter(&mut self, filter: PatientFilter) {
        if self.filter != filter {
            self.filter = filter;
            self.queue_selected = 0;
            self.selected_patient_id = None;
        }
    }

    pub fn selected_patient<'v>(&self, view: &'v DashboardView) -> Option<&'v PatientCard> {
        view.queue.get(self.queue_selected)
    }

    pub fn selected_resource<'v>(&self, view: &'v DashboardView) -> Option<&'v ResourceCard> {
        view.resources.get(self.resource_selected)
    }

    /// Follow the selected entities after a rebuild. An entity that left
    /// its list falls back to the nearest remaining slot.
    pub fn clamp_selection(&mut self, view: &DashboardView) {
        let queue_ids: Vec<i64> = view.queue.iter().map(|c| c.id).collect();
        let resource_ids: Vec<i64> = view.resources.iter().map(|c| c.id).collect();
        (self.queue_selected, self.selected_patient_id) =
            follow(&queue_ids, self.queue_selected, self.selected_patient_id);
        (self.resource_selected, self.selected_resource_id) =
            follow(&resource_ids, self.resource_selected, self.selected_resource_id);
    }

    fn select_patient(&mut self, index: usize, view: &DashboardView) {
        self.queue_selected = index;
        self.selected_patient_id = view.queue.get(index).map(|c| c.id);
    }

    fn select_resource(&mut self, index: usize, view: &DashboardView) {
        self.resource_selected = index;
        self.selected_resource_id = view.resources.get(index).map(|c| c.id);
    }

    pub fn apply_refresh(
        &mut self,
        outcome: &RefreshOutcome,
        last_refreshed: Option<DateTime<Local>>,
    ) {
        self.connected = Some(outcome.reached_backend());
        self.last_refreshed = last_refreshed;
        if let Some(notice) = refresh_notice(outcome) {
            self.notifier.push(notice);
        }
    }

    pub fn apply_command(
        &mut self,
        report: CommandReport,
        last_refreshed: Option<DateTime<Local>>,
    ) {
        self.pending_commands = self.pending_commands.saturating_sub(1);
        if let Some(outcome) = &report.refresh {
            self.connected = Some(outcome.reached_backend());
            self.last_refreshed = last_refreshed;
        }
        if report.action == "submit_patient" && report.success {
            let submitted = self.submitted.take();
            if submitted.is_some() && self.form.build().ok() == submitted {
                self.form.reset();
            }
        }
        for notice in report.notices {
            self.notifier.push(notice);
        }
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifier.push(notification);
    }

    /// Map one key press to at most one command. View-local changes
    /// (tabs, filter, selection, form edits) are applied directly.
    pub fn handle_key(&mut self, key: KeyEvent, view: &DashboardView) -> Option<Action> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return None;
        }
        if self.stock_editor.is_some() {
            return self.handle_stock_editor(key);
        }
        if self.tab == Tab::Input {
            return self.handle_form(key);
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                None
            }
            KeyCode::Char(c @ '1'..='4') => {
                self.tab = Tab::ALL[(c as usize) - ('1' as usize)];
                None
            }
            KeyCode::Tab => {
                self.tab = self.tab.next();
                None
            }
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('E') => Some(Action::Export),
            KeyCode::Char('G') => Some(Action::GenerateReport),
            _ => match self.tab {
                Tab::Queue => self.handle_queue(key, view),
                Tab::Resources => self.handle_resources(key, view),
                Tab::Input | Tab::Stats => None,
            },
        }
    }

    fn handle_queue(&mut self, key: KeyEvent, view: &DashboardView) -> Option<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.select_patient(self.queue_selected.saturating_sub(1), view);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.queue_selected + 1 < view.queue.len() {
                    self.select_patient(self.queue_selected + 1, view);
                }
                None
            }
            KeyCode::Char(c) => {
                if let Some(filter) = filter_for_key(c) {
                    self.set_filter(filter);
                    return None;
                }
                let affordance = self.selected_patient(view)?.affordance(c)?;
                match &affordance.intent {
                    Intent::Dispatch(action) => Some(action.clone()),
                    Intent::EditStock { .. } => None,
                }
            }
            _ => None,
        }
    }

    fn handle_resources(&mut self, key: KeyEvent, view: &DashboardView) -> Option<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.select_resource(self.resource_selected.saturating_sub(1), view);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.resource_selected + 1 < view.resources.len() {
                    self.select_resource(self.resource_selected + 1, view);
                }
                None
            }
            KeyCode::Char(c) => {
                let card = self.selected_resource(view)?;
                let affordance = card.affordance(c)?;
                match &affordance.intent {
                    Intent::EditStock { resource_id, current } => {
                        self.stock_editor = Some(StockEditor {
                            resource_id: *resource_id,
                            label: card.label.clone(),
                            buffer: current.to_string(),
                        });
                        None
                    }
                    Intent::Dispatch(action) => Some(action.clone()),
                }
            }
            _ => None,
        }
    }

    fn handle_stock_editor(&mut self, key: KeyEvent) -> Option<Action> {
        let editor = self.stock_editor.as_mut()?;
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if editor.buffer.len() < MAX_STOCK_DIGITS {
                    editor.buffer.push(c);
                }
                None
            }
            KeyCode::Backspace => {
                editor.buffer.pop();
                None
            }
            KeyCode::Esc => {
                self.stock_editor = None;
                None
            }
            KeyCode::Enter => match editor.buffer.parse::<u32>() {
                Ok(stock) => {
                    let resource_id = editor.resource_id;
                    self.stock_editor = None;
                    Some(Action::UpdateStock { resource_id, stock })
                }
                Err(_) => {
                    self.notifier
                        .push(Notification::warn("Enter a stock value before saving"));
                    None
                }
            },
            _ => None,
        }
    }

    fn handle_form(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => {
                self.tab = Tab::Queue;
                None
            }
            KeyCode::Tab | KeyCode::Down => {
                self.form.focus_next();
                None
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.form.focus_prev();
                None
            }
            KeyCode::Backspace => {
                self.form.backspace();
                None
            }
            KeyCode::Enter => match self.form.build() {
                Ok(input) => {
                    self.submitted = Some(input.clone());
                    Some(Action::SubmitPatient(input))
                }
                Err(e) => {
                    self.notifier.push(Notification::error(e.user_message()));
                    None
                }
            },
            KeyCode::Char(c) => {
                self.form.insert(c);
                None
            }
            _ => None,
        }
    }
}

/// Resolve a selection against the ids of a rebuilt list.
fn follow(ids: &[i64], index: usize, selected: Option<i64>) -> (usize, Option<i64>) {
    let index = selected
        .and_then(|id| ids.iter().position(|&i| i == id))
        .unwrap_or_else(|| index.min(ids.len().saturating_sub(1)));
    (index, ids.get(index).copied())
}

fn filter_for_key(c: char) -> Option<PatientFilter> {
    match c {
        'a' => Some(PatientFilter::All),
        'i' => Some(PatientFilter::Immediate),
        'd' => Some(PatientFilter::Delayed),
        'm' => Some(PatientFilter::Minimal),
        'x' => Some(PatientFilter::Expectant),
        _ => None,
    }
}
