//! Application state and logic

use flip_core::{BindingSnapshot, Config, EngineEvent, FlagValue, Notice, ProviderStatus};

use crate::inventory::{self, Laptop};
use crate::report;

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Inventory search mode (after pressing /)
    Filter,
}

/// Which pane has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePane {
    Toggles,
    Inventory,
    Compliance,
}

impl ActivePane {
    /// Move to the next pane (wrapping)
    pub fn next(self) -> Self {
        match self {
            ActivePane::Toggles => ActivePane::Inventory,
            ActivePane::Inventory => ActivePane::Compliance,
            ActivePane::Compliance => ActivePane::Toggles,
        }
    }

    /// Move to the previous pane (wrapping)
    pub fn prev(self) -> Self {
        match self {
            ActivePane::Toggles => ActivePane::Compliance,
            ActivePane::Inventory => ActivePane::Toggles,
            ActivePane::Compliance => ActivePane::Inventory,
        }
    }
}

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_quit: bool,
    /// Current input mode
    pub input_mode: InputMode,
    /// Which pane has focus
    pub active_pane: ActivePane,
    /// Displayed flag bindings, refreshed from the engine
    pub bindings: Vec<BindingSnapshot>,
    /// Currently selected binding index
    pub binding_index: usize,
    /// Full laptop fleet
    pub fleet: Vec<Laptop>,
    /// Fleet rows matching the current search
    pub visible_laptops: Vec<Laptop>,
    /// Currently selected laptop index
    pub laptop_index: usize,
    /// Inventory search text
    pub filter_text: String,
    /// Regions available for cycling
    pub regions: Vec<String>,
    /// Currently selected region index
    pub region_index: usize,
    /// Provider connection status
    pub provider_status: ProviderStatus,
    /// Whether the engine has reported initial values
    pub ready: bool,
    /// Transient notice from the engine or local validation
    pub notice: Option<Notice>,
    /// When the notice was set (for auto-dismiss)
    pub notice_time: Option<std::time::Instant>,
    /// Whether help overlay is visible
    pub show_help: bool,
    /// Pending 'g' keypress for gg sequence (with timestamp)
    pub pending_g: Option<std::time::Instant>,
    /// Scroll offset for compliance pane
    pub compliance_scroll: u16,
}

impl App {
    /// Create app state seeded from the configured binding defaults
    pub fn new(config: &Config) -> Self {
        let bindings = config
            .bindings
            .iter()
            .map(|binding| BindingSnapshot {
                flag: binding.flag.clone(),
                value: binding.default.clone(),
                pending: false,
            })
            .collect();

        let fleet = inventory::fleet();
        let visible_laptops = fleet.clone();

        let regions = config.ui.regions.clone();
        let region_index = regions
            .iter()
            .position(|region| region == &config.provider.region)
            .unwrap_or(0);

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            active_pane: ActivePane::Toggles,
            bindings,
            binding_index: 0,
            fleet,
            visible_laptops,
            laptop_index: 0,
            filter_text: String::new(),
            regions,
            region_index,
            provider_status: ProviderStatus::Connecting,
            ready: false,
            notice: None,
            notice_time: None,
            show_help: false,
            pending_g: None,
            compliance_scroll: 0,
        }
    }

    /// Fold one engine event into the display state
    pub fn apply_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Ready => {
                self.ready = true;
            }
            EngineEvent::ValueApplied { flag, value, .. } => {
                if let Some(row) = self.bindings.iter_mut().find(|row| row.flag == flag) {
                    row.value = value;
                }
            }
            EngineEvent::Notice(notice) => {
                self.set_notice(notice);
            }
            EngineEvent::StatusChanged(status) => {
                self.provider_status = status;
            }
        }
    }

    /// Replace bindings with an authoritative engine snapshot
    pub fn set_bindings(&mut self, bindings: Vec<BindingSnapshot>) {
        self.bindings = bindings;
        if self.binding_index >= self.bindings.len() {
            self.binding_index = self.bindings.len().saturating_sub(1);
        }
    }

    /// Show a notice (will auto-dismiss after 3 seconds)
    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.notice_time = Some(std::time::Instant::now());
    }

    /// Check and clear an expired notice
    pub fn check_notice_timeout(&mut self) {
        if let Some(time) = self.notice_time {
            if time.elapsed() > std::time::Duration::from_secs(3) {
                self.notice = None;
                self.notice_time = None;
            }
        }
    }

    /// Get the currently selected binding
    pub fn selected_binding(&self) -> Option<&BindingSnapshot> {
        self.bindings.get(self.binding_index)
    }

    /// Move selection up in the current pane
    pub fn move_up(&mut self) {
        match self.active_pane {
            ActivePane::Toggles => {
                if self.binding_index > 0 {
                    self.binding_index -= 1;
                }
            }
            ActivePane::Inventory => {
                if self.laptop_index > 0 {
                    self.laptop_index -= 1;
                }
            }
            ActivePane::Compliance => {
                self.compliance_scroll = self.compliance_scroll.saturating_sub(1);
            }
        }
    }

    /// Move selection down in the current pane
    pub fn move_down(&mut self) {
        match self.active_pane {
            ActivePane::Toggles => {
                if self.binding_index < self.bindings.len().saturating_sub(1) {
                    self.binding_index += 1;
                }
            }
            ActivePane::Inventory => {
                if self.laptop_index < self.visible_laptops.len().saturating_sub(1) {
                    self.laptop_index += 1;
                }
            }
            ActivePane::Compliance => {
                self.compliance_scroll = self.compliance_scroll.saturating_add(1);
            }
        }
    }

    /// Move selection to first item in the current pane (vim 'gg')
    pub fn move_to_first(&mut self) {
        match self.active_pane {
            ActivePane::Toggles => self.binding_index = 0,
            ActivePane::Inventory => self.laptop_index = 0,
            ActivePane::Compliance => self.compliance_scroll = 0,
        }
    }

    /// Move selection to last item in the current pane (vim 'G')
    pub fn move_to_last(&mut self) {
        match self.active_pane {
            ActivePane::Toggles => {
                self.binding_index = self.bindings.len().saturating_sub(1);
            }
            ActivePane::Inventory => {
                self.laptop_index = self.visible_laptops.len().saturating_sub(1);
            }
            ActivePane::Compliance => {}
        }
    }

    /// Move focus to the next pane
    pub fn next_pane(&mut self) {
        self.active_pane = self.active_pane.next();
    }

    /// Move focus to the previous pane
    pub fn prev_pane(&mut self) {
        self.active_pane = self.active_pane.prev();
    }

    /// Handle a 'g' keypress, completing gg within the timeout
    pub fn press_g(&mut self) {
        match self.pending_g.take() {
            Some(time) if time.elapsed() < std::time::Duration::from_millis(500) => {
                self.move_to_first();
            }
            _ => {
                self.pending_g = Some(std::time::Instant::now());
            }
        }
    }

    /// Advance to the next region (wrapping), returning the new one
    pub fn cycle_region(&mut self) -> Option<String> {
        if self.regions.is_empty() {
            return None;
        }
        self.region_index = (self.region_index + 1) % self.regions.len();
        Some(self.regions[self.region_index].clone())
    }

    /// The currently selected region
    pub fn current_region(&self) -> &str {
        self.regions
            .get(self.region_index)
            .map(String::as_str)
            .unwrap_or("default")
    }

    /// Enter inventory search mode
    pub fn enter_filter_mode(&mut self) {
        self.active_pane = ActivePane::Inventory;
        self.input_mode = InputMode::Filter;
        self.filter_text.clear();
        self.apply_filter();
    }

    /// Leave search mode, keeping the current matches
    pub fn exit_filter_mode(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    /// Append a character to the search text
    pub fn push_filter_char(&mut self, c: char) {
        self.filter_text.push(c);
        self.apply_filter();
    }

    /// Delete the last character of the search text
    pub fn pop_filter_char(&mut self) {
        self.filter_text.pop();
        self.apply_filter();
    }

    /// Recompute visible fleet rows from the search text
    fn apply_filter(&mut self) {
        self.visible_laptops = inventory::filter(&self.fleet, &self.filter_text);
        if self.laptop_index >= self.visible_laptops.len() {
            self.laptop_index = 0;
        }
    }

    fn flag_value(&self, flag: &str) -> Option<&FlagValue> {
        self.bindings
            .iter()
            .find(|row| row.flag == flag)
            .map(|row| &row.value)
    }

    /// Whether the inventory lifecycle column is enabled
    pub fn show_lifecycle(&self) -> bool {
        self.flag_value(inventory::LIFECYCLE_FLAG)
            .map(FlagValue::is_truthy)
            .unwrap_or(false)
    }

    /// Whether the compliance report pane has content
    pub fn compliance_visible(&self) -> bool {
        self.flag_value(report::REPORT_FLAG)
            .map(FlagValue::is_truthy)
            .unwrap_or(false)
    }

    /// Which compliance report variant to show
    pub fn compliance_variant(&self) -> &str {
        self.flag_value(report::REPORT_VARIANT_FLAG)
            .and_then(FlagValue::as_str)
            .unwrap_or("SOC 2")
    }
}
