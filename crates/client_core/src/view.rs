#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Form,
    Correlations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTransition {
    Unchanged,
    EnteredCorrelations,
    ReturnedToForm,
}

#[derive(Debug, Default)]
pub struct ViewModeSwitch {
    mode: ViewMode,
}

impl ViewModeSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn select(&mut self, mode: ViewMode) -> ViewTransition {
        if self.mode == mode {
            return ViewTransition::Unchanged;
        }
        self.mode = mode;
        match mode {
            ViewMode::Correlations => ViewTransition::EnteredCorrelations,
            ViewMode::Form => ViewTransition::ReturnedToForm,
        }
    }
}
