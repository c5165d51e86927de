#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Choices,
    Draft,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FocusState {
    pub pane: Pane,
}

impl FocusState {
    pub fn new(pane: Pane) -> Self {
        Self { pane }
    }

    pub fn toggle(&mut self) {
        self.pane = match self.pane {
            Pane::Choices => Pane::Draft,
            Pane::Draft => Pane::Choices,
        };
    }

    pub fn is(&self, pane: Pane) -> bool {
        self.pane == pane
    }
}
