//! Step navigation: moves a session between wizard pages
//!
//! States are `select`, `configure` (templates without steps, or with none
//! open) and the step lines of the template. Navigation only ever lands
//! on *open* steps, as reported by the catalog for the current selection:
//!
//! - next from `select` enters the first open step (or `configure`);
//! - next from the last open step finalizes the configuration;
//! - previous from the first open step returns to `select`.

use configurator_types::{
    ConfigStepLine, ConfigurationSession, ProductTemplate, StepLineId, WizardState,
};
use serde::{Deserialize, Serialize};

/// Direction of a navigation request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Next,
    Previous,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Next => write!(f, "next"),
            Direction::Previous => write!(f, "previous"),
        }
    }
}

/// Outcome of a navigation request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The session moves to another page
    Moved { from: WizardState, to: WizardState },
    /// No page left: the configuration must be finalized
    Finalize,
}

/// Step of the template the state points at, if it names one
pub fn active_step(template: &ProductTemplate, state: &WizardState) -> Option<StepLineId> {
    state
        .step_id()
        .filter(|id| template.step(*id).is_some())
}

/// Stateless navigator over a template's step lines
#[derive(Clone, Copy, Debug, Default)]
pub struct StepNavigator;

impl StepNavigator {
    pub fn new() -> Self {
        Self
    }

    /// State a session enters once a template is assigned.
    ///
    /// A stepped template whose steps are all closed is configured on the
    /// single `configure` page, where every line is editable.
    pub fn initial_state(&self, template: &ProductTemplate, open_steps: &[ConfigStepLine]) -> WizardState {
        if !template.has_steps() {
            return WizardState::Configure;
        }
        self.first_open(template, open_steps)
            .map(WizardState::Step)
            .unwrap_or(WizardState::Configure)
    }

    /// Resolve a navigation request against the open steps
    pub fn navigate(
        &self,
        template: &ProductTemplate,
        session: &ConfigurationSession,
        open_steps: &[ConfigStepLine],
        direction: Direction,
    ) -> Transition {
        let from = session.state;
        match direction {
            Direction::Next => match self.next_state(template, &from, open_steps) {
                Some(to) => Transition::Moved { from, to },
                None => Transition::Finalize,
            },
            Direction::Previous => Transition::Moved {
                from,
                to: self.previous_state(template, &from, open_steps),
            },
        }
    }

    /// Labels of the states the session may be put in, in wizard order.
    ///
    /// `select` is left out while reconfiguring an existing variant.
    pub fn state_selection(
        &self,
        session: &ConfigurationSession,
        open_steps: &[ConfigStepLine],
    ) -> Vec<(WizardState, String)> {
        let mut states = Vec::new();
        if session.product_id.is_none() {
            states.push((WizardState::Select, "Select Template".to_string()));
        }
        if open_steps.is_empty() {
            states.push((WizardState::Configure, "Configure".to_string()));
        } else {
            states.extend(
                open_steps
                    .iter()
                    .map(|step| (WizardState::Step(step.id), step.name.clone())),
            );
        }
        states
    }

    fn next_state(
        &self,
        template: &ProductTemplate,
        from: &WizardState,
        open_steps: &[ConfigStepLine],
    ) -> Option<WizardState> {
        if from.is_select() {
            return Some(self.initial_state(template, open_steps));
        }
        if !template.has_steps() {
            return None;
        }
        let current = self.position(template, active_step(template, from));
        self.ordered_open(template, open_steps)
            .into_iter()
            .find(|(index, _)| current.map_or(true, |c| *index > c))
            .map(|(_, id)| WizardState::Step(id))
    }

    fn previous_state(
        &self,
        template: &ProductTemplate,
        from: &WizardState,
        open_steps: &[ConfigStepLine],
    ) -> WizardState {
        let Some(current) = self.position(template, active_step(template, from)) else {
            return WizardState::Select;
        };
        self.ordered_open(template, open_steps)
            .into_iter()
            .rev()
            .find(|(index, _)| *index < current)
            .map(|(_, id)| WizardState::Step(id))
            .unwrap_or(WizardState::Select)
    }

    fn first_open(&self, template: &ProductTemplate, open_steps: &[ConfigStepLine]) -> Option<StepLineId> {
        self.ordered_open(template, open_steps)
            .first()
            .map(|(_, id)| *id)
    }

    /// Open steps with their index in the template's step order
    fn ordered_open(
        &self,
        template: &ProductTemplate,
        open_steps: &[ConfigStepLine],
    ) -> Vec<(usize, StepLineId)> {
        template
            .sorted_steps()
            .into_iter()
            .enumerate()
            .filter(|(_, step)| open_steps.iter().any(|o| o.id == step.id))
            .map(|(index, step)| (index, step.id))
            .collect()
    }

    fn position(&self, template: &ProductTemplate, step: Option<StepLineId>) -> Option<usize> {
        let step = step?;
        template.sorted_steps().iter().position(|s| s.id == step)
    }
}
