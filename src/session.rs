use egui_phosphor::regular::MAGIC_WAND;

use crate::dispatcher::Completion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Busy,
}

pub fn processing_placeholder() -> String {
    format!("{MAGIC_WAND} A processar a sua solicitação...")
}

/// The editable buffer together with the Idle/Busy gate on the buttons.
#[derive(Debug, Default)]
pub struct Session {
    pub buffer: String,
    state: InteractionState,
}

impl Session {
    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn triggers_enabled(&self) -> bool {
        self.state() == InteractionState::Idle
    }

    /// Moves to Busy and returns the trimmed input, or `None` when the activation
    /// must be ignored (busy, service unavailable, or nothing but whitespace).
    pub fn begin(&mut self, service_available: bool) -> Option<String> {
        if self.state == InteractionState::Busy || !service_available {
            return None;
        }
        let input = self.buffer.trim();
        if input.is_empty() {
            return None;
        }
        let input = input.to_string();
        self.state = InteractionState::Busy;
        self.buffer = processing_placeholder();
        Some(input)
    }

    pub fn finish(&mut self, completion: Completion) {
        self.buffer = match completion {
            Completion::Success(text) => text,
            Completion::Failure(msg) => msg,
        };
        self.state = InteractionState::Idle;
    }
}
