use egui_phosphor::regular as icons;

/// The text transformations offered by the main window, one per button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Correct,
    Summarize,
}

impl Operation {
    pub const ALL: [Operation; 2] = [Operation::Correct, Operation::Summarize];

    /// Instruction prepended verbatim to the user's text.
    pub fn template(self) -> &'static str {
        match self {
            Operation::Correct => "Corrija este texto, retorne apenas o texto corrigido: ",
            Operation::Summarize => "Resuma este texto de forma clara: ",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Operation::Correct => "Corretor",
            Operation::Summarize => "Resumo",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Operation::Correct => icons::CHECK_CIRCLE,
            Operation::Summarize => icons::ARTICLE,
        }
    }

    pub fn build_prompt(self, text: &str) -> String {
        format!("{}{}", self.template(), text)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Correct => write!(f, "correct"),
            Operation::Summarize => write!(f, "summarize"),
        }
    }
}
