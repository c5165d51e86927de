use crate::nav::flatten::FlatChoice;

pub fn button_label(choice: &FlatChoice, separator: &str) -> String {
    choice.labels.join(separator)
}

/// Identity of a choice by its label path, independent of the display separator.
pub fn choice_key(choice: &FlatChoice) -> String {
    if choice.labels.is_empty() {
        "choice:#root".to_string()
    } else {
        format!("choice:{}", choice.labels.join("/"))
    }
}
