use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("malformed pattern: {message}")]
    MalformedPattern { message: String },

    #[error("argument {argument} == {value}; invalid value!")]
    InvalidArgument {
        argument: &'static str,
        value: String,
    },

    #[error("target sequence not found{}", rule_suffix(.rule))]
    NotFound { rule: Option<String> },
}

fn rule_suffix(rule: &Option<String>) -> String {
    match rule {
        Some(rule) => format!(" for rule '{rule}'"),
        None => String::new(),
    }
}
