//! Script diagnostics

use super::lexer::TokenSpan;
use serde_json::Value;
use thiserror::Error;

pub type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("Lexer error at {span:?}: {message}")]
    Lex { span: TokenSpan, message: String },

    #[error("Unexpected token at {span:?}: expected {expected}, found {found}")]
    UnexpectedToken {
        span: TokenSpan,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of script: expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("Runtime error at {span:?}: {message}")]
    Runtime { span: TokenSpan, message: String },

    #[error("Uncaught {0}")]
    Thrown(Value),

    #[error("Script exceeded its step limit of {0}")]
    FuelExhausted(u64),

    #[error("Script nested too deeply at {span:?} (limit {limit})")]
    TooDeep { span: TokenSpan, limit: usize },
}

impl ScriptError {
    pub fn runtime(span: TokenSpan, message: impl Into<String>) -> Self {
        Self::Runtime {
            span,
            message: message.into(),
        }
    }

    pub fn span(&self) -> Option<TokenSpan> {
        match self {
            ScriptError::Lex { span, .. }
            | ScriptError::UnexpectedToken { span, .. }
            | ScriptError::Runtime { span, .. }
            | ScriptError::TooDeep { span, .. } => Some(*span),
            ScriptError::UnexpectedEof { .. }
            | ScriptError::Thrown(_)
            | ScriptError::FuelExhausted(_) => None,
        }
    }
}

/// Render a script error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_script_error(source: &str, filename: &str, error: &ScriptError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = error.span().unwrap_or(TokenSpan {
        start: source.len().saturating_sub(1),
        end: source.len(),
    });

    let label = match error {
        ScriptError::UnexpectedToken { expected, .. } | ScriptError::UnexpectedEof { expected } => {
            format!("expected {}", expected)
        }
        ScriptError::Lex { message, .. } | ScriptError::Runtime { message, .. } => message.clone(),
        ScriptError::Thrown(value) => format!("thrown: {}", value),
        ScriptError::FuelExhausted(_) => "script stopped here".to_string(),
        ScriptError::TooDeep { .. } => "nesting limit reached here".to_string(),
    };

    let mut output = Vec::new();
    let written = Report::build(ReportKind::Error, filename, span.start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, span.start..span.end))
                .with_color(Color::Red)
                .with_message(label),
        )
        .finish()
        .write((filename, Source::from(source)), &mut output);

    match written {
        Ok(()) => String::from_utf8(output).unwrap_or_else(|_| error.to_string()),
        Err(_) => error.to_string(),
    }
}

#[cfg(not(feature = "pretty-errors"))]
pub fn format_script_error(_source: &str, _filename: &str, error: &ScriptError) -> String {
    error.to_string()
}
