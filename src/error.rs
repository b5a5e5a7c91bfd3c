use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("column {column:?} not found in input")]
    MissingColumn { column: String },

    #[error("{}", render_context(context, what))]
    MalformedInput { what: String, context: Vec<String> },

    #[error("trial filter matched no rows")]
    NoTrials,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl SummaryError {
    pub fn malformed(what: impl Into<String>) -> Self {
        SummaryError::MalformedInput {
            what: what.into(),
            context: vec![],
        }
    }

    pub fn missing_column(column: &str) -> Self {
        SummaryError::MissingColumn {
            column: column.to_string(),
        }
    }

    /// Pushes an outer location onto a malformed-input error. Other kinds pass
    /// through untouched.
    pub fn within(mut self, location: impl Into<String>) -> Self {
        if let SummaryError::MalformedInput { context, .. } = &mut self {
            context.push(location.into());
        }
        self
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, SummaryError::MissingColumn { .. })
    }
}

fn render_context(context: &[String], what: &str) -> String {
    let mut rendered = String::new();
    for c in context.iter().rev() {
        rendered.push_str(c);
        rendered.push_str(": ");
    }
    rendered.push_str(what);
    rendered
}

#[cfg(test)]
mod tests {
    use super::SummaryError;

    #[test]
    fn renders_outermost_context_first() {
        let error = SummaryError::malformed("unable to parse \"abc\" as a number")
            .within("column Stim.RT")
            .within("on row 12");
        assert_eq!(
            "on row 12: column Stim.RT: unable to parse \"abc\" as a number",
            format!("{error}")
        );
    }

    #[test]
    fn context_is_ignored_for_missing_columns() {
        let error = SummaryError::missing_column("Stim.ACC").within("on row 3");
        assert!(error.is_configuration());
        assert_eq!(
            "column \"Stim.ACC\" not found in input",
            format!("{error}")
        );
    }
}
