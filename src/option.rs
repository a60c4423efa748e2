use crate::logging::LogContext;

/// Behaviour switches of a [`TableHandler`](crate::handler::TableHandler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOption {
    pub(crate) initial_auto_increment: u64,
    pub(crate) check_unique_on_update: bool,
    pub(crate) fill_auto_increment: bool,
    pub(crate) log_context: LogContext,
}

impl Default for HandlerOption {
    fn default() -> Self {
        HandlerOption {
            initial_auto_increment: 1,
            check_unique_on_update: true,
            fill_auto_increment: true,
            log_context: LogContext::default(),
        }
    }
}

impl HandlerOption {
    /// First value handed out by the auto-increment counter of a new table,
    /// and the value `truncate` restores.
    pub fn initial_auto_increment(self, initial_auto_increment: u64) -> Self {
        HandlerOption {
            initial_auto_increment,
            ..self
        }
    }

    /// Check unique indices whose columns change on update.
    pub fn check_unique_on_update(self, check_unique_on_update: bool) -> Self {
        HandlerOption {
            check_unique_on_update,
            ..self
        }
    }

    /// Assign the next counter value to a NULL or zero auto-increment column
    /// on insert.
    pub fn fill_auto_increment(self, fill_auto_increment: bool) -> Self {
        HandlerOption {
            fill_auto_increment,
            ..self
        }
    }

    /// Key/value pairs appended to every log line of the handler.
    pub fn log_context(self, log_context: LogContext) -> Self {
        HandlerOption {
            log_context,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let option = HandlerOption::default()
            .initial_auto_increment(100)
            .check_unique_on_update(false)
            .log_context(LogContext::new("db=shop"));
        assert_eq!(option.initial_auto_increment, 100);
        assert!(!option.check_unique_on_update);
        assert!(option.fill_auto_increment);
        assert_eq!(option.log_context.common_kv(), Some("db=shop"));
    }
}
