//! Structured `event=<name> key=value ...` lines under one log target.

use std::fmt;

/// Target of every line the adapter logs.
pub(crate) const LOG_TARGET: &str = "rowbridge";

/// Key/value pairs a handler appends to each of its events, e.g. `db=shop`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogContext {
    common_kv: &'static str,
}

impl LogContext {
    /// Context appending `common_kv` after the event name.
    pub const fn new(common_kv: &'static str) -> Self {
        Self { common_kv }
    }

    pub(crate) fn common_kv(&self) -> Option<&'static str> {
        Some(self.common_kv).filter(|kv| !kv.is_empty())
    }
}

/// Leading part of an event line: the event name and the context pairs.
pub(crate) struct EventHead<'a> {
    pub(crate) name: &'a str,
    pub(crate) ctx: Option<&'a LogContext>,
}

impl fmt::Display for EventHead<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event={}", self.name)?;
        match self.ctx.and_then(LogContext::common_kv) {
            Some(kv) => write!(f, " {kv}"),
            None => Ok(()),
        }
    }
}

/// Log `event` at `level`; arguments are only evaluated when the level is on.
macro_rules! bridge_log {
    (@emit $level:expr, $ctx:expr, $event:expr, $fmt:expr $(, $args:expr)*) => {{
        let level: log::Level = $level;
        if log::log_enabled!(target: $crate::logging::LOG_TARGET, level) {
            let head = $crate::logging::EventHead {
                name: $event,
                ctx: $ctx,
            };
            log::log!(
                target: $crate::logging::LOG_TARGET,
                level,
                "{} {}",
                head,
                format_args!($fmt $(, $args)*)
            );
        }
    }};
    ($level:expr, ctx: $ctx:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {
        $crate::logging::bridge_log!(@emit $level, Some(&$ctx), $event, $fmt $(, $args)*)
    };
    ($level:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {
        $crate::logging::bridge_log!(@emit $level, None, $event, $fmt $(, $args)*)
    };
}

pub(crate) use bridge_log;
