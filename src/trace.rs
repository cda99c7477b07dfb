use std::collections::VecDeque;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TraceCategory {
    Event,
    Timer,
    Navigation,
    Validation,
}

#[derive(Debug)]
pub(crate) struct TraceState {
    pub(crate) enabled: bool,
    pub(crate) events: bool,
    pub(crate) timers: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) log_limit: usize,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            events: true,
            timers: true,
            logs: VecDeque::new(),
            log_limit: 10_000,
        }
    }
}

impl TraceState {
    pub(crate) fn line(&mut self, category: TraceCategory, line: String) {
        log::debug!(target: "stepform", "{line}");
        if !self.enabled {
            return;
        }
        let wanted = match category {
            TraceCategory::Event => self.events,
            TraceCategory::Timer => self.timers,
            TraceCategory::Navigation | TraceCategory::Validation => true,
        };
        if !wanted {
            return;
        }
        if self.logs.len() >= self.log_limit {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    pub(crate) fn set_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Config(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.log_limit = max_entries;
        while self.logs.len() > self.log_limit {
            self.logs.pop_front();
        }
        Ok(())
    }

    pub(crate) fn take(&mut self) -> Vec<String> {
        self.logs.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_trace_keeps_nothing() {
        let mut trace = TraceState::default();
        trace.line(TraceCategory::Event, "[event] click".into());
        assert!(trace.take().is_empty());
    }

    #[test]
    fn limit_drops_oldest_lines() -> Result<()> {
        let mut trace = TraceState {
            enabled: true,
            ..TraceState::default()
        };
        for idx in 0..4 {
            trace.line(TraceCategory::Navigation, format!("[nav] {idx}"));
        }
        trace.set_log_limit(2)?;
        assert_eq!(trace.take(), vec!["[nav] 2", "[nav] 3"]);
        assert!(matches!(trace.set_log_limit(0), Err(Error::Config(_))));
        Ok(())
    }

    #[test]
    fn category_switches_filter_lines() {
        let mut trace = TraceState {
            enabled: true,
            timers: false,
            ..TraceState::default()
        };
        trace.line(TraceCategory::Timer, "[timer] run".into());
        trace.line(TraceCategory::Event, "[event] input".into());
        assert_eq!(trace.take(), vec!["[event] input"]);
    }
}
