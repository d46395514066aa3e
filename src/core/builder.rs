use std::sync::Arc;

use tracing::Span;

use crate::config::SupervisorConfig;
use crate::core::factory::WorkerFactory;
use crate::core::supervisor::Supervisor;
use crate::listeners::{ListenerSet, StatusListener};

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder<C> {
    settings: SupervisorConfig,
    factory: Box<dyn WorkerFactory<C>>,
    config: C,
    span: Option<Span>,
    listeners: Vec<Arc<dyn StatusListener>>,
}

impl<C> SupervisorBuilder<C>
where
    C: PartialEq + Send + Sync + 'static,
{
    pub(crate) fn new(factory: Box<dyn WorkerFactory<C>>, config: C) -> Self {
        Self {
            settings: SupervisorConfig::default(),
            factory,
            config,
            span: None,
            listeners: Vec::new(),
        }
    }

    /// Sets the runtime settings (name, stop notice grace).
    pub fn with_settings(mut self, settings: SupervisorConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the span every log line of the supervisor and its worker is emitted in.
    ///
    /// Defaults to `info_span!("subsystem", name = settings.name)`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Registers listeners before the supervisor is shared.
    ///
    /// They are not sent an initial snapshot; the first thing they see is the first
    /// status change.
    pub fn with_listeners(mut self, listeners: Vec<Arc<dyn StatusListener>>) -> Self {
        self.listeners = listeners;
        self
    }

    /// Builds the supervisor (disabled, STOPPED).
    pub fn build(self) -> Supervisor<C> {
        let span = self
            .span
            .unwrap_or_else(|| tracing::info_span!("subsystem", name = %self.settings.name));

        let mut set = ListenerSet::new();
        for listener in self.listeners {
            set.add(listener);
        }

        Supervisor::from_parts(self.settings, self.factory, self.config, span, set)
    }
}
