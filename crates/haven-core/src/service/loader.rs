//! Service Loader
//!
//! Decides whether a configured service may run and invokes its injector.
//! A service runs when it is required or when every purpose it depends on is
//! consented to. Each service is injected at most once per session.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::{AdapterRegistry, ScriptHost};
use crate::cookies::CookieManager;
use crate::domain::{ConsentEvent, Injector, Purpose, ServiceDescriptor, ServiceError};
use crate::event_bus::EventBus;
use crate::store::{ConsentStore, Mutation};

/// Result of a single injection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    /// Gating passed and the injector ran
    Injected,
    /// Gating passed; the service has no injector
    NothingToInject,
    /// Already injected earlier in this session
    AlreadyInjected,
    /// A purpose the service depends on is not consented to
    NotConsented,
    /// `inject: true` but no built-in integration has that name
    MissingInjector,
    /// The built-in integration needs an id the service does not provide
    MissingId,
}

impl InjectOutcome {
    /// Whether the attempt counts as a successful load
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Injected | Self::NothingToInject)
    }
}

pub struct ServiceLoader {
    store: Arc<ConsentStore>,
    cookies: CookieManager,
    bus: EventBus,
    adapters: Arc<AdapterRegistry>,
    host: Arc<dyn ScriptHost>,
}

impl ServiceLoader {
    pub fn new(
        store: Arc<ConsentStore>,
        cookies: CookieManager,
        bus: EventBus,
        adapters: Arc<AdapterRegistry>,
        host: Arc<dyn ScriptHost>,
    ) -> Self {
        Self {
            store,
            cookies,
            bus,
            adapters,
            host,
        }
    }

    /// Attempt injection of every auto-injected service.
    ///
    /// Emits: `service-loaded` per loaded service, then `services-loaded`
    pub fn inject_services(&self) -> Vec<(String, InjectOutcome)> {
        let config = self.store.config();
        let outcomes: Vec<(String, InjectOutcome)> = config
            .services
            .iter()
            .filter(|s| config.is_auto_injected(&s.name))
            .map(|s| (s.name.clone(), self.inject_service(s)))
            .collect();

        debug!(
            attempted = outcomes.len(),
            loaded = outcomes.iter().filter(|(_, o)| o.is_loaded()).count(),
            "[ServiceLoader] Injection pass finished"
        );
        self.bus.emit_event(&ConsentEvent::ServicesLoaded);
        outcomes
    }

    /// Inject one service if gating allows it.
    ///
    /// Emits: `service-loaded` when the service loads
    pub fn inject_service(&self, service: &ServiceDescriptor) -> InjectOutcome {
        if self.store.is_injected(&service.name) {
            debug!(service = %service.name, "[ServiceLoader] Already injected");
            return InjectOutcome::AlreadyInjected;
        }

        if !service.required && !self.cookies.has_all_necessary_cookies_enabled(&service.purposes) {
            debug!(service = %service.name, "[ServiceLoader] Consent missing, skipping");
            return InjectOutcome::NotConsented;
        }

        let id = service.id.as_deref();
        let outcome = match &service.inject {
            Injector::None => {
                self.store.commit(Mutation::SetInjected(service.name.clone()));
                InjectOutcome::NothingToInject
            }
            Injector::Default(name) => {
                let Some(adapter) = self.adapters.get(name).filter(|a| a.installable()) else {
                    error!(
                        service = %service.name,
                        "[ServiceLoader] No default injector found for {}. Please specify your own inject implementation.",
                        name
                    );
                    return InjectOutcome::MissingInjector;
                };
                if adapter.requires_id() && id.is_none() {
                    error!(
                        service = %service.name,
                        "[ServiceLoader] Default injector {} needs an id",
                        name
                    );
                    return InjectOutcome::MissingId;
                }
                // Mark first so a re-entrant pass triggered by the injector is a no-op
                self.store.commit(Mutation::SetInjected(service.name.clone()));
                adapter.install(self.host.as_ref(), id);
                InjectOutcome::Injected
            }
            Injector::Custom(inject) => {
                self.store.commit(Mutation::SetInjected(service.name.clone()));
                inject(id);
                InjectOutcome::Injected
            }
        };

        info!(service = %service.name, outcome = ?outcome, "[ServiceLoader] Service loaded");
        self.bus.emit_event(&ConsentEvent::ServiceLoaded {
            name: service.name.clone(),
        });
        outcome
    }

    /// Register a service at runtime and attempt to inject it straight away.
    ///
    /// `options` may carry `id`, `required` and `cookies`; any other keys are
    /// kept as extra options.
    pub fn register_service(
        &self,
        name: &str,
        purposes: Vec<Purpose>,
        inject: Injector,
        mut options: Map<String, Value>,
    ) -> Result<InjectOutcome, ServiceError> {
        let mut service = ServiceDescriptor::new(name)
            .with_purposes(purposes)
            .with_injector(inject);

        if let Some(id) = options.remove("id").and_then(|v| v.as_str().map(String::from)) {
            service.id = Some(id);
        }
        if let Some(required) = options.remove("required").and_then(|v| v.as_bool()) {
            service.required = required;
        }
        if let Some(Value::Array(patterns)) = options.remove("cookies") {
            service.cookies = patterns
                .iter()
                .filter_map(|p| p.as_str().map(String::from))
                .collect();
        }
        service.options = options;

        self.register_descriptor(service)
    }

    /// Typed form of [`ServiceLoader::register_service`]
    pub fn register_descriptor(&self, service: ServiceDescriptor) -> Result<InjectOutcome, ServiceError> {
        let config = self.store.config();
        service.validate(&config.purposes, &config.service_names())?;

        info!(service = %service.name, "[ServiceLoader] Registered service");
        self.store.commit(Mutation::AddService(service.clone()));
        Ok(self.inject_service(&service))
    }
}
