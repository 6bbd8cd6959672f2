//! The controller façade (C10, §6): turns every external hook into a
//! `Trigger` (or a direct registry mutation for the hooks that bypass the
//! action tree entirely) and drives the dispatcher. Every method here is
//! synchronous from the caller's viewpoint, exactly as §6 and §9
//! ("Synchronous from the outside, asynchronous inside") require — the
//! async marshaling onto this task lives one layer up, in
//! [`crate::mailbox`].

use routingctl_config::ControllerConfig;
use routingctl_core::action::container::ClassActionConnect;
use routingctl_core::controller::Controller;
use routingctl_core::error::{RoutingError, RoutingResult};
use routingctl_core::ids::{
    ConverterId, CrossfaderId, DomainId, ElementTag, GatewayId, Handle, MainConnectionId, SinkId,
    SourceId,
};
use routingctl_core::model::{
    Availability, AvailabilityInfo, AvailabilityReason, ConnectionFormat, InterruptState,
    MuteState, MAX_VOLUME, MIN_VOLUME,
};
use routingctl_core::policy::PolicyEngine;
use routingctl_core::primitives::RoutingPrimitives;
use routingctl_core::registry::{Converter, Crossfader, Domain, Gateway, Sink, Source};
use routingctl_core::trigger::Trigger;

/// A freshly registered element starts out available with no recorded
/// reason to doubt it — the same default the original assigns a source or
/// sink on `ENTER_DB` before the daemon reports otherwise.
fn fresh_availability() -> AvailabilityInfo {
    AvailabilityInfo { availability: Availability::Available, reason: AvailabilityReason::NewMedia }
}

pub struct ControllerFacade {
    controller: Controller,
}

impl ControllerFacade {
    pub fn new(primitives: Box<dyn RoutingPrimitives>, policy: Box<dyn PolicyEngine>) -> Self {
        Self { controller: Controller::new(primitives, policy) }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    /// Loads every class from `config` into the registry (classes are
    /// controller-local policy configuration, not daemon-registered
    /// elements, so there is no `hook_system_register_class` — they are
    /// applied once at startup, mirroring how `pmoconfig`'s settings are
    /// loaded before the control point starts serving hooks).
    pub fn apply_config(&mut self, config: &ControllerConfig) -> RoutingResult<()> {
        for class_config in &config.classes {
            let id = self.controller.registry.allocate_class_id();
            let class = class_config
                .clone()
                .into_class(id)
                .map_err(|e| RoutingError::DatabaseError(e.to_string()))?;
            tracing::info!(class = %class.name, %id, "class loaded from configuration");
            self.controller.registry.register_class(class);
        }
        Ok(())
    }

    // -- element registration (§6 hookSystemRegister*/hookSystemDeregister*) -

    pub fn hook_system_register_domain(&mut self, name: impl Into<String>) -> RoutingResult<DomainId> {
        let name = name.into();
        if self.controller.registry.domain_by_name(&name).is_some() {
            return Err(RoutingError::NotPossible(format!("domain {name} already registered")));
        }
        let id = self.controller.registry.allocate_domain_id();
        self.controller.registry.register_domain(Domain {
            id,
            name: name.clone(),
            state: routingctl_core::model::DomainState::Registering,
        });
        self.controller.triggers.enqueue(Trigger::RegisterDomain { name });
        self.controller.pump();
        Ok(id)
    }

    pub fn hook_system_deregister_domain(&mut self, name: &str) -> RoutingResult<()> {
        let id = self
            .controller
            .registry
            .domain_by_name(name)
            .map(|d| d.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("domain {name}")))?;
        self.controller.deregister_domain(id);
        self.controller.triggers.enqueue(Trigger::DeregisterDomain { name: name.to_string() });
        self.controller.pump();
        Ok(())
    }

    /// `hook_system_domain_registration_complete` (§6): the domain finished
    /// announcing its elements; flips it from `Registering` to `Controlled`
    /// (§3 `DomainState`).
    pub fn hook_system_domain_registration_complete(&mut self, domain_name: &str) -> RoutingResult<()> {
        let domain = self
            .controller
            .registry
            .domain_by_name(domain_name)
            .ok_or_else(|| RoutingError::NonExistent(format!("domain {domain_name}")))?;
        let id = domain.id;
        if let Some(domain) = self.controller.registry.domain_mut(id) {
            domain.state = routingctl_core::model::DomainState::Controlled;
        }
        self.controller
            .triggers
            .enqueue(Trigger::DomainRegistrationComplete { domain_name: domain_name.to_string() });
        self.controller.pump();
        Ok(())
    }

    pub fn hook_system_register_source(
        &mut self,
        name: impl Into<String>,
        domain_name: &str,
        class_name: &str,
    ) -> RoutingResult<SourceId> {
        let name = name.into();
        if self.controller.registry.source_by_name(&name).is_some() {
            return Err(RoutingError::NotPossible(format!("source {name} already registered")));
        }
        let domain_id = self
            .controller
            .registry
            .domain_by_name(domain_name)
            .map(|d| d.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("domain {domain_name}")))?;
        let class_id = self
            .controller
            .registry
            .class_by_name(class_name)
            .map(|c| c.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("class {class_name}")))?;
        let id = self.controller.registry.allocate_source_id();
        self.controller.registry.register_source(Source {
            id,
            name: name.clone(),
            domain_id,
            class_id,
            availability: fresh_availability(),
            state: routingctl_core::model::SourceState::Off,
            interrupt_state: InterruptState::Off,
            volume: 0,
            main_volume: 0,
            sound_properties: Default::default(),
            main_sound_properties: Default::default(),
            notification_configs: Vec::new(),
            persist_volume: false,
            observing_routes: Vec::new(),
        });
        self.controller.triggers.enqueue(Trigger::RegisterSource { name });
        self.controller.pump();
        Ok(id)
    }

    pub fn hook_system_deregister_source(&mut self, name: &str) -> RoutingResult<()> {
        let id = self
            .controller
            .registry
            .source_by_name(name)
            .map(|s| s.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("source {name}")))?;
        self.controller.deregister_source(id);
        self.controller.triggers.enqueue(Trigger::DeregisterSource { name: name.to_string() });
        self.controller.pump();
        Ok(())
    }

    pub fn hook_system_register_sink(
        &mut self,
        name: impl Into<String>,
        domain_name: &str,
        class_name: &str,
    ) -> RoutingResult<SinkId> {
        let name = name.into();
        if self.controller.registry.sink_by_name(&name).is_some() {
            return Err(RoutingError::NotPossible(format!("sink {name} already registered")));
        }
        let domain_id = self
            .controller
            .registry
            .domain_by_name(domain_name)
            .map(|d| d.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("domain {domain_name}")))?;
        let class_id = self
            .controller
            .registry
            .class_by_name(class_name)
            .map(|c| c.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("class {class_name}")))?;
        let id = self.controller.registry.allocate_sink_id();
        self.controller.registry.register_sink(Sink {
            id,
            name: name.clone(),
            domain_id,
            class_id,
            availability: fresh_availability(),
            mute_state: MuteState::Unmuted,
            volume: 0,
            main_volume: 0,
            sound_properties: Default::default(),
            main_sound_properties: Default::default(),
            notification_configs: Vec::new(),
            persist_volume: false,
        });
        self.controller.triggers.enqueue(Trigger::RegisterSink { name });
        self.controller.pump();
        Ok(id)
    }

    pub fn hook_system_deregister_sink(&mut self, name: &str) -> RoutingResult<()> {
        let id = self
            .controller
            .registry
            .sink_by_name(name)
            .map(|s| s.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("sink {name}")))?;
        self.controller.deregister_sink(id);
        self.controller.triggers.enqueue(Trigger::DeregisterSink { name: name.to_string() });
        self.controller.pump();
        Ok(())
    }

    pub fn hook_system_register_gateway(
        &mut self,
        name: impl Into<String>,
        source_name: &str,
        sink_name: &str,
    ) -> RoutingResult<GatewayId> {
        let name = name.into();
        let source = self
            .controller
            .registry
            .source_by_name(source_name)
            .ok_or_else(|| RoutingError::NonExistent(format!("source {source_name}")))?;
        let source_id = source.id;
        let source_domain_id = source.domain_id;
        let sink = self
            .controller
            .registry
            .sink_by_name(sink_name)
            .ok_or_else(|| RoutingError::NonExistent(format!("sink {sink_name}")))?;
        let sink_id = sink.id;
        let sink_domain_id = sink.domain_id;
        let id = self.controller.registry.allocate_gateway_id();
        self.controller.registry.register_gateway(Gateway {
            id,
            name: name.clone(),
            source_id,
            sink_id,
            source_domain_id,
            sink_domain_id,
            conversion_matrix: Vec::new(),
        });
        self.controller.triggers.enqueue(Trigger::RegisterGateway { name });
        self.controller.pump();
        Ok(id)
    }

    pub fn hook_system_deregister_gateway(&mut self, name: &str) -> RoutingResult<()> {
        let id = self
            .controller
            .registry
            .gateway_by_name(name)
            .map(|g| g.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("gateway {name}")))?;
        // No route element directly references a gateway id (§4.3: the
        // resolver only consults gateways while walking a topology, it
        // never stores the gateway in the main-connection graph it builds),
        // so removing one never orphans a main connection the way a
        // source/sink/domain deregistration does.
        self.controller.registry.deregister_gateway(id);
        self.controller.triggers.enqueue(Trigger::DeregisterGateway { name: name.to_string() });
        self.controller.pump();
        Ok(())
    }

    pub fn hook_system_register_converter(
        &mut self,
        name: impl Into<String>,
        source_name: &str,
        sink_name: &str,
    ) -> RoutingResult<ConverterId> {
        let name = name.into();
        let source = self
            .controller
            .registry
            .source_by_name(source_name)
            .ok_or_else(|| RoutingError::NonExistent(format!("source {source_name}")))?;
        let source_id = source.id;
        let domain_id = source.domain_id;
        let sink_id = self
            .controller
            .registry
            .sink_by_name(sink_name)
            .map(|s| s.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("sink {sink_name}")))?;
        let id = self.controller.registry.allocate_converter_id();
        self.controller.registry.register_converter(Converter {
            id,
            name: name.clone(),
            source_id,
            sink_id,
            domain_id,
            conversion_matrix: Vec::new(),
        });
        self.controller.triggers.enqueue(Trigger::RegisterConverter { name });
        self.controller.pump();
        Ok(id)
    }

    pub fn hook_system_deregister_converter(&mut self, name: &str) -> RoutingResult<()> {
        let id = self
            .controller
            .registry
            .converter_by_name(name)
            .map(|c| c.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("converter {name}")))?;
        self.controller.registry.deregister_converter(id);
        self.controller.triggers.enqueue(Trigger::DeregisterConverter { name: name.to_string() });
        self.controller.pump();
        Ok(())
    }

    /// Registers a crossfader (SPEC_FULL.md supplement #1): a source
    /// hot-swapped between two sinks. No action drives it (Non-goal: no
    /// audio DSP) — registration exists only to keep the hook surface and
    /// identity model faithful.
    pub fn hook_system_register_crossfader(
        &mut self,
        name: impl Into<String>,
        source_name: &str,
        sink_a_name: &str,
        sink_b_name: &str,
    ) -> RoutingResult<CrossfaderId> {
        let name = name.into();
        let source_id = self
            .controller
            .registry
            .source_by_name(source_name)
            .map(|s| s.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("source {source_name}")))?;
        let sink_a = self
            .controller
            .registry
            .sink_by_name(sink_a_name)
            .map(|s| s.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("sink {sink_a_name}")))?;
        let sink_b = self
            .controller
            .registry
            .sink_by_name(sink_b_name)
            .map(|s| s.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("sink {sink_b_name}")))?;
        let id = self.controller.registry.allocate_crossfader_id();
        self.controller.registry.register_crossfader(Crossfader {
            id,
            name: name.clone(),
            source_id,
            sink_a,
            sink_b,
        });
        self.controller.triggers.enqueue(Trigger::RegisterCrossfader { name });
        self.controller.pump();
        Ok(id)
    }

    pub fn hook_system_deregister_crossfader(&mut self, name: &str) -> RoutingResult<()> {
        let id = self
            .controller
            .registry
            .crossfader_by_name(name)
            .map(|c| c.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("crossfader {name}")))?;
        self.controller.registry.deregister_crossfader(id);
        self.controller.triggers.enqueue(Trigger::DeregisterCrossfader { name: name.to_string() });
        self.controller.pump();
        Ok(())
    }

    // -- user-visible requests (§6) -----------------------------------------

    /// `hook_user_connection_request`. The class is derived from the
    /// source's class membership (§6 table: "class-name (derived)"), never
    /// supplied by the caller.
    pub fn hook_user_connection_request(
        &mut self,
        source_name: &str,
        sink_name: &str,
    ) -> RoutingResult<MainConnectionId> {
        let source = self
            .controller
            .registry
            .source_by_name(source_name)
            .ok_or_else(|| RoutingError::NonExistent(format!("source {source_name}")))?;
        let source_id = source.id;
        let sink_id = self
            .controller
            .registry
            .sink_by_name(sink_name)
            .map(|s| s.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("sink {sink_name}")))?;
        let class_name = self
            .controller
            .registry
            .class(source.class_id)
            .ok_or_else(|| RoutingError::NonExistent("class for source".to_string()))?
            .name
            .clone();

        self.controller.triggers.enqueue(Trigger::UserConnectionRequest {
            source_name: source_name.to_string(),
            sink_name: sink_name.to_string(),
            class_name,
        });
        self.controller.pump();

        for action in self.controller.last_dispatch() {
            let action = action.borrow();
            let Some(connect) = action.as_any().downcast_ref::<ClassActionConnect>() else {
                continue;
            };
            if connect.source_id() != source_id || connect.sink_id() != sink_id {
                continue;
            }
            let Some(id) = connect.resolved() else {
                continue;
            };
            let reused = connect.reused_existing();
            let name = self.controller.registry.main_connection(id).map(|mc| mc.name.clone());
            drop(action);
            if !reused {
                if let Some(name) = name {
                    self.controller.notify_new_main_connection(name);
                }
            }
            return Ok(id);
        }
        Err(RoutingError::NotPossible(format!("no route from {source_name} to {sink_name}")))
    }

    pub fn hook_user_disconnection_request(&mut self, connection_name: &str) -> RoutingResult<()> {
        if self.controller.registry.main_connections().all(|mc| mc.name != connection_name) {
            return Err(RoutingError::NonExistent(format!("main connection {connection_name}")));
        }
        self.controller
            .triggers
            .enqueue(Trigger::UserDisconnectRequest { connection_name: connection_name.to_string() });
        self.controller.pump();
        self.controller.notify_removed_main_connection(connection_name);
        Ok(())
    }

    pub fn hook_user_volume_change(&mut self, sink_name: &str, volume: i16) -> RoutingResult<()> {
        self.sink_id(sink_name)?;
        let volume = volume.clamp(MIN_VOLUME, MAX_VOLUME);
        self.controller
            .triggers
            .enqueue(Trigger::UserSinkVolume { sink_name: sink_name.to_string(), volume });
        self.controller.pump();
        self.controller.notify_volume_changed(sink_name, volume);
        Ok(())
    }

    /// `hook_user_volume_step` (§6): relative change. Clamped to
    /// `[MIN_VOLUME, MAX_VOLUME]` rather than surfaced as an error (§9 Open
    /// Question, resolution recorded in SPEC_FULL.md).
    pub fn hook_user_volume_step(&mut self, sink_name: &str, delta: i16) -> RoutingResult<()> {
        let current = self.sink_id(sink_name).and_then(|id| {
            self.controller
                .registry
                .sink(id)
                .map(|s| s.volume)
                .ok_or_else(|| RoutingError::NonExistent(format!("sink {sink_name}")))
        })?;
        let volume = (current as i32 + delta as i32).clamp(MIN_VOLUME as i32, MAX_VOLUME as i32) as i16;
        self.controller
            .triggers
            .enqueue(Trigger::UserSinkVolume { sink_name: sink_name.to_string(), volume });
        self.controller.pump();
        self.controller.notify_volume_changed(sink_name, volume);
        Ok(())
    }

    pub fn hook_user_set_sink_mute_state(&mut self, sink_name: &str, mute: MuteState) -> RoutingResult<()> {
        self.sink_id(sink_name)?;
        self.controller
            .triggers
            .enqueue(Trigger::UserSinkMute { sink_name: sink_name.to_string(), mute });
        self.controller.pump();
        Ok(())
    }

    pub fn hook_user_set_main_sink_sound_property(
        &mut self,
        sink_name: &str,
        property_kind: impl Into<String>,
        value: i16,
    ) -> RoutingResult<()> {
        self.sink_id(sink_name)?;
        self.controller.triggers.enqueue(Trigger::UserMainSinkSoundProperty {
            sink_name: sink_name.to_string(),
            property: (property_kind.into(), value),
        });
        self.controller.pump();
        Ok(())
    }

    pub fn hook_user_set_main_source_sound_property(
        &mut self,
        source_name: &str,
        property_kind: impl Into<String>,
        value: i16,
    ) -> RoutingResult<()> {
        self.source_id(source_name)?;
        self.controller.triggers.enqueue(Trigger::UserMainSourceSoundProperty {
            source_name: source_name.to_string(),
            property: (property_kind.into(), value),
        });
        self.controller.pump();
        Ok(())
    }

    pub fn hook_user_set_system_property(&mut self, key: impl Into<String>, value: i32) -> RoutingResult<()> {
        let key = key.into();
        self.controller.registry.set_system_property(key.clone(), value);
        self.controller.triggers.enqueue(Trigger::UserSystemProperty { key, value });
        self.controller.pump();
        Ok(())
    }

    // -- system state changes (§6) -------------------------------------------

    pub fn hook_system_source_availability_state_change(
        &mut self,
        source_name: &str,
        availability: AvailabilityInfo,
    ) -> RoutingResult<()> {
        let id = self.source_id(source_name)?;
        if let Some(source) = self.controller.registry.source_mut(id) {
            source.availability = availability;
        }
        self.controller.triggers.enqueue(Trigger::AvailabilityChange {
            element_name: source_name.to_string(),
            availability,
        });
        self.controller.pump();
        Ok(())
    }

    pub fn hook_system_sink_availability_state_change(
        &mut self,
        sink_name: &str,
        availability: AvailabilityInfo,
    ) -> RoutingResult<()> {
        let id = self.sink_id(sink_name)?;
        if let Some(sink) = self.controller.registry.sink_mut(id) {
            sink.availability = availability;
        }
        self.controller
            .triggers
            .enqueue(Trigger::AvailabilityChange { element_name: sink_name.to_string(), availability });
        self.controller.pump();
        Ok(())
    }

    pub fn hook_system_interrupt_state_change(
        &mut self,
        source_name: &str,
        state: InterruptState,
    ) -> RoutingResult<()> {
        let id = self.source_id(source_name)?;
        if let Some(source) = self.controller.registry.source_mut(id) {
            source.interrupt_state = state;
        }
        self.controller
            .triggers
            .enqueue(Trigger::SourceInterruptChange { source_name: source_name.to_string(), state });
        self.controller.pump();
        Ok(())
    }

    // -- republish hooks (SPEC_FULL.md supplement #2): registry mutation
    // only, no trigger, no queued action — the original returns immediately
    // with no dispatcher involvement for these. -----------------------------

    pub fn hook_system_update_sink(
        &mut self,
        sink_name: &str,
        class_name: &str,
        sound_properties: &[(String, i16)],
    ) -> RoutingResult<()> {
        let class_id = self
            .controller
            .registry
            .class_by_name(class_name)
            .map(|c| c.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("class {class_name}")))?;
        let id = self.sink_id(sink_name)?;
        if let Some(sink) = self.controller.registry.sink_mut(id) {
            sink.class_id = class_id;
            for (kind, value) in sound_properties {
                sink.sound_properties.set(kind.clone(), *value);
            }
        }
        Ok(())
    }

    pub fn hook_system_update_source(
        &mut self,
        source_name: &str,
        class_name: &str,
        sound_properties: &[(String, i16)],
    ) -> RoutingResult<()> {
        let class_id = self
            .controller
            .registry
            .class_by_name(class_name)
            .map(|c| c.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("class {class_name}")))?;
        let id = self.source_id(source_name)?;
        if let Some(source) = self.controller.registry.source_mut(id) {
            source.class_id = class_id;
            for (kind, value) in sound_properties {
                source.sound_properties.set(kind.clone(), *value);
            }
        }
        Ok(())
    }

    pub fn hook_system_update_gateway(
        &mut self,
        gateway_name: &str,
        conversion_matrix: Vec<bool>,
    ) -> RoutingResult<()> {
        let id = self
            .controller
            .registry
            .gateway_by_name(gateway_name)
            .map(|g| g.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("gateway {gateway_name}")))?;
        if let Some(gateway) = self.controller.registry.gateway_mut(id) {
            gateway.conversion_matrix = conversion_matrix;
        }
        tracing::debug!(gateway = gateway_name, "gateway conversion matrix updated");
        Ok(())
    }

    pub fn hook_system_update_converter(
        &mut self,
        converter_name: &str,
        conversion_matrix: Vec<bool>,
    ) -> RoutingResult<()> {
        let id = self
            .controller
            .registry
            .converter_by_name(converter_name)
            .map(|c| c.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("converter {converter_name}")))?;
        if let Some(converter) = self.controller.registry.converter_mut(id) {
            converter.conversion_matrix = conversion_matrix;
        }
        tracing::debug!(converter = converter_name, "converter conversion matrix updated");
        Ok(())
    }

    // -- notification data (SPEC_FULL.md supplement #3) ----------------------

    pub fn hook_sink_notification_data_changed(&mut self, sink_name: &str, payload: i16) -> RoutingResult<()> {
        self.sink_id(sink_name)?;
        self.controller
            .triggers
            .enqueue(Trigger::NotificationDataChanged { element_name: sink_name.to_string(), payload });
        self.controller.pump();
        Ok(())
    }

    pub fn hook_source_notification_data_changed(&mut self, source_name: &str, payload: i16) -> RoutingResult<()> {
        self.source_id(source_name)?;
        self.controller.triggers.enqueue(Trigger::NotificationDataChanged {
            element_name: source_name.to_string(),
            payload,
        });
        self.controller.pump();
        Ok(())
    }

    // -- daemon callbacks (§6 `cb_ack_*`) -------------------------------------

    pub fn cb_ack(&mut self, handle: Handle, result: RoutingResult<()>) {
        self.controller.acknowledge(handle, result);
    }

    pub fn cb_timeout(&mut self, handle: Handle) {
        self.controller.timeout(handle);
    }

    /// Aborts every handle tied to `tag`, without deregistering anything —
    /// exposed for a hosting layer that learns an element died out from
    /// under an outstanding handle through some channel other than a
    /// deregister hook.
    pub fn abort_handles_for(&mut self, tag: ElementTag) {
        self.controller.abort_handles_for(tag);
    }

    // -- synchronous query (§6 `get_connection_format_choice`) ---------------

    pub fn get_connection_format_choice(
        &self,
        source_name: &str,
        sink_name: &str,
        class_name: &str,
        possible: &[ConnectionFormat],
    ) -> RoutingResult<Vec<ConnectionFormat>> {
        let source_id =
            self.controller.registry.source_by_name(source_name).map(|s| s.id).ok_or_else(|| {
                RoutingError::NonExistent(format!("source {source_name}"))
            })?;
        let sink_id = self
            .controller
            .registry
            .sink_by_name(sink_name)
            .map(|s| s.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("sink {sink_name}")))?;
        let class_id = self
            .controller
            .registry
            .class_by_name(class_name)
            .map(|c| c.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("class {class_name}")))?;
        Ok(self.controller.connection_format_choice(source_id, sink_id, class_id, possible))
    }

    // -- private lookups ------------------------------------------------------

    fn source_id(&self, name: &str) -> RoutingResult<SourceId> {
        self.controller
            .registry
            .source_by_name(name)
            .map(|s| s.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("source {name}")))
    }

    fn sink_id(&self, name: &str) -> RoutingResult<SinkId> {
        self.controller
            .registry
            .sink_by_name(name)
            .map(|s| s.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("sink {name}")))
    }
}
