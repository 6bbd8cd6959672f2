//! Policy engine interface (C9, §4.7 step 4): the external collaborator
//! that turns one trigger plus the current registry snapshot into an
//! ordered list of action descriptors. Only the contract is specified here
//! (§2 "External (rule-engine); only the contract matters"); a concrete
//! implementation — `routingctl-sim`'s mixing-rule evaluator, or a real
//! rule engine — supplies `process`.

use std::collections::HashMap;

use crate::ids::{ClassId, SinkId, SourceId};
use crate::model::ConnectionFormat;
use crate::registry::Registry;
use crate::trigger::Trigger;

/// Which container or leaf the dispatcher should instantiate for one
/// descriptor (§4.7 step 4, §9 "generic container with a child vector").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    ClassConnect,
    ClassDisconnect,
    MainConnectionConnect,
    MainConnectionDisconnect,
    MainConnectionSuspend,
    VolumeSequence,
    SinkVolume,
    SourceVolume,
    SinkMute,
    SinkSoundProperty,
    SourceSoundProperty,
    SinkNotificationConfig,
    SourceNotificationConfig,
}

/// Closed enum of action parameters (§9 design note: "a parameter map
/// `{key -> value-variant}` where `key` is a closed enum of action
/// parameters").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    ClassName,
    SourceName,
    SinkName,
    MainConnectionName,
    PropertyKind,
    PropertyValue,
    Volume,
    Mute,
    NotificationKind,
    NotificationStatus,
    NotificationParameter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Int(i32),
    Bool(bool),
}

impl ParamValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// One action the policy engine wants built and appended to the root
/// (§4.7 step 4). Element references are by name — the dispatcher resolves
/// names to ids against the registry when it instantiates the concrete
/// action, exactly as the policy engine itself only ever sees names (§3
/// "target element names").
#[derive(Debug, Clone, Default)]
pub struct ActionDescriptor {
    pub kind: Option<ActionKind>,
    pub params: HashMap<ParamKey, ParamValue>,
}

impl ActionDescriptor {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind: Some(kind),
            params: HashMap::new(),
        }
    }

    pub fn with(mut self, key: ParamKey, value: ParamValue) -> Self {
        self.params.insert(key, value);
        self
    }

    pub fn text(&self, key: ParamKey) -> Option<&str> {
        self.params.get(&key).and_then(ParamValue::as_text)
    }

    pub fn int(&self, key: ParamKey) -> Option<i32> {
        self.params.get(&key).and_then(ParamValue::as_int)
    }

    pub fn boolean(&self, key: ParamKey) -> Option<bool> {
        self.params.get(&key).and_then(ParamValue::as_bool)
    }
}

/// The external policy/rule engine contract (C9). `process` is invoked
/// synchronously by the dispatcher (§4.7 step 4) once per dequeued trigger;
/// an empty response means "drop the trigger after state consolidation"
/// (§7 `Unknown`).
pub trait PolicyEngine {
    fn process(&mut self, trigger: &Trigger, registry: &Registry) -> Vec<ActionDescriptor>;

    /// `getConnectionFormatChoice` (§6): ranks the connection formats a
    /// route hop could use. Default is the original's fallback when the
    /// controller has no preference — identity ordering (SPEC_FULL.md
    /// supplement #4).
    fn connection_format_choice(
        &self,
        _source_id: SourceId,
        _sink_id: SinkId,
        _class_id: ClassId,
        possible: &[ConnectionFormat],
    ) -> Vec<ConnectionFormat> {
        possible.to_vec()
    }
}
