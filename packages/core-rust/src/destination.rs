//! Broker destinations and the per-service destination table.
//!
//! A [`Destination`] is an opaque broker address. Logical services resolve
//! through a [`DestinationTable`] built once at startup; media nodes are
//! addressed individually through a node template.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the node identifier in node templates.
pub const NODE_ID_PLACEHOLDER: &str = "{id}";

/// Default template for per-node destinations.
pub const DEFAULT_NODE_TEMPLATE: &str = "asterisk.{id}.request";

/// Node serving call channels.
pub const NODE_ID_CALL: &str = "call";

/// Node serving conference bridges.
pub const NODE_ID_CONFERENCE: &str = "conference";

/// Exchange that holds delayed messages until their dispatch offset elapses.
pub const DEFAULT_DELAY_EXCHANGE: &str = "bin-manager.delay";

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

/// Broker-level address a request is sent to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Destination(String);

impl Destination {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Destination {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Destination {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// ---------------------------------------------------------------------------
// ServiceName
// ---------------------------------------------------------------------------

/// Logical backend services reachable through the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceName {
    Agent,
    Ai,
    Billing,
    Call,
    Campaign,
    Chat,
    Chatbot,
    Conference,
    Contact,
    Conversation,
    Customer,
    Email,
    Flow,
    Message,
    Number,
    Outdial,
    Pipecat,
    Queue,
    Registrar,
    Route,
    Storage,
    Tag,
    Talk,
    Timeline,
    Transcribe,
    Transfer,
    Tts,
    User,
    Webhook,
}

impl ServiceName {
    pub const ALL: [ServiceName; 29] = [
        Self::Agent,
        Self::Ai,
        Self::Billing,
        Self::Call,
        Self::Campaign,
        Self::Chat,
        Self::Chatbot,
        Self::Conference,
        Self::Contact,
        Self::Conversation,
        Self::Customer,
        Self::Email,
        Self::Flow,
        Self::Message,
        Self::Number,
        Self::Outdial,
        Self::Pipecat,
        Self::Queue,
        Self::Registrar,
        Self::Route,
        Self::Storage,
        Self::Tag,
        Self::Talk,
        Self::Timeline,
        Self::Transcribe,
        Self::Transfer,
        Self::Tts,
        Self::User,
        Self::Webhook,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Ai => "ai",
            Self::Billing => "billing",
            Self::Call => "call",
            Self::Campaign => "campaign",
            Self::Chat => "chat",
            Self::Chatbot => "chatbot",
            Self::Conference => "conference",
            Self::Contact => "contact",
            Self::Conversation => "conversation",
            Self::Customer => "customer",
            Self::Email => "email",
            Self::Flow => "flow",
            Self::Message => "message",
            Self::Number => "number",
            Self::Outdial => "outdial",
            Self::Pipecat => "pipecat",
            Self::Queue => "queue",
            Self::Registrar => "registrar",
            Self::Route => "route",
            Self::Storage => "storage",
            Self::Tag => "tag",
            Self::Talk => "talk",
            Self::Timeline => "timeline",
            Self::Transcribe => "transcribe",
            Self::Transfer => "transfer",
            Self::Tts => "tts",
            Self::User => "user",
            Self::Webhook => "webhook",
        }
    }

    /// Request queue the service's manager consumes by default.
    #[must_use]
    pub fn default_destination(self) -> Destination {
        Destination(format!("bin-manager.{}-manager.request", self.as_str()))
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A service name that is not part of [`ServiceName`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service: {name}")]
pub struct UnknownService {
    pub name: String,
}

impl FromStr for ServiceName {
    type Err = UnknownService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|svc| svc.as_str() == s)
            .ok_or_else(|| UnknownService {
                name: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// DestinationTable
// ---------------------------------------------------------------------------

/// Resolves logical services and node identifiers to broker destinations.
///
/// Built once at startup and shared read-only. Every [`ServiceName`] has an
/// entry, so service resolution is total.
#[derive(Debug, Clone)]
pub struct DestinationTable {
    services: HashMap<ServiceName, Destination>,
    node_template: String,
}

impl DestinationTable {
    /// Table with the default destination for every service.
    #[must_use]
    pub fn new() -> Self {
        Self::with_overrides(&HashMap::new(), DEFAULT_NODE_TEMPLATE)
    }

    /// Table with selected services pointed elsewhere and a custom node template.
    #[must_use]
    pub fn with_overrides(overrides: &HashMap<ServiceName, String>, node_template: &str) -> Self {
        let services = ServiceName::ALL
            .into_iter()
            .map(|svc| {
                let dest = overrides
                    .get(&svc)
                    .map_or_else(|| svc.default_destination(), |d| Destination::new(d.clone()));
                (svc, dest)
            })
            .collect();
        Self {
            services,
            node_template: node_template.to_string(),
        }
    }

    /// Destination for a logical service.
    #[must_use]
    pub fn resolve_service(&self, service: ServiceName) -> Destination {
        self.services
            .get(&service)
            .cloned()
            .unwrap_or_else(|| service.default_destination())
    }

    /// Destination for a service given by name.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownService`] if `name` is not a known service.
    pub fn resolve_service_name(&self, name: &str) -> Result<Destination, UnknownService> {
        Ok(self.resolve_service(name.parse()?))
    }

    /// Destination for a single media node. The identifier is not validated.
    #[must_use]
    pub fn resolve_node(&self, node_id: &str) -> Destination {
        Destination(self.node_template.replace(NODE_ID_PLACEHOLDER, node_id))
    }
}

impl Default for DestinationTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn well_known_nodes_resolve() {
        let table = DestinationTable::new();
        assert_eq!(table.resolve_node(NODE_ID_CALL).as_str(), "asterisk.call.request");
        assert_eq!(
            table.resolve_node(NODE_ID_CONFERENCE).as_str(),
            "asterisk.conference.request"
        );
    }

    #[test]
    fn default_service_destinations() {
        let table = DestinationTable::new();
        assert_eq!(
            table.resolve_service(ServiceName::Call).as_str(),
            "bin-manager.call-manager.request"
        );
        assert_eq!(
            table.resolve_service(ServiceName::Registrar).as_str(),
            "bin-manager.registrar-manager.request"
        );
    }

    #[test]
    fn every_service_has_a_distinct_destination() {
        let table = DestinationTable::new();
        let dests: HashSet<_> = ServiceName::ALL
            .into_iter()
            .map(|svc| table.resolve_service(svc))
            .collect();
        assert_eq!(dests.len(), ServiceName::ALL.len());
    }

    #[test]
    fn override_replaces_only_named_service() {
        let overrides = HashMap::from([(ServiceName::Queue, "staging.queue.request".to_string())]);
        let table = DestinationTable::with_overrides(&overrides, DEFAULT_NODE_TEMPLATE);

        assert_eq!(table.resolve_service(ServiceName::Queue).as_str(), "staging.queue.request");
        assert_eq!(
            table.resolve_service(ServiceName::Flow),
            ServiceName::Flow.default_destination()
        );
    }

    #[test]
    fn service_name_parsing() {
        assert_eq!("tts".parse::<ServiceName>().unwrap(), ServiceName::Tts);
        let err = "fax".parse::<ServiceName>().unwrap_err();
        assert_eq!(err.name, "fax");

        let table = DestinationTable::new();
        assert!(table.resolve_service_name("fax").is_err());
        assert_eq!(
            table.resolve_service_name("webhook").unwrap().as_str(),
            "bin-manager.webhook-manager.request"
        );
    }

    #[test]
    fn node_destination_uses_template() {
        let table = DestinationTable::new();
        assert_eq!(
            table.resolve_node("42:01:0a:a4:00:05").as_str(),
            "asterisk.42:01:0a:a4:00:05.request"
        );

        let custom = DestinationTable::with_overrides(&HashMap::new(), "media.{id}");
        assert_eq!(custom.resolve_node("call").as_str(), "media.call");
    }

    #[test]
    fn service_name_serde_is_lowercase() {
        let json = serde_json::to_string(&ServiceName::Conversation).unwrap();
        assert_eq!(json, "\"conversation\"");
    }

    proptest! {
        #[test]
        fn node_destination_embeds_identifier(id in "[a-z0-9:-]{1,24}") {
            let table = DestinationTable::new();
            let dest = table.resolve_node(&id);
            prop_assert_eq!(dest.as_str(), format!("asterisk.{id}.request"));
        }

        #[test]
        fn as_str_round_trips_through_parse(idx in 0usize..ServiceName::ALL.len()) {
            let svc = ServiceName::ALL[idx];
            prop_assert_eq!(svc.as_str().parse::<ServiceName>().unwrap(), svc);
        }
    }
}
