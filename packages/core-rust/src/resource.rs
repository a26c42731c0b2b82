//! Resource tags: observability labels naming the logical operation.
//!
//! Tags carry no behavior. They become the `resource` label of the request
//! latency histogram, so they use URI-like templates with placeholders instead
//! of concrete identifiers to keep label cardinality bounded.

use std::borrow::Cow;
use std::fmt;

/// Observability label identifying the logical operation of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceTag(Cow<'static, str>);

impl ResourceTag {
    /// Tag used by raw sends that do not name an operation.
    pub const NONE: ResourceTag = ResourceTag::from_static("");

    #[must_use]
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ResourceTag {
    fn from(tag: String) -> Self {
        Self(Cow::Owned(tag))
    }
}

impl From<&'static str> for ResourceTag {
    fn from(tag: &'static str) -> Self {
        Self::from_static(tag)
    }
}

impl Default for ResourceTag {
    fn default() -> Self {
        Self::NONE
    }
}

/// Tags for the operations issued by the service wrappers.
pub mod tags {
    use super::ResourceTag;

    pub const AST_BRIDGES: ResourceTag = ResourceTag::from_static("ast/bridges");
    pub const AST_BRIDGES_ADD_CHANNEL: ResourceTag = ResourceTag::from_static("ast/bridges/addchannel");
    pub const AST_CHANNELS: ResourceTag = ResourceTag::from_static("ast/channels");
    pub const AST_CHANNELS_ANSWER: ResourceTag = ResourceTag::from_static("ast/channels/answer");
    pub const AST_CHANNELS_HANGUP: ResourceTag = ResourceTag::from_static("ast/channels/hangup");
    pub const AST_CHANNELS_PLAY: ResourceTag = ResourceTag::from_static("ast/channels/play");
    pub const AST_CHANNELS_RECORD: ResourceTag = ResourceTag::from_static("ast/channels/record");
    pub const AST_PLAYBACKS: ResourceTag = ResourceTag::from_static("ast/playbacks");

    pub const AGENT_AGENTS: ResourceTag = ResourceTag::from_static("agent/agents");
    pub const CAMPAIGN_CAMPAIGNS: ResourceTag = ResourceTag::from_static("campaign/campaigns");
    pub const CAMPAIGN_CAMPAIGNCALLS: ResourceTag = ResourceTag::from_static("campaign/campaigncalls");

    pub const CALL_CALLS: ResourceTag = ResourceTag::from_static("call/calls");
    pub const CALL_CALLS_HEALTH: ResourceTag = ResourceTag::from_static("call/calls/health");
    pub const CALL_CALLS_ACTION_NEXT: ResourceTag =
        ResourceTag::from_static("call/calls/<call-id>/action-next");
    pub const CALL_CALLS_ACTION_TIMEOUT: ResourceTag =
        ResourceTag::from_static("call/calls/<call-id>/action-timeout");

    pub const CONFERENCE_CONFERENCES: ResourceTag = ResourceTag::from_static("conference/conferences");
    pub const FLOW_FLOWS: ResourceTag = ResourceTag::from_static("flow/flows");
    pub const FLOW_ACTIVEFLOWS: ResourceTag = ResourceTag::from_static("flow/activeflows");
    pub const NUMBER_NUMBERS: ResourceTag = ResourceTag::from_static("number/numbers");
    pub const QUEUE_QUEUES: ResourceTag = ResourceTag::from_static("queue/queues");
    pub const QUEUE_QUEUECALLS: ResourceTag = ResourceTag::from_static("queue/queuecalls");
    pub const REGISTRAR_EXTENSIONS: ResourceTag = ResourceTag::from_static("registrar/extensions");
    pub const STORAGE_FILES: ResourceTag = ResourceTag::from_static("storage/files");
    pub const TRANSCRIBE_TRANSCRIBES: ResourceTag = ResourceTag::from_static("transcribe/transcribes");
    pub const TTS_SPEECHES: ResourceTag = ResourceTag::from_static("tts/speeches");
    pub const WEBHOOK_WEBHOOKS: ResourceTag = ResourceTag::from_static("webhook/webhooks");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_tag_is_empty() {
        assert_eq!(ResourceTag::NONE.as_str(), "");
        assert_eq!(ResourceTag::default(), ResourceTag::NONE);
    }

    #[test]
    fn owned_and_static_tags_compare_equal() {
        let owned = ResourceTag::from("call/calls".to_string());
        assert_eq!(owned, tags::CALL_CALLS);
        assert_eq!(tags::CALL_CALLS_HEALTH.to_string(), "call/calls/health");
    }
}
