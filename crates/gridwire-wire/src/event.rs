//! Closed table of protocol events and their formal parameter lists.
//!
//! Event names are matched exactly (case-sensitive). Each event carries a
//! static parameter schema; parameters are always read in declaration order,
//! so `publish`-shaped events decode the topic before the message.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Formal parameter of a protocol event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Param {
    /// Topic the message is addressed to.
    Topic,
    /// Message payload.
    Message,
    /// Sequence index inside an indexed log.
    Index,
}

impl Param {
    /// Returns the field name used in the inbound parameter object.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Recognised protocol events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum EventId {
    /// Publish a message on a topic.
    #[strum(serialize = "publish")]
    Publish,
    /// Terminate the subscription registered under the same tid.
    #[strum(serialize = "onEndOfSubscription")]
    OnEndOfSubscription,
    /// Register a live subscriber that receives pushes tagged with the tid.
    #[strum(serialize = "registerTopicSubscriber")]
    RegisterTopicSubscriber,
    /// Register a subscriber that first receives the stored log contents.
    #[strum(serialize = "replay")]
    Replay,
    /// Look up the record stored at an index.
    #[strum(serialize = "getNextAtIndex")]
    GetNextAtIndex,
    /// Look up the latest record stored under a topic.
    #[strum(serialize = "getNextAtTopic")]
    GetNextAtTopic,
    /// Look up the latest record of the log.
    #[strum(serialize = "next")]
    Next,
    /// Publish a message and reply with its assigned index.
    #[strum(serialize = "publishAndIndex")]
    PublishAndIndex,
}

const TOPIC_AND_MESSAGE: &[Param] = &[Param::Topic, Param::Message];
const INDEX_ONLY: &[Param] = &[Param::Index];
const TOPIC_ONLY: &[Param] = &[Param::Topic];
const NO_PARAMS: &[Param] = &[];

impl EventId {
    /// Matches an event name against the closed table.
    ///
    /// Returns `None` for names outside the recognised set.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    /// Returns the canonical wire name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Formal parameters in declaration order.
    ///
    /// `registerTopicSubscriber` declares the channel's payload shape even
    /// though the call itself carries an empty body.
    #[must_use]
    pub const fn params(self) -> &'static [Param] {
        match self {
            Self::Publish | Self::RegisterTopicSubscriber | Self::PublishAndIndex => {
                TOPIC_AND_MESSAGE
            }
            Self::GetNextAtIndex => INDEX_ONLY,
            Self::GetNextAtTopic => TOPIC_ONLY,
            Self::OnEndOfSubscription | Self::Replay | Self::Next => NO_PARAMS,
        }
    }

    /// Returns `true` for events that only an indexed log can serve.
    #[must_use]
    pub const fn requires_indexed(self) -> bool {
        matches!(
            self,
            Self::Replay
                | Self::GetNextAtIndex
                | Self::GetNextAtTopic
                | Self::Next
                | Self::PublishAndIndex
        )
    }

    /// Returns `true` for events answered with a synchronous reply unit.
    #[must_use]
    pub const fn replies_synchronously(self) -> bool {
        matches!(
            self,
            Self::GetNextAtIndex | Self::GetNextAtTopic | Self::Next | Self::PublishAndIndex
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[rstest]
    #[case("publish", EventId::Publish)]
    #[case("onEndOfSubscription", EventId::OnEndOfSubscription)]
    #[case("registerTopicSubscriber", EventId::RegisterTopicSubscriber)]
    #[case("replay", EventId::Replay)]
    #[case("getNextAtIndex", EventId::GetNextAtIndex)]
    #[case("getNextAtTopic", EventId::GetNextAtTopic)]
    #[case("next", EventId::Next)]
    #[case("publishAndIndex", EventId::PublishAndIndex)]
    fn parses_recognised_names(#[case] name: &str, #[case] expected: EventId) {
        assert_eq!(EventId::parse(name), Some(expected));
        assert_eq!(expected.name(), name);
    }

    #[rstest]
    #[case("")]
    #[case("Publish")]
    #[case("getnextatindex")]
    #[case("subscribe")]
    fn rejects_unrecognised_names(#[case] name: &str) {
        assert_eq!(EventId::parse(name), None);
    }

    #[test]
    fn publish_shaped_events_declare_topic_before_message() {
        for event in [
            EventId::Publish,
            EventId::RegisterTopicSubscriber,
            EventId::PublishAndIndex,
        ] {
            assert_eq!(event.params(), &[Param::Topic, Param::Message]);
        }
    }

    #[test]
    fn synchronous_replies_are_indexed_only() {
        for event in EventId::iter().filter(|event| event.replies_synchronously()) {
            assert!(event.requires_indexed(), "{event} should be indexed only");
        }
    }

    #[test]
    fn plain_channel_events_do_not_require_an_index() {
        assert!(!EventId::Publish.requires_indexed());
        assert!(!EventId::RegisterTopicSubscriber.requires_indexed());
        assert!(!EventId::OnEndOfSubscription.requires_indexed());
    }
}
