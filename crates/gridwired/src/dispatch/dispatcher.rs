//! Per-binding protocol dispatcher.
//!
//! A [`TopicDispatcher`] serves every document a connection addresses to one
//! asset. It owns the typed view, the codec adapter chosen for the binding and
//! the table of live subscriptions opened through it, keyed by tid. An entry
//! leaves the table when its subscription ends, whether the client ended it,
//! the connection went away or the view was closed.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, MutexGuard};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use gridwire_views::{IndexedLog, SubscriptionId, TopicSubscriber, ViewError, ViewHandle};
use gridwire_wire::{DecodeError, EventId, InboundDocument, Param, Tid, WireAdapter};

use crate::outbound::OutboundPublisher;

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::response::{write_error, write_reply};
use super::subscriber::{ReplySubscriber, SubscriptionTable, TableEntry};

/// What a successfully dispatched document did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The message was accepted by the view; nothing was written back.
    Published,
    /// A synchronous reply unit was written.
    Replied,
    /// A subscription was opened under the request's tid.
    Subscribed(SubscriptionId),
    /// The subscription under the request's tid was ended.
    Ended,
}

/// Serves the documents addressed to one asset on one connection.
pub trait DocumentHandler: Send + Sync {
    /// Dispatches a document, reporting failures to the client.
    fn handle(&self, document: &InboundDocument);

    /// Ends every subscription opened through this handler.
    fn end_subscriptions(&self);
}

/// Dispatcher bound to a typed view.
pub struct TopicDispatcher<T, M> {
    publisher: Arc<OutboundPublisher>,
    view: ViewHandle<T, M>,
    adapter: WireAdapter<T, M>,
    subscriptions: Arc<SubscriptionTable>,
}

impl<T, M> TopicDispatcher<T, M>
where
    T: Serialize + Send + Sync + 'static,
    M: Serialize + Send + Sync + 'static,
{
    /// Binds `view` to a connection's publisher.
    pub fn new(
        view: ViewHandle<T, M>,
        adapter: WireAdapter<T, M>,
        publisher: Arc<OutboundPublisher>,
    ) -> Self {
        Self {
            publisher,
            view,
            adapter,
            subscriptions: Arc::default(),
        }
    }

    /// Number of subscriptions currently live through this dispatcher.
    pub fn live_subscriptions(&self) -> usize {
        self.subscriptions().map_or(0, |subscriptions| subscriptions.len())
    }

    /// Dispatches one document.
    ///
    /// The event is resolved first, then the view's capability is checked,
    /// and only then are parameters decoded in declaration order. A rejected
    /// document therefore never reaches the view.
    ///
    /// # Errors
    ///
    /// Returns the request-level failure to report against the document's
    /// tid, or [`DispatchError::Publish`] if the reply could not be written.
    pub fn process(&self, document: &InboundDocument) -> Result<DispatchOutcome, DispatchError> {
        let event = EventId::parse(document.event())
            .ok_or_else(|| DispatchError::unrecognised_event(document.event()))?;
        let tid = document.tid();
        debug!(
            target: DISPATCH_TARGET,
            csp = document.csp(),
            %tid,
            %event,
            synchronous = event.replies_synchronously(),
            "dispatching document"
        );

        match event {
            EventId::Publish => {
                let (topic, message) = self.topic_and_message(document, event)?;
                self.view.publish(topic, message)?;
                Ok(DispatchOutcome::Published)
            }
            EventId::RegisterTopicSubscriber => {
                self.subscribe(tid, |subscriber| self.view.register_topic_subscriber(subscriber))
            }
            EventId::OnEndOfSubscription => self.end_subscription(tid),
            EventId::Replay => {
                let log = self.indexed(event)?;
                self.subscribe(tid, |subscriber| log.replay(subscriber))
            }
            EventId::GetNextAtIndex => {
                let log = self.indexed(event)?;
                let excerpt = requested_index(document, event)?
                    .and_then(|index| log.excerpt_at_index(index));
                self.reply(tid, &excerpt)
            }
            EventId::GetNextAtTopic => {
                let log = self.indexed(event)?;
                let topic = self.decode_topic(document, event)?;
                self.reply(tid, &log.excerpt_at_topic(&topic))
            }
            EventId::Next => {
                let log = self.indexed(event)?;
                self.reply(tid, &log.last_excerpt())
            }
            EventId::PublishAndIndex => {
                let log = self.indexed(event)?;
                let (topic, message) = self.topic_and_message(document, event)?;
                let index = log.publish_and_index(topic, message)?;
                self.reply(tid, &index)
            }
        }
    }

    fn indexed(&self, event: EventId) -> Result<&Arc<dyn IndexedLog<T, M>>, DispatchError> {
        self.view
            .as_indexed()
            .ok_or_else(|| DispatchError::unsupported_operation(event, self.view.kind()))
    }

    fn topic_and_message(
        &self,
        document: &InboundDocument,
        event: EventId,
    ) -> Result<(T, M), DispatchError> {
        let &[topic_param, message_param] = event.params() else {
            return Err(DispatchError::internal(format!(
                "{event} does not take a topic and a message"
            )));
        };
        let topic = decode(
            required(document, event, topic_param)?,
            topic_param,
            |raw| self.adapter.decode_topic(raw),
        )?;
        let message = decode(
            required(document, event, message_param)?,
            message_param,
            |raw| self.adapter.decode_message(raw),
        )?;
        Ok((topic, message))
    }

    fn decode_topic(&self, document: &InboundDocument, event: EventId) -> Result<T, DispatchError> {
        decode(required(document, event, Param::Topic)?, Param::Topic, |raw| {
            self.adapter.decode_topic(raw)
        })
    }

    fn subscribe<F>(&self, tid: Tid, register: F) -> Result<DispatchOutcome, DispatchError>
    where
        F: FnOnce(Arc<dyn TopicSubscriber<T, M>>) -> Result<SubscriptionId, ViewError>,
    {
        let mut subscriptions = self.subscriptions()?;
        if subscriptions.contains_key(&tid) {
            return Err(DispatchError::duplicate_subscription(tid));
        }
        let subscriber = Arc::new(ReplySubscriber::tracked(
            tid,
            Arc::clone(&self.publisher),
            Arc::clone(&self.subscriptions),
        ));
        let handle: Arc<dyn TopicSubscriber<T, M>> = subscriber.clone();
        // A view closing right now ends the subscription on another thread;
        // its release waits on the table lock held here, so the entry below
        // is removed rather than left stale.
        let id = register(handle)?;
        subscriptions.insert(tid, TableEntry::new(id, &subscriber));
        debug!(target: DISPATCH_TARGET, %tid, subscription = %id, "subscription opened");
        Ok(DispatchOutcome::Subscribed(id))
    }

    fn end_subscription(&self, tid: Tid) -> Result<DispatchOutcome, DispatchError> {
        let id = self
            .subscriptions()?
            .remove(&tid)
            .ok_or_else(|| DispatchError::no_subscription(tid))?
            .id();
        // The end notice is written by the subscriber, so the table lock must
        // not be held here.
        if self.view.unregister_topic_subscriber(id) {
            Ok(DispatchOutcome::Ended)
        } else {
            Err(DispatchError::no_subscription(tid))
        }
    }

    fn reply<P: Serialize>(&self, tid: Tid, payload: &P) -> Result<DispatchOutcome, DispatchError> {
        write_reply(&self.publisher, tid, payload)?;
        Ok(DispatchOutcome::Replied)
    }

    fn subscriptions(&self) -> Result<MutexGuard<'_, HashMap<Tid, TableEntry>>, DispatchError> {
        self.subscriptions
            .lock()
            .map_err(|_| DispatchError::internal("subscription table lock poisoned"))
    }
}

impl<T, M> DocumentHandler for TopicDispatcher<T, M>
where
    T: Serialize + Send + Sync + 'static,
    M: Serialize + Send + Sync + 'static,
{
    fn handle(&self, document: &InboundDocument) {
        if let Err(error) = self.process(document) {
            write_error(&self.publisher, document.tid(), &error);
        }
    }

    fn end_subscriptions(&self) {
        let drained: Vec<(Tid, SubscriptionId)> = match self.subscriptions() {
            Ok(mut subscriptions) => subscriptions
                .drain()
                .map(|(tid, entry)| (tid, entry.id()))
                .collect(),
            Err(error) => {
                debug!(target: DISPATCH_TARGET, %error, "cannot end subscriptions");
                return;
            }
        };
        for (tid, id) in drained {
            if !self.view.unregister_topic_subscriber(id) {
                debug!(target: DISPATCH_TARGET, %tid, "subscription already ended");
            }
        }
    }
}

impl<T, M> fmt::Debug for TopicDispatcher<T, M> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TopicDispatcher")
            .field("view", &self.view)
            .field("publisher", &self.publisher)
            .finish_non_exhaustive()
    }
}

fn required(
    document: &InboundDocument,
    event: EventId,
    param: Param,
) -> Result<&Value, DispatchError> {
    document
        .param(param)
        .ok_or_else(|| DispatchError::missing_parameter(event, param))
}

fn decode<X, F>(raw: &Value, param: Param, decoder: F) -> Result<X, DispatchError>
where
    F: FnOnce(&Value) -> Result<Option<X>, DecodeError>,
{
    decoder(raw)
        .map_err(|source| DispatchError::decode(param, source))?
        .ok_or_else(|| DispatchError::absent_value(param))
}

/// Reads the index parameter. A negative index names no record.
fn requested_index(
    document: &InboundDocument,
    event: EventId,
) -> Result<Option<u64>, DispatchError> {
    let raw = required(document, event, Param::Index)?;
    if raw.is_null() {
        return Err(DispatchError::absent_value(Param::Index));
    }
    if let Some(index) = raw.as_u64() {
        return Ok(Some(index));
    }
    if raw.is_i64() {
        return Ok(None);
    }
    Err(DispatchError::decode(
        Param::Index,
        DecodeError::new(format!("expected an integer index, found {raw}")),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use gridwire_views::{IndexedTopicLog, TopicChannel, TopicHub, ViewKind};
    use gridwire_wire::OutboundPayload;
    use mockall::mock;
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;
    use crate::tests::support::{SharedSink, StalledSink};

    type Dispatcher = TopicDispatcher<String, Value>;

    mock! {
        Channel {}
        impl TopicChannel<String, Value> for Channel {
            fn publish(&self, topic: String, message: Value);
            fn register_topic_subscriber(
                &self,
                subscriber: Arc<dyn TopicSubscriber<String, Value>>,
            ) -> Result<SubscriptionId, ViewError>;
            fn unregister_topic_subscriber(&self, id: SubscriptionId) -> bool;
            fn close(&self);
        }
    }

    struct Fixture {
        sink: SharedSink,
        log: Arc<IndexedTopicLog<String, Value>>,
        dispatcher: Dispatcher,
    }

    #[fixture]
    fn indexed() -> Fixture {
        let sink = SharedSink::default();
        let log = Arc::new(IndexedTopicLog::<String, Value>::new());
        let view = ViewHandle::Indexed(log.clone() as Arc<dyn IndexedLog<String, Value>>);
        let dispatcher =
            TopicDispatcher::new(view, WireAdapter::json(), Arc::new(OutboundPublisher::new(sink.clone())));
        Fixture {
            sink,
            log,
            dispatcher,
        }
    }

    fn topic_dispatcher(sink: &SharedSink) -> Dispatcher {
        let view = ViewHandle::Topic(
            Arc::new(TopicHub::<String, Value>::new()) as Arc<dyn TopicChannel<String, Value>>
        );
        TopicDispatcher::new(view, WireAdapter::json(), Arc::new(OutboundPublisher::new(sink.clone())))
    }

    fn document(tid: u64, event: &str) -> InboundDocument {
        InboundDocument::new("/prices", Tid::new(tid), event)
    }

    fn publish(tid: u64, event: &str, topic: &str, message: Value) -> InboundDocument {
        document(tid, event)
            .with_param(Param::Topic, topic)
            .with_param(Param::Message, message)
    }

    #[rstest]
    fn publish_writes_nothing_back(indexed: Fixture) {
        let outcome = indexed
            .dispatcher
            .process(&publish(1, "publish", "AAPL", json!(101.5)))
            .expect("publish");
        assert_eq!(outcome, DispatchOutcome::Published);
        assert!(indexed.sink.contents().is_empty());
        assert_eq!(indexed.log.len(), 1);
    }

    #[rstest]
    #[case("publish")]
    #[case("publishAndIndex")]
    fn exhausted_log_reports_a_view_error(#[case] event: &str) {
        let sink = SharedSink::default();
        let log = IndexedTopicLog::<String, Value>::with_start_index(u64::MAX);
        log.publish_and_index("AAPL".to_owned(), json!(0))
            .expect("last index");
        let dispatcher: Dispatcher = TopicDispatcher::new(
            ViewHandle::Indexed(Arc::new(log) as Arc<dyn IndexedLog<String, Value>>),
            WireAdapter::json(),
            Arc::new(OutboundPublisher::new(sink.clone())),
        );

        dispatcher.handle(&publish(6, event, "AAPL", json!(1)));

        let units = sink.units();
        assert!(
            matches!(
                units.as_slice(),
                [(tid, OutboundPayload::Error(body))]
                    if *tid == Tid::new(6) && body.kind == "view"
            ),
            "expected a view error, got {units:?}"
        );
    }

    #[rstest]
    fn publish_and_index_replies_with_consecutive_indices(indexed: Fixture) {
        for tid in [1, 2] {
            indexed
                .dispatcher
                .process(&publish(tid, "publishAndIndex", "AAPL", json!(tid)))
                .expect("publishAndIndex");
        }
        assert_eq!(
            indexed.sink.units(),
            vec![
                (Tid::new(1), OutboundPayload::Reply(json!(0))),
                (Tid::new(2), OutboundPayload::Reply(json!(1))),
            ]
        );
    }

    #[rstest]
    #[case(json!(0), json!({"index": 0, "topic": "AAPL", "message": 101.5}))]
    #[case(json!(5), Value::Null)]
    #[case(json!(-1), Value::Null)]
    fn index_lookup(indexed: Fixture, #[case] index: Value, #[case] expected: Value) {
        indexed
            .dispatcher
            .process(&publish(1, "publish", "AAPL", json!(101.5)))
            .expect("publish");
        indexed
            .dispatcher
            .process(&document(2, "getNextAtIndex").with_param(Param::Index, index))
            .expect("lookup");
        assert_eq!(
            indexed.sink.units(),
            vec![(Tid::new(2), OutboundPayload::Reply(expected))]
        );
    }

    #[rstest]
    fn topic_lookup_and_next_return_the_latest_record(indexed: Fixture) {
        for (tid, topic, price) in [(1, "AAPL", 1), (2, "MSFT", 2), (3, "AAPL", 3)] {
            indexed
                .dispatcher
                .process(&publish(tid, "publish", topic, json!(price)))
                .expect("publish");
        }
        indexed
            .dispatcher
            .process(&document(4, "getNextAtTopic").with_param(Param::Topic, "AAPL"))
            .expect("topic lookup");
        indexed
            .dispatcher
            .process(&document(5, "next"))
            .expect("next");

        assert_eq!(
            indexed.sink.units(),
            vec![
                (
                    Tid::new(4),
                    OutboundPayload::Reply(json!({"index": 2, "topic": "AAPL", "message": 3}))
                ),
                (
                    Tid::new(5),
                    OutboundPayload::Reply(json!({"index": 2, "topic": "AAPL", "message": 3}))
                ),
            ]
        );
    }

    #[rstest]
    fn subscription_receives_pushes_until_ended(indexed: Fixture) {
        let outcome = indexed
            .dispatcher
            .process(&document(7, "registerTopicSubscriber"))
            .expect("register");
        assert!(matches!(outcome, DispatchOutcome::Subscribed(_)));
        indexed
            .dispatcher
            .process(&publish(8, "publish", "AAPL", json!(1)))
            .expect("publish");
        indexed
            .dispatcher
            .process(&document(7, "onEndOfSubscription"))
            .expect("end");
        indexed
            .dispatcher
            .process(&publish(9, "publish", "AAPL", json!(2)))
            .expect("publish");

        assert_eq!(
            indexed.sink.units(),
            vec![
                (
                    Tid::new(7),
                    OutboundPayload::Reply(json!({"topic": "AAPL", "message": 1}))
                ),
                (Tid::new(7), OutboundPayload::EndOfSubscription(String::new())),
            ]
        );
        assert_eq!(indexed.dispatcher.live_subscriptions(), 0);
    }

    #[rstest]
    fn replay_delivers_backlog_in_index_order(indexed: Fixture) {
        for price in 1..=3 {
            indexed
                .log
                .publish_and_index("AAPL".to_owned(), json!(price))
                .expect("seed");
        }
        indexed
            .dispatcher
            .process(&document(3, "replay"))
            .expect("replay");

        let prices: Vec<Value> = indexed
            .sink
            .units()
            .into_iter()
            .map(|(tid, payload)| {
                assert_eq!(tid, Tid::new(3));
                match payload {
                    OutboundPayload::Reply(body) => body["message"].clone(),
                    other => panic!("unexpected payload {other:?}"),
                }
            })
            .collect();
        assert_eq!(prices, vec![json!(1), json!(2), json!(3)]);
    }

    #[rstest]
    fn closing_the_view_clears_the_subscription_table(indexed: Fixture) {
        indexed
            .dispatcher
            .process(&document(7, "registerTopicSubscriber"))
            .expect("register");
        indexed
            .dispatcher
            .process(&document(8, "replay"))
            .expect("replay");
        assert_eq!(indexed.dispatcher.live_subscriptions(), 2);

        indexed.log.close();

        assert_eq!(indexed.dispatcher.live_subscriptions(), 0);
        let mut ended: Vec<u64> = indexed
            .sink
            .units()
            .into_iter()
            .filter(|(_, payload)| matches!(payload, OutboundPayload::EndOfSubscription(_)))
            .map(|(tid, _)| tid.get())
            .collect();
        ended.sort_unstable();
        assert_eq!(ended, vec![7, 8]);

        let error = indexed
            .dispatcher
            .process(&document(7, "onEndOfSubscription"))
            .expect_err("already ended");
        assert!(matches!(error, DispatchError::NoSubscription { .. }));
    }

    #[rstest]
    fn duplicate_tid_is_rejected(indexed: Fixture) {
        indexed
            .dispatcher
            .process(&document(7, "registerTopicSubscriber"))
            .expect("first");
        let error = indexed
            .dispatcher
            .process(&document(7, "replay"))
            .expect_err("duplicate");
        assert!(matches!(error, DispatchError::DuplicateSubscription { tid } if tid == Tid::new(7)));
        assert_eq!(indexed.dispatcher.live_subscriptions(), 1);
    }

    #[rstest]
    fn ending_an_unknown_subscription_fails(indexed: Fixture) {
        let error = indexed
            .dispatcher
            .process(&document(11, "onEndOfSubscription"))
            .expect_err("nothing to end");
        assert!(matches!(error, DispatchError::NoSubscription { .. }));
    }

    #[rstest]
    #[case(
        publish(1, "publish", "AAPL", Value::Null),
        "decode",
        "message decoded to an absent value"
    )]
    #[case(
        document(1, "publish").with_param(Param::Message, 1),
        "decode",
        "publish requires parameter 'topic'"
    )]
    #[case(
        publish(1, "publish", "AAPL", json!(1)).with_param(Param::Topic, 5),
        "decode",
        "failed to decode topic: invalid type: integer `5`, expected a string"
    )]
    #[case(
        document(1, "getNextAtIndex").with_param(Param::Index, "zero"),
        "decode",
        "failed to decode index: expected an integer index, found \"zero\""
    )]
    #[case(document(1, "explode"), "unrecognised_event", "unrecognised event: explode")]
    fn request_failures_are_reported(
        indexed: Fixture,
        #[case] request: InboundDocument,
        #[case] kind: &str,
        #[case] message: &str,
    ) {
        indexed.dispatcher.handle(&request);
        let units = indexed.sink.units();
        let [(tid, OutboundPayload::Error(body))] = units.as_slice() else {
            panic!("expected a single error unit, got {units:?}");
        };
        assert_eq!(*tid, Tid::new(1));
        assert_eq!(body.kind, kind);
        assert_eq!(body.message, message);
        assert!(indexed.log.is_empty());
    }

    #[rstest]
    #[case("replay")]
    #[case("getNextAtIndex")]
    #[case("getNextAtTopic")]
    #[case("next")]
    #[case("publishAndIndex")]
    fn indexed_events_are_rejected_by_a_topic_view(#[case] event: &str) {
        let sink = SharedSink::default();
        let dispatcher = topic_dispatcher(&sink);
        let error = dispatcher
            .process(&document(1, event))
            .expect_err("unsupported");
        assert!(matches!(
            error,
            DispatchError::UnsupportedOperation { kind: ViewKind::Topic, .. }
        ));
    }

    #[rstest]
    fn unsupported_event_never_touches_the_view() {
        // Any call on the mock panics: no expectations are set.
        let channel = MockChannel::new();
        let sink = SharedSink::default();
        let dispatcher: Dispatcher = TopicDispatcher::new(
            ViewHandle::Topic(Arc::new(channel) as Arc<dyn TopicChannel<String, Value>>),
            WireAdapter::json(),
            Arc::new(OutboundPublisher::new(sink.clone())),
        );

        dispatcher.handle(&publish(3, "publishAndIndex", "AAPL", json!(1)));

        let units = sink.units();
        assert!(matches!(
            units.as_slice(),
            [(tid, OutboundPayload::Error(body))]
                if *tid == Tid::new(3) && body.kind == "unsupported_operation"
        ));
    }

    #[rstest]
    fn end_subscriptions_sends_one_end_notice_per_subscription(indexed: Fixture) {
        for tid in [1, 2] {
            indexed
                .dispatcher
                .process(&document(tid, "registerTopicSubscriber"))
                .expect("register");
        }
        indexed.dispatcher.end_subscriptions();
        indexed.dispatcher.end_subscriptions();

        let mut ended: Vec<u64> = indexed
            .sink
            .units()
            .into_iter()
            .filter(|(_, payload)| matches!(payload, OutboundPayload::EndOfSubscription(_)))
            .map(|(tid, _)| tid.get())
            .collect();
        ended.sort_unstable();
        assert_eq!(ended, vec![1, 2]);
    }

    #[rstest]
    fn a_stalled_replay_leaves_other_connections_served(indexed: Fixture) {
        indexed
            .log
            .publish_and_index("AAPL".to_owned(), json!(1))
            .expect("seed");

        let stalled = StalledSink::default();
        let replaying = {
            let log = indexed.log.clone() as Arc<dyn IndexedLog<String, Value>>;
            let view = ViewHandle::Indexed(log);
            let publisher = Arc::new(OutboundPublisher::new(stalled.clone()));
            thread::spawn(move || {
                let dispatcher: Dispatcher =
                    TopicDispatcher::new(view, WireAdapter::json(), publisher);
                dispatcher.process(&document(1, "replay")).expect("replay");
                dispatcher
            })
        };
        assert!(
            stalled.wait_until_parked(Duration::from_secs(2)),
            "backlog push should park on the stalled sink"
        );

        let (done, finished) = mpsc::channel();
        let serving = thread::spawn(move || {
            let dispatcher = indexed.dispatcher;
            dispatcher
                .process(&document(2, "getNextAtIndex").with_param(Param::Index, 0))
                .expect("lookup");
            dispatcher.process(&document(3, "next")).expect("next");
            done.send(()).expect("report");
            dispatcher
                .process(&publish(4, "publishAndIndex", "MSFT", json!(2)))
                .expect("publishAndIndex");
            indexed.sink
        });
        finished
            .recv_timeout(Duration::from_millis(500))
            .expect("lookups must not wait for the stalled connection");

        stalled.release();
        let replaying = replaying.join().expect("replaying connection");
        let sink = serving.join().expect("serving connection");

        let record = json!({"index": 0, "topic": "AAPL", "message": 1});
        assert_eq!(
            sink.units(),
            vec![
                (Tid::new(2), OutboundPayload::Reply(record.clone())),
                (Tid::new(3), OutboundPayload::Reply(record)),
                (Tid::new(4), OutboundPayload::Reply(json!(1))),
            ]
        );
        assert_eq!(
            stalled.units(),
            vec![
                (
                    Tid::new(1),
                    OutboundPayload::Reply(json!({"topic": "AAPL", "message": 1}))
                ),
                (
                    Tid::new(1),
                    OutboundPayload::Reply(json!({"topic": "MSFT", "message": 2}))
                ),
            ]
        );
        assert_eq!(replaying.live_subscriptions(), 1);
    }

    #[rstest]
    fn concurrent_producers_push_whole_units(indexed: Fixture) {
        indexed
            .dispatcher
            .process(&document(7, "registerTopicSubscriber"))
            .expect("register");

        let handles: Vec<_> = (0..4_u64)
            .map(|worker| {
                let log = Arc::clone(&indexed.log);
                thread::spawn(move || {
                    for round in 0..25_u64 {
                        log.publish_and_index(format!("w{worker}"), json!(round))
                            .expect("publish");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("producer");
        }

        let units = indexed.sink.units();
        assert_eq!(units.len(), 100);
        assert!(units.iter().all(|(tid, payload)| {
            *tid == Tid::new(7) && matches!(payload, OutboundPayload::Reply(_))
        }));
    }
}
