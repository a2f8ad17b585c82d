//! Reply and error units written on behalf of a request.

use serde::Serialize;
use tracing::{debug, warn};

use gridwire_wire::Tid;

use crate::outbound::{OutboundPublisher, PutContext};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;

/// Writes a synchronous reply correlated to `tid`.
///
/// # Errors
///
/// Returns [`DispatchError::Publish`] if the unit could not be written.
pub(crate) fn write_reply<P: Serialize>(
    publisher: &OutboundPublisher,
    tid: Tid,
    payload: &P,
) -> Result<(), DispatchError> {
    publisher.put(PutContext::Reply, |frames| frames.write_reply(tid, payload))?;
    Ok(())
}

/// Reports a failed request to the client.
///
/// Failures of the connection itself are only logged, since there is nowhere
/// left to report them.
pub(crate) fn write_error(publisher: &OutboundPublisher, tid: Tid, error: &DispatchError) {
    if !error.is_reportable() {
        debug!(target: DISPATCH_TARGET, %tid, %error, "dropping unreportable failure");
        return;
    }
    warn!(target: DISPATCH_TARGET, %tid, kind = error.kind(), %error, "request failed");
    let body = error.to_body();
    if let Err(publish_error) =
        publisher.put(PutContext::Error, |frames| frames.write_error(tid, &body))
    {
        debug!(target: DISPATCH_TARGET, %tid, error = %publish_error, "error unit dropped");
    }
}

#[cfg(test)]
mod tests {
    use gridwire_wire::{ErrorBody, OutboundPayload};
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::outbound::PublishError;
    use crate::tests::support::SharedSink;

    #[rstest]
    fn reply_is_correlated_to_the_request() {
        let sink = SharedSink::default();
        let publisher = OutboundPublisher::new(sink.clone());
        write_reply(&publisher, Tid::new(9), &Some(3_u64)).expect("reply");

        assert_eq!(
            sink.units(),
            vec![(Tid::new(9), OutboundPayload::Reply(json!(3)))]
        );
    }

    #[rstest]
    fn error_unit_carries_kind_and_message() {
        let sink = SharedSink::default();
        let publisher = OutboundPublisher::new(sink.clone());
        write_error(&publisher, Tid::new(4), &DispatchError::unknown_asset("/nope"));

        assert_eq!(
            sink.units(),
            vec![(
                Tid::new(4),
                OutboundPayload::Error(ErrorBody::new("unknown_asset", "unknown asset: /nope"))
            )]
        );
    }

    #[rstest]
    fn publish_failures_are_not_echoed() {
        let sink = SharedSink::default();
        let publisher = OutboundPublisher::new(sink.clone());
        write_error(
            &publisher,
            Tid::new(4),
            &DispatchError::Publish(PublishError::Closed),
        );
        assert!(sink.contents().is_empty());
    }
}
