//! Event dispatcher - the protocol state machine.
//!
//! Every received event maps to exactly one [`Action`]. Secondary fetch
//! results for indirect events are decoded here too, so the caller never
//! interprets payloads itself.
//!
//! ```text
//! put            → decode set   → ReplaceAll | Report
//! patch          → decode patch → Upsert     | Report
//! delete         → decode path  → Delete     | Report
//! indirect/put   →                FetchAll   → (fetched) ReplaceAll | Report
//! indirect/patch → strip key    → FetchFlag  → (fetched) Upsert     | Report
//! ```

use flagstream_types::{
    key_from_path, DeleteInstruction, EventKind, FlagPatch, FlagSet, StreamError, StreamEvent,
};

use crate::decode::{decode_delete, decode_flag, decode_flag_set, decode_patch};

/// Message reported when the single-flag request for `indirect/patch` fails.
pub const FLAG_REQUEST_FAILED: &str = "Unexpected error requesting feature flag";

/// What the caller must do in response to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replace the whole store contents, then signal readiness.
    ReplaceAll(FlagSet),
    /// Upsert one flag (the store keeps the newer version).
    Upsert(FlagPatch),
    /// Delete one flag (the store ignores stale deletes).
    Delete(DeleteInstruction),
    /// Request the full flag set out-of-band.
    FetchAll,
    /// Request one flag out-of-band.
    FetchFlag {
        /// Flag key with the leading separator stripped.
        key: String,
    },
    /// Report an error through the error channel.
    Report(StreamError),
}

/// Map a received event to an action.
///
/// Events missing a required payload produce an unexpected-payload
/// report; malformed payloads produce a decode report tagged with the
/// event kind. Neither mutates anything.
pub fn on_event(event: &StreamEvent) -> Action {
    let kind = event.kind;
    let payload = match event.payload() {
        Some(payload) => payload,
        None if kind.requires_payload() => {
            return Action::Report(StreamError::unexpected_payload(kind))
        }
        None => "",
    };

    match kind {
        EventKind::Put => match decode_flag_set(payload) {
            Ok(flags) => Action::ReplaceAll(flags),
            Err(e) => Action::Report(StreamError::decode(kind, payload, &e)),
        },
        EventKind::Patch => match decode_patch(payload) {
            Ok(patch) => Action::Upsert(patch),
            Err(e) => Action::Report(StreamError::decode(kind, payload, &e)),
        },
        EventKind::Delete => match decode_delete(payload) {
            Ok(delete) => Action::Delete(delete),
            Err(e) => Action::Report(StreamError::decode(kind, payload, &e)),
        },
        EventKind::IndirectPut => Action::FetchAll,
        EventKind::IndirectPatch => Action::FetchFlag {
            key: key_from_path(payload).to_string(),
        },
    }
}

/// Map the result of the full-set request issued for `indirect/put`.
///
/// Fetch failures are forwarded as-is. Decode failures are tagged
/// `[indirect/put]` and carry the triggering event's data.
pub fn on_all_fetched(
    trigger: &StreamEvent,
    fetched: Result<String, StreamError>,
) -> Result<FlagSet, StreamError> {
    let body = fetched?;
    decode_flag_set(&body)
        .map_err(|e| StreamError::decode(EventKind::IndirectPut, trigger.raw(), &e))
}

/// Map the result of the single-flag request issued for `indirect/patch`.
///
/// Fetch failures are reported under [`FLAG_REQUEST_FAILED`] with the
/// underlying cause and code appended.
pub fn on_flag_fetched(
    trigger: &StreamEvent,
    key: &str,
    fetched: Result<String, StreamError>,
) -> Result<FlagPatch, StreamError> {
    let body = fetched.map_err(|cause| {
        StreamError::fetch(
            EventKind::IndirectPatch,
            format!("{}: {}", FLAG_REQUEST_FAILED, cause.message),
            cause.code,
        )
    })?;
    let definition = decode_flag(&body)
        .map_err(|e| StreamError::decode(EventKind::IndirectPatch, trigger.raw(), &e))?;
    Ok(FlagPatch {
        key: key.to_string(),
        definition,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flagstream_types::{ErrorKind, RawEvent, UNEXPECTED_PAYLOAD};

    fn event(name: &str, data: &str) -> StreamEvent {
        RawEvent::new(name, data).recognize().unwrap()
    }

    fn bare(name: &str) -> StreamEvent {
        RawEvent::bare(name).recognize().unwrap()
    }

    fn expect_report(action: Action) -> StreamError {
        match action {
            Action::Report(err) => err,
            other => panic!("Expected Report, got {:?}", other),
        }
    }

    // ===========================================
    // put
    // ===========================================

    #[test]
    fn put_replaces_all() {
        let action = on_event(&event("put", r#"{"a": {"key": "a", "version": 1}}"#));
        match action {
            Action::ReplaceAll(flags) => {
                assert_eq!(flags.len(), 1);
                assert_eq!(flags["a"].version, 1);
            }
            other => panic!("Expected ReplaceAll, got {:?}", other),
        }
    }

    #[test]
    fn put_with_malformed_json_reports_tagged_decode_error() {
        let err = expect_report(on_event(&event("put", "{broken")));
        assert_eq!(err.kind, ErrorKind::Decode(EventKind::Put));
        assert!(err.message.starts_with("[put] Data {broken\n"));
    }

    // ===========================================
    // patch / delete
    // ===========================================

    #[test]
    fn patch_upserts_key_and_definition() {
        let action = on_event(&event(
            "patch",
            r#"{"path": "/f", "data": {"key": "f", "version": 2}}"#,
        ));
        match action {
            Action::Upsert(patch) => {
                assert_eq!(patch.key, "f");
                assert_eq!(patch.definition.version, 2);
            }
            other => panic!("Expected Upsert, got {:?}", other),
        }
    }

    #[test]
    fn patch_with_malformed_json_reports_tagged_decode_error() {
        let err = expect_report(on_event(&event("patch", "[]")));
        assert_eq!(err.kind, ErrorKind::Decode(EventKind::Patch));
        assert!(err.message.starts_with("[patch] Data []\n"));
    }

    #[test]
    fn delete_with_and_without_separator_are_identical() {
        let a = on_event(&event("delete", r#"{"path": "/foo", "version": 5}"#));
        let b = on_event(&event("delete", r#"{"path": "foo", "version": 5}"#));
        assert_eq!(a, b);
        assert_eq!(
            a,
            Action::Delete(DeleteInstruction {
                key: "foo".into(),
                version: 5
            })
        );
    }

    #[test]
    fn delete_with_malformed_json_reports_tagged_decode_error() {
        let err = expect_report(on_event(&event("delete", r#"{"path": 1}"#)));
        assert_eq!(err.kind, ErrorKind::Decode(EventKind::Delete));
        assert!(err.message.starts_with("[delete] Data "));
    }

    // ===========================================
    // Missing payload
    // ===========================================

    #[test]
    fn missing_payload_is_reported_for_every_kind_that_needs_one() {
        for kind in EventKind::ALL.into_iter().filter(|k| k.requires_payload()) {
            let err = expect_report(on_event(&bare(kind.name())));
            assert_eq!(err.kind, ErrorKind::UnexpectedPayload(kind));
            assert_eq!(err.message, UNEXPECTED_PAYLOAD);

            let err = expect_report(on_event(&event(kind.name(), "")));
            assert_eq!(err.kind, ErrorKind::UnexpectedPayload(kind));
        }
    }

    #[test]
    fn indirect_put_needs_no_payload() {
        assert_eq!(on_event(&bare("indirect/put")), Action::FetchAll);
        assert_eq!(on_event(&event("indirect/put", "ignored")), Action::FetchAll);
    }

    // ===========================================
    // indirect/put
    // ===========================================

    #[test]
    fn fetched_set_replaces_all() {
        let flags = on_all_fetched(
            &bare("indirect/put"),
            Ok(r#"{"x": {"key": "x", "version": 3}}"#.to_string()),
        )
        .unwrap();
        assert_eq!(flags["x"].version, 3);
    }

    #[test]
    fn fetched_set_failure_is_forwarded_verbatim() {
        let cause = StreamError::fetch(EventKind::IndirectPut, "HTTP 500", Some(500));
        let err = on_all_fetched(&bare("indirect/put"), Err(cause.clone())).unwrap_err();
        assert_eq!(err, cause);
    }

    #[test]
    fn fetched_set_decode_failure_carries_trigger_data() {
        let trigger = event("indirect/put", "trigger-data");
        let err = on_all_fetched(&trigger, Ok("<html>".to_string())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode(EventKind::IndirectPut));
        assert!(err.message.starts_with("[indirect/put] Data trigger-data\n"));
    }

    // ===========================================
    // indirect/patch
    // ===========================================

    #[test]
    fn indirect_patch_strips_separator_from_key() {
        assert_eq!(
            on_event(&event("indirect/patch", "/abc")),
            Action::FetchFlag { key: "abc".into() }
        );
        assert_eq!(
            on_event(&event("indirect/patch", "abc")),
            Action::FetchFlag { key: "abc".into() }
        );
    }

    #[test]
    fn fetched_flag_upserts_under_trigger_key() {
        let trigger = event("indirect/patch", "/abc");
        let patch = on_flag_fetched(
            &trigger,
            "abc",
            Ok(r#"{"key": "abc", "version": 8}"#.to_string()),
        )
        .unwrap();
        assert_eq!(patch.key, "abc");
        assert_eq!(patch.definition.version, 8);
    }

    #[test]
    fn fetched_flag_failure_keeps_generic_message_and_cause() {
        let cause = StreamError::fetch(EventKind::IndirectPatch, "HTTP 404", Some(404));
        let err = on_flag_fetched(&event("indirect/patch", "abc"), "abc", Err(cause)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Fetch(EventKind::IndirectPatch));
        assert!(err.message.starts_with(FLAG_REQUEST_FAILED));
        assert!(err.message.ends_with("HTTP 404"));
        assert_eq!(err.code, Some(404));
    }

    #[test]
    fn fetched_flag_decode_failure_carries_trigger_data() {
        let trigger = event("indirect/patch", "/abc");
        let err = on_flag_fetched(&trigger, "abc", Ok("{}".to_string())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode(EventKind::IndirectPatch));
        assert!(err.message.starts_with("[indirect/patch] Data /abc\n"));
    }
}
