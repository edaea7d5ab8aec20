//! Synchronous invocation tests

use std::cell::RefCell;

use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use refbroker::*;
use serde::Deserialize;

/// Records every call and replies with a canned result.
#[derive(Default)]
struct RecordingTransport {
    calls: RefCell<Vec<(String, String)>>,
    next_result: Option<String>,
}

impl RecordingTransport {
    fn replying(json: &str) -> Self {
        Self {
            next_result: Some(json.to_string()),
            ..Default::default()
        }
    }

    fn single_call(&self) -> (String, String) {
        let calls = self.calls.borrow();
        assert_eq!(calls.len(), 1);
        calls[0].clone()
    }
}

impl Transport for RecordingTransport {
    fn invoke(&self, identifier: &str, args_json: &str) -> std::result::Result<Option<String>, String> {
        self.calls
            .borrow_mut()
            .push((identifier.to_string(), args_json.to_string()));
        Ok(self.next_result.clone())
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct TestDto {
    int_value: i32,
    string_value: String,
}

// ═══════════════════════════════════════════════════════════════════════
// Plain Calls
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_dispatches_sync_call_and_decodes_result() {
    let ctx = InteropContext::new();
    let transport = RecordingTransport::replying(r#"{"intValue":123,"stringValue":"Hello"}"#);

    let result: Option<Plain<TestDto>> = ctx
        .invoke(&transport, "test identifier 1", &("arg1", 123, true))
        .unwrap();

    assert_eq!(
        result.map(|p| p.0),
        Some(TestDto {
            int_value: 123,
            string_value: "Hello".to_string(),
        })
    );
    assert_eq!(
        transport.single_call(),
        (
            "test identifier 1".to_string(),
            r#"["arg1",123,true]"#.to_string()
        )
    );
}

#[test]
fn test_missing_result_is_none() {
    let ctx = InteropContext::new();
    let transport = RecordingTransport::default();
    let result: Option<i64> = ctx.invoke(&transport, "noop", &()).unwrap();
    assert_eq!(result, None);
    assert_eq!(transport.single_call().1, "null");
}

#[test]
fn test_null_result_is_none() {
    let ctx = InteropContext::new();
    let transport = RecordingTransport::replying("null");
    let result: Option<ObjectRef<String>> = ctx.invoke(&transport, "noop", &[1, 2]).unwrap();
    assert!(result.is_none());
}

// ═══════════════════════════════════════════════════════════════════════
// Reference Arguments and Results
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_serializes_references_in_known_format() {
    let ctx = InteropContext::new();
    let transport = RecordingTransport::default();
    let obj1 = ObjectRef::new(1u8);
    let obj2 = ObjectRef::new(2u8);
    let obj3 = ObjectRef::new(3u8);

    let mut named = IndexMap::new();
    named.insert("obj2".to_string(), &obj2);
    named.insert("obj3".to_string(), &obj3);

    let result: Option<ObjectRef<u8>> = ctx
        .invoke(&transport, "test identifier", &(&obj1, &named))
        .unwrap();
    assert!(result.is_none());

    let (identifier, args_json) = transport.single_call();
    assert_eq!(identifier, "test identifier");
    assert_eq!(
        args_json,
        r#"[{"__dotNetObject":1},{"obj2":{"__dotNetObject":2},"obj3":{"__dotNetObject":3}}]"#
    );

    for (raw, wrapper) in [(1, &obj1), (2, &obj2), (3, &obj3)] {
        let found = ctx.registry().find_object(Handle::from_raw(raw)).unwrap();
        assert_eq!(found.downcast_ref::<u8>(), Some(wrapper.value()));
        assert_eq!(wrapper.handle().raw(), raw);
    }
}

#[test]
fn test_sync_result_can_include_references() {
    let ctx = InteropContext::new();
    let transport = RecordingTransport::replying(r#"[{"__dotNetObject":2},{"__dotNetObject":1}]"#);
    let obj1 = ObjectRef::new(String::from("obj1"));
    let obj2 = ObjectRef::new(String::from("obj2"));

    let result: Option<Vec<ObjectRef<String>>> = ctx
        .invoke(&transport, "test identifier", &(&obj1, "some other arg", &obj2))
        .unwrap();

    let values: Vec<String> = result
        .unwrap()
        .iter()
        .map(|r| r.value().clone())
        .collect();
    assert_eq!(values, vec!["obj2".to_string(), "obj1".to_string()]);
}

#[test]
fn test_result_with_released_reference_fails() {
    let ctx = InteropContext::new();
    let transport = RecordingTransport::replying(r#"{"__dotNetObject":1}"#);
    let obj = ObjectRef::new(0u8);
    obj.track_using(&ctx).unwrap();
    ctx.release_from_remote(obj.handle());

    let err = ctx
        .invoke::<ObjectRef<u8>, _, _>(&transport, "stale", &(&obj,))
        .unwrap_err();
    assert!(err.is_not_found());
}

// ═══════════════════════════════════════════════════════════════════════
// Argument Lifetimes
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_inline_reference_retired_after_call() {
    let ctx = InteropContext::new();
    let transport = RecordingTransport::default();

    let _: Option<i64> = ctx
        .invoke(&transport, "f", &(&ObjectRef::new(1u8),))
        .unwrap();

    assert_eq!(transport.single_call().1, r#"[{"__dotNetObject":1}]"#);
    assert!(ctx.resolve(Handle::from_raw(1)).unwrap_err().is_not_found());
    assert!(ctx.registry().is_empty());
}

#[test]
fn test_scoped_reference_lives_until_scope_ends() {
    let ctx = InteropContext::new();
    let transport = RecordingTransport::default();
    {
        let mut scope = ctx.scope();
        let arg = scope.wrap(1u8);
        let _: Option<i64> = ctx.invoke(&transport, "f", &(&arg,)).unwrap();
        drop(arg);

        let found = ctx.resolve(Handle::from_raw(1)).unwrap();
        assert_eq!(found.downcast_ref::<u8>(), Some(&1));
    }
    assert!(ctx.resolve(Handle::from_raw(1)).unwrap_err().is_not_found());
}
