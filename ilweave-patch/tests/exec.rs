use std::sync::{Arc, Mutex};

use ilweave_il::{Body, MemberRef, Shape, parse_listing};
use ilweave_patch::{
    CallHost, Error, MemoryTargets, OperandLoader, OverrideRegistry, Patcher, Pattern, TargetId,
    Value, run,
};

/// Resolves the handful of game members the tests reference.
struct GameHost;

impl CallHost for GameHost {
    fn call(&self, method: &MemberRef, stack: &mut Vec<Value>) -> Result<(), Error> {
        match (method.owner.as_str(), method.name.as_str()) {
            // Instance getter: pops `this`, pushes the speed.
            ("Player", "get_Speed") => {
                stack.pop().ok_or(Error::StackUnderflow(0))?;
                stack.push(Value::Float(160.0));
                Ok(())
            }
            ("Math", "double") => match stack.pop() {
                Some(Value::Int(v)) => {
                    stack.push(Value::Int(v * 2));
                    Ok(())
                }
                Some(_) => Err(Error::TypeMismatch(0)),
                None => Err(Error::StackUnderflow(0)),
            },
            _ => Err(Error::UnresolvedCall(method.to_string())),
        }
    }
}

fn speed_body() -> Body {
    parse_listing(
        ".args 1\n\
         ldarg 0\n\
         call Player::get_Speed\n\
         ret\n",
    )
    .unwrap()
}

fn installed(patcher: &Patcher, target: &str) -> Body {
    patcher
        .targets()
        .fetch_body(&TargetId::new(target))
        .unwrap()
}

// --- plain evaluation ---

#[test]
fn host_call_produces_value() {
    let registry = OverrideRegistry::new();
    let result = run(&speed_body(), &[Value::Null], &GameHost, &registry).unwrap();
    assert_eq!(result, Value::Float(160.0));
}

#[test]
fn locals_and_arithmetic() {
    let body = parse_listing(
        ".args 0\n\
         ldc.i4 20\n\
         stloc 0\n\
         ldloc 0\n\
         ldc.i4 1\n\
         add\n\
         call Math::double\n\
         ret\n",
    )
    .unwrap();
    let registry = OverrideRegistry::new();
    let result = run(&body, &[], &GameHost, &registry).unwrap();
    assert_eq!(result, Value::Int(42));
}

#[test]
fn arity_mismatch_rejected() {
    let registry = OverrideRegistry::new();
    let err = run(&speed_body(), &[], &GameHost, &registry).unwrap_err();
    assert!(matches!(err, Error::ArityMismatch { expected: 1, got: 0 }));
}

#[test]
fn underflow_detected() {
    let body = parse_listing(".args 0\nadd\nret\n").unwrap();
    let registry = OverrideRegistry::new();
    assert!(matches!(
        run(&body, &[], &GameHost, &registry),
        Err(Error::StackUnderflow(0))
    ));
}

// --- spliced call sites ---

#[test]
fn transform_replaces_top_of_stack() {
    let mut body = speed_body();
    {
        let mut cursor = ilweave_patch::Cursor::new(&mut body);
        cursor
            .goto_next(&Pattern::new().call_to("Player", "get_Speed"))
            .unwrap();
        cursor.insert_call("cap", Shape::Transform, &[]).unwrap();
    }

    let registry = OverrideRegistry::new();
    registry.register_transform("cap", |v, _| match v {
        Value::Float(s) if s > 100.0 => Value::Float(100.0),
        other => other,
    });

    let result = run(&body, &[Value::Null], &GameHost, &registry).unwrap();
    assert_eq!(result, Value::Float(100.0));
}

#[test]
fn transform_receives_loaded_context() {
    let mut body = speed_body();
    {
        let mut cursor = ilweave_patch::Cursor::new(&mut body);
        cursor
            .goto_next(&Pattern::new().call_to("Player", "get_Speed"))
            .unwrap();
        cursor
            .insert_call("ctx", Shape::Transform, &[OperandLoader::This])
            .unwrap();
    }

    let registry = OverrideRegistry::new();
    registry.register_transform("ctx", |v, ctx| {
        // The receiver loaded by the `this` operand loader.
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx[0], Value::Int(7));
        v
    });

    let result = run(&body, &[Value::Int(7)], &GameHost, &registry).unwrap();
    assert_eq!(result, Value::Float(160.0));
}

#[test]
fn observer_sees_context_without_stack_effect() {
    let mut body = speed_body();
    {
        let mut cursor = ilweave_patch::Cursor::new(&mut body);
        cursor
            .goto_next(&Pattern::new().call_to("Player", "get_Speed"))
            .unwrap();
        cursor
            .insert_call("diag", Shape::Observe, &[OperandLoader::This])
            .unwrap();
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = OverrideRegistry::new();
    {
        let seen = Arc::clone(&seen);
        registry.register_observe("diag", move |ctx| {
            seen.lock().unwrap().push(ctx[0]);
        });
    }

    let result = run(&body, &[Value::Int(3)], &GameHost, &registry).unwrap();
    assert_eq!(result, Value::Float(160.0));
    assert_eq!(*seen.lock().unwrap(), vec![Value::Int(3)]);
}

#[test]
fn unresolved_override_degrades_to_identity() {
    let mut body = speed_body();
    {
        let mut cursor = ilweave_patch::Cursor::new(&mut body);
        cursor
            .goto_next(&Pattern::new().call_to("Player", "get_Speed"))
            .unwrap();
        cursor.insert_call("nobody", Shape::Transform, &[]).unwrap();
    }

    let registry = OverrideRegistry::new();
    let result = run(&body, &[Value::Null], &GameHost, &registry).unwrap();
    assert_eq!(result, Value::Float(160.0));
}

// --- end to end: patch, execute, toggle, unload ---

#[test]
fn late_binding_toggles_behavior_without_repatching() {
    let mut targets = MemoryTargets::new();
    targets.define("Player::NormalUpdate", speed_body());
    let mut patcher = Patcher::new(Box::new(targets));

    patcher.hook("Player::NormalUpdate", |cursor| {
        cursor.goto_next(&Pattern::new().call_to("Player", "get_Speed"))?;
        cursor.insert_call("speed_y", Shape::Transform, &[])
    });
    assert!(patcher.load().all_applied());

    let registry = OverrideRegistry::new();
    let patched = installed(&patcher, "Player::NormalUpdate");

    // Slot empty: patched body behaves like the original.
    let r = run(&patched, &[Value::Null], &GameHost, &registry).unwrap();
    assert_eq!(r, Value::Float(160.0));

    // Install a transform; the already-installed body picks it up.
    registry.register_transform("speed_y", |_, _| Value::Float(-1.0));
    let r = run(&patched, &[Value::Null], &GameHost, &registry).unwrap();
    assert_eq!(r, Value::Float(-1.0));

    // Replace it again, still without touching the patcher.
    registry.register_transform("speed_y", |v, _| v);
    let r = run(&patched, &[Value::Null], &GameHost, &registry).unwrap();
    assert_eq!(r, Value::Float(160.0));

    // Restoration brings back a body with no spliced sites at all.
    patcher.unload();
    let restored = installed(&patcher, "Player::NormalUpdate");
    assert_eq!(restored, speed_body());
    registry.register_transform("speed_y", |_, _| Value::Float(-1.0));
    let r = run(&restored, &[Value::Null], &GameHost, &registry).unwrap();
    assert_eq!(r, Value::Float(160.0));
}
