//! End-to-end scheduling scenarios driven through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use luny_script::{
    CoroutineOptions, CoroutineRunner, ExecutionContext, FnBlock, LifecycleEvent, ManualClock,
    ObjectHandle, Runnable, ScriptConfig, ScriptError, ScriptInstance, StaticScene, slot,
};

fn heartbeat(
    runner: &mut CoroutineRunner,
    clock: &mut ManualClock,
    scene: &StaticScene,
    vars: &mut luny_script::Variables,
) -> Result<(), ScriptError> {
    clock.advance_heartbeat();
    let mut ctx = ExecutionContext::new(ObjectHandle::from_raw(1), clock, scene, vars);
    runner.on_heartbeat(&mut ctx)
}

#[test]
fn test_counter_coroutine_elapses_after_fifth_heartbeat() {
    let markers = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&markers);
    let mut runner = CoroutineRunner::new();
    runner
        .register(
            CoroutineOptions::counter("c1", 5).on_elapsed(Runnable::single(FnBlock::new(
                "AppendMarker",
                move |ctx: &mut ExecutionContext<'_>| {
                    sink.borrow_mut().push(ctx.heartbeat());
                    Ok(())
                },
            ))),
        )
        .unwrap();

    let mut clock = ManualClock::new();
    let scene = StaticScene::new("main");
    let mut vars = luny_script::Variables::new();
    for call in 1..=5 {
        heartbeat(&mut runner, &mut clock, &scene, &mut vars).unwrap();
        if call < 5 {
            assert!(markers.borrow().is_empty(), "marker appended early on call {call}");
        }
    }
    assert_eq!(*markers.borrow(), vec![5]);
}

#[test]
fn test_failing_block_stops_sequence() {
    let b_calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&b_calls);
    let sequence = Runnable::new(vec![
        slot(FnBlock::new("BlockA", |_: &mut ExecutionContext<'_>| {
            Err(ScriptError::execution("BlockA", "raised"))
        })),
        slot(FnBlock::new("BlockB", move |_: &mut ExecutionContext<'_>| {
            counter.set(counter.get() + 1);
            Ok(())
        })),
    ])
    .unwrap();

    let clock = ManualClock::new();
    let scene = StaticScene::new("main");
    let mut vars = luny_script::Variables::new();
    let mut ctx = ExecutionContext::new(ObjectHandle::from_raw(1), &clock, &scene, &mut vars);
    let err = sequence.execute(&mut ctx).unwrap_err();
    assert_eq!(err, ScriptError::execution("BlockA", "raised"));
    assert_eq!(b_calls.get(), 0);
}

#[test]
fn test_duplicate_registration_keeps_original_coroutine() {
    let mut runner = CoroutineRunner::new();
    runner.register(CoroutineOptions::counter("c1", 5)).unwrap();
    let mut clock = ManualClock::new();
    let scene = StaticScene::new("main");
    let mut vars = luny_script::Variables::new();
    heartbeat(&mut runner, &mut clock, &scene, &mut vars).unwrap();

    let err = runner
        .register(CoroutineOptions::counter("c1", 1))
        .unwrap_err();
    assert!(err.is_construction_error());
    let original = runner.get("c1").unwrap();
    assert_eq!(original.heartbeats(), 1);
    assert_eq!(
        original.driver(),
        luny_script::CoroutineDriver::Counter { heartbeats: 5 }
    );
}

#[test]
fn test_script_instance_drives_both_clocks() {
    let mut script = ScriptInstance::new(ObjectHandle::from_raw(2), ScriptConfig::default());
    let bump = |name: &'static str| {
        Runnable::single(FnBlock::new("Bump", move |ctx: &mut ExecutionContext<'_>| {
            ctx.variables.increment(name, 1.0)?;
            Ok(())
        }))
    };
    script
        .coroutines_mut()
        .register(CoroutineOptions::counter("steps", 2).on_elapsed(bump("steps")))
        .unwrap();
    script
        .coroutines_mut()
        .register(CoroutineOptions::timer("seconds", 1.0).on_elapsed(bump("seconds")))
        .unwrap();
    script.on(LifecycleEvent::Destroyed, bump("destroyed"));

    let mut clock = ManualClock::new();
    let scene = StaticScene::new("main");
    script.created(&clock, &scene).unwrap();
    script.enable(&clock, &scene).unwrap();

    // Two heartbeats per frame of 0.25 s, for eight frames.
    for _ in 0..8 {
        clock.advance_frame(0.25);
        script.frame_update(&clock, &scene).unwrap();
        for _ in 0..2 {
            clock.advance_heartbeat();
            script.heartbeat(&clock, &scene).unwrap();
        }
    }
    assert_eq!(script.variables().get_number("steps"), Ok(8.0));
    assert_eq!(script.variables().get_number("seconds"), Ok(2.0));

    script.destroy(&clock, &scene).unwrap();
    assert!(script.coroutines().is_empty());
    assert_eq!(script.variables().get_number("destroyed"), Ok(1.0));
}
