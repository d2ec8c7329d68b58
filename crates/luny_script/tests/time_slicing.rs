//! Property tests for time slicing and clock separation.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;

use luny_script::{
    CoroutineOptions, CoroutineRunner, ExecutionContext, FnBlock, ManualClock, ObjectHandle,
    Runnable, StaticScene, TimeSlice, Variables,
};

proptest! {
    #[test]
    fn test_slice_matches_modular_formula(offset in 0u64..50, interval in 1u64..20, tick in 0u64..10_000) {
        let expected = (i128::from(tick) - i128::from(offset)).rem_euclid(i128::from(interval)) == 0;
        prop_assert_eq!(TimeSlice::new(offset, interval).permits(tick), expected);
    }

    #[test]
    fn test_sliced_heartbeat_sequence_runs_on_permitted_ticks(
        offset in 0u64..6,
        interval in 1u64..6,
        ticks in 1usize..40,
    ) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut runner = CoroutineRunner::new();
        runner
            .register(
                CoroutineOptions::counter("sliced", 1_000)
                    .time_sliced(offset, interval)
                    .on_heartbeat(Runnable::single(FnBlock::new(
                        "Record",
                        move |ctx: &mut ExecutionContext<'_>| {
                            sink.borrow_mut().push(ctx.heartbeat());
                            Ok(())
                        },
                    ))),
            )
            .unwrap();

        let mut clock = ManualClock::new();
        let scene = StaticScene::new("main");
        let mut vars = Variables::new();
        for _ in 0..ticks {
            let mut ctx = ExecutionContext::new(ObjectHandle::from_raw(1), &clock, &scene, &mut vars);
            runner.on_heartbeat(&mut ctx).unwrap();
            clock.advance_heartbeat();
        }

        let expected: Vec<u64> = (0..ticks as u64)
            .filter(|t| t % interval == offset % interval)
            .collect();
        prop_assert_eq!(seen.borrow().clone(), expected);
    }

    #[test]
    fn test_wrong_clock_never_advances(calls in 1usize..50, dt in 0.001f64..5.0) {
        let mut runner = CoroutineRunner::new();
        runner.register(CoroutineOptions::counter("count", 3)).unwrap();
        runner.register(CoroutineOptions::timer("time", 1.0)).unwrap();

        let mut clock = ManualClock::new();
        let scene = StaticScene::new("main");
        let mut vars = Variables::new();
        for _ in 0..calls {
            clock.advance_frame(dt);
            let mut ctx = ExecutionContext::new(ObjectHandle::from_raw(1), &clock, &scene, &mut vars);
            runner.on_frame_update(&mut ctx).unwrap();
        }
        prop_assert_eq!(runner.get("count").unwrap().heartbeats(), 0);
        prop_assert_eq!(runner.get("count").unwrap().elapsed_count(), 0);

        let timer_before = runner.get("time").unwrap().timer_seconds();
        let timer_elapses = runner.get("time").unwrap().elapsed_count();
        for _ in 0..calls {
            clock.advance_heartbeat();
            let mut ctx = ExecutionContext::new(ObjectHandle::from_raw(1), &clock, &scene, &mut vars);
            runner.on_heartbeat(&mut ctx).unwrap();
        }
        prop_assert_eq!(runner.get("time").unwrap().timer_seconds(), timer_before);
        prop_assert_eq!(runner.get("time").unwrap().elapsed_count(), timer_elapses);
    }
}
