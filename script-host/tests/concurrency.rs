use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use script_host::kernel::{ExecutionContext, Executor};
use script_host::policy::ExecPolicy;
use script_host::primitives::{ErrorKind, TrustContext, Value};
use script_host::tools::{SandboxRoot, ToolError, ToolImplementation, ToolRegistry, ToolSpec};

fn counting_registry(runs: Arc<AtomicUsize>) -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry
        .register_tool(
            ToolImplementation::builder(ToolSpec::new("", "x"))
                .function(move |_rt, _args| {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Nil)
                })
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_tool(
            ToolImplementation::builder(ToolSpec::new("test", "flaky"))
                .function(|rt, _args| {
                    if rt.var("explode").and_then(|v| v.as_bool()) == Some(true) {
                        panic!("flaky tool exploded");
                    }
                    Err(ToolError::execution("flaky tool failed"))
                })
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
}

fn context(registry: &ToolRegistry, policy: Arc<ExecPolicy>) -> ExecutionContext {
    ExecutionContext::builder(registry)
        .policy(policy)
        .sandbox_root(SandboxRoot::new("/sandbox"))
        .build()
}

#[test]
fn shared_limit_admits_exactly_the_budget() {
    let runs = Arc::new(AtomicUsize::new(0));
    let registry = counting_registry(Arc::clone(&runs));
    let policy = Arc::new(
        ExecPolicy::builder(TrustContext::Normal)
            .allow("*")
            .limit("tool.x", 5)
            .build(),
    );
    let executor = Executor::new();

    // Sibling contexts on separate threads share one policy and its counters.
    let outcomes: Vec<Result<Value, ErrorKind>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let ctx = context(&registry, Arc::clone(&policy));
                let executor = &executor;
                scope.spawn(move || {
                    executor
                        .invoke(&ctx, "tool.x", Vec::new())
                        .map_err(|err| err.kind())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let allowed = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(allowed, 5);
    assert!(
        outcomes
            .iter()
            .filter_map(|outcome| outcome.as_ref().err())
            .all(|kind| *kind == ErrorKind::Policy)
    );
    assert_eq!(runs.load(Ordering::SeqCst), 5);
}

#[test]
fn panics_on_worker_threads_stay_contained() {
    let registry = counting_registry(Arc::new(AtomicUsize::new(0)));
    let policy = Arc::new(ExecPolicy::builder(TrustContext::Normal).allow("*").build());
    let executor = Executor::new();

    std::thread::scope(|scope| {
        for i in 0..8 {
            let ctx = context(&registry, Arc::clone(&policy));
            ctx.set_var("explode", Value::Bool(i % 2 == 0));
            let executor = &executor;
            scope.spawn(move || {
                let err = executor
                    .invoke(&ctx, "test.flaky", Vec::new())
                    .expect_err("flaky always fails");
                assert_eq!(err.kind(), ErrorKind::Execution);
            });
        }
    });

    let ctx = context(&registry, policy);
    executor
        .invoke(&ctx, "x", Vec::new())
        .expect("executor still usable");
}

#[test]
fn forked_contexts_share_registrations() {
    let registry = ToolRegistry::new();
    let policy = Arc::new(ExecPolicy::builder(TrustContext::Normal).allow("*").build());
    let parent = context(&registry, policy);
    let child = parent.fork();

    child
        .registry()
        .register_tool(
            ToolImplementation::builder(ToolSpec::new("late", "tool"))
                .function(|rt, _args| Ok(Value::from(rt.context_id().to_string())))
                .build()
                .unwrap(),
        )
        .unwrap();

    let executor = Executor::new();
    let from_parent = executor
        .invoke(&parent, "late.tool", Vec::new())
        .expect("visible to parent");
    let from_child = executor
        .invoke(&child, "late.tool", Vec::new())
        .expect("visible to child");
    assert_eq!(from_parent, Value::from(parent.id().to_string()));
    assert_eq!(from_child, Value::from(child.id().to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_hosts_use_the_blocking_bridge() {
    let runs = Arc::new(AtomicUsize::new(0));
    let registry = counting_registry(Arc::clone(&runs));
    let policy = Arc::new(
        ExecPolicy::builder(TrustContext::Normal)
            .allow("*")
            .limit("x", 3)
            .build(),
    );
    let ctx = Arc::new(context(&registry, policy));
    let executor = Executor::new();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let executor = executor.clone();
        let ctx = Arc::clone(&ctx);
        handles.push(tokio::spawn(async move {
            executor.invoke_blocking(ctx, "x", Vec::new()).await
        }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.expect("task").is_ok() {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 3);
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}
