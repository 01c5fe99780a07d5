/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use stress::{
    ClientSpec, Driver, Error, GroupSpec, IterationLimit, OpResult, OpRegistry,
    Phase, Report, SharedState, Status, ToggleOp, Validator,
};

/// Misbehaves on request, at a given (1-based) iteration.
#[derive(Deserialize, Default)]
#[serde(default)]
struct Script {
    verify_fail_at: Option<u64>,
    error_at: Option<u64>,
    panic_at: Option<u64>,
    reject: bool,
}

struct Scripted {
    id: String,
    script: Script,
    iteration: u64,
}

impl ToggleOp for Scripted {
    fn client_id(&self) -> &str {
        &self.id
    }

    fn on(&mut self) -> OpResult<()> {
        self.iteration += 1;
        if self.script.panic_at == Some(self.iteration) {
            panic!("scripted panic");
        }
        match self.script.error_at == Some(self.iteration) {
            true => Err("scripted error".into()),
            false => Ok(()),
        }
    }

    fn on_verify(&mut self) -> OpResult<bool> {
        Ok(self.script.verify_fail_at != Some(self.iteration))
    }

    fn off(&mut self) -> OpResult<()> {
        Ok(())
    }

    fn off_verify(&mut self) -> OpResult<bool> {
        Ok(true)
    }

    fn share(&self, phase: Phase, shared: &mut SharedState) {
        shared.insert(self.id.clone(), json!(phase == Phase::On));
    }
}

fn registry() -> Arc<OpRegistry> {
    let mut registry = OpRegistry::with_builtins();
    registry.register("scripted", |id: &str, arg: &serde_json::Value| {
        let script: Script = match arg {
            serde_json::Value::Null => Script::default(),
            _ => serde_json::from_value(arg.clone())?,
        };
        if script.reject {
            return Err("rejected by script".into());
        }
        Ok(Box::new(Scripted {
            id: id.to_string(),
            script,
            iteration: 0,
        }) as Box<dyn ToggleOp>)
    });
    Arc::new(registry)
}

fn scripted(iterations: u64) -> ClientSpec {
    ClientSpec::new("scripted", IterationLimit::iterations(iterations))
}

fn run(groups: Vec<GroupSpec>) -> Report {
    Driver::configure(registry(), groups, Some(Duration::from_secs(10)))
        .unwrap()
        .run()
        .join()
}

fn status(report: &Report, id: &str) -> (Status, u64) {
    let client = report.client(id).unwrap();
    (client.status, client.iterations)
}

#[test]
fn independent_clients_pass() {
    let report = run(vec![GroupSpec::new(vec![scripted(3).times(2)])]);
    assert_eq!(report.clients.len(), 2);
    assert_eq!(status(&report, "g0c0-0"), (Status::Pass, 3));
    assert_eq!(status(&report, "g0c0-1"), (Status::Pass, 3));
    assert!(report.all_passed());
}

#[test]
fn verify_failure_releases_synced_peer() {
    let report = run(vec![GroupSpec::new(vec![
        scripted(5)
            .with_id("a")
            .with_argument(json!({"verify_fail_at": 2}))
            .synced(),
        scripted(5).with_id("b").synced(),
    ])]);

    assert_eq!(status(&report, "a"), (Status::VerifyFail, 1));
    assert_eq!(status(&report, "b"), (Status::SyncFail, 1));
    /* Released by the failing peer, not by the timeout. */
    assert!(report.client("b").unwrap().elapsed < Duration::from_secs(5));
    assert!(!report.all_passed());
}

#[test]
fn barrier_timeout_is_sync_fail() {
    let mut registry = OpRegistry::new();
    registry.register("delay", stress::ops::Delay::construct);
    let slow = ClientSpec::new("delay", IterationLimit::iterations(1))
        .with_id("slow")
        .with_argument(json!({"on": 1.0}))
        .synced();
    let fast = ClientSpec::new("delay", IterationLimit::iterations(1))
        .with_id("fast")
        .synced();

    let report = Driver::configure(
        Arc::new(registry),
        vec![GroupSpec::new(vec![slow, fast])],
        Some(Duration::from_millis(100)),
    )
    .unwrap()
    .run()
    .join();

    assert_eq!(status(&report, "fast"), (Status::SyncFail, 0));
    assert_eq!(status(&report, "slow"), (Status::SyncFail, 0));
}

#[test]
fn rejected_round_is_sync_fail() {
    let group = GroupSpec::new(vec![scripted(3).synced().times(2)])
        .with_validator(Validator::new(|_| false));
    let report = run(vec![group]);
    assert_eq!(report.count(Status::SyncFail), 2);
    assert!(report.clients.iter().all(|c| c.iterations == 0));
}

#[test]
fn validator_runs_once_per_round_on_full_payload() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let group = GroupSpec::new(vec![scripted(3).synced().times(3)])
        .with_validator(Validator::new(move |shared| {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut values = shared.values();
            shared.len() == 3
                && values.next().map_or(false, |first| values.all(|v| v == first))
        }));

    let report = run(vec![group]);
    assert!(report.all_passed());
    assert_eq!(report.total_iterations(), 9);
    /* Two rendezvous per iteration. */
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[test]
fn unsynced_client_does_not_disturb_group() {
    let report = run(vec![GroupSpec::new(vec![
        scripted(4).with_id("loner").with_argument(json!({"verify_fail_at": 1})),
        scripted(4).synced().times(2),
    ])]);
    assert_eq!(status(&report, "loner"), (Status::VerifyFail, 0));
    assert_eq!(status(&report, "g0c1-0"), (Status::Pass, 4));
    assert_eq!(status(&report, "g0c1-1"), (Status::Pass, 4));
}

#[test]
fn operation_error_is_error() {
    let report = run(vec![GroupSpec::new(vec![scripted(3)
        .with_id("e")
        .with_argument(json!({"error_at": 2}))])]);
    assert_eq!(status(&report, "e"), (Status::Error, 1));
}

#[test]
fn operation_panic_is_error() {
    let report = run(vec![GroupSpec::new(vec![
        scripted(3)
            .with_id("p")
            .with_argument(json!({"panic_at": 1}))
            .synced(),
        scripted(3).with_id("q").synced(),
    ])]);
    assert_eq!(status(&report, "p"), (Status::Error, 0));
    assert_eq!(status(&report, "q"), (Status::SyncFail, 0));
}

#[test]
fn constructor_error_is_fail() {
    let report = run(vec![GroupSpec::new(vec![
        scripted(3).with_id("f").with_argument(json!({"reject": true})),
        scripted(3).with_id("ok"),
    ])]);
    assert_eq!(status(&report, "f"), (Status::Fail, 0));
    assert_eq!(status(&report, "ok"), (Status::Pass, 3));
}

#[test]
fn constructor_panic_releases_synced_peer() {
    let mut registry = OpRegistry::with_builtins();
    registry.register("exploding", |_: &str, _: &serde_json::Value| -> OpResult<Box<dyn ToggleOp>> {
        panic!("constructor exploded")
    });
    let group = GroupSpec::new(vec![
        ClientSpec::new("delay", IterationLimit::iterations(3))
            .with_id("good")
            .synced(),
        ClientSpec::new("exploding", IterationLimit::iterations(3))
            .with_id("bad")
            .synced(),
    ]);
    let driver = Driver::configure(Arc::new(registry), vec![group], None).unwrap();

    /* No barrier timeout: only the failing client can release its peer. */
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(driver.run().join());
    });
    let report = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("join blocked on the synced peer");

    assert_eq!(status(&report, "bad"), (Status::Fail, 0));
    assert_eq!(status(&report, "good"), (Status::SyncFail, 0));
}

#[test]
fn duration_limit() {
    let spec = ClientSpec::new(
        "delay",
        IterationLimit::duration(Duration::from_millis(100)),
    )
    .with_id("d")
    .with_argument(json!({"on": 0.01}));
    let report = run(vec![GroupSpec::new(vec![spec])]);
    let client = report.client("d").unwrap();
    assert_eq!(client.status, Status::Pass);
    assert!(client.iterations >= 1);
    assert!(client.elapsed >= Duration::from_millis(100));
}

#[test]
fn file_toggles_stay_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let mut group = GroupSpec::new(vec![ClientSpec::new(
        "file",
        IterationLimit::iterations(5),
    )
    .with_argument(json!({"dir": dir.path()}))
    .synced()
    .times(3)]);
    group.consistent = true;

    let report = run(vec![group]);
    assert!(report.all_passed(), "{}", report);
    assert_eq!(report.total_iterations(), 15);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn configuration_errors() {
    let configure = |groups| Driver::configure(registry(), groups, None);

    assert!(matches!(
        configure(vec![GroupSpec::new(vec![ClientSpec::new(
            "nonexistent",
            IterationLimit::iterations(1)
        )])]),
        Err(Error::UnknownOperation(id, op)) if id == "g0c0" && op == "nonexistent"
    ));
    assert!(matches!(
        configure(vec![GroupSpec::new(vec![ClientSpec::new(
            "scripted",
            IterationLimit::default()
        )])]),
        Err(Error::Unbounded(_))
    ));
    assert!(matches!(
        configure(vec![
            GroupSpec::new(vec![scripted(1).with_id("x")]),
            GroupSpec::new(vec![scripted(1).with_id("x")]),
        ]),
        Err(Error::DuplicateId(id)) if id == "x"
    ));
}
