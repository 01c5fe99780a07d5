/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::barrier::{SyncBarrier, SyncOutcome};
use crate::config::{ClientSpec, GroupSpec, IterationLimit, Validator};
use crate::error::{Error, Result};
use crate::op::{OpResult, Phase, SharedState, ToggleOp};
use crate::registry::OpRegistry;
use crate::report::{ClientReport, Report, Status};

type GroupBarrier = Arc<SyncBarrier<SharedState>>;

/// A configured set of clients, ready to run.
#[derive(Debug)]
pub struct Driver {
    registry: Arc<OpRegistry>,
    clients: Vec<ClientTask>,
}

/// Clients that have been started. Join to collect the report.
pub struct RunningDriver {
    clients: Vec<ClientThread>,
}

enum ClientThread {
    Running {
        id: String,
        group: usize,
        barrier: Option<GroupBarrier>,
        handle: JoinHandle<ClientReport>,
    },
    Finished(ClientReport),
}

struct ClientTask {
    id: String,
    group: usize,
    operation: String,
    argument: serde_json::Value,
    limit: IterationLimit,
    barrier: Option<GroupBarrier>,
}

impl Driver {
    /// Validate the groups and create one barrier per group, shared by
    /// the group's synchronized clients.
    pub fn configure(
        registry: Arc<OpRegistry>,
        groups: Vec<GroupSpec>,
        sync_timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut ids = HashSet::new();
        let mut clients = Vec::new();

        for (group, spec) in groups.into_iter().enumerate() {
            let members = expand_clients(group, &spec.clients);
            let syncing = members.iter().filter(|(_, c)| c.sync).count();
            let barrier = (syncing > 0).then(|| {
                let validator = match spec.consistent {
                    true => {
                        let custom = spec.validator.clone();
                        let consistent = Validator::consistent();
                        Validator::new(move |shared| {
                            consistent.check(shared) && custom.check(shared)
                        })
                    }
                    false => spec.validator.clone(),
                };
                Arc::new(SyncBarrier::<SharedState>::new(
                    syncing,
                    sync_timeout,
                    move |shared| validator.check(shared),
                ))
            });

            for (id, client) in members {
                if !registry.contains(&client.operation) {
                    return Err(Error::UnknownOperation(id, client.operation.clone()));
                }
                if !client.limit.is_bounded() {
                    return Err(Error::Unbounded(id));
                }
                if !ids.insert(id.clone()) {
                    return Err(Error::DuplicateId(id));
                }
                clients.push(ClientTask {
                    id,
                    group,
                    operation: client.operation.clone(),
                    argument: client.argument.clone(),
                    limit: client.limit,
                    barrier: client.sync.then(|| barrier.clone()).flatten(),
                });
            }

            log::debug!(
                "group {}: {} synchronized client(s)",
                group,
                syncing
            );
        }

        log::info!("configured {} client(s)", clients.len());
        Ok(Self { registry, clients })
    }

    /// Start one thread per client.
    pub fn run(self) -> RunningDriver {
        let Self { registry, clients } = self;
        let clients = clients
            .into_iter()
            .map(|task| {
                let id = task.id.clone();
                let group = task.group;
                let barrier = task.barrier.clone();
                let registry = registry.clone();
                match thread::Builder::new()
                    .name(id.clone())
                    .spawn(move || run_client(task, &registry))
                {
                    Ok(handle) => ClientThread::Running {
                        id,
                        group,
                        barrier,
                        handle,
                    },
                    Err(e) => {
                        log::error!("{}: failed to start thread: {}", id, e);
                        if let Some(barrier) = barrier {
                            barrier.abandon(&id);
                        }
                        ClientThread::Finished(ClientReport {
                            id,
                            group,
                            status: Status::Fail,
                            iterations: 0,
                            elapsed: Duration::ZERO,
                            started: Utc::now(),
                        })
                    }
                }
            })
            .collect();
        RunningDriver { clients }
    }
}

impl RunningDriver {
    /// Wait for every client to finish.
    pub fn join(self) -> Report {
        let clients = self
            .clients
            .into_iter()
            .map(|client| match client {
                ClientThread::Running {
                    id,
                    group,
                    barrier,
                    handle,
                } => {
                    let started = Utc::now();
                    handle.join().unwrap_or_else(|_| {
                        log::error!("{}: client thread died", id);
                        if let Some(barrier) = barrier {
                            barrier.abandon(&id);
                        }
                        ClientReport {
                            id,
                            group,
                            status: Status::Error,
                            iterations: 0,
                            elapsed: Duration::ZERO,
                            started,
                        }
                    })
                }
                ClientThread::Finished(report) => report,
            })
            .collect();
        Report::new(clients)
    }
}

fn expand_clients(group: usize, specs: &[ClientSpec]) -> Vec<(String, &ClientSpec)> {
    specs
        .iter()
        .enumerate()
        .flat_map(|(index, spec)| {
            let base = spec
                .id
                .clone()
                .unwrap_or_else(|| format!("g{}c{}", group, index));
            (0..spec.count).map(move |k| match spec.count {
                1 => (base.clone(), spec),
                _ => (format!("{}-{}", base, k), spec),
            })
        })
        .collect()
}

fn run_client(task: ClientTask, registry: &OpRegistry) -> ClientReport {
    let started_at = Utc::now();
    let started = Instant::now();
    let mut iterations = 0;

    log::debug!("{}: starting {}", task.id, task.operation);

    let status = match construct(registry, &task) {
        Some(mut op) => {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                cycle(&mut *op, &task, started, &mut iterations)
            }));
            match result {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => {
                    log::error!("{}: {}", task.id, e);
                    Status::Error
                }
                Err(panic) => {
                    log::error!(
                        "{}: operation panicked: {}",
                        task.id,
                        panic_message(panic.as_ref())
                    );
                    Status::Error
                }
            }
        }
        None => Status::Fail,
    };

    if let Some(barrier) = &task.barrier {
        match status {
            Status::Pass => barrier.leave(),
            _ => barrier.abandon(&task.id),
        }
    }

    let report = ClientReport {
        id: task.id,
        group: task.group,
        status,
        iterations,
        elapsed: started.elapsed(),
        started: started_at,
    };
    log::info!("{}", report);
    report
}

/* A constructor that errors or panics leaves the client without an
 * operation. */
fn construct(registry: &OpRegistry, task: &ClientTask) -> Option<Box<dyn ToggleOp>> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        registry.construct(&task.operation, &task.id, &task.argument)
    }));
    match result {
        Ok(Ok(op)) => Some(op),
        Ok(Err(e)) => {
            log::error!(
                "{}: failed to create {} operation: {}",
                task.id,
                task.operation,
                e
            );
            None
        }
        Err(panic) => {
            log::error!(
                "{}: {} constructor panicked: {}",
                task.id,
                task.operation,
                panic_message(panic.as_ref())
            );
            None
        }
    }
}

/* on -> on_verify -> barrier -> off -> off_verify -> barrier, until the
 * limit is reached. */
fn cycle(
    op: &mut dyn ToggleOp,
    task: &ClientTask,
    started: Instant,
    iterations: &mut u64,
) -> OpResult<Status> {
    while !task.limit.reached(*iterations, started.elapsed()) {
        op.on()?;
        if !op.on_verify()? {
            log::warn!(
                "{}: verification failed after on (iteration {})",
                task.id,
                *iterations + 1
            );
            return Ok(Status::VerifyFail);
        }
        if !rendezvous(op, task, Phase::On) {
            return Ok(Status::SyncFail);
        }

        op.off()?;
        if !op.off_verify()? {
            log::warn!(
                "{}: verification failed after off (iteration {})",
                task.id,
                *iterations + 1
            );
            return Ok(Status::VerifyFail);
        }
        if !rendezvous(op, task, Phase::Off) {
            return Ok(Status::SyncFail);
        }

        *iterations += 1;
        log::trace!("{}: iteration {} done", task.id, iterations);
    }
    Ok(Status::Pass)
}

fn rendezvous(op: &dyn ToggleOp, task: &ClientTask, phase: Phase) -> bool {
    let barrier = match &task.barrier {
        Some(barrier) => barrier,
        None => return true,
    };
    match barrier.wait_with(|shared| op.share(phase, shared)) {
        SyncOutcome::Passed => true,
        outcome => {
            log::warn!(
                "{}: synchronization after {} failed: {}",
                task.id,
                phase,
                outcome
            );
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "(non-string payload)"
    }
}

impl std::fmt::Debug for ClientTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientTask")
            .field("id", &self.id)
            .field("group", &self.group)
            .field("operation", &self.operation)
            .field("limit", &self.limit)
            .field("sync", &self.barrier.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::expand_clients;
    use crate::config::{ClientSpec, IterationLimit};

    #[test]
    fn client_ids() {
        let limit = IterationLimit::iterations(1);
        let specs = vec![
            ClientSpec::new("delay", limit),
            ClientSpec::new("delay", limit).with_id("x").times(2),
            ClientSpec::new("delay", limit).times(0),
        ];
        let ids = expand_clients(3, &specs)
            .into_iter()
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["g3c0", "x-0", "x-1"]);
    }
}
