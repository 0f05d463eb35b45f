use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use tokio::task_local;

task_local! {
    static UNIT: u64;
}

static NEXT_UNIT: AtomicU64 = AtomicU64::new(1);

/// Identity of the thread of control a transaction is bound to.
///
/// A running unit of work is its own thread of control: the id lives in a
/// task-local scope around the unit's future, so sibling futures polled by the
/// same task (`join!`, `select!`) never see it. Otherwise this is the tokio
/// task id, which stays stable when the runtime moves the task between worker
/// threads. Outside any task (plain threads, `block_on`) it falls back to the
/// OS thread id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    Unit(u64),
    Task(tokio::task::Id),
    Thread(ThreadId),
}

impl ControlId {
    pub fn current() -> Self {
        if let Ok(unit) = UNIT.try_with(|id| *id) {
            return ControlId::Unit(unit);
        }
        tokio::task::try_id()
            .map(ControlId::Task)
            .unwrap_or_else(|| ControlId::Thread(thread::current().id()))
    }
}

/// A unit id never handed out before.
pub(crate) fn fresh_unit() -> u64 {
    NEXT_UNIT.fetch_add(1, Ordering::Relaxed)
}

/// Poll `future` with `unit` as its thread of control.
pub(crate) async fn within_unit<F: Future>(unit: u64, future: F) -> F::Output {
    UNIT.scope(unit, future).await
}
