use std::future::Future;
use tracing::debug;

use super::connector::Connector;
use super::control::{self, ControlId};
use super::scope::ConnectionScope;
use crate::error::DeskError;

impl<C: Connector> ConnectionScope<C> {
    /// Run `work` as one atomic unit: begin, then commit on `Ok` or roll back on `Err`.
    ///
    /// The unit is its own thread of control. Store calls made by `work` share
    /// the bound connection; futures running beside it in the same task do
    /// not. Dropping the returned future before it finishes abandons the
    /// transaction. Label fallible steps inside `work` with
    /// [`StepContext::step`](crate::error::StepContext::step) so the returned
    /// error names the step that failed.
    pub async fn unit_of_work<T, F, Fut>(&self, work: F) -> Result<T, DeskError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DeskError>>,
    {
        if self.is_active() {
            return Err(DeskError::TransactionAlreadyActive);
        }

        let unit = control::fresh_unit();
        let _abandoned = self.abandon_on_drop(ControlId::Unit(unit));
        control::within_unit(unit, async move {
            self.begin().await?;
            match work().await {
                Ok(value) => {
                    self.commit().await?;
                    Ok(value)
                }
                Err(err) => {
                    debug!(error = %err, "unit of work failed; rolling back");
                    self.rollback().await;
                    Err(err)
                }
            }
        })
        .await
    }
}
