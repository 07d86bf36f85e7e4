//! Cancellable timer owned by the shell.
//!
//! The core asks the shell to wait for a ticket; the shell answers with
//! [`DelayOutput::Elapsed`] or, if the core sent a matching
//! [`DelayOperation::Cancel`] first, [`DelayOutput::Cancelled`].

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Identifies one requested delay so late answers can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticket(pub u64);

impl Ticket {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayOperation {
    Start { ticket: Ticket, duration_ms: u64 },
    Cancel { ticket: Ticket },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayOutput {
    Elapsed,
    Cancelled,
}

impl Operation for DelayOperation {
    type Output = DelayOutput;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelayError {
    #[error("delay {0} is already running")]
    DuplicateTicket(Ticket),
    #[error("no running delay {0}")]
    UnknownTicket(Ticket),
}

pub struct Delay<Ev> {
    context: CapabilityContext<DelayOperation, Ev>,
}

impl<Ev> Capability<Ev> for Delay<Ev> {
    type Operation = DelayOperation;
    type MappedSelf<MappedEv> = Delay<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Delay::new(self.context.map_event(f))
    }
}

impl<Ev> Delay<Ev> {
    #[must_use]
    pub fn new(context: CapabilityContext<DelayOperation, Ev>) -> Self {
        Self { context }
    }
}

impl<Ev> Delay<Ev>
where
    Ev: 'static,
{
    /// Asks the shell to wait `duration`, then dispatches `make_event` with
    /// the outcome.
    pub fn start<F>(&self, ticket: Ticket, duration: Duration, make_event: F)
    where
        F: FnOnce(DelayOutput) -> Ev + Send + 'static,
    {
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx
                .request_from_shell(DelayOperation::Start { ticket, duration_ms })
                .await;
            ctx.update_app(make_event(output));
        });
    }

    pub fn cancel(&self, ticket: Ticket) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(DelayOperation::Cancel { ticket }).await;
        });
    }
}

#[cfg(feature = "native-delay")]
pub use self::driver::DelayDriver;

#[cfg(feature = "native-delay")]
mod driver {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::{Mutex, Notify};
    use tracing::debug;

    use super::{DelayError, DelayOperation, DelayOutput, Ticket};

    /// Shell-side executor for [`DelayOperation`]s on native targets.
    #[derive(Debug, Default)]
    pub struct DelayDriver {
        pending: Mutex<HashMap<Ticket, Arc<Notify>>>,
    }

    impl DelayDriver {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Runs one operation. `Start` resolves once the delay ends and
        /// yields the output to hand back to the core; `Cancel` yields `None`.
        pub async fn handle(&self, operation: DelayOperation) -> Result<Option<DelayOutput>, DelayError> {
            match operation {
                DelayOperation::Start { ticket, duration_ms } => {
                    self.run(ticket, Duration::from_millis(duration_ms)).await.map(Some)
                }
                DelayOperation::Cancel { ticket } => self.cancel(ticket).await.map(|()| None),
            }
        }

        pub async fn run(&self, ticket: Ticket, duration: Duration) -> Result<DelayOutput, DelayError> {
            let token = Arc::new(Notify::new());
            {
                let mut pending = self.pending.lock().await;
                if pending.contains_key(&ticket) {
                    return Err(DelayError::DuplicateTicket(ticket));
                }
                pending.insert(ticket, Arc::clone(&token));
            }

            let output = tokio::select! {
                () = tokio::time::sleep(duration) => DelayOutput::Elapsed,
                () = token.notified() => DelayOutput::Cancelled,
            };

            self.pending.lock().await.remove(&ticket);
            debug!(%ticket, ?output, "delay finished");
            Ok(output)
        }

        /// A cancel that lands before the delay starts waiting still wins:
        /// `Notify` keeps the permit.
        pub async fn cancel(&self, ticket: Ticket) -> Result<(), DelayError> {
            let pending = self.pending.lock().await;
            let token = pending.get(&ticket).ok_or(DelayError::UnknownTicket(ticket))?;
            token.notify_one();
            Ok(())
        }

        pub async fn running(&self) -> usize {
            self.pending.lock().await.len()
        }
    }
}
