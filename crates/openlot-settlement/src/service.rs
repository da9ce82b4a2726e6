//! Async front door to the execution environment.
//!
//! [`LedgerService::spawn`] moves the environment into a tokio task that
//! drains a bounded command queue one command at a time, so intents from
//! any number of [`LedgerHandle`] clones are applied in one total order.
//! Every call awaits its reply; `submit` returns only once the intent has
//! committed or been rejected.

use openlot_types::{
    AccountId, Auction, AuctionId, BalanceEntry, CommittedEvent, EventSeq, Item, ItemId,
    OpenlotError, Result, SignedIntent,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

use crate::clock::Clock;
use crate::environment::{ExecutionEnvironment, Receipt};

enum Command {
    Submit {
        intent: Box<SignedIntent>,
        reply: oneshot::Sender<Result<Receipt>>,
    },
    EventsSince {
        from: EventSeq,
        reply: oneshot::Sender<Vec<CommittedEvent>>,
    },
    Balance {
        account: AccountId,
        reply: oneshot::Sender<BalanceEntry>,
    },
    Item {
        id: ItemId,
        reply: oneshot::Sender<Result<Item>>,
    },
    Auction {
        id: AuctionId,
        reply: oneshot::Sender<Result<Auction>>,
    },
    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<CommittedEvent>>,
    },
    Shutdown,
}

pub struct LedgerService;

impl LedgerService {
    /// Start the writer task. It runs until [`LedgerHandle::shutdown`] is
    /// called or every handle is dropped.
    pub fn spawn<C>(env: ExecutionEnvironment<C>) -> (LedgerHandle, JoinHandle<()>)
    where
        C: Clock + 'static,
    {
        let (tx, rx) = mpsc::channel(env.config().command_queue_capacity);
        let task = tokio::spawn(run(env, rx));
        (LedgerHandle { tx }, task)
    }
}

async fn run<C: Clock>(mut env: ExecutionEnvironment<C>, mut rx: mpsc::Receiver<Command>) {
    while let Some(cmd) = rx.recv().await {
        // A dropped reply receiver means the caller gave up; the command
        // has still been applied.
        match cmd {
            Command::Submit { intent, reply } => {
                let _ = reply.send(env.execute(&intent));
            }
            Command::EventsSince { from, reply } => {
                let _ = reply.send(env.events_since(from).to_vec());
            }
            Command::Balance { account, reply } => {
                let _ = reply.send(env.state().balance(account));
            }
            Command::Item { id, reply } => {
                let _ = reply.send(env.state().item(id).cloned());
            }
            Command::Auction { id, reply } => {
                let _ = reply.send(env.state().auction(id).cloned());
            }
            Command::Subscribe { reply } => {
                let _ = reply.send(env.subscribe());
            }
            Command::Shutdown => break,
        }
    }
    info!("Ledger service stopped");
}

/// Cheap, cloneable client of a running [`LedgerService`].
#[derive(Clone)]
pub struct LedgerHandle {
    tx: mpsc::Sender<Command>,
}

impl LedgerHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| OpenlotError::ServiceUnavailable)?;
        rx.await.map_err(|_| OpenlotError::ServiceUnavailable)
    }

    /// Submit a signed intent and wait for finality.
    ///
    /// # Errors
    /// Returns the intent's rejection, or `ServiceUnavailable` if the
    /// service has stopped.
    pub async fn submit(&self, intent: SignedIntent) -> Result<Receipt> {
        self.request(|reply| Command::Submit {
            intent: Box::new(intent),
            reply,
        })
        .await?
    }

    /// # Errors
    /// Returns `ServiceUnavailable` if the service has stopped.
    pub async fn events_since(&self, from: EventSeq) -> Result<Vec<CommittedEvent>> {
        self.request(|reply| Command::EventsSince { from, reply })
            .await
    }

    /// # Errors
    /// Returns `ServiceUnavailable` if the service has stopped.
    pub async fn balance(&self, account: AccountId) -> Result<BalanceEntry> {
        self.request(|reply| Command::Balance { account, reply })
            .await
    }

    /// # Errors
    /// Returns `ItemNotFound`, or `ServiceUnavailable` if the service has stopped.
    pub async fn item(&self, id: ItemId) -> Result<Item> {
        self.request(|reply| Command::Item { id, reply }).await?
    }

    /// # Errors
    /// Returns `AuctionNotFound`, or `ServiceUnavailable` if the service has stopped.
    pub async fn auction(&self, id: AuctionId) -> Result<Auction> {
        self.request(|reply| Command::Auction { id, reply }).await?
    }

    /// Live feed of events committed after this call.
    ///
    /// # Errors
    /// Returns `ServiceUnavailable` if the service has stopped.
    pub async fn subscribe(&self) -> Result<broadcast::Receiver<CommittedEvent>> {
        self.request(|reply| Command::Subscribe { reply }).await
    }

    /// Ask the service to stop after the commands already queued.
    ///
    /// # Errors
    /// Returns `ServiceUnavailable` if the service has already stopped.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| OpenlotError::ServiceUnavailable)
    }
}
