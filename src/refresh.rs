use crate::{
    location::LocationRequest,
    provider::DataProvider,
    snapshot::{DataKind, Fetched},
};
use indexmap::IndexSet;
use log::{debug, error, info};
use std::{
    sync::{
        mpsc::{self, Receiver, TryRecvError},
        Arc,
    },
    thread,
};

/// What to fetch on the next refresh
#[derive(Clone, Debug, PartialEq)]
pub struct RefreshRequest {
    pub location: LocationRequest,
    pub kinds: IndexSet<DataKind>,
}

/// Runs data refreshes in the background so the render loop never blocks on
/// the network. At most one refresh is in flight at a time; triggers while
/// one is running are dropped.
pub struct Refresher {
    provider: Arc<DataProvider>,
    in_flight: Option<Receiver<Fetched>>,
}

impl Refresher {
    pub fn new(provider: Arc<DataProvider>) -> Self {
        Self {
            provider,
            in_flight: None,
        }
    }

    /// Data kinds the provider can supply
    pub fn kinds(&self) -> IndexSet<DataKind> {
        self.provider.kinds()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start a refresh, unless one is already running. Return whether a new
    /// refresh was started
    pub fn trigger(&mut self, request: RefreshRequest) -> bool {
        if self.in_flight() {
            debug!("Refresh already in flight, skipping");
            return false;
        }

        info!("Starting refresh of {}", itertools::join(&request.kinds, ", "));
        let provider = Arc::clone(&self.provider);
        let (sender, receiver) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("refresh".into())
            .spawn(move || {
                let fetched = provider.refresh(&request.location, &request.kinds);
                // Receiver is only gone if the controller shut down
                let _ = sender.send(fetched);
            });
        match spawned {
            Ok(_) => {
                self.in_flight = Some(receiver);
                true
            }
            Err(err) => {
                error!("Error spawning refresh thread: {err}");
                false
            }
        }
    }

    /// Get the result of the in-flight refresh, if it's done
    pub fn poll(&mut self) -> Option<Fetched> {
        let receiver = self.in_flight.as_ref()?;
        match receiver.try_recv() {
            Ok(fetched) => {
                self.in_flight = None;
                Some(fetched)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                error!("Refresh thread died without a result");
                self.in_flight = None;
                None
            }
        }
    }
}
