//! Async driver for [`RouteController`].
//!
//! [`Navigator::run`] owns the controller and feeds it fixes and headings
//! from one input channel. Directions requests run on their own tasks;
//! their results come back through an internal channel and are applied
//! on the same loop, so progress is only ever mutated from one place.

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::client::DirectionsService;
use crate::controller::{Command, RouteController, Ticket};
use crate::error::NavResult;
use crate::events::{DefaultBehavior, EventChannel, NavigationEvent, NavigationObserver};
use crate::location::{Heading, LocationFix};

/// Everything the navigator accepts from the device side.
#[derive(Debug, Clone)]
pub enum NavigatorInput {
    Location(LocationFix),
    Heading(Heading),
    /// Run a faster-route check with the next fix, skipping the interval.
    ForceProactiveReroute,
    /// Refresh the route with the next fix, skipping the interval.
    ForceRouteRefresh,
}

pub struct Navigator<S, H = DefaultBehavior> {
    controller: RouteController,
    service: S,
    events: EventChannel<H>,
    in_flight: HashMap<Ticket, JoinHandle<()>>,
    responses_tx: mpsc::UnboundedSender<(Ticket, NavResult<String>)>,
    responses_rx: mpsc::UnboundedReceiver<(Ticket, NavResult<String>)>,
}

impl<S, H> Navigator<S, H>
where
    S: DirectionsService,
    H: NavigationObserver,
{
    pub fn new(controller: RouteController, service: S, events: EventChannel<H>) -> Self {
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        Navigator {
            controller,
            service,
            events,
            in_flight: HashMap::new(),
            responses_tx,
            responses_rx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigationEvent> {
        self.events.subscribe()
    }

    pub fn controller(&self) -> &RouteController {
        &self.controller
    }

    /// Runs until `inputs` is closed, then aborts outstanding requests and
    /// hands the controller back.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<NavigatorInput>) -> RouteController {
        loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => break,
                },
                Some((ticket, body)) = self.responses_rx.recv() => {
                    self.in_flight.remove(&ticket);
                    self.controller.apply_response(ticket, body, &mut self.events);
                }
            }
        }

        for (ticket, handle) in self.in_flight.drain() {
            log::debug!("aborting {ticket:?} on shutdown");
            handle.abort();
        }
        self.controller
    }

    fn handle_input(&mut self, input: NavigatorInput) {
        match input {
            NavigatorInput::Location(fix) => {
                let commands = self.controller.update_location(fix, &mut self.events);
                self.execute(commands);
            }
            NavigatorInput::Heading(heading) => self.controller.update_heading(heading),
            NavigatorInput::ForceProactiveReroute => {
                self.controller.force_proactive_reroute_at_next_update()
            }
            NavigatorInput::ForceRouteRefresh => self.controller.force_route_refresh_at_next_update(),
        }
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Send(call) => {
                    log::debug!("sending {:?} request {:?}", call.kind, call.ticket);
                    let ticket = call.ticket;
                    let pending = self.service.calculate(call.request);
                    let responses = self.responses_tx.clone();
                    let handle = tokio::spawn(async move {
                        let body = pending.await;
                        // The loop may be gone already.
                        let _ = responses.send((ticket, body));
                    });
                    self.in_flight.insert(ticket, handle);
                }
                Command::Cancel(ticket) => {
                    if let Some(handle) = self.in_flight.remove(&ticket) {
                        handle.abort();
                    }
                }
            }
        }
    }
}
