use crate::core::tireset::Compound;
use crate::sync::Interrupted;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct BoxState {
    current_car: Option<u32>,
    chosen_compound: Option<Compound>,
    service_requested: bool,
    service_in_progress: bool,
    service_done: bool,
    closed: bool,
}

/// PitBox couples a car worker with its team's crew worker for the duration of a pit service.
/// The car produces the service request and blocks until the crew reports completion; the crew
/// consumes requests one at a time. At most one car is resident, and every completed stop pairs
/// exactly one perform_stop with one finish_service.
///
/// Handoff sequence: the car binds itself to the box and signals `car_arrived`; the crew wakes,
/// marks the service in progress and performs it without holding the lock; finish_service flips
/// the done flag and signals `service_complete`; the car observes done, clears the box and
/// returns.
#[derive(Debug, Default)]
pub struct PitBox {
    state: Mutex<BoxState>,
    car_arrived: Condvar,
    service_complete: Condvar,
}

impl PitBox {
    pub fn new() -> PitBox {
        Default::default()
    }

    /// perform_stop binds the calling car to the box, wakes the crew and blocks until the
    /// service is done. A teammate arriving while the box is busy waits here until the box
    /// clears, which keeps the box single-resident.
    pub fn perform_stop(&self, car_no: u32, compound: Compound) -> Result<(), Interrupted> {
        let mut state = self.state.lock().expect("Pit box lock poisoned!");

        while state.current_car.is_some() {
            if state.closed {
                return Err(Interrupted);
            }
            state = self
                .service_complete
                .wait(state)
                .expect("Pit box lock poisoned!");
        }

        if state.closed {
            return Err(Interrupted);
        }

        state.current_car = Some(car_no);
        state.chosen_compound = Some(compound);
        state.service_requested = true;
        log::debug!("car {}: requested service at the box", car_no);
        self.car_arrived.notify_one();

        while !state.service_done {
            if state.closed {
                return Err(Interrupted);
            }
            state = self
                .service_complete
                .wait(state)
                .expect("Pit box lock poisoned!");
        }

        // the car clears the box for the next service
        state.current_car = None;
        state.chosen_compound = None;
        state.service_requested = false;
        state.service_done = false;
        log::debug!("car {}: resumed after service", car_no);
        self.service_complete.notify_all();
        Ok(())
    }

    /// wait_for_car blocks the crew until a car has requested service, with an optional deadline
    /// so the crew can interleave shutdown checks. Returns the bound car and the requested
    /// compound, or None once the deadline passed without a request.
    pub fn wait_for_car(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<(u32, Compound)>, Interrupted> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut state = self.state.lock().expect("Pit box lock poisoned!");

        // wait for a fresh request: a request that is already in progress or done belongs to a
        // car that has not cleared the box yet and must not be consumed twice
        while !state.service_requested || state.service_in_progress || state.service_done {
            if state.closed {
                return Err(Interrupted);
            }

            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    let (guard, _timeout_result) = self
                        .car_arrived
                        .wait_timeout(state, deadline - now)
                        .expect("Pit box lock poisoned!");
                    state = guard;
                }
                None => {
                    state = self
                        .car_arrived
                        .wait(state)
                        .expect("Pit box lock poisoned!");
                }
            }
        }

        state.service_in_progress = true;
        let car_no = state
            .current_car
            .expect("Service was requested without a bound car!");
        let compound = state
            .chosen_compound
            .expect("Service was requested without a chosen compound!");
        log::debug!("crew: received car {} for service", car_no);
        Ok(Some((car_no, compound)))
    }

    /// finish_service completes the running service and wakes the waiting car. Calling it
    /// without a prior accepted request is a protocol violation.
    pub fn finish_service(&self) {
        let mut state = self.state.lock().expect("Pit box lock poisoned!");

        if !state.service_in_progress {
            panic!("Tried to finish a pit service without a prior service request!")
        }

        state.service_in_progress = false;
        state.service_done = true;
        log::debug!("crew: service complete");
        self.service_complete.notify_all();
    }

    /// is_occupied returns true while a car is bound to the box.
    pub fn is_occupied(&self) -> bool {
        let state = self.state.lock().expect("Pit box lock poisoned!");
        state.current_car.is_some()
    }

    /// shutdown wakes car and crew with an interruption.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().expect("Pit box lock poisoned!");
        state.closed = true;
        self.car_arrived.notify_all();
        self.service_complete.notify_all();
    }
}
