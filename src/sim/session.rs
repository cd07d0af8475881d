//! Session state and authoritative tick loop

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::command::{CommandError, CommandInterpreter, Directive, DirectiveAck};
use crate::console::protocol::{CommandReply, EndReason, SimEvent, SimMsg};
use crate::navdata::Airport;
use crate::util::time::{frame_duration, tick_delta, SimClock};

use super::aircraft::AircraftSpawn;
use super::navigation::{occupied_runways, NavEvent, NavigationParams, NavigationSystem};
use super::physics::{KinematicsSystem, PerformanceEnvelope};
use super::registry::{AircraftId, AircraftRegistry, RegistryError};
use super::scoring::{ScoreSnapshot, Scoreboard};
use super::separation::{SeparationDetector, SeparationMinima, SeparationReport};
use super::snapshot::SnapshotBuilder;
use super::traffic::{TrafficConfig, TrafficGenerator};

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Ticking
    Running,
    /// Collision or shutdown; no further ticks or directives
    Ended,
}

/// Tunables for one session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Seed for the traffic generator
    pub seed: u64,
    pub fast_forward_ticks: u32,
    pub traffic: TrafficConfig,
    pub navigation: NavigationParams,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            fast_forward_ticks: crate::util::time::DEFAULT_FAST_FORWARD_TICKS,
            traffic: TrafficConfig::default(),
            navigation: NavigationParams::standard(),
        }
    }
}

/// Session state (owned by the session task)
pub struct SessionState {
    pub id: Uuid,
    pub phase: SessionPhase,
    pub clock: SimClock,
    pub registry: AircraftRegistry,
    pub score: Scoreboard,
    airport: Arc<Airport>,
    envelope: PerformanceEnvelope,
    navigation: NavigationParams,
    minima: SeparationMinima,
    /// Admitted directives waiting for the next tick boundary, in arrival order
    pending: Vec<Directive>,
    /// Conflicting pairs seen on the previous tick
    conflicts: BTreeSet<(AircraftId, AircraftId)>,
    /// Events raised outside a tick (spawns), flushed with the next tick
    events: Vec<SimEvent>,
    end_reason: Option<EndReason>,
}

impl SessionState {
    pub fn new(
        id: Uuid,
        airport: Arc<Airport>,
        fast_forward_ticks: u32,
        navigation: NavigationParams,
    ) -> Self {
        Self {
            id,
            phase: SessionPhase::Running,
            clock: SimClock::new(fast_forward_ticks),
            registry: AircraftRegistry::new(),
            score: Scoreboard::new(),
            airport,
            envelope: PerformanceEnvelope::standard(),
            navigation,
            minima: SeparationMinima::standard(),
            pending: Vec::new(),
            conflicts: BTreeSet::new(),
            events: Vec::new(),
            end_reason: None,
        }
    }

    pub fn airport(&self) -> &Airport {
        &self.airport
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn end_reason(&self) -> Option<&EndReason> {
        self.end_reason.as_ref()
    }

    pub fn pending_directives(&self) -> usize {
        self.pending.len()
    }

    /// Validate controller text against the state at the last tick boundary
    /// and queue it for the next one
    pub fn submit(&mut self, text: &str) -> Result<DirectiveAck, CommandError> {
        if !self.is_running() {
            return Err(CommandError::SessionOver);
        }

        let interpreter = CommandInterpreter::new(&self.airport, &self.envelope);
        match interpreter.interpret(text, &self.registry) {
            Ok(directive) => {
                let ack = directive.ack();
                info!(session_id = %self.id, directive = %ack, "Directive accepted");
                self.pending.push(directive);
                Ok(ack)
            }
            Err(e) => {
                debug!(session_id = %self.id, text, error = %e, "Directive rejected");
                Err(e)
            }
        }
    }

    /// Add an arrival to the registry
    pub fn spawn(&mut self, spawn: AircraftSpawn) -> Result<AircraftId, RegistryError> {
        let altitude = spawn.altitude;
        let id = self.registry.insert(spawn)?;
        if let Some(aircraft) = self.registry.get(id) {
            info!(
                session_id = %self.id,
                callsign = %aircraft.callsign,
                altitude,
                "Aircraft entered airspace"
            );
            self.events.push(SimEvent::Spawned {
                callsign: aircraft.callsign.clone(),
                altitude,
            });
        }
        Ok(id)
    }

    /// End the session without a collision
    pub fn shut_down(&mut self) {
        if self.is_running() {
            self.phase = SessionPhase::Ended;
            self.end_reason = Some(EndReason::Shutdown);
        }
    }

    /// Run one fixed-step tick: apply directives, navigate, integrate,
    /// check separation, score, then drop landed and exited aircraft
    pub fn run_tick(&mut self) -> Vec<SimEvent> {
        let mut events = std::mem::take(&mut self.events);
        if !self.is_running() {
            return events;
        }

        self.clock.advance();
        let dt = tick_delta();

        self.apply_pending(&mut events);
        self.update_navigation(&mut events, dt);

        for aircraft in self.registry.iter_mut() {
            if !aircraft.is_terminal() {
                KinematicsSystem::step(aircraft, &self.envelope, dt);
            }
        }

        let report = SeparationDetector::detect(&self.registry, &self.minima);
        SeparationDetector::flag(&mut self.registry, &report);
        self.score.record_separation(&report, dt);
        self.track_conflicts(&report, &mut events);

        if let Some((first, second)) = report.collision {
            let first = self.callsign(first);
            let second = self.callsign(second);
            error!(session_id = %self.id, %first, %second, "Collision");
            events.push(SimEvent::Collision {
                first: first.clone(),
                second: second.clone(),
            });
            self.end_reason = Some(EndReason::Collision { first, second });
            self.phase = SessionPhase::Ended;
        }

        self.remove_terminal();
        events
    }

    fn apply_pending(&mut self, events: &mut Vec<SimEvent>) {
        for directive in self.pending.drain(..) {
            match self.registry.get_mut(directive.aircraft_id) {
                Some(aircraft) => {
                    NavigationSystem::apply(aircraft, &directive.commands, &self.navigation);
                    events.push(SimEvent::DirectiveApplied {
                        callsign: directive.callsign,
                    });
                }
                None => {
                    debug!(callsign = %directive.callsign, "Directive dropped, aircraft gone");
                }
            }
        }
    }

    fn update_navigation(&mut self, events: &mut Vec<SimEvent>, dt: f64) {
        let mut occupied = occupied_runways(self.registry.iter());
        for aircraft in self.registry.iter_mut() {
            let event = NavigationSystem::update(
                aircraft,
                &self.airport,
                &self.envelope,
                &self.navigation,
                &mut occupied,
                dt,
            );
            if let Some(event) = event {
                self.score.record_nav_event(&event);
                events.push(sim_event(&aircraft.callsign, event));
            }
        }
    }

    fn track_conflicts(&mut self, report: &SeparationReport, events: &mut Vec<SimEvent>) {
        let current: BTreeSet<(AircraftId, AircraftId)> = report
            .conflicts
            .iter()
            .map(|c| (c.first, c.second))
            .collect();

        for conflict in &report.conflicts {
            if self.conflicts.contains(&(conflict.first, conflict.second)) {
                continue;
            }
            let first = self.callsign(conflict.first);
            let second = self.callsign(conflict.second);
            warn!(
                session_id = %self.id,
                %first,
                %second,
                horizontal_nm = conflict.horizontal_nm,
                vertical_ft = conflict.vertical_ft,
                "Separation lost"
            );
            events.push(SimEvent::SeparationLost { first, second });
        }

        if current.is_empty() && !self.conflicts.is_empty() {
            info!(session_id = %self.id, "Separation restored");
            events.push(SimEvent::SeparationRestored);
        }
        self.conflicts = current;
    }

    fn remove_terminal(&mut self) {
        let finished: Vec<AircraftId> = self
            .registry
            .iter()
            .filter(|a| a.is_terminal())
            .map(|a| a.id)
            .collect();
        for id in finished {
            if let Some(aircraft) = self.registry.remove(id) {
                debug!(
                    callsign = %aircraft.callsign,
                    mode = ?aircraft.mode_kind(),
                    "Aircraft removed"
                );
            }
        }
    }

    fn callsign(&self, id: AircraftId) -> String {
        self.registry
            .get(id)
            .map(|a| a.callsign.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

fn sim_event(callsign: &str, event: NavEvent) -> SimEvent {
    let callsign = callsign.to_string();
    match event {
        NavEvent::Established { runway } => SimEvent::Established { callsign, runway },
        NavEvent::Touchdown { runway } => SimEvent::Touchdown { callsign, runway },
        NavEvent::Landed { runway } => SimEvent::Landed { callsign, runway },
        NavEvent::GoAround { runway, reason } => SimEvent::GoAround {
            callsign,
            runway,
            reason,
        },
        NavEvent::Exited => SimEvent::Exited { callsign },
    }
}

/// Requests from the controller to the session task
#[derive(Debug)]
pub enum SessionRequest {
    Command {
        text: String,
        reply: oneshot::Sender<CommandReply>,
    },
    ToggleFastForward,
    Shutdown,
}

/// Handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    request_tx: mpsc::Sender<SessionRequest>,
    snapshot_tx: broadcast::Sender<SimMsg>,
}

impl SessionHandle {
    /// Submit directive text; resolves once validated
    pub async fn submit(&self, text: impl Into<String>) -> Result<CommandReply, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request_tx
            .send(SessionRequest::Command {
                text: text.into(),
                reply,
            })
            .await
            .map_err(|_| SessionError::Closed(self.id))?;
        rx.await.map_err(|_| SessionError::Closed(self.id))
    }

    pub async fn toggle_fast_forward(&self) -> Result<(), SessionError> {
        self.request_tx
            .send(SessionRequest::ToggleFastForward)
            .await
            .map_err(|_| SessionError::Closed(self.id))
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request_tx
            .send(SessionRequest::Shutdown)
            .await
            .map_err(|_| SessionError::Closed(self.id))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimMsg> {
        self.snapshot_tx.subscribe()
    }
}

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session {0} is no longer running")]
    Closed(Uuid),
}

/// The authoritative simulation session
pub struct SimSession {
    state: SessionState,
    traffic: TrafficGenerator,
    seed: u64,
    request_rx: mpsc::Receiver<SessionRequest>,
    snapshot_tx: broadcast::Sender<SimMsg>,
    snapshot_builder: SnapshotBuilder,
}

impl SimSession {
    /// Create a new session
    pub fn new(
        id: Uuid,
        airport: Arc<Airport>,
        settings: SessionSettings,
    ) -> (Self, SessionHandle) {
        let (request_tx, request_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(64);

        let handle = SessionHandle {
            id,
            request_tx,
            snapshot_tx: snapshot_tx.clone(),
        };

        let session = Self {
            state: SessionState::new(id, airport, settings.fast_forward_ticks, settings.navigation),
            traffic: TrafficGenerator::new(settings.seed, settings.traffic),
            seed: settings.seed,
            request_rx,
            snapshot_tx,
            snapshot_builder: SnapshotBuilder::new(1),
        };

        (session, handle)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Run the frame loop until collision or shutdown; returns the final score
    pub async fn run(mut self) -> ScoreSnapshot {
        info!(session_id = %self.state.id, seed = self.seed, "Session started");
        let _ = self.snapshot_tx.send(SimMsg::Welcome {
            session_id: self.state.id,
            airport: self.state.airport().icao.clone(),
            seed: self.seed,
        });

        let mut frame_interval = interval(frame_duration());
        frame_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            frame_interval.tick().await;

            // Drain requests before the frame's ticks
            self.process_requests();

            for _ in 0..self.state.clock.ticks_per_frame() {
                if !self.state.is_running() {
                    break;
                }
                self.step();
            }

            // One snapshot per frame, carrying every event from the frame's ticks
            if self.snapshot_builder.should_send() {
                let snapshot = self.snapshot_builder.build(
                    self.state.clock.tick(),
                    self.state.clock.elapsed_secs(),
                    self.state.clock.is_fast_forward(),
                    &self.state.registry,
                    &self.state.score,
                );
                let _ = self.snapshot_tx.send(snapshot);
            }

            if !self.state.is_running() {
                break;
            }
        }

        let score = self.state.score.snapshot();
        let reason = self
            .state
            .end_reason()
            .cloned()
            .unwrap_or(EndReason::Shutdown);
        info!(
            session_id = %self.state.id,
            landings = score.landings,
            violation_secs = score.violation_secs,
            improper_exits = score.improper_exits,
            "Session ended"
        );
        let _ = self.snapshot_tx.send(SimMsg::SessionEnd {
            session_id: self.state.id,
            reason,
            duration_secs: self.state.clock.elapsed_secs(),
            score: score.clone(),
        });
        score
    }

    /// One tick including traffic generation
    fn step(&mut self) {
        if let Some(spawn) = self.traffic.tick(tick_delta(), &self.state.registry) {
            if let Err(e) = self.state.spawn(spawn) {
                warn!(error = %e, "Arrival discarded");
            }
        }
        let events = self.state.run_tick();
        self.snapshot_builder.push_events(events);
    }

    /// Process all pending controller requests
    fn process_requests(&mut self) {
        loop {
            match self.request_rx.try_recv() {
                Ok(SessionRequest::Command { text, reply }) => {
                    let response = match self.state.submit(&text) {
                        Ok(ack) => CommandReply::Accepted { ack },
                        Err(e) => CommandReply::Rejected {
                            code: e.code().to_string(),
                            message: e.to_string(),
                        },
                    };
                    let _ = reply.send(response);
                }
                Ok(SessionRequest::ToggleFastForward) => {
                    let enabled = self.state.clock.toggle_fast_forward();
                    info!(session_id = %self.state.id, enabled, "Fast-forward toggled");
                    let _ = self.snapshot_tx.send(SimMsg::FastForward { enabled });
                }
                Ok(SessionRequest::Shutdown) => {
                    info!(session_id = %self.state.id, "Shutdown requested");
                    self.state.shut_down();
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    info!(session_id = %self.state.id, "All handles dropped, ending session");
                    self.state.shut_down();
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::navdata::Position;
    use crate::sim::aircraft::LateralMode;
    use tokio_test::{assert_err, assert_ok};

    fn state() -> SessionState {
        let airport = Arc::new(Airport::embedded_default().unwrap());
        SessionState::new(Uuid::new_v4(), airport, 10, NavigationParams::standard())
    }

    fn arrival(callsign: &str, x: f64, y: f64, altitude: f64) -> AircraftSpawn {
        AircraftSpawn {
            callsign: callsign.to_string(),
            position: Position::new(x, y),
            heading: 270.0,
            altitude,
            speed: 250.0,
        }
    }

    #[test]
    fn directives_wait_for_the_tick_boundary() {
        let mut s = state();
        s.spawn(arrival("BA1", 20.0, 10.0, 8000.0)).unwrap();

        let ack = s.submit("BA1 C 090 R").unwrap();
        assert_eq!(ack.readback, vec!["heading 090 turn right".to_string()]);
        assert_eq!(s.pending_directives(), 1);

        let aircraft = s.registry.find("BA1").unwrap();
        assert_eq!(aircraft.target_heading, 270.0);

        let events = s.run_tick();
        assert!(events.contains(&SimEvent::Spawned {
            callsign: "BA1".to_string(),
            altitude: 8000.0
        }));
        assert!(events.contains(&SimEvent::DirectiveApplied {
            callsign: "BA1".to_string()
        }));
        let aircraft = s.registry.find("BA1").unwrap();
        assert_eq!(aircraft.mode, LateralMode::HeadingHold { heading: 90.0 });
        assert!(aircraft.heading > 270.0);
        assert_eq!(s.pending_directives(), 0);
    }

    #[test]
    fn buffered_directives_apply_in_arrival_order() {
        let mut s = state();
        s.spawn(arrival("BA1", 20.0, 10.0, 8000.0)).unwrap();
        s.submit("BA1 C 5").unwrap();
        s.submit("BA1 C 7 S 200").unwrap();
        s.run_tick();
        let aircraft = s.registry.find("BA1").unwrap();
        assert_eq!(aircraft.vertical.altitude, 7000.0);
        assert_eq!(aircraft.speed_target.speed, 200.0);
    }

    #[test]
    fn validation_sees_the_last_tick_boundary() {
        let mut s = state();
        let mut spawn = arrival("BA1", 11.05, 0.38, 4000.0);
        spawn.speed = 200.0;
        s.spawn(spawn).unwrap();

        s.submit("BA1 L 27R").unwrap();
        // the queued clearance has not been applied yet
        assert_eq!(
            s.submit("BA1 A"),
            Err(CommandError::NotOnApproach("BA1".to_string()))
        );

        s.run_tick();
        assert!(s.registry.find("BA1").unwrap().on_approach());
        assert!(s.submit("BA1 A").is_ok());
    }

    #[test]
    fn abort_queued_behind_a_vector_is_dropped() {
        let mut s = state();
        let mut spawn = arrival("BA1", 11.05, 0.38, 4000.0);
        spawn.speed = 200.0;
        s.spawn(spawn).unwrap();
        s.submit("BA1 L 27R").unwrap();
        s.run_tick();
        assert!(s.registry.find("BA1").unwrap().on_approach());

        // both validate against the localizer mode of the last tick boundary
        s.submit("BA1 C 270").unwrap();
        s.submit("BA1 A").unwrap();
        s.run_tick();

        let aircraft = s.registry.find("BA1").unwrap();
        assert_eq!(aircraft.mode, LateralMode::HeadingHold { heading: 270.0 });
    }

    #[test]
    fn violation_time_accrues_per_tick() {
        let mut s = state();
        s.spawn(arrival("AA1", 20.0, 10.0, 8000.0)).unwrap();
        s.spawn(arrival("AA2", 22.0, 10.0, 8000.0)).unwrap();
        s.spawn(arrival("AA3", 24.0, 10.0, 8000.0)).unwrap();

        let events = s.run_tick();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, SimEvent::SeparationLost { .. }))
                .count(),
            2
        );
        for _ in 0..19 {
            s.run_tick();
        }
        assert!((s.score.violation_secs - 1.0).abs() < 1e-9);
        assert!(s.registry.iter().all(|a| a.violation));
    }

    #[test]
    fn collision_ends_the_session() {
        let mut s = state();
        s.spawn(arrival("AA1", 20.0, 10.0, 8000.0)).unwrap();
        s.spawn(arrival("AA2", 20.05, 10.0, 8050.0)).unwrap();

        let events = s.run_tick();
        assert!(events
            .iter()
            .any(|e| matches!(e, SimEvent::Collision { .. })));
        assert_eq!(s.phase, SessionPhase::Ended);
        assert!(s.score.collision);
        assert_eq!(
            s.end_reason(),
            Some(&EndReason::Collision {
                first: "AA1".to_string(),
                second: "AA2".to_string()
            })
        );
        assert_eq!(s.submit("AA1 C 5"), Err(CommandError::SessionOver));

        let tick = s.clock.tick();
        s.run_tick();
        assert_eq!(s.clock.tick(), tick);
    }

    #[test]
    fn exits_are_counted_and_removed() {
        let mut s = state();
        let mut spawn = arrival("AA1", 39.99, 0.0, 8000.0);
        spawn.heading = 90.0;
        s.spawn(spawn).unwrap();
        for _ in 0..100 {
            s.run_tick();
        }
        assert!(s.registry.is_empty());
        assert_eq!(s.score.improper_exits, 1);
    }

    #[tokio::test]
    async fn handle_round_trip() {
        let airport = Arc::new(Airport::embedded_default().unwrap());
        let settings = SessionSettings {
            traffic: TrafficConfig {
                rate_per_min: 0.0,
                ..TrafficConfig::default()
            },
            ..SessionSettings::default()
        };
        let (session, handle) = SimSession::new(Uuid::new_v4(), airport, settings);
        let mut rx = handle.subscribe();
        let task = tokio::spawn(session.run());

        let reply = assert_ok!(handle.submit("XX1 C 5").await);
        assert_eq!(
            reply,
            CommandReply::Rejected {
                code: "unknown_aircraft".to_string(),
                message: "Unknown aircraft XX1".to_string(),
            }
        );

        assert_ok!(handle.toggle_fast_forward().await);
        assert_ok!(handle.shutdown().await);

        let score = assert_ok!(task.await);
        assert_eq!(score.landings, 0);

        let mut saw_end = false;
        while let Ok(msg) = rx.try_recv() {
            if let SimMsg::SessionEnd { reason, .. } = msg {
                assert_eq!(reason, EndReason::Shutdown);
                saw_end = true;
            }
        }
        assert!(saw_end);

        assert_err!(handle.submit("XX1 C 5").await);
    }

    #[tokio::test]
    async fn every_frame_publishes_a_snapshot() {
        let airport = Arc::new(Airport::embedded_default().unwrap());
        let (session, handle) =
            SimSession::new(Uuid::new_v4(), airport, SessionSettings::default());
        let mut rx = handle.subscribe();
        let task = tokio::spawn(session.run());

        let mut ticks = Vec::new();
        while ticks.len() < 3 {
            let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
            if let SimMsg::Snapshot { tick, .. } = assert_ok!(assert_ok!(msg)) {
                ticks.push(tick);
            }
        }
        assert_eq!(ticks, vec![ticks[0], ticks[0] + 1, ticks[0] + 2]);

        assert_ok!(handle.shutdown().await);
        assert_ok!(task.await);
    }
}
