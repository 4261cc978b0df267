/*!
# DENM Simulator

Deterministic discrete-event harness for the alert services. One thread, one
virtual clock, one shared radio medium. Given the same scenario, seed and
configuration a run produces the same BLAKE3 digest, which the CLI checks for
replay validation.

## Key Components:
- **Radio medium:** single-hop range, geo-area delivery, latency, jitter, loss
- **Mobility:** straight-line kinematics standing in for the traffic simulator
- **Ground truth tracker:** perfect perception within the sensor range
- **Scenarios:** YAML files plus four built-ins, one per alert family

## Tick order
1. Deliver due frames to receivers and relays.
2. Append every vehicle to the speed log.
3. Trigger sender services.
4. Trigger receivers.
5. Propagate this tick's transmissions.
6. Move vehicles and obstacles, advance the clock.
*/

use std::collections::BTreeMap;
use std::sync::Arc;

use blake3::Hasher;
use tracing::{debug, info};

use denm_config::DenmConfig;
use denm_core::identity::IdentityRegistry;
use denm_core::station::StationId;
use denm_core::time::{secs_to_ns, VirtualClock};
use denm_core::vehicle::VehicleController;
use denm_engine::{
    AlertReceiverService, AlertService, CollisionWarningService, DrowsinessDetectionService,
    Facilities, LaneChangeWarningService, ReceiveOutcome, RelayService, SpeedMonitoringService,
    TelemetrySinks,
};

pub mod error;
pub mod mobility;
pub mod network_simulation;
pub mod radio;
pub mod report;
pub mod scenario;

pub use error::ScenarioError;
pub use mobility::{GroundTruthTracker, Obstacle, SharedSpeedLog, SimVehicle};
pub use radio::{Delivery, RadioMedium, RadioNode, RadioStats};
pub use report::{ReactionRecord, SentAlert, SimulationReport};
pub use scenario::{AlertFamily, Scenario};

use network_simulation::LinkModel;

struct VehicleNode {
    vehicle: SimVehicle,
    senders: Vec<Box<dyn AlertService>>,
    receivers: Vec<AlertReceiverService>,
}

/// Everything a service constructor needs besides the vehicle spec.
struct ServiceFactory<'a> {
    config: &'a DenmConfig,
    telemetry: &'a TelemetrySinks,
    identities: &'a Arc<IdentityRegistry>,
    /// One feed per speed monitor, so each drains only its own copy.
    speed_feeds: Vec<SharedSpeedLog>,
    seed: u64,
}

impl ServiceFactory<'_> {
    fn sender(
        &mut self,
        family: AlertFamily,
        vehicle: &SimVehicle,
    ) -> Result<Box<dyn AlertService>, ScenarioError> {
        let detection = &self.config.detection;
        let id = vehicle.mobility_id();
        let telemetry = self.telemetry.clone();
        let service: Box<dyn AlertService> = match family {
            AlertFamily::Collision => Box::new(CollisionWarningService::new(
                detection.estimator.clone(),
                &detection.collision,
                telemetry,
                id,
            )?),
            AlertFamily::Drowsiness => Box::new(DrowsinessDetectionService::new(
                detection.drowsiness.clone(),
                self.seed ^ u64::from(vehicle.station_id().raw()),
                telemetry,
            )),
            AlertFamily::LaneChange => Box::new(LaneChangeWarningService::new(
                detection.estimator.clone(),
                detection.lane_change.clone(),
                telemetry,
                id,
            )?),
            AlertFamily::Speed => {
                let feed = SharedSpeedLog::default();
                self.speed_feeds.push(feed.clone());
                Box::new(SpeedMonitoringService::new(
                    detection.speed.clone(),
                    Box::new(feed),
                    Arc::clone(self.identities),
                    telemetry,
                    id,
                )?)
            }
        };
        Ok(service)
    }

    fn receiver(
        &self,
        family: AlertFamily,
        vehicle: &SimVehicle,
    ) -> Result<AlertReceiverService, ScenarioError> {
        Ok(AlertReceiverService::new(
            family.cause(),
            &self.config.receiver,
            self.config.reaction.clone(),
            self.telemetry.clone(),
            vehicle.mobility_id(),
        )?)
    }
}

/// The Simulator ties together the virtual clock, the radio medium and the
/// per-vehicle services of one scenario.
pub struct Simulator {
    scenario: String,
    seed: u64,
    clock: VirtualClock,
    tick_ns: u64,
    ticks: u64,
    sensor_range_m: f64,
    vehicles: Vec<VehicleNode>,
    relays: Vec<RelayService>,
    obstacles: Vec<Obstacle>,
    medium: RadioMedium,
    speed_feeds: Vec<SharedSpeedLog>,
    pub state_hasher: Hasher,
    sent: Vec<SentAlert>,
    reactions: Vec<ReactionRecord>,
    outcomes: BTreeMap<&'static str, u64>,
}

impl Simulator {
    /// Build every station of `scenario`. Scenario fields override the
    /// `simulator` section of `config`.
    pub fn new(
        scenario: &Scenario,
        config: &DenmConfig,
        telemetry: TelemetrySinks,
    ) -> Result<Self, ScenarioError> {
        scenario.validate()?;
        let sim = &config.simulator;
        let seed = scenario.seed.unwrap_or(sim.seed);
        let tick_s = scenario.tick_s.unwrap_or(sim.tick_s);
        let ticks = scenario.ticks.unwrap_or(sim.ticks);
        let network = scenario.network.as_ref().unwrap_or(&sim.network);

        let identities = Arc::new(match &config.identity.store {
            Some(path) => IdentityRegistry::with_store(path)?,
            None => IdentityRegistry::in_memory(),
        });
        let mut factory = ServiceFactory {
            config,
            telemetry: &telemetry,
            identities: &identities,
            speed_feeds: Vec::new(),
            seed,
        };

        let mut vehicles = Vec::with_capacity(scenario.vehicles.len());
        for spec in &scenario.vehicles {
            let station = StationId(spec.station);
            identities.identity_register(&spec.id, station)?;
            let vehicle = SimVehicle::new(station, &spec.id, spec.position, spec.speed, spec.heading)
                .with_lane(spec.lane)
                .with_emergency(spec.emergency);

            let senders = spec
                .sends
                .iter()
                .map(|family| factory.sender(*family, &vehicle))
                .collect::<Result<Vec<_>, _>>()?;
            let receivers = spec
                .receives
                .iter()
                .map(|family| factory.receiver(*family, &vehicle))
                .collect::<Result<Vec<_>, _>>()?;
            debug!(
                vehicle = %spec.id,
                station = %station,
                senders = senders.len(),
                receivers = receivers.len(),
                "Vehicle ready"
            );
            vehicles.push(VehicleNode {
                vehicle,
                senders,
                receivers,
            });
        }

        let speed_feeds = factory.speed_feeds;

        let relays = scenario
            .relays
            .iter()
            .map(|spec| {
                RelayService::new(
                    StationId(spec.station),
                    spec.position,
                    config.relay.clone(),
                    telemetry.clone(),
                )
            })
            .collect();
        let obstacles = scenario
            .obstacles
            .iter()
            .map(|spec| Obstacle {
                id: spec.id.clone(),
                position: spec.position,
                speed: spec.speed,
                heading: spec.heading,
            })
            .collect();

        let link = LinkModel::from_config(network, seed)?;
        Ok(Self {
            scenario: scenario.name.clone(),
            seed,
            clock: VirtualClock::default(),
            tick_ns: secs_to_ns(tick_s),
            ticks,
            sensor_range_m: sim.sensor_range_m,
            vehicles,
            relays,
            obstacles,
            medium: RadioMedium::new(link, network.radio_range_m, sim.event_bus_capacity),
            speed_feeds,
            state_hasher: Hasher::new(),
            sent: Vec::new(),
            reactions: Vec::new(),
            outcomes: BTreeMap::new(),
        })
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn vehicle(&self, mobility_id: &str) -> Option<&SimVehicle> {
        self.vehicles
            .iter()
            .map(|node| &node.vehicle)
            .find(|vehicle| vehicle.mobility_id() == mobility_id)
    }

    /// Advance the whole scene by one tick.
    pub fn step(&mut self) {
        let now_ns = self.clock.now_ns();
        let now = self.clock.now_secs();

        for delivery in self.medium.due(now_ns) {
            self.delivery_dispatch(now, delivery);
        }

        if !self.speed_feeds.is_empty() {
            for node in &self.vehicles {
                let line = node.vehicle.speed_log_line(now);
                for feed in &self.speed_feeds {
                    feed.line_append(&line);
                }
            }
        }

        self.senders_trigger(now);

        for node in &mut self.vehicles {
            for receiver in &mut node.receivers {
                receiver.trigger(now, &mut node.vehicle);
            }
        }

        let radio_nodes: Vec<RadioNode> = self
            .vehicles
            .iter()
            .map(|node| RadioNode {
                station: node.vehicle.station_id(),
                position: node.vehicle.position(),
            })
            .chain(self.relays.iter().map(|relay| {
                let origin = relay.origin();
                RadioNode {
                    station: origin.station,
                    position: origin.position,
                }
            }))
            .collect();
        self.medium
            .propagate(now_ns, &radio_nodes, &mut self.state_hasher);

        for node in &mut self.vehicles {
            let vehicle = &node.vehicle;
            self.state_hasher.update(&vehicle.station_id().raw().to_le_bytes());
            self.state_hasher.update(&vehicle.position().x.to_bits().to_le_bytes());
            self.state_hasher.update(&vehicle.position().y.to_bits().to_le_bytes());
            self.state_hasher.update(&vehicle.speed().to_bits().to_le_bytes());
            node.vehicle.advance(tick_secs(self.tick_ns));
        }
        for obstacle in &mut self.obstacles {
            obstacle.advance(tick_secs(self.tick_ns));
        }
        self.clock.advance(self.tick_ns);
    }

    fn senders_trigger(&mut self, now: f64) {
        let scene: Vec<(String, _)> = self
            .vehicles
            .iter()
            .map(|node| (node.vehicle.mobility_id().to_string(), node.vehicle.position()))
            .chain(self.obstacles.iter().map(|o| (o.id.clone(), o.position)))
            .collect();

        for node in &mut self.vehicles {
            if node.senders.is_empty() {
                continue;
            }
            let host_id = node.vehicle.mobility_id().to_string();
            let tracker = GroundTruthTracker::observe(
                scene.iter().map(|(id, position)| (id.as_str(), *position)),
                &host_id,
                node.vehicle.position(),
                self.sensor_range_m,
                now,
            );
            for sender in &mut node.senders {
                let mut ctx = Facilities {
                    now,
                    vehicle: Some(&mut node.vehicle),
                    tracker: Some(&tracker),
                    transport: &mut self.medium,
                };
                for alert in sender.trigger(&mut ctx) {
                    self.sent.push(SentAlert {
                        time: now,
                        sender: host_id.clone(),
                        alert,
                    });
                }
            }
        }
    }

    fn delivery_dispatch(&mut self, now: f64, delivery: Delivery) {
        self.state_hasher.update(&delivery.receiver.raw().to_le_bytes());
        self.state_hasher.update(&delivery.payload);

        if let Some(node) = self
            .vehicles
            .iter_mut()
            .find(|node| node.vehicle.station_id() == delivery.receiver)
        {
            for receiver in &mut node.receivers {
                let outcome = receiver.indicate(
                    now,
                    &delivery.indication,
                    &delivery.payload,
                    &mut node.vehicle,
                );
                let label = outcome.action().map_or("Dropped", |action| action.label());
                *self.outcomes.entry(label).or_default() += 1;

                if let ReceiveOutcome::Reacted(reaction) = outcome {
                    let sender = receiver
                        .retained()
                        .map_or(delivery.indication.source_station, |alert| alert.station_id);
                    self.reactions.push(ReactionRecord {
                        time: now,
                        vehicle: node.vehicle.mobility_id().to_string(),
                        family: receiver.cause().family(),
                        sender,
                        action: reaction.action,
                        previous_speed: reaction.previous_speed,
                        new_speed: reaction.new_speed,
                    });
                }
            }
            return;
        }

        if let Some(relay) = self
            .relays
            .iter_mut()
            .find(|relay| relay.origin().station == delivery.receiver)
        {
            let decision = relay.indicate(&delivery.indication, &delivery.payload, &mut self.medium);
            debug!(relay = %delivery.receiver, ?decision, "Relay decision");
        }
    }

    /// Run the configured number of ticks and report.
    pub fn run(&mut self) -> SimulationReport {
        info!(
            scenario = %self.scenario,
            seed = self.seed,
            ticks = self.ticks,
            vehicles = self.vehicles.len(),
            relays = self.relays.len(),
            "Simulation started"
        );
        for _ in 0..self.ticks {
            self.step();
        }
        let report = self.report();
        info!(
            digest = %report.digest,
            sent = report.sent.len(),
            reactions = report.reactions.len(),
            "Simulation finished"
        );
        report
    }

    /// Snapshot of everything observed so far.
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            scenario: self.scenario.clone(),
            seed: self.seed,
            ticks: self.ticks,
            sent: self.sent.clone(),
            reactions: self.reactions.clone(),
            outcomes: self.outcomes.clone(),
            relayed: self.relays.iter().map(RelayService::forwarded).sum(),
            radio: self.medium.stats(),
            final_speeds: self
                .vehicles
                .iter()
                .map(|node| (node.vehicle.mobility_id().to_string(), node.vehicle.speed()))
                .collect(),
            digest: hex::encode(self.state_hasher.finalize().as_bytes()),
        }
    }
}

fn tick_secs(tick_ns: u64) -> f64 {
    tick_ns as f64 / 1_000_000_000.0
}
