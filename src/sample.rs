//! Deterministic demo station.

use jiff::Span;
use jiff::civil::Date;

use crate::action_log::Actor;
use crate::model::{Astronaut, Container, Item, Zone};
use crate::placement::{PlannerConfig, place_items};
use crate::simulation::{SimulationError, SimulationState};
use crate::types::Vec3;
use crate::waste;

struct SeedContainer {
    id: &'static str,
    zone: Zone,
    dims: (f64, f64, f64),
}

struct SeedItem {
    name: &'static str,
    dims: (f64, f64, f64),
    mass: f64,
    priority: u8,
    zone: Zone,
    /// Days after the start date, if the item expires
    expires_in: Option<i64>,
    usage_limit: Option<u32>,
    usage_count: u32,
}

const CONTAINERS: &[SeedContainer] = &[
    SeedContainer { id: "contCQ1", zone: Zone::CrewQuarters, dims: (100.0, 65.0, 125.0) },
    SeedContainer { id: "contAL1", zone: Zone::Airlock, dims: (125.0, 100.0, 125.0) },
    SeedContainer { id: "contLB1", zone: Zone::Laboratory, dims: (160.0, 100.0, 175.0) },
    SeedContainer { id: "contSB1", zone: Zone::StorageBay, dims: (250.0, 175.0, 250.0) },
    SeedContainer { id: "contMB1", zone: Zone::MedicalBay, dims: (115.0, 90.0, 135.0) },
    SeedContainer { id: "contCC1", zone: Zone::CommandCenter, dims: (100.0, 75.0, 110.0) },
];

const ITEMS: &[SeedItem] = &[
    SeedItem { name: "Food Packet", dims: (10.0, 10.0, 20.0), mass: 5.0, priority: 80, zone: Zone::CrewQuarters, expires_in: Some(45), usage_limit: Some(30), usage_count: 4 },
    SeedItem { name: "Water Container", dims: (20.0, 20.0, 30.0), mass: 10.0, priority: 90, zone: Zone::CrewQuarters, expires_in: Some(120), usage_limit: Some(50), usage_count: 12 },
    SeedItem { name: "Oxygen Cylinder", dims: (15.0, 15.0, 50.0), mass: 30.0, priority: 95, zone: Zone::Airlock, expires_in: None, usage_limit: Some(100), usage_count: 0 },
    SeedItem { name: "First Aid Kit", dims: (20.0, 20.0, 10.0), mass: 2.0, priority: 100, zone: Zone::MedicalBay, expires_in: Some(200), usage_limit: Some(5), usage_count: 1 },
    SeedItem { name: "Tool Box", dims: (25.0, 20.0, 15.0), mass: 8.0, priority: 70, zone: Zone::StorageBay, expires_in: None, usage_limit: Some(200), usage_count: 30 },
    SeedItem { name: "Experiment Sample", dims: (15.0, 15.0, 10.0), mass: 1.0, priority: 85, zone: Zone::Laboratory, expires_in: Some(3), usage_limit: Some(1), usage_count: 0 },
    SeedItem { name: "Laptop", dims: (35.0, 25.0, 3.0), mass: 2.0, priority: 75, zone: Zone::CommandCenter, expires_in: None, usage_limit: None, usage_count: 0 },
    SeedItem { name: "Camera", dims: (10.0, 8.0, 5.0), mass: 1.0, priority: 60, zone: Zone::Laboratory, expires_in: None, usage_limit: Some(500), usage_count: 20 },
    SeedItem { name: "Medical Supplies", dims: (25.0, 20.0, 20.0), mass: 4.0, priority: 90, zone: Zone::MedicalBay, expires_in: Some(30), usage_limit: Some(10), usage_count: 9 },
    SeedItem { name: "Emergency Beacon", dims: (10.0, 10.0, 20.0), mass: 2.0, priority: 100, zone: Zone::Airlock, expires_in: None, usage_limit: Some(10), usage_count: 0 },
    SeedItem { name: "Air Filter", dims: (30.0, 30.0, 10.0), mass: 3.0, priority: 90, zone: Zone::Airlock, expires_in: Some(0), usage_limit: Some(30), usage_count: 28 },
    SeedItem { name: "Battery Pack", dims: (20.0, 15.0, 10.0), mass: 5.0, priority: 85, zone: Zone::StorageBay, expires_in: None, usage_limit: Some(100), usage_count: 100 },
];

pub fn astronauts() -> Vec<Astronaut> {
    [
        ("ast1", "Alex Morrison", "Commander"),
        ("ast2", "Sarah Chen", "Flight Engineer"),
        ("ast3", "Dmitri Petrov", "Science Officer"),
        ("ast4", "Jessica Webb", "Medical Officer"),
    ]
    .into_iter()
    .map(|(id, name, role)| Astronaut {
        id: id.to_string(),
        name: name.to_string(),
        role: role.to_string(),
        avatar: "/placeholder.svg".to_string(),
    })
    .collect()
}

/// Builds the demo station at `start_date`.
///
/// Items are stowed through the placement engine. Seed data that is already
/// expired or used up on `start_date` is flagged as waste right away.
pub fn sample_state(start_date: Date, config: PlannerConfig) -> Result<SimulationState, SimulationError> {
    let mut state = SimulationState::new(start_date, config).with_astronauts(astronauts());

    let containers = CONTAINERS
        .iter()
        .map(|seed| {
            let (w, d, h) = seed.dims;
            Container::new(seed.id, seed.zone, Vec3::new(w, d, h))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut items = Vec::with_capacity(ITEMS.len());
    for (index, seed) in ITEMS.iter().enumerate() {
        let (w, d, h) = seed.dims;
        let mut item = Item::new(
            format!("item{:03}", index + 1),
            seed.name,
            Vec3::new(w, d, h),
            seed.mass,
            seed.priority,
            seed.zone,
        )?
        .with_usage(seed.usage_limit, seed.usage_count);
        if let Some(days) = seed.expires_in {
            item = item.with_expiry(start_date.checked_add(Span::new().try_days(days)?)?);
        }
        items.push(item);
    }

    let system = Actor::system();
    place_items(&mut state, items, containers, &system)?;
    waste::sweep(&mut state, &system);
    Ok(state)
}
