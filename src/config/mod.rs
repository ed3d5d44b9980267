pub mod region;
pub mod simulation;

pub use region::RegionParams;
pub use simulation::SimulationConfig;
