pub mod alloc;
pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;
pub mod math;
pub mod sim;

pub use crate::alloc::{Allocator, NullAllocator};
pub use crate::domain::bitrate::{Bitrate, ModulationFormat};
pub use crate::domain::connection::{Connection, Hop, SlotRange};
pub use crate::domain::demand::{Demand, DemandMatrix};
pub use crate::domain::fiber::{Band, Fiber, FiberType, FREE_SLOT};
pub use crate::domain::link::{Link, LinkId};
pub use crate::domain::network::Network;
pub use crate::domain::node::{Node, NodeId};
pub use crate::domain::p2p::P2P;
pub use crate::domain::route::{PathsTable, Route};
pub use crate::error::{Error, Result};
pub use crate::sim::controller::Controller;
pub use crate::sim::simulator::Simulator;
