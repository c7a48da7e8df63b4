pub mod helpers;

use std::sync::Arc;

use crate::domain::bitrate::Bitrate;
use crate::domain::connection::Connection;
use crate::domain::demand::DemandMatrix;
use crate::domain::network::Network;
use crate::error::{Error, Result};

/// An allocation policy.
///
/// `exec` receives a deep snapshot of the live network together with a value
/// copy of the demand matrix; the policy may mutate both freely to check
/// feasibility. Only the connections pushed into `new_connections` reach the
/// live network — the controller commits them in emission order, so every
/// returned connection must already be feasible: a contiguous slot range on a
/// consistent (core, band, mode) across all hops of one route.
pub trait Allocator {
    fn name(&self) -> &str;

    fn exec(
        &mut self,
        network: &mut Network,
        demands: &mut DemandMatrix,
        bitrates: &[Arc<Bitrate>],
        existing_connections: &[Connection],
        new_connections: &mut Vec<Connection>,
    ) -> Result<()>;
}

/// Placeholder policy installed by default; it cannot provision anything.
#[derive(Debug, Default)]
pub struct NullAllocator;

impl Allocator for NullAllocator {
    fn name(&self) -> &str {
        "None"
    }

    fn exec(
        &mut self,
        _network: &mut Network,
        _demands: &mut DemandMatrix,
        _bitrates: &[Arc<Bitrate>],
        _existing_connections: &[Connection],
        _new_connections: &mut Vec<Connection>,
    ) -> Result<()> {
        Err(Error::Conflict(
            "no allocation policy is set; install one before provisioning".to_string(),
        ))
    }
}
