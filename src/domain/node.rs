use crate::error::{Error, Result};

pub type NodeId = usize;

/// A network node: dense id plus optional descriptive attributes.
///
/// Optional attributes distinguish "unknown" from any legal value: reading
/// one that was never written yields `Error::NotSet`.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    label: Option<String>,
    dcs: Option<u32>,
    ixps: Option<u32>,
    population: Option<f64>,
    longitude: Option<f64>,
    latitude: Option<f64>,
    param1: Option<f64>,
    param2: Option<f64>,
    degree: Option<usize>,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Node {
            id,
            label: None,
            dcs: None,
            ixps: None,
            population: None,
            longitude: None,
            latitude: None,
            param1: None,
            param2: None,
            degree: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    pub fn label(&self) -> Result<&str> {
        self.label.as_deref().ok_or(Error::NotSet("label"))
    }

    /// The label if present, without raising `NotSet`.
    pub fn label_opt(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_dcs(&mut self, dcs: u32) {
        self.dcs = Some(dcs);
    }

    /// Number of data centers attached to this node.
    pub fn dcs(&self) -> Result<u32> {
        self.dcs.ok_or(Error::NotSet("number of DCs"))
    }

    pub fn set_ixps(&mut self, ixps: u32) {
        self.ixps = Some(ixps);
    }

    /// Number of Internet exchange points attached to this node.
    pub fn ixps(&self) -> Result<u32> {
        self.ixps.ok_or(Error::NotSet("number of IXPs"))
    }

    pub fn set_population(&mut self, population: f64) {
        self.population = Some(population);
    }

    pub fn population(&self) -> Result<f64> {
        self.population.ok_or(Error::NotSet("population"))
    }

    pub fn set_longitude(&mut self, longitude: f64) -> Result<()> {
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::InvalidArgument(
                "longitude must be between -180 and 180 degrees".to_string(),
            ));
        }
        self.longitude = Some(longitude);
        Ok(())
    }

    pub fn longitude(&self) -> Result<f64> {
        self.longitude.ok_or(Error::NotSet("longitude"))
    }

    pub fn set_latitude(&mut self, latitude: f64) -> Result<()> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::InvalidArgument(
                "latitude must be between -90 and 90 degrees".to_string(),
            ));
        }
        self.latitude = Some(latitude);
        Ok(())
    }

    pub fn latitude(&self) -> Result<f64> {
        self.latitude.ok_or(Error::NotSet("latitude"))
    }

    pub fn set_param1(&mut self, param1: f64) {
        self.param1 = Some(param1);
    }

    pub fn param1(&self) -> Result<f64> {
        self.param1.ok_or(Error::NotSet("parameter 1"))
    }

    pub fn set_param2(&mut self, param2: f64) {
        self.param2 = Some(param2);
    }

    pub fn param2(&self) -> Result<f64> {
        self.param2.ok_or(Error::NotSet("parameter 2"))
    }

    /// Out-degree, written by the network during path computation.
    pub(crate) fn set_degree(&mut self, degree: usize) {
        self.degree = Some(degree);
    }

    pub fn degree(&self) -> Result<usize> {
        self.degree.ok_or(Error::NotSet("node degree"))
    }
}
