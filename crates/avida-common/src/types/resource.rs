//! Resource definitions and quantity vectors
//!
//! Resources are identified by their position in the environment's ordered
//! resource list. Every quantity vector in the engine uses that ordering.

use serde::{Deserialize, Serialize};

use crate::error::ResourceError;

/// Spatial layout of a resource in the live world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceGeometry {
    /// One well-mixed pool for the whole world
    #[default]
    Global,
    /// One pool per grid cell
    Spatial,
    /// One pool per deme
    Deme,
}

/// Accounting scope a resource query or modification targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceScope {
    /// Ambient resources visible to the organism
    Global,
    /// The organism's own cell
    Cell,
    /// The organism's deme
    Deme,
    /// The cell the organism is facing
    FacedCell,
    /// The organism's avatar cell
    Avatar,
    /// The point-in-time snapshot the test started from
    Frozen,
}

impl ResourceScope {
    /// All scopes, in reporting order
    pub const ALL: [ResourceScope; 6] = [
        ResourceScope::Global,
        ResourceScope::Cell,
        ResourceScope::Deme,
        ResourceScope::FacedCell,
        ResourceScope::Avatar,
        ResourceScope::Frozen,
    ];

    /// Short lowercase name used in genome text and dumps
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceScope::Global => "global",
            ResourceScope::Cell => "cell",
            ResourceScope::Deme => "deme",
            ResourceScope::FacedCell => "faced",
            ResourceScope::Avatar => "avatar",
            ResourceScope::Frozen => "frozen",
        }
    }

    /// Parse the short name produced by [`ResourceScope::as_str`]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scope| scope.as_str() == name)
    }
}

impl std::fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of one named resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDef {
    /// Resource name (unique within an environment)
    pub name: String,
    /// Starting quantity
    pub initial: f64,
    /// Quantity added per update
    #[serde(default)]
    pub inflow: f64,
    /// Fraction removed per update (0.0 - 1.0)
    #[serde(default)]
    pub outflow: f64,
    /// Spatial layout in the live world
    #[serde(default)]
    pub geometry: ResourceGeometry,
}

impl ResourceDef {
    /// Create a global resource with no inflow or outflow
    pub fn new(name: impl Into<String>, initial: f64) -> Self {
        Self {
            name: name.into(),
            initial: initial.max(0.0),
            inflow: 0.0,
            outflow: 0.0,
            geometry: ResourceGeometry::Global,
        }
    }

    /// Set per-update inflow and outflow
    pub fn with_flow(mut self, inflow: f64, outflow: f64) -> Self {
        self.inflow = inflow;
        self.outflow = outflow.clamp(0.0, 1.0);
        self
    }

    /// Set geometry
    pub fn with_geometry(mut self, geometry: ResourceGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Apply one update of inflow/outflow dynamics to a quantity
    #[inline]
    pub fn step(&self, quantity: f64) -> f64 {
        (quantity * (1.0 - self.outflow) + self.inflow).max(0.0)
    }
}

/// Ordered per-resource quantity vector
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceLevels(Vec<f64>);

impl ResourceLevels {
    /// Create a vector of `len` zero quantities
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    /// Build levels from raw quantities, clipping negatives to zero
    pub fn from_clipped(values: impl IntoIterator<Item = f64>) -> Self {
        Self(values.into_iter().map(|v| v.max(0.0)).collect())
    }

    /// Number of resources
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no resources are tracked
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Quantity of one resource (zero when out of range)
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    /// Iterate quantities in resource order
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    /// Borrow raw quantities
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Add a delta vector, clipping every component at zero
    pub fn apply_delta(&mut self, delta: &[f64]) -> Result<(), ResourceError> {
        if delta.len() != self.0.len() {
            return Err(ResourceError::LengthMismatch {
                expected: self.0.len(),
                actual: delta.len(),
            });
        }
        for (level, change) in self.0.iter_mut().zip(delta) {
            *level = (*level + change).max(0.0);
        }
        Ok(())
    }

    /// Mutable access for dynamics updates; callers must keep values non-negative
    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.0
    }

    /// Apply one update of each definition's dynamics
    pub fn step_with(&mut self, defs: &[ResourceDef]) {
        for (level, def) in self.values_mut().iter_mut().zip(defs) {
            *level = def.step(*level);
        }
    }

    /// Check that every component is non-negative
    pub fn is_non_negative(&self) -> bool {
        self.0.iter().all(|v| *v >= 0.0)
    }
}

impl From<Vec<f64>> for ResourceLevels {
    fn from(values: Vec<f64>) -> Self {
        Self::from_clipped(values)
    }
}

impl std::fmt::Display for ResourceLevels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:.3}", v)?;
        }
        f.write_str("]")
    }
}
