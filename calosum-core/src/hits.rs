//! Raw per-layer hit data and the hit-collection lookup seam.
//!
//! Sensitive-detector hit recording is not part of this crate. Whatever
//! records hits hands them over as [`HitCollection`]s, one per subdetector,
//! reachable by collection name through a [`HitSource`].

use crate::detector::DetectorConfig;
use crate::Subdetector;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Raw deposited energy per cell, one list per layer, in layer order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct HitCollection {
    layers: Vec<Vec<f64>>,
}

impl HitCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Creates `layers` layers of `cells` zero-energy cells.
    #[must_use]
    pub fn zeroed(layers: usize, cells: usize) -> Self {
        Self {
            layers: vec![vec![0.0; cells]; layers],
        }
    }

    /// Appends a layer.
    pub fn push_layer(&mut self, cells: Vec<f64>) {
        self.layers.push(cells);
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if the collection holds no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Raw cell values of one layer.
    #[must_use]
    pub fn layer(&self, index: usize) -> Option<&[f64]> {
        self.layers.get(index).map(Vec::as_slice)
    }

    /// Mutable raw cell values of one layer.
    pub fn layer_mut(&mut self, index: usize) -> Option<&mut [f64]> {
        self.layers.get_mut(index).map(Vec::as_mut_slice)
    }

    /// Iterates over the layers in order.
    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.layers.iter().map(Vec::as_slice)
    }

    /// Total raw energy over all cells and layers.
    #[must_use]
    pub fn raw_energy(&self) -> f64 {
        self.layers.iter().flatten().sum()
    }
}

impl FromIterator<Vec<f64>> for HitCollection {
    fn from_iter<I: IntoIterator<Item = Vec<f64>>>(iter: I) -> Self {
        Self {
            layers: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Vec<f64>>> for HitCollection {
    fn from(layers: Vec<Vec<f64>>) -> Self {
        Self { layers }
    }
}

/// Lookup of an event's hit collections by name.
pub trait HitSource {
    /// Returns the collection registered under `name`, if any.
    fn collection(&self, name: &str) -> Option<&HitCollection>;
}

impl HitSource for HashMap<String, HitCollection> {
    fn collection(&self, name: &str) -> Option<&HitCollection> {
        self.get(name)
    }
}

/// Owned set of one event's hit collections.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EventHits {
    collections: HashMap<String, HitCollection>,
}

impl EventHits {
    /// Creates an event with no collections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates zero-energy collections for every subdetector of `config`.
    #[must_use]
    pub fn zeroed(config: &DetectorConfig) -> Self {
        let collections = Subdetector::ALL
            .iter()
            .map(|&d| {
                let sub = config.subdetector(d);
                (
                    sub.collection.clone(),
                    HitCollection::zeroed(sub.layers, sub.cells),
                )
            })
            .collect();
        Self { collections }
    }

    /// Registers a collection, replacing any previous one with that name.
    pub fn insert(&mut self, name: impl Into<String>, collection: HitCollection) {
        self.collections.insert(name.into(), collection);
    }

    /// Builder form of [`EventHits::insert`].
    #[must_use]
    pub fn with_collection(mut self, name: impl Into<String>, collection: HitCollection) -> Self {
        self.insert(name, collection);
        self
    }

    /// Removes a collection.
    pub fn remove(&mut self, name: &str) -> Option<HitCollection> {
        self.collections.remove(name)
    }

    /// Mutable access to a collection.
    pub fn collection_mut(&mut self, name: &str) -> Option<&mut HitCollection> {
        self.collections.get_mut(name)
    }

    /// Iterates over `(name, collection)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HitCollection)> {
        self.collections.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Returns true if no collection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

impl HitSource for EventHits {
    fn collection(&self, name: &str) -> Option<&HitCollection> {
        self.collections.get(name)
    }
}
