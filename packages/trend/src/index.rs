//! Immutable input dataset and its per-entity index.

use std::collections::BTreeMap;

use household_trends_trend_models::{Entity, EntityKey, Observation};

/// The fully materialized input: every entity seen and every valid
/// observation.
///
/// Entities whose indicator cells were all missing still appear in
/// `entities`, so they still get an output row.
#[derive(Debug, Clone, Default)]
pub struct ObservationSet {
    entities: Vec<Entity>,
    observations: Vec<Observation>,
}

impl ObservationSet {
    #[must_use]
    pub const fn new(entities: Vec<Entity>, observations: Vec<Observation>) -> Self {
        Self {
            entities,
            observations,
        }
    }

    /// Builds a set from observations alone, without pass-through
    /// coordinates.
    #[must_use]
    pub fn from_observations(observations: Vec<Observation>) -> Self {
        Self::new(Vec::new(), observations)
    }

    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }
}

/// Map from composite entity key to the positions of that entity's
/// observations, in input order. Built once per batch.
#[derive(Debug, Clone, Default)]
pub struct ObservationIndex {
    by_entity: BTreeMap<EntityKey, Vec<usize>>,
}

impl ObservationIndex {
    #[must_use]
    pub fn build(set: &ObservationSet) -> Self {
        let mut by_entity: BTreeMap<EntityKey, Vec<usize>> = set
            .entities()
            .iter()
            .map(|entity| (entity.key.clone(), Vec::new()))
            .collect();

        for (position, observation) in set.observations().iter().enumerate() {
            by_entity
                .entry(observation.entity.clone())
                .or_default()
                .push(position);
        }

        Self { by_entity }
    }

    /// Entity keys in composite-key order.
    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.by_entity.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_entity.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty()
    }

    /// Observation positions for `key`; empty if the key is unknown.
    #[must_use]
    pub fn positions(&self, key: &EntityKey) -> &[usize] {
        self.by_entity.get(key).map_or(&[][..], Vec::as_slice)
    }
}

/// One entity's observations, borrowed from an [`ObservationSet`].
#[derive(Debug, Clone, Copy)]
pub struct EntityView<'a> {
    set: &'a ObservationSet,
    positions: &'a [usize],
}

impl<'a> EntityView<'a> {
    #[must_use]
    pub fn new(set: &'a ObservationSet, index: &'a ObservationIndex, key: &EntityKey) -> Self {
        Self {
            set,
            positions: index.positions(key),
        }
    }

    fn observations(&self) -> impl Iterator<Item = &'a Observation> + use<'a> {
        let set = self.set;
        self.positions.iter().map(move |&p| &set.observations()[p])
    }

    /// `(year, value)` points of `indicator` within `start..=end`, sorted by
    /// year.
    #[must_use]
    pub fn series(&self, indicator: &str, start: i32, end: i32) -> Vec<(i32, f64)> {
        let mut points: Vec<(i32, f64)> = self
            .observations()
            .filter(|o| o.indicator == indicator && (start..=end).contains(&o.year))
            .map(|o| (o.year, o.value))
            .collect();
        points.sort_by_key(|&(year, _)| year);
        points
    }

    /// The first observed value of `indicator` in `year`.
    #[must_use]
    pub fn value_at(&self, indicator: &str, year: i32) -> Option<f64> {
        self.observations()
            .find(|o| o.indicator == indicator && o.year == year)
            .map(|o| o.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(name: &str, county: &str, year: i32, indicator: &str, value: f64) -> Observation {
        Observation {
            entity: EntityKey::new(name, "01", county),
            year,
            indicator: indicator.to_string(),
            value,
        }
    }

    fn sample() -> ObservationSet {
        let entities = vec![
            Entity {
                key: EntityKey::new("Baldwin County", "01", "003"),
                latitude: Some(30.66),
                longitude: None,
            },
            Entity {
                key: EntityKey::new("Empty County", "01", "999"),
                latitude: None,
                longitude: None,
            },
        ];
        let observations = vec![
            obs("Baldwin County", "003", 2011, "married", 30.0),
            obs("Autauga County", "001", 2009, "married", 10.0),
            obs("Baldwin County", "003", 2009, "married", 20.0),
            obs("Baldwin County", "003", 2009, "unmarried", 5.0),
            obs("Baldwin County", "003", 2030, "married", 99.0),
        ];
        ObservationSet::new(entities, observations)
    }

    #[test]
    fn index_covers_entities_without_observations() {
        let set = sample();
        let index = ObservationIndex::build(&set);
        assert_eq!(index.len(), 3);

        let names: Vec<&str> = index.keys().map(|k| k.name.as_str()).collect();
        assert_eq!(names, ["Autauga County", "Baldwin County", "Empty County"]);

        let empty = EntityKey::new("Empty County", "01", "999");
        assert!(index.positions(&empty).is_empty());
    }

    #[test]
    fn series_is_filtered_and_sorted() {
        let set = sample();
        let index = ObservationIndex::build(&set);
        let view = EntityView::new(&set, &index, &EntityKey::new("Baldwin County", "01", "003"));

        assert_eq!(view.series("married", 2009, 2023), vec![(2009, 20.0), (2011, 30.0)]);
        assert_eq!(view.series("unmarried", 2009, 2023), vec![(2009, 5.0)]);
        assert!(view.series("other", 2009, 2023).is_empty());
    }

    #[test]
    fn value_lookup_by_year() {
        let set = sample();
        let index = ObservationIndex::build(&set);
        let view = EntityView::new(&set, &index, &EntityKey::new("Baldwin County", "01", "003"));

        assert_eq!(view.value_at("married", 2011), Some(30.0));
        assert_eq!(view.value_at("married", 2010), None);
    }

    #[test]
    fn unknown_entity_has_no_data() {
        let set = sample();
        let index = ObservationIndex::build(&set);
        let view = EntityView::new(&set, &index, &EntityKey::new("Nowhere", "99", "000"));
        assert!(view.series("married", 2009, 2023).is_empty());
    }
}
