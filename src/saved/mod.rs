//! Saved query set.
//!
//! A bounded, ordered collection of named, colored, geometry-snapshotted
//! comparison queries. Capacity is hard-enforced at five; the user frees a
//! slot explicitly, nothing is ever evicted. Every geometry that enters the
//! set — on save and on check-in — is deep-cloned, so no saved snapshot
//! aliases a live editable geometry.

use chrono::Utc;
use tracing::info;

use crate::config::MAX_SAVED_QUERIES;
use crate::model::{
    Geometry, Graphic, GraphicId, Rgba, SavedMethod, SavedQuery, SavedQueryId,
    SavedQuerySummary, Symbol,
};
use crate::{Error, Result};

/// Ordered set of saved comparison queries.
pub struct SavedQuerySet {
    entries: Vec<SavedQuery>,
    palette: Vec<Rgba>,
    /// Total successful saves over the set's lifetime. Drives both default
    /// labels and palette assignment, so colors depend on insertion order
    /// alone — deletions never reshuffle them.
    inserted_total: u64,
    next_id: u64,
}

impl SavedQuerySet {
    pub fn new(palette: Vec<Rgba>) -> Self {
        assert!(!palette.is_empty(), "palette must have at least one color");
        Self { entries: Vec::new(), palette, inserted_total: 0, next_id: 1 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the save action should be disabled.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_SAVED_QUERIES
    }

    pub fn get(&self, id: SavedQueryId) -> Option<&SavedQuery> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn get_mut(&mut self, id: SavedQueryId) -> Option<&mut SavedQuery> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Persist a region as a new saved query.
    ///
    /// Rejected with [`Error::CapacityExceeded`] once the set holds
    /// [`MAX_SAVED_QUERIES`] entries. The geometry is deep-cloned; mutating
    /// the source afterwards does not touch the snapshot.
    pub fn save(
        &mut self,
        geometry: &Geometry,
        method: SavedMethod,
        population: f64,
        graphic_id: GraphicId,
    ) -> Result<&SavedQuery> {
        if self.is_full() {
            return Err(Error::CapacityExceeded { limit: MAX_SAVED_QUERIES });
        }

        let color = self.palette[(self.inserted_total as usize) % self.palette.len()];
        let label = format!("Query {}", self.inserted_total + 1);
        let id = SavedQueryId(self.next_id);
        self.next_id += 1;
        self.inserted_total += 1;

        let entry = SavedQuery {
            id,
            label,
            color,
            method,
            geometry: geometry.clone(),
            population,
            graphic: Graphic::new(graphic_id, geometry.clone(), Symbol::region(color)),
            checked_out: false,
            created_at: Utc::now(),
        };
        info!(%id, method = %entry.method.description(), "saved query created");
        self.entries.push(entry);
        Ok(self.entries.last().expect("just pushed"))
    }

    /// Remove an entry. Unknown ids are a no-op; remaining entries keep
    /// their labels and colors.
    pub fn remove(&mut self, id: SavedQueryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        let removed = self.entries.len() != before;
        if removed {
            info!(%id, "saved query removed");
        }
        removed
    }

    /// Rename an entry in place. Empty labels are a no-op.
    pub fn relabel(&mut self, id: SavedQueryId, label: &str) -> bool {
        if label.trim().is_empty() {
            return false;
        }
        match self.get_mut(id) {
            Some(entry) => {
                entry.label = label.to_string();
                true
            }
            None => false,
        }
    }

    /// Lend an entry's geometry to the edit session. The entry keeps its
    /// slot but leaves the render set until checked back in. Returns `None`
    /// for unknown or already checked-out ids.
    pub fn check_out(&mut self, id: SavedQueryId) -> Option<Geometry> {
        let entry = self.get_mut(id)?;
        if entry.checked_out {
            return None;
        }
        entry.checked_out = true;
        Some(entry.geometry.clone())
    }

    /// Return a checked-out entry with its edited geometry. The snapshot is
    /// replaced (deep clone), the graphic reverts to the saved look.
    pub fn check_in(&mut self, id: SavedQueryId, geometry: &Geometry) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.geometry = geometry.clone();
                entry.graphic.geometry = geometry.clone();
                entry.graphic.symbol = Symbol::region(entry.color);
                entry.checked_out = false;
                true
            }
            None => false,
        }
    }

    /// Refresh a stored population after an edit re-query.
    pub fn set_population(&mut self, id: SavedQueryId, value: f64) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.population = value;
                true
            }
            None => false,
        }
    }

    /// Ordered projection for the presentation layer.
    pub fn summaries(&self) -> Vec<SavedQuerySummary> {
        self.entries
            .iter()
            .map(|e| SavedQuerySummary {
                id: e.id,
                label: e.label.clone(),
                color: e.color,
                population: e.population,
                method_description: e.method.description(),
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SavedQuery> {
        self.entries.iter()
    }

    /// Graphics currently in the render set (checked-out entries excluded).
    pub fn render_graphics_mut(&mut self) -> impl Iterator<Item = &mut Graphic> {
        self.entries
            .iter_mut()
            .filter(|e| !e.checked_out)
            .map(|e| &mut e.graphic)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    fn square(offset: f64) -> Geometry {
        crate::geom::from_ring([
            Coord { x: offset, y: 0.0 },
            Coord { x: offset + 1.0, y: 0.0 },
            Coord { x: offset + 1.0, y: 1.0 },
            Coord { x: offset, y: 1.0 },
        ])
        .unwrap()
    }

    fn palette() -> Vec<Rgba> {
        crate::config::SessionConfig::default().palette
    }

    fn fill(set: &mut SavedQuerySet, n: usize) -> Vec<SavedQueryId> {
        (0..n)
            .map(|i| {
                set.save(
                    &square(i as f64),
                    SavedMethod::Polygon,
                    100.0 * i as f64,
                    GraphicId(i as u64 + 100),
                )
                .unwrap()
                .id
            })
            .collect()
    }

    #[test]
    fn test_capacity_is_hard() {
        let mut set = SavedQuerySet::new(palette());
        fill(&mut set, 5);
        assert!(set.is_full());

        let err = set.save(&square(9.0), SavedMethod::Polygon, 0.0, GraphicId(999));
        assert!(matches!(err, Err(Error::CapacityExceeded { limit: 5 })));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_colors_follow_insertion_order_across_deletions() {
        let mut set = SavedQuerySet::new(palette());
        let ids = fill(&mut set, 3);
        // delete the middle entry, then insert two more
        set.remove(ids[1]);
        let fourth = set
            .save(&square(4.0), SavedMethod::Polygon, 0.0, GraphicId(104))
            .unwrap()
            .color;
        let fifth = set
            .save(&square(5.0), SavedMethod::Polygon, 0.0, GraphicId(105))
            .unwrap()
            .color;

        let pal = palette();
        // 4th and 5th insertions get palette slots 3 and 4 regardless of the
        // deletion in between
        assert_eq!(fourth, pal[3]);
        assert_eq!(fifth, pal[4]);
    }

    #[test]
    fn test_sixth_insertion_wraps_palette() {
        let mut set = SavedQuerySet::new(palette());
        let ids = fill(&mut set, 5);
        set.remove(ids[0]);
        let sixth = set
            .save(&square(6.0), SavedMethod::Polygon, 0.0, GraphicId(106))
            .unwrap();
        assert_eq!(sixth.color, palette()[0]);
        assert_eq!(sixth.label, "Query 6");
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut set = SavedQuerySet::new(palette());
        fill(&mut set, 2);
        assert!(!set.remove(SavedQueryId(999)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_relabel_empty_is_noop() {
        let mut set = SavedQuerySet::new(palette());
        let ids = fill(&mut set, 1);
        assert!(!set.relabel(ids[0], "   "));
        assert_eq!(set.get(ids[0]).unwrap().label, "Query 1");

        assert!(set.relabel(ids[0], "CBD"));
        assert_eq!(set.get(ids[0]).unwrap().label, "CBD");
    }

    #[test]
    fn test_check_out_hides_from_render_set() {
        let mut set = SavedQuerySet::new(palette());
        let ids = fill(&mut set, 2);

        assert!(set.check_out(ids[0]).is_some());
        // double check-out is refused
        assert!(set.check_out(ids[0]).is_none());
        assert_eq!(set.render_graphics_mut().count(), 1);

        let edited = square(42.0);
        assert!(set.check_in(ids[0], &edited));
        assert_eq!(set.render_graphics_mut().count(), 2);
        assert_eq!(set.get(ids[0]).unwrap().geometry, edited);
    }

    #[test]
    fn test_saved_snapshot_is_clone_isolated() {
        let mut set = SavedQuerySet::new(palette());
        let mut live = square(0.0);
        let id = set
            .save(&live, SavedMethod::Polygon, 50.0, GraphicId(1))
            .unwrap()
            .id;

        let snapshot_before = set.get(id).unwrap().geometry.clone();
        // mutate the still-live geometry
        live = square(99.0);
        assert_ne!(live, snapshot_before);
        assert_eq!(set.get(id).unwrap().geometry, snapshot_before);
    }
}
