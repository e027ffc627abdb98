//! Highlight animation.
//!
//! A periodic tick that lays a marching dashed outline over the
//! drawn-region and saved-query graphics. The animation is purely cosmetic:
//! the first time a graphic is seen, its plain style is captured as a
//! baseline, and every later restyle is derived from that baseline — so
//! re-styling any number of times never drifts from the original colors,
//! and a graphic can be restored to its plain look at any moment.

use hashbrown::HashMap;

use crate::config::HighlightConfig;
use crate::model::{DashPattern, DashStyle, Graphic, GraphicId, Rgba, Symbol};

/// The plain style of a graphic, captured exactly once per graphic
/// lifetime. Source of truth for every animated restyle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightBaseline {
    pub fill: Rgba,
    pub outline: Rgba,
    pub outline_width: f32,
}

impl HighlightBaseline {
    fn capture(symbol: &Symbol) -> Self {
        Self {
            fill: symbol.fill,
            outline: symbol.outline,
            outline_width: symbol.outline_width,
        }
    }

    /// The graphic's plain (non-animated) symbol.
    pub fn plain(&self) -> Symbol {
        Symbol {
            fill: self.fill,
            outline: self.outline,
            outline_width: self.outline_width,
            dash: None,
        }
    }

    /// The dashed in-comparison symbol at a given animation phase.
    pub fn animated(&self, pattern: DashPattern, offset: f32) -> Symbol {
        Symbol {
            fill: self.fill,
            outline: self.outline,
            outline_width: self.outline_width,
            dash: Some(DashStyle { pattern, offset }),
        }
    }
}

/// Drives the marching-dash outline over comparison graphics.
pub struct HighlightAnimator {
    offset: f32,
    step: f32,
    pattern: DashPattern,
    baselines: HashMap<GraphicId, HighlightBaseline>,
}

impl HighlightAnimator {
    pub fn new(config: &HighlightConfig) -> Self {
        Self {
            offset: 0.0,
            step: config.step,
            pattern: config.dash,
            baselines: HashMap::new(),
        }
    }

    /// Current dash offset, always in `[0, pattern.total())`.
    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn baseline(&self, id: GraphicId) -> Option<&HighlightBaseline> {
        self.baselines.get(&id)
    }

    /// One timer tick: advance the offset accumulator modulo the pattern
    /// length, then restyle every graphic currently in comparison.
    pub fn tick<'a>(&mut self, graphics: impl IntoIterator<Item = &'a mut Graphic>) {
        self.offset = (self.offset + self.step) % self.pattern.total();
        for graphic in graphics {
            self.apply(graphic);
        }
    }

    /// Restyle one graphic at the current offset. The baseline is captured
    /// on first sight only — an existing baseline is never overwritten.
    pub fn apply(&mut self, graphic: &mut Graphic) {
        let baseline = self
            .baselines
            .entry(graphic.id)
            .or_insert_with(|| HighlightBaseline::capture(&graphic.symbol));
        graphic.symbol = baseline.animated(self.pattern, self.offset);
    }

    /// Put a graphic back in its plain style. No-op for graphics the
    /// animator has never seen.
    pub fn restore(&mut self, graphic: &mut Graphic) {
        if let Some(baseline) = self.baselines.get(&graphic.id) {
            graphic.symbol = baseline.plain();
        }
    }

    /// Drop the baseline of a removed graphic.
    pub fn forget(&mut self, id: GraphicId) {
        self.baselines.remove(&id);
    }
}

/// A tokio interval matching the configured tick rate. Hosts drive
/// [`crate::Session::tick`] from this.
pub fn interval(config: &HighlightConfig) -> tokio::time::Interval {
    tokio::time::interval(std::time::Duration::from_millis(config.tick_ms.max(1)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom;
    use geo::Point;
    use proptest::prelude::*;

    fn graphic(id: u64) -> Graphic {
        Graphic::new(
            GraphicId(id),
            geom::geodesic_buffer(Point::new(174.0, -36.0), 1.0),
            Symbol::editable(),
        )
    }

    fn animator() -> HighlightAnimator {
        HighlightAnimator::new(&HighlightConfig::default())
    }

    #[test]
    fn test_offset_wraps_at_pattern_total() {
        let mut anim = animator();
        for _ in 0..100 {
            anim.tick(std::iter::empty::<&mut Graphic>());
            assert!(anim.offset() >= 0.0 && anim.offset() < 12.0);
        }
    }

    #[test]
    fn test_baseline_captured_once() {
        let mut anim = animator();
        let mut g = graphic(1);
        let original = g.symbol;

        anim.tick([&mut g]);
        let first_baseline = *anim.baseline(g.id).unwrap();
        assert_eq!(first_baseline.plain(), original);

        // many more ticks over the already-animated graphic: the baseline
        // must not re-capture the dashed style
        for _ in 0..10 {
            anim.tick([&mut g]);
        }
        assert_eq!(*anim.baseline(g.id).unwrap(), first_baseline);
        assert!(g.symbol.dash.is_some());
        assert_eq!(g.symbol.fill, original.fill);
        assert_eq!(g.symbol.outline, original.outline);
    }

    #[test]
    fn test_restore_reproduces_plain_style() {
        let mut anim = animator();
        let mut g = graphic(2);
        let original = g.symbol;

        anim.tick([&mut g]);
        assert_ne!(g.symbol, original);

        anim.restore(&mut g);
        assert_eq!(g.symbol, original);
    }

    #[test]
    fn test_animated_restyle_is_idempotent_at_same_offset() {
        let mut anim = animator();
        let mut g = graphic(3);

        anim.tick([&mut g]);
        let styled_once = g.symbol;
        // re-apply at the same accumulator value, no tick in between
        anim.apply(&mut g);
        assert_eq!(g.symbol, styled_once);
    }

    #[test]
    fn test_forget_drops_baseline() {
        let mut anim = animator();
        let mut g = graphic(4);
        anim.tick([&mut g]);
        assert!(anim.baseline(g.id).is_some());
        anim.forget(g.id);
        assert!(anim.baseline(g.id).is_none());
    }

    proptest! {
        #[test]
        fn prop_offset_stays_in_cycle(steps in proptest::collection::vec(0.1f32..6.0, 1..200)) {
            let mut anim = animator();
            for step in steps {
                anim.step = step;
                anim.tick(std::iter::empty::<&mut Graphic>());
                prop_assert!(anim.offset() >= 0.0);
                prop_assert!(anim.offset() < 12.0);
            }
        }
    }
}
