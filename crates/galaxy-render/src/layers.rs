//! Render layer tags.
//!
//! Every drawable carries a [`LayerMask`]; each scene pass draws only the
//! drawables whose mask contains the pass's layer.

/// One of the three compositor layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RenderLayer {
    /// Drawn untouched, then merged with the bloom result.
    Base = 0,
    /// Bright-passed and blurred before merging.
    Bloom = 1,
    /// Composited over the merge by its own alpha.
    Overlay = 2,
}

impl RenderLayer {
    pub const ALL: [RenderLayer; 3] = [RenderLayer::Base, RenderLayer::Bloom, RenderLayer::Overlay];

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Set of layers a drawable is visible to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct LayerMask(u8);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const BASE: LayerMask = LayerMask::single(RenderLayer::Base);
    pub const BLOOM: LayerMask = LayerMask::single(RenderLayer::Bloom);
    pub const OVERLAY: LayerMask = LayerMask::single(RenderLayer::Overlay);
    pub const BASE_AND_BLOOM: LayerMask = LayerMask(RenderLayer::Base.bit() | RenderLayer::Bloom.bit());

    pub const fn single(layer: RenderLayer) -> Self {
        LayerMask(layer.bit())
    }

    #[must_use]
    pub const fn with(self, layer: RenderLayer) -> Self {
        LayerMask(self.0 | layer.bit())
    }

    pub const fn contains(self, layer: RenderLayer) -> bool {
        self.0 & layer.bit() != 0
    }

    /// True if any layer in `other` is also in `self`.
    pub const fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl From<RenderLayer> for LayerMask {
    fn from(layer: RenderLayer) -> Self {
        LayerMask::single(layer)
    }
}
