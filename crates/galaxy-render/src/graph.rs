//! Explicit description of the passes that make up one frame.
//!
//! A [`FramePlan`] is plain data: an ordered list of [`Pass`] values. The
//! executors in [`crate::software`] and [`crate::gpu_compositor`] interpret
//! it; neither decides the order on its own.

use crate::bloom::BloomConfig;
use crate::effects::{AberrationParams, GrainParams};
use crate::error::RenderError;
use crate::layers::{LayerMask, RenderLayer};

/// Render targets owned by an executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    Bloom,
    Overlay,
    Base,
    /// Merged HDR result.
    Composite,
    /// Final display-referred output.
    Screen,
}

impl Target {
    pub const COUNT: usize = 5;

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// What a pass does.
#[derive(Clone, Debug, PartialEq)]
pub enum Program {
    /// Clear the output to transparent black.
    Clear,
    /// Clear the output, then draw every drawable whose mask intersects the filter.
    Scene,
    /// Replace the input with its bloom glow.
    BloomFilter(BloomConfig),
    ChromaticAberration(AberrationParams),
    VintageGrain(GrainParams),
    /// Inputs: base, bloom, overlay.
    Merge,
    /// Tone map with exposure.
    Present { exposure: f32 },
}

impl Program {
    fn input_count(&self) -> usize {
        match self {
            Program::Clear | Program::Scene => 0,
            Program::Merge => 3,
            _ => 1,
        }
    }
}

/// One step of the frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Pass {
    pub label: &'static str,
    /// Layers drawn by a [`Program::Scene`] pass.
    pub filter: Option<LayerMask>,
    pub program: Program,
    pub inputs: Vec<Target>,
    pub output: Target,
}

impl Pass {
    fn scene(label: &'static str, layer: RenderLayer, output: Target) -> Self {
        Self {
            label,
            filter: Some(LayerMask::single(layer)),
            program: Program::Scene,
            inputs: Vec::new(),
            output,
        }
    }

    fn filter(label: &'static str, program: Program, target: Target) -> Self {
        Self {
            label,
            filter: None,
            program,
            inputs: vec![target],
            output: target,
        }
    }
}

/// Knobs that shape the plan.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositorSettings {
    pub bloom: BloomConfig,
    pub aberration: Option<AberrationParams>,
    pub grain: Option<GrainParams>,
    pub exposure: f32,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            bloom: BloomConfig::default(),
            aberration: None,
            grain: None,
            exposure: 0.5,
        }
    }
}

/// Ordered passes for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FramePlan {
    passes: Vec<Pass>,
}

impl FramePlan {
    /// Clear, bloom layer + filter, overlay layer, base layer + cosmetics,
    /// merge, present.
    pub fn layered(settings: &CompositorSettings) -> Self {
        let mut passes = vec![
            Pass {
                label: "clear",
                filter: None,
                program: Program::Clear,
                inputs: Vec::new(),
                output: Target::Screen,
            },
            Pass::scene("bloom-scene", RenderLayer::Bloom, Target::Bloom),
            Pass::filter(
                "bloom-filter",
                Program::BloomFilter(settings.bloom.clone()),
                Target::Bloom,
            ),
            Pass::scene("overlay-scene", RenderLayer::Overlay, Target::Overlay),
            Pass::scene("base-scene", RenderLayer::Base, Target::Base),
        ];
        if let Some(params) = settings.aberration {
            passes.push(Pass::filter(
                "chromatic-aberration",
                Program::ChromaticAberration(params),
                Target::Base,
            ));
        }
        if let Some(params) = settings.grain {
            passes.push(Pass::filter(
                "vintage-grain",
                Program::VintageGrain(params),
                Target::Base,
            ));
        }
        passes.push(Pass {
            label: "merge",
            filter: None,
            program: Program::Merge,
            inputs: vec![Target::Base, Target::Bloom, Target::Overlay],
            output: Target::Composite,
        });
        passes.push(Pass {
            label: "present",
            filter: None,
            program: Program::Present {
                exposure: settings.exposure,
            },
            inputs: vec![Target::Composite],
            output: Target::Screen,
        });
        Self { passes }
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// Check that every pass reads only targets written earlier in the frame
    /// and has the input count its program expects.
    pub fn validate(&self) -> Result<(), RenderError> {
        let mut written = [false; Target::COUNT];
        for pass in &self.passes {
            let expected = pass.program.input_count();
            if pass.inputs.len() != expected {
                return Err(RenderError::InputCount {
                    pass: pass.label,
                    expected,
                    actual: pass.inputs.len(),
                });
            }
            if let Some(missing) = pass.inputs.iter().find(|t| !written[t.index()]) {
                return Err(RenderError::MissingInput {
                    pass: pass.label,
                    target: *missing,
                });
            }
            written[pass.output.index()] = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(plan: &FramePlan) -> Vec<&'static str> {
        plan.passes().iter().map(|p| p.label).collect()
    }

    #[test]
    fn test_default_plan_order() {
        let plan = FramePlan::layered(&CompositorSettings::default());
        assert_eq!(
            labels(&plan),
            vec![
                "clear",
                "bloom-scene",
                "bloom-filter",
                "overlay-scene",
                "base-scene",
                "merge",
                "present"
            ]
        );
        plan.validate().unwrap();
    }

    #[test]
    fn test_cosmetic_passes_run_on_base_before_merge() {
        let settings = CompositorSettings {
            aberration: Some(AberrationParams { offset: 0.002, intensity: 1.0 }),
            grain: Some(GrainParams { grain_intensity: 0.05, color_shift: 0.3 }),
            ..Default::default()
        };
        let plan = FramePlan::layered(&settings);
        let names = labels(&plan);
        let base = names.iter().position(|l| *l == "base-scene").unwrap();
        let aberration = names.iter().position(|l| *l == "chromatic-aberration").unwrap();
        let grain = names.iter().position(|l| *l == "vintage-grain").unwrap();
        let merge = names.iter().position(|l| *l == "merge").unwrap();
        assert!(base < aberration && aberration < grain && grain < merge);
        for pass in &plan.passes()[aberration..=grain] {
            assert_eq!(pass.output, Target::Base);
            assert_eq!(pass.inputs, vec![Target::Base]);
        }
        plan.validate().unwrap();
    }

    #[test]
    fn test_scene_passes_filter_one_layer() {
        let plan = FramePlan::layered(&CompositorSettings::default());
        let scenes: Vec<_> = plan
            .passes()
            .iter()
            .filter(|p| p.program == Program::Scene)
            .map(|p| (p.filter.unwrap(), p.output))
            .collect();
        assert_eq!(
            scenes,
            vec![
                (LayerMask::BLOOM, Target::Bloom),
                (LayerMask::OVERLAY, Target::Overlay),
                (LayerMask::BASE, Target::Base),
            ]
        );
    }

    #[test]
    fn test_validate_rejects_read_before_write() {
        let plan = FramePlan {
            passes: vec![Pass {
                label: "present",
                filter: None,
                program: Program::Present { exposure: 1.0 },
                inputs: vec![Target::Composite],
                output: Target::Screen,
            }],
        };
        assert!(matches!(
            plan.validate(),
            Err(RenderError::MissingInput { target: Target::Composite, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_wrong_input_count() {
        let plan = FramePlan {
            passes: vec![Pass {
                label: "merge",
                filter: None,
                program: Program::Merge,
                inputs: vec![],
                output: Target::Composite,
            }],
        };
        assert!(matches!(
            plan.validate(),
            Err(RenderError::InputCount { expected: 3, actual: 0, .. })
        ));
    }
}
