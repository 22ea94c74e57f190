use crate::graph::Target;

/// Errors raised while running a frame through the compositor.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A render target could not be (re)allocated at the requested size.
    #[error("failed to allocate {width}x{height} render targets: {reason}")]
    TargetAllocation {
        width: u32,
        height: u32,
        reason: String,
    },

    /// The presentation surface had no texture to render into this frame.
    #[error("surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// A pass read a target that no earlier pass wrote.
    #[error("pass `{pass}` reads {target:?} before any pass writes it")]
    MissingInput { pass: &'static str, target: Target },

    /// A pass program was given the wrong number of inputs.
    #[error("pass `{pass}` expects {expected} inputs, got {actual}")]
    InputCount {
        pass: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl RenderError {
    /// Errors that cost one frame rather than the renderer.
    pub fn skips_frame(&self) -> bool {
        matches!(
            self,
            RenderError::TargetAllocation { .. } | RenderError::SurfaceUnavailable(_)
        )
    }
}
