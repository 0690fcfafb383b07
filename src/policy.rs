//! Target-size computation for the batch resize pipeline.

/// The active resizing rule. Exactly one variant is in effect at a time;
/// the numeric parameter comes straight from the user.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResizePolicy {
    /// Scale both dimensions by a percentage. Values above 100 enlarge.
    Percentage(u32),
    /// Fit the longer side to this many pixels, preserving aspect ratio.
    AbsoluteMax(u32),
}

impl ResizePolicy {
    /// Compute the target dimensions for an image of `width` x `height`.
    ///
    /// Pure integer math, flooring divisions. Inputs and outputs are clamped
    /// to a minimum of 1 so a degenerate source or an aggressive parameter
    /// can never produce a zero-sized target.
    #[must_use]
    pub fn target(self, width: u32, height: u32) -> (u32, u32) {
        let w = u64::from(width.max(1));
        let h = u64::from(height.max(1));
        let (tw, th) = match self {
            ResizePolicy::Percentage(pct) => {
                let pct = u64::from(pct);
                (w * pct / 100, h * pct / 100)
            }
            ResizePolicy::AbsoluteMax(max_dim) => {
                let m = u64::from(max_dim);
                if w > h {
                    (m, h * m / w)
                } else {
                    // Ties land here on purpose: a square becomes m x m
                    (w * m / h, m)
                }
            }
        };
        (clamp_dim(tw), clamp_dim(th))
    }
}

impl std::fmt::Display for ResizePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResizePolicy::Percentage(pct) => write!(f, "{pct}%"),
            ResizePolicy::AbsoluteMax(max_dim) => write!(f, "max {max_dim}px"),
        }
    }
}

fn clamp_dim(dim: u64) -> u32 {
    u32::try_from(dim.max(1)).unwrap_or(u32::MAX)
}
