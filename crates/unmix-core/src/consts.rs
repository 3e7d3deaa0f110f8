/// Suffix appended to the image path when no explicit sidecar path is given.
pub const SIDECAR_SUFFIX: &str = ".umxjson";

/// Default number of joint-histogram bins for the mutual-information metric.
pub const DEFAULT_BINS: usize = 256;

/// Default number of coordinate-descent cycles in the unmixing engine.
pub const DEFAULT_CYCLES: usize = 40;

/// Default step decay for the unmixing engine (0 = no decay).
pub const DEFAULT_BETA: f64 = 0.0;

/// Default coordinate-descent step size for off-diagonal matrix entries.
pub const DEFAULT_GAMMA: f64 = 0.1;

/// Default pairwise similarity metric.
pub const DEFAULT_MODE: &str = "ssim";

/// Lower display-range percentile, computed on the raw selected region.
pub const RANGE_LOW_PERCENTILE: f64 = 2.0;

/// Upper display-range percentile, computed on the raw selected region.
pub const RANGE_HIGH_PERCENTILE: f64 = 98.0;

/// Percentile of each channel plane treated as its background baseline.
pub const BACKGROUND_PERCENTILE: f64 = 1.0;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-12;
