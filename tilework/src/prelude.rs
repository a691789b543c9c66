//! Commonly used types and traits.
//!
//! ```rust,ignore
//! use tilework::prelude::*;
//! ```

// Rasters
pub use crate::{Raster, RasterSize, Sample, SampleDepth};

// Pipeline
pub use crate::{ErrorPolicy, Pipeline, PipelineConfig, PipelineError, PipelineOutput};

// Extension points
pub use crate::{DiagnosticSink, HistogramConfig, RasterAccess, TileTransform};
