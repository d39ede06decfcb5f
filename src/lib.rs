// ABOUTME: Library module for the slide-bridge program.
// ABOUTME: Contains the markdown analysis, composition and deck assembly pipeline.

// Reexport modules
pub mod assemble;
pub mod classify;
pub mod compose;
pub mod config;
pub mod errors;
pub mod pptx;
pub mod records;
pub mod render;
pub mod router;
pub mod segment;
pub mod syntax;
pub mod utils;

// Reexport common types and functions
pub use assemble::{Assembler, AssemblyMode, AssemblyReport, Branding};
pub use classify::{classify, Classifier, ContentCategory, ContentRequirement, DecisionList};
pub use compose::{available_themes, compose, DirectiveConfig};
pub use config::{Config, Palette, RgbColor};
pub use errors::{BridgeError, Result, Stage};
pub use pptx::{LayoutKind, PptxConfig, Presentation};
pub use records::{build_records, SlideKind, SlideRecord};
pub use render::{MarpCli, OutputFormat, SlideRenderer};
pub use router::{ConversionOutput, Mode, RouteState, Router, RouterConfig};
pub use segment::{segment, BoundaryKind, SlideBoundary};
