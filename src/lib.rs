//! # anim-sampler
//!
//! Animation sampling for scene exporters.
//!
//! Given a scene with objects, armatures, cameras, lights and materials, the
//! sampler decides which frames need evaluation, records local matrices and
//! property snapshots per frame, works out which objects are animated through
//! constraint chains, and rebuilds per-channel keyframe curves from the
//! recorded samples.
//!
//! ## Modules
//!
//! - [`util`] - Errors and math helpers
//! - [`core`] - Frames, samples and the sample store
//! - [`scene`] - Scene interface, skeletons and an in-memory scene
//! - [`curve`] - Channel keys and animation curves
//! - [`sampler`] - Sampling pass, animation classification and curve extraction
//!
//! ## Example
//!
//! ```ignore
//! use anim_sampler::prelude::*;
//!
//! let mut scene = MemoryScene::load("shot.json")?;
//! let objects: Vec<ObjectId> = scene.object_ids().collect();
//!
//! let mut sampler = AnimationSampler::new();
//! for &object in &objects {
//!     sampler.register_object(&scene, object);
//! }
//! sampler.run_sampling_pass(&mut scene, &SamplingOptions::default());
//!
//! for object in classify_animated(&scene, &objects) {
//!     let mut curves = sampler.build_curve_map(&scene, object);
//!     sampler.populate_curves(object, &mut curves, ExportMode::Sample);
//! }
//! ```

pub mod util;
pub mod core;
pub mod scene;
pub mod curve;
pub mod sampler;

// Re-export commonly used types
pub use util::{Error, Result};
pub use sampler::AnimationSampler;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::core::{compute_sample_frames, Frame, FrameRange, FrameSet, Sample, SampleStore};
    pub use crate::scene::{BoneId, ChannelScope, MemoryScene, ObjectId, ObjectKind, SceneContext, Skeleton};
    pub use crate::curve::{AnimationCurve, CurveKey, CurveKind, CurveMap};
    pub use crate::sampler::{
        classify_animated, has_animations, has_any_animations, value_set, AnimationSampler, ExportMode,
        ExportSettings, SamplingOptions,
    };
}
