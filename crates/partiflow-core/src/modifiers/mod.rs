//! # Built-in Modifiers
//!
//! Concrete pipeline stages. The selection and transformation modifiers are
//! delegating modifiers that dispatch per element kind through a
//! [`DelegateRegistry`](crate::engine::delegate::DelegateRegistry); slicing
//! works on particles only, and cluster analysis defers its neighbor search
//! to a compute engine.

pub mod affine_transformation;
pub mod clear_selection;
pub mod cluster_analysis;
pub mod invert_selection;
pub mod slice;

pub use affine_transformation::{AffineTransformationModifier, AffineTransformationParams};
pub use clear_selection::{ClearSelectionModifier, ClearSelectionParams};
pub use cluster_analysis::{ClusterAnalysisModifier, ClusterAnalysisParams};
pub use invert_selection::{InvertSelectionModifier, InvertSelectionParams};
pub use slice::{SliceModifier, SliceParams};

use crate::engine::modifier::share;
use crate::engine::registry::ModifierClass;

/// Classes of all built-in modifiers, in their canonical listing order.
pub fn builtin_classes() -> Vec<ModifierClass> {
    vec![
        ModifierClass {
            type_name: ClearSelectionModifier::TYPE_NAME,
            display_name: "Clear selection",
            description: "Removes the selection of particles or bonds.",
            factory: || share(ClearSelectionModifier::default()),
        },
        ModifierClass {
            type_name: InvertSelectionModifier::TYPE_NAME,
            display_name: "Invert selection",
            description: "Selects all unselected elements and deselects the selected ones.",
            factory: || share(InvertSelectionModifier::default()),
        },
        ModifierClass {
            type_name: AffineTransformationModifier::TYPE_NAME,
            display_name: "Affine transformation",
            description: "Applies a linear transformation and translation to particle positions.",
            factory: || share(AffineTransformationModifier::default()),
        },
        ModifierClass {
            type_name: SliceModifier::TYPE_NAME,
            display_name: "Slice",
            description: "Deletes or selects the particles on one side of a plane or inside a slab.",
            factory: || share(SliceModifier::default()),
        },
        ModifierClass {
            type_name: ClusterAnalysisModifier::TYPE_NAME,
            display_name: "Cluster analysis",
            description: "Groups particles into clusters of neighbors closer than a cutoff.",
            factory: || share(ClusterAnalysisModifier::default()),
        },
    ]
}
