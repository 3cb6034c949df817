//! Proptest strategies for pickleview property-based testing
//!
//! Reusable strategies for step text segmentation inputs and Cucumber
//! messages, shared by the segment, query and render crates.

pub mod strategies;

pub use strategies::{
    SegmentedStepCase, strategy_group, strategy_match_group, strategy_segmented_step,
    strategy_status, strategy_test_step_result,
};
