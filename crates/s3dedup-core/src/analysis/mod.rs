pub mod duplicates;
pub mod media;
pub mod rename_plan;
pub mod retention;
pub mod suspects;
