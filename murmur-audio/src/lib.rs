pub mod levels;
pub mod recorder;

pub use recorder::CpalRecorder;
