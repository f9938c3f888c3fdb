pub mod completion;
pub mod ffmpeg;
pub mod pipeline;
pub mod reaper;
pub mod sweeper;
pub mod transcoder;
