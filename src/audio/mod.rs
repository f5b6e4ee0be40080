pub mod frame;

pub use frame::{FrameCodec, Frames, RemainderPolicy, WireFrame, DEFAULT_FRAME_SIZE};
