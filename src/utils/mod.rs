/// 工具模块
/// Utility modules
pub mod yuv;

pub use yuv::{chroma_size, rgb_to_yuv420p, yuv420p_to_rgb, Yuv420pPlanes, Yuv420pPlanesMut};
