/// 视频输入系统 (Video Input System)
///
/// - probe:           输入视频探测 (分辨率/帧率/帧数)
/// - annotate_filter: ez-ffmpeg 帧过滤器, 在编码前原地标注每一帧
pub mod annotate_filter;
pub mod probe;

pub use annotate_filter::{AnnotateFilter, FrameCounters};
pub use probe::VideoInfo;
