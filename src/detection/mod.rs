/// 检测记录 (Detection Records)
///
/// - types: 单帧最佳检测 + 边距 + 帧记录
/// - log:   JSONL 检测日志 (每帧一行)
pub mod log;
pub mod types;

pub use self::log::DetectionLog;
pub use types::{Detection, EdgeDistances, FrameRecord};
