/// 最佳检测选择 (Best Detection Selector)
/// 职责: 候选框 → 置信度最高的一个 → Detection (类别名 + 边距)
use crate::detection::{Detection, EdgeDistances};
use crate::Bbox;

/// 取置信度最高且不低于阈值的候选框, 同分取第一个
pub fn select_best(boxes: &[Bbox], conf_threshold: f32) -> Option<&Bbox> {
    boxes
        .iter()
        .filter(|b| b.confidence() >= conf_threshold)
        .fold(None, |best: Option<&Bbox>, b| match best {
            Some(best) if best.confidence() >= b.confidence() => Some(best),
            _ => Some(b),
        })
}

/// 类别名, 缺失时回退为id字符串
pub fn class_name(names: &[String], id: usize) -> String {
    names.get(id).cloned().unwrap_or_else(|| id.to_string())
}

/// 候选框 → 检测记录
pub fn build_detection(
    frame_index: u64,
    bbox: &Bbox,
    names: &[String],
    frame_size: (u32, u32),
) -> Detection {
    let mut detection = Detection {
        frame_index,
        class_id: bbox.id(),
        class_name: class_name(names, bbox.id()),
        confidence: bbox.confidence(),
        bbox_xyxy: bbox.xyxy(),
        distances_px: EdgeDistances::default(),
    };
    detection.distances_px = EdgeDistances::measure(
        detection.pixel_box(),
        frame_size.0 as i32,
        frame_size.1 as i32,
    );
    detection
}
