/// 检测记录数据结构定义
/// Data structures written to the detection log
use serde::{Deserialize, Serialize};

/// 检测框四边到画面边缘的像素距离
///
/// 不做截断: 框贴边时为0, 越界时为负
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDistances {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl EdgeDistances {
    /// 由整数框 (x1, y1, x2, y2) 与画面尺寸计算
    pub fn measure(bbox: [i32; 4], frame_w: i32, frame_h: i32) -> Self {
        let [x1, y1, x2, y2] = bbox;
        Self {
            left: x1,
            right: frame_w - x2,
            top: y1,
            bottom: frame_h - y2,
        }
    }
}

/// 单帧最佳检测结果
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub frame_index: u64,
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f32,
    pub bbox_xyxy: [f32; 4],
    pub distances_px: EdgeDistances,
}

impl Detection {
    /// 向零截断后的整数框, 绘制与测距都基于它
    pub fn pixel_box(&self) -> [i32; 4] {
        let [x1, y1, x2, y2] = self.bbox_xyxy;
        [x1 as i32, y1 as i32, x2 as i32, y2 as i32]
    }
}

/// 每帧一条, 无检测时 detections 为空
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_index: u64,
    pub detections: Vec<Detection>,
}

impl FrameRecord {
    pub fn new(frame_index: u64, detection: Option<Detection>) -> Self {
        Self {
            frame_index,
            detections: detection.into_iter().collect(),
        }
    }

    pub fn best(&self) -> Option<&Detection> {
        self.detections.first()
    }
}
