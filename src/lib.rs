#![allow(clippy::type_complexity)]
// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 运行参数与绘制样式
pub mod detection; // 检测记录与JSONL日志
pub mod input; // 视频探测与帧过滤器
pub mod models; // 模型接口与具体实现
pub mod pipeline; // 逐帧处理流水线
pub mod renderer; // 边框与边距标注绘制
pub mod utils; // YUV转换等工具

pub mod ort_backend;

pub use crate::config::{Args, DrawStyle, RunConfig};
pub use crate::detection::{Detection, DetectionLog, EdgeDistances, FrameRecord};
pub use crate::models::{Model, YOLOv8, YOLOv8Config, YOLOv8Postprocessor};
pub use crate::ort_backend::{OrtBackend, OrtConfig};
pub use crate::pipeline::{run, run_with_model, FrameProcessor, RunSummary};

/// 按置信度降序排序后做类别无关的NMS
pub fn non_max_suppression(xs: &mut Vec<Bbox>, iou_threshold: f32) {
    // 稳定排序: 同分时保持模型输出顺序
    xs.sort_by(|b1, b2| {
        b2.confidence()
            .partial_cmp(&b1.confidence())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let iou = xs[prev_index].iou(&xs[index]);
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bbox {
    // a bounding box around an object, in frame pixels
    xmin: f32,
    ymin: f32,
    width: f32,
    height: f32,
    id: usize,
    confidence: f32,
}

impl Bbox {
    pub fn new(xmin: f32, ymin: f32, width: f32, height: f32, id: usize, confidence: f32) -> Self {
        Self {
            xmin,
            ymin,
            width,
            height,
            id,
            confidence,
        }
    }

    /// 从 (x1, y1, x2, y2) 构造
    pub fn from_xyxy(x1: f32, y1: f32, x2: f32, y2: f32, id: usize, confidence: f32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1, id, confidence)
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn xmin(&self) -> f32 {
        self.xmin
    }

    pub fn ymin(&self) -> f32 {
        self.ymin
    }

    pub fn xmax(&self) -> f32 {
        self.xmin + self.width
    }

    pub fn ymax(&self) -> f32 {
        self.ymin + self.height
    }

    pub fn xyxy(&self) -> [f32; 4] {
        [self.xmin, self.ymin, self.xmax(), self.ymax()]
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn intersection_area(&self, another: &Bbox) -> f32 {
        let l = self.xmin.max(another.xmin);
        let r = self.xmax().min(another.xmax());
        let t = self.ymin.max(another.ymin);
        let b = self.ymax().min(another.ymax());
        (r - l).max(0.) * (b - t).max(0.)
    }

    pub fn union(&self, another: &Bbox) -> f32 {
        self.area() + another.area() - self.intersection_area(another)
    }

    pub fn iou(&self, another: &Bbox) -> f32 {
        let union = self.union(another);
        if union <= 0. {
            return 0.;
        }
        self.intersection_area(another) / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_disjoint_and_identical() {
        let a = Bbox::from_xyxy(0., 0., 10., 10., 0, 0.9);
        let b = Bbox::from_xyxy(20., 20., 30., 30., 0, 0.8);
        assert_eq!(a.iou(&b), 0.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_top_box_first() {
        let mut xs = vec![
            Bbox::from_xyxy(0., 0., 10., 10., 0, 0.5),
            Bbox::from_xyxy(1., 1., 10., 10., 1, 0.9),
            Bbox::from_xyxy(50., 50., 60., 60., 2, 0.3),
        ];
        non_max_suppression(&mut xs, 0.7);
        assert_eq!(xs.len(), 2);
        assert_eq!(xs[0].id(), 1);
        assert_eq!(xs[1].id(), 2);
    }

    #[test]
    fn test_nms_equal_scores_keep_model_order() {
        let mut xs = vec![
            Bbox::from_xyxy(0., 0., 10., 10., 3, 0.6),
            Bbox::from_xyxy(40., 40., 50., 50., 4, 0.6),
        ];
        non_max_suppression(&mut xs, 0.7);
        assert_eq!(xs[0].id(), 3);
        assert_eq!(xs[1].id(), 4);
    }
}
