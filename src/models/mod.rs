/// 模型统一接口与实现
///
/// # 架构说明
///
/// - **YOLOv8**: 完整模型 (加载 + 预处理 + 推理 + 后处理), 文件 `yolov8.rs`
/// - **YOLOv8Postprocessor**: 纯后处理器, 不依赖推理引擎, 便于单测
///
/// ## 使用示例
/// ```no_run
/// use yolov8_distance::models::{Model, YOLOv8, YOLOv8Config};
///
/// # fn main() -> anyhow::Result<()> {
/// let mut model = YOLOv8::new("best.onnx".into(), YOLOv8Config::new(640, 640, 0.25, 0.7))?;
/// let frame = image::RgbImage::new(1280, 720);
/// let boxes = model.forward(&frame)?;
/// # Ok(())
/// # }
/// ```
use anyhow::Result;
use image::RgbImage;
use ndarray::{Array, IxDyn};

use crate::Bbox;

/// 统一的检测模型接口
///
/// ## 核心流程
/// ```text
/// 原始帧 → preprocess → ndarray张量
///          ↓
///     推理引擎 run
///          ↓
///     原始输出 → postprocess → 帧坐标下的候选框
/// ```
pub trait Model {
    /// 预处理: 帧 → NCHW 张量
    fn preprocess(&mut self, image: &RgbImage) -> Result<Array<f32, IxDyn>>;

    /// 推理: 执行模型前向传播
    fn run(&mut self, xs: Array<f32, IxDyn>, profile: bool) -> Result<Vec<Array<f32, IxDyn>>>;

    /// 后处理: 原始输出 → 候选框 (已过阈值, 已NMS)
    ///
    /// # Arguments
    /// * `frame_size` - 原始帧 (宽, 高), 用于坐标还原
    fn postprocess(&self, xs: Vec<Array<f32, IxDyn>>, frame_size: (u32, u32)) -> Result<Vec<Bbox>>;

    /// 完整的推理流程: preprocess → run → postprocess
    fn forward(&mut self, image: &RgbImage) -> Result<Vec<Bbox>> {
        let xs = self.preprocess(image)?;
        let ys = self.run(xs, false)?;
        self.postprocess(ys, image.dimensions())
    }

    /// 类别名表 (下标即类别id)
    fn names(&self) -> &[String];

    /// 置信度阈值
    fn conf(&self) -> f32;

    /// 打印模型信息
    fn summary(&self);
}

pub mod yolov8; // YOLOv8 完整模型 + 实现 Model trait

pub use yolov8::{YOLOv8, YOLOv8Config, YOLOv8Postprocessor};
