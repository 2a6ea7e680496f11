// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8 检测模型实现
// 包含: 模型加载、letterbox预处理、推理、后处理

use anyhow::{bail, Result};
use image::{imageops, RgbImage};
use ndarray::{s, Array, Axis, IxDyn};
use std::path::PathBuf;

use crate::{non_max_suppression, Bbox, OrtBackend, OrtConfig};

/// letterbox 填充值
const PAD_VALUE: f32 = 144.0 / 255.0;

/// YOLOv8 后处理配置
#[derive(Debug, Clone)]
pub struct YOLOv8Config {
    pub nc: Option<usize>, // None: 从输出维度推断
    pub conf: f32,
    pub iou: f32,
    pub width: u32,
    pub height: u32,
}

impl YOLOv8Config {
    pub fn new(width: u32, height: u32, conf: f32, iou: f32) -> Self {
        Self {
            nc: None,
            conf,
            iou,
            width,
            height,
        }
    }
}

/// YOLOv8 完整模型结构
pub struct YOLOv8 {
    engine: OrtBackend,
    postprocessor: YOLOv8Postprocessor,
    names: Vec<String>,
    model: PathBuf,
    profile: bool,
}

impl YOLOv8 {
    /// 从模型路径 + 配置创建 YOLOv8 模型
    pub fn new(model: PathBuf, config: YOLOv8Config) -> Result<Self> {
        let engine = OrtBackend::build(OrtConfig {
            f: model.clone(),
            image_size: (config.height, config.width),
        })?;

        // 元数据没有类别名时, 由调用方回退到id字符串
        let names = engine.names().unwrap_or_default();

        Ok(Self {
            engine,
            postprocessor: YOLOv8Postprocessor::new(config),
            names,
            model,
            profile: false,
        })
    }

    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    pub fn width(&self) -> u32 {
        self.engine.width()
    }

    pub fn height(&self) -> u32 {
        self.engine.height()
    }
}

impl super::Model for YOLOv8 {
    fn preprocess(&mut self, image: &RgbImage) -> Result<Array<f32, IxDyn>> {
        letterbox(image, self.width(), self.height())
    }

    fn run(&mut self, xs: Array<f32, IxDyn>, profile: bool) -> Result<Vec<Array<f32, IxDyn>>> {
        self.engine.run(xs, profile)
    }

    fn postprocess(&self, xs: Vec<Array<f32, IxDyn>>, frame_size: (u32, u32)) -> Result<Vec<Bbox>> {
        self.postprocessor.postprocess(xs, frame_size)
    }

    fn forward(&mut self, image: &RgbImage) -> Result<Vec<Bbox>> {
        let t_pre = std::time::Instant::now();
        let xs = self.preprocess(image)?;
        if self.profile {
            log::debug!("[Model Preprocess]: {:?}", t_pre.elapsed());
        }

        let t_run = std::time::Instant::now();
        let ys = self.engine.run(xs, self.profile)?;
        if self.profile {
            log::debug!("[Model Inference]: {:?}", t_run.elapsed());
        }

        let t_post = std::time::Instant::now();
        let ys = self.postprocess(ys, image.dimensions())?;
        if self.profile {
            log::debug!("[Model Postprocess]: {:?}", t_post.elapsed());
        }
        Ok(ys)
    }

    fn names(&self) -> &[String] {
        &self.names
    }

    fn conf(&self) -> f32 {
        self.postprocessor.config.conf
    }

    fn summary(&self) {
        let config = &self.postprocessor.config;
        log::info!(
            "📦 模型: {} | 输入: {}x{} | 类别数: {} | conf: {} | iou: {}",
            self.model.display(),
            self.width(),
            self.height(),
            if self.names.is_empty() {
                String::from("未知")
            } else {
                self.names.len().to_string()
            },
            config.conf,
            config.iou,
        );
    }
}

fn scale_wh(w0: f32, h0: f32, w1: f32, h1: f32) -> (f32, f32, f32) {
    let r = (w1 / w0).min(h1 / h0);
    (r, (w0 * r).round(), (h0 * r).round())
}

/// letterbox: 等比缩放到输入尺寸, 左上角对齐, 其余填充
pub fn letterbox(image: &RgbImage, width: u32, height: u32) -> Result<Array<f32, IxDyn>> {
    let (w0, h0) = image.dimensions();
    if w0 == 0 || h0 == 0 {
        bail!("空帧: {}x{}", w0, h0);
    }
    let (_, w_new, h_new) = scale_wh(w0 as f32, h0 as f32, width as f32, height as f32);
    let resized = imageops::resize(
        image,
        (w_new as u32).clamp(1, width),
        (h_new as u32).clamp(1, height),
        imageops::FilterType::Triangle,
    );

    let mut ys = Array::from_elem((1, 3, height as usize, width as usize), PAD_VALUE).into_dyn();
    for (x, y, rgb) in resized.enumerate_pixels() {
        let x = x as usize;
        let y = y as usize;
        let [r, g, b] = rgb.0;
        ys[[0, 0, y, x]] = (r as f32) / 255.0;
        ys[[0, 1, y, x]] = (g as f32) / 255.0;
        ys[[0, 2, y, x]] = (b as f32) / 255.0;
    }
    Ok(ys)
}

/// YOLOv8 检测头后处理器
///
/// 输入 `[1, 4 + nc, N]`, 每列为 `cx, cy, w, h, 类别分数...`
pub struct YOLOv8Postprocessor {
    config: YOLOv8Config,
}

impl YOLOv8Postprocessor {
    pub fn new(config: YOLOv8Config) -> Self {
        Self { config }
    }

    pub fn postprocess(
        &self,
        xs: Vec<Array<f32, IxDyn>>,
        frame_size: (u32, u32),
    ) -> Result<Vec<Bbox>> {
        const CXYWH_OFFSET: usize = 4;

        let preds = match xs.first() {
            Some(preds) if preds.ndim() == 3 => preds,
            Some(preds) => bail!("YOLOv8输出维度异常: {:?}", preds.shape()),
            None => bail!("YOLOv8没有输出"),
        };
        let channels = preds.shape()[1];
        if channels <= CXYWH_OFFSET {
            bail!("YOLOv8输出通道数异常: {}", channels);
        }
        let nc = self
            .config
            .nc
            .unwrap_or(channels - CXYWH_OFFSET)
            .min(channels - CXYWH_OFFSET);

        let width_original = frame_size.0 as f32;
        let height_original = frame_size.1 as f32;
        let ratio = (self.config.width as f32 / width_original)
            .min(self.config.height as f32 / height_original);

        let mut data: Vec<Bbox> = Vec::new();
        // 单帧推理, 只取 batch 0
        if let Some(anchor) = preds.axis_iter(Axis(0)).next() {
            for pred in anchor.axis_iter(Axis(1)) {
                let bbox = pred.slice(s![0..CXYWH_OFFSET]);
                let clss = pred.slice(s![CXYWH_OFFSET..CXYWH_OFFSET + nc]);

                let (id, &confidence) = match clss
                    .into_iter()
                    .enumerate()
                    .reduce(|max, x| if x.1 > max.1 { x } else { max })
                {
                    Some(best) => best,
                    None => continue,
                };

                if confidence < self.config.conf {
                    continue;
                }

                let cx = bbox[0] / ratio;
                let cy = bbox[1] / ratio;
                let w = bbox[2] / ratio;
                let h = bbox[3] / ratio;
                let x1 = (cx - w / 2.).max(0.0f32).min(width_original);
                let y1 = (cy - h / 2.).max(0.0f32).min(height_original);
                let x2 = (cx + w / 2.).max(0.0f32).min(width_original);
                let y2 = (cy + h / 2.).max(0.0f32).min(height_original);
                data.push(Bbox::from_xyxy(x1, y1, x2, y2, id, confidence));
            }
        }

        non_max_suppression(&mut data, self.config.iou);
        Ok(data)
    }
}
