//! 运行参数 + 绘制样式
//!
//! 所有参数都有默认值, 不带参数运行即为默认的一次完整处理

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 视频逐帧检测 + 边距标注
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "YOLOv8 视频检测 + 边距标注", long_about = None)]
pub struct Args {
    /// 输入视频 (MP4)
    #[arg(short, long, default_value = "mavic_2_pro_r.mp4")]
    pub input: PathBuf,

    /// 输出标注视频
    #[arg(short, long, default_value = "output_mavic_r.mp4")]
    pub output: PathBuf,

    /// 逐帧检测记录 (JSONL)
    #[arg(short, long, default_value = "detections_mavic_r.jsonl")]
    pub detections: PathBuf,

    /// ONNX模型路径
    #[arg(short, long, default_value = "best.onnx")]
    pub model: PathBuf,

    /// 置信度阈值
    #[arg(long, default_value_t = 0.25)]
    pub conf: f32,

    /// NMS IOU阈值
    #[arg(long, default_value_t = 0.7)]
    pub iou: f32,

    /// 模型输入尺寸 (正方形)
    #[arg(long, default_value_t = 640)]
    pub imgsz: u32,

    /// 标注字体 (TTF/OTF)
    #[arg(long, default_value = "assets/font/DejaVuSans.ttf")]
    pub font: PathBuf,

    /// 绘制样式JSON (可选)
    #[arg(long)]
    pub style: Option<PathBuf>,

    /// 每隔多少帧打印一次进度
    #[arg(long, default_value_t = 100)]
    pub progress_every: u64,

    /// 打印各阶段耗时
    #[arg(long)]
    pub profile: bool,
}

/// 一次运行所需的全部参数
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub detections: PathBuf,
    pub model: PathBuf,
    pub conf: f32,
    pub iou: f32,
    pub imgsz: u32,
    pub font: PathBuf,
    pub style: DrawStyle,
    pub progress_every: u64,
    pub profile: bool,
}

impl From<Args> for RunConfig {
    fn from(args: Args) -> Self {
        let style = match &args.style {
            Some(path) => DrawStyle::load(path),
            None => DrawStyle::default(),
        };
        Self {
            input: args.input,
            output: args.output,
            detections: args.detections,
            model: args.model,
            conf: args.conf,
            iou: args.iou,
            imgsz: args.imgsz,
            font: args.font,
            style,
            progress_every: args.progress_every.max(1),
            profile: args.profile,
        }
    }
}

/// 绘制样式 (RGB)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawStyle {
    pub box_color: [u8; 3],       // 检测框 + 边距线
    pub text_color: [u8; 3],      // 距离数字
    pub label_color: [u8; 3],     // 距离标签底色
    pub box_thickness: u32,       // 检测框线宽
    pub font_px: f32,             // 字体像素高度
    pub antialias: bool,          // 边距线抗锯齿
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            box_color: [0, 255, 0],
            text_color: [255, 255, 255],
            label_color: [255, 0, 0],
            box_thickness: 2,
            font_px: 12.0,
            antialias: true,
        }
    }
}

impl DrawStyle {
    /// 从JSON文件加载样式, 失败时使用默认值
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(style) => {
                    log::info!("✅ 绘制样式已从 {} 加载", path.display());
                    style
                }
                Err(e) => {
                    log::warn!("⚠️  样式文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("⚠️  样式文件 {} 读取失败: {}, 使用默认值", path.display(), e);
                Self::default()
            }
        }
    }
}
