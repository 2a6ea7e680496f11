/// 视频处理流水线 (Video Processing Pipeline)
///
/// 单条顺序流水线, 帧按解码顺序逐一通过:
/// - Decoder:   ez-ffmpeg 解码 (YUV420P)
/// - Processor: 检测 → 取最佳 → 标注 → 写JSONL
/// - Encoder:   ez-ffmpeg 编码 (mpeg4/mp4v)
pub mod detector;

use anyhow::{anyhow, bail, Context, Result};
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::core::context::output::VSyncMethod;
use ez_ffmpeg::{AVMediaType, AVRational, FfmpegContext, Input, Output};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::config::RunConfig;
use crate::detection::{DetectionLog, FrameRecord};
use crate::input::{AnnotateFilter, FrameCounters, VideoInfo};
use crate::models::{Model, YOLOv8, YOLOv8Config};
use crate::renderer::Annotator;

pub use detector::{build_detection, class_name, select_best};

/// 输出视频编码器 (mp4v)
const VIDEO_CODEC: &str = "mpeg4";
/// 探测不到帧率时使用的帧率
const DEFAULT_FPS: u32 = 30;

/// 逐帧处理器: 检测 → 取最佳 → 标注 → 写日志
pub struct FrameProcessor<M: Model> {
    model: M,
    annotator: Annotator,
    log: DetectionLog,
    conf: f32,
    frame_index: u64,
    detected: u64,
    total_frames: Option<u64>,
    progress_every: u64,
}

impl<M: Model> FrameProcessor<M> {
    pub fn new(model: M, annotator: Annotator, log: DetectionLog) -> Self {
        let conf = model.conf();
        Self {
            model,
            annotator,
            log,
            conf,
            frame_index: 0,
            detected: 0,
            total_frames: None,
            progress_every: 100,
        }
    }

    /// 进度输出: 总帧数 (未知时为None) + 间隔
    pub fn with_progress(mut self, total_frames: Option<u64>, every: u64) -> Self {
        self.total_frames = total_frames;
        self.progress_every = every.max(1);
        self
    }

    /// 处理一帧, 原地绘制标注; 每帧恰好写一条记录
    pub fn process(&mut self, frame: &mut RgbImage) -> Result<FrameRecord> {
        let frame_index = self.frame_index;
        let boxes = self
            .model
            .forward(frame)
            .with_context(|| format!("第 {} 帧推理失败", frame_index))?;

        let detection = select_best(&boxes, self.conf)
            .map(|bbox| build_detection(frame_index, bbox, self.model.names(), frame.dimensions()));

        if let Some(detection) = &detection {
            self.annotator.draw_detection(frame, detection);
            self.detected += 1;
        }

        let record = FrameRecord::new(frame_index, detection);
        self.log.append(&record)?;

        if frame_index % self.progress_every == 0 {
            match self.total_frames {
                Some(total) => log::info!("Processed {}/{}", frame_index, total),
                None => log::info!("Processed {}/?", frame_index),
            }
        }
        self.frame_index += 1;
        Ok(record)
    }

    /// 已处理帧数
    pub fn frames(&self) -> u64 {
        self.frame_index
    }

    /// 有检测结果的帧数
    pub fn detected(&self) -> u64 {
        self.detected
    }

    pub fn log(&self) -> &DetectionLog {
        &self.log
    }
}

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub frames: u64,
    pub detected: u64,
    pub output: PathBuf,
    pub detections: PathBuf,
    pub elapsed_secs: f64,
}

/// 滤镜描述 + 输出帧率
///
/// 帧率未知时按帧序号重排时间戳并标记为30fps, 否则沿用输入时间戳
fn frame_timing(fps: Option<f64>) -> (String, Option<AVRational>) {
    match fps {
        Some(_) => (String::from("format=yuv420p"), None),
        None => (
            format!("setpts=N/({}*TB),format=yuv420p", DEFAULT_FPS),
            Some(AVRational {
                num: DEFAULT_FPS as i32,
                den: 1,
            }),
        ),
    }
}

fn check_input(input: &Path) -> Result<()> {
    if !input.exists() {
        bail!("Input video not found: {}", input.display());
    }
    Ok(())
}

/// 完整运行: 读视频 → 逐帧检测标注 → 写视频 + JSONL
pub fn run(config: RunConfig) -> Result<RunSummary> {
    check_input(&config.input)?;

    let model = YOLOv8::new(
        config.model.clone(),
        YOLOv8Config::new(config.imgsz, config.imgsz, config.conf, config.iou),
    )
    .with_context(|| format!("检测模型加载失败: {}", config.model.display()))?
    .with_profile(config.profile);
    model.summary();

    run_with_model(config, model)
}

/// 用给定模型跑完整条流水线 (`config.model/conf/iou/imgsz` 不再使用)
pub fn run_with_model<M: Model + Send + 'static>(config: RunConfig, model: M) -> Result<RunSummary> {
    check_input(&config.input)?;

    let info = VideoInfo::probe(&config.input)
        .with_context(|| format!("Could not open video: {}", config.input.display()))?;
    log::info!(
        "📹 输入: {} | {}x{} | {} fps | {} 帧",
        config.input.display(),
        info.width,
        info.height,
        info.fps
            .map(|f| format!("{:.2}", f))
            .unwrap_or_else(|| format!("未知(按{})", DEFAULT_FPS)),
        info.frames
            .map(|n| n.to_string())
            .unwrap_or_else(|| String::from("未知")),
    );

    let annotator = Annotator::new(config.style.clone(), Annotator::load_font(&config.font));
    let log = DetectionLog::create(&config.detections)?;
    let processor =
        FrameProcessor::new(model, annotator, log).with_progress(info.frames, config.progress_every);

    let counters = FrameCounters::default();
    let filter = AnnotateFilter::new(processor, counters.clone());
    let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
    let pipe = pipe.filter("annotate", Box::new(filter));

    // 每个解码帧恰好编码一次: 不重复, 不丢弃
    let mut output = Output::from(config.output.to_string_lossy().to_string())
        .add_frame_pipeline(pipe)
        .set_video_codec(VIDEO_CODEC)
        .set_vsync_method(VSyncMethod::VsyncPassthrough);
    let (filter_desc, framerate) = frame_timing(info.fps);
    if let Some(framerate) = framerate {
        output = output.set_framerate(framerate);
    }

    let start = Instant::now();
    let ctx = FfmpegContext::builder()
        .input(Input::from(config.input.to_string_lossy().to_string()))
        .filter_desc(filter_desc)
        .output(output)
        .build()
        .map_err(|e| anyhow!("Cannot open output VideoWriter {}: {}", config.output.display(), e))?;

    let sch = ctx
        .start()
        .map_err(|e| anyhow!("Cannot open output VideoWriter {}: {}", config.output.display(), e))?;
    log::info!("✅ 编解码启动成功, 开始处理");

    sch.wait().map_err(|e| anyhow!("视频处理中断: {}", e))?;

    let summary = RunSummary {
        frames: counters.frames.load(Ordering::Relaxed),
        detected: counters.detected.load(Ordering::Relaxed),
        output: config.output,
        detections: config.detections,
        elapsed_secs: start.elapsed().as_secs_f64(),
    };
    log::info!(
        "Done. {} frames processed ({} with detection, {:.1}s).",
        summary.frames,
        summary.detected,
        summary.elapsed_secs
    );
    log::info!("Output video: {}", summary.output.display());
    log::info!("Detections JSONL: {}", summary.detections.display());
    Ok(summary)
}
