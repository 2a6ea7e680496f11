/// FFmpeg标注过滤器模块
/// FFmpeg frame filter: YUV420P frame → RGB → detect + annotate → written back before encoding
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use ffmpeg_sys_next::{av_frame_make_writable, AVFrame, AVPixelFormat};
use image::RgbImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::Model;
use crate::pipeline::FrameProcessor;
use crate::utils::{chroma_size, rgb_to_yuv420p, yuv420p_to_rgb, Yuv420pPlanes, Yuv420pPlanesMut};

/// 运行计数 (过滤器线程写, 调用方在运行结束后读)
#[derive(Clone, Default)]
pub struct FrameCounters {
    pub frames: Arc<AtomicU64>,
    pub detected: Arc<AtomicU64>,
}

/// 编码前的逐帧标注过滤器
pub struct AnnotateFilter<M: Model> {
    processor: FrameProcessor<M>,
    counters: FrameCounters,
}

impl<M: Model> AnnotateFilter<M> {
    pub fn new(processor: FrameProcessor<M>, counters: FrameCounters) -> Self {
        Self {
            processor,
            counters,
        }
    }
}

/// 经过校验的平面指针与步长
struct RawPlanes {
    width: u32,
    height: u32,
    y: *mut u8,
    u: *mut u8,
    v: *mut u8,
    y_stride: usize,
    uv_stride: usize,
    y_len: usize,
    uv_len: usize,
}

/// 校验像素格式/分辨率/步长并取出 YUV420P 平面
unsafe fn yuv420p_planes(raw: *const AVFrame) -> Result<RawPlanes, String> {
    if (*raw).format != AVPixelFormat::AV_PIX_FMT_YUV420P as i32 {
        return Err(format!("像素格式不是yuv420p: {}", (*raw).format));
    }
    if (*raw).width <= 0 || (*raw).height <= 0 {
        return Err(format!("非法分辨率 {}x{}", (*raw).width, (*raw).height));
    }
    let (width, height) = ((*raw).width as u32, (*raw).height as u32);
    let (y, u, v) = ((*raw).data[0], (*raw).data[1], (*raw).data[2]);
    if y.is_null() || u.is_null() || v.is_null() {
        return Err(String::from("YUV平面指针为空"));
    }

    let (cw, ch) = chroma_size(width, height);
    let (y_stride, uv_stride) = ((*raw).linesize[0], (*raw).linesize[1]);
    if y_stride < width as i32 || uv_stride < cw as i32 || (*raw).linesize[2] != uv_stride {
        return Err(format!(
            "步长异常 y_stride={} uv_stride={}",
            y_stride, uv_stride
        ));
    }
    let (y_stride, uv_stride) = (y_stride as usize, uv_stride as usize);
    Ok(RawPlanes {
        width,
        height,
        y,
        u,
        v,
        y_stride,
        uv_stride,
        y_len: y_stride * height as usize,
        uv_len: uv_stride * ch,
    })
}

/// AVFrame (YUV420P) → RgbImage
pub(crate) unsafe fn frame_to_rgb(raw: *const AVFrame) -> Result<RgbImage, String> {
    let p = yuv420p_planes(raw)?;
    let planes = Yuv420pPlanes {
        y: std::slice::from_raw_parts(p.y, p.y_len),
        u: std::slice::from_raw_parts(p.u, p.uv_len),
        v: std::slice::from_raw_parts(p.v, p.uv_len),
        y_stride: p.y_stride,
        uv_stride: p.uv_stride,
    };
    Ok(yuv420p_to_rgb(&planes, p.width, p.height))
}

/// RgbImage → AVFrame (YUV420P)
///
/// 解码器与 fps 过滤器会共享帧缓冲 (参考帧/重复帧), 写之前先取得独占副本
pub(crate) unsafe fn write_rgb_to_frame(raw: *mut AVFrame, rgb: &RgbImage) -> Result<(), String> {
    let ret = av_frame_make_writable(raw);
    if ret < 0 {
        return Err(format!("av_frame_make_writable 失败: {}", ret));
    }
    // 缓冲可能已重新分配, 重新读取指针与步长
    let p = yuv420p_planes(raw)?;
    if (p.width, p.height) != rgb.dimensions() {
        return Err(format!(
            "标注图尺寸 {:?} 与帧 {}x{} 不一致",
            rgb.dimensions(),
            p.width,
            p.height
        ));
    }
    let mut planes = Yuv420pPlanesMut {
        y: std::slice::from_raw_parts_mut(p.y, p.y_len),
        u: std::slice::from_raw_parts_mut(p.u, p.uv_len),
        v: std::slice::from_raw_parts_mut(p.v, p.uv_len),
        y_stride: p.y_stride,
        uv_stride: p.uv_stride,
    };
    rgb_to_yuv420p(rgb, &mut planes);
    Ok(())
}

impl<M: Model + Send + 'static> FrameFilter for AnnotateFilter<M> {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        log::info!("✅ 标注过滤器启动");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        mut frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        unsafe {
            // 空帧 (流结束信号) 原样透传
            if frame.as_ptr().is_null() || frame.is_empty() {
                return Ok(Some(frame));
            }

            let mut rgb = frame_to_rgb(frame.as_ptr())?;
            let record = self
                .processor
                .process(&mut rgb)
                .map_err(|e| format!("{:#}", e))?;

            // 只有画了标注才写回, 未标注帧保持解码原样
            if !record.detections.is_empty() {
                write_rgb_to_frame(frame.as_mut_ptr(), &rgb)?;
            }
        }

        self.counters
            .frames
            .store(self.processor.frames(), Ordering::Relaxed);
        self.counters
            .detected
            .store(self.processor.detected(), Ordering::Relaxed);

        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        log::info!(
            "✅ 标注过滤器退出: {} 帧, 日志 {} 条",
            self.processor.frames(),
            self.processor.log().records()
        );
    }
}
